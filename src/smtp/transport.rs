use std::fmt::{self, Debug};

use super::{
    authentication::{Credentials, Mechanism},
    client::{NetworkStream, SmtpConnection},
    error::{self, Error},
    extension::{ClientId, Extension, MailBodyParameter, MailParameter},
};
use crate::{
    context::Context,
    message::{has_line_break, Envelope},
};

const LINE_BREAK: &str = "line must not contain CR or LF";

/// Sends messages over SMTP, one connection per message
///
/// Each call runs a complete session: dial, greeting, `EHLO`, optional `AUTH`,
/// envelope, `DATA`, `QUIT`. Any failure aborts the rest of the session and
/// closes the connection without sending `QUIT`.
#[derive(Clone)]
pub struct SmtpTransport {
    /// `host:port` of the relay
    server: String,
    /// Whether to wrap the connection in TLS
    tls: bool,
    /// Name sent in `EHLO`
    hello_name: ClientId,
    /// Credentials for `AUTH PLAIN`, none means no `AUTH` at all
    credentials: Option<Credentials>,
}

impl Debug for SmtpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("server", &self.server)
            .field("tls", &self.tls)
            .field("hello_name", &self.hello_name)
            .field("credentials", &self.credentials.is_some())
            .finish()
    }
}

impl SmtpTransport {
    /// Creates a transport for `server` (`host:port`), without authentication
    pub fn new<S: Into<String>>(server: S, tls: bool) -> Self {
        Self {
            server: server.into(),
            tls,
            hello_name: ClientId::default(),
            credentials: None,
        }
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.hello_name = name;
        self
    }

    /// Set the credentials used for `AUTH PLAIN`
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// The relay address
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Sends `email` (headers and body) to the envelope's recipients
    pub async fn send_raw(
        &self,
        ctx: &Context,
        envelope: &Envelope,
        email: &[u8],
    ) -> Result<(), Error> {
        if envelope.to().is_empty() {
            return Err(error::sender("message has no recipients"));
        }
        if has_line_break(envelope.from()) {
            return Err(error::sender(LINE_BREAK));
        }
        if let Some(to) = envelope.to().iter().find(|to| has_line_break(to)) {
            return Err(error::recipient(to, LINE_BREAK));
        }

        let stream = NetworkStream::connect(ctx, &self.server, self.tls).await?;
        let mut conn = SmtpConnection::new(ctx.clone(), stream);

        if let Err(err) = self.transaction(&mut conn, envelope, email).await {
            tracing::warn!("aborting session with {}: {err}", self.server);
            conn.close().await;
            return Err(err);
        }

        let quit = conn.quit().await;
        conn.close().await;
        quit.map_err(error::close)?;

        tracing::info!(
            "message sent to {} recipient(s) via {}",
            envelope.to().len(),
            self.server
        );
        Ok(())
    }

    async fn transaction(
        &self,
        conn: &mut SmtpConnection,
        envelope: &Envelope,
        email: &[u8],
    ) -> Result<(), Error> {
        conn.greeting().await.map_err(error::handshake)?;
        conn.ehlo(&self.hello_name).await.map_err(error::handshake)?;
        tracing::debug!("server {}", conn.server_info());

        if let Some(ref credentials) = self.credentials {
            if !conn.server_info().supports_auth_mechanism(Mechanism::Plain) {
                return Err(error::auth("server does not offer AUTH PLAIN"));
            }
            conn.auth(Mechanism::Plain, credentials)
                .await
                .map_err(error::auth)?;
        }

        let mut mail_options = vec![];
        // 8BITMIME: https://tools.ietf.org/html/rfc6152
        if !email.is_ascii() && conn.server_info().supports_feature(Extension::EightBitMime) {
            mail_options.push(MailParameter::Body(MailBodyParameter::EightBitMime));
        }
        conn.mail(envelope.from(), mail_options)
            .await
            .map_err(error::sender)?;

        for to_address in envelope.to() {
            conn.rcpt(to_address)
                .await
                .map_err(|e| error::recipient(to_address, e))?;
        }

        let mut writer = conn.data().await.map_err(error::transmission)?;
        if let Err(e) = writer.write(email).await {
            let _ = writer.close().await;
            return Err(error::transmission(e));
        }
        writer.close().await.map_err(error::transmission)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // nothing listens on port 9, a dial attempt would be a connect error
    fn transport() -> SmtpTransport {
        SmtpTransport::new("127.0.0.1:9", false)
    }

    #[tokio::test]
    async fn smuggled_recipient_fails_before_dialing() {
        let smuggled = "a@x.com>\r\nRCPT TO:<evil@y".to_owned();
        let envelope = Envelope::new("bot@x.com", vec!["b@x.com".to_owned(), smuggled.clone()]);

        let err = transport()
            .send_raw(&Context::background(), &envelope, b"Subject: hi\r\n\r\nhi")
            .await
            .unwrap_err();
        assert!(err.is_envelope());
        assert_eq!(err.recipient(), Some(smuggled.as_str()));
    }

    #[tokio::test]
    async fn smuggled_sender_fails_before_dialing() {
        let envelope = Envelope::new("bot@x.com>\nRSET", vec!["a@x.com".to_owned()]);

        let err = transport()
            .send_raw(&Context::background(), &envelope, b"hi")
            .await
            .unwrap_err();
        assert!(err.is_envelope());
        assert_eq!(err.recipient(), None);
    }

    #[tokio::test]
    async fn empty_envelope_fails_before_dialing() {
        let envelope = Envelope::new("bot@x.com", vec![]);

        let err = transport()
            .send_raw(&Context::background(), &envelope, b"hi")
            .await
            .unwrap_err();
        assert!(err.is_envelope());
    }
}
