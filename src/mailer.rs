//! Configured mail sender with text shortcuts

use crate::{
    config::{ConfigError, MailConfig},
    context::Context,
    message::{has_line_break, OutboundMessage},
    smtp::{authentication::Credentials, error, extension::ClientId, Error, SmtpTransport},
};

const TEXT_PLAIN: &str = "text/plain";

/// Sends messages with a fixed [`MailConfig`]
///
/// Every call opens its own connection, so a `Mailer` can be cloned and used
/// from several tasks at once.
#[derive(Clone, Debug)]
pub struct Mailer {
    config: MailConfig,
    transport: SmtpTransport,
}

impl Mailer {
    /// Creates a mailer; authentication is enabled when the config has a password
    ///
    /// Fails when the server or the login is missing, so that an incomplete
    /// configuration never reaches the network.
    pub fn new(config: MailConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut transport = SmtpTransport::new(config.server.clone(), config.tls);
        if let Some(ref password) = config.password {
            transport = transport.credentials(Credentials::new(
                config.login.clone(),
                password.clone(),
            ));
        }

        Ok(Self { config, transport })
    }

    /// Creates a mailer from `MAIL_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        MailConfig::from_env().and_then(Self::new)
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.transport = self.transport.hello_name(name);
        self
    }

    /// The configuration this mailer was built from
    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Sends a `text/plain` message to the default recipients
    pub async fn send_text(&self, subject: &str, text: &str) -> Result<(), Error> {
        self.send_text_context(&Context::background(), subject, text)
            .await
    }

    /// Sends a `text/plain` message to the default recipients
    pub async fn send_text_context(
        &self,
        ctx: &Context,
        subject: &str,
        text: &str,
    ) -> Result<(), Error> {
        self.send_text_to_context(ctx, subject, text, &self.config.to)
            .await
    }

    /// Sends a `text/plain` message to custom recipients
    pub async fn send_text_to(
        &self,
        subject: &str,
        text: &str,
        to: &[String],
    ) -> Result<(), Error> {
        self.send_text_to_context(&Context::background(), subject, text, to)
            .await
    }

    /// Sends a `text/plain` message to custom recipients
    ///
    /// Recipients are visible in the `To` header.
    pub async fn send_text_to_context(
        &self,
        ctx: &Context,
        subject: &str,
        text: &str,
        to: &[String],
    ) -> Result<(), Error> {
        self.send(ctx, text.as_bytes(), subject, TEXT_PLAIN, to)
            .await
    }

    /// Sends arbitrary content
    ///
    /// The login is the envelope sender and the `From` header; recipients are
    /// visible in the `To` header.
    pub async fn send(
        &self,
        ctx: &Context,
        data: &[u8],
        subject: &str,
        content_type: &str,
        to: &[String],
    ) -> Result<(), Error> {
        let message = OutboundMessage::new(subject, content_type, data, to.to_vec());
        self.send_message(ctx, &message).await
    }

    /// Sends a prepared message
    ///
    /// Header values containing CR or LF are refused before connecting.
    pub async fn send_message(&self, ctx: &Context, message: &OutboundMessage) -> Result<(), Error> {
        if has_line_break(message.subject()) || has_line_break(message.content_type()) {
            return Err(error::sender("header must not contain CR or LF"));
        }

        let from = self.config.login.as_str();
        self.transport
            .send_raw(ctx, &message.envelope(from), &message.formatted(from))
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn empty_recipient_list_fails_before_dialing() {
        // nothing listens there, a dial attempt would be a connect error
        let mailer = Mailer::new(MailConfig::new("127.0.0.1:9", "bot@x.com")).unwrap();

        let err = mailer.send_text("Hi", "Hello").await.unwrap_err();
        assert!(err.is_envelope());
        assert_eq!(err.recipient(), None);
    }

    #[tokio::test]
    async fn malformed_server_is_an_address_error() {
        let mailer = Mailer::new(
            MailConfig::new("localhost", "bot@x.com").to(vec!["a@x.com".to_owned()]),
        )
        .unwrap();

        let err = mailer.send_text("Hi", "Hello").await.unwrap_err();
        assert!(err.is_address());
    }

    #[test]
    fn incomplete_config_is_refused() {
        let err = Mailer::new(MailConfig::new("127.0.0.1:25", "")).unwrap_err();
        assert!(err.is_missing());

        let err = Mailer::new(MailConfig::new("", "bot@x.com")).unwrap_err();
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn line_breaks_in_headers_fail_before_dialing() {
        let mailer = Mailer::new(
            MailConfig::new("127.0.0.1:9", "bot@x.com").to(vec!["a@x.com".to_owned()]),
        )
        .unwrap();

        let err = mailer
            .send_text("Hi\r\nBcc: evil@y.com", "Hello")
            .await
            .unwrap_err();
        assert!(err.is_envelope());

        let err = mailer
            .send(
                &Context::background(),
                b"Hello",
                "Hi",
                "text/plain\nX-Injected: yes",
                &["a@x.com".to_owned()],
            )
            .await
            .unwrap_err();
        assert!(err.is_envelope());
    }

    #[test]
    fn debug_hides_credentials() {
        let mailer =
            Mailer::new(MailConfig::new("localhost:25", "bot@x.com").password("hunter2")).unwrap();
        assert!(!format!("{mailer:?}").contains("hunter2"));
    }
}
