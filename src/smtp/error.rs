//! Error and result type for SMTP sends

use std::{error::Error as StdError, fmt};

use crate::{
    context::Done,
    smtp::response::{Code, ReplyError},
    BoxError,
};

/// The errors that may occur when sending a message over SMTP
///
/// Every error names the phase of the session that failed. The underlying cause
/// (I/O error, TLS error, negative server reply, …) is available through
/// [`std::error::Error::source`].
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// Returns true if the server address could not be parsed
    pub fn is_address(&self) -> bool {
        matches!(self.inner.kind, Kind::Address)
    }

    /// Returns true if the TCP connection could not be established
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect)
    }

    /// Returns true if the TLS handshake failed
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if the greeting or `EHLO` exchange failed
    pub fn is_handshake(&self) -> bool {
        matches!(self.inner.kind, Kind::Handshake)
    }

    /// Returns true if authentication was rejected
    pub fn is_auth(&self) -> bool {
        matches!(self.inner.kind, Kind::Auth)
    }

    /// Returns true if the sender or a recipient was rejected
    pub fn is_envelope(&self) -> bool {
        matches!(self.inner.kind, Kind::Envelope(_))
    }

    /// Returns true if the message content could not be transmitted
    pub fn is_transmission(&self) -> bool {
        matches!(self.inner.kind, Kind::Transmission)
    }

    /// Returns true if the final `QUIT` failed
    pub fn is_close(&self) -> bool {
        matches!(self.inner.kind, Kind::Close)
    }

    /// Returns true if the server had already accepted the message when the
    /// error occurred.
    ///
    /// This only happens for close errors: the `DATA` phase was acknowledged
    /// and only the `QUIT` exchange failed, so the message was very likely
    /// delivered.
    pub fn message_accepted(&self) -> bool {
        self.is_close()
    }

    /// The recipient that was rejected, for envelope errors raised by `RCPT TO`
    pub fn recipient(&self) -> Option<&str> {
        match self.inner.kind {
            Kind::Envelope(Some(ref recipient)) => Some(recipient),
            _ => None,
        }
    }

    /// Returns the status code, if the error was caused by a negative reply
    pub fn status(&self) -> Option<Code> {
        self.reply().and_then(ReplyError::code)
    }

    /// Returns true if the error is caused by a timeout
    pub fn is_timeout(&self) -> bool {
        self.find_source(|err| {
            if let Some(done) = err.downcast_ref::<Done>() {
                return Some(*done == Done::DeadlineExceeded);
            }
            err.downcast_ref::<std::io::Error>()
                .map(|io_err| io_err.kind() == std::io::ErrorKind::TimedOut)
        })
    }

    /// Returns true if the send was aborted because its context was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.find_source(|err| err.downcast_ref::<Done>().map(|done| *done == Done::Cancelled))
    }

    fn reply(&self) -> Option<&ReplyError> {
        self.inner
            .source
            .as_ref()
            .and_then(|source| source.downcast_ref::<ReplyError>())
    }

    fn find_source<F>(&self, mut check: F) -> bool
    where
        F: FnMut(&(dyn StdError + 'static)) -> Option<bool>,
    {
        let mut source = self.source();

        while let Some(err) = source {
            if let Some(found) = check(err) {
                return found;
            }

            source = err.source();
        }

        false
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// Malformed `host:port`
    Address,
    /// TCP connection error, including timeout and cancellation while dialing
    Connect,
    /// TLS handshake error
    Tls,
    /// Greeting or `EHLO`/`HELO` error
    Handshake,
    /// `AUTH` error
    Auth,
    /// `MAIL FROM` or `RCPT TO` error, with the rejected recipient if any
    Envelope(Option<String>),
    /// `DATA` phase error
    Transmission,
    /// `QUIT` error
    Close,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("courier::smtp::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Address => f.write_str("mail: parse server")?,
            Kind::Connect => f.write_str("mail: dial to server")?,
            Kind::Tls => f.write_str("mail: tls handshake")?,
            Kind::Handshake => f.write_str("mail: create mail client")?,
            Kind::Auth => f.write_str("mail: authorize")?,
            Kind::Envelope(None) => f.write_str("mail: start mail")?,
            Kind::Envelope(Some(ref recipient)) => {
                write!(f, "mail: define recipient {recipient}")?;
            }
            Kind::Transmission => f.write_str("mail: write message")?,
            Kind::Close => f.write_str("mail: close client")?,
        };

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn std::error::Error + 'static) = &**e;
            r
        })
    }
}

pub(crate) fn address<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Address, Some(e))
}

pub(crate) fn connect<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connect, Some(e))
}

pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls, Some(e))
}

pub(crate) fn handshake<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Handshake, Some(e))
}

pub(crate) fn auth<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Auth, Some(e))
}

pub(crate) fn sender<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Envelope(None), Some(e))
}

pub(crate) fn recipient<E: Into<BoxError>>(recipient: &str, e: E) -> Error {
    Error::new(Kind::Envelope(Some(recipient.to_owned())), Some(e))
}

pub(crate) fn transmission<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Transmission, Some(e))
}

pub(crate) fn close<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Close, Some(e))
}
