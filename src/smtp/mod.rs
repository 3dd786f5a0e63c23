//! The SMTP transport sends messages using the SMTP protocol.
//!
//! This client follows [RFC 5321](https://tools.ietf.org/html/rfc5321) closely
//! enough to hand one message to a relay server and relies on the relay for
//! everything else.
//!
//! It implements the following extensions:
//!
//! * 8BITMIME ([RFC 6152](https://tools.ietf.org/html/rfc6152))
//! * AUTH ([RFC 4954](http://tools.ietf.org/html/rfc4954)) with the PLAIN mechanism
//!
//! Encryption is implicit TLS only (the whole connection is wrapped, as on
//! port 465). No `STARTTLS`, no pooling: every send opens and closes its own
//! connection.
//!
//! ```rust,no_run
//! use courier::{
//!     message::Envelope,
//!     smtp::{authentication::Credentials, SmtpTransport},
//!     Context,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = SmtpTransport::new("smtp.example.org:465", true)
//!     .credentials(Credentials::from(("bot@example.org", "secret")));
//!
//! let envelope = Envelope::new("bot@example.org", vec!["ops@example.org".to_owned()]);
//! transport
//!     .send_raw(
//!         &Context::background(),
//!         &envelope,
//!         b"Subject: ping\r\n\r\npong",
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use self::{error::Error, transport::SmtpTransport};

pub mod authentication;
pub mod client;
pub mod commands;
pub(crate) mod error;
pub mod extension;
pub mod response;
mod transport;

