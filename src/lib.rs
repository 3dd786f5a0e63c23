//! courier is a small outbound mail client.
//!
//! It talks SMTP directly to a relay: one fresh connection per message, optional
//! implicit TLS, optional `AUTH PLAIN`, a single envelope and a single `DATA`
//! phase. There is no pooling, no queueing and no retry; a failed send is reported
//! to the caller, who decides what to do with it.
//!
//! The [`Mailer`] is built from a [`MailConfig`], usually resolved from the
//! environment:
//!
//! | Variable        | Meaning                                              |
//! |-----------------|------------------------------------------------------|
//! | `MAIL_SERVER`   | `host:port` of the relay (mandatory)                 |
//! | `MAIL_TLS`      | wrap the connection in TLS (`true`/`false`)          |
//! | `MAIL_LOGIN`    | login, also used as the envelope sender (mandatory)  |
//! | `MAIL_PASSWORD` | password, `AUTH` is skipped when empty               |
//! | `MAIL_TO`       | default recipients, separated by `:`                 |
//!
//! ```rust,no_run
//! use courier::{Context, MailConfig, Mailer};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::with_shutdown_signal();
//! let mailer = Mailer::new(MailConfig::from_env()?)?;
//!
//! mailer
//!     .send_text_context(&ctx, "Nightly report", "All jobs succeeded")
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    rust_2018_idioms,
    clippy::string_add,
    clippy::clone_on_ref_ptr,
    clippy::wildcard_imports,
    clippy::str_to_string,
    clippy::semicolon_if_nothing_returned,
    clippy::explicit_iter_loop
)]

pub mod config;
pub mod context;
pub mod mailer;
pub mod message;
pub mod smtp;

pub use crate::{
    config::{ConfigError, MailConfig},
    context::Context,
    mailer::Mailer,
    message::OutboundMessage,
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
