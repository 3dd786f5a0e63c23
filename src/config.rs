//! Mail configuration resolved from named settings
//!
//! | Variable        | Field      |                                          |
//! |-----------------|------------|------------------------------------------|
//! | `MAIL_SERVER`   | `server`   | mandatory, `host:port` (25 plain, 465 TLS) |
//! | `MAIL_TLS`      | `tls`      | wrap the connection in TLS               |
//! | `MAIL_LOGIN`    | `login`    | mandatory, login and sender address      |
//! | `MAIL_PASSWORD` | `password` | AUTH is skipped when unset or empty      |
//! | `MAIL_TO`       | `to`       | default recipients, `:` separated        |

use std::{collections::HashMap, error::Error as StdError, fmt};

use ::config::{Config, Environment};
use serde::{Deserialize, Deserializer};

use crate::BoxError;

const ENV_PREFIX: &str = "MAIL";
const LIST_SEPARATOR: &str = ":";

/// Validated mail client configuration
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct MailConfig {
    /// SMTP server, `host:port`
    #[serde(default)]
    pub server: String,
    /// Wrap the connection in TLS
    #[serde(default)]
    pub tls: bool,
    /// Login name and sender address
    #[serde(default)]
    pub login: String,
    /// Password, `AUTH` is only attempted when set
    #[serde(default)]
    pub password: Option<String>,
    /// Default recipients
    #[serde(default, deserialize_with = "split_recipients")]
    pub to: Vec<String>,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("server", &self.server)
            .field("tls", &self.tls)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("to", &self.to)
            .finish()
    }
}

impl MailConfig {
    /// Creates a configuration without TLS, password or default recipients
    pub fn new<S: Into<String>, L: Into<String>>(server: S, login: L) -> Self {
        Self {
            server: server.into(),
            tls: false,
            login: login.into(),
            password: None,
            to: Vec::new(),
        }
    }

    /// Enable or disable TLS
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Set the password; an empty one disables authentication
    pub fn password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into()).filter(|p| !p.is_empty());
        self
    }

    /// Set the default recipients
    pub fn to(mut self, to: Vec<String>) -> Self {
        self.to = to;
        self
    }

    /// Reads the configuration from `MAIL_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(Environment::with_prefix(ENV_PREFIX))
    }

    /// Reads the configuration from an explicit map of `MAIL_*` settings
    pub fn from_source(source: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::resolve(Environment::with_prefix(ENV_PREFIX).source(Some(source)))
    }

    // Values are kept as strings: a password such as `0123` must not go
    // through number parsing.
    fn resolve(environment: Environment) -> Result<Self, ConfigError> {
        let mut config = Config::builder()
            .add_source(environment)
            .build()
            .and_then(|config| config.try_deserialize::<MailConfig>())
            .map_err(ConfigError::invalid)?;

        config.password = config.password.filter(|p| !p.is_empty());
        config.validate()?;

        tracing::debug!(server = %config.server, tls = config.tls, "mail configuration loaded");
        Ok(config)
    }

    /// Checks the mandatory fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.is_empty() {
            return Err(ConfigError::missing("SMTP server (MAIL_SERVER) required"));
        }
        if self.login.is_empty() {
            return Err(ConfigError::missing("SMTP login/sender required (MAIL_LOGIN)"));
        }
        Ok(())
    }
}

/// `MAIL_TO` is a single `:` separated string, empty items are dropped
fn split_recipients<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Configuration could not be resolved
///
/// This is a startup error: the process should not go on without a mail
/// configuration.
pub struct ConfigError {
    kind: Kind,
    source: Option<BoxError>,
}

#[derive(Debug)]
enum Kind {
    Missing(&'static str),
    Invalid,
}

impl ConfigError {
    fn missing(what: &'static str) -> Self {
        Self {
            kind: Kind::Missing(what),
            source: None,
        }
    }

    fn invalid<E: Into<BoxError>>(e: E) -> Self {
        Self {
            kind: Kind::Invalid,
            source: Some(e.into()),
        }
    }

    /// Returns true if a mandatory setting is absent or empty
    pub fn is_missing(&self) -> bool {
        matches!(self.kind, Kind::Missing(_))
    }

    /// Returns true if a setting could not be parsed
    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, Kind::Invalid)
    }
}

impl fmt::Debug for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("courier::ConfigError");
        builder.field("kind", &self.kind);
        if let Some(ref source) = self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Missing(what) => f.write_str(what)?,
            Kind::Invalid => f.write_str("invalid mail configuration")?,
        }
        if let Some(ref e) = self.source {
            write!(f, ": {e}")?;
        }
        Ok(())
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| {
            let r: &(dyn StdError + 'static) = &**e;
            r
        })
    }
}
