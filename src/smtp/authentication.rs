//! SASL authentication, limited to the PLAIN mechanism

use std::fmt::{self, Debug, Display, Formatter};

/// Contains user credentials
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Credentials {
    authentication_identity: String,
    secret: String,
}

impl Credentials {
    /// Create a `Credentials` struct from username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials {
            authentication_identity: username,
            secret: password,
        }
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((username, password): (S, T)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish()
    }
}

/// Represents authentication mechanisms
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
#[non_exhaustive]
pub enum Mechanism {
    /// PLAIN authentication mechanism, defined in
    /// [RFC 4616](https://tools.ietf.org/html/rfc4616)
    Plain,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mechanism::Plain => "PLAIN",
        })
    }
}

impl Mechanism {
    /// Returns the initial response sent along with `AUTH`, before base64
    ///
    /// The authorization identity is left empty, so the server derives it from
    /// the authentication identity.
    pub fn initial_response(self, credentials: &Credentials) -> String {
        match self {
            Mechanism::Plain => format!(
                "\u{0}{}\u{0}{}",
                credentials.authentication_identity, credentials.secret
            ),
        }
    }
}
