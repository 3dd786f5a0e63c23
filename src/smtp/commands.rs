//! SMTP commands

use std::fmt::{self, Display, Formatter};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::smtp::{
    authentication::{Credentials, Mechanism},
    extension::{ClientId, MailParameter},
};

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Ehlo {
    client_id: ClientId,
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

impl Ehlo {
    /// Creates a EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

/// HELO command, for servers that do not speak ESMTP
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Helo {
    client_id: ClientId,
}

impl Display for Helo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HELO {}\r\n", self.client_id)
    }
}

impl Helo {
    /// Creates a HELO command
    pub fn new(client_id: ClientId) -> Helo {
        Helo { client_id }
    }
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mail {
    sender: String,
    parameters: Vec<MailParameter>,
}

impl Display for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MAIL FROM:<{}>", self.sender)?;
        for parameter in &self.parameters {
            write!(f, " {parameter}")?;
        }
        f.write_str("\r\n")
    }
}

impl Mail {
    /// Creates a MAIL command
    pub fn new(sender: String, parameters: Vec<MailParameter>) -> Mail {
        Mail { sender, parameters }
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rcpt {
    recipient: String,
}

impl Display for Rcpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO:<{}>\r\n", self.recipient)
    }
}

impl Rcpt {
    /// Creates an RCPT command
    pub fn new(recipient: String) -> Rcpt {
        Rcpt { recipient }
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

/// AUTH command, with the initial response inlined
#[derive(PartialEq, Eq, Clone)]
pub struct Auth {
    mechanism: Mechanism,
    response: String,
}

impl Display for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let encoded_response = STANDARD.encode(self.response.as_bytes());
        write!(f, "AUTH {} {}\r\n", self.mechanism, encoded_response)
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("mechanism", &self.mechanism)
            .finish_non_exhaustive()
    }
}

impl Auth {
    /// Creates an AUTH command
    pub fn new(mechanism: Mechanism, credentials: &Credentials) -> Auth {
        Auth {
            mechanism,
            response: mechanism.initial_response(credentials),
        }
    }
}
