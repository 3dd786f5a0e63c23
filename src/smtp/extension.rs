//! ESMTP features

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    net::{Ipv4Addr, Ipv6Addr},
};

use crate::smtp::{authentication::Mechanism, response::Response};

/// Client identifier, the parameter to `EHLO`
#[derive(PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub enum ClientId {
    /// A fully-qualified domain name
    Domain(String),
    /// An IPv4 address
    Ipv4(Ipv4Addr),
    /// An IPv6 address
    Ipv6(Ipv6Addr),
}

const LOCALHOST_CLIENT: ClientId = ClientId::Ipv4(Ipv4Addr::new(127, 0, 0, 1));

impl Default for ClientId {
    fn default() -> Self {
        // https://tools.ietf.org/html/rfc5321#section-4.1.4
        //
        // The domain parameter to EHLO should be the primary host name, or an
        // address literal when no name is available.
        hostname::get()
            .ok()
            .and_then(|s| s.into_string().ok())
            .filter(|name| !name.is_empty())
            .map(Self::Domain)
            .unwrap_or(LOCALHOST_CLIENT)
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Domain(ref value) => f.write_str(value),
            Self::Ipv4(ref value) => write!(f, "[{value}]"),
            Self::Ipv6(ref value) => write!(f, "[IPv6:{value}]"),
        }
    }
}

/// Supported ESMTP keywords
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum Extension {
    /// 8BITMIME keyword
    ///
    /// Defined in [RFC 6152](https://tools.ietf.org/html/rfc6152)
    EightBitMime,
    /// AUTH mechanism
    Authentication(Mechanism),
}

impl Display for Extension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Extension::EightBitMime => f.write_str("8BITMIME"),
            Extension::Authentication(ref mechanism) => write!(f, "AUTH {mechanism}"),
        }
    }
}

/// Contains information about an SMTP server
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ServerInfo {
    /// Server name
    ///
    /// The name given in the server banner
    name: String,
    /// ESMTP features supported by the server
    ///
    /// It contains the features supported by the server and known by the `Extension` module.
    features: HashSet<Extension>,
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let features = if self.features.is_empty() {
            "no supported features".to_owned()
        } else {
            format!("{:?}", self.features)
        };
        write!(f, "{} with {}", self.name, features)
    }
}

impl ServerInfo {
    /// Parses an EHLO (or HELO) response to create a `ServerInfo`
    ///
    /// Returns `None` when the reply does not even carry a server name.
    pub fn from_response(response: &Response) -> Option<ServerInfo> {
        let name = response.first_word()?;

        let mut features: HashSet<Extension> = HashSet::new();

        // the first line is the greeting, extensions follow
        for line in response.message().skip(1) {
            let mut split = line.split_whitespace();
            let Some(keyword) = split.next() else {
                continue;
            };

            match keyword.to_ascii_uppercase().as_str() {
                "8BITMIME" => {
                    features.insert(Extension::EightBitMime);
                }
                "AUTH" => {
                    for mechanism in split {
                        if mechanism.eq_ignore_ascii_case("PLAIN") {
                            features.insert(Extension::Authentication(Mechanism::Plain));
                        }
                    }
                }
                _ => (),
            };
        }

        Some(ServerInfo {
            name: name.to_owned(),
            features,
        })
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_feature(&self, keyword: Extension) -> bool {
        self.features.contains(&keyword)
    }

    /// Checks if the server supports an authentication mechanism
    pub fn supports_auth_mechanism(&self, mechanism: Mechanism) -> bool {
        self.features
            .contains(&Extension::Authentication(mechanism))
    }

    /// The name given in the server banner
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
}

/// A `MAIL FROM` extension parameter
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[non_exhaustive]
pub enum MailParameter {
    /// `BODY` parameter
    Body(MailBodyParameter),
}

impl Display for MailParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            MailParameter::Body(ref value) => write!(f, "BODY={value}"),
        }
    }
}

/// Values for the `BODY` parameter to `MAIL FROM`
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
#[non_exhaustive]
pub enum MailBodyParameter {
    /// `8BITMIME`
    EightBitMime,
}

impl Display for MailBodyParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            MailBodyParameter::EightBitMime => f.write_str("8BITMIME"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_clientid_fmt() {
        assert_eq!(
            ClientId::Domain("test".to_owned()).to_string(),
            "test".to_owned()
        );
        assert_eq!(LOCALHOST_CLIENT.to_string(), "[127.0.0.1]".to_owned());
        assert_eq!(
            ClientId::Ipv6(Ipv6Addr::LOCALHOST).to_string(),
            "[IPv6:::1]".to_owned()
        );
    }

    #[test]
    fn test_serverinfo_fmt() {
        let mut plain = HashSet::new();
        assert!(plain.insert(Extension::Authentication(Mechanism::Plain)));

        assert_eq!(
            ServerInfo {
                name: "name".to_owned(),
                features: plain,
            }
            .to_string(),
            "name with {Authentication(Plain)}"
        );
        assert_eq!(
            ServerInfo {
                name: "name".to_owned(),
                features: HashSet::new(),
            }
            .to_string(),
            "name with no supported features"
        );
    }

    #[test]
    fn test_serverinfo() {
        let response: Response = "250-me\r\n250-8BITMIME\r\n250 SIZE 42\r\n".parse().unwrap();

        let server_info = ServerInfo::from_response(&response).unwrap();
        assert_eq!(server_info.name(), "me");
        assert!(server_info.supports_feature(Extension::EightBitMime));
        assert!(!server_info.supports_auth_mechanism(Mechanism::Plain));

        let response: Response =
            "250-me\r\n250-AUTH LOGIN plain CRAM-MD5\r\n250 8BITMIME\r\n".parse().unwrap();

        let server_info = ServerInfo::from_response(&response).unwrap();
        assert!(server_info.supports_auth_mechanism(Mechanism::Plain));
    }

    #[test]
    fn test_serverinfo_helo() {
        let response: Response = "250 relay.example.org\r\n".parse().unwrap();

        let server_info = ServerInfo::from_response(&response).unwrap();
        assert_eq!(server_info.name(), "relay.example.org");
        assert!(!server_info.supports_feature(Extension::EightBitMime));

        let empty: Response = "250\r\n".parse().unwrap();
        assert_eq!(ServerInfo::from_response(&empty), None);
    }

    #[test]
    fn test_mail_parameter_fmt() {
        assert_eq!(
            MailParameter::Body(MailBodyParameter::EightBitMime).to_string(),
            "BODY=8BITMIME"
        );
    }
}
