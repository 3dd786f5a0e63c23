use std::{
    fmt::{self, Debug},
    sync::Arc,
};

use rustls::{
    pki_types::{CertificateDer, ServerName},
    ClientConfig, RootCertStore,
};
use tokio_rustls::TlsConnector;

use crate::smtp::error::{self, Error};

/// Parameters to use for secure clients
#[derive(Clone)]
pub struct TlsParameters {
    connector: TlsConnector,
    /// The domain name which is expected in the TLS certificate from the server
    server_name: ServerName<'static>,
    domain: Box<str>,
}

impl TlsParameters {
    /// Creates a new `TlsParameters` trusting the bundled Mozilla roots
    pub fn new(domain: String) -> Result<Self, Error> {
        TlsParametersBuilder::new(domain).build()
    }

    /// Creates a new `TlsParameters` builder
    pub fn builder(domain: String) -> TlsParametersBuilder {
        TlsParametersBuilder::new(domain)
    }

    /// The domain name used for SNI and certificate validation
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub(super) fn connector(&self) -> &TlsConnector {
        &self.connector
    }

    pub(super) fn server_name(&self) -> ServerName<'static> {
        self.server_name.clone()
    }
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParameters")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Builder for `TlsParameters`
#[derive(Debug, Clone)]
pub struct TlsParametersBuilder {
    domain: String,
    root_certs: Vec<CertificateDer<'static>>,
    webpki_roots: bool,
}

impl TlsParametersBuilder {
    /// Creates a new builder for `TlsParameters`
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            root_certs: Vec::new(),
            webpki_roots: true,
        }
    }

    /// Add a custom root certificate, DER encoded
    ///
    /// Can be used to trust a private relay signed by an internal CA.
    pub fn add_root_certificate(mut self, der: Vec<u8>) -> Self {
        self.root_certs.push(CertificateDer::from(der));
        self
    }

    /// Whether to trust the bundled Mozilla root certificates (default: true)
    pub fn webpki_roots(mut self, enabled: bool) -> Self {
        self.webpki_roots = enabled;
        self
    }

    /// Creates a new `TlsParameters` using the builder's settings
    pub fn build(self) -> Result<TlsParameters, Error> {
        let mut root_cert_store = RootCertStore::empty();
        if self.webpki_roots {
            root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }
        for cert in self.root_certs {
            root_cert_store.add(cert).map_err(error::tls)?;
        }

        let crypto_provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(crypto_provider)
            .with_safe_default_protocol_versions()
            .map_err(error::tls)?
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let server_name = ServerName::try_from(self.domain.as_str())
            .map_err(error::tls)?
            .to_owned();

        Ok(TlsParameters {
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
            domain: self.domain.into_boxed_str(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_for_domain_and_ip() {
        let params = TlsParameters::new("smtp.example.org".to_owned()).unwrap();
        assert_eq!(params.domain(), "smtp.example.org");

        assert!(TlsParameters::new("127.0.0.1".to_owned()).is_ok());
    }

    #[test]
    fn rejects_invalid_server_name() {
        let err = TlsParameters::new("not a host".to_owned()).unwrap_err();
        assert!(err.is_tls());
    }

    #[test]
    fn rejects_garbage_root_certificate() {
        let err = TlsParameters::builder("smtp.example.org".to_owned())
            .webpki_roots(false)
            .add_root_certificate(vec![0x30, 0x03, 0x01, 0x02])
            .build()
            .unwrap_err();
        assert!(err.is_tls());
    }
}
