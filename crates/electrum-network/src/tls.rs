//! TLS client configuration for the transport.
//!
//! Certificate validation is delegated entirely to rustls. Electrum servers in
//! the wild frequently present self-signed certificates, so besides the usual
//! web PKI roots an explicit [`TlsConfig::insecure`] mode is available that
//! accepts any certificate while still encrypting the channel.

use std::fmt;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::TransportError;

/// TLS settings used by [`Transport::connect_tls`](crate::Transport::connect_tls).
///
/// The rustls configuration is shared behind an `Arc`, so cloning a
/// `TlsConfig` is cheap and one config can serve many connections.
///
/// # Example
///
/// ```
/// use electrum_network::TlsConfig;
///
/// let tls = TlsConfig::with_webpki_roots()
///     .unwrap()
///     .with_server_name("electrum.example.org");
/// assert_eq!(tls.server_name(), Some("electrum.example.org"));
/// ```
#[derive(Clone)]
pub struct TlsConfig {
    /// Shared rustls client configuration
    client_config: Arc<ClientConfig>,

    /// Name to verify the certificate against instead of the dialed host
    server_name: Option<String>,
}

impl TlsConfig {
    /// Verify servers against the Mozilla root store bundled by `webpki-roots`.
    pub fn with_webpki_roots() -> Result<Self, TransportError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_root_certificates(roots)
    }

    /// Verify servers against the given trust anchors.
    pub fn with_root_certificates(roots: RootCertStore) -> Result<Self, TransportError> {
        let config = ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self::from_client_config(Arc::new(config)))
    }

    /// Accept any server certificate.
    ///
    /// The channel is still encrypted but the server is not authenticated.
    pub fn insecure() -> Result<Self, TransportError> {
        warn!("TLS certificate verification disabled");

        let provider = crypto_provider();
        let verifier = Arc::new(AcceptAnyCertificate {
            algorithms: provider.signature_verification_algorithms,
        });

        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth();

        Ok(Self::from_client_config(Arc::new(config)))
    }

    /// Use a caller-built rustls configuration as is.
    pub fn from_client_config(client_config: Arc<ClientConfig>) -> Self {
        Self {
            client_config,
            server_name: None,
        }
    }

    /// Verify the certificate against `name` rather than the dialed host.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn client_config(&self) -> &Arc<ClientConfig> {
        &self.client_config
    }

    pub(crate) fn connector(&self) -> TlsConnector {
        TlsConnector::from(Arc::clone(&self.client_config))
    }

    /// Resolve the name presented in SNI and checked against the certificate.
    pub(crate) fn resolve_server_name(
        &self,
        addr: &str,
    ) -> Result<ServerName<'static>, TransportError> {
        let name = match &self.server_name {
            Some(name) => name.as_str(),
            None => host_of(addr),
        };

        debug!("Using TLS server name {}", name);

        ServerName::try_from(name.to_string())
            .map_err(|_| TransportError::InvalidServerName(name.to_string()))
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("server_name", &self.server_name)
            .field("alpn_protocols", &self.client_config.alpn_protocols)
            .finish_non_exhaustive()
    }
}

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Host part of a `host:port` address, without IPv6 brackets.
fn host_of(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[')
        && let Some((host, _)) = rest.split_once(']')
    {
        return host;
    }

    match addr.rsplit_once(':') {
        // A bare IPv6 literal has several colons and no port
        Some((host, _)) if !host.contains(':') => host,
        Some(_) => addr,
        None => addr,
    }
}

#[derive(Debug)]
struct AcceptAnyCertificate {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    // Handshake signatures are still checked so the peer must hold the key
    // for the certificate it presented.
    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}
