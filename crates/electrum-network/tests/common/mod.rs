//! Shared helpers for transport integration tests.
//!
//! Provides scripted TCP servers and a self-signed TLS server so tests can
//! exercise the transport against real sockets.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rcgen::CertifiedKey;
use rustls::RootCertStore;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

/// Upper bound for any single await in the tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind a listener on an ephemeral localhost port.
pub async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address that nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    drop(listener);
    addr
}

/// Accept one connection, write `payload`, then close.
pub async fn spawn_sending_server(payload: &'static [u8]) -> SocketAddr {
    let (listener, addr) = bind_local().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(payload).await.unwrap();
        stream.shutdown().await.unwrap();
    });

    addr
}

/// Accept one connection and return everything the client wrote until it
/// closed its side.
pub async fn spawn_capturing_server() -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let (listener, addr) = bind_local().await;

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        received
    });

    (addr, handle)
}

/// Accept one connection and echo every byte back until the client closes.
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = bind_local().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        echo(stream).await;
    });

    addr
}

async fn echo<S: AsyncRead + AsyncWrite + Unpin>(stream: S) {
    let (mut reader, mut writer) = tokio::io::split(stream);
    let _ = tokio::io::copy(&mut reader, &mut writer).await;
}

/// Self-signed certificate for `localhost`.
pub struct TestCertificate {
    pub cert: CertificateDer<'static>,
    pub key: PrivateKeyDer<'static>,
}

impl TestCertificate {
    pub fn generate() -> Self {
        let CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();

        Self {
            cert: cert.der().clone(),
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der())),
        }
    }

    /// Root store trusting only this certificate.
    pub fn root_store(&self) -> RootCertStore {
        let mut roots = RootCertStore::empty();
        roots.add(self.cert.clone()).unwrap();
        roots
    }

    fn acceptor(&self) -> TlsAcceptor {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![self.cert.clone()], self.key.clone_key())
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }
}

/// TLS server that writes `payload` after the handshake, then echoes.
///
/// Handshake failures are ignored; the join handle reports whether the
/// handshake succeeded.
pub async fn spawn_tls_server(
    certificate: &TestCertificate,
    payload: &'static [u8],
) -> (SocketAddr, JoinHandle<bool>) {
    let (listener, addr) = bind_local().await;
    let acceptor = certificate.acceptor();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        match acceptor.accept(stream).await {
            Ok(mut tls) => {
                tls.write_all(payload).await.unwrap();
                tls.flush().await.unwrap();
                echo(tls).await;
                true
            }
            Err(_) => false,
        }
    });

    (addr, handle)
}
