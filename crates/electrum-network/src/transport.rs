//! Newline-delimited transport over TCP or TLS.
//!
//! # Architecture
//!
//! ```text
//! caller ──send()──> FramedWrite<WriteHalf, LineCodec> ──> socket
//!
//! socket ──> FramedRead<ReadHalf, LineCodec> ──> read loop task
//!                                                  │
//!                       responses (mpsc, cap 1) <──┤ every frame, in order
//!                       errors (oneshot)        <──┘ exactly one terminal error
//! ```
//!
//! The transport is deliberately thin:
//! - **No request/response pairing**: frames are surfaced as they arrive
//! - **No retry or reconnect**: a terminal error ends the transport
//! - **No read/write timeouts**: only the optional connect timeout
//!
//! # Lifecycle
//!
//! `Connecting -> Open -> Closed`. Construction either returns an open
//! transport or an error, never a half-built handle. The read loop moves the
//! transport to `Closed` on the first read failure, on end of stream, or when
//! [`Transport::close`] is called. `Closed` is final.
//!
//! # Ordering
//!
//! Frames arrive on the responses channel in stream order. The terminal error
//! is held back until the consumer has taken every frame, so it is always the
//! last thing observed.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use electrum_core::constants::DEFAULT_TCP_PORT;
use electrum_protocol::{Frame, LineCodec};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::TlsConfig;

/// Write side of the connection, type-erased over TCP and TLS streams.
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write half shared between the transport and its read loop.
///
/// Whichever side closes the connection first takes it out.
type SharedWriter = Arc<Mutex<Option<FramedWrite<BoxedWriter, LineCodec>>>>;

/// Configuration for [`Transport::connect_with`]
///
/// # Example
///
/// ```
/// use electrum_network::TransportConfig;
/// use std::time::Duration;
///
/// let config = TransportConfig {
///     server_addr: "electrum.example.org:50001".to_string(),
///     connect_timeout: Some(Duration::from_secs(5)),
///     ..TransportConfig::default()
/// };
/// assert!(config.nodelay);
/// assert!(config.tls.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Server address in `host:port` form
    pub server_addr: String,

    /// Limit on dial plus TLS handshake. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,

    /// Disable Nagle's algorithm on the socket
    pub nodelay: bool,

    /// Wrap the connection in TLS when set
    pub tls: Option<TlsConfig>,
}

impl TransportConfig {
    /// Plain TCP configuration for `server_addr` with default settings.
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            ..Self::default()
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", DEFAULT_TCP_PORT),
            connect_timeout: None,
            nodelay: true,
            tls: None,
        }
    }
}

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dialing the server failed
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Dial plus handshake did not finish in time
    #[error("Connection timeout after {0}ms")]
    ConnectTimeout(u64),

    /// Name cannot be used for TLS server verification
    #[error("Invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// TLS configuration could not be built
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// TLS handshake failed (untrusted certificate, protocol mismatch, ...)
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    /// Writing to the connection failed
    #[error("Write failed: {0}")]
    Write(#[source] io::Error),

    /// Reading from the connection failed
    #[error("Read failed: {0}")]
    Read(#[from] electrum_core::Error),

    /// Server closed the connection
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Transport was closed locally or has already terminated
    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    fn from_write(e: electrum_core::Error) -> Self {
        match e {
            electrum_core::Error::Io(e) => TransportError::Write(e),
            other => TransportError::Write(io::Error::new(io::ErrorKind::InvalidInput, other)),
        }
    }
}

/// Bidirectional newline-delimited connection to an Electrum server.
///
/// A `Transport` owns one connection and one background read loop. Writes go
/// through [`send`](Transport::send); `&mut self` keeps concurrent writers
/// out at compile time. The write half is only shared with the read loop,
/// which shuts it down when the stream ends. Incoming data is read
/// with [`recv`](Transport::recv) or by selecting over the raw receivers
/// returned by [`channels`](Transport::channels).
///
/// Must be created inside a Tokio runtime: construction spawns the read loop.
///
/// # Example
///
/// ```no_run
/// use electrum_network::{Transport, TransportError};
///
/// # async fn example() -> Result<(), TransportError> {
/// let mut transport = Transport::connect("127.0.0.1:50001").await?;
/// transport.send(b"{\"id\":1,\"method\":\"server.ping\",\"params\":[]}\n").await?;
///
/// loop {
///     match transport.recv().await {
///         Ok(frame) => println!("{}", frame),
///         Err(e) => {
///             println!("stream ended: {}", e);
///             break;
///         }
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Transport {
    /// Remote peer address, for logs
    peer: String,

    /// Write side, shared with the read loop (None once closed)
    writer: SharedWriter,

    /// Frames produced by the read loop
    responses: mpsc::Receiver<Frame>,

    /// Terminal error produced by the read loop
    errors: oneshot::Receiver<TransportError>,

    /// Asks the read loop to stop (explicit close or drop)
    shutdown: CancellationToken,

    /// Cancelled by the read loop when it exits
    closed: CancellationToken,
}

impl Transport {
    /// Open a plain TCP transport to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the address cannot be resolved
    /// or nothing accepts the connection.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        Self::connect_with(&TransportConfig::new(addr)).await
    }

    /// Open a TCP connection to `addr` and perform a TLS client handshake.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] on dial failure and
    /// [`TransportError::Handshake`] if the server cannot be verified or
    /// negotiation fails. The raw socket is closed in both cases.
    pub async fn connect_tls(addr: &str, tls: &TlsConfig) -> Result<Self, TransportError> {
        let config = TransportConfig {
            tls: Some(tls.clone()),
            ..TransportConfig::new(addr)
        };
        Self::connect_with(&config).await
    }

    /// Open a transport as described by `config`.
    pub async fn connect_with(config: &TransportConfig) -> Result<Self, TransportError> {
        info!("Connecting to {}", config.server_addr);

        match config.connect_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, Self::dial(config)).await {
                Ok(result) => result,
                Err(_) => {
                    let millis = saturating_millis(timeout);
                    warn!("Connection timeout after {}ms", millis);
                    Err(TransportError::ConnectTimeout(millis))
                }
            },
            None => Self::dial(config).await,
        }
    }

    async fn dial(config: &TransportConfig) -> Result<Self, TransportError> {
        let addr = config.server_addr.as_str();

        // Resolve the TLS name first so a bad name never opens a socket
        let server_name = match &config.tls {
            Some(tls) => Some(tls.resolve_server_name(addr)?),
            None => None,
        };

        let stream = TcpStream::connect(addr).await.map_err(|source| {
            error!("Connection to {} failed: {}", addr, source);
            TransportError::Connect {
                addr: addr.to_string(),
                source,
            }
        })?;

        if config.nodelay
            && let Err(e) = stream.set_nodelay(true)
        {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.to_string());

        match (&config.tls, server_name) {
            (Some(tls), Some(server_name)) => {
                debug!("Starting TLS handshake with {}", peer);

                // The connector consumes the socket and drops it on failure
                let stream = tls
                    .connector()
                    .connect(server_name, stream)
                    .await
                    .map_err(|e| {
                        error!("TLS handshake with {} failed: {}", peer, e);
                        TransportError::Handshake(e)
                    })?;

                info!("TLS connection established with {}", peer);
                Ok(Self::from_stream(stream, peer))
            }
            _ => {
                info!("Successfully connected to {}", peer);
                Ok(Self::from_stream(stream, peer))
            }
        }
    }

    /// Wrap an already-open stream and start its read loop.
    ///
    /// `peer` is only used in logs.
    pub fn from_stream<S>(stream: S, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let peer = peer.into();
        let (read_half, write_half) = tokio::io::split(stream);

        let (responses_tx, responses) = mpsc::channel(1);
        let (errors_tx, errors) = oneshot::channel();
        let shutdown = CancellationToken::new();
        let closed = CancellationToken::new();

        let write_half: BoxedWriter = Box::new(write_half);
        let writer = Arc::new(Mutex::new(Some(FramedWrite::new(
            write_half,
            LineCodec::new(),
        ))));

        tokio::spawn(read_loop(
            FramedRead::new(read_half, LineCodec::new()),
            peer.clone(),
            Arc::clone(&writer),
            responses_tx,
            errors_tx,
            shutdown.clone(),
            closed.clone(),
        ));

        Self {
            peer,
            writer,
            responses,
            errors,
            shutdown,
            closed,
        }
    }

    /// Write `body` to the connection exactly as given.
    ///
    /// By convention the body ends with `\n`; nothing is appended. The write
    /// is flushed before returning. No retry is attempted.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Write`] if the stream rejects the write
    /// - [`TransportError::Closed`] once the transport has closed
    pub async fn send(&mut self, body: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;

        trace!(
            peer = %self.peer,
            len = body.len(),
            "{} <- {}",
            self.peer,
            String::from_utf8_lossy(body).trim_end()
        );

        writer.send(body).await.map_err(|e| {
            error!("Failed to write to {}: {}", self.peer, e);
            TransportError::from_write(e)
        })
    }

    /// Wait for the next frame.
    ///
    /// Yields every frame in order, then the terminal error once. Every call
    /// after that returns [`TransportError::Closed`]. Cancel safe.
    pub async fn recv(&mut self) -> Result<Frame, TransportError> {
        if let Some(frame) = self.responses.recv().await {
            return Ok(frame);
        }

        // Taken already, here or through `channels`
        if self.errors.is_terminated() {
            return Err(TransportError::Closed);
        }

        match (&mut self.errors).await {
            Ok(e) => Err(e),
            Err(_) => Err(TransportError::Closed),
        }
    }

    /// Raw receive surfaces: the frame channel and the terminal error channel.
    ///
    /// Intended for `tokio::select!` loops. The error receiver resolves at
    /// most once and must not be polled again after it has resolved; guard
    /// the branch with `!errors.is_terminated()` when looping. Once the error
    /// has been taken here, [`recv`](Transport::recv) returns
    /// [`TransportError::Closed`].
    pub fn channels(
        &mut self,
    ) -> (
        &mut mpsc::Receiver<Frame>,
        &mut oneshot::Receiver<TransportError>,
    ) {
        (&mut self.responses, &mut self.errors)
    }

    /// Remote peer address
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Whether the connection has been closed, locally or by the read loop.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.closed.is_cancelled()
    }

    /// Close the connection.
    ///
    /// Shuts the write side down and stops the read loop, which then emits
    /// [`TransportError::Closed`] as its terminal error unless it had already
    /// failed. Calling it more than once is safe.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.shutdown.cancel();

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            info!("Closing connection to {}", self.peer);

            if let Err(e) = SinkExt::<&[u8]>::close(&mut writer).await {
                warn!("Error during shutdown: {}", e);
            }
        }

        Ok(())
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if !self.closed.is_cancelled() {
            debug!("Transport to {} dropped while open - stopping read loop", self.peer);
        }
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Background read loop: one per transport.
async fn read_loop<R>(
    mut frames: FramedRead<R, LineCodec>,
    peer: String,
    writer: SharedWriter,
    responses: mpsc::Sender<Frame>,
    errors: oneshot::Sender<TransportError>,
    shutdown: CancellationToken,
    closed: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    debug!("Read loop started for {}", peer);

    let terminal = loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break TransportError::Closed,
            next = frames.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => break TransportError::Read(e),
            None => break TransportError::ConnectionClosed,
        };

        trace!(peer = %peer, len = frame.len(), "{} -> {}", peer, frame);

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break TransportError::Closed,
            sent = responses.send(frame) => {
                if sent.is_err() {
                    break TransportError::Closed;
                }
            }
        }
    };

    // Both halves must go for the socket to close
    drop(frames);
    let write_half = writer.lock().await.take();
    if let Some(mut write_half) = write_half
        && let Err(e) = SinkExt::<&[u8]>::close(&mut write_half).await
    {
        debug!("Write half of {} already broken: {}", peer, e);
    }
    closed.cancel();

    match &terminal {
        TransportError::Closed => debug!("Read loop for {} stopped", peer),
        TransportError::ConnectionClosed => info!("Connection closed by {}", peer),
        e => error!("Read from {} failed: {}", peer, e),
    }

    if !matches!(terminal, TransportError::Closed) {
        // Hold the error back until the consumer has taken the last frame
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = responses.reserve() => {}
        }
    }
    drop(responses);

    if errors.send(terminal).is_err() {
        trace!("Error receiver for {} already dropped", peer);
    }
}
