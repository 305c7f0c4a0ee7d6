//! Network transport for Electrum-style JSON-RPC servers
//!
//! This crate provides a bidirectional newline-delimited transport over TCP,
//! optionally wrapped in TLS. A [`Transport`] writes outgoing request lines
//! and runs one background read loop that surfaces incoming frames on a
//! channel, with a separate single-shot channel for the terminal read error.
//!
//! There is no request/response pairing, JSON handling, or reconnection here.
//! Those belong to the component layered on top.
//!
//! # Example
//!
//! ```no_run
//! use electrum_network::{TlsConfig, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tls = TlsConfig::with_webpki_roots()?;
//! let mut transport = Transport::connect_tls("electrum.example.org:50002", &tls).await?;
//!
//! transport
//!     .send(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"server.version\",\"params\":[]}\n")
//!     .await?;
//!
//! let frame = transport.recv().await?;
//! println!("Received: {}", frame);
//! # Ok(())
//! # }
//! ```

mod tls;
mod transport;

pub use tls::TlsConfig;
pub use transport::{Transport, TransportConfig, TransportError};
