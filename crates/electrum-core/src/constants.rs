//! Core constants for the Electrum line transport.
//!
//! Electrum servers speak JSON-RPC over a plain byte stream where every
//! message is terminated by a single newline byte:
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"server.version","params":[]}\n
//! {"jsonrpc":"2.0","id":1,"result":["ElectrumX 1.16.0","1.4"]}\n
//! ```
//!
//! There is no escaping and no length prefix. A frame is everything up to and
//! including the delimiter.
//!
//! # Usage
//!
//! ```
//! use electrum_core::constants::*;
//!
//! let line = b"{\"id\":1}\n";
//! assert_eq!(line.last(), Some(&DELIMITER));
//!
//! use std::time::Duration;
//! let timeout = Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 10);
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Frame delimiter (ASCII line feed, 0x0A).
///
/// Every frame read from or written to the connection ends with this byte.
pub const DELIMITER: u8 = b'\n';

// ============================================================================
// Conventional Ports
// ============================================================================

/// Conventional port for plain TCP Electrum servers.
pub const DEFAULT_TCP_PORT: u16 = 50001;

/// Conventional port for TLS Electrum servers.
pub const DEFAULT_TLS_PORT: u16 = 50002;

// ============================================================================
// Timeouts
// ============================================================================

/// Default dial + handshake timeout used by the command-line client (milliseconds).
///
/// The library itself enforces no timeout unless one is configured.
///
/// # Value: 10000ms (10 seconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
