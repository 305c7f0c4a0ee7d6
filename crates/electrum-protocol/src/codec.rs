//! Tokio codec for newline-delimited framing.
//!
//! `LineCodec` splits an incoming byte stream into [`Frame`]s on the
//! [`DELIMITER`] byte and writes outgoing bodies to the wire untouched. It is
//! meant to be used with `tokio_util::codec::{FramedRead, FramedWrite, Framed}`.
//!
//! # Architecture
//!
//! ```text
//! TCP/TLS Stream -> Decoder -> Frame (bytes up to and including '\n')
//! &[u8] / Bytes  -> Encoder -> TCP/TLS Stream (verbatim)
//! ```
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//! use electrum_protocol::LineCodec;
//! use futures::{SinkExt, StreamExt};
//!
//! # async fn example() -> electrum_core::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:50001").await?;
//! let mut framed = Framed::new(stream, LineCodec::new());
//!
//! framed.send(&b"{\"id\":1,\"method\":\"server.ping\",\"params\":[]}\n"[..]).await?;
//!
//! if let Some(Ok(frame)) = framed.next().await {
//!     println!("Received: {}", frame);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Frame Size
//!
//! Frames are unbounded by default: Electrum responses such as full
//! transaction histories can be arbitrarily large. A limit can be set with
//! [`LineCodec::with_max_frame_size`].
//!
//! # End of Stream
//!
//! When the peer closes the stream, complete frames still buffered are
//! yielded first. A trailing fragment with no delimiter is reported as
//! [`Error::UnterminatedFrame`] and never surfaces as a frame.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::Frame;
use electrum_core::{Error, Result, constants::DELIMITER};

/// Tokio codec for newline-delimited frames.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::Decoder;
/// use electrum_protocol::LineCodec;
///
/// let mut codec = LineCodec::new();
/// let mut buffer = BytesMut::from(&b"{\"id\":1}\n{\"id\":2}"[..]);
///
/// let frame = codec.decode(&mut buffer).unwrap().unwrap();
/// assert_eq!(frame.as_bytes(), b"{\"id\":1}\n");
///
/// // Second frame is not complete yet
/// assert!(codec.decode(&mut buffer).unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Offset into the buffer where the delimiter scan resumes.
    ///
    /// Bytes before this offset are known not to contain the delimiter.
    next_index: usize,

    /// Maximum allowed frame size in bytes, delimiter included.
    max_frame_size: usize,
}

impl LineCodec {
    /// Create a codec with no frame size limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_frame_size: usize::MAX,
        }
    }

    /// Create a codec that rejects frames longer than `max_frame_size`.
    ///
    /// # Example
    ///
    /// ```
    /// use electrum_protocol::LineCodec;
    ///
    /// let codec = LineCodec::with_max_frame_size(1024 * 1024);
    /// assert_eq!(codec.max_frame_size(), 1024 * 1024);
    /// ```
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            next_index: 0,
            max_frame_size,
        }
    }

    /// Get the current maximum frame size.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size,
                max_size: self.max_frame_size,
            });
        }
        Ok(())
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = Error;

    /// Extract the next complete frame from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Frame))` - A complete frame, delimiter included
    /// - `Ok(None)` - Need more data
    /// - `Err(Error::FrameTooLarge)` - Buffered data exceeds the size limit
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let scan_from = self.next_index.min(src.len());

        match src[scan_from..].iter().position(|b| *b == DELIMITER) {
            Some(offset) => {
                let end = scan_from + offset + 1;
                self.check_size(end)?;
                self.next_index = 0;
                Ok(Some(Frame::from(src.split_to(end).freeze())))
            }
            None => {
                self.check_size(src.len())?;
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = src.len();
        src.clear();
        self.next_index = 0;
        Err(Error::UnterminatedFrame { len })
    }
}

impl Encoder<&[u8]> for LineCodec {
    type Error = Error;

    /// Append the body to the destination buffer unchanged.
    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<()> {
        self.check_size(item.len())?;
        dst.reserve(item.len());
        dst.put_slice(item);
        Ok(())
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&[u8]>::encode(self, &item[..], dst)
    }
}
