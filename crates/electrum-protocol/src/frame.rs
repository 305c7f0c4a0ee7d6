use bytes::Bytes;
use electrum_core::constants::DELIMITER;
use std::fmt;

/// A single newline-delimited unit of data read from the connection.
///
/// Frames produced by [`LineCodec`](crate::LineCodec) always carry their
/// trailing delimiter, so the bytes are exactly what the peer wrote. The
/// payload without the delimiter is available through [`Frame::payload`].
///
/// Cloning is cheap: the bytes are reference counted.
///
/// # Example
///
/// ```
/// use electrum_protocol::Frame;
///
/// let frame = Frame::from(&b"{\"id\":1}\n"[..]);
/// assert!(frame.is_terminated());
/// assert_eq!(frame.payload(), b"{\"id\":1}");
/// assert_eq!(frame.len(), 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Create a frame from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Raw bytes, including the trailing delimiter.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes without the trailing delimiter.
    pub fn payload(&self) -> &[u8] {
        match self.data.split_last() {
            Some((&DELIMITER, rest)) => rest,
            _ => &self.data,
        }
    }

    /// Whether the frame ends with the delimiter.
    pub fn is_terminated(&self) -> bool {
        self.data.last() == Some(&DELIMITER)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Bytes> for Frame {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for Frame {
    fn from(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }
}

impl From<Frame> for Bytes {
    fn from(frame: Frame) -> Self {
        frame.data
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for Frame {
    /// Lossy UTF-8 rendering of the payload, for logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.payload()))
    }
}
