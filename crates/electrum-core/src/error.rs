use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Framing errors
    #[error("Frame too large: {size} bytes exceeds limit of {max_size} bytes")]
    FrameTooLarge { size: usize, max_size: usize },

    #[error("Stream ended with {len} bytes of an unterminated frame")]
    UnterminatedFrame { len: usize },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the error was raised by the peer closing the stream
    /// mid-frame rather than by a socket failure.
    pub fn is_unterminated(&self) -> bool {
        matches!(self, Error::UnterminatedFrame { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
