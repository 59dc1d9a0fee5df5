//! Frame codec errors.

use thiserror::Error;

/// Failures decoding or encoding push frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The bytes do not parse as the expected structure.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// The envelope payload is not valid gzip.
    #[error("payload decompression failed: {0}")]
    Decompression(#[source] std::io::Error),
    /// Building an outbound frame failed.
    #[error("frame encoding failed: {0}")]
    Encode(String),
}

impl From<prost::DecodeError> for FrameError {
    fn from(err: prost::DecodeError) -> Self {
        Self::MalformedFrame(err.to_string())
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, FrameError>;
