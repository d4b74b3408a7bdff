use thiserror::Error;

/// Errors produced while decoding or encoding bitmap payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitmapError {
    /// The header declares a bit depth other than 24 or 32.
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),
    /// The buffer ends before the header or pixel rows it declares.
    #[error("bitmap truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Number of bytes the header requires.
        expected: usize,
        /// Number of bytes actually available.
        actual: usize,
    },
    /// The header is internally inconsistent or uses an unsupported layout.
    #[error("malformed bitmap header: {0}")]
    MalformedHeader(String),
    /// Pixmap dimensions do not match its pixel buffer.
    #[error("invalid pixmap: {0}")]
    InvalidPixmap(String),
}

/// Result alias for bitmap operations.
pub type Result<T, E = BitmapError> = std::result::Result<T, E>;
