use clipkit_bitmap::BitmapError;
use thiserror::Error;

/// Errors that can occur while brokering clipboard content.
///
/// Absent content is not an error: reads return `Ok(None)` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    /// The clipboard stayed held by another process for every retry.
    #[error("clipboard unavailable after {attempts} attempts")]
    Unavailable {
        /// Number of open attempts made.
        attempts: u32,
    },
    /// The platform or adapter cannot handle the request.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// A native bitmap could not be decoded or encoded.
    #[error(transparent)]
    Bitmap(#[from] BitmapError),
    /// PNG decoding or encoding failed.
    #[error("image codec error: {0}")]
    Image(String),
    /// A path list was malformed, either on the wire or natively.
    #[error("invalid path list: {0}")]
    PathList(String),
    /// Text was not valid UTF-8 or UTF-16.
    #[error("invalid text: {0}")]
    Text(String),
    /// The native clipboard rejected an operation.
    #[error("clipboard operation failed: {0}")]
    Fail(String),
    /// The broker has been shut down.
    #[error("broker has been shut down")]
    ShutDown,
}

/// Result alias for clipboard operations.
pub type Result<T, E = ClipboardError> = std::result::Result<T, E>;
