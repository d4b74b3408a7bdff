//! Clipboard format broker.
//!
//! This crate moves three logical kinds of content (text, images and
//! file-path lists) between callers and the native clipboard of the host
//! platform. Each platform stores these kinds under its own format tags and
//! encodings; the [`Broker`] hides that behind a uniform byte interface:
//!
//! - text crosses the API as UTF-8,
//! - images cross as PNG and are transcoded to native bitmaps internally,
//! - path lists cross as a JSON array of strings.
//!
//! ```no_run
//! use clipkit_clipboard::{CancelHandle, ContentKind};
//! use futures::StreamExt;
//!
//! # async fn demo() -> clipkit_clipboard::Result<()> {
//! let broker = clipkit_clipboard::init()?;
//! broker.write_text("copied")?;
//!
//! let (cancel, token) = CancelHandle::new();
//! let mut changes = broker.watch(ContentKind::Text, token)?;
//! if let Some(text) = changes.next().await {
//!     println!("clipboard now holds {}", String::from_utf8_lossy(&text));
//! }
//! cancel.cancel();
//! # Ok(())
//! # }
//! ```

use std::fmt;

mod adapter;
mod broker;
mod config;
mod error;
pub mod pathlist;
pub mod png;
mod shutdown;
mod signal;
pub mod sys;
mod watch;

pub use adapter::{
    FormatBinding, FormatTable, FormatTag, NativeAdapter, NativeSession, Payload, RawBlock,
    open_with_retry,
};
pub use broker::Broker;
pub use config::{BrokerConfig, RetryPolicy};
pub use error::{ClipboardError, Result};
pub use shutdown::{CancelHandle, CancelToken};
pub use signal::ChangeSignal;
pub use sys::SystemAdapter;
pub use watch::{WatchState, WatchStream, Watcher};

/// Logical kind of clipboard content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// UTF-8 text.
    Text,
    /// An image, exchanged as PNG.
    Image,
    /// A list of file-system paths, exchanged as a JSON array.
    FilePathList,
}

impl ContentKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 3] = [Self::Text, Self::Image, Self::FilePathList];
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::FilePathList => "file path list",
        })
    }
}

/// Content read from the clipboard, tagged with its kind.
#[derive(Clone, PartialEq, Eq)]
pub struct ClipboardContent {
    /// Kind of the content.
    pub kind: ContentKind,
    /// Bytes in the broker's interchange encoding for `kind`.
    pub data: Vec<u8>,
}

impl fmt::Debug for ClipboardContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardContent")
            .field("kind", &self.kind)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Create a broker for the host clipboard with the default configuration.
///
/// # Errors
///
/// Returns [`ClipboardError::Unsupported`] on platforms without a clipboard
/// adapter, or an error if the native clipboard cannot be reached.
pub fn init() -> Result<Broker<SystemAdapter>> {
    init_with(BrokerConfig::default())
}

/// Create a broker for the host clipboard with a custom configuration.
///
/// # Errors
///
/// See [`init`].
pub fn init_with(config: BrokerConfig) -> Result<Broker<SystemAdapter>> {
    let adapter = SystemAdapter::new()?;
    log::info!("clipboard broker ready");
    Ok(Broker::new(adapter, config))
}

/// Get text from the clipboard.
///
/// # Errors
///
/// Returns an error if the clipboard cannot be opened or holds invalid text.
pub fn get_text() -> Result<Option<String>> {
    init()?.read_text()
}

/// Replace the clipboard content with `text`.
///
/// # Errors
///
/// Returns an error if the clipboard cannot be opened or rejects the write.
pub fn set_text(text: &str) -> Result<()> {
    init()?.write_text(text).map(drop)
}

/// Get the clipboard image as PNG bytes.
///
/// # Errors
///
/// Returns an error if the clipboard cannot be opened or the image cannot be
/// decoded.
pub fn get_image() -> Result<Option<Vec<u8>>> {
    init()?.read(ContentKind::Image)
}

/// Replace the clipboard content with a PNG image.
///
/// # Errors
///
/// Returns [`ClipboardError::Image`] if `png` is not a valid PNG, or an
/// error from the native clipboard.
pub fn set_image(png: &[u8]) -> Result<()> {
    init()?.write(ContentKind::Image, png).map(drop)
}

/// Get the list of file paths on the clipboard.
///
/// # Errors
///
/// Returns an error if the clipboard cannot be opened or the list is
/// malformed.
pub fn get_files() -> Result<Option<Vec<String>>> {
    init()?.read_paths()
}

/// Replace the clipboard content with a list of file paths.
///
/// # Errors
///
/// Returns an error if the clipboard cannot be opened or rejects the write.
pub fn set_files<S: AsRef<str>>(paths: &[S]) -> Result<()> {
    init()?.write_paths(paths).map(drop)
}
