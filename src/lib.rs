//! # Clipkit
//!
//! Uniform read, write and watch access to the operating system clipboard.
//!
//! Clipkit brokers three logical content kinds (text, images and file-path
//! lists) onto the native clipboard of each platform: the `NSPasteboard` on
//! macOS, the Win32 clipboard on Windows and an `arboard` backed store on
//! Linux. Images cross the API as PNG bytes and are transcoded to the
//! clipboard's native bitmap layout internally.
//!
//! ## Features
//!
//! - `clipboard`: the format broker and its native adapters (default).
//! - `bitmap`: the standalone DIB/BMP bitmap codec.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! clipkit = { version = "0.1", features = ["full"] }
//! ```
//!
//! ```rust,no_run
//! use clipkit::clipboard::{self, ContentKind};
//!
//! fn copy_greeting() -> Result<(), clipboard::ClipboardError> {
//!     let broker = clipboard::init()?;
//!     broker.write(ContentKind::Text, "hello".as_bytes())?;
//!     assert_eq!(broker.read_text()?.as_deref(), Some("hello"));
//!     Ok(())
//! }
//! ```

#[cfg(feature = "clipboard")]
pub use clipkit_clipboard as clipboard;

#[cfg(feature = "bitmap")]
pub use clipkit_bitmap as bitmap;
