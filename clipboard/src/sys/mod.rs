//! Platform clipboard adapters.
//!
//! [`SystemAdapter`] names the adapter for the build target. The in-memory
//! adapter is available everywhere.

pub mod memory;

#[cfg(target_os = "linux")]
/// Linux backend built on `arboard`.
pub mod desktop;
#[cfg(target_os = "linux")]
pub use desktop::DesktopAdapter as SystemAdapter;

#[cfg(target_os = "macos")]
/// macOS backend built on `NSPasteboard`.
pub mod apple;
#[cfg(target_os = "macos")]
pub use apple::AppleAdapter as SystemAdapter;

#[cfg(target_os = "windows")]
/// Windows backend built on the Win32 clipboard.
pub mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::WindowsAdapter as SystemAdapter;

// Fallback for docs or other platforms
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod unsupported {
    use crate::adapter::{FormatTable, FormatTag, NativeAdapter, NativeSession, RawBlock};
    use crate::{ClipboardError, Result};

    static FORMATS: FormatTable = FormatTable::new(&[]);

    /// Placeholder adapter for targets without a clipboard backend.
    #[derive(Debug)]
    pub struct UnsupportedAdapter(());

    impl UnsupportedAdapter {
        /// Always fails on this target.
        ///
        /// # Errors
        ///
        /// Always returns [`ClipboardError::Unsupported`].
        pub fn new() -> Result<Self> {
            Err(ClipboardError::Unsupported("no clipboard on this target".into()))
        }
    }

    /// Session type that can never be constructed.
    #[derive(Debug)]
    pub enum NoSession {}

    impl NativeSession for NoSession {
        fn fetch(&mut self, _tag: FormatTag) -> Result<Option<RawBlock>> {
            match *self {}
        }

        fn store(&mut self, _tag: FormatTag, _bytes: &[u8]) -> Result<()> {
            match *self {}
        }
    }

    impl NativeAdapter for UnsupportedAdapter {
        type Session = NoSession;

        fn open(&self) -> Result<NoSession> {
            Err(ClipboardError::Unsupported("no clipboard on this target".into()))
        }

        fn change_count(&self) -> Result<u64> {
            Err(ClipboardError::Unsupported("no clipboard on this target".into()))
        }

        fn formats(&self) -> &'static FormatTable {
            &FORMATS
        }
    }
}
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub use unsupported::UnsupportedAdapter as SystemAdapter;
