//! The seam between the broker and each platform clipboard.
//!
//! A [`NativeAdapter`] opens the platform store for the span of one broker
//! call and reports the change counter. The [`NativeSession`] it returns
//! copies blocks in and out, and closes the store when dropped, so no native
//! handle outlives the call that opened it.

use std::fmt;
use std::thread;

use crate::{ClipboardError, ContentKind, Result, RetryPolicy};

/// Platform identifier of one clipboard representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    /// Numeric format id, such as a Win32 `CF_*` value.
    Id(u32),
    /// Named type, such as a uniform type identifier or a MIME type.
    Name(&'static str),
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// How a native block encodes its content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Payload {
    /// UTF-8 text; adapters convert other encodings at the boundary.
    Utf8Text,
    /// A device-independent bitmap.
    Bitmap,
    /// A self-describing image container such as PNG or TIFF.
    EncodedImage,
    /// The path-list wire format (a JSON array of strings).
    PathList,
}

/// Binds a [`ContentKind`] to the tags that carry it on one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatBinding {
    /// Logical kind.
    pub kind: ContentKind,
    /// Tag written on store; usually the first read tag as well.
    pub write_tag: FormatTag,
    /// Tags tried, in order, on fetch.
    pub read_tags: &'static [FormatTag],
    /// Encoding of blocks under these tags.
    pub payload: Payload,
}

/// Static table of every binding an adapter supports.
#[derive(Debug, Clone, Copy)]
pub struct FormatTable {
    bindings: &'static [FormatBinding],
}

impl FormatTable {
    /// Wrap a static binding list.
    #[must_use]
    pub const fn new(bindings: &'static [FormatBinding]) -> Self {
        Self { bindings }
    }

    /// Binding for `kind`, if this platform supports it.
    #[must_use]
    pub fn binding(&self, kind: ContentKind) -> Option<&'static FormatBinding> {
        self.bindings.iter().find(|binding| binding.kind == kind)
    }

    /// All bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &'static FormatBinding> {
        self.bindings.iter()
    }
}

/// An owned copy of one native clipboard block.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct RawBlock(pub Vec<u8>);

impl RawBlock {
    /// The copied bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the block and return its bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for RawBlock {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for RawBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBlock")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// A platform clipboard.
pub trait NativeAdapter: Send + Sync + 'static {
    /// The open store. Dropping it closes the store.
    type Session: NativeSession;

    /// Open the store for one call.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError::Unavailable`] when another process holds
    /// the store, and any other variant for permanent failures.
    fn open(&self) -> Result<Self::Session>;

    /// The platform change counter. It moves whenever the content changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be sampled.
    fn change_count(&self) -> Result<u64>;

    /// Tags supported by this platform.
    fn formats(&self) -> &'static FormatTable;
}

/// An open platform clipboard.
pub trait NativeSession {
    /// Copy out the block stored under `tag`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the block exists but cannot be read.
    fn fetch(&mut self, tag: FormatTag) -> Result<Option<RawBlock>>;

    /// Clear the store and write `bytes` under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError::Fail`] if the store rejects the write.
    fn store(&mut self, tag: FormatTag, bytes: &[u8]) -> Result<()>;

    /// Whether a block is stored under `tag`.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`fetch`](Self::fetch).
    fn has(&mut self, tag: FormatTag) -> Result<bool> {
        Ok(self.fetch(tag)?.is_some())
    }
}

/// Open `adapter`, retrying while it reports [`ClipboardError::Unavailable`].
///
/// # Errors
///
/// Returns [`ClipboardError::Unavailable`] carrying the attempt count once the
/// budget runs out. Other errors are returned immediately.
pub fn open_with_retry<A: NativeAdapter>(adapter: &A, policy: &RetryPolicy) -> Result<A::Session> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match adapter.open() {
            Ok(session) => return Ok(session),
            Err(ClipboardError::Unavailable { .. }) if attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                log::debug!("clipboard busy (attempt {attempt}/{max_attempts}), retrying in {delay:?}");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(ClipboardError::Unavailable { .. }) => {
                return Err(ClipboardError::Unavailable { attempts: attempt });
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: FormatTag = FormatTag::Name("text/plain");
    static TABLE: FormatTable = FormatTable::new(&[FormatBinding {
        kind: ContentKind::Text,
        write_tag: TEXT,
        read_tags: &[TEXT],
        payload: Payload::Utf8Text,
    }]);

    #[test]
    fn looks_up_bindings_by_kind() {
        let binding = TABLE.binding(ContentKind::Text).unwrap();
        assert_eq!(binding.write_tag, TEXT);
        assert!(TABLE.binding(ContentKind::Image).is_none());
        assert_eq!(TABLE.iter().count(), 1);
    }

    #[test]
    fn tags_display_readably() {
        assert_eq!(FormatTag::Id(13).to_string(), "#13");
        assert_eq!(TEXT.to_string(), "text/plain");
    }

    #[test]
    fn raw_block_debug_hides_bytes() {
        let block = RawBlock::from(vec![1, 2, 3]);
        assert_eq!(format!("{block:?}"), "RawBlock { len: 3, .. }");
    }
}
