use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use arboard::{Clipboard, ImageData};
use clipkit_bitmap::Pixmap;

use crate::adapter::{
    FormatBinding, FormatTable, FormatTag, NativeAdapter, NativeSession, Payload, RawBlock,
};
use crate::{ClipboardError, ContentKind, Result};

const TEXT: FormatTag = FormatTag::Name("text/plain;charset=utf-8");
const BITMAP: FormatTag = FormatTag::Name("image/bmp");

static FORMATS: FormatTable = FormatTable::new(&[
    FormatBinding {
        kind: ContentKind::Text,
        write_tag: TEXT,
        read_tags: &[TEXT],
        payload: Payload::Utf8Text,
    },
    FormatBinding {
        kind: ContentKind::Image,
        write_tag: BITMAP,
        read_tags: &[BITMAP],
        payload: Payload::Bitmap,
    },
]);

#[derive(Debug, Default)]
struct Fingerprint {
    last: Option<u64>,
    counter: u64,
}

impl Fingerprint {
    /// Record the latest content hash; the counter moves only when it differs.
    fn observe(&mut self, hash: u64) -> u64 {
        if self.last.is_some_and(|last| last != hash) {
            self.counter += 1;
        }
        self.last = Some(hash);
        self.counter
    }
}

/// Hash what the clipboard currently holds. Absent content hashes like an
/// empty slot; any other read error is returned so it cannot pose as a change.
fn content_hash(
    text: std::result::Result<String, arboard::Error>,
    image: std::result::Result<ImageData<'_>, arboard::Error>,
) -> Result<u64> {
    let text = absent_as_none(text)?;
    let image = absent_as_none(image)?;

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    if let Some(image) = image {
        (image.width, image.height).hash(&mut hasher);
        image.bytes.hash(&mut hasher);
    }
    Ok(hasher.finish())
}

/// Clipboard adapter backed by `arboard`.
///
/// The X11 and Wayland clipboards expose no change counter, so one is
/// synthesized from a hash of the current content.
#[derive(Debug, Default)]
pub struct DesktopAdapter {
    fingerprint: Mutex<Fingerprint>,
}

impl DesktopAdapter {
    /// Connect to the desktop clipboard.
    ///
    /// # Errors
    ///
    /// Returns an error if no clipboard is reachable, for example without a
    /// display server.
    pub fn new() -> Result<Self> {
        drop(Clipboard::new().map_err(map_error)?);
        Ok(Self::default())
    }
}

impl NativeAdapter for DesktopAdapter {
    type Session = DesktopSession;

    fn open(&self) -> Result<DesktopSession> {
        Ok(DesktopSession {
            clipboard: Clipboard::new().map_err(map_error)?,
        })
    }

    fn change_count(&self) -> Result<u64> {
        let mut clipboard = Clipboard::new().map_err(map_error)?;
        let hash = content_hash(clipboard.get_text(), clipboard.get_image())?;
        Ok(self
            .fingerprint
            .lock()
            .expect("fingerprint mutex poisoned")
            .observe(hash))
    }

    fn formats(&self) -> &'static FormatTable {
        &FORMATS
    }
}

/// An open `arboard` clipboard.
pub struct DesktopSession {
    clipboard: Clipboard,
}

impl std::fmt::Debug for DesktopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopSession").finish_non_exhaustive()
    }
}

impl NativeSession for DesktopSession {
    fn fetch(&mut self, tag: FormatTag) -> Result<Option<RawBlock>> {
        match tag {
            TEXT => absent_as_none(self.clipboard.get_text())
                .map(|text| text.map(|text| RawBlock(text.into_bytes()))),
            BITMAP => {
                let Some(image) = absent_as_none(self.clipboard.get_image())? else {
                    return Ok(None);
                };
                let pixmap = Pixmap::new(
                    dimension(image.width)?,
                    dimension(image.height)?,
                    image.bytes.into_owned(),
                )?;
                let (_, dib) = clipkit_bitmap::encode(&pixmap);
                Ok(Some(RawBlock(dib)))
            }
            other => Err(ClipboardError::Unsupported(format!("format {other}"))),
        }
    }

    fn store(&mut self, tag: FormatTag, bytes: &[u8]) -> Result<()> {
        match tag {
            TEXT => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|err| ClipboardError::Text(err.to_string()))?;
                self.clipboard.set_text(text).map_err(map_error)
            }
            BITMAP => {
                let pixmap = clipkit_bitmap::decode(bytes)?;
                let image = ImageData {
                    width: pixmap.width() as usize,
                    height: pixmap.height() as usize,
                    bytes: Cow::Owned(pixmap.into_raw()),
                };
                self.clipboard.set_image(image).map_err(map_error)
            }
            other => Err(ClipboardError::Unsupported(format!("format {other}"))),
        }
    }
}

fn absent_as_none<T>(result: std::result::Result<T, arboard::Error>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(arboard::Error::ContentNotAvailable) => Ok(None),
        Err(err) => Err(map_error(err)),
    }
}

fn dimension(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| ClipboardError::Image(format!("dimension {value} too large")))
}

fn map_error(err: arboard::Error) -> ClipboardError {
    match err {
        arboard::Error::ClipboardOccupied => ClipboardError::Unavailable { attempts: 1 },
        arboard::Error::ClipboardNotSupported => {
            ClipboardError::Unsupported("clipboard not supported by this session".into())
        }
        other => ClipboardError::Fail(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(bytes: &[u8]) -> ImageData<'_> {
        ImageData {
            width: 1,
            height: 1,
            bytes: Cow::Borrowed(bytes),
        }
    }

    #[test]
    fn same_content_hashes_alike() {
        let first = content_hash(Ok("a".into()), Ok(image(&[1, 2, 3, 4]))).unwrap();
        let second = content_hash(Ok("a".into()), Ok(image(&[1, 2, 3, 4]))).unwrap();
        assert_eq!(first, second);

        let other = content_hash(Ok("a".into()), Ok(image(&[1, 2, 3, 5]))).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn missing_content_hashes_as_empty() {
        let absent = content_hash(
            Err(arboard::Error::ContentNotAvailable),
            Err(arboard::Error::ContentNotAvailable),
        )
        .unwrap();
        let text = content_hash(Ok("a".into()), Err(arboard::Error::ContentNotAvailable)).unwrap();
        assert_ne!(absent, text);
        assert_eq!(
            absent,
            content_hash(
                Err(arboard::Error::ContentNotAvailable),
                Err(arboard::Error::ContentNotAvailable),
            )
            .unwrap()
        );
    }

    #[test]
    fn busy_clipboard_is_not_a_change() {
        assert_eq!(
            content_hash(Err(arboard::Error::ClipboardOccupied), Ok(image(&[0; 4]))),
            Err(ClipboardError::Unavailable { attempts: 1 })
        );
        assert!(matches!(
            content_hash(
                Ok("a".into()),
                Err(arboard::Error::ConversionFailure),
            ),
            Err(ClipboardError::Fail(_))
        ));
    }

    #[test]
    fn counter_moves_only_on_new_hashes() {
        let mut fingerprint = Fingerprint::default();
        assert_eq!(fingerprint.observe(7), 0);
        assert_eq!(fingerprint.observe(7), 0);
        assert_eq!(fingerprint.observe(8), 1);
        assert_eq!(fingerprint.observe(8), 1);
        assert_eq!(fingerprint.observe(7), 2);
    }
}
