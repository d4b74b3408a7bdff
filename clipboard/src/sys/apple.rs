use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_app_kit::{NSPasteboard, NSPasteboardItem, NSPasteboardWriting};
use objc2_foundation::{NSArray, NSData, NSString, NSURL};

use crate::adapter::{
    FormatBinding, FormatTable, FormatTag, NativeAdapter, NativeSession, Payload, RawBlock,
};
use crate::{ClipboardError, ContentKind, Result, pathlist};

const UTF8_TEXT: FormatTag = FormatTag::Name("public.utf8-plain-text");
const PNG: FormatTag = FormatTag::Name("public.png");
const TIFF: FormatTag = FormatTag::Name("public.tiff");
const FILE_URL: FormatTag = FormatTag::Name("public.file-url");

static FORMATS: FormatTable = FormatTable::new(&[
    FormatBinding {
        kind: ContentKind::Text,
        write_tag: UTF8_TEXT,
        read_tags: &[UTF8_TEXT],
        payload: Payload::Utf8Text,
    },
    FormatBinding {
        kind: ContentKind::Image,
        write_tag: PNG,
        read_tags: &[PNG, TIFF],
        payload: Payload::EncodedImage,
    },
    FormatBinding {
        kind: ContentKind::FilePathList,
        write_tag: FILE_URL,
        read_tags: &[FILE_URL],
        payload: Payload::PathList,
    },
]);

/// Clipboard adapter for the macOS general pasteboard.
#[derive(Debug, Default)]
pub struct AppleAdapter(());

impl AppleAdapter {
    /// Create the adapter. The pasteboard is always present on macOS.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other platforms.
    pub const fn new() -> Result<Self> {
        Ok(Self(()))
    }
}

impl NativeAdapter for AppleAdapter {
    type Session = AppleSession;

    fn open(&self) -> Result<AppleSession> {
        Ok(AppleSession {
            pasteboard: unsafe { NSPasteboard::generalPasteboard() },
        })
    }

    fn change_count(&self) -> Result<u64> {
        let count = unsafe { NSPasteboard::generalPasteboard().changeCount() };
        u64::try_from(count)
            .map_err(|_| ClipboardError::Fail(format!("negative pasteboard change count {count}")))
    }

    fn formats(&self) -> &'static FormatTable {
        &FORMATS
    }
}

/// The general pasteboard, held for one broker call.
#[derive(Debug)]
pub struct AppleSession {
    pasteboard: Retained<NSPasteboard>,
}

impl AppleSession {
    fn file_paths(&self, file_url: &NSString) -> Vec<String> {
        let Some(items) = (unsafe { self.pasteboard.pasteboardItems() }) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| unsafe { item.stringForType(file_url) })
            .filter_map(|url| unsafe { NSURL::URLWithString(&url) })
            .filter_map(|url| unsafe { url.path() })
            .map(|path| path.to_string())
            .collect()
    }

    fn write_file_paths(&self, file_url: &NSString, paths: &[String]) -> Result<()> {
        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let url = unsafe { NSURL::fileURLWithPath(&NSString::from_str(path)) };
            let absolute = unsafe { url.absoluteString() }
                .ok_or_else(|| ClipboardError::PathList(format!("no file URL for {path}")))?;
            let item = unsafe { NSPasteboardItem::new() };
            if !unsafe { item.setString_forType(&absolute, file_url) } {
                return Err(ClipboardError::Fail(format!("pasteboard item rejected {path}")));
            }
            items.push(ProtocolObject::<dyn NSPasteboardWriting>::from_retained(item));
        }
        let objects = NSArray::from_retained_slice(&items);

        unsafe { self.pasteboard.clearContents() };
        if unsafe { self.pasteboard.writeObjects(&objects) } {
            Ok(())
        } else {
            Err(ClipboardError::Fail("pasteboard rejected file URLs".into()))
        }
    }
}

impl NativeSession for AppleSession {
    fn fetch(&mut self, tag: FormatTag) -> Result<Option<RawBlock>> {
        let FormatTag::Name(name) = tag else {
            return Err(ClipboardError::Unsupported(format!("format {tag}")));
        };
        let ty = NSString::from_str(name);
        match tag {
            UTF8_TEXT => Ok(unsafe { self.pasteboard.stringForType(&ty) }
                .map(|text| RawBlock(text.to_string().into_bytes()))),
            FILE_URL => {
                let paths = self.file_paths(&ty);
                Ok((!paths.is_empty()).then(|| RawBlock(pathlist::encode(&paths))))
            }
            _ => Ok(unsafe { self.pasteboard.dataForType(&ty) }.map(|data| RawBlock(data.to_vec()))),
        }
    }

    fn store(&mut self, tag: FormatTag, bytes: &[u8]) -> Result<()> {
        let FormatTag::Name(name) = tag else {
            return Err(ClipboardError::Unsupported(format!("format {tag}")));
        };
        let ty = NSString::from_str(name);
        let stored = match tag {
            UTF8_TEXT => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|err| ClipboardError::Text(err.to_string()))?;
                let text = NSString::from_str(text);
                unsafe { self.pasteboard.clearContents() };
                unsafe { self.pasteboard.setString_forType(&text, &ty) }
            }
            FILE_URL => return self.write_file_paths(&ty, &pathlist::decode(bytes)?),
            _ => {
                let data = NSData::with_bytes(bytes);
                unsafe { self.pasteboard.clearContents() };
                unsafe { self.pasteboard.setData_forType(Some(&data), &ty) }
            }
        };
        if stored {
            Ok(())
        } else {
            Err(ClipboardError::Fail(format!("pasteboard rejected {tag}")))
        }
    }

    fn has(&mut self, tag: FormatTag) -> Result<bool> {
        let FormatTag::Name(name) = tag else {
            return Ok(false);
        };
        let ty = NSString::from_str(name);
        let types = NSArray::from_retained_slice(&[ty]);
        Ok(unsafe { self.pasteboard.availableTypeFromArray(&types) }.is_some())
    }
}
