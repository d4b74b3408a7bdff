use std::marker::PhantomData;
use std::ptr;

use windows::Win32::Foundation::{GlobalFree, HANDLE, HGLOBAL};
use windows::Win32::System::DataExchange::{
    CloseClipboard, EmptyClipboard, GetClipboardData, GetClipboardSequenceNumber,
    IsClipboardFormatAvailable, OpenClipboard, SetClipboardData,
};
use windows::Win32::System::Memory::{
    GMEM_MOVEABLE, GlobalAlloc, GlobalLock, GlobalSize, GlobalUnlock,
};

use crate::adapter::{
    FormatBinding, FormatTable, FormatTag, NativeAdapter, NativeSession, Payload, RawBlock,
};
use crate::{ClipboardError, ContentKind, Result, pathlist};

const CF_DIB: u32 = 8;
const CF_UNICODETEXT: u32 = 13;
const CF_HDROP: u32 = 15;
const CF_DIBV5: u32 = 17;

static FORMATS: FormatTable = FormatTable::new(&[
    FormatBinding {
        kind: ContentKind::Text,
        write_tag: FormatTag::Id(CF_UNICODETEXT),
        read_tags: &[FormatTag::Id(CF_UNICODETEXT)],
        payload: Payload::Utf8Text,
    },
    FormatBinding {
        kind: ContentKind::Image,
        write_tag: FormatTag::Id(CF_DIB),
        read_tags: &[FormatTag::Id(CF_DIBV5), FormatTag::Id(CF_DIB)],
        payload: Payload::Bitmap,
    },
    FormatBinding {
        kind: ContentKind::FilePathList,
        write_tag: FormatTag::Id(CF_HDROP),
        read_tags: &[FormatTag::Id(CF_HDROP)],
        payload: Payload::PathList,
    },
]);

/// Clipboard adapter for the Win32 clipboard.
#[derive(Debug, Default)]
pub struct WindowsAdapter(());

impl WindowsAdapter {
    /// Create the adapter.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other platforms.
    pub const fn new() -> Result<Self> {
        Ok(Self(()))
    }
}

impl NativeAdapter for WindowsAdapter {
    type Session = WindowsSession;

    fn open(&self) -> Result<WindowsSession> {
        unsafe { OpenClipboard(None) }.map_err(|err| {
            log::trace!("OpenClipboard failed: {err}");
            ClipboardError::Unavailable { attempts: 1 }
        })?;
        Ok(WindowsSession {
            _thread_bound: PhantomData,
        })
    }

    fn change_count(&self) -> Result<u64> {
        Ok(u64::from(unsafe { GetClipboardSequenceNumber() }))
    }

    fn formats(&self) -> &'static FormatTable {
        &FORMATS
    }
}

/// The open Win32 clipboard. Closed on drop, on the thread that opened it.
#[derive(Debug)]
pub struct WindowsSession {
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for WindowsSession {
    fn drop(&mut self) {
        if let Err(err) = unsafe { CloseClipboard() } {
            log::warn!("CloseClipboard failed: {err}");
        }
    }
}

impl NativeSession for WindowsSession {
    fn fetch(&mut self, tag: FormatTag) -> Result<Option<RawBlock>> {
        let id = format_id(tag)?;
        if unsafe { IsClipboardFormatAvailable(id) }.is_err() {
            return Ok(None);
        }
        let handle = unsafe { GetClipboardData(id) }
            .map_err(|err| ClipboardError::Fail(format!("GetClipboardData({id}): {err}")))?;
        let bytes = LockedMemory::lock(HGLOBAL(handle.0))?.to_vec();

        match id {
            CF_UNICODETEXT => {
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .take_while(|unit| *unit != 0)
                    .collect::<Vec<_>>();
                let text = String::from_utf16(&units)
                    .map_err(|err| ClipboardError::Text(err.to_string()))?;
                Ok(Some(RawBlock(text.into_bytes())))
            }
            CF_HDROP => {
                let paths = pathlist::from_drop_files(&bytes)?;
                Ok((!paths.is_empty()).then(|| RawBlock(pathlist::encode(&paths))))
            }
            _ => Ok(Some(RawBlock(bytes))),
        }
    }

    fn store(&mut self, tag: FormatTag, bytes: &[u8]) -> Result<()> {
        let id = format_id(tag)?;
        let native = match id {
            CF_UNICODETEXT => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|err| ClipboardError::Text(err.to_string()))?;
                text.encode_utf16()
                    .chain(Some(0))
                    .flat_map(u16::to_le_bytes)
                    .collect()
            }
            CF_HDROP => pathlist::to_drop_files(&pathlist::decode(bytes)?),
            _ => bytes.to_vec(),
        };
        let buffer = GlobalBuffer::with_bytes(&native)?;

        unsafe { EmptyClipboard() }
            .map_err(|err| ClipboardError::Fail(format!("EmptyClipboard: {err}")))?;
        buffer.hand_over(id)
    }

    fn has(&mut self, tag: FormatTag) -> Result<bool> {
        Ok(unsafe { IsClipboardFormatAvailable(format_id(tag)?) }.is_ok())
    }
}

fn format_id(tag: FormatTag) -> Result<u32> {
    match tag {
        FormatTag::Id(id) => Ok(id),
        FormatTag::Name(name) => Err(ClipboardError::Unsupported(format!("format {name}"))),
    }
}

/// A locked global memory block, unlocked on drop.
struct LockedMemory {
    handle: HGLOBAL,
    ptr: *const u8,
    len: usize,
}

impl LockedMemory {
    fn lock(handle: HGLOBAL) -> Result<Self> {
        let ptr = unsafe { GlobalLock(handle) };
        if ptr.is_null() {
            return Err(ClipboardError::Fail("GlobalLock returned null".into()));
        }
        Ok(Self {
            handle,
            ptr: ptr.cast_const().cast(),
            len: unsafe { GlobalSize(handle) },
        })
    }

    fn to_vec(&self) -> Vec<u8> {
        // GlobalSize reports the allocation size, valid while locked.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }.to_vec()
    }
}

impl Drop for LockedMemory {
    fn drop(&mut self) {
        // Fails with NO_ERROR once the lock count reaches zero.
        let _ = unsafe { GlobalUnlock(self.handle) };
    }
}

/// A movable global allocation, freed on drop unless the clipboard took it.
struct GlobalBuffer {
    handle: Option<HGLOBAL>,
}

impl GlobalBuffer {
    fn with_bytes(bytes: &[u8]) -> Result<Self> {
        let handle = unsafe { GlobalAlloc(GMEM_MOVEABLE, bytes.len().max(1)) }
            .map_err(|err| ClipboardError::Fail(format!("GlobalAlloc: {err}")))?;
        let buffer = Self {
            handle: Some(handle),
        };
        let ptr = unsafe { GlobalLock(handle) };
        if ptr.is_null() {
            return Err(ClipboardError::Fail("GlobalLock returned null".into()));
        }
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            let _ = GlobalUnlock(handle);
        }
        Ok(buffer)
    }

    fn hand_over(mut self, id: u32) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Err(ClipboardError::Fail("global buffer already released".into()));
        };
        match unsafe { SetClipboardData(id, Some(HANDLE(handle.0))) } {
            Ok(_) => Ok(()),
            Err(err) => {
                self.handle = Some(handle);
                Err(ClipboardError::Fail(format!("SetClipboardData({id}): {err}")))
            }
        }
    }
}

impl Drop for GlobalBuffer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = unsafe { GlobalFree(Some(handle)) };
        }
    }
}
