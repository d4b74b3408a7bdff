//! An in-process clipboard.
//!
//! [`MemoryAdapter`] behaves like a native clipboard with a single owner:
//! each store replaces everything, and the change counter moves on every
//! store. It also exposes hooks to script the counter and to simulate a
//! clipboard held by another process, which makes broker behaviour
//! reproducible in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::adapter::{
    FormatBinding, FormatTable, FormatTag, NativeAdapter, NativeSession, Payload, RawBlock,
};
use crate::{ClipboardError, ContentKind, Result};

/// Tag for UTF-8 text.
pub const TEXT: FormatTag = FormatTag::Name("text/plain;charset=utf-8");
/// Tag for device-independent bitmaps.
pub const BITMAP: FormatTag = FormatTag::Name("image/bmp");
/// Tag for path lists in wire form.
pub const PATH_LIST: FormatTag = FormatTag::Name("text/uri-list");

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
    FormatBinding {
        kind: ContentKind::FilePathList,
        write_tag: PATH_LIST,
        read_tags: &[PATH_LIST],
        payload: Payload::PathList,
    },
]);

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<FormatTag, Vec<u8>>,
    counter: u64,
    script: VecDeque<u64>,
    busy_opens: u32,
    open_attempts: u32,
    stores: u32,
    fail_next_store: Option<String>,
    fail_counter: Option<ClipboardError>,
}

/// In-memory clipboard shared by all of its clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryAdapter {
    /// An empty clipboard with counter zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory clipboard mutex poisoned")
    }

    /// Replay `counts` from [`change_count`](NativeAdapter::change_count),
    /// one per call. The last value repeats once the script runs out.
    #[must_use]
    pub fn with_counter_script(self, counts: impl IntoIterator<Item = u64>) -> Self {
        self.lock().script = counts.into_iter().collect();
        self
    }

    /// Make the next `n` opens report [`ClipboardError::Unavailable`].
    pub fn set_busy_opens(&self, n: u32) {
        self.lock().busy_opens = n;
    }

    /// Total open attempts so far, successful or not.
    #[must_use]
    pub fn open_attempts(&self) -> u32 {
        self.lock().open_attempts
    }

    /// Total successful stores so far.
    #[must_use]
    pub fn store_count(&self) -> u32 {
        self.lock().stores
    }

    /// Make the next store fail with [`ClipboardError::Fail`].
    pub fn fail_next_store(&self, reason: impl Into<String>) {
        self.lock().fail_next_store = Some(reason.into());
    }

    /// Make every later counter sample fail with `err`.
    pub fn fail_counter(&self, err: ClipboardError) {
        self.lock().fail_counter = Some(err);
    }

    /// Replace the content as another application would.
    pub fn insert_external(&self, tag: FormatTag, bytes: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state.entries.clear();
        state.entries.insert(tag, bytes.into());
        state.counter += 1;
    }

    /// Remove all content as another application would.
    pub fn clear_external(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.counter += 1;
    }

    /// Raw bytes stored under `tag`.
    #[must_use]
    pub fn contents(&self, tag: FormatTag) -> Option<Vec<u8>> {
        self.lock().entries.get(&tag).cloned()
    }
}

impl NativeAdapter for MemoryAdapter {
    type Session = MemorySession;

    fn open(&self) -> Result<MemorySession> {
        let mut state = self.lock();
        state.open_attempts += 1;
        if state.busy_opens > 0 {
            state.busy_opens -= 1;
            return Err(ClipboardError::Unavailable { attempts: 1 });
        }
        Ok(MemorySession {
            state: Arc::clone(&self.state),
        })
    }

    fn change_count(&self) -> Result<u64> {
        let mut state = self.lock();
        if let Some(err) = &state.fail_counter {
            return Err(err.clone());
        }
        match state.script.len() {
            0 => Ok(state.counter),
            1 => Ok(state.script[0]),
            _ => Ok(state.script.pop_front().unwrap_or_default()),
        }
    }

    fn formats(&self) -> &'static FormatTable {
        &FORMATS
    }
}

/// An open [`MemoryAdapter`].
#[derive(Debug)]
pub struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
}

impl NativeSession for MemorySession {
    fn fetch(&mut self, tag: FormatTag) -> Result<Option<RawBlock>> {
        let state = self.state.lock().expect("memory clipboard mutex poisoned");
        Ok(state.entries.get(&tag).cloned().map(RawBlock))
    }

    fn store(&mut self, tag: FormatTag, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock().expect("memory clipboard mutex poisoned");
        if let Some(reason) = state.fail_next_store.take() {
            return Err(ClipboardError::Fail(format!("store {tag} rejected: {reason}")));
        }
        state.entries.clear();
        state.entries.insert(tag, bytes.to_vec());
        state.counter += 1;
        state.stores += 1;
        Ok(())
    }

    fn has(&mut self, tag: FormatTag) -> Result<bool> {
        let state = self.state.lock().expect("memory clipboard mutex poisoned");
        Ok(state.entries.contains_key(&tag))
    }
}
