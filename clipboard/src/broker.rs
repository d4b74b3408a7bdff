//! The format broker: maps logical content kinds onto native formats.

use std::fmt;
use std::sync::Arc;

use clipkit_bitmap::file;

use crate::adapter::{NativeAdapter, NativeSession, Payload, open_with_retry};
use crate::watch::{self, WatchStream};
use crate::{
    BrokerConfig, CancelHandle, CancelToken, ChangeSignal, ClipboardContent, ClipboardError,
    ContentKind, Result, RetryPolicy, pathlist, png,
};

/// Order in which [`Broker::watch_any`] probes kinds after a change.
const PROBE_ORDER: [ContentKind; 3] = [
    ContentKind::FilePathList,
    ContentKind::Image,
    ContentKind::Text,
];

/// Reads, writes and watches clipboard content through a [`NativeAdapter`].
///
/// Content crosses the broker in one interchange encoding per kind: UTF-8
/// for text, PNG for images and a JSON string array for path lists.
///
/// Dropping the broker, or calling [`shutdown`](Self::shutdown), stops every
/// watch session and change signal it started.
pub struct Broker<A: NativeAdapter> {
    adapter: Arc<A>,
    config: BrokerConfig,
    shutdown: CancelHandle,
}

impl<A: NativeAdapter> Broker<A> {
    /// Create a broker over `adapter`.
    pub fn new(adapter: A, config: BrokerConfig) -> Self {
        Self::from_shared(Arc::new(adapter), config)
    }

    /// Create a broker over an adapter shared with other owners.
    pub fn from_shared(adapter: Arc<A>, config: BrokerConfig) -> Self {
        let (shutdown, _) = CancelHandle::new();
        Self {
            adapter,
            config,
            shutdown,
        }
    }

    /// The underlying adapter.
    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Read the content of `kind`, or `None` if the clipboard holds none.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError::Unsupported`] if this platform has no
    /// format for `kind`, or an error if the clipboard cannot be opened or
    /// its content cannot be decoded.
    pub fn read(&self, kind: ContentKind) -> Result<Option<Vec<u8>>> {
        self.ensure_running()?;
        read_kind(&*self.adapter, &self.config.retry, kind)
    }

    /// Replace the clipboard content with `bytes` of `kind`.
    ///
    /// The payload is converted to its native form before the clipboard is
    /// opened, so invalid input leaves the clipboard untouched. Writing an
    /// empty path list changes nothing.
    ///
    /// # Errors
    ///
    /// Returns a codec error for invalid input, or an error from the native
    /// clipboard.
    pub fn write(&self, kind: ContentKind, bytes: &[u8]) -> Result<ChangeSignal> {
        self.ensure_running()?;
        let binding = self
            .adapter
            .formats()
            .binding(kind)
            .ok_or_else(|| unsupported(kind))?;

        if let Some(native) = prepare(binding.payload, bytes)? {
            let mut session = open_with_retry(&*self.adapter, &self.config.retry)?;
            session.store(binding.write_tag, &native)?;
            log::debug!(
                "stored {} bytes of {kind} as {}",
                native.len(),
                binding.write_tag
            );
        } else {
            log::debug!("empty {kind} write left the clipboard unchanged");
        }

        let baseline = self.adapter.change_count()?;
        let adapter = Arc::clone(&self.adapter);
        ChangeSignal::spawn(
            self.config.poll_interval,
            vec![self.shutdown.token()],
            baseline,
            move || adapter.change_count(),
        )
    }

    /// Read text from the clipboard.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn read_text(&self) -> Result<Option<String>> {
        self.read(ContentKind::Text)?
            .map(|bytes| String::from_utf8(bytes).map_err(|err| ClipboardError::Text(err.to_string())))
            .transpose()
    }

    /// Replace the clipboard content with `text`.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub fn write_text(&self, text: &str) -> Result<ChangeSignal> {
        self.write(ContentKind::Text, text.as_bytes())
    }

    /// Read the list of file paths on the clipboard.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn read_paths(&self) -> Result<Option<Vec<String>>> {
        self.read(ContentKind::FilePathList)?
            .map(|bytes| pathlist::decode(&bytes))
            .transpose()
    }

    /// Replace the clipboard content with a list of file paths.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub fn write_paths<S: AsRef<str>>(&self, paths: &[S]) -> Result<ChangeSignal> {
        self.write(ContentKind::FilePathList, &pathlist::encode(paths))
    }

    /// Kinds currently present on the clipboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be opened or probed.
    pub fn available_kinds(&self) -> Result<Vec<ContentKind>> {
        self.ensure_running()?;
        let mut session = open_with_retry(&*self.adapter, &self.config.retry)?;
        let mut kinds = Vec::new();
        for binding in self.adapter.formats().iter() {
            for tag in binding.read_tags {
                if session.has(*tag)? {
                    kinds.push(binding.kind);
                    break;
                }
            }
        }
        Ok(kinds)
    }

    /// Watch the clipboard for new content of `kind`.
    ///
    /// The counter is sampled before this returns, so only changes made
    /// afterwards are reported. Changes that leave no content of `kind` are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError::Unsupported`] if this platform has no
    /// format for `kind`, or an error if the first counter sample fails.
    pub fn watch(&self, kind: ContentKind, cancel: CancelToken) -> Result<WatchStream<Vec<u8>>> {
        self.ensure_running()?;
        self.adapter
            .formats()
            .binding(kind)
            .ok_or_else(|| unsupported(kind))?;

        let baseline = self.adapter.change_count()?;
        let counter = Arc::clone(&self.adapter);
        let reader = Arc::clone(&self.adapter);
        let retry = self.config.retry;
        watch::spawn(
            self.config.poll_interval,
            vec![self.shutdown.token(), cancel],
            baseline,
            move || counter.change_count(),
            move || read_kind(&*reader, &retry, kind),
        )
    }

    /// Watch the clipboard for new content of any supported kind.
    ///
    /// After each change, path lists are probed first, then images, then
    /// text; the first kind present is reported.
    ///
    /// # Errors
    ///
    /// Returns an error if the first counter sample fails.
    pub fn watch_any(&self, cancel: CancelToken) -> Result<WatchStream<ClipboardContent>> {
        self.ensure_running()?;
        let formats = self.adapter.formats();
        let kinds = PROBE_ORDER
            .into_iter()
            .filter(|kind| formats.binding(*kind).is_some())
            .collect::<Vec<_>>();

        let baseline = self.adapter.change_count()?;
        let counter = Arc::clone(&self.adapter);
        let reader = Arc::clone(&self.adapter);
        let retry = self.config.retry;
        watch::spawn(
            self.config.poll_interval,
            vec![self.shutdown.token(), cancel],
            baseline,
            move || counter.change_count(),
            move || {
                for kind in &kinds {
                    if let Some(data) = read_kind(&*reader, &retry, *kind)? {
                        return Ok(Some(ClipboardContent { kind: *kind, data }));
                    }
                }
                Ok(None)
            },
        )
    }

    /// Stop every watch session and change signal started by this broker.
    ///
    /// Later calls on the broker fail with [`ClipboardError::ShutDown`].
    pub fn shutdown(&self) {
        if !self.is_shut_down() {
            log::info!("clipboard broker shutting down");
        }
        self.shutdown.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.token().is_cancelled()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(ClipboardError::ShutDown);
        }
        Ok(())
    }
}

impl<A: NativeAdapter> fmt::Debug for Broker<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

fn unsupported(kind: ContentKind) -> ClipboardError {
    ClipboardError::Unsupported(format!("{kind} content on this platform"))
}

/// Fetch `kind` from a fresh session and convert it to interchange form.
fn read_kind<A: NativeAdapter>(
    adapter: &A,
    retry: &RetryPolicy,
    kind: ContentKind,
) -> Result<Option<Vec<u8>>> {
    let binding = adapter
        .formats()
        .binding(kind)
        .ok_or_else(|| unsupported(kind))?;

    let block = {
        let mut session = open_with_retry(adapter, retry)?;
        let mut found = None;
        for tag in binding.read_tags {
            if let Some(block) = session.fetch(*tag)? {
                log::debug!("fetched {} bytes of {kind} from {tag}", block.as_bytes().len());
                found = Some(block);
                break;
            }
        }
        found
    };

    block
        .map(|block| decode_payload(binding.payload, block.into_inner()))
        .transpose()
}

fn decode_payload(payload: Payload, bytes: Vec<u8>) -> Result<Vec<u8>> {
    match payload {
        Payload::Utf8Text => {
            std::str::from_utf8(&bytes).map_err(|err| ClipboardError::Text(err.to_string()))?;
            Ok(bytes)
        }
        Payload::Bitmap => {
            // Some owners publish a whole .bmp file under a DIB format.
            let dib = if file::is_framed(&bytes) {
                file::unwrap(&bytes)?
            } else {
                &bytes
            };
            png::encode(&clipkit_bitmap::decode(dib)?)
        }
        Payload::EncodedImage => png::normalize(&bytes),
        Payload::PathList => {
            pathlist::decode(&bytes)?;
            Ok(bytes)
        }
    }
}

/// Convert interchange bytes to the native payload. `None` means nothing to
/// store.
fn prepare(payload: Payload, bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    match payload {
        Payload::Utf8Text => {
            std::str::from_utf8(bytes).map_err(|err| ClipboardError::Text(err.to_string()))?;
            Ok(Some(bytes.to_vec()))
        }
        Payload::Bitmap => {
            let (_, dib) = clipkit_bitmap::encode(&png::decode(bytes)?);
            Ok(Some(dib))
        }
        Payload::EncodedImage => {
            png::decode(bytes)?;
            Ok(Some(bytes.to_vec()))
        }
        Payload::PathList => {
            let paths = pathlist::decode(bytes)?;
            Ok((!paths.is_empty()).then(|| pathlist::encode(&paths)))
        }
    }
}
