//! Change-driven clipboard watching.
//!
//! A watch session runs on its own thread. Each tick it samples the change
//! counter, feeds it to a [`Watcher`], and on a change reads the watched
//! content and forwards it to the [`WatchStream`].

use std::fmt;
use std::pin::{Pin, pin};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_channel::Sender;
use futures::executor::block_on;
use futures::future::{self, Either};
use futures::{Stream, StreamExt};
use futures_timer::Delay;

use crate::{CancelToken, ClipboardError, Result};

/// Lifecycle of a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Not started.
    Idle,
    /// Sampling the counter; `last` is the most recent value seen.
    Polling {
        /// Last observed change counter.
        last: u64,
    },
    /// Terminal.
    Closed,
}

/// The counter-tracking half of a watch session, free of any threading.
#[derive(Debug, Clone)]
pub struct Watcher {
    state: WatchState,
}

impl Watcher {
    /// A watcher in the [`WatchState::Idle`] state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: WatchState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> WatchState {
        self.state
    }

    /// Begin polling from `counter`. Ignored unless idle.
    pub const fn start(&mut self, counter: u64) {
        if let WatchState::Idle = self.state {
            self.state = WatchState::Polling { last: counter };
        }
    }

    /// Record a counter sample. Returns `true` if it differs from the last one.
    pub const fn observe(&mut self, counter: u64) -> bool {
        match self.state {
            WatchState::Polling { last } if last != counter => {
                self.state = WatchState::Polling { last: counter };
                true
            }
            _ => false,
        }
    }

    /// Enter the terminal state.
    pub const fn close(&mut self) {
        self.state = WatchState::Closed;
    }

    /// Whether the watcher has closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, WatchState::Closed)
    }
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Content changes produced by a watch session.
///
/// The stream ends when the session is cancelled, its broker shuts down, or
/// a read fails. In the last case the failure is kept in
/// [`last_error`](Self::last_error).
pub struct WatchStream<T> {
    inner: Pin<Box<dyn Stream<Item = T> + Send>>,
    last_error: Arc<Mutex<Option<ClipboardError>>>,
    worker: JoinHandle<()>,
}

impl<T> WatchStream<T> {
    /// The error that terminated the session, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<ClipboardError> {
        self.last_error
            .lock()
            .expect("watch error mutex poisoned")
            .clone()
    }

    /// Whether the background thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the next change, or `None` once the session closes.
    pub fn next_blocking(&mut self) -> Option<T> {
        block_on(self.inner.next())
    }
}

impl<T> Stream for WatchStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T> fmt::Debug for WatchStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchStream")
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

/// Spawn a watch session.
///
/// `baseline` is the counter sampled by the caller before spawning, so
/// changes made right after this returns are never missed.
pub(crate) fn spawn<T, C, R>(
    interval: Duration,
    tokens: Vec<CancelToken>,
    baseline: u64,
    mut counter: C,
    mut read: R,
) -> Result<WatchStream<T>>
where
    T: Send + 'static,
    C: FnMut() -> Result<u64> + Send + 'static,
    R: FnMut() -> Result<Option<T>> + Send + 'static,
{
    let (sender, receiver) = async_channel::bounded(1);
    let last_error = Arc::new(Mutex::new(None));
    let worker_error = last_error.clone();

    let worker = thread::Builder::new()
        .name("clipkit-watch".into())
        .spawn(move || {
            let mut watcher = Watcher::new();
            watcher.start(baseline);

            let fail = |err: ClipboardError| {
                log::warn!("clipboard watch stopped: {err}");
                *worker_error.lock().expect("watch error mutex poisoned") = Some(err);
            };

            while pause(interval, &tokens) && !sender.is_closed() {
                let count = match counter() {
                    Ok(count) => count,
                    Err(err) => {
                        fail(err);
                        break;
                    }
                };
                if !watcher.observe(count) {
                    log::trace!("clipboard unchanged at {count}");
                    continue;
                }
                match read() {
                    Ok(Some(item)) => {
                        log::debug!("clipboard changed at {count}");
                        if !send(&sender, item, &tokens) {
                            break;
                        }
                    }
                    Ok(None) => log::debug!("clipboard changed at {count}, watched content absent"),
                    Err(err) => {
                        fail(err);
                        break;
                    }
                }
            }
            watcher.close();
        })
        .map_err(|err| ClipboardError::Fail(format!("failed to spawn watch thread: {err}")))?;

    Ok(WatchStream {
        inner: Box::pin(receiver),
        last_error,
        worker,
    })
}

/// Sleep for `interval`, waking early on cancellation.
///
/// Returns `false` if any token was cancelled.
pub(crate) fn pause(interval: Duration, tokens: &[CancelToken]) -> bool {
    if tokens.iter().any(CancelToken::is_cancelled) {
        return false;
    }
    let cancel = pin!(cancelled(tokens));
    matches!(
        block_on(future::select(Delay::new(interval), cancel)),
        Either::Left(_)
    )
}

/// Deliver `item`, giving up if the consumer is gone or a token is cancelled.
fn send<T>(sender: &Sender<T>, item: T, tokens: &[CancelToken]) -> bool {
    let delivery = pin!(sender.send(item));
    let cancel = pin!(cancelled(tokens));
    matches!(
        block_on(future::select(delivery, cancel)),
        Either::Left((Ok(()), _))
    )
}

async fn cancelled(tokens: &[CancelToken]) {
    if tokens.is_empty() {
        return future::pending().await;
    }
    future::select_all(tokens.iter().map(|token| Box::pin(token.wait()))).await;
}
