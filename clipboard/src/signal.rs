use std::thread;
use std::time::Duration;

use async_channel::Receiver;

use crate::watch::pause;
use crate::{CancelToken, ClipboardError, Result};

/// Fires once the content of a completed write has been replaced.
///
/// Returned by every broker write. Dropping it stops the background poller.
#[derive(Debug)]
pub struct ChangeSignal {
    receiver: Receiver<()>,
}

impl ChangeSignal {
    /// Start polling `counter` until it moves away from `baseline`.
    pub(crate) fn spawn<C>(
        interval: Duration,
        tokens: Vec<CancelToken>,
        baseline: u64,
        mut counter: C,
    ) -> Result<Self>
    where
        C: FnMut() -> Result<u64> + Send + 'static,
    {
        let (sender, receiver) = async_channel::bounded(1);
        thread::Builder::new()
            .name("clipkit-signal".into())
            .spawn(move || {
                while pause(interval, &tokens) && !sender.is_closed() {
                    match counter() {
                        Ok(count) if count != baseline => {
                            log::debug!("written content superseded at {count}");
                            let _ = sender.try_send(());
                            break;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            log::warn!("change signal stopped: {err}");
                            break;
                        }
                    }
                }
            })
            .map_err(|err| ClipboardError::Fail(format!("failed to spawn signal thread: {err}")))?;
        Ok(Self { receiver })
    }

    /// Whether the written content has already been replaced.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Wait until the content is replaced.
    ///
    /// Returns `false` if the signal stopped first, because the broker shut
    /// down or the counter could not be read.
    pub async fn wait(self) -> bool {
        self.receiver.recv().await.is_ok()
    }

    /// Blocking variant of [`wait`](Self::wait).
    #[must_use]
    pub fn wait_blocking(self) -> bool {
        self.receiver.recv_blocking().is_ok()
    }
}
