//! Cancellation for background watch and change-signal threads.
//!
//! Cancellation is signalled by closing a channel, so threads can block on it
//! alongside a timer instead of polling a flag.

use async_channel::{Receiver, Sender};

/// Owner side of a cancellation pair. Cancels when dropped.
///
/// ```
/// use clipkit_clipboard::CancelHandle;
///
/// let (handle, token) = CancelHandle::new();
/// assert!(!token.is_cancelled());
/// drop(handle);
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug)]
pub struct CancelHandle {
    sender: Sender<()>,
    token: CancelToken,
}

impl CancelHandle {
    /// Create a new handle and its token.
    #[must_use]
    pub fn new() -> (Self, CancelToken) {
        let (sender, receiver) = async_channel::bounded(1);
        let token = CancelToken { receiver };
        (
            Self {
                sender,
                token: token.clone(),
            },
            token,
        )
    }

    /// Signal cancellation now rather than on drop.
    pub fn cancel(&self) {
        self.sender.close();
    }

    /// Another token observing this handle.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new().0
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.sender.close();
    }
}

/// Observer side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelToken {
    receiver: Receiver<()>,
}

impl CancelToken {
    /// Whether cancellation was signalled (non-blocking).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.receiver.is_closed()
    }

    /// Resolve once cancellation is signalled.
    pub async fn wait(&self) {
        // nothing is ever sent; recv only returns once the channel closes
        let _ = self.receiver.recv().await;
    }

    /// Block the current thread until cancellation is signalled.
    pub fn wait_blocking(&self) {
        let _ = self.receiver.recv_blocking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_reaches_every_clone() {
        let (handle, token) = CancelHandle::new();
        let other = handle.token();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        token.wait_blocking();
    }

    #[test]
    fn live_handle_keeps_token_open() {
        let (handle, token) = CancelHandle::new();
        assert!(!token.is_cancelled());
        drop(handle);
        futures::executor::block_on(token.wait());
    }
}
