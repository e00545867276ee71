//! Channel-backed lock update listener.

use async_trait::async_trait;
use tokio::sync::mpsc;

use copydesk_core::LockActionResult;

use crate::broadcast::{ListenerFilter, LockUpdateListener};

/// A listener that forwards matching updates into an `mpsc` channel.
///
/// The receiving half is what the session/transport layer (or a test)
/// drains. If the receiver is dropped, sends are silently skipped; the
/// listener is cleaned up by unregistering it.
pub struct ChannelListener {
    filter: ListenerFilter,
    sender: mpsc::UnboundedSender<LockActionResult>,
}

impl ChannelListener {
    /// Create a listener and the receiver its updates arrive on.
    pub fn new(
        filter: ListenerFilter,
    ) -> (Self, mpsc::UnboundedReceiver<LockActionResult>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { filter, sender }, receiver)
    }
}

#[async_trait]
impl LockUpdateListener for ChannelListener {
    fn filter(&self) -> ListenerFilter {
        self.filter.clone()
    }

    async fn on_lock_update(&self, update: LockActionResult) {
        let _ = self.sender.send(update);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
