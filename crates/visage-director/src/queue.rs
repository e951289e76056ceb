//! Ordered queue of pending conversation messages.
//!
//! Messages are consumed strictly FIFO relative to enqueue order. There is
//! no cancellation of the queue itself: once enqueued, a message is always
//! eventually processed (or the process terminates).

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use visage_core::types::Message;

/// FIFO queue feeding the speech director one message at a time.
///
/// The director keeps the front entry in place while the turn plays and only
/// removes it once the turn has fully drained, so a message is consumed
/// exactly once.
#[derive(Debug, Default)]
pub struct ChatQueue {
    inner: Mutex<VecDeque<Message>>,
    notify: Notify,
}

impl ChatQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and wake the director loop.
    pub fn enqueue(&self, message: Message) {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        tracing::debug!(message_id = %message.id, depth = inner.len() + 1, "Message enqueued");
        inner.push_back(message);
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Clone of the earliest queued message, if any.
    pub fn front(&self) -> Option<Message> {
        self.inner
            .lock()
            .expect("queue mutex poisoned")
            .front()
            .cloned()
    }

    /// Remove and return the earliest queued message.
    pub fn pop_front(&self) -> Option<Message> {
        self.inner
            .lock()
            .expect("queue mutex poisoned")
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until the queue holds at least one message.
    ///
    /// Returns immediately if it already does. Uses the register-then-check
    /// pattern so an enqueue between the emptiness check and the await is
    /// never missed.
    pub async fn wait_nonempty(&self) {
        loop {
            if !self.is_empty() {
                return;
            }
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
