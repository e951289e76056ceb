//! Interaction gating and interview termination sequencing.
//!
//! Browsers refuse autoplay until the user gestures; the interaction gate is
//! the runtime analog. `SessionLifecycle` also sequences termination: the
//! completion callback fires exactly once, and never while an audio session
//! is non-terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use visage_core::config::LifecycleConfig;
use visage_core::events::DomainEvent;
use visage_core::types::Timestamp;

use crate::director::SpeechDirector;

/// One-time latch requiring a user gesture before any audio may play.
///
/// The first `open` call wins; subsequent calls are no-ops.
#[derive(Debug, Default)]
pub struct InteractionGate {
    opened: AtomicBool,
    notify: Notify,
}

impl InteractionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    /// Open the gate. Returns `true` only for the call that actually
    /// opened it.
    pub fn open(&self) -> bool {
        let first = !self.opened.swap(true, Ordering::SeqCst);
        if first {
            tracing::info!("Interaction gate opened");
            self.notify.notify_waiters();
        }
        first
    }

    /// Wait until the gate is open. Resolves immediately if it already is.
    pub async fn opened(&self) {
        loop {
            if self.is_open() {
                return;
            }
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_open() {
                return;
            }
            notified.await;
        }
    }
}

/// Callback invoked when the interview has fully drained.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Wraps the director with interaction gating and termination sequencing.
pub struct SessionLifecycle {
    director: Arc<SpeechDirector>,
    gate: Arc<InteractionGate>,
    poll_interval: Duration,
    ended: AtomicBool,
    completed: AtomicBool,
    on_complete: Mutex<Option<CompletionCallback>>,
}

impl SessionLifecycle {
    pub fn new(
        config: &LifecycleConfig,
        director: Arc<SpeechDirector>,
        gate: Arc<InteractionGate>,
    ) -> Self {
        Self {
            director,
            gate,
            poll_interval: Duration::from_secs(config.termination_poll_secs.max(1)),
            ended: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            on_complete: Mutex::new(None),
        }
    }

    /// Register the termination sink's callback.
    pub fn with_completion(self, callback: impl FnOnce() + Send + 'static) -> Self {
        *self
            .on_complete
            .lock()
            .expect("completion callback mutex poisoned") = Some(Box::new(callback));
        self
    }

    /// Record the first user gesture. Returns `true` only for the call that
    /// actually opened the gate.
    pub fn open_interaction_gate(&self) -> bool {
        let first = self.gate.open();
        if first {
            let _ = self.director.events_sender().send(DomainEvent::GateOpened {
                timestamp: Timestamp::now(),
            });
        }
        first
    }

    /// Whether termination has been requested.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Whether the completion callback already fired.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Request interview termination.
    ///
    /// If the director is speaking, waits for the in-flight session to reach
    /// a terminal state before firing the completion callback; if already
    /// quiescent, fires immediately. The callback fires exactly once across
    /// any number of calls; returns `true` only for the call that fired it.
    pub async fn request_termination(&self) -> bool {
        if !self.ended.swap(true, Ordering::SeqCst) {
            let _ = self
                .director
                .events_sender()
                .send(DomainEvent::TerminationRequested {
                    timestamp: Timestamp::now(),
                });
            tracing::info!("Interview termination requested");
        }

        self.wait_for_quiescence().await;

        if self.completed.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(callback) = self
            .on_complete
            .lock()
            .expect("completion callback mutex poisoned")
            .take()
        {
            callback();
        }
        let _ = self
            .director
            .events_sender()
            .send(DomainEvent::TerminationCompleted {
                timestamp: Timestamp::now(),
            });
        tracing::info!("Interview termination completed");
        true
    }

    /// Await the "no active session" condition.
    ///
    /// Primarily driven by the speaking-signal watch channel; the configured
    /// interval is a fallback re-check bound tolerating transient
    /// session-slot races.
    async fn wait_for_quiescence(&self) {
        let mut speaking = self.director.subscribe_speaking();
        loop {
            if self.director.is_quiescent() {
                return;
            }
            tokio::select! {
                changed = speaking.changed() => {
                    if changed.is_err() {
                        // Director dropped; fall back to interval checks.
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
