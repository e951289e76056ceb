//! The speech director: central speech-animation synchronization.
//!
//! Consumes queued messages one at a time once the interaction gate is open,
//! drives exactly one `AudioSession` per attempt, resolves the animation
//! clip for the turn, and publishes the derived `SpeakingState` to the
//! rendering layer. Every playback outcome, success or failure, takes the
//! same draining edge back to idle so the avatar can never be stranded in a
//! talking pose.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, watch, Notify};

use visage_audio::session::AudioSession;
use visage_audio::player::{AssetStore, SpeechSynthesizer};
use visage_core::config::VisageConfig;
use visage_core::events::DomainEvent;
use visage_core::types::{
    AnimationIntent, AudioSourceRef, ClipId, Message, PlaybackOutcome, SpeakingState, Timestamp,
};

use crate::animation::AnimationSelector;
use crate::lifecycle::InteractionGate;
use crate::queue::ChatQueue;
use crate::state::{DirectorState, StateMachine};

/// Capacity of the domain event channel; slow consumers lag, they do not
/// block playback.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Central coordinator owning the active-session and active-clip slots.
///
/// Exactly one audio session may be active at a time. Starting a new session
/// stops any still-active prior session synchronously, before the new source
/// begins loading.
pub struct SpeechDirector {
    state_machine: StateMachine,
    queue: Arc<ChatQueue>,
    gate: Arc<InteractionGate>,
    selector: AnimationSelector,
    assets: Arc<dyn AssetStore>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    speaking_tx: watch::Sender<SpeakingState>,
    events_tx: broadcast::Sender<DomainEvent>,
    active_session: Mutex<Option<Arc<AudioSession>>>,
    ready_timeout: Duration,
    idle_clip: ClipId,
    shutdown: Notify,
}

impl SpeechDirector {
    /// Create a director wired to its queue, gate, and audio backends.
    pub fn new(
        config: &VisageConfig,
        queue: Arc<ChatQueue>,
        gate: Arc<InteractionGate>,
        assets: Arc<dyn AssetStore>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let idle_clip = ClipId::new(config.animation.default_clip.clone());
        let (speaking_tx, _) = watch::channel(SpeakingState::idle(idle_clip.clone()));
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            state_machine: StateMachine::new(),
            queue,
            gate,
            selector: AnimationSelector::new(&config.animation),
            assets,
            synthesizer,
            speaking_tx,
            events_tx,
            active_session: Mutex::new(None),
            ready_timeout: Duration::from_secs(config.audio.ready_timeout_secs),
            idle_clip,
            shutdown: Notify::new(),
        }
    }

    /// Replace the animation selector (deterministic variant picking in tests).
    pub fn with_selector(mut self, selector: AnimationSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Override the asset ready timeout (short timeouts in tests).
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Current machine state.
    pub fn current_state(&self) -> DirectorState {
        self.state_machine.current()
    }

    /// Whether an audio session currently occupies the active slot.
    pub fn has_active_session(&self) -> bool {
        self.active_session
            .lock()
            .expect("active session mutex poisoned")
            .is_some()
    }

    /// Whether the director is between turns with no in-flight audio.
    ///
    /// This is the condition SessionLifecycle awaits before firing the
    /// termination callback.
    pub fn is_quiescent(&self) -> bool {
        matches!(
            self.current_state(),
            DirectorState::Idle | DirectorState::Draining
        ) && !self.has_active_session()
    }

    /// Observe the derived speaking signal.
    pub fn subscribe_speaking(&self) -> watch::Receiver<SpeakingState> {
        self.speaking_tx.subscribe()
    }

    /// Current snapshot of the speaking signal.
    pub fn speaking_state(&self) -> SpeakingState {
        self.speaking_tx.borrow().clone()
    }

    /// Observe domain events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.events_tx.subscribe()
    }

    /// Sender handle for collaborators that emit lifecycle events.
    pub fn events_sender(&self) -> broadcast::Sender<DomainEvent> {
        self.events_tx.clone()
    }

    /// Submit a message for eventual playback.
    ///
    /// Messages are accepted while the gate is closed; they queue up and are
    /// processed FIFO once it opens.
    pub fn submit(&self, message: Message) {
        let message_id = message.id;
        let role = message.role;
        self.queue.enqueue(message);
        self.emit(DomainEvent::MessageEnqueued {
            message_id,
            role,
            timestamp: Timestamp::now(),
        });
    }

    /// Signal the run loop to stop after the current turn.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Consume queued messages until shutdown.
    ///
    /// Each iteration waits for the gate to open and the queue to hold a
    /// message, then plays that message fully before looking at the next.
    pub async fn run(&self) {
        tracing::info!("Speech director started");
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    tracing::info!("Speech director stopped");
                    return;
                }
                _ = self.next_ready() => {}
            }

            // The entry stays in the queue while the turn plays; it is
            // released during the drain step.
            let Some(message) = self.queue.front() else {
                continue;
            };
            self.play_message(&message).await;
        }
    }

    /// Resolves when the gate is open and a message is queued.
    async fn next_ready(&self) {
        self.gate.opened().await;
        self.queue.wait_nonempty().await;
    }

    /// Play one message to a terminal outcome and drain.
    async fn play_message(&self, message: &Message) {
        if let Err(e) = self.state_machine.transition(DirectorState::ResolvingMessage) {
            tracing::warn!(error = %e, "Director out of sync; resetting");
            self.state_machine.reset();
            if self
                .state_machine
                .transition(DirectorState::ResolvingMessage)
                .is_err()
            {
                return;
            }
        }

        let intent = message
            .content
            .animation_intent
            .clone()
            .unwrap_or_else(AnimationIntent::talking);
        let clip = self.selector.resolve(&intent);
        tracing::info!(
            message_id = %message.id,
            intent = intent.as_str(),
            clip = %clip,
            "Resolving message"
        );
        self.emit(DomainEvent::MessageResolved {
            message_id: message.id,
            clip: clip.clone(),
            timestamp: Timestamp::now(),
        });

        // Prefer the provided audio reference; fall back to synthesized
        // speech for the same text when file-backed playback fails.
        let outcome = match &message.content.audio_ref {
            Some(asset_ref) => {
                let source = AudioSourceRef::Asset(asset_ref.clone());
                let outcome = self.run_session(&source, &clip).await;
                if outcome.warrants_fallback() {
                    let reason = match &outcome {
                        PlaybackOutcome::Failed(reason) => reason.clone(),
                        PlaybackOutcome::TimedOut => "playback timed out".to_string(),
                        _ => String::new(),
                    };
                    tracing::warn!(
                        message_id = %message.id,
                        reason = %reason,
                        "File-backed playback failed; retrying via synthesis"
                    );
                    self.emit(DomainEvent::SynthesisFallback {
                        message_id: message.id,
                        reason,
                        timestamp: Timestamp::now(),
                    });
                    let source = AudioSourceRef::Utterance(message.content.text.clone());
                    self.run_session(&source, &clip).await
                } else {
                    outcome
                }
            }
            None => {
                let source = AudioSourceRef::Utterance(message.content.text.clone());
                self.run_session(&source, &clip).await
            }
        };

        // The draining edge is reachable from every outcome, including
        // resolution paths that never managed to start a session.
        self.drain(message, &outcome);
    }

    /// Run one audio session for `source`, publishing the speaking signal.
    async fn run_session(&self, source: &AudioSourceRef, clip: &ClipId) -> PlaybackOutcome {
        // Supersede any still-active session before the new source begins
        // resolving, so two sessions never play at once.
        {
            let mut slot = self
                .active_session
                .lock()
                .expect("active session mutex poisoned");
            if let Some(prev) = slot.take() {
                if !prev.is_terminal() {
                    tracing::warn!(session_id = %prev.id(), "Stopping superseded audio session");
                }
                prev.stop();
            }
        }

        let player = match source {
            AudioSourceRef::Asset(asset_ref) => self.assets.open(asset_ref),
            AudioSourceRef::Utterance(text) => self.synthesizer.utter(text),
        };
        let mut player = match player {
            Ok(player) => player,
            Err(e) => {
                tracing::warn!(source = source.kind(), error = %e, "Could not open audio source");
                return PlaybackOutcome::Failed(e.to_string());
            }
        };

        let session = Arc::new(AudioSession::new(self.ready_timeout));
        {
            let mut slot = self
                .active_session
                .lock()
                .expect("active session mutex poisoned");
            *slot = Some(Arc::clone(&session));
        }

        if self.current_state() == DirectorState::ResolvingMessage {
            let _ = self.state_machine.transition(DirectorState::Speaking);
        }
        self.speaking_tx
            .send_replace(SpeakingState::speaking(clip.clone()));
        self.emit(DomainEvent::PlaybackStarted {
            session_id: session.id(),
            source_kind: source.kind().to_string(),
            timestamp: Timestamp::now(),
        });

        let outcome = session.start(&mut *player, source).await;
        self.emit(DomainEvent::PlaybackFinished {
            session_id: session.id(),
            outcome: outcome.clone(),
            timestamp: Timestamp::now(),
        });

        {
            let mut slot = self
                .active_session
                .lock()
                .expect("active session mutex poisoned");
            if slot.as_ref().map(|s| s.id()) == Some(session.id()) {
                *slot = None;
            }
        }
        outcome
    }

    /// Clear the speaking signal, release the turn, and return to idle.
    ///
    /// Runs for every outcome; a playback failure must never strand the
    /// avatar in a talking pose.
    fn drain(&self, message: &Message, outcome: &PlaybackOutcome) {
        if self.current_state() != DirectorState::Draining
            && self
                .state_machine
                .transition(DirectorState::Draining)
                .is_err()
        {
            self.state_machine.reset();
        }

        self.speaking_tx
            .send_replace(SpeakingState::idle(self.idle_clip.clone()));

        // "Message played": release the queue entry and the audio asset.
        let _ = self.queue.pop_front();
        {
            let mut slot = self
                .active_session
                .lock()
                .expect("active session mutex poisoned");
            if let Some(prev) = slot.take() {
                prev.stop();
            }
        }
        self.emit(DomainEvent::MessagePlayed {
            message_id: message.id,
            timestamp: Timestamp::now(),
        });
        tracing::info!(message_id = %message.id, outcome = ?outcome, "Turn drained");

        if self.current_state() == DirectorState::Draining {
            let _ = self.state_machine.transition(DirectorState::Idle);
        }
    }

    fn emit(&self, event: DomainEvent) {
        tracing::debug!(event = event.event_name(), "Domain event");
        // No receivers is fine; events are best-effort observability.
        let _ = self.events_tx.send(event);
    }
}

// =============================================================================
// Tests
// =============================================================================
