//! Trait seams to the external asset store and speech synthesis engine.
//!
//! The core's only contract with either backend is the four-outcome session
//! lifecycle: a player resolves a source, reports `Ready` once enough data is
//! buffered to play through, then `Ended` or `Error`. Scripted mock
//! implementations live beside the traits for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use visage_core::types::AudioSourceRef;

use crate::error::PlaybackError;

/// Notifications emitted by a player while driving one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Enough data is buffered to play through without stalling.
    Ready,
    /// Playback ran to its natural end.
    Ended,
    /// Loading or playback failed.
    Error(String),
}

/// Handle driving playback of a single source.
///
/// `begin` starts resolving/buffering and returns the event channel; `stop`
/// releases the underlying resource and must be idempotent.
pub trait AssetPlayer: Send {
    /// Begin resolving and buffering the source. Events arrive on the
    /// returned channel; the channel closing without `Ended` means the
    /// player died.
    fn begin(
        &mut self,
        source: &AudioSourceRef,
    ) -> Result<mpsc::Receiver<PlayerEvent>, PlaybackError>;

    /// Release the underlying resource. Safe to call repeatedly and on a
    /// player that never began.
    fn stop(&mut self);
}

/// Resolves an audio reference (URL or inline payload) to a playable stream.
pub trait AssetStore: Send + Sync {
    fn open(&self, asset_ref: &str) -> Result<Box<dyn AssetPlayer>, PlaybackError>;
}

/// Produces a player that speaks an utterance through the synthesis engine.
pub trait SpeechSynthesizer: Send + Sync {
    fn utter(&self, text: &str) -> Result<Box<dyn AssetPlayer>, PlaybackError>;
}

// =============================================================================
// Scripted player (test double)
// =============================================================================

/// What a `ScriptedPlayer` does after `begin` is called.
#[derive(Debug, Clone)]
enum Script {
    /// Emit the listed events, each after its delay.
    Events(Vec<(Duration, PlayerEvent)>),
    /// Fail `begin` itself.
    RefuseToLoad(String),
    /// Load successfully but never become ready: hold the channel open
    /// without ever emitting an event, so the session's bounded wait fires.
    Stall,
}

/// A player that follows a pre-programmed event script.
///
/// Simulates an audio backend without real hardware. Tracks `stop()` calls
/// via a shared counter so tests can assert resource release and idempotence.
pub struct ScriptedPlayer {
    script: Script,
    stops: Arc<AtomicUsize>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ScriptedPlayer {
    fn new(script: Script) -> Self {
        Self {
            script,
            stops: Arc::new(AtomicUsize::new(0)),
            task: None,
        }
    }

    /// Becomes ready after `ready_after`, then ends after `duration` more.
    pub fn completing(ready_after: Duration, duration: Duration) -> Self {
        Self::new(Script::Events(vec![
            (ready_after, PlayerEvent::Ready),
            (duration, PlayerEvent::Ended),
        ]))
    }

    /// Reports `Ready` and then an error after `after`.
    pub fn erroring_after(after: Duration, reason: impl Into<String>) -> Self {
        Self::new(Script::Events(vec![
            (Duration::ZERO, PlayerEvent::Ready),
            (after, PlayerEvent::Error(reason.into())),
        ]))
    }

    /// Fails during load, before ever becoming ready.
    pub fn failing_to_load(reason: impl Into<String>) -> Self {
        Self::new(Script::RefuseToLoad(reason.into()))
    }

    /// Errors asynchronously during load, before `Ready`.
    pub fn erroring_while_loading(after: Duration, reason: impl Into<String>) -> Self {
        Self::new(Script::Events(vec![(
            after,
            PlayerEvent::Error(reason.into()),
        )]))
    }

    /// Never emits any event; the session's bounded wait must fire.
    pub fn never_ready() -> Self {
        Self::new(Script::Stall)
    }

    /// Ends before reporting ready (zero-length asset).
    pub fn ending_immediately() -> Self {
        Self::new(Script::Events(vec![(Duration::ZERO, PlayerEvent::Ended)]))
    }

    /// Shared counter of `stop()` invocations on this player.
    pub fn stop_probe(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.stops)
    }
}

impl AssetPlayer for ScriptedPlayer {
    fn begin(
        &mut self,
        source: &AudioSourceRef,
    ) -> Result<mpsc::Receiver<PlayerEvent>, PlaybackError> {
        match &self.script {
            Script::RefuseToLoad(reason) => Err(PlaybackError::AssetLoad(reason.clone())),
            Script::Stall => {
                tracing::debug!(source = source.kind(), "Scripted player stalling");
                let (tx, rx) = mpsc::channel(8);
                // Hold the sender for the task's lifetime so the channel stays
                // open (no disconnect) until `stop()` aborts the task.
                self.task = Some(tokio::spawn(async move {
                    let _tx = tx;
                    std::future::pending::<()>().await;
                }));
                Ok(rx)
            }
            Script::Events(events) => {
                tracing::debug!(source = source.kind(), "Scripted player began");
                let (tx, rx) = mpsc::channel(8);
                let events = events.clone();
                self.task = Some(tokio::spawn(async move {
                    for (delay, event) in events {
                        tokio::time::sleep(delay).await;
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }));
                Ok(rx)
            }
        }
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// Mock asset store
// =============================================================================

type PlayerFactory = Box<dyn Fn() -> Box<dyn AssetPlayer> + Send + Sync>;

/// Asset store backed by a table of scripted player factories.
///
/// Unknown references fail with `AssetLoad`, mirroring a missing or
/// unreachable asset.
#[derive(Default)]
pub struct MockAssetStore {
    players: Mutex<HashMap<String, PlayerFactory>>,
}

impl MockAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory invoked each time `asset_ref` is opened.
    pub fn with_player<F>(self, asset_ref: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn AssetPlayer> + Send + Sync + 'static,
    {
        self.players
            .lock()
            .expect("player table mutex poisoned")
            .insert(asset_ref.into(), Box::new(factory));
        self
    }
}

impl AssetStore for MockAssetStore {
    fn open(&self, asset_ref: &str) -> Result<Box<dyn AssetPlayer>, PlaybackError> {
        let players = self.players.lock().expect("player table mutex poisoned");
        match players.get(asset_ref) {
            Some(factory) => Ok(factory()),
            None => Err(PlaybackError::AssetLoad(format!(
                "unknown asset: {}",
                asset_ref
            ))),
        }
    }
}

// =============================================================================
// Mock synthesizers
// =============================================================================

/// Synthesis engine that "speaks" instantly-ready scripted audio.
///
/// Records every utterance so tests can assert the fallback path ran.
pub struct MockSynthesizer {
    utterance_duration: Duration,
    utterances: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn new(utterance_duration: Duration) -> Self {
        Self {
            utterance_duration,
            utterances: Mutex::new(Vec::new()),
        }
    }

    /// Texts spoken so far, in order.
    pub fn utterances(&self) -> Vec<String> {
        self.utterances
            .lock()
            .expect("utterance log mutex poisoned")
            .clone()
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn utter(&self, text: &str) -> Result<Box<dyn AssetPlayer>, PlaybackError> {
        self.utterances
            .lock()
            .expect("utterance log mutex poisoned")
            .push(text.to_string());
        Ok(Box::new(ScriptedPlayer::completing(
            Duration::ZERO,
            self.utterance_duration,
        )))
    }
}

/// Synthesis engine that is always unavailable.
#[derive(Debug, Clone, Default)]
pub struct FailingSynthesizer;

impl SpeechSynthesizer for FailingSynthesizer {
    fn utter(&self, _text: &str) -> Result<Box<dyn AssetPlayer>, PlaybackError> {
        Err(PlaybackError::Synthesis(
            "synthesis engine unavailable".to_string(),
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
