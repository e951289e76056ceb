//! Single-shot audio session lifecycle.
//!
//! An `AudioSession` drives exactly one playable source through
//! Loading -> Playing -> terminal. Terminal transitions resolve `start`
//! exactly once; `stop` is idempotent and is the only cancellation
//! primitive. Playback begins on the player's `Ready` event, never on
//! construction, and a bounded wait forces `TimedOut` if the source never
//! becomes ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};
use uuid::Uuid;

use visage_core::types::{AudioSourceRef, PlaybackOutcome, SessionState, Timestamp};

use crate::error::PlaybackError;
use crate::player::{AssetPlayer, PlayerEvent};

/// One attempt to play a single audio source from start to a terminal
/// outcome.
///
/// State changes are published on a `watch` channel so the director can
/// observe the lifecycle without owning the start future.
pub struct AudioSession {
    id: Uuid,
    state_tx: watch::Sender<SessionState>,
    abort: Notify,
    stop_requested: AtomicBool,
    created_at: Timestamp,
    ready_timeout: Duration,
}

impl AudioSession {
    /// Create a session that waits at most `ready_timeout` for the source
    /// to become ready.
    pub fn new(ready_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            id: Uuid::new_v4(),
            state_tx,
            abort: Notify::new(),
            stop_requested: AtomicBool::new(false),
            created_at: Timestamp::now(),
            ready_timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Whether the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Observe state changes. The receiver sees every transition published
    /// after subscription.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Request cancellation and release of the underlying resource.
    ///
    /// Idempotent: the first call wins; later calls (and calls on an
    /// already-terminal session) are no-ops and produce no second
    /// terminal-state notification.
    pub fn stop(&self) {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            tracing::debug!(session_id = %self.id, state = %self.state(), "Audio session stop requested");
            self.abort.notify_one();
        }
    }

    /// Drive `player` with `source` until a terminal outcome.
    ///
    /// Resolves exactly once. The ready timer is cancelled on any terminal
    /// transition, and the player is always stopped before returning.
    pub async fn start(
        &self,
        player: &mut dyn AssetPlayer,
        source: &AudioSourceRef,
    ) -> PlaybackOutcome {
        if self.state() != SessionState::Idle {
            return PlaybackOutcome::Failed(format!(
                "session already started (state: {})",
                self.state()
            ));
        }
        self.set_state(SessionState::Loading);
        tracing::debug!(session_id = %self.id, source = source.kind(), "Audio session loading");

        let mut rx = match player.begin(source) {
            Ok(rx) => rx,
            Err(e) => {
                return self.finish(player, SessionState::Error, PlaybackOutcome::Failed(e.to_string()));
            }
        };

        // A stop() issued before begin() must win over the first event.
        if self.stop_requested.load(Ordering::SeqCst) {
            return self.finish(player, SessionState::Ended, PlaybackOutcome::Aborted);
        }

        // Bounded wait for the ready transition. The sleep future is dropped
        // (timer cancelled) as soon as any other branch resolves.
        tokio::select! {
            _ = tokio::time::sleep(self.ready_timeout) => {
                self.finish(player, SessionState::TimedOut, PlaybackOutcome::TimedOut)
            }
            _ = self.abort.notified() => {
                self.finish(player, SessionState::Ended, PlaybackOutcome::Aborted)
            }
            event = rx.recv() => match event {
                Some(PlayerEvent::Ready) => {
                    self.set_state(SessionState::Playing);
                    tracing::debug!(session_id = %self.id, "Audio session playing");
                    self.play_out(player, &mut rx).await
                }
                // Zero-length source: played through before ready.
                Some(PlayerEvent::Ended) => {
                    self.finish(player, SessionState::Ended, PlaybackOutcome::Completed)
                }
                Some(PlayerEvent::Error(reason)) => {
                    self.finish(player, SessionState::Error, PlaybackOutcome::Failed(reason))
                }
                None => {
                    self.finish(
                        player,
                        SessionState::Error,
                        PlaybackOutcome::Failed("player disconnected".to_string()),
                    )
                }
            }
        }
    }

    /// Unbounded wait for the end of audible playback.
    async fn play_out(
        &self,
        player: &mut dyn AssetPlayer,
        rx: &mut mpsc::Receiver<PlayerEvent>,
    ) -> PlaybackOutcome {
        loop {
            tokio::select! {
                _ = self.abort.notified() => {
                    return self.finish(player, SessionState::Ended, PlaybackOutcome::Aborted);
                }
                event = rx.recv() => match event {
                    Some(PlayerEvent::Ended) => {
                        return self.finish(player, SessionState::Ended, PlaybackOutcome::Completed);
                    }
                    Some(PlayerEvent::Error(reason)) => {
                        return self.finish(player, SessionState::Error, PlaybackOutcome::Failed(reason));
                    }
                    // Duplicate ready notifications are harmless.
                    Some(PlayerEvent::Ready) => continue,
                    None => {
                        return self.finish(
                            player,
                            SessionState::Error,
                            PlaybackOutcome::Failed("player disconnected".to_string()),
                        );
                    }
                }
            }
        }
    }

    /// Apply the terminal transition and release the player.
    fn finish(
        &self,
        player: &mut dyn AssetPlayer,
        state: SessionState,
        outcome: PlaybackOutcome,
    ) -> PlaybackOutcome {
        player.stop();
        self.set_state(state);
        tracing::debug!(
            session_id = %self.id,
            state = %state,
            outcome = ?outcome,
            "Audio session finished"
        );
        outcome
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }
}

/// Ad-hoc validation ping: check that `source` becomes ready within
/// `timeout`, then release the player.
pub async fn probe(
    player: &mut dyn AssetPlayer,
    source: &AudioSourceRef,
    timeout: Duration,
) -> Result<(), PlaybackError> {
    let mut rx = player.begin(source)?;
    let result = tokio::time::timeout(timeout, async {
        loop {
            match rx.recv().await {
                Some(PlayerEvent::Ready) | Some(PlayerEvent::Ended) => return Ok(()),
                Some(PlayerEvent::Error(reason)) => return Err(PlaybackError::AssetLoad(reason)),
                None => {
                    return Err(PlaybackError::AssetLoad("player disconnected".to_string()))
                }
            }
        }
    })
    .await;
    player.stop();
    match result {
        Ok(inner) => inner,
        Err(_) => Err(PlaybackError::Timeout),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ScriptedPlayer;
    use std::sync::Arc;

    fn asset(name: &str) -> AudioSourceRef {
        AudioSourceRef::Asset(name.to_string())
    }

    #[tokio::test]
    async fn test_session_completes() {
        let session = AudioSession::new(Duration::from_secs(1));
        let mut player =
            ScriptedPlayer::completing(Duration::from_millis(5), Duration::from_millis(10));
        let stops = player.stop_probe();

        let outcome = session.start(&mut player, &asset("welcome.audio")).await;
        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert_eq!(session.state(), SessionState::Ended);
        assert!(session.is_terminal());
        // The player resource was released on the terminal transition.
        assert_eq!(stops.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_session_states_progress_through_playing() {
        let session = AudioSession::new(Duration::from_secs(1));
        let mut rx = session.subscribe();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let seen_writer = Arc::clone(&seen);
        let observer = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                seen_writer.lock().unwrap().push(state);
                if state.is_terminal() {
                    break;
                }
            }
        });

        let mut player =
            ScriptedPlayer::completing(Duration::from_millis(5), Duration::from_millis(10));
        let outcome = session.start(&mut player, &asset("a")).await;
        assert_eq!(outcome, PlaybackOutcome::Completed);

        tokio::time::timeout(Duration::from_secs(1), observer)
            .await
            .expect("observer should finish")
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                SessionState::Loading,
                SessionState::Playing,
                SessionState::Ended
            ]
        );
    }

    #[tokio::test]
    async fn test_session_load_failure() {
        let session = AudioSession::new(Duration::from_secs(1));
        let mut player = ScriptedPlayer::failing_to_load("404 not found");

        let outcome = session.start(&mut player, &asset("missing")).await;
        assert!(matches!(outcome, PlaybackOutcome::Failed(_)));
        assert_eq!(session.state(), SessionState::Error);
    }

    #[tokio::test]
    async fn test_session_error_during_load() {
        let session = AudioSession::new(Duration::from_secs(1));
        let mut player =
            ScriptedPlayer::erroring_while_loading(Duration::from_millis(5), "bad codec");

        let outcome = session.start(&mut player, &asset("bad")).await;
        assert_eq!(outcome, PlaybackOutcome::Failed("bad codec".to_string()));
        assert_eq!(session.state(), SessionState::Error);
    }

    #[tokio::test]
    async fn test_session_error_during_playback() {
        let session = AudioSession::new(Duration::from_secs(1));
        let mut player = ScriptedPlayer::erroring_after(Duration::from_millis(10), "stream cut");

        let outcome = session.start(&mut player, &asset("cut")).await;
        assert_eq!(outcome, PlaybackOutcome::Failed("stream cut".to_string()));
        assert_eq!(session.state(), SessionState::Error);
    }

    #[tokio::test]
    async fn test_session_ready_timeout() {
        let session = AudioSession::new(Duration::from_millis(20));
        let mut player = ScriptedPlayer::never_ready();
        let stops = player.stop_probe();

        let outcome = session.start(&mut player, &asset("stalled")).await;
        assert_eq!(outcome, PlaybackOutcome::TimedOut);
        assert_eq!(session.state(), SessionState::TimedOut);
        assert_eq!(stops.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_no_timeout_once_playing() {
        // Ready arrives within the bound, but total playback exceeds it.
        // The ready timer must not fire after the ready transition.
        let session = AudioSession::new(Duration::from_millis(30));
        let mut player =
            ScriptedPlayer::completing(Duration::from_millis(5), Duration::from_millis(60));

        let outcome = session.start(&mut player, &asset("long")).await;
        assert_eq!(outcome, PlaybackOutcome::Completed);
    }

    #[tokio::test]
    async fn test_zero_length_asset_completes() {
        let session = AudioSession::new(Duration::from_secs(1));
        let mut player = ScriptedPlayer::ending_immediately();

        let outcome = session.start(&mut player, &asset("empty")).await;
        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert_eq!(session.state(), SessionState::Ended);
    }

    #[tokio::test]
    async fn test_stop_aborts_playback() {
        let session = Arc::new(AudioSession::new(Duration::from_secs(1)));
        let mut player =
            ScriptedPlayer::completing(Duration::from_millis(5), Duration::from_secs(10));

        let stopper = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.stop();
        });

        let outcome = session.start(&mut player, &asset("a")).await;
        assert_eq!(outcome, PlaybackOutcome::Aborted);
        assert_eq!(session.state(), SessionState::Ended);
    }

    #[tokio::test]
    async fn test_stop_before_start_wins() {
        let session = AudioSession::new(Duration::from_secs(1));
        session.stop();

        let mut player =
            ScriptedPlayer::completing(Duration::ZERO, Duration::from_millis(5));
        let outcome = session.start(&mut player, &asset("a")).await;
        assert_eq!(outcome, PlaybackOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let session = Arc::new(AudioSession::new(Duration::from_secs(1)));
        let mut player =
            ScriptedPlayer::completing(Duration::from_millis(5), Duration::from_secs(10));

        let stopper = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.stop();
            stopper.stop();
        });

        let outcome = session.start(&mut player, &asset("a")).await;
        assert_eq!(outcome, PlaybackOutcome::Aborted);

        // Stopping an already-terminal session changes nothing.
        let mut rx = session.subscribe();
        rx.mark_unchanged();
        session.stop();
        assert_eq!(session.state(), SessionState::Ended);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_start_twice_fails_second_time() {
        let session = AudioSession::new(Duration::from_secs(1));
        let mut player =
            ScriptedPlayer::completing(Duration::ZERO, Duration::from_millis(5));
        let outcome = session.start(&mut player, &asset("a")).await;
        assert_eq!(outcome, PlaybackOutcome::Completed);

        let mut second = ScriptedPlayer::completing(Duration::ZERO, Duration::from_millis(5));
        let outcome = session.start(&mut second, &asset("a")).await;
        assert!(matches!(outcome, PlaybackOutcome::Failed(_)));
        // The terminal state from the first run is preserved.
        assert_eq!(session.state(), SessionState::Ended);
    }

    #[tokio::test]
    async fn test_session_ids_unique() {
        let a = AudioSession::new(Duration::from_secs(1));
        let b = AudioSession::new(Duration::from_secs(1));
        assert_ne!(a.id(), b.id());
    }

    // -------------------------------------------------------------------------
    // probe()
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_probe_ready_source() {
        let mut player =
            ScriptedPlayer::completing(Duration::from_millis(5), Duration::from_secs(10));
        let stops = player.stop_probe();

        let result = probe(&mut player, &asset("ok"), Duration::from_millis(100)).await;
        assert!(result.is_ok());
        assert_eq!(stops.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_probe_stalled_source_times_out() {
        let mut player = ScriptedPlayer::never_ready();
        let result = probe(&mut player, &asset("stalled"), Duration::from_millis(20)).await;
        assert!(matches!(result, Err(PlaybackError::Timeout)));
    }

    #[tokio::test]
    async fn test_probe_failing_source() {
        let mut player =
            ScriptedPlayer::erroring_while_loading(Duration::from_millis(5), "corrupt");
        let result = probe(&mut player, &asset("corrupt"), Duration::from_millis(100)).await;
        assert!(matches!(result, Err(PlaybackError::AssetLoad(_))));
    }
}
