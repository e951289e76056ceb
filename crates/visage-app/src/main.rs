//! Visage demo binary - composition root.
//!
//! Ties together the Visage crates into a runnable scripted interview:
//! 1. Load configuration from TOML
//! 2. Wire the chat queue, interaction gate, director, and lifecycle
//! 3. Start the director loop and an event logger
//! 4. Simulate the first user gesture, ask the canned questions one turn
//!    at a time, and terminate once the roster is exhausted
//!
//! The asset store and synthesis engine are simulated backends; the real
//! renderer/asset pipeline consumes the same trait seams and channels.

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use visage_audio::player::{AssetPlayer, AssetStore, MockAssetStore, ScriptedPlayer, SpeechSynthesizer};
use visage_audio::{probe, PlaybackError};
use visage_core::config::VisageConfig;
use visage_core::events::DomainEvent;
use visage_core::types::{AudioSourceRef, Message, Role};
use visage_director::{
    next_turn_or_default, CannedDialogue, ChatQueue, InteractionGate, SessionLifecycle,
    SpeechDirector,
};

use cli::CliArgs;

/// Simulated synthesis engine: speaking time scales with word count.
struct PacedSynthesizer {
    millis_per_word: u64,
}

impl SpeechSynthesizer for PacedSynthesizer {
    fn utter(&self, text: &str) -> Result<Box<dyn AssetPlayer>, PlaybackError> {
        let words = text.split_whitespace().count().max(1) as u64;
        tracing::debug!(words, "Synthesizing utterance");
        Ok(Box::new(ScriptedPlayer::completing(
            Duration::from_millis(30),
            Duration::from_millis(words * self.millis_per_word),
        )))
    }
}

/// Simulated asset store with one pre-recorded greeting clip.
fn demo_asset_store() -> MockAssetStore {
    MockAssetStore::new().with_player("welcome.audio", || {
        Box::new(ScriptedPlayer::completing(
            Duration::from_millis(50),
            Duration::from_millis(900),
        ))
    })
}

/// Wait for the current turn to drain.
async fn wait_played(
    events: &mut tokio::sync::broadcast::Receiver<DomainEvent>,
) -> Result<(), &'static str> {
    loop {
        match events.recv().await {
            Ok(DomainEvent::MessagePlayed { .. }) => return Ok(()),
            Ok(_) => continue,
            Err(_) => return Err("event channel closed"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = VisageConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Visage v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Simulated external collaborators.
    let assets = Arc::new(demo_asset_store());
    let synthesizer = Arc::new(PacedSynthesizer {
        millis_per_word: 120,
    });

    // Validate the greeting asset with an ad-hoc ping before the interview.
    let probe_timeout = Duration::from_secs(config.audio.probe_timeout_secs);
    let mut greeting_player = assets
        .open("welcome.audio")
        .map_err(visage_core::VisageError::from)?;
    let greeting_ref = AudioSourceRef::Asset("welcome.audio".to_string());
    let greeting_available =
        match probe(&mut *greeting_player, &greeting_ref, probe_timeout).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Greeting asset unavailable; synthesis only");
                false
            }
        };

    // Core wiring.
    let queue = Arc::new(ChatQueue::new());
    let gate = Arc::new(InteractionGate::new());
    let director = Arc::new(SpeechDirector::new(
        &config,
        Arc::clone(&queue),
        Arc::clone(&gate),
        assets,
        synthesizer,
    ));

    // Event logger: mirror every domain event into the log.
    let mut event_log = director.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = event_log.recv().await {
            tracing::info!(event = event.event_name(), "Domain event");
        }
    });

    // Rendering-layer stand-in: log speaking signal changes with the
    // cross-fade the renderer would apply.
    let mut speaking = director.subscribe_speaking();
    let animation = config.animation.clone();
    tokio::spawn(async move {
        let mut first_activation = true;
        while speaking.changed().await.is_ok() {
            let state = speaking.borrow_and_update().clone();
            let fade = animation.fade_for(first_activation);
            first_activation = false;
            tracing::info!(
                is_speaking = state.is_speaking,
                clip = %state.active_clip,
                fade_secs = fade,
                "Speaking state"
            );
        }
    });

    let runner = Arc::clone(&director);
    let run_handle = tokio::spawn(async move { runner.run().await });

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let lifecycle = Arc::new(
        SessionLifecycle::new(&config.lifecycle, Arc::clone(&director), Arc::clone(&gate))
            .with_completion(move || {
                let _ = done_tx.send(());
            }),
    );

    // First user gesture: in the browser analog this is a click; the demo
    // grants it up front.
    lifecycle.open_interaction_gate();

    // Interview script.
    let dialogue = CannedDialogue::default_roster();
    let question_limit = args.questions.unwrap_or(usize::MAX);
    let mut events = director.subscribe_events();
    let mut history: Vec<Message> = Vec::new();

    // Greeting turn, file-backed when the asset probe succeeded.
    let mut greeting = Message::assistant("Welcome! Let's begin the interview.");
    if greeting_available {
        greeting.content.audio_ref = Some("welcome.audio".to_string());
    }
    director.submit(greeting.clone());
    history.push(greeting);
    wait_played(&mut events).await.map_err(|e| e.to_string())?;

    let mut asked = 0usize;
    loop {
        if asked >= question_limit {
            break;
        }
        let turn = next_turn_or_default(&dialogue, &history).await;
        let is_completed = turn.is_completed;
        let message = turn.into_message(Role::Assistant);
        history.push(message.clone());
        director.submit(message);
        asked += 1;

        wait_played(&mut events).await.map_err(|e| e.to_string())?;
        if is_completed {
            break;
        }
    }

    // Terminate: the callback fires only once in-flight audio has drained.
    lifecycle.request_termination().await;
    done_rx.await?;
    tracing::info!(questions_asked = asked, "Interview complete");

    director.shutdown();
    run_handle.await?;

    Ok(())
}
