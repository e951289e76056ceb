//! Visage audio crate - single-shot audio session lifecycle.
//!
//! Provides trait-based seams to the external asset store and speech
//! synthesis engine, the `AudioSession` state machine that drives one
//! playable source to a deterministic terminal outcome, and scripted mock
//! implementations for testing without real audio backends.

pub mod error;
pub mod player;
pub mod session;

pub use error::PlaybackError;
pub use player::{
    AssetPlayer, AssetStore, FailingSynthesizer, MockAssetStore, MockSynthesizer, PlayerEvent,
    ScriptedPlayer, SpeechSynthesizer,
};
pub use session::{probe, AudioSession};
