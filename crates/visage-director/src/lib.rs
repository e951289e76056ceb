//! Visage director crate - the speech-animation synchronization core.
//!
//! `SpeechDirector` consumes queued messages one at a time, drives an
//! `AudioSession` per turn, derives the active animation clip, and exposes a
//! single "currently speaking" signal to the rendering layer.
//! `SessionLifecycle` gates playback behind the first user gesture and
//! sequences interview termination so the completion callback only fires
//! after in-flight audio has drained.

pub mod animation;
pub mod dialogue;
pub mod director;
pub mod error;
pub mod lifecycle;
pub mod queue;
pub mod state;

pub use animation::AnimationSelector;
pub use dialogue::{next_turn_or_default, CannedDialogue, DialogueProvider, DialogueTurn};
pub use director::SpeechDirector;
pub use error::DirectorError;
pub use lifecycle::{InteractionGate, SessionLifecycle};
pub use queue::ChatQueue;
pub use state::{DirectorState, StateMachine};
