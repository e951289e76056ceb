use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ClipId, PlaybackOutcome, Role, Timestamp};

/// All domain events that can occur in the Visage system.
///
/// Events are emitted by the director and lifecycle after state changes and
/// consumed by:
/// - The rendering/UI layer (for overlays and debugging panels)
/// - The event log (for audit/debugging)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    // =========================================================================
    // Queue Events
    // =========================================================================
    /// A message was submitted to the chat queue.
    MessageEnqueued {
        message_id: Uuid,
        role: Role,
        timestamp: Timestamp,
    },

    /// The director picked a message and resolved its animation clip.
    MessageResolved {
        message_id: Uuid,
        clip: ClipId,
        timestamp: Timestamp,
    },

    /// A message finished its turn (dequeued, session released).
    MessagePlayed {
        message_id: Uuid,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Playback Events
    // =========================================================================
    /// An audio session began loading its source.
    PlaybackStarted {
        session_id: Uuid,
        source_kind: String,
        timestamp: Timestamp,
    },

    /// An audio session reached a terminal outcome.
    PlaybackFinished {
        session_id: Uuid,
        outcome: PlaybackOutcome,
        timestamp: Timestamp,
    },

    /// A file-backed session failed and the same text is being retried
    /// through the synthesis engine.
    SynthesisFallback {
        message_id: Uuid,
        reason: String,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Lifecycle Events
    // =========================================================================
    /// The one-time interaction gate opened (first user gesture).
    GateOpened { timestamp: Timestamp },

    /// Interview termination was requested.
    TerminationRequested { timestamp: Timestamp },

    /// The termination callback fired (audio fully drained).
    TerminationCompleted { timestamp: Timestamp },
}

impl DomainEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            DomainEvent::MessageEnqueued { timestamp, .. }
            | DomainEvent::MessageResolved { timestamp, .. }
            | DomainEvent::MessagePlayed { timestamp, .. }
            | DomainEvent::PlaybackStarted { timestamp, .. }
            | DomainEvent::PlaybackFinished { timestamp, .. }
            | DomainEvent::SynthesisFallback { timestamp, .. }
            | DomainEvent::GateOpened { timestamp }
            | DomainEvent::TerminationRequested { timestamp }
            | DomainEvent::TerminationCompleted { timestamp } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::MessageEnqueued { .. } => "message_enqueued",
            DomainEvent::MessageResolved { .. } => "message_resolved",
            DomainEvent::MessagePlayed { .. } => "message_played",
            DomainEvent::PlaybackStarted { .. } => "playback_started",
            DomainEvent::PlaybackFinished { .. } => "playback_finished",
            DomainEvent::SynthesisFallback { .. } => "synthesis_fallback",
            DomainEvent::GateOpened { .. } => "gate_opened",
            DomainEvent::TerminationRequested { .. } => "termination_requested",
            DomainEvent::TerminationCompleted { .. } => "termination_completed",
        }
    }
}
