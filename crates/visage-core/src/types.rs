use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Which side of the conversation produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human participant.
    User,
    /// The avatar / dialogue engine.
    Assistant,
}

/// Where a session's audio comes from.
///
/// The two sources are mutually exclusive per session: a session plays either
/// a pre-recorded asset or a synthesized utterance, never both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSourceRef {
    /// A reference into the asset store (URL, path, or inline payload key).
    Asset(String),
    /// Text to be spoken by the synthesis engine.
    Utterance(String),
}

impl AudioSourceRef {
    /// Short label used in logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            AudioSourceRef::Asset(_) => "asset",
            AudioSourceRef::Utterance(_) => "utterance",
        }
    }
}

/// Lifecycle state of a single audio session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Constructed; the source has not started loading.
    Idle,
    /// The source is resolving/buffering; playback has not begun.
    Loading,
    /// The asset buffered enough to play through and is audible.
    Playing,
    /// Playback ran to completion or was explicitly stopped.
    Ended,
    /// The source failed to load or errored mid-playback.
    Error,
    /// The source never became ready within the bounded wait.
    TimedOut,
}

impl SessionState {
    /// Whether this state is terminal (no further transitions occur).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Ended | SessionState::Error | SessionState::TimedOut
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Loading => write!(f, "Loading"),
            SessionState::Playing => write!(f, "Playing"),
            SessionState::Ended => write!(f, "Ended"),
            SessionState::Error => write!(f, "Error"),
            SessionState::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// How a single audio session resolved.
///
/// Every session resolves exactly once with one of these outcomes, including
/// sessions cancelled via `stop()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOutcome {
    /// The asset played to its natural end.
    Completed,
    /// Loading or playback failed.
    Failed(String),
    /// The asset never became ready within the bounded wait.
    TimedOut,
    /// The session was explicitly stopped before finishing.
    Aborted,
}

impl PlaybackOutcome {
    /// Whether this outcome should trigger the synthesized-speech fallback
    /// when it came from a file-backed session.
    pub fn warrants_fallback(&self) -> bool {
        matches!(
            self,
            PlaybackOutcome::Failed(_) | PlaybackOutcome::TimedOut
        )
    }
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Semantic label describing why the avatar should animate ("talking",
/// "listening", "greeting", ...), independent of which concrete clip plays.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationIntent(pub String);

impl AnimationIntent {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The default intent for a spoken message.
    pub fn talking() -> Self {
        Self("talking".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A named, renderable animation clip.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub String);

impl ClipId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

// =============================================================================
// Entity Structs
// =============================================================================

/// The payload of a conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    /// The text of the turn; also the synthesis fallback input.
    pub text: String,
    /// Optional reference to a pre-recorded audio asset for this turn.
    pub audio_ref: Option<String>,
    /// Optional explicit animation intent; defaults to "talking" when absent.
    pub animation_intent: Option<AnimationIntent>,
    /// Whether the dialogue engine considers the interview finished
    /// after this turn.
    pub is_completed: bool,
}

impl MessageContent {
    /// A plain spoken turn with no asset and no explicit intent.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio_ref: None,
            animation_intent: None,
            is_completed: false,
        }
    }
}

/// One conversation turn, immutable once enqueued and consumed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
        }
    }

    /// Convenience constructor for an assistant turn with just text.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageContent::text_only(text))
    }
}

/// The derived signal consumed by the rendering layer each tick.
///
/// Owned by the SpeechDirector; read-only to the rendering layer. The
/// director republishes it whenever the message, audio session state, or
/// interaction gate changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakingState {
    pub is_speaking: bool,
    pub active_clip: ClipId,
}

impl SpeakingState {
    /// The quiescent state: not speaking, showing the given idle clip.
    pub fn idle(clip: ClipId) -> Self {
        Self {
            is_speaking: false,
            active_clip: clip,
        }
    }

    pub fn speaking(clip: ClipId) -> Self {
        Self {
            is_speaking: true,
            active_clip: clip,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::User).unwrap();
        assert_eq!(json, "\"user\"");
        let rt: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(rt, Role::User);

        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_audio_source_ref_kind() {
        assert_eq!(AudioSourceRef::Asset("welcome.audio".into()).kind(), "asset");
        assert_eq!(
            AudioSourceRef::Utterance("hello".into()).kind(),
            "utterance"
        );
    }

    #[test]
    fn test_session_state_terminal() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Loading.is_terminal());
        assert!(!SessionState::Playing.is_terminal());
        assert!(SessionState::Ended.is_terminal());
        assert!(SessionState::Error.is_terminal());
        assert!(SessionState::TimedOut.is_terminal());
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "Idle");
        assert_eq!(SessionState::Loading.to_string(), "Loading");
        assert_eq!(SessionState::Playing.to_string(), "Playing");
        assert_eq!(SessionState::Ended.to_string(), "Ended");
        assert_eq!(SessionState::Error.to_string(), "Error");
        assert_eq!(SessionState::TimedOut.to_string(), "TimedOut");
    }

    #[test]
    fn test_outcome_warrants_fallback() {
        assert!(PlaybackOutcome::Failed("network".into()).warrants_fallback());
        assert!(PlaybackOutcome::TimedOut.warrants_fallback());
        assert!(!PlaybackOutcome::Completed.warrants_fallback());
        assert!(!PlaybackOutcome::Aborted.warrants_fallback());
    }

    #[test]
    fn test_animation_intent_default_talking() {
        let intent = AnimationIntent::talking();
        assert_eq!(intent.as_str(), "talking");
    }

    #[test]
    fn test_clip_id_display() {
        let clip = ClipId::new("talking_2");
        assert_eq!(clip.to_string(), "talking_2");
        assert_eq!(clip.as_str(), "talking_2");
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let now = Utc::now();
        let ts = Timestamp::from_datetime(now);
        assert_eq!(ts.to_datetime().timestamp(), now.timestamp());
    }

    #[test]
    fn test_message_text_only() {
        let msg = Message::assistant("Tell me about yourself.");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content.text, "Tell me about yourself.");
        assert!(msg.content.audio_ref.is_none());
        assert!(msg.content.animation_intent.is_none());
        assert!(!msg.content.is_completed);
        assert!(!msg.id.is_nil());
    }

    #[test]
    fn test_message_ids_unique() {
        let a = Message::assistant("a");
        let b = Message::assistant("b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_message_json_round_trip() {
        let msg = Message::new(
            Role::Assistant,
            MessageContent {
                text: "Hello".to_string(),
                audio_ref: Some("welcome.audio".to_string()),
                animation_intent: Some(AnimationIntent::new("greeting")),
                is_completed: false,
            },
        );
        let json = serde_json::to_string(&msg).unwrap();
        let rt: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(rt.id, msg.id);
        assert_eq!(rt.content.text, "Hello");
        assert_eq!(rt.content.audio_ref.as_deref(), Some("welcome.audio"));
        assert_eq!(
            rt.content.animation_intent.unwrap().as_str(),
            "greeting"
        );
    }

    #[test]
    fn test_speaking_state_constructors() {
        let idle = SpeakingState::idle(ClipId::new("idle"));
        assert!(!idle.is_speaking);
        assert_eq!(idle.active_clip.as_str(), "idle");

        let speaking = SpeakingState::speaking(ClipId::new("talking_1"));
        assert!(speaking.is_speaking);
        assert_eq!(speaking.active_clip.as_str(), "talking_1");
    }

    #[test]
    fn test_speaking_state_serialization() {
        let state = SpeakingState::speaking(ClipId::new("talking_0"));
        let json = serde_json::to_string(&state).unwrap();
        let rt: SpeakingState = serde_json::from_str(&json).unwrap();
        assert_eq!(rt, state);
    }

    #[test]
    fn test_outcome_serialization_round_trip() {
        for outcome in [
            PlaybackOutcome::Completed,
            PlaybackOutcome::Failed("bad asset".to_string()),
            PlaybackOutcome::TimedOut,
            PlaybackOutcome::Aborted,
        ] {
            let json = serde_json::to_string(&outcome).unwrap();
            let rt: PlaybackOutcome = serde_json::from_str(&json).unwrap();
            assert_eq!(rt, outcome);
        }
    }

    #[test]
    fn test_audio_source_ref_serialization() {
        let source = AudioSourceRef::Asset("clip.audio".to_string());
        let json = serde_json::to_string(&source).unwrap();
        let rt: AudioSourceRef = serde_json::from_str(&json).unwrap();
        assert_eq!(rt, source);
    }
}
