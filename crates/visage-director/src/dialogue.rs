//! Dialogue collaborator seam.
//!
//! The dialogue engine is external: given the prior turns, it returns one
//! new turn. The core makes a single attempt with no retry policy; a failed
//! attempt yields a user-visible default text instead of an error.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use visage_core::types::{AnimationIntent, Message, MessageContent, Role};

use crate::error::DirectorError;

/// Text shown when the dialogue collaborator fails to produce a turn.
const FALLBACK_TEXT: &str = "I'm sorry, I didn't catch that. Could you repeat the question?";

/// One turn produced by the dialogue collaborator.
#[derive(Debug, Clone)]
pub struct DialogueTurn {
    pub text: String,
    pub audio_ref: Option<String>,
    pub animation_intent: Option<AnimationIntent>,
    pub is_completed: bool,
}

impl DialogueTurn {
    /// A plain spoken turn.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio_ref: None,
            animation_intent: None,
            is_completed: false,
        }
    }

    /// Convert this turn into a queueable message.
    pub fn into_message(self, role: Role) -> Message {
        Message::new(
            role,
            MessageContent {
                text: self.text,
                audio_ref: self.audio_ref,
                animation_intent: self.animation_intent,
                is_completed: self.is_completed,
            },
        )
    }
}

/// External dialogue engine producing the next turn from the history.
pub trait DialogueProvider: Send + Sync {
    fn next_turn(
        &self,
        history: &[Message],
    ) -> impl Future<Output = Result<DialogueTurn, DirectorError>> + Send;
}

/// Single-attempt call with the default-text failure policy.
///
/// The provider gets exactly one try; on failure the returned turn carries
/// the user-visible fallback text instead of propagating the error.
pub async fn next_turn_or_default<P: DialogueProvider>(
    provider: &P,
    history: &[Message],
) -> DialogueTurn {
    match provider.next_turn(history).await {
        Ok(turn) => turn,
        Err(e) => {
            tracing::warn!(error = %e, "Dialogue provider failed; using fallback text");
            DialogueTurn::text_only(FALLBACK_TEXT)
        }
    }
}

/// Interviewer with a fixed question roster.
///
/// Drives the system's "ask this question" trigger: each call yields the
/// next canned question, and the turn after the roster is exhausted closes
/// the interview.
pub struct CannedDialogue {
    questions: Vec<String>,
    index: AtomicUsize,
}

impl CannedDialogue {
    pub fn new(questions: Vec<String>) -> Self {
        Self {
            questions,
            index: AtomicUsize::new(0),
        }
    }

    /// The default interviewer roster used by the demo binary.
    pub fn default_roster() -> Self {
        Self::new(vec![
            "Hello! Thanks for joining today. Tell me a little about yourself.".to_string(),
            "What drew you to this role?".to_string(),
            "Describe a project you are proud of.".to_string(),
            "How do you handle disagreement within a team?".to_string(),
            "Where do you see yourself in five years?".to_string(),
        ])
    }

    /// How many questions remain.
    pub fn remaining(&self) -> usize {
        self.questions
            .len()
            .saturating_sub(self.index.load(Ordering::Relaxed))
    }
}

impl DialogueProvider for CannedDialogue {
    async fn next_turn(&self, _history: &[Message]) -> Result<DialogueTurn, DirectorError> {
        let index = self.index.fetch_add(1, Ordering::Relaxed);
        match self.questions.get(index) {
            Some(question) => {
                let is_last = index + 1 == self.questions.len();
                Ok(DialogueTurn {
                    text: question.clone(),
                    audio_ref: None,
                    animation_intent: None,
                    is_completed: is_last,
                })
            }
            None => Ok(DialogueTurn {
                text: "That's everything I wanted to ask. Thank you for your time!".to_string(),
                audio_ref: None,
                animation_intent: None,
                is_completed: true,
            }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
