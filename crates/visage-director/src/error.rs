//! Error types for the director crate.

use visage_core::error::VisageError;

use crate::state::DirectorState;

/// Errors from the speech director and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error("invalid state transition: {0} -> {1}")]
    InvalidTransition(DirectorState, DirectorState),
    #[error("dialogue error: {0}")]
    Dialogue(String),
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
}

impl From<DirectorError> for VisageError {
    fn from(err: DirectorError) -> Self {
        match err {
            DirectorError::Dialogue(reason) => VisageError::Dialogue(reason),
            DirectorError::Lifecycle(reason) => VisageError::Lifecycle(reason),
            other => VisageError::Director(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let err = DirectorError::InvalidTransition(DirectorState::Idle, DirectorState::Speaking);
        let msg = err.to_string();
        assert!(msg.contains("Idle"));
        assert!(msg.contains("Speaking"));
    }

    #[test]
    fn test_dialogue_error_display() {
        let err = DirectorError::Dialogue("provider unreachable".to_string());
        assert_eq!(err.to_string(), "dialogue error: provider unreachable");
    }

    #[test]
    fn test_conversion_to_visage_error() {
        let err: VisageError =
            DirectorError::InvalidTransition(DirectorState::Idle, DirectorState::Draining).into();
        assert!(matches!(err, VisageError::Director(_)));

        let err: VisageError = DirectorError::Dialogue("down".to_string()).into();
        assert!(matches!(err, VisageError::Dialogue(_)));

        let err: VisageError = DirectorError::Lifecycle("gate".to_string()).into();
        assert!(matches!(err, VisageError::Lifecycle(_)));
    }
}
