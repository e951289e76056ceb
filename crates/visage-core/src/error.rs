use thiserror::Error;

/// Top-level error type for the Visage system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for VisageError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VisageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Director error: {0}")]
    Director(String),

    #[error("Dialogue error: {0}")]
    Dialogue(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for VisageError {
    fn from(err: toml::de::Error) -> Self {
        VisageError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for VisageError {
    fn from(err: toml::ser::Error) -> Self {
        VisageError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VisageError {
    fn from(err: serde_json::Error) -> Self {
        VisageError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Visage operations.
pub type Result<T> = std::result::Result<T, VisageError>;
