//! Error types for audio playback and synthesis.

use visage_core::error::VisageError;

/// Errors from the playback subsystem.
///
/// Every variant is recovered locally by the director; none propagates as a
/// hard failure to the caller.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// Network or format error resolving an audio reference.
    #[error("asset load failed: {0}")]
    AssetLoad(String),

    /// The source never became ready (or never completed) within bound.
    #[error("playback timed out before becoming ready")]
    Timeout,

    /// Explicit cancellation via `stop()`.
    #[error("playback aborted")]
    Aborted,

    /// The speech synthesis engine is unavailable or errored.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

impl From<PlaybackError> for VisageError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::Synthesis(reason) => VisageError::Synthesis(reason),
            other => VisageError::Audio(other.to_string()),
        }
    }
}
