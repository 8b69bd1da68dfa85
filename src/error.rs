//! Error taxonomy for the biometric and analysis collaborators.

use std::time::Duration;

use thiserror::Error;

/// Failures the core can observe. Everything except `InvalidReading` and
/// `InvalidPreset` originates in an external collaborator and is converted to
/// "no new information this tick" by the loops.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GhostError {
    #[error("invalid biometric reading: {0}")]
    InvalidReading(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("provider access token expired")]
    AuthExpired,

    #[error("analysis timed out after {0:?}")]
    AnalysisTimeout(Duration),

    #[error("analysis failed: {0}")]
    AnalysisError(String),

    #[error("unknown biometric preset {0} (expected 1-5)")]
    InvalidPreset(u8),

    #[error("image decode failed: {0}")]
    Image(String),
}

impl GhostError {
    /// Analysis failures are treated like an unavailable source for that channel.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GhostError::SourceUnavailable(_)
                | GhostError::AnalysisTimeout(_)
                | GhostError::AnalysisError(_)
        )
    }
}

impl From<image::ImageError> for GhostError {
    fn from(err: image::ImageError) -> Self {
        GhostError::Image(err.to_string())
    }
}
