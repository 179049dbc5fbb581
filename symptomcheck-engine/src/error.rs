use crate::traits::BackendFailure;
use std::path::PathBuf;
use std::time::Duration;
use symptomcheck_core::audio::AudioFileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("the AI service did not respond within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("the AI service returned an empty response")]
    EmptyResponse,

    #[error("the AI service returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("the AI service rejected the API key: {0}")]
    BackendAuth(String),

    #[error("the AI service quota is exhausted: {0}")]
    BackendQuota(String),

    #[error("the AI service failed: {0}")]
    Backend(String),

    #[error("unexpected error: {0}")]
    Unknown(String),

    #[error(transparent)]
    AudioFile(#[from] AudioFileError),

    #[error("failed to read audio file {}: {source}", .path.display())]
    ReadAudio {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    /// Whether repeating the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout(_)
                | GatewayError::EmptyResponse
                | GatewayError::BackendQuota(_)
                | GatewayError::Backend(_)
                | GatewayError::Unknown(_)
        )
    }
}

/// Maps a backend failure onto the gateway taxonomy.
///
/// Heuristic: the backend exposes no structured codes we rely on, so API
/// errors are sorted by substrings of their message.
pub fn classify_backend_failure(failure: BackendFailure) -> GatewayError {
    match failure {
        BackendFailure::Api(message) => {
            if message.contains("API key") {
                GatewayError::BackendAuth(message)
            } else if message.to_lowercase().contains("quota") {
                GatewayError::BackendQuota(message)
            } else {
                GatewayError::Backend(message)
            }
        }
        BackendFailure::Other(e) => GatewayError::Unknown(format!("{e:#}")),
    }
}
