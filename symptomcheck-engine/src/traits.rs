use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    // Raw bytes; encoding for the wire happens in the backend.
    Audio { mime_type: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedText {
    // `None` when the backend answered without any text.
    pub text: Option<String>,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum BackendFailure {
    /// The backend answered with an error of its own (bad key, quota, blocked prompt...).
    #[error("{0}")]
    Api(String),

    /// Anything else: transport, decoding, local I/O.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, contents: &[Content]) -> Result<GeneratedText, BackendFailure>;
}
