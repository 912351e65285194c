use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

/// One call's worth of input for a text-generation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Standing instructions: who the speaker is and how they talk.
    pub system_instruction: String,
    /// The per-call prompt: topic plus the conversation so far.
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// The provider stopped at the output cap; `text` is partial.
    pub truncated: bool,
}

impl Generation {
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: false,
        }
    }

    pub fn truncated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: true,
        }
    }
}

/// Every way a provider call can fail. The gateway turns each of these into a
/// transcript line instead of propagating it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("API key is missing")]
    MissingCredential,
    #[error("response blocked: {reason}")]
    Blocked { reason: String },
    #[error("request timed out")]
    Timeout,
    #[error("no text returned from the model")]
    EmptyResponse,
    #[error("{0}")]
    Provider(String),
}

// The seam between the debate and whichever model produces the lines. The
// orchestrator and gateway only ever see this trait, so tests drive them with
// `MockTextGenerator` or a scripted fake instead of a network client.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
        (**self).generate(request).await
    }
}
