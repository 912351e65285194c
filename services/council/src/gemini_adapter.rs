use async_trait::async_trait;
use council_core::credentials::CredentialResolver;
use council_core::generator::{Generation, GenerationError, GenerationRequest, TextGenerator};
use gemini_text::types::{
    FinishReason, GenerateContentRequest, GenerateContentResponse, HarmBlockThreshold, SafetySetting,
};
use std::sync::Arc;

/// An adapter that implements the generic `TextGenerator` trait for `gemini_text::Client`.
///
/// The key is resolved on every call, so a key saved mid-session is picked up
/// by the next turn without restarting.
pub struct GeminiGenerator {
    client: gemini_text::Client,
    credentials: Arc<CredentialResolver>,
}

impl GeminiGenerator {
    pub fn new(client: gemini_text::Client, credentials: Arc<CredentialResolver>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    pub fn client(&self) -> &gemini_text::Client {
        &self.client
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
        let api_key = self.credentials.resolve().await.map_err(|e| {
            tracing::warn!("{}", e);
            GenerationError::MissingCredential
        })?;

        let body = GenerateContentRequest::builder()
            .with_system_instruction(&request.system_instruction)
            .with_user_text(&request.prompt)
            .with_temperature(request.temperature)
            .with_max_output_tokens(request.max_output_tokens)
            .with_safety_settings(SafetySetting::uniform(HarmBlockThreshold::BlockOnlyHigh))
            .build();

        let response = self
            .client
            .with_api_key(api_key)
            .generate_content(&body)
            .await
            .map_err(provider_error)?;

        interpret(&response)
    }
}

fn provider_error(error: gemini_text::Error) -> GenerationError {
    match error {
        gemini_text::Error::Timeout(_) => GenerationError::Timeout,
        other => GenerationError::Provider(other.to_string()),
    }
}

/// Maps a raw response onto the outcomes the debate cares about.
pub fn interpret(response: &GenerateContentResponse) -> Result<Generation, GenerationError> {
    if let Some(reason) = response.block_reason() {
        return Err(GenerationError::Blocked {
            reason: reason.as_str().to_string(),
        });
    }

    if let Some(text) = response.text() {
        return Ok(Generation::complete(text));
    }

    match (response.finish_reason(), response.partial_text()) {
        (Some(FinishReason::MaxTokens), Some(text)) => Ok(Generation::truncated(text)),
        // Any stop other than a clean one explains the missing text.
        (Some(reason), None) if reason != FinishReason::Stop => Err(GenerationError::Blocked {
            reason: reason.as_str().to_string(),
        }),
        // Unusual finish reasons sometimes still carry usable text.
        (_, Some(text)) => Ok(Generation::complete(text)),
        (_, None) => Err(GenerationError::EmptyResponse),
    }
}
