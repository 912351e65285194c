use crate::types::{ApiError, GenerateContentRequest, GenerateContentResponse};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};

mod config;
pub mod consts;
mod stats;
mod utils;

pub use config::{Config, ConfigBuilder};
pub use stats::Stats;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A client for the Gemini `generateContent` REST endpoint.
///
/// Cloning is cheap: clones share the connection pool and the usage stats.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Config,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            http,
            config,
            stats: Arc::new(Mutex::new(Stats::new())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a client using `api_key` that shares this client's pool and stats.
    pub fn with_api_key(&self, api_key: SecretString) -> Self {
        let mut config = self.config.clone();
        config.set_api_key(api_key);
        Self {
            http: self.http.clone(),
            config,
            stats: self.stats.clone(),
        }
    }

    pub fn stats(&self) -> Stats {
        match self.stats.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, Error> {
        let url = utils::generate_content_url(&self.config);
        tracing::debug!(model = self.config.model(), "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header(consts::API_KEY_HEADER, self.config.api_key().expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(api_error) => api_error.details().message().to_string(),
                Err(_) if body.trim().is_empty() => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
                Err(_) => body,
            };
            tracing::warn!(status = status.as_u16(), "generateContent failed: {}", message);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;

        if let Ok(mut stats) = self.stats.lock() {
            stats.update_usage(parsed.usage());
        } else {
            tracing::error!("failed to update stats");
        }
        if let Some(usage) = parsed.usage() {
            tracing::debug!(
                "total_tokens: {}, input_tokens: {}, output_tokens: {}",
                usage.total_token_count(),
                usage.prompt_token_count(),
                usage.candidates_token_count()
            );
        }

        Ok(parsed)
    }

    fn transport_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(self.config.timeout())
        } else {
            Error::Http(error)
        }
    }
}
