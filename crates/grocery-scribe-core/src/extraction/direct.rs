use crate::{
    error::{ExtractError, ExtractResult},
    extraction::{ExtractionTransport, build_prompt, decode_model_reply},
};

use std::{fmt, panic::Location, time::Duration};

use async_trait::async_trait;
use error_location::ErrorLocation;
use serde::Deserialize;
use tracing::{debug, instrument};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-5-nano";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the direct (in-process) extraction transport.
#[derive(Clone)]
pub struct DirectConfig {
    api_key: String,
    model: String,
    timeout: Duration,
}

impl DirectConfig {
    /// Configuration with the default model and timeout.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the extraction model.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Override the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for DirectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Extraction via a direct chat-completions call to the hosted model.
pub struct DirectTransport {
    client: reqwest::Client,
    config: DirectConfig,
}

impl DirectTransport {
    /// Build the transport, validating credentials up front.
    ///
    /// # Errors
    ///
    /// `MissingCredentials` when no API key is configured — established at
    /// construction so a misconfigured service is reported at process start,
    /// not on first use.
    #[track_caller]
    pub fn new(config: DirectConfig) -> ExtractResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ExtractError::MissingCredentials {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }
}

#[async_trait]
impl ExtractionTransport for DirectTransport {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn fetch_items(&self, transcript: &str) -> ExtractResult<Vec<String>> {
        let prompt = build_prompt(transcript);

        let response = self
            .client
            .post(CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&serde_json::json!({
                "model": self.config.model,
                "messages": [
                    {"role": "user", "content": prompt}
                ]
            }))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let chat: ChatResponse = response.json().await.map_err(request_error)?;

        let reply = chat
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| ExtractError::Unknown {
                message: "empty reply from the extraction model".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!(reply_len = reply.len(), "Extraction reply received");

        decode_model_reply(reply)
    }
}

#[track_caller]
fn request_error(e: reqwest::Error) -> ExtractError {
    if e.is_timeout() {
        ExtractError::Timeout {
            location: ErrorLocation::from(Location::caller()),
        }
    } else {
        ExtractError::Unknown {
            message: format!("{}", e),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

#[track_caller]
fn status_error(status: reqwest::StatusCode, body: String) -> ExtractError {
    let location = ErrorLocation::from(Location::caller());
    match status.as_u16() {
        401 | 403 => ExtractError::InvalidCredentials { location },
        429 => ExtractError::QuotaExceeded { location },
        _ => ExtractError::Unknown {
            message: format!("extraction service returned {}: {}", status, body),
            location,
        },
    }
}
