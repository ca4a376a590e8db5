use crate::{
    error::{ExtractError, ExtractResult},
    extraction::ExtractionTransport,
};

use std::{panic::Location, time::Duration};

use async_trait::async_trait;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for extraction through the relay service.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    endpoint: String,
    timeout: Duration,
}

impl RelayConfig {
    /// Configuration pointing at a deployed relay, e.g.
    /// `https://relay.example.com/api/grocery-list`.
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayReply {
    #[serde(default)]
    grocery_list: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RelayFailure {
    error: String,
}

/// Extraction through the relay service, for callers that must not hold
/// model credentials. Behaves identically to [`super::DirectTransport`]
/// from the caller's perspective.
pub struct RelayTransport {
    client: reqwest::Client,
    config: RelayConfig,
}

impl RelayTransport {
    /// Build the transport, validating configuration up front.
    ///
    /// # Errors
    ///
    /// `MissingCredentials` when no relay endpoint is configured.
    #[track_caller]
    pub fn new(config: RelayConfig) -> ExtractResult<Self> {
        if config.endpoint.trim().is_empty() {
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
impl ExtractionTransport for RelayTransport {
    #[instrument(skip_all, fields(endpoint = %self.config.endpoint))]
    async fn fetch_items(&self, transcript: &str) -> ExtractResult<Vec<String>> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&RelayRequest { text: transcript })
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<RelayFailure>()
                .await
                .map(|failure| failure.error)
                .unwrap_or_else(|_| format!("relay returned {}", status));
            return Err(status_error(status, message));
        }

        let reply: RelayReply = response.json().await.map_err(request_error)?;

        debug!("Relay reply received");

        // The relay already decoded the model reply; tolerate a wrong-shape
        // body the same way the direct transport tolerates one.
        match reply.grocery_list {
            Some(serde_json::Value::Array(entries))
                if entries.iter().all(serde_json::Value::is_string) =>
            {
                Ok(entries
                    .into_iter()
                    .filter_map(|entry| entry.as_str().map(str::to_string))
                    .collect())
            }
            other => {
                warn!(body = ?other, "Relay reply was not an array of strings");
                Ok(Vec::new())
            }
        }
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
fn status_error(status: reqwest::StatusCode, message: String) -> ExtractError {
    let location = ErrorLocation::from(Location::caller());
    match status.as_u16() {
        401 | 403 => ExtractError::InvalidCredentials { location },
        429 => ExtractError::QuotaExceeded { location },
        504 => ExtractError::Timeout { location },
        _ => ExtractError::Unknown { message, location },
    }
}
