use crate::config::default_extraction_timeout_secs;

use std::{panic::Location, time::Duration};

use async_trait::async_trait;
use error_location::ErrorLocation;
use grocery_scribe_core::{
    ExtractError,
    extraction::{
        DirectConfig, DirectTransport, ExtractionTransport, ItemExtractor, RelayConfig,
        RelayTransport,
    },
};
use serde::{Deserialize, Serialize};

/// Which transport carries the extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Call the hosted model directly (API key lives on this machine).
    #[default]
    Direct,
    /// Go through a deployed grocery-scribe-relay instance.
    Relay,
}

/// Extraction service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Transport selection.
    #[serde(default)]
    pub mode: ExtractionMode,

    /// API key for direct mode.
    #[serde(default)]
    pub api_key: String,

    /// Extraction model override for direct mode (None = default).
    #[serde(default)]
    pub model: Option<String>,

    /// Relay endpoint for relay mode, e.g.
    /// `https://relay.example.com/api/grocery-list`.
    #[serde(default)]
    pub relay_url: String,

    /// Request deadline in seconds.
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,
}

impl ExtractionConfig {
    /// Build the extractor for the configured transport.
    ///
    /// # Errors
    ///
    /// `MissingCredentials` when the selected transport is not configured;
    /// callers report this at startup and fall back to
    /// [`unconfigured_extractor`] so the process stays alive.
    pub fn build_extractor(&self) -> Result<ItemExtractor, ExtractError> {
        let timeout = Duration::from_secs(self.timeout_secs);

        let transport: Box<dyn ExtractionTransport> = match self.mode {
            ExtractionMode::Direct => {
                let mut config = DirectConfig::new(self.api_key.clone()).with_timeout(timeout);
                if let Some(model) = &self.model {
                    config = config.with_model(model.clone());
                }
                Box::new(DirectTransport::new(config)?)
            }
            ExtractionMode::Relay => Box::new(RelayTransport::new(
                RelayConfig::new(self.relay_url.clone()).with_timeout(timeout),
            )?),
        };

        Ok(ItemExtractor::new(transport))
    }
}

/// Stand-in extractor for a service that was never configured.
///
/// Keeps the process alive after a startup configuration failure; every
/// extraction attempt surfaces the missing-credentials message instead.
pub(crate) fn unconfigured_extractor() -> ItemExtractor {
    ItemExtractor::new(Box::new(UnconfiguredTransport))
}

struct UnconfiguredTransport;

#[async_trait]
impl ExtractionTransport for UnconfiguredTransport {
    async fn fetch_items(&self, _transcript: &str) -> Result<Vec<String>, ExtractError> {
        Err(ExtractError::MissingCredentials {
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
