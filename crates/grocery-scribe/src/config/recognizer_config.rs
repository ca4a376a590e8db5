use grocery_scribe_core::recognize::RealtimeConfig;

use serde::{Deserialize, Serialize};

/// Streaming recognition provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// API key for the realtime transcription service.
    #[serde(default)]
    pub api_key: String,

    /// Transcription model override (None = provider default).
    #[serde(default)]
    pub model: Option<String>,
}

impl RecognizerConfig {
    /// Build the backend configuration object passed into each session.
    pub fn realtime(&self) -> RealtimeConfig {
        let config = RealtimeConfig::new(self.api_key.clone());
        match &self.model {
            Some(model) => config.with_model(model.clone()),
            None => config,
        }
    }
}
