//! Grocery item extraction from transcript text.
//!
//! One client contract, two interchangeable transports: [`DirectTransport`]
//! calls the hosted language model itself; [`RelayTransport`] goes through
//! the relay service for deployments that must not embed model credentials.
//! Both surface the same failure taxonomy and the same reply-shape policy.

mod direct;
mod relay;

pub use {
    direct::{DirectConfig, DirectTransport},
    relay::{RelayConfig, RelayTransport},
};

use crate::error::{ExtractError, ExtractResult};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;
use tracing::{debug, instrument, warn};

/// One extraction call for a non-blank transcript.
///
/// Implementations perform exactly one remote request per call — no caching,
/// no batching, no automatic retry.
#[async_trait]
pub trait ExtractionTransport: Send + Sync {
    /// Fetch the item names mentioned in `transcript`.
    async fn fetch_items(&self, transcript: &str) -> ExtractResult<Vec<String>>;
}

/// Converts free-form transcript text into a list of short item names.
pub struct ItemExtractor {
    transport: Box<dyn ExtractionTransport>,
}

impl ItemExtractor {
    /// Build an extractor over the given transport.
    pub fn new(transport: Box<dyn ExtractionTransport>) -> Self {
        Self { transport }
    }

    /// Extract grocery items from `transcript`.
    ///
    /// Empty or whitespace-only input short-circuits to an empty result
    /// without touching the network.
    #[instrument(skip_all, fields(transcript_len = transcript.len()))]
    pub async fn extract_items(&self, transcript: &str) -> ExtractResult<Vec<String>> {
        if transcript.trim().is_empty() {
            debug!("Blank transcript, skipping extraction call");
            return Ok(Vec::new());
        }

        self.transport.fetch_items(transcript).await
    }
}

/// The fixed instruction combined with the verbatim transcript.
///
/// Deterministic by construction: same transcript, same prompt.
pub(crate) fn build_prompt(transcript: &str) -> String {
    format!(
        "You are an assistant specialized in understanding conversations from \
         a kitchen environment. The following text is a transcript of a \
         conversation in Hindi.\n\
         Your task is to:\n\
         1. Analyze the conversation.\n\
         2. Identify all grocery items that are mentioned as needing to be \
         bought, running low, out of stock, or required for a recipe being \
         discussed soon.\n\
         3. Provide a list of these grocery items in English.\n\
         4. The output MUST be a JSON array of strings, where each string is \
         a single grocery item. For example: [\"milk\", \"sugar\", \
         \"tomatoes\", \"onions\"].\n\
         5. If no relevant grocery items are found, return an empty JSON \
         array: [].\n\
         Do not include any explanations or text outside of the JSON array \
         in your response.\n\n\
         Hindi Conversation Transcript:\n\"{}\"\n\n\
         JSON Array of Grocery Items (English):",
        transcript
    )
}

/// Decode a raw model reply into item names.
///
/// The reply may be wrapped in a fenced code block (optional language tag);
/// the fence is stripped before parsing. Malformed JSON fails with
/// `InvalidResponseFormat`. A syntactically valid value that is not an array
/// of strings degrades to an empty result with a warning — the model obeyed
/// the format badly, which is not the caller's problem.
#[track_caller]
pub(crate) fn decode_model_reply(raw: &str) -> ExtractResult<Vec<String>> {
    let body = strip_code_fence(raw);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ExtractError::InvalidResponseFormat {
            reason: format!("{}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    match value {
        serde_json::Value::Array(entries)
            if entries.iter().all(serde_json::Value::is_string) =>
        {
            Ok(entries
                .into_iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect())
        }
        other => {
            warn!(reply = %other, "Model reply was valid JSON of the wrong shape");
            Ok(Vec::new())
        }
    }
}

/// Strip a surrounding ```-fence, including an optional language tag on the
/// opening line. Unbalanced fences are left untouched.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };

    // Language tag, e.g. ```json
    inner
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
        .trim()
}
