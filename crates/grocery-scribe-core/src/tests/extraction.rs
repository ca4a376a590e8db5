use crate::{
    error::{ExtractError, ExtractResult},
    extraction::{ExtractionTransport, ItemExtractor, decode_model_reply},
};

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use error_location::ErrorLocation;

/// Transport that records every call and returns a fixed result.
struct RecordingTransport {
    calls: Arc<Mutex<Vec<String>>>,
    items: Vec<&'static str>,
}

impl RecordingTransport {
    fn new(items: Vec<&'static str>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: Arc::clone(&calls),
                items,
            },
            calls,
        )
    }
}

#[async_trait]
impl ExtractionTransport for RecordingTransport {
    #[allow(clippy::unwrap_used)]
    async fn fetch_items(&self, transcript: &str) -> ExtractResult<Vec<String>> {
        self.calls.lock().unwrap().push(transcript.to_string());
        Ok(self.items.iter().map(|s| s.to_string()).collect())
    }
}

/// WHAT: Blank input short-circuits without a transport call
/// WHY: Empty transcripts must never cost a network round trip
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_blank_input_when_extracting_then_no_call_and_empty_result() {
    // Given: An extractor over a call-recording transport
    let (transport, calls) = RecordingTransport::new(vec!["milk"]);
    let extractor = ItemExtractor::new(Box::new(transport));

    // When: Extracting from empty and whitespace-only input
    let empty = extractor.extract_items("").await.unwrap();
    let spaces = extractor.extract_items("   ").await.unwrap();

    // Then: Both results are empty and the transport was never invoked
    assert!(empty.is_empty());
    assert!(spaces.is_empty());
    assert!(calls.lock().unwrap().is_empty());
}

/// WHAT: Non-blank input reaches the transport verbatim
/// WHY: The extraction call must receive the transcript unmodified
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_text_when_extracting_then_transport_receives_it_verbatim() {
    // Given: An extractor over a call-recording transport
    let (transport, calls) = RecordingTransport::new(vec!["milk", "sugar"]);
    let extractor = ItemExtractor::new(Box::new(transport));

    // When: Extracting from a real transcript
    let items = extractor.extract_items("दूध चाहिए").await.unwrap();

    // Then: The transcript arrived verbatim and the items came back
    assert_eq!(calls.lock().unwrap().as_slice(), ["दूध चाहिए"]);
    assert_eq!(items, ["milk", "sugar"]);
}

/// WHAT: Fenced replies are unwrapped before parsing
/// WHY: Models routinely wrap JSON in a markdown code block
#[test]
#[allow(clippy::unwrap_used)]
fn given_fenced_reply_when_decoding_then_items_parsed() {
    // Given: A reply wrapped in a fenced block with a language tag
    let raw = " ```json\n[\"milk\",\"sugar\"]\n``` ";

    // When: Decoding
    let items = decode_model_reply(raw).unwrap();

    // Then: The fence is stripped and the array parsed
    assert_eq!(items, ["milk", "sugar"]);
}

/// WHAT: A bare fence without a language tag also unwraps
/// WHY: The tag is optional in model output
#[test]
#[allow(clippy::unwrap_used)]
fn given_untagged_fence_when_decoding_then_items_parsed() {
    let items = decode_model_reply("```\n[\"atta\"]\n```").unwrap();
    assert_eq!(items, ["atta"]);
}

/// WHAT: Unfenced JSON parses directly
/// WHY: Well-behaved replies need no stripping
#[test]
#[allow(clippy::unwrap_used)]
fn given_plain_json_array_when_decoding_then_items_parsed() {
    let items = decode_model_reply("[\"tomatoes\", \"onions\"]").unwrap();
    assert_eq!(items, ["tomatoes", "onions"]);
}

/// WHAT: Valid JSON of the wrong shape degrades to an empty result
/// WHY: A misbehaving model is logged, not surfaced as a user error
#[test]
#[allow(clippy::unwrap_used)]
fn given_wrong_shape_json_when_decoding_then_empty_result() {
    // Given: Valid JSON that is not an array of strings
    let object = decode_model_reply("{\"not\":\"an array\"}").unwrap();
    let mixed = decode_model_reply("[\"milk\", 5]").unwrap();

    // Then: Both decode to an empty list without error
    assert!(object.is_empty());
    assert!(mixed.is_empty());
}

/// WHAT: Malformed JSON fails with InvalidResponseFormat
/// WHY: Unparseable replies are a distinct, user-visible failure
#[test]
fn given_non_json_reply_when_decoding_then_invalid_response_format() {
    // When: Decoding something that is not JSON at all
    let result = decode_model_reply("not json at all");

    // Then: The typed parse failure is returned
    assert!(matches!(
        result,
        Err(ExtractError::InvalidResponseFormat { .. })
    ));
}

#[track_caller]
fn loc() -> ErrorLocation {
    ErrorLocation::from(std::panic::Location::caller())
}

/// WHAT: Quota and timeout failures are retryable, credential failures are not
/// WHY: Callers decide retry policy from this flag; credentials never self-heal
#[test]
fn given_failure_taxonomy_when_classifying_then_only_transient_are_retryable() {
    assert!(ExtractError::QuotaExceeded { location: loc() }.is_retryable());
    assert!(ExtractError::Timeout { location: loc() }.is_retryable());
    assert!(!ExtractError::MissingCredentials { location: loc() }.is_retryable());
    assert!(!ExtractError::InvalidCredentials { location: loc() }.is_retryable());
    assert!(
        !ExtractError::InvalidResponseFormat {
            reason: "bad".to_string(),
            location: loc(),
        }
        .is_retryable()
    );
}

/// WHAT: Each failure kind maps to its own user-facing message
/// WHY: The presentation layer shows these strings directly
#[test]
fn given_failure_kinds_when_formatting_then_messages_are_distinct() {
    let messages = [
        ExtractError::MissingCredentials { location: loc() }.user_message(),
        ExtractError::InvalidCredentials { location: loc() }.user_message(),
        ExtractError::QuotaExceeded { location: loc() }.user_message(),
        ExtractError::Timeout { location: loc() }.user_message(),
        ExtractError::InvalidResponseFormat {
            reason: "bad".to_string(),
            location: loc(),
        }
        .user_message(),
    ];

    for (i, a) in messages.iter().enumerate() {
        for b in messages.iter().skip(i + 1) {
            assert_ne!(a, b);
        }
    }
}
