use crate::routes::{AppState, router};

use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use error_location::ErrorLocation;
use grocery_scribe_core::{
    ExtractError,
    extraction::{ExtractionTransport, ItemExtractor},
};
use tower::ServiceExt;

#[track_caller]
fn loc() -> ErrorLocation {
    ErrorLocation::from(std::panic::Location::caller())
}

#[derive(Clone)]
enum Outcome {
    Items(Vec<&'static str>),
    Quota,
    Timeout,
    BadFormat,
}

struct StubTransport {
    outcome: Outcome,
}

#[async_trait]
impl ExtractionTransport for StubTransport {
    async fn fetch_items(&self, _transcript: &str) -> Result<Vec<String>, ExtractError> {
        match &self.outcome {
            Outcome::Items(items) => Ok(items.iter().map(|s| s.to_string()).collect()),
            Outcome::Quota => Err(ExtractError::QuotaExceeded { location: loc() }),
            Outcome::Timeout => Err(ExtractError::Timeout { location: loc() }),
            Outcome::BadFormat => Err(ExtractError::InvalidResponseFormat {
                reason: "not json".to_string(),
                location: loc(),
            }),
        }
    }
}

fn app(outcome: Outcome) -> axum::Router {
    let extractor = ItemExtractor::new(Box::new(StubTransport { outcome }));
    router(AppState::new(Some(extractor)))
}

#[allow(clippy::unwrap_used)]
fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/grocery-list")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(clippy::unwrap_used)]
async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// WHAT: A valid request returns 200 with the grocery list
/// WHY: The success contract of the relay endpoint
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_valid_text_when_posting_then_200_with_list() {
    // Given: A relay whose extractor finds two items
    let app = app(Outcome::Items(vec!["milk", "sugar"]));

    // When: Posting a transcript
    let response = app
        .oneshot(post_json(r#"{"text":"दूध चाहिए"}"#))
        .await
        .unwrap();

    // Then: 200 with the camelCase list body
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["groceryList"], serde_json::json!(["milk", "sugar"]));
}

/// WHAT: Zero items is still a 200 with an empty list
/// WHY: The wrong-shape / no-items policy is success, not failure
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_no_items_when_posting_then_200_with_empty_list() {
    let app = app(Outcome::Items(vec![]));

    let response = app
        .oneshot(post_json(r#"{"text":"मौसम अच्छा है"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["groceryList"], serde_json::json!([]));
}

/// WHAT: Missing or blank text is a 400 with an error body
/// WHY: The relay validates input before spending an extraction call
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_missing_or_blank_text_when_posting_then_400() {
    for body in [r#"{}"#, r#"{"text":""}"#, r#"{"text":"   "}"#] {
        let app = app(Outcome::Items(vec!["milk"]));
        let response = app.oneshot(post_json(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
        let reply = body_json(response).await;
        assert!(reply["error"].is_string());
    }
}

/// WHAT: A non-JSON body is a 400 with the relay's own error shape
/// WHY: Malformed requests must not surface as framework internals
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_invalid_json_body_when_posting_then_400() {
    let app = app(Outcome::Items(vec![]));

    let response = app.oneshot(post_json("not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let reply = body_json(response).await;
    assert_eq!(reply["error"], "Request body is not valid JSON.");
}

/// WHAT: Failure taxonomy maps onto 429/504/500
/// WHY: Clients re-derive the typed failure from these status codes
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_extraction_failures_when_posting_then_status_taxonomy() {
    let cases = [
        (Outcome::Quota, StatusCode::TOO_MANY_REQUESTS),
        (Outcome::Timeout, StatusCode::GATEWAY_TIMEOUT),
        (Outcome::BadFormat, StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (outcome, expected) in cases {
        let app = app(outcome);
        let response = app
            .oneshot(post_json(r#"{"text":"दूध चाहिए"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), expected);
        let reply = body_json(response).await;
        assert!(reply["error"].is_string());
    }
}

/// WHAT: A relay without credentials answers 500 on every request
/// WHY: Matches the direct transport's MissingCredentials at the wire level
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unconfigured_relay_when_posting_then_500_configuration_error() {
    let app = router(AppState::new(None));

    let response = app
        .oneshot(post_json(r#"{"text":"दूध चाहिए"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let reply = body_json(response).await;
    assert_eq!(
        reply["error"],
        "Internal server configuration error. API key for AI service is missing."
    );
}
