use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use grocery_scribe_core::{ExtractError, extraction::ItemExtractor};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, instrument, warn};

const MISSING_KEY_MESSAGE: &str =
    "Internal server configuration error. API key for AI service is missing.";
const BAD_BODY_MESSAGE: &str = "Request body is not valid JSON.";
const MISSING_TEXT_MESSAGE: &str = "Please provide a 'text' (string) in the request body.";

/// Shared router state.
///
/// `extractor` is `None` when the service started without credentials; every
/// request then answers with the configuration error instead of panicking at
/// startup.
#[derive(Clone)]
pub(crate) struct AppState {
    extractor: Option<Arc<ItemExtractor>>,
}

impl AppState {
    pub(crate) fn new(extractor: Option<ItemExtractor>) -> Self {
        Self {
            extractor: extractor.map(Arc::new),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtractRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExtractReply {
    grocery_list: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorReply {
    error: String,
}

/// Build the relay router. CORS is permissive — the relay exists precisely
/// so browser clients can call it without credentials of their own.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/grocery-list", post(extract_items))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[instrument(skip_all)]
async fn extract_items(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractReply>, (StatusCode, Json<ErrorReply>)> {
    let Some(extractor) = &state.extractor else {
        return Err(reply_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            MISSING_KEY_MESSAGE,
        ));
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Invalid request body");
            return Err(reply_error(StatusCode::BAD_REQUEST, BAD_BODY_MESSAGE));
        }
    };

    let text = request.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(reply_error(StatusCode::BAD_REQUEST, MISSING_TEXT_MESSAGE));
    }

    match extractor.extract_items(&text).await {
        Ok(items) => {
            info!(item_count = items.len(), "Extraction complete");
            Ok(Json(ExtractReply {
                grocery_list: items,
            }))
        }
        Err(e) => {
            warn!(error = ?e, "Extraction failed");
            Err(reply_failure(e))
        }
    }
}

fn reply_error(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorReply>) {
    (
        status,
        Json(ErrorReply {
            error: message.to_string(),
        }),
    )
}

/// Map the extraction failure taxonomy onto wire status codes:
/// 429 quota, 504 timeout, 500 everything else.
fn reply_failure(error: ExtractError) -> (StatusCode, Json<ErrorReply>) {
    let status = match &error {
        ExtractError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        ExtractError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorReply {
            error: error.user_message(),
        }),
    )
}
