//! Desktop notifications — the presentation layer.
//!
//! The tray icon carries the state; notifications carry the content: the
//! extracted list, informational notices, and error messages.

use crate::{AppError, AppResult};

use std::panic::Location;

use error_location::ErrorLocation;
use grocery_scribe_core::lifecycle::ExtractedItem;
use notify_rust::Notification;
use tracing::instrument;

const APP_NAME: &str = "Grocery Scribe";

/// Sends desktop notifications.
pub struct Notifier;

impl Notifier {
    /// Create a notifier.
    pub fn new() -> Self {
        Self
    }

    /// Show the extracted grocery list.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn show_list(&self, items: &[ExtractedItem]) -> AppResult<()> {
        let body = if items.is_empty() {
            "No grocery items identified.".to_string()
        } else {
            items
                .iter()
                .map(|item| format!("- {}", item.name))
                .collect::<Vec<_>>()
                .join("\n")
        };

        self.show("Your grocery list", body).await
    }

    /// Show an informational notice.
    #[instrument(skip(self, body))]
    pub async fn notice(&self, body: &str) -> AppResult<()> {
        self.show("Notice", body.to_string()).await
    }

    /// Show an error message.
    #[instrument(skip(self, body))]
    pub async fn error(&self, body: &str) -> AppResult<()> {
        self.show("Error", body.to_string()).await
    }

    async fn show(&self, summary: &str, body: String) -> AppResult<()> {
        let summary = summary.to_string();

        // notify-rust blocks on the notification daemon (D-Bus on Linux).
        tokio::task::spawn_blocking(move || {
            Notification::new()
                .appname(APP_NAME)
                .summary(&summary)
                .body(&body)
                .show()
                .map(|_| ())
                .map_err(|e| AppError::NotificationError {
                    reason: format!("{}", e),
                    location: ErrorLocation::from(Location::caller()),
                })
        })
        .await
        .map_err(|e| AppError::NotificationError {
            reason: format!("Notification task panicked: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?
    }
}
