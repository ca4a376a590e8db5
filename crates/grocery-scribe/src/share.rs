//! Outbound share action.
//!
//! Builds the prefilled message-compose URL for the configured contact and
//! opens it in the system handler. The list text can also be copied to the
//! clipboard so it is pasteable anywhere. No response is awaited or
//! validated — the handoff is fire-and-forget.

use crate::{AppError, AppResult, config::ContactNumber};

use std::panic::Location;

use arboard::Clipboard;
use error_location::ErrorLocation;
use grocery_scribe_core::lifecycle::ExtractedItem;
use tracing::{debug, info, instrument};
use url::Url;

const COMPOSE_BASE: &str = "https://wa.me/";

/// Share handler for the message-compose handoff.
pub struct ShareHandler {
    clipboard: Clipboard,
}

impl ShareHandler {
    /// Create a new share handler.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let clipboard = Clipboard::new().map_err(|e| AppError::ClipboardError {
            reason: format!("Failed to initialize clipboard: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!("ShareHandler initialized");

        Ok(Self { clipboard })
    }

    /// Hand the list off to the messaging service.
    ///
    /// Copies the message text to the clipboard first (when enabled), then
    /// opens the compose URL in a new browsing context.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub fn share_list(
        &mut self,
        contact: &ContactNumber,
        items: &[ExtractedItem],
        copy_to_clipboard: bool,
    ) -> AppResult<()> {
        let message = compose_message(items);

        if copy_to_clipboard {
            self.clipboard
                .set_text(&message)
                .map_err(|e| AppError::ClipboardError {
                    reason: format!("Failed to set clipboard: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            debug!(text_len = message.len(), "List copied to clipboard");
        }

        let url = compose_url(contact, &message)?;

        open::that(url.as_str()).map_err(|e| AppError::ShareError {
            reason: format!("Failed to open compose URL: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(contact = %contact, "Share URL opened");

        Ok(())
    }
}

/// Greeting, one bullet per item, closing attribution.
pub(crate) fn compose_message(items: &[ExtractedItem]) -> String {
    let bullets = items
        .iter()
        .map(|item| format!("- {}", item.name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Hello! Here's the grocery list from our conversation:\n\n{}\n\n\
         Powered by Grocery Scribe.",
        bullets
    )
}

/// The prefilled message-compose URL for the contact.
#[track_caller]
pub(crate) fn compose_url(contact: &ContactNumber, message: &str) -> AppResult<Url> {
    let mut url = Url::parse(COMPOSE_BASE)
        .and_then(|base| base.join(contact.share_path()))
        .map_err(|e| AppError::ShareError {
            reason: format!("Failed to build compose URL: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    url.query_pairs_mut().append_pair("text", message);

    Ok(url)
}
