use crate::{
    config::ContactNumber,
    share::{compose_message, compose_url},
};

use grocery_scribe_core::lifecycle::ExtractedItem;
use uuid::Uuid;

fn items(names: &[&str]) -> Vec<ExtractedItem> {
    names
        .iter()
        .map(|name| ExtractedItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
        })
        .collect()
}

/// WHAT: The share message lists one bullet per item
/// WHY: The recipient reads this text directly in the chat
#[test]
fn given_items_when_composing_message_then_bulleted_list() {
    // Given: Two extracted items
    let list = items(&["milk", "sugar"]);

    // When: Composing the share message
    let message = compose_message(&list);

    // Then: Greeting, bullets, and attribution are present
    assert!(message.starts_with("Hello! Here's the grocery list"));
    assert!(message.contains("- milk\n- sugar"));
    assert!(message.ends_with("Powered by Grocery Scribe."));
}

/// WHAT: The compose URL targets the contact and embeds the encoded message
/// WHY: The handoff is just a URL; it must be well-formed for the service
#[test]
#[allow(clippy::unwrap_used)]
fn given_contact_and_message_when_composing_url_then_wa_me_with_query() {
    // Given: A contact and a message with characters needing encoding
    let contact = ContactNumber::parse("+919876543210").unwrap();
    let message = "Hello! Here's the list:\n- milk";

    // When: Composing the URL
    let url = compose_url(&contact, message).unwrap();

    // Then: Digits-only path, encoded text query, https scheme
    assert_eq!(url.scheme(), "https");
    assert_eq!(url.host_str(), Some("wa.me"));
    assert_eq!(url.path(), "/919876543210");
    let query = url.query().unwrap_or_default();
    assert!(query.starts_with("text="));
    assert!(!query.contains('\n'));

    // And: The message round-trips through the query encoding
    let (_, decoded) = url.query_pairs().next().unwrap();
    assert_eq!(decoded, message);
}
