use crate::config::ContactNumber;

/// WHAT: Country-coded numbers pass validation
/// WHY: The happy-path contract for the settings flow
#[test]
#[allow(clippy::unwrap_used)]
fn given_valid_numbers_when_parsing_then_accepted() {
    // Given/When: Typical country-coded inputs, with and without the plus
    let with_plus = ContactNumber::parse("+919876543210").unwrap();
    let without_plus = ContactNumber::parse("919876543210").unwrap();
    let padded = ContactNumber::parse("  +4915112345678  ").unwrap();

    // Then: Values are normalized but otherwise kept as entered
    assert_eq!(with_plus.as_str(), "+919876543210");
    assert_eq!(without_plus.as_str(), "919876543210");
    assert_eq!(padded.as_str(), "+4915112345678");
}

/// WHAT: The share path drops the leading plus
/// WHY: The message-compose URL wants bare digits in its path
#[test]
#[allow(clippy::unwrap_used)]
fn given_plus_prefixed_number_when_building_share_path_then_digits_only() {
    let number = ContactNumber::parse("+919876543210").unwrap();
    assert_eq!(number.share_path(), "919876543210");
}

/// WHAT: Malformed numbers are rejected
/// WHY: Only E.164-shaped numbers can be shared to
#[test]
fn given_invalid_numbers_when_parsing_then_rejected() {
    // Leading zero, letters, too short, too long, embedded spaces, empty
    for input in [
        "0123456789",
        "+0123",
        "98-76",
        "abc",
        "+91 98765",
        "9",
        "+1234567890123456",
        "",
        "+",
    ] {
        assert!(ContactNumber::parse(input).is_err(), "accepted {:?}", input);
    }
}
