use crate::{AppError, AppResult};

use std::{fmt, panic::Location};

use error_location::ErrorLocation;

/// A validated WhatsApp contact number.
///
/// Validation contract: an optional leading `+`, a leading non-zero digit,
/// and 2 to 15 digits total — the E.164 shape the message-compose URL
/// accepts. Construction is the only way in, so a held value is always
/// shareable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactNumber(String);

impl ContactNumber {
    /// Validate and normalize user input (surrounding whitespace is trimmed).
    #[track_caller]
    pub fn parse(input: &str) -> AppResult<Self> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let valid = (2..=15).contains(&digits.len())
            && !digits.starts_with('0')
            && digits.chars().all(|c| c.is_ascii_digit());

        if !valid {
            return Err(AppError::InvalidContact {
                reason: "expected a country-coded number like +91XXXXXXXXXX".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The number as entered (including a leading `+` if present).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits only, as the message-compose URL path expects.
    pub fn share_path(&self) -> &str {
        self.0.strip_prefix('+').unwrap_or(&self.0)
    }
}

impl fmt::Display for ContactNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
