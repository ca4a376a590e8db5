use error_location::ErrorLocation;
use thiserror::Error;

/// Speech capture and recognition errors with source location tracking.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No usable recognition provider in this environment.
    ///
    /// Detected once at process start via [`crate::recognize::SpeechBackend::probe`]
    /// and reported immediately rather than on first use.
    #[error("Speech recognition unavailable: {reason} {location}")]
    Unsupported {
        /// Why recognition cannot work here (no audio host, no credentials).
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Microphone access was denied by the operating system.
    #[error("Microphone access denied: {reason} {location}")]
    PermissionDenied {
        /// Description of the denial.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No audio input device exists.
    #[error("No microphone found {location}")]
    DeviceUnavailable {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The recognition provider failed mid-session (network loss, server
    /// error, provider-side timeout). The session is dead after this.
    #[error("Recognition provider error: {reason} {location}")]
    Provider {
        /// Description of the provider failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl CaptureError {
    /// Human-readable message for the presentation layer.
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::Unsupported { .. } => {
                "Speech recognition is not available on this system. \
                 Check your recognizer configuration."
                    .to_string()
            }
            CaptureError::PermissionDenied { .. } => {
                "Microphone access denied. Please check system permissions.".to_string()
            }
            CaptureError::DeviceUnavailable { .. } => {
                "No microphone found. Please connect one and try again.".to_string()
            }
            CaptureError::Provider { reason, .. } => {
                format!("Speech recognition error: {}", reason)
            }
        }
    }
}

/// Extraction call failures, mapped to distinct user-facing messages.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The extraction service is not configured (no API key / relay URL).
    #[error("Extraction service not configured {location}")]
    MissingCredentials {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The configured credentials were rejected by the service.
    #[error("Extraction credentials rejected {location}")]
    InvalidCredentials {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The service's request quota is exhausted.
    #[error("Extraction quota exceeded {location}")]
    QuotaExceeded {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The extraction call did not complete within its deadline.
    #[error("Extraction request timed out {location}")]
    Timeout {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The model reply was not parseable as JSON.
    #[error("Invalid extraction response: {reason} {location}")]
    InvalidResponseFormat {
        /// What failed to parse.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Anything else the service reported.
    #[error("Extraction failed: {message} {location}")]
    Unknown {
        /// Message from the service or transport.
        message: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl ExtractError {
    /// Whether a caller-initiated retry is reasonable.
    ///
    /// Quota and timeout failures are transient; credential and format
    /// failures are not. Nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtractError::QuotaExceeded { .. } | ExtractError::Timeout { .. }
        )
    }

    /// Human-readable message for the presentation layer.
    pub fn user_message(&self) -> String {
        match self {
            ExtractError::MissingCredentials { .. } => {
                "The extraction service is not configured. \
                 Add an API key in Settings."
                    .to_string()
            }
            ExtractError::InvalidCredentials { .. } => {
                "The configured extraction API key is invalid. \
                 Please check your setup."
                    .to_string()
            }
            ExtractError::QuotaExceeded { .. } => {
                "The extraction service quota has been exceeded. \
                 Please try again later."
                    .to_string()
            }
            ExtractError::Timeout { .. } => {
                "The extraction request timed out. Please try again.".to_string()
            }
            ExtractError::InvalidResponseFormat { .. } => {
                "The AI returned an invalid list format. \
                 Please try rephrasing or try again."
                    .to_string()
            }
            ExtractError::Unknown { message, .. } => message.clone(),
        }
    }
}

/// Result type alias using [`CaptureError`].
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

/// Result type alias using [`ExtractError`].
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
