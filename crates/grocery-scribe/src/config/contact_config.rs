use serde::{Deserialize, Serialize};

/// Persisted contact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// WhatsApp number with country code (e.g. `+91XXXXXXXXXX`).
    /// `None` until the user has set one; clearing it removes the setting.
    #[serde(default)]
    pub whatsapp_number: Option<String>,
}
