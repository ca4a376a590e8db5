use crate::config::default_copy_to_clipboard;

use serde::{Deserialize, Serialize};

/// Application behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviourConfig {
    /// Whether to also copy the shared list text to the clipboard.
    #[serde(default = "default_copy_to_clipboard")]
    pub copy_to_clipboard: bool,
}
