//! Configuration management for grocery-scribe.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, lazy validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{BehaviourConfig, ContactConfig, ContactNumber, ExtractionConfig, RecognizerConfig},
};

use std::{fs, io::Write, panic::Location, path::PathBuf};

use crate::config::{DEFAULT_COPY_TO_CLIPBOARD, DEFAULT_EXTRACTION_TIMEOUT_SECS, ExtractionMode};
use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Streaming recognition provider settings.
    pub recognizer: RecognizerConfig,
    /// Extraction service settings.
    pub extraction: ExtractionConfig,
    /// Persisted contact settings.
    pub contact: ContactConfig,
    /// Application behavior settings.
    pub behaviour: BehaviourConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    ///
    /// Note: This does NOT validate credentials. The recognition probe and
    /// extractor construction validate lazily, so the app can start and
    /// point the user at the settings file even when nothing is configured
    /// yet.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to parse config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else {
            info!("No config found, creating default");
            Self::create_default()
        }
    }

    /// The validated contact number, if one is configured.
    ///
    /// Settings are edited out-of-process (the tray menu opens the config
    /// file), so an invalid stored value is possible; it is treated as
    /// absent and logged, which routes the user back to settings.
    pub fn contact_number(&self) -> Option<ContactNumber> {
        let raw = self.contact.whatsapp_number.as_deref()?;

        match ContactNumber::parse(raw) {
            Ok(number) => Some(number),
            Err(e) => {
                warn!(error = ?e, "Stored contact number is invalid, treating as unset");
                None
            }
        }
    }

    /// Save configuration to disk using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::path()?;

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Path to the config file, creating the config directory if needed.
    #[track_caller]
    pub fn path() -> AppResult<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "grocery-scribe", "Grocery-Scribe").ok_or_else(
            || AppError::ConfigError {
                reason: "Failed to get config directory".to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
        )?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn create_default() -> AppResult<Self> {
        let config = Config {
            recognizer: RecognizerConfig {
                api_key: String::new(),
                model: None,
            },
            extraction: ExtractionConfig {
                mode: ExtractionMode::Direct,
                api_key: String::new(),
                model: None,
                relay_url: String::new(),
                timeout_secs: DEFAULT_EXTRACTION_TIMEOUT_SECS,
            },
            contact: ContactConfig {
                whatsapp_number: None,
            },
            behaviour: BehaviourConfig {
                copy_to_clipboard: DEFAULT_COPY_TO_CLIPBOARD,
            },
        };

        config.save()?;

        warn!(
            "Default config created. Set the recognizer and extraction API keys \
             and your WhatsApp number before recording."
        );

        Ok(config)
    }
}
