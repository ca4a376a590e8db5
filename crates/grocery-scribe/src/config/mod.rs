mod behaviour_config;
#[allow(clippy::module_inception)]
mod config;
mod contact;
mod contact_config;
mod extraction_config;
mod recognizer_config;

pub(crate) use {
    behaviour_config::BehaviourConfig, config::Config, contact::ContactNumber,
    contact_config::ContactConfig, extraction_config::ExtractionConfig,
    extraction_config::ExtractionMode, extraction_config::unconfigured_extractor,
    recognizer_config::RecognizerConfig,
};

pub(crate) const DEFAULT_COPY_TO_CLIPBOARD: bool = true;
pub(crate) const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 60;

pub(crate) fn default_copy_to_clipboard() -> bool {
    DEFAULT_COPY_TO_CLIPBOARD
}

pub(crate) fn default_extraction_timeout_secs() -> u64 {
    DEFAULT_EXTRACTION_TIMEOUT_SECS
}
