//! Viewer configuration
//!
//! Re-exports the shared `ViewerConfig` from raidscope-types and adds
//! persistence on top of it.

pub use raidscope_types::{DEFAULT_POLL_INTERVAL_SECS, ViewerConfig};

use super::error::ConfigError;

const APP_NAME: &str = "raidscope";
const CONFIG_NAME: &str = "config";

/// Extension trait for ViewerConfig persistence and validation
pub trait ViewerConfigExt: Sized {
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn validate(&self) -> Result<(), ConfigError>;
}

impl ViewerConfigExt for ViewerConfig {
    /// Load the stored config, falling back to defaults on any error
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Using default configuration");
            Self::default()
        })
    }

    fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.export_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.export_base_url.clone(),
            });
        }
        Ok(())
    }
}
