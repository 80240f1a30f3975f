//! Raw TOML configuration data types
//!
//! These structs mirror the config file section by section.

mod endpoint;
mod logging;
mod provider;
mod storage;

pub use endpoint::FileEndpointConfig;
pub use logging::FileLoggingConfig;
pub use provider::FileProviderConfig;
pub use storage::FileStorageConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("endpoint.url cannot be empty")]
    EmptyEndpoint,

    #[error("endpoint.temperature must be between 0.0 and 2.0, got {0}")]
    InvalidTemperature(f64),

    #[error("provider.default_model cannot be empty")]
    EmptyDefaultModel,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub endpoint: FileEndpointConfig,
    pub storage: FileStorageConfig,
    pub provider: FileProviderConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.endpoint.url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyEndpoint);
        }
        if !(0.0..=2.0).contains(&self.endpoint.temperature) {
            return Err(ConfigValidationError::InvalidTemperature(
                self.endpoint.temperature,
            ));
        }
        if self.provider.default_model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyDefaultModel);
        }
        Ok(())
    }
}
