//! Provider configuration value object

use crate::core::error::ValidationError;
use crate::core::string::is_blank;
use serde::{Deserialize, Serialize};

/// Model used when none is configured or the stored one is unusable.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Credential and model identifier for the completion endpoint (Value Object)
///
/// The API key is only ever sent as the bearer credential; `Debug` output
/// redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !is_blank(&self.api_key)
    }

    /// Substitute `default_model` if the model is empty.
    pub fn with_default_model(mut self, default_model: &str) -> Self {
        if is_blank(&self.model) {
            self.model = default_model.to_string();
        }
        self
    }

    /// Check that a request can be made with this configuration.
    pub fn ensure_ready(&self) -> Result<(), ValidationError> {
        if self.has_api_key() {
            Ok(())
        } else {
            Err(ValidationError::MissingApiKey)
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.has_api_key() { "<redacted>" } else { "<unset>" };
        f.debug_struct("ProviderConfig")
            .field("api_key", &key)
            .field("model", &self.model)
            .finish()
    }
}
