//! `[provider]` section

use cogerphere_domain::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};

/// Raw provider configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Model used when none has been chosen yet
    pub default_model: String,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}
