//! `[endpoint]` section

use crate::openrouter::{DEFAULT_ENDPOINT, OpenRouterSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw endpoint configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEndpointConfig {
    /// Chat-completions URL
    pub url: String,
    /// Value of the `HTTP-Referer` header
    pub referer: String,
    /// Value of the `X-Title` header
    pub title: String,
    /// Sampling temperature, `0.0..=2.0`
    pub temperature: f64,
    /// TCP connect timeout
    pub connect_timeout_seconds: u64,
}

impl Default for FileEndpointConfig {
    fn default() -> Self {
        let defaults = OpenRouterSettings::default();
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            referer: defaults.referer,
            title: defaults.title,
            temperature: defaults.temperature,
            connect_timeout_seconds: defaults.connect_timeout.as_secs(),
        }
    }
}

impl FileEndpointConfig {
    pub fn to_settings(&self) -> OpenRouterSettings {
        OpenRouterSettings {
            endpoint: self.url.clone(),
            referer: self.referer.clone(),
            title: self.title.clone(),
            temperature: self.temperature,
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
        }
    }
}
