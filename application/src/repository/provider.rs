//! Provider settings: the persisted API key and model.

use super::keys;
use super::conversation::STORAGE_NOTICE_TITLE;
use crate::ports::key_value_store::KeyValueStore;
use crate::ports::notice::Notice;
use cogerphere_domain::{DEFAULT_MODEL, ProviderConfig};
use std::sync::Arc;
use tracing::{debug, warn};

/// The current [`ProviderConfig`] mirrored to [`keys::PROVIDER_CONFIG`].
///
/// The model is never empty: `default_model` is substituted on load and on
/// every update.
pub struct ProviderSettings {
    store: Arc<dyn KeyValueStore>,
    config: ProviderConfig,
    default_model: String,
}

impl ProviderSettings {
    /// Settings with no key and the default model. Nothing is read.
    pub fn new(store: Arc<dyn KeyValueStore>, default_model: impl Into<String>) -> Self {
        let default_model = non_empty_model(default_model.into());
        Self {
            store,
            config: ProviderConfig::new("", default_model.clone()),
            default_model,
        }
    }

    /// Load the persisted config, falling back to defaults if it is
    /// missing or unreadable.
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        default_model: impl Into<String>,
    ) -> (Self, Option<Notice>) {
        let mut settings = Self::new(store, default_model);
        let mut notice = None;

        match settings.store.get(keys::PROVIDER_CONFIG) {
            Ok(Some(raw)) => match serde_json::from_str::<ProviderConfig>(&raw) {
                Ok(config) => {
                    settings.config = config.with_default_model(&settings.default_model);
                }
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable provider config");
                    notice = Some(Notice::warning(
                        STORAGE_NOTICE_TITLE,
                        "Saved API configuration was unreadable and has been reset",
                    ));
                }
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read provider config"),
        }

        debug!(
            model = %settings.config.model,
            has_api_key = settings.config.has_api_key(),
            "Loaded provider config"
        );
        (settings, notice)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Replace the config and persist it.
    pub fn update(&mut self, config: ProviderConfig) {
        self.config = config.with_default_model(&self.default_model);
        self.persist();
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.config) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize provider config");
                return;
            }
        };
        if let Err(e) = self.store.set(keys::PROVIDER_CONFIG, &json) {
            warn!(error = %e, "Failed to persist provider config");
        }
    }
}

fn non_empty_model(model: String) -> String {
    if model.trim().is_empty() {
        DEFAULT_MODEL.to_string()
    } else {
        model
    }
}
