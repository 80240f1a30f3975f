//! Configuration file loading for cogerphere
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `COGERPHERE_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./cogerphere.toml` or `./.cogerphere.toml`
//! 4. Global: `$XDG_CONFIG_HOME/cogerphere/config.toml`
//! 5. Default values

mod loader;
mod file_config;

pub use loader::{ConfigLoader, ConfigSources, ENV_PREFIX};
pub use file_config::{
    ConfigValidationError, FileConfig, FileEndpointConfig, FileLoggingConfig, FileProviderConfig,
    FileStorageConfig,
};
