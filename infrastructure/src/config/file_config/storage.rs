//! `[storage]` section

use crate::storage::FileKeyValueStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding the persisted entries. A leading `~/` is expanded.
    pub data_dir: Option<PathBuf>,
}

impl FileStorageConfig {
    /// Configured directory, or the platform data dir.
    pub fn resolve_data_dir(&self) -> Option<PathBuf> {
        match &self.data_dir {
            Some(dir) => Some(expand_home(dir)),
            None => FileKeyValueStore::default_root(),
        }
    }
}

pub(crate) fn expand_home(path: &std::path::Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
