//! `[logging]` section

use super::storage::expand_home;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Write a JSONL transcript of every send
    pub transcript: bool,
    /// Where transcripts go; defaults to `<data dir>/cogerphere/transcripts`
    pub transcript_dir: Option<PathBuf>,
}

impl FileLoggingConfig {
    /// Path of the transcript file for a session started now, or `None`
    /// when transcripts are disabled.
    pub fn transcript_path(&self) -> Option<PathBuf> {
        if !self.transcript {
            return None;
        }
        let dir = match &self.transcript_dir {
            Some(dir) => expand_home(dir),
            None => dirs::data_dir()?.join("cogerphere").join("transcripts"),
        };
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        Some(dir.join(format!("{}.conversation.jsonl", stamp)))
    }
}
