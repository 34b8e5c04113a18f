//! Conversion settings, optionally read from a TOML file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::evernote::Result;

/// Settings for one conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Attachment directory, relative to the output directory
    pub attachment_dir: String,
    /// Write resource files next to the notes
    pub dump_resources: bool,
    /// Bookmark snapshot rendering
    pub snapshot: SnapshotConfig,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            attachment_dir: "res".to_string(),
            dump_resources: true,
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl ConvertConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub enabled: bool,
    /// Browser executable (Chromium or Chrome)
    pub browser: String,
    /// Extra arguments passed to the browser
    pub args: Vec<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            browser: "chromium".to_string(),
            args: Vec::new(),
        }
    }
}
