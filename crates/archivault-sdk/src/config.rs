use std::path::Path;

use serde::{Deserialize, Serialize};

use archivault_cache::CacheConfig;
use archivault_history::HistoryConfig;
use archivault_trash::TrashConfig;

use crate::error::SdkResult;

/// Settings for one open archive. Every section is optional in TOML.
///
/// ```toml
/// [cache]
/// max_bytes = 52428800
///
/// [trash]
/// retention_days = 14
///
/// [history]
/// max_depth = 100
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub cache: CacheConfig,
    pub trash: TrashConfig,
    pub history: HistoryConfig,
}

impl ArchiveConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
