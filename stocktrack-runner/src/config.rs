//! TOML configuration for refresh runs.
//!
//! Every field has a default, so an empty file (or no file) is a valid config:
//!
//! ```toml
//! [input]
//! path = "data/screener.csv"
//! format = "auto"
//!
//! [output]
//! snapshot = "data/snapshot.json"
//!
//! [history]
//! path = "data/history.jsonl"
//! enabled = true
//!
//! [view]
//! sort_column = "market_cap"
//! sort_direction = "descending"
//! category_filter = "all"
//! search_text = ""
//! limit = 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use stocktrack_core::{CategoryFilter, SortColumn, SortDirection, ViewState};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// How a row file is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFormat {
    /// Pick by file extension (`.json` → JSON, anything else → CSV).
    #[default]
    Auto,
    Csv,
    Json,
}

impl RowFormat {
    pub fn resolve(self, path: &Path) -> RowFormat {
        match self {
            Self::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
                _ => Self::Csv,
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: Option<PathBuf>,
    pub format: RowFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the current snapshot is persisted.
    pub snapshot: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from("data/snapshot.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/history.jsonl"),
            enabled: true,
        }
    }
}

/// Initial dashboard state plus a row limit for printed views.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
    pub category_filter: CategoryFilter,
    pub search_text: String,
    pub limit: Option<usize>,
}

impl ViewConfig {
    pub fn state(&self) -> ViewState {
        ViewState::new()
            .sorted_by(self.sort_column, self.sort_direction)
            .filtered(self.category_filter)
            .searching(self.search_text.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub history: HistoryConfig,
    pub view: ViewConfig,
}

impl TrackerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
