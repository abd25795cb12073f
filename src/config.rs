//! TOML configuration.
//!
//! Loaded from `<config_dir>/orbit/config.toml`. Every section is optional;
//! a missing file yields defaults and a malformed one is logged and ignored.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OrbitResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub files: FilesConfig,
    pub clipboard: ClipboardConfig,
    pub processes: ProcessesConfig,
    pub bookmarks: Vec<BookmarkConfig>,
    pub aliases: Vec<AliasConfig>,
    pub toggles: Vec<ToggleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cap on fast-path results
    pub fast_limit: u32,
    /// Results shown after a full query
    pub max_results: u32,
    /// Default per-provider budget
    pub provider_timeout_ms: u64,
    /// Per-provider budgets keyed by provider name
    pub timeouts: HashMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub roots: Vec<String>,
    pub max_depth: usize,
    /// Stop walking after this many entries
    pub max_scanned: usize,
    pub show_hidden: bool,
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    pub max_items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessesConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkConfig {
    pub keyword: String,
    pub name: String,
    pub url: String,
}

impl BookmarkConfig {
    pub fn has_query_placeholder(&self) -> bool {
        self.url.contains("{query}")
    }

    /// Substitute `{query}` with the URL-encoded query.
    pub fn resolve_url(&self, query: &str) -> String {
        if self.has_query_placeholder() {
            self.url.replace("{query}", &urlencoding::encode(query))
        } else {
            self.url.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasConfig {
    pub keyword: String,
    pub name: String,
    /// Shell command
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleConfig {
    pub name: String,
    pub enable: String,
    pub disable: String,
    #[serde(default)]
    pub always_visible: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fast_limit: 50,
            max_results: 10,
            provider_timeout_ms: 150,
            timeouts: HashMap::new(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            roots: vec!["~".to_string()],
            max_depth: 4,
            max_scanned: 20_000,
            show_hidden: false,
            max_results: 20,
        }
    }
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self { max_items: 50 }
    }
}

impl Default for ProcessesConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FilesConfig {
    /// Roots with a leading `~` expanded.
    pub fn expanded_roots(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|root| PathBuf::from(shellexpand::tilde(root).into_owned()))
            .collect()
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        crate::platform::config_dir().join("config.toml")
    }

    /// Load config from the default location, or return defaults.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> OrbitResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.validate();
        Ok(config)
    }

    /// Clamp values to acceptable ranges and drop unusable entries.
    pub fn validate(&mut self) {
        self.search.fast_limit = self.search.fast_limit.clamp(1, 200);
        self.search.max_results = self.search.max_results.clamp(1, 50);
        self.search.provider_timeout_ms = self.search.provider_timeout_ms.clamp(10, 5_000);
        for ms in self.search.timeouts.values_mut() {
            *ms = (*ms).clamp(10, 5_000);
        }

        self.files.max_depth = self.files.max_depth.clamp(1, 16);
        self.files.max_scanned = self.files.max_scanned.clamp(100, 1_000_000);
        self.files.max_results = self.files.max_results.clamp(1, 200);
        self.clipboard.max_items = self.clipboard.max_items.clamp(1, 1_000);

        let before = self.bookmarks.len() + self.aliases.len();
        self.bookmarks
            .retain(|b| !b.keyword.trim().is_empty() && !b.url.trim().is_empty());
        self.aliases
            .retain(|a| !a.keyword.trim().is_empty() && !a.target.trim().is_empty());
        let dropped = before - (self.bookmarks.len() + self.aliases.len());
        if dropped > 0 {
            warn!(dropped, "ignoring bookmarks/aliases without keyword or target");
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> OrbitResult<PathBuf> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> OrbitResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
