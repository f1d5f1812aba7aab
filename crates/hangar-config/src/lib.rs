//! Configuration file handling for hangar-publish.
//!
//! Publications are declared in a `.hangar.toml` file:
//!
//! ```toml
//! [defaults]
//! channel = "Release"
//!
//! [publications.release]
//! owner = "PaperMC"
//! slug = "my-plugin"
//! version = "1.0.0"
//! changelog_file = "CHANGELOG.md"
//!
//! [[publications.release.platforms]]
//! name = "PAPER"
//! jar = "build/libs/my-plugin.jar"
//! platform_versions = ["1.19", "1.20"]
//!
//! [[publications.release.platforms.dependencies]]
//! name = "Maintenance"
//! owner = "kennytv"
//! slug = "Maintenance"
//! required = false
//!
//! [[publications.release.pages]]
//! name = "MainResourcePage"
//! file = "README.md"
//! ```
//!
//! [`Config::resolve`] turns the raw tables into [`Publication`]s and
//! rejects anything the registry could not accept, such as a platform
//! with both a jar and a URL.
//!
//! # Example
//!
//! ```
//! use hangar_config::{Config, load_config};
//! use std::path::Path;
//!
//! let config = load_config(Path::new(".")).expect("load config");
//! for name in config.publication_names() {
//!     println!("publication: {name}");
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hangar_types::{DEFAULT_API_ENDPOINT, Publication, normalize_endpoint};
use serde::{Deserialize, Serialize};

mod resolve;

/// Default configuration file name
pub const CONFIG_FILE: &str = ".hangar.toml";

/// Default number of concurrent page syncs
pub const DEFAULT_JOBS: usize = 4;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Get the config file path for a directory
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Complete hangar-publish configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Values shared by all publications
    #[serde(default)]
    pub defaults: Defaults,
    /// Publications keyed by name
    #[serde(default)]
    pub publications: BTreeMap<String, PublicationConfig>,
}

/// Settings applied to every publication unless overridden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Maximum concurrent page syncs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// One `[publications.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationConfig {
    /// Overrides `defaults.api_endpoint`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    /// API key; prefer environment variables or the credentials file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub owner: String,
    pub slug: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    /// Markdown file read as the changelog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog_file: Option<PathBuf>,
    #[serde(default)]
    pub platforms: Vec<PlatformConfig>,
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

/// One `[[publications.<name>.platforms]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub name: String,
    #[serde(default)]
    pub platform_versions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jar: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

/// A dependency given either as `owner` + `slug` or as `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// A page given either inline or as a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// A publication ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPublication {
    pub publication: Publication,
    /// Key from the config file, if any; the engine falls back to the
    /// environment and credentials file.
    pub api_key: Option<String>,
}

impl Config {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// The default API endpoint, normalized.
    pub fn api_endpoint(&self) -> String {
        normalize_endpoint(
            self.defaults
                .api_endpoint
                .as_deref()
                .unwrap_or(DEFAULT_API_ENDPOINT),
        )
    }

    pub fn jobs(&self) -> usize {
        self.defaults.jobs.unwrap_or(DEFAULT_JOBS).max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.defaults.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn publication_names(&self) -> impl Iterator<Item = &str> {
        self.publications.keys().map(String::as_str)
    }

    /// Resolve every publication. Relative paths are taken from `base_dir`.
    pub fn resolve(&self, base_dir: &Path) -> Result<Vec<ResolvedPublication>> {
        self.publications
            .keys()
            .map(|name| self.resolve_publication(name, base_dir))
            .collect()
    }

    /// Resolve one publication by name.
    pub fn resolve_publication(&self, name: &str, base_dir: &Path) -> Result<ResolvedPublication> {
        let raw = self.publications.get(name).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown publication '{}' (known: {})",
                name,
                self.publication_names().collect::<Vec<_>>().join(", ")
            )
        })?;
        resolve::resolve_publication(self, name, raw, base_dir)
            .with_context(|| format!("invalid publication '{name}'"))
    }
}

/// Parse a config from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).context("failed to parse config")
}

/// Load configuration from a directory
pub fn load_config(dir: &Path) -> Result<Config> {
    let path = config_path(dir);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_config_from_file(&path)
}

/// Load configuration from a specific file path. The file must exist.
pub fn load_config_from_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Find configuration file by walking up the directory tree
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let config_file = current.join(CONFIG_FILE);
        if config_file.exists() {
            return Some(config_file);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}
