//! Authentication for hangar-publish.
//!
//! Two concerns live here:
//!
//! - API key resolution for a publication, from config, environment
//!   variables (`HANGAR_PUBLICATIONS_<NAME>_API_KEY`, `HANGAR_API_KEY`) or
//!   `$HANGAR_HOME/credentials.toml`.
//! - Exchanging an API key for a short-lived JWT ([`Authenticator`]) and
//!   caching it per endpoint and key ([`TokenStore`]).
//!
//! # Example
//!
//! ```no_run
//! use hangar_auth::{CredentialKey, HttpAuthenticator, TokenStore, resolve_api_key};
//!
//! let info = resolve_api_key("release", None, None);
//! let store = TokenStore::new(HttpAuthenticator::new()?);
//! if let Some(api_key) = info.key {
//!     let key = CredentialKey::new("https://hangar.papermc.io/api/v1/", api_key);
//!     let token = store.get_token(&key)?;
//!     println!("expires at {}", token.expires_at());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod authenticator;
pub mod token;

pub use authenticator::{AuthError, Authenticator, HttpAuthenticator, USER_AGENT};
pub use token::{Clock, CredentialKey, RENEWAL_SKEW_MS, SystemClock, Token, TokenStore};

/// Environment variable for the default API key
pub const HANGAR_API_KEY_ENV: &str = "HANGAR_API_KEY";

/// Environment variable prefix for publication-specific API keys
pub const PUBLICATION_KEY_PREFIX: &str = "HANGAR_PUBLICATIONS_";

/// Environment variable overriding the hangar home directory
pub const HANGAR_HOME_ENV: &str = "HANGAR_HOME";

/// Credentials file name
pub const CREDENTIALS_FILE: &str = "credentials.toml";

/// Resolved API key for a publication
#[derive(Debug, Clone)]
pub struct ApiKeyInfo {
    /// The resolved key (if found)
    pub key: Option<String>,
    /// Where the key came from
    pub source: KeySource,
    /// Whether a key was found
    pub detected: bool,
}

impl Default for ApiKeyInfo {
    fn default() -> Self {
        Self {
            key: None,
            source: KeySource::None,
            detected: false,
        }
    }
}

impl ApiKeyInfo {
    fn found(key: String, source: KeySource) -> Self {
        Self {
            key: Some(key),
            source,
            detected: true,
        }
    }
}

/// Source of the API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// No key found
    None,
    /// `api_key` in the publication's config entry
    Config,
    /// From `HANGAR_PUBLICATIONS_<NAME>_API_KEY`
    EnvPublication,
    /// From `HANGAR_API_KEY`
    EnvDefault,
    /// From `[publications.<name>]` in `credentials.toml`
    CredentialsPublication,
    /// From `default_api_key` in `credentials.toml`
    CredentialsDefault,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::None => write!(f, "none"),
            KeySource::Config => write!(f, "config"),
            KeySource::EnvPublication => write!(f, "HANGAR_PUBLICATIONS_<NAME>_API_KEY"),
            KeySource::EnvDefault => write!(f, "HANGAR_API_KEY"),
            KeySource::CredentialsPublication => write!(f, "credentials.toml [publications.<name>]"),
            KeySource::CredentialsDefault => write!(f, "credentials.toml default_api_key"),
        }
    }
}

/// Name of the publication-specific environment variable.
pub fn publication_env_var(publication: &str) -> String {
    let normalized: String = publication
        .chars()
        .map(|c| match c {
            '-' | ' ' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    format!("{PUBLICATION_KEY_PREFIX}{normalized}_API_KEY")
}

/// Resolve the API key for a publication.
///
/// This checks in order:
/// 1. the key configured on the publication itself
/// 2. `HANGAR_PUBLICATIONS_<NAME>_API_KEY`
/// 3. `HANGAR_API_KEY`
/// 4. `[publications.<name>] api_key`, then `default_api_key`, in
///    `$HANGAR_HOME/credentials.toml`
pub fn resolve_api_key(
    publication: &str,
    configured: Option<&str>,
    hangar_home: Option<&Path>,
) -> ApiKeyInfo {
    if let Some(key) = configured
        && !key.is_empty()
    {
        return ApiKeyInfo::found(key.to_string(), KeySource::Config);
    }

    if let Ok(key) = env::var(publication_env_var(publication))
        && !key.is_empty()
    {
        return ApiKeyInfo::found(key, KeySource::EnvPublication);
    }

    if let Ok(key) = env::var(HANGAR_API_KEY_ENV)
        && !key.is_empty()
    {
        return ApiKeyInfo::found(key, KeySource::EnvDefault);
    }

    let credentials_path = hangar_home_path(hangar_home).join(CREDENTIALS_FILE);
    if let Ok((key, source)) = key_from_credentials_file(&credentials_path, publication) {
        return ApiKeyInfo::found(key, source);
    }

    ApiKeyInfo::default()
}

/// Check if an API key is available for the publication.
pub fn has_api_key(publication: &str, configured: Option<&str>, hangar_home: Option<&Path>) -> bool {
    resolve_api_key(publication, configured, hangar_home).detected
}

/// Get the hangar home directory (`$HANGAR_HOME` or `~/.hangar`).
pub fn hangar_home_path(hangar_home: Option<&Path>) -> PathBuf {
    if let Some(path) = hangar_home {
        return path.to_path_buf();
    }

    if let Ok(path) = env::var(HANGAR_HOME_ENV) {
        return PathBuf::from(path);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".hangar");
    }

    PathBuf::from(".hangar")
}

fn key_from_credentials_file(path: &Path, publication: &str) -> Result<(String, KeySource)> {
    if !path.exists() {
        return Err(anyhow::anyhow!("credentials file not found"));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials file: {}", path.display()))?;

    let credentials: toml::Value = toml::from_str(&content)
        .with_context(|| format!("failed to parse credentials file: {}", path.display()))?;

    if let Some(key) = credentials
        .get("publications")
        .and_then(|p| p.get(publication))
        .and_then(|p| p.get("api_key"))
        .and_then(|k| k.as_str())
        && !key.is_empty()
    {
        return Ok((key.to_string(), KeySource::CredentialsPublication));
    }

    if let Some(key) = credentials.get("default_api_key").and_then(|k| k.as_str())
        && !key.is_empty()
    {
        return Ok((key.to_string(), KeySource::CredentialsDefault));
    }

    Err(anyhow::anyhow!(
        "no api key found for publication: {}",
        publication
    ))
}

/// Mask a key for safe display (show first 4 and last 4 chars).
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
