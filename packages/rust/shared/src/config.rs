//! Application configuration for the HtmlPage indexer.
//!
//! User config lives at `~/.htmlpage-indexer/htmlpage-indexer.toml`.
//! CLI flags override the config file location; missing values fall back to defaults.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{IndexerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "htmlpage-indexer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".htmlpage-indexer";

// ---------------------------------------------------------------------------
// Config structs (matching htmlpage-indexer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Indexer metadata and on/off switch.
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// Owning site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Database settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[indexer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Human-readable indexer name.
    #[serde(default = "default_indexer_name")]
    pub name: String,

    /// Human-readable description.
    #[serde(default = "default_indexer_description")]
    pub description: String,

    /// Indexer version string.
    #[serde(default = "default_indexer_version")]
    pub version: String,

    /// Whether the host should run this indexer at all.
    #[serde(default)]
    pub enable: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            name: default_indexer_name(),
            description: default_indexer_description(),
            version: default_indexer_version(),
            enable: false,
        }
    }
}

fn default_indexer_name() -> String {
    "HtmlPage Indexer".into()
}
fn default_indexer_description() -> String {
    "Indexes enabled HTML pages for the search engine".into()
}
fn default_indexer_version() -> String {
    "1.0.0".into()
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name stamped on every document.
    #[serde(default = "default_site_name")]
    pub name: String,

    /// Portal URL that page links are built from.
    #[serde(default = "default_portal_url")]
    pub portal_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            portal_url: default_portal_url(),
        }
    }
}

fn default_site_name() -> String {
    "Lutece".into()
}
fn default_portal_url() -> String {
    "http://localhost:8080/lutece/jsp/site/Portal.jsp".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database holding pages and the document index.
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

fn default_database() -> String {
    "var/htmlpage.db".into()
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Reloadable configuration handle.
///
/// Readers take a fresh [`AppConfig`] snapshot on every call, so a reload is
/// visible to the next operation without restarting anything.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<AppConfig>>,
}

impl SharedConfig {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Clone the current configuration.
    pub fn snapshot(&self) -> AppConfig {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the current configuration.
    pub fn replace(&self, config: AppConfig) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = config;
    }

    /// Re-read the config file at `path` and swap it in.
    pub fn reload_from(&self, path: &Path) -> Result<()> {
        let config = load_config_from(path)?;
        validate_config(&config)?;
        self.replace(config);
        tracing::debug!(?path, "configuration reloaded");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.htmlpage-indexer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| IndexerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.htmlpage-indexer/htmlpage-indexer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| IndexerError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| IndexerError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IndexerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| IndexerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IndexerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check the values the document builder depends on.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.site.name.trim().is_empty() {
        return Err(IndexerError::config("site.name must not be empty"));
    }
    Url::parse(&config.site.portal_url).map_err(|e| {
        IndexerError::config(format!(
            "site.portal_url '{}' is not a valid URL: {e}",
            config.site.portal_url
        ))
    })?;
    Ok(())
}
