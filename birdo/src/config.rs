use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BirdoError;

/// Environment variable that overrides `ebird_api_key`
pub const API_KEY_ENV: &str = "EBIRDKEY";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdoConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// eBird API token; the EBIRDKEY environment variable wins over this
    #[serde(default)]
    pub ebird_api_key: Option<String>,

    /// Root of the per-species image cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Image placed in the centre cell of every card
    #[serde(default = "default_free_space_image")]
    pub free_space_image: PathBuf,

    /// Where finished cards are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Extra fonts for card captions, system fonts are always loaded
    #[serde(default)]
    pub fonts_dir: Option<PathBuf>,

    #[serde(default)]
    pub image_search: ImageSearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSearchConfig {
    /// Search page queried with `?q=<key>&tbm=isch`
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("simple_images")
}

fn default_free_space_image() -> PathBuf {
    PathBuf::from("freespace.jpg")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_search_endpoint() -> String {
    "https://www.google.com/search".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ImageSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for BirdoConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            ebird_api_key: None,
            cache_dir: default_cache_dir(),
            free_space_image: default_free_space_image(),
            output_dir: default_output_dir(),
            fonts_dir: None,
            image_search: ImageSearchConfig::default(),
        }
    }
}

impl BirdoConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: BirdoConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// Returns whether the file was found so the caller can report it once
    /// logging is up.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::from_file(path)?, true))
        } else {
            Ok((Self::default(), false))
        }
    }

    /// Resolve the eBird key, environment first.
    pub fn api_key(&self) -> Result<String, BirdoError> {
        let from_env = std::env::var(API_KEY_ENV).ok();
        pick_api_key(from_env, self.ebird_api_key.clone())
    }
}

fn pick_api_key(from_env: Option<String>, from_file: Option<String>) -> Result<String, BirdoError> {
    from_env
        .into_iter()
        .chain(from_file)
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
        .ok_or(BirdoError::MissingApiKey)
}
