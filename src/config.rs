use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::watch::{FileStore, StoreError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub embed: EmbedConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// http(s) URL or local path of the catalog document
    #[serde(default = "default_catalog_source")]
    pub source: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: default_catalog_source(),
        }
    }
}

fn default_catalog_source() -> String {
    "data.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            args: Vec::new(),
        }
    }
}

fn default_player_command() -> String {
    "mpv".to_string()
}

/// Command that opens embed pages
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_browser_command")]
    pub command: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            command: default_browser_command(),
        }
    }
}

fn default_browser_command() -> String {
    if cfg!(target_os = "macos") {
        "open".to_string()
    } else if cfg!(target_os = "windows") {
        "explorer".to_string()
    } else {
        "xdg-open".to_string()
    }
}

/// Third-party embed hosts
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedConfig {
    /// A link containing any of these is played through the embed page
    #[serde(default = "default_embed_markers")]
    pub markers: Vec<String>,
    /// Host used when rewriting a link into its embed form
    #[serde(default = "default_embed_host")]
    pub host: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            markers: default_embed_markers(),
            host: default_embed_host(),
        }
    }
}

fn default_embed_markers() -> Vec<String> {
    vec!["uqload".to_string()]
}

fn default_embed_host() -> String {
    "uqload.cx".to_string()
}

#[derive(Default, Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn store(&self) -> Result<FileStore, StoreError> {
        match &self.data_dir {
            Some(dir) => Ok(FileStore::new(dir.clone())),
            None => FileStore::in_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// How long notices stay on screen before fading
    #[serde(default = "default_notice_ms")]
    pub notice_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notice_ms: default_notice_ms(),
        }
    }
}

fn default_notice_ms() -> u64 {
    3000
}

impl Config {
    /// Load from the platform config dir; a missing file means defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "vitrine")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.source.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "catalog.source cannot be empty".to_string(),
            ));
        }

        if self.player.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "player.command cannot be empty".to_string(),
            ));
        }

        if self.embed.host.trim().is_empty() || self.embed.host.contains('/') {
            return Err(ConfigError::ValidationError(
                "embed.host must be a bare host name".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.catalog.source, "data.json");
        assert_eq!(config.player.command, "mpv");
        assert!(config.player.args.is_empty());
        assert_eq!(config.embed.markers, vec!["uqload"]);
        assert_eq!(config.embed.host, "uqload.cx");
        assert_eq!(config.ui.notice_ms, 3000);
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(
            r#"
[catalog]
source = "https://example.com/data.json"

[player]
command = "vlc"
args = ["--fullscreen"]

[embed]
markers = ["uqload", "vidmoly"]
host = "uqload.to"

[storage]
data_dir = "/tmp/vitrine-data"
"#,
        )
        .unwrap();

        assert_eq!(config.catalog.source, "https://example.com/data.json");
        assert_eq!(config.player.command, "vlc");
        assert_eq!(config.player.args, vec!["--fullscreen"]);
        assert_eq!(config.embed.markers.len(), 2);
        assert_eq!(config.embed.host, "uqload.to");
        assert_eq!(
            config.storage.data_dir,
            Some(PathBuf::from("/tmp/vitrine-data"))
        );
    }

    #[test]
    fn test_rejects_empty_catalog_source() {
        let err = Config::parse("[catalog]\nsource = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_rejects_embed_host_with_path() {
        let err = Config::parse("[embed]\nhost = \"uqload.cx/embed\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Config::parse("[catalog\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
