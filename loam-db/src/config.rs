//! Project configuration (`site.yml`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Project configuration matching the `site.yml` schema.
///
/// Every field has a default so a project without a config file works.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    #[serde(default = "default_models_dir")]
    pub models_dir: String,

    /// Capacity of the ephemeral (LRU) record cache tier.
    #[serde(default = "default_ephemeral_cache_size")]
    pub ephemeral_record_cache_size: usize,

    /// Extension (without dot) to attachment type, e.g. `jpg` -> `image`.
    #[serde(default = "default_attachment_types")]
    pub attachment_types: HashMap<String, String>,
}

fn default_content_dir() -> String {
    String::from("content")
}

fn default_assets_dir() -> String {
    String::from("assets")
}

fn default_models_dir() -> String {
    String::from("models")
}

fn default_ephemeral_cache_size() -> usize {
    500
}

fn default_attachment_types() -> HashMap<String, String> {
    let mut map = HashMap::new();
    for ext in ["jpg", "jpeg", "png", "gif", "svg", "webp"] {
        map.insert(ext.to_string(), "image".to_string());
    }
    for ext in ["mp4", "mov", "webm", "avi"] {
        map.insert(ext.to_string(), "video".to_string());
    }
    for ext in ["mp3", "wav", "ogg", "flac"] {
        map.insert(ext.to_string(), "audio".to_string());
    }
    map
}

impl Default for Config {
    fn default() -> Self {
        // serde defaults and Default must agree; deserializing an empty
        // mapping yields exactly this value.
        Config {
            content_dir: default_content_dir(),
            assets_dir: default_assets_dir(),
            models_dir: default_models_dir(),
            ephemeral_record_cache_size: default_ephemeral_cache_size(),
            attachment_types: default_attachment_types(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Load `site.yml` under a project root, falling back to defaults when
    /// the file does not exist.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join("site.yml");
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Look up the attachment type for a logical path by file extension.
    pub fn attachment_type_for(&self, path: &str) -> Option<&str> {
        let ext = path.rsplit('.').next()?;
        if ext == path {
            return None;
        }
        self.attachment_types
            .get(&ext.to_lowercase())
            .map(|s| s.as_str())
    }
}
