use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::{CURRENT_VERSION, DEFAULT_STORE_NAME};
use crate::error::{AppError, Capability, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_dir")]
    pub db_dir: String,

    #[serde(default = "default_store_name")]
    pub store_name: String,

    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub capabilities: Capabilities,
}

/// Platform features available to the session. Turning one off behaves
/// like running on a platform that lacks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default = "enabled")]
    pub persistence: bool,

    #[serde(default = "enabled")]
    pub camera: bool,

    #[serde(default = "enabled")]
    pub geolocation: bool,
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Persistence => self.persistence,
            Capability::Camera => self.camera,
            Capability::Geolocation => self.geolocation,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            persistence: true,
            camera: true,
            geolocation: true,
        }
    }
}

fn enabled() -> bool {
    true
}

fn default_db_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("joke-tab")
        .to_string_lossy()
        .to_string()
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

fn default_schema_version() -> u32 {
    CURRENT_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_dir: default_db_dir(),
            store_name: default_store_name(),
            schema_version: default_schema_version(),
            capabilities: Capabilities::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.store_name.trim().is_empty() {
            return Err(AppError::Config("store_name must not be empty".to_string()));
        }
        if self
            .store_name
            .contains(|c: char| std::path::is_separator(c) || c == '\0')
        {
            return Err(AppError::Config(format!(
                "store_name '{}' must be a plain file name",
                self.store_name
            )));
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("joke-tab")
            .join("config.toml")
    }
}
