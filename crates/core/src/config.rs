//! Configuration file management
//!
//! The configuration lives in `config.toml` inside the config directory,
//! which is `$OGET_CONFIG_DIR` when set and `<platform config dir>/oget`
//! otherwise.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alias::Alias;
use crate::error::{Error, Result};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "OGET_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";
const SCHEMA_VERSION: u32 = 1;

/// On-disk configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub aliases: Vec<Alias>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            aliases: Vec::new(),
        }
    }
}

/// Loads and saves [`Config`]
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Resolve the config location from the environment
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .map(|d| d.join("oget"))
                .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?,
        };
        Ok(Self::with_dir(dir))
    }

    /// Use an explicit config directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, returning the default when the file does not exist
    pub fn load(&self) -> Result<Config> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(Error::from_local_io(&self.path, e)),
        };

        let config: Config = toml::from_str(&text)?;
        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "unsupported schema version {} (max {SCHEMA_VERSION})",
                config.schema_version
            )));
        }
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::from_local_io(parent, e))?;
        }
        let text = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, text).map_err(|e| Error::from_local_io(&self.path, e))?;
        Ok(())
    }
}
