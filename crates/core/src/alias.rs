//! Alias management
//!
//! An alias names an S3-compatible endpoint together with its credentials.
//! Remote paths start with the alias name (`alias/bucket/key`).

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// Retry settings applied by the storage backend to transient failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

/// A configured storage endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// `auto`, `path` or `dns`
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

impl Alias {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: default_region(),
            bucket_lookup: default_bucket_lookup(),
            retry: None,
        }
    }

    /// Retry settings, falling back to the defaults
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Check the fields that would otherwise fail late, at connect time
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("alias name cannot be empty".to_string()));
        }
        if self.name.contains('/') {
            return Err(Error::Config(format!(
                "alias name '{}' cannot contain '/'",
                self.name
            )));
        }

        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| Error::Config(format!("invalid endpoint '{}': {e}", self.endpoint)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "endpoint '{}' must use http or https",
                self.endpoint
            )));
        }

        if !matches!(self.bucket_lookup.as_str(), "auto" | "path" | "dns") {
            return Err(Error::Config(format!(
                "bucket lookup must be auto, path or dns, got '{}'",
                self.bucket_lookup
            )));
        }

        Ok(())
    }
}

/// Reads and updates the aliases stored in the config file
#[derive(Debug, Clone)]
pub struct AliasManager {
    config: ConfigManager,
}

impl AliasManager {
    pub fn new() -> Result<Self> {
        Ok(Self::with_config_manager(ConfigManager::new()?))
    }

    pub fn with_config_manager(config: ConfigManager) -> Self {
        Self { config }
    }

    pub fn get(&self, name: &str) -> Result<Alias> {
        self.config
            .load()?
            .aliases
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::AliasNotFound(name.to_string()))
    }

    /// All aliases, sorted by name
    pub fn list(&self) -> Result<Vec<Alias>> {
        let mut aliases = self.config.load()?.aliases;
        aliases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(aliases)
    }

    /// Add or replace an alias
    pub fn set(&self, alias: Alias) -> Result<()> {
        alias.validate()?;
        let mut config = self.config.load()?;
        match config.aliases.iter_mut().find(|a| a.name == alias.name) {
            Some(existing) => *existing = alias,
            None => config.aliases.push(alias),
        }
        self.config.save(&config)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config.load()?;
        let before = config.aliases.len();
        config.aliases.retain(|a| a.name != name);
        if config.aliases.len() == before {
            return Err(Error::AliasNotFound(name.to_string()));
        }
        self.config.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> AliasManager {
        AliasManager::with_config_manager(ConfigManager::with_dir(dir.path()))
    }

    #[test]
    fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let aliases = manager(&dir);

        aliases
            .set(Alias::new("local", "http://localhost:9000", "ak", "sk"))
            .unwrap();
        assert_eq!(aliases.get("local").unwrap().endpoint, "http://localhost:9000");

        aliases.remove("local").unwrap();
        assert!(matches!(aliases.get("local"), Err(Error::AliasNotFound(_))));
    }

    #[test]
    fn test_set_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let aliases = manager(&dir);

        aliases
            .set(Alias::new("local", "http://localhost:9000", "ak", "sk"))
            .unwrap();
        aliases
            .set(Alias::new("local", "http://localhost:9100", "ak2", "sk2"))
            .unwrap();

        let list = aliases.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].endpoint, "http://localhost:9100");
    }

    #[test]
    fn test_list_sorted() {
        let dir = TempDir::new().unwrap();
        let aliases = manager(&dir);
        for name in ["zeta", "alpha", "mid"] {
            aliases
                .set(Alias::new(name, "https://s3.example.com", "ak", "sk"))
                .unwrap();
        }
        let names: Vec<String> = aliases.list().unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_remove_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            manager(&dir).remove("nope"),
            Err(Error::AliasNotFound(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(Alias::new("ok", "https://s3.amazonaws.com", "a", "s").validate().is_ok());
        assert!(Alias::new("", "https://s3.amazonaws.com", "a", "s").validate().is_err());
        assert!(Alias::new("a/b", "https://s3.amazonaws.com", "a", "s").validate().is_err());
        assert!(Alias::new("bad", "not a url", "a", "s").validate().is_err());
        assert!(Alias::new("ftp", "ftp://host", "a", "s").validate().is_err());

        let mut alias = Alias::new("lookup", "http://localhost:9000", "a", "s");
        alias.bucket_lookup = "virtual".to_string();
        assert!(alias.validate().is_err());
    }

    #[test]
    fn test_retry_config_default() {
        let alias = Alias::new("local", "http://localhost:9000", "ak", "sk");
        assert_eq!(alias.retry_config(), RetryConfig::default());
    }
}
