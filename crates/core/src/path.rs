//! Remote path parsing
//!
//! Remote locators take the form `alias/bucket[/key]`. A trailing `...` on
//! the key is the recursive marker and is handled by the source expander,
//! not here.

use std::fmt;

use crate::error::{Error, Result};

/// Characters that turn a key into a glob pattern
const GLOB_CHARS: &[char] = &['*', '?', '['];

/// A resolved remote object locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    pub alias: String,
    pub bucket: String,
    pub key: String,
}

impl RemotePath {
    pub fn new(alias: impl Into<String>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse `alias/bucket[/key]`.
    ///
    /// Local-looking paths (absolute, `./`, `../`, `~`) are rejected so that a
    /// swapped source and target is reported instead of silently listed.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidPath("path cannot be empty".to_string()));
        }
        if trimmed.starts_with('/')
            || trimmed.starts_with("./")
            || trimmed.starts_with("../")
            || trimmed.starts_with('~')
        {
            return Err(Error::InvalidPath(format!(
                "'{trimmed}' is a local path, expected alias/bucket[/key]"
            )));
        }

        let mut parts = trimmed.splitn(3, '/');
        let alias = parts.next().unwrap_or_default();
        let bucket = parts.next().unwrap_or_default();
        let key = parts.next().unwrap_or_default();

        if alias.is_empty() {
            return Err(Error::InvalidPath(format!("'{trimmed}' has no alias")));
        }
        if bucket.is_empty() {
            return Err(Error::InvalidPath(format!(
                "'{trimmed}' has no bucket, expected alias/bucket[/key]"
            )));
        }

        Ok(Self::new(alias, bucket, key))
    }

    /// Same alias and bucket, different key
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self::new(&self.alias, &self.bucket, key)
    }

    /// True when the key names a folder rather than an object
    pub fn is_dir_like(&self) -> bool {
        self.key.is_empty() || self.key.ends_with('/')
    }

    /// True when the key contains glob metacharacters
    pub fn has_glob(&self) -> bool {
        self.key.contains(GLOB_CHARS)
    }

    /// Key text before the first glob metacharacter
    pub fn literal_prefix(&self) -> &str {
        match self.key.find(GLOB_CHARS) {
            Some(idx) => &self.key[..idx],
            None => &self.key,
        }
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.key
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}/{}", self.alias, self.bucket)
        } else {
            write!(f, "{}/{}/{}", self.alias, self.bucket, self.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_path() {
        let path = RemotePath::parse("play/photos/2024/beach.jpg").unwrap();
        assert_eq!(path.alias, "play");
        assert_eq!(path.bucket, "photos");
        assert_eq!(path.key, "2024/beach.jpg");
        assert_eq!(path.to_string(), "play/photos/2024/beach.jpg");
    }

    #[test]
    fn test_parse_bucket_only() {
        let path = RemotePath::parse("play/photos").unwrap();
        assert_eq!(path.key, "");
        assert!(path.is_dir_like());
        assert_eq!(path.to_string(), "play/photos");
    }

    #[test]
    fn test_parse_errors() {
        assert!(RemotePath::parse("").is_err());
        assert!(RemotePath::parse("play").is_err());
        assert!(RemotePath::parse("play/").is_err());
        assert!(RemotePath::parse("/tmp/file").is_err());
        assert!(RemotePath::parse("./file").is_err());
        assert!(RemotePath::parse("~/file").is_err());
    }

    #[test]
    fn test_glob_detection() {
        let path = RemotePath::parse("play/logs/2024/*.gz").unwrap();
        assert!(path.has_glob());
        assert_eq!(path.literal_prefix(), "2024/");

        let plain = RemotePath::parse("play/logs/2024/app.gz").unwrap();
        assert!(!plain.has_glob());
        assert_eq!(plain.literal_prefix(), "2024/app.gz");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(RemotePath::new("a", "b", "x/y/z.txt").file_name(), "z.txt");
        assert_eq!(RemotePath::new("a", "b", "z.txt").file_name(), "z.txt");
        assert_eq!(RemotePath::new("a", "b", "dir/").file_name(), "dir");
    }
}
