//! SSE-C key lookup
//!
//! Keys are configured as `alias/bucket/prefix=KEY` pairs separated by
//! commas. `KEY` is either 32 raw bytes or the base64 encoding of 32 bytes.
//! Lookup picks the longest configured prefix of an object URL.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Environment variable holding the key list
pub const ENCRYPT_KEY_ENV: &str = "OGET_ENCRYPT_KEY";

const KEY_LEN: usize = 32;

/// A 256-bit customer-provided encryption key
#[derive(Clone, PartialEq, Eq)]
pub struct SseKey([u8; KEY_LEN]);

impl SseKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn parse(text: &str) -> Result<Self> {
        if text.len() == KEY_LEN {
            let mut bytes = [0u8; KEY_LEN];
            bytes.copy_from_slice(text.as_bytes());
            return Ok(Self(bytes));
        }

        let decoded = STANDARD
            .decode(text)
            .map_err(|_| Error::Config("encryption key must be 32 bytes or base64 of 32 bytes".to_string()))?;
        let bytes: [u8; KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            Error::Config(format!("decoded encryption key is {} bytes, expected 32", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

// Never print key material
impl fmt::Debug for SseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SseKey(..)")
    }
}

/// Prefix to key mapping, resolved once before a transfer starts
#[derive(Debug, Clone, Default)]
pub struct EncryptionKeys {
    // Longest prefix first
    entries: Vec<(String, SseKey)>,
}

impl EncryptionKeys {
    /// Parse a comma separated `prefix=key` list. Empty input yields no keys.
    pub fn parse(value: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (prefix, key) = item.split_once('=').ok_or_else(|| {
                Error::Config(format!("encryption key entry '{}' is missing '='", redact(item)))
            })?;
            let prefix = prefix.trim();
            if prefix.split('/').filter(|p| !p.is_empty()).count() < 2 {
                return Err(Error::Config(format!(
                    "encryption key prefix '{prefix}' must be at least alias/bucket"
                )));
            }
            entries.push((prefix.to_string(), SseKey::parse(key.trim())?));
        }

        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Ok(Self { entries })
    }

    /// Read [`ENCRYPT_KEY_ENV`]; unset means no keys
    pub fn from_env() -> Result<Self> {
        match std::env::var(ENCRYPT_KEY_ENV) {
            Ok(value) => Self::parse(&value),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("{ENCRYPT_KEY_ENV}: {e}"))),
        }
    }

    /// Key for the longest configured prefix of `url`
    pub fn resolve(&self, url: &str) -> Option<&SseKey> {
        self.entries
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, key)| key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn redact(item: &str) -> &str {
    item.split('=').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "32byteslongsecretkeymustbegiven";

    #[test]
    fn test_parse_raw_and_base64() {
        let raw = format!("{RAW}1");
        let b64 = STANDARD.encode([7u8; 32]);
        let keys = EncryptionKeys::parse(&format!(
            "play/secure={raw}, play/secure/vault/={b64}"
        ))
        .unwrap();
        assert_eq!(keys.len(), 2);

        let deep = keys.resolve("play/secure/vault/a.bin").unwrap();
        assert_eq!(deep.as_bytes(), &[7u8; 32]);

        let shallow = keys.resolve("play/secure/other.bin").unwrap();
        assert_eq!(shallow.as_bytes(), raw.as_bytes());

        assert!(keys.resolve("play/public/x").is_none());
    }

    #[test]
    fn test_parse_empty() {
        let keys = EncryptionKeys::parse("  ").unwrap();
        assert!(keys.is_empty());
        assert!(keys.resolve("play/any").is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(EncryptionKeys::parse("play/bucket").is_err());
        assert!(EncryptionKeys::parse("play=abc").is_err());
        assert!(EncryptionKeys::parse("play/bucket=short").is_err());
        let wrong_len = STANDARD.encode([1u8; 16]);
        assert!(EncryptionKeys::parse(&format!("play/bucket={wrong_len}")).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let key = SseKey::new([9u8; 32]);
        assert_eq!(format!("{key:?}"), "SseKey(..)");
    }
}
