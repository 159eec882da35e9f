//! In-memory [`ObjectStore`] for tests

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::encrypt::SseKey;
use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::{ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore};

#[derive(Default)]
pub struct MemoryStore {
    objects: BTreeMap<(String, String), Bytes>,
    denied: HashSet<String>,
    stalled: HashSet<String>,
    broken_listing: Option<String>,
    chunk_size: Option<usize>,
    page_size: Option<usize>,
    gets: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, key: &str, data: &[u8]) -> Self {
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            Bytes::copy_from_slice(data),
        );
        self
    }

    /// `get_object` on this key fails with access denied
    pub fn deny(mut self, key: &str) -> Self {
        self.denied.insert(key.to_string());
        self
    }

    /// The body of this key yields one chunk and then never completes
    pub fn stall(mut self, key: &str) -> Self {
        self.stalled.insert(key.to_string());
        self
    }

    /// Every listing fails with a network error
    pub fn break_listing(mut self, message: &str) -> Self {
        self.broken_listing = Some(message.to_string());
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Keys passed to `get_object`, in call order
    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn lookup(&self, path: &RemotePath) -> Option<&Bytes> {
        self.objects.get(&(path.bucket.clone(), path.key.clone()))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        if let Some(message) = &self.broken_listing {
            return Err(Error::Network(message.clone()));
        }

        let prefix = path.key.as_str();
        let after = options.continuation_token.unwrap_or_default();
        let page_size = self
            .page_size
            .or(options.max_keys.map(|m| m as usize))
            .unwrap_or(1000);

        let mut entries: BTreeMap<String, ObjectInfo> = BTreeMap::new();
        let mut dirs = BTreeSet::new();
        for ((bucket, key), data) in &self.objects {
            if bucket != &path.bucket || !key.starts_with(prefix) {
                continue;
            }
            let rest = &key[prefix.len()..];
            match rest.find('/') {
                Some(idx) if !options.recursive => {
                    dirs.insert(format!("{prefix}{}", &rest[..=idx]));
                }
                _ => {
                    entries.insert(key.clone(), ObjectInfo::file(key, data.len() as i64));
                }
            }
        }
        for dir in dirs {
            entries.insert(dir.clone(), ObjectInfo::dir(dir));
        }

        let remaining: Vec<ObjectInfo> = entries
            .into_iter()
            .filter(|(key, _)| after.is_empty() || key.as_str() > after.as_str())
            .map(|(_, info)| info)
            .collect();
        let truncated = remaining.len() > page_size;
        let items: Vec<ObjectInfo> = remaining.into_iter().take(page_size).collect();
        let continuation_token = if truncated {
            items.last().map(|i| i.key.clone())
        } else {
            None
        };

        Ok(ListResult {
            items,
            truncated,
            continuation_token,
        })
    }

    async fn head_object(&self, path: &RemotePath, _sse: Option<SseKey>) -> Result<ObjectInfo> {
        self.lookup(path)
            .map(|data| ObjectInfo::file(&path.key, data.len() as i64))
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn get_object(&self, path: &RemotePath, _sse: Option<SseKey>) -> Result<ObjectReader> {
        if let Ok(mut gets) = self.gets.lock() {
            gets.push(path.key.clone());
        }
        if self.denied.contains(&path.key) {
            return Err(Error::AccessDenied(path.to_string()));
        }
        let data = self
            .lookup(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        let info = ObjectInfo::file(&path.key, data.len() as i64);

        let chunk = self.chunk_size.unwrap_or(data.len().max(1));
        let chunks: Vec<Result<Bytes>> = data
            .chunks(chunk)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        let body = if self.stalled.contains(&path.key) {
            futures::stream::iter(chunks.into_iter().take(1))
                .chain(futures::stream::pending())
                .boxed()
        } else {
            futures::stream::iter(chunks).boxed()
        };

        Ok(ObjectReader { info, body })
    }
}
