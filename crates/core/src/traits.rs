//! Storage backend abstraction
//!
//! The transfer pipeline only needs three capabilities from a backend:
//! paged listing, metadata lookup and a streaming read. Keeping them behind
//! [`ObjectStore`] lets the pipeline run against the S3 adapter in
//! production and an in-memory store in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use jiff::Timestamp;

use crate::encrypt::SseKey;
use crate::error::Result;
use crate::path::RemotePath;

/// Chunked object body
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Metadata for a listed or inspected object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full key within the bucket
    pub key: String,
    pub size_bytes: Option<i64>,
    pub last_modified: Option<Timestamp>,
    pub etag: Option<String>,
    /// Common prefix returned by a delimited listing
    pub is_dir: bool,
}

impl ObjectInfo {
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            last_modified: None,
            etag: None,
            is_dir: false,
        }
    }

    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: None,
            last_modified: None,
            etag: None,
            is_dir: true,
        }
    }
}

/// Listing parameters
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// List every key under the prefix instead of grouping by `/`
    pub recursive: bool,
    pub max_keys: Option<i32>,
    pub continuation_token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    pub items: Vec<ObjectInfo>,
    pub truncated: bool,
    pub continuation_token: Option<String>,
}

/// An open object read
pub struct ObjectReader {
    pub info: ObjectInfo,
    pub body: ByteStream,
}

impl std::fmt::Debug for ObjectReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectReader")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Read-side storage operations used by the transfer pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of objects whose keys start with `path.key`
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult>;

    /// Fetch object metadata; `Error::NotFound` when the key does not exist
    async fn head_object(&self, path: &RemotePath, sse: Option<SseKey>) -> Result<ObjectInfo>;

    /// Open a streaming read of the object body
    async fn get_object(&self, path: &RemotePath, sse: Option<SseKey>) -> Result<ObjectReader>;
}
