//! Alias-based dispatch across several backends

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::encrypt::SseKey;
use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::{ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore};

/// Routes each request to the store registered for the path's alias
#[derive(Default, Clone)]
pub struct StoreRouter {
    stores: HashMap<String, Arc<dyn ObjectStore>>,
}

impl StoreRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, store: Arc<dyn ObjectStore>) {
        self.stores.insert(alias.into(), store);
    }

    fn store_for(&self, path: &RemotePath) -> Result<&Arc<dyn ObjectStore>> {
        self.stores
            .get(&path.alias)
            .ok_or_else(|| Error::AliasNotFound(path.alias.clone()))
    }
}

#[async_trait]
impl ObjectStore for StoreRouter {
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        self.store_for(path)?.list_objects(path, options).await
    }

    async fn head_object(&self, path: &RemotePath, sse: Option<SseKey>) -> Result<ObjectInfo> {
        self.store_for(path)?.head_object(path, sse).await
    }

    async fn get_object(&self, path: &RemotePath, sse: Option<SseKey>) -> Result<ObjectReader> {
        self.store_for(path)?.get_object(path, sse).await
    }
}
