//! Source expansion
//!
//! Turns the user's source expressions and local target into transfer jobs.
//! Three source forms are understood:
//!
//! - `alias/bucket/key` names one object
//! - `alias/bucket/prefix...` takes everything under the prefix
//! - `alias/bucket/logs/*.gz` matches keys against a glob
//!
//! Listing is paged and every page is pushed into the job queue before the
//! next one is requested, so a full queue slows enumeration down instead of
//! buffering the whole bucket in memory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::encrypt::EncryptionKeys;
use crate::error::{Error, Result};
use crate::job::{JobItem, TransferJob};
use crate::path::RemotePath;
use crate::pipeline::JobProducer;
use crate::traits::{ListOptions, ListResult, ObjectStore};

/// Suffix asking for the contents of a prefix
pub const RECURSIVE_MARKER: &str = "...";

const LIST_PAGE_SIZE: i32 = 1000;

const GLOB_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug)]
enum Source {
    Object(RemotePath),
    Recursive(RemotePath),
    Pattern(RemotePath, glob::Pattern),
}

impl Source {
    fn parse(expr: &str) -> Result<Self> {
        if let Some(stripped) = expr.strip_suffix(RECURSIVE_MARKER) {
            return Ok(Source::Recursive(RemotePath::parse(stripped)?));
        }

        let path = RemotePath::parse(expr)?;
        if path.has_glob() {
            let pattern = glob::Pattern::new(&path.key)
                .map_err(|e| Error::InvalidPath(format!("'{expr}': {e}")))?;
            return Ok(Source::Pattern(path, pattern));
        }
        Ok(Source::Object(path))
    }

    fn expands(&self) -> bool {
        !matches!(self, Source::Object(_))
    }
}

/// Producer half of the pipeline
pub struct SourceExpander {
    store: Arc<dyn ObjectStore>,
    keys: Arc<EncryptionKeys>,
    sources: Vec<String>,
    target: PathBuf,
}

impl SourceExpander {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        keys: Arc<EncryptionKeys>,
        sources: Vec<String>,
        target: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            keys,
            sources,
            target: target.into(),
        }
    }

    async fn expand_all(&self, queue: &JobQueue) -> Result<()> {
        let sources = self
            .sources
            .iter()
            .map(|s| Source::parse(s))
            .collect::<Result<Vec<_>>>()?;

        let target_is_dir = names_directory(&self.target).await;
        let dir_mode = target_is_dir || sources.len() > 1 || sources.iter().any(Source::expands);
        if dir_mode && !target_is_dir && tokio::fs::metadata(&self.target).await.is_ok() {
            return Err(Error::InvalidTarget(format!(
                "target '{}' is not a folder",
                self.target.display()
            )));
        }

        for source in sources {
            if queue.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match source {
                Source::Object(path) => self.expand_object(path, dir_mode, queue).await?,
                Source::Recursive(path) => self.expand_recursive(path, queue).await?,
                Source::Pattern(path, pattern) => self.expand_pattern(path, pattern, queue).await?,
            }
        }
        Ok(())
    }

    async fn expand_object(&self, path: RemotePath, dir_mode: bool, queue: &JobQueue) -> Result<()> {
        if path.is_dir_like() {
            return Err(Error::IsDirectory(path.to_string()));
        }

        let sse = self.keys.resolve(&path.to_string()).cloned();
        let info = match queue.guard(self.store.head_object(&path, sse)).await {
            Ok(info) => info,
            Err(Error::NotFound(_)) => {
                return Err(if self.is_prefix(&path, queue).await? {
                    Error::IsDirectory(path.to_string())
                } else {
                    Error::NotFound(path.to_string())
                });
            }
            Err(e) => return Err(e),
        };

        let target = if dir_mode {
            self.target.join(path.file_name())
        } else {
            self.target.clone()
        };
        queue
            .send(Ok(TransferJob::new(path, target).with_size(info.size_bytes)))
            .await
    }

    async fn is_prefix(&self, path: &RemotePath, queue: &JobQueue) -> Result<bool> {
        let folder = path.with_key(format!("{}/", path.key));
        let options = ListOptions {
            recursive: true,
            max_keys: Some(1),
            continuation_token: None,
        };
        let page = queue.guard(self.store.list_objects(&folder, options)).await?;
        Ok(!page.items.is_empty())
    }

    async fn expand_recursive(&self, path: RemotePath, queue: &JobQueue) -> Result<()> {
        // `photos...` keeps the `photos/` level, `photos/...` drops it
        let base = parent_of(&path.key).to_string();
        let folder = if path.is_dir_like() {
            path.clone()
        } else {
            path.with_key(format!("{}/", path.key))
        };

        let sent = self
            .walk(&folder, queue, |key| {
                let relative = key.strip_prefix(base.as_str()).unwrap_or(key);
                Some(relative.to_string())
            })
            .await?;

        if sent == 0 {
            return Err(Error::NotFound(format!("no objects under {path}")));
        }
        Ok(())
    }

    async fn expand_pattern(
        &self,
        path: RemotePath,
        pattern: glob::Pattern,
        queue: &JobQueue,
    ) -> Result<()> {
        let literal = path.literal_prefix().to_string();
        let base = parent_of(&literal).to_string();
        let listing = path.with_key(literal);

        let sent = self
            .walk(&listing, queue, |key| {
                pattern
                    .matches_with(key, GLOB_OPTIONS)
                    .then(|| key.strip_prefix(base.as_str()).unwrap_or(key).to_string())
            })
            .await?;

        if sent == 0 {
            return Err(Error::NotFound(format!("no objects match {path}")));
        }
        Ok(())
    }

    /// Page through a recursive listing, sending a job for every object the
    /// `relative` mapper accepts. Returns the number of jobs sent.
    async fn walk<F>(&self, listing: &RemotePath, queue: &JobQueue, relative: F) -> Result<usize>
    where
        F: Fn(&str) -> Option<String> + Send + Sync,
    {
        let mut sent = 0;
        let mut token = None;

        loop {
            let options = ListOptions {
                recursive: true,
                max_keys: Some(LIST_PAGE_SIZE),
                continuation_token: token.take(),
            };
            let ListResult {
                items,
                truncated,
                continuation_token,
            } = queue.guard(self.store.list_objects(listing, options)).await?;
            tracing::debug!(prefix = %listing, items = items.len(), truncated, "Listed page");

            for item in items {
                if item.is_dir || item.key.ends_with('/') {
                    continue;
                }
                let Some(name) = relative(&item.key) else {
                    continue;
                };
                if name.is_empty() {
                    continue;
                }
                let target = join_key(&self.target, &name)?;
                let job = TransferJob::new(listing.with_key(&item.key), target)
                    .with_size(item.size_bytes);
                queue.send(Ok(job)).await?;
                sent += 1;
            }

            match continuation_token {
                Some(next) if truncated => token = Some(next),
                _ => break,
            }
        }

        Ok(sent)
    }
}

#[async_trait]
impl JobProducer for SourceExpander {
    async fn produce(&self, queue: mpsc::Sender<JobItem>, cancel: CancellationToken) {
        let queue = JobQueue { tx: queue, cancel };
        match self.expand_all(&queue).await {
            Ok(()) => tracing::debug!("Source expansion finished"),
            Err(Error::Cancelled) => tracing::debug!("Source expansion cancelled"),
            Err(e) => {
                tracing::debug!(error = %e, "Source expansion failed");
                // A closed queue means the consumer already stopped
                let _ = queue.send(Err(e)).await;
            }
        }
    }
}

/// Sending side of the job queue, bound to the producer's cancellation
struct JobQueue {
    tx: mpsc::Sender<JobItem>,
    cancel: CancellationToken,
}

impl JobQueue {
    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Blocks while the queue is full; gives up on cancellation or when the
    /// consumer has gone away.
    async fn send(&self, item: JobItem) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            sent = self.tx.send(item) => sent.map_err(|_| Error::Cancelled),
        }
    }

    async fn guard<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }
}

/// Key text up to and including its last `/`
fn parent_of(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..=idx],
        None => "",
    }
}

/// Append a `/`-separated key below `base`, refusing segments that would
/// escape it.
fn join_key(base: &Path, key: &str) -> Result<PathBuf> {
    let mut path = base.to_path_buf();
    for segment in key.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment == ".." {
            return Err(Error::InvalidTarget(format!(
                "object key '{key}' escapes the target folder"
            )));
        }
        path.push(segment);
    }
    Ok(path)
}

/// True when the target ends with a separator or is an existing folder
async fn names_directory(target: &Path) -> bool {
    let text = target.to_string_lossy();
    if text.ends_with('/') || text.ends_with(std::path::MAIN_SEPARATOR) {
        return true;
    }
    tokio::fs::metadata(target)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
