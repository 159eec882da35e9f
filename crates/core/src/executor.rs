//! Single object download
//!
//! Streams one object into `<target>.part` and renames it into place once
//! the byte count matches. A failed or cancelled transfer leaves no file
//! behind at the target path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::encrypt::EncryptionKeys;
use crate::error::{Error, Result};
use crate::job::{TransferJob, TransferStats};
use crate::pipeline::JobExecutor;
use crate::progress::ProgressSink;
use crate::traits::{ObjectReader, ObjectStore};

const PART_SUFFIX: &str = ".part";

pub struct TransferExecutor {
    store: Arc<dyn ObjectStore>,
    keys: Arc<EncryptionKeys>,
}

impl TransferExecutor {
    pub fn new(store: Arc<dyn ObjectStore>, keys: Arc<EncryptionKeys>) -> Self {
        Self { store, keys }
    }

    async fn download(
        &self,
        job: &TransferJob,
        part: &Path,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let sse = self.keys.resolve(&job.source.to_string()).cloned();

        let reader = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            reader = self.store.get_object(&job.source, sse) => reader?,
        };
        let ObjectReader { info, mut body } = reader;
        let expected = info
            .size_bytes
            .and_then(|s| u64::try_from(s).ok())
            .or(job.size);
        if let Some(size) = expected {
            progress.add_total(size);
        }

        if let Some(parent) = job.target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::from_local_io(parent, e))?;
        }
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| Error::from_local_io(&job.target, e))?;

        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::from_local_io(&job.target, e))?;
            written += chunk.len() as u64;
            progress.update(chunk.len() as u64, 0);
        }
        file.flush()
            .await
            .map_err(|e| Error::from_local_io(&job.target, e))?;
        drop(file);

        if let Some(expected) = expected
            && expected != written
        {
            return Err(Error::PartialWrite {
                path: job.target.display().to_string(),
                expected,
                written,
            });
        }
        Ok(written)
    }
}

#[async_trait]
impl JobExecutor for TransferExecutor {
    async fn execute(
        &self,
        job: &TransferJob,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<TransferStats> {
        if tokio::fs::metadata(&job.target)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(Error::IsDirectory(job.target.display().to_string()));
        }

        let part = part_path(&job.target);
        let bytes = match self.download(job, &part, progress, cancel).await {
            Ok(bytes) => bytes,
            Err(e) => {
                discard(&part).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&part, &job.target).await {
            discard(&part).await;
            return Err(Error::from_local_io(&job.target, e));
        }
        progress.update(0, 1);
        tracing::debug!(source = %job.source, target = %job.target.display(), bytes, "Object saved");

        Ok(TransferStats { bytes, objects: 1 })
    }
}

/// Remove a partial file; a missing file means it was never created
async fn discard(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %part.display(), error = %e, "Failed to remove partial file");
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}
