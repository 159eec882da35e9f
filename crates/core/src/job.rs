//! Transfer jobs exchanged between the source expander and the executor

use std::path::PathBuf;

use crate::error::Result;
use crate::path::RemotePath;

/// One resolved remote object to local file transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub source: RemotePath,
    pub target: PathBuf,
    /// Size reported during enumeration, when known
    pub size: Option<u64>,
}

impl TransferJob {
    pub fn new(source: RemotePath, target: impl Into<PathBuf>) -> Self {
        Self {
            source,
            target: target.into(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: Option<i64>) -> Self {
        self.size = size.and_then(|s| u64::try_from(s).ok());
        self
    }
}

/// What travels through the job queue: a job, or the enumeration error
/// that ended production.
pub type JobItem = Result<TransferJob>;

/// Counters produced by one successful transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub bytes: u64,
    pub objects: u64,
}
