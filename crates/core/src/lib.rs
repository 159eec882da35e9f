//! oget-core: download engine for the oget object download client
//!
//! This crate holds everything that does not depend on a particular storage
//! SDK:
//! - Configuration and alias management
//! - Remote path parsing
//! - Source expansion (single objects, `...` recursion, glob patterns)
//! - The producer/consumer transfer pipeline and its progress accounting
//! - SSE-C key lookup
//!
//! Backends plug in through the [`ObjectStore`] trait.

pub mod alias;
pub mod config;
pub mod encrypt;
pub mod error;
pub mod executor;
pub mod expand;
pub mod job;
pub mod path;
pub mod pipeline;
pub mod progress;
pub mod retry;
pub mod router;
pub mod traits;

#[cfg(test)]
mod testing;

pub use alias::{Alias, AliasManager, RetryConfig};
pub use config::{Config, ConfigManager};
pub use encrypt::{EncryptionKeys, SseKey};
pub use error::{Error, Result};
pub use executor::TransferExecutor;
pub use expand::SourceExpander;
pub use job::{JobItem, TransferJob, TransferStats};
pub use path::RemotePath;
pub use pipeline::{
    JOB_QUEUE_CAPACITY, JobExecutor, JobProducer, Pipeline, PipelineError, PipelineOutcome,
};
pub use progress::{Accounter, ProgressSink, ProgressSnapshot, ProgressState};
pub use retry::{is_retryable_error, retry_with_backoff};
pub use router::StoreRouter;
pub use traits::{ByteStream, ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore};
