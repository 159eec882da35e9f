//! Transfer pipeline coordinator
//!
//! A producer task fills a bounded job queue while the coordinator drains
//! it, running one job at a time through the executor in queue order. The
//! first error, from either side, ends the run. Cancellation is a normal
//! way to stop and is not reported as an error.
//!
//! Every run renders exactly one final progress snapshot, whichever way it
//! ends.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error as ThisError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::job::{JobItem, TransferJob, TransferStats};
use crate::progress::ProgressSink;

/// Default job queue bound. Large enough to absorb bursty listings, small
/// enough to keep memory flat when transfers fall behind.
pub const JOB_QUEUE_CAPACITY: usize = 10_000;

/// Produces jobs into the queue until done, failed or cancelled.
///
/// An enumeration failure is sent as a single `Err` item, after which the
/// producer stops. Implementations must return promptly once `cancel` fires.
#[async_trait]
pub trait JobProducer: Send + Sync + 'static {
    async fn produce(&self, queue: mpsc::Sender<JobItem>, cancel: CancellationToken);
}

/// Runs one job, reporting byte deltas through `progress` as it goes.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(
        &self,
        job: &TransferJob,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<TransferStats, Error>;
}

/// How a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every enumerated job was transferred
    Completed,
    /// Stopped by the cancellation signal
    Cancelled,
}

/// The error that ended a run
#[derive(Debug, ThisError)]
pub enum PipelineError {
    /// A source could not be enumerated
    #[error("{0}")]
    Enumeration(#[source] Error),

    /// A job failed to transfer
    #[error("{url}: {error}")]
    Transfer {
        url: String,
        #[source]
        error: Error,
    },
}

impl PipelineError {
    pub fn error(&self) -> &Error {
        match self {
            PipelineError::Enumeration(e) => e,
            PipelineError::Transfer { error, .. } => error,
        }
    }
}

/// Coordinator states, tracked for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    DrainingOnError,
    Cancelled,
    Completed,
}

pub struct Pipeline<P, X> {
    producer: Arc<P>,
    executor: X,
    capacity: usize,
}

impl<P, X> Pipeline<P, X>
where
    P: JobProducer,
    X: JobExecutor,
{
    pub fn new(producer: P, executor: X) -> Self {
        Self {
            producer: Arc::new(producer),
            executor,
            capacity: JOB_QUEUE_CAPACITY,
        }
    }

    /// Override the queue bound
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Run to completion, first error, or cancellation.
    pub async fn run(
        self,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let (tx, mut rx) = mpsc::channel(self.capacity);

        // Child token: stopping the run for any reason also stops the
        // producer, while an external cancel reaches both.
        let run_token = cancel.child_token();
        let producer = Arc::clone(&self.producer);
        let producer_token = run_token.clone();
        tokio::spawn(async move { producer.produce(tx, producer_token).await });

        tracing::debug!(state = ?PipelineState::Running, capacity = self.capacity, "Pipeline started");
        let mut dispatched = 0u64;

        let (state, result) = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    break (PipelineState::Cancelled, Ok(PipelineOutcome::Cancelled));
                }

                item = rx.recv() => match item {
                    None => break (PipelineState::Completed, Ok(PipelineOutcome::Completed)),
                    Some(Err(error)) => {
                        break (PipelineState::DrainingOnError, Err(PipelineError::Enumeration(error)));
                    }
                    Some(Ok(job)) => {
                        dispatched += 1;
                        tracing::debug!(
                            seq = dispatched,
                            source = %job.source,
                            target = %job.target.display(),
                            "Dispatching job"
                        );
                        match self.executor.execute(&job, progress, &run_token).await {
                            Ok(stats) => {
                                tracing::debug!(source = %job.source, bytes = stats.bytes, "Job finished");
                            }
                            Err(Error::Cancelled) if cancel.is_cancelled() => {
                                break (PipelineState::Cancelled, Ok(PipelineOutcome::Cancelled));
                            }
                            Err(error) => {
                                let url = job.source.to_string();
                                break (PipelineState::DrainingOnError, Err(PipelineError::Transfer { url, error }));
                            }
                        }
                    }
                },
            }
        };

        // Abandon whatever the producer is still doing; never wait for it
        run_token.cancel();
        drop(rx);

        progress.render_final(result.as_ref().err().map(PipelineError::error));
        tracing::debug!(?state, dispatched, "Pipeline finished");

        result
    }
}
