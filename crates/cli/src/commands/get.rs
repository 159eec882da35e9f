//! get command - Download objects to the local filesystem
//!
//! Sources are `alias/bucket/key` expressions. A trailing `...` downloads a
//! folder recursively and glob characters (`*`, `?`, `[`) match keys. The
//! last argument is the local target file or folder.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use oget_core::{
    Accounter, AliasManager, EncryptionKeys, ObjectStore, Pipeline, PipelineError,
    PipelineOutcome, ProgressSink, ProgressSnapshot, RemotePath, SourceExpander, StoreRouter,
    TransferExecutor,
};
use oget_s3::S3Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use crate::progress::ProgressBarSink;

const FOLDER_HINT: &str = "Folder cannot be copied. Please use `...` suffix.";

/// Download objects
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Source objects (alias/bucket/key, alias/bucket/prefix..., alias/bucket/*.txt)
    /// followed by the local target
    #[arg(required = true, num_args = 2.., value_name = "PATH")]
    pub paths: Vec<String>,
}

impl GetArgs {
    fn split(&self) -> (&[String], PathBuf) {
        match self.paths.split_last() {
            Some((target, sources)) => (sources, PathBuf::from(target)),
            None => (&[], PathBuf::new()),
        }
    }
}

/// JSON summary printed after the run
#[derive(Debug, Serialize)]
struct GetOutput {
    status: &'static str,
    objects: u64,
    bytes: u64,
    bytes_human: String,
    elapsed_secs: f64,
}

impl GetOutput {
    fn new(status: &'static str, snap: &ProgressSnapshot) -> Self {
        Self {
            status,
            objects: snap.objects,
            bytes: snap.bytes,
            bytes_human: humansize::format_size(snap.bytes, humansize::BINARY),
            elapsed_secs: (snap.elapsed_secs * 1000.0).round() / 1000.0,
        }
    }
}

/// Execute the get command
pub async fn execute(args: GetArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let (sources, target) = args.split();

    let aliases = match source_aliases(sources) {
        Ok(aliases) => aliases,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let router = match connect(&aliases).await {
        Ok(router) => router,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::from_anyhow(&e);
        }
    };

    let keys = match EncryptionKeys::from_env() {
        Ok(keys) => Arc::new(keys),
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };
    if !keys.is_empty() {
        tracing::debug!(keys = keys.len(), "Loaded SSE-C keys");
    }

    let store: Arc<dyn ObjectStore> = Arc::new(router);
    let expander = SourceExpander::new(
        Arc::clone(&store),
        Arc::clone(&keys),
        sources.to_vec(),
        target,
    );
    let executor = TransferExecutor::new(store, keys);

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("Interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    let mut sink: Box<dyn ProgressSink> = if formatter.shows_progress() {
        Box::new(ProgressBarSink::new(formatter.colors_enabled()))
    } else {
        Box::new(Accounter::new())
    };

    let result = Pipeline::new(expander, executor)
        .run(sink.as_mut(), &cancel)
        .await;
    interrupt.abort();

    let snap = sink.snapshot();
    match result {
        Ok(outcome) => {
            print_summary(&formatter, outcome, &snap);
            ExitCode::Success
        }
        Err(e) => {
            report_failure(&formatter, &e);
            if formatter.is_json() {
                formatter.json(&GetOutput::new("failed", &snap));
            }
            ExitCode::from_error(e.error())
        }
    }
}

/// Aliases named by the sources, in first-seen order
fn source_aliases(sources: &[String]) -> oget_core::Result<Vec<String>> {
    let mut seen = BTreeSet::new();
    let mut aliases = Vec::new();
    for source in sources {
        let path = RemotePath::parse(source)?;
        if seen.insert(path.alias.clone()) {
            aliases.push(path.alias);
        }
    }
    Ok(aliases)
}

/// One backend per alias, behind a router
async fn connect(aliases: &[String]) -> anyhow::Result<StoreRouter> {
    let manager = AliasManager::new().context("Failed to load aliases")?;
    let mut router = StoreRouter::new();
    for name in aliases {
        let alias = manager
            .get(name)
            .with_context(|| format!("Alias '{name}' is not configured"))?;
        let client = S3Client::new(alias)
            .await
            .with_context(|| format!("Failed to create S3 client for '{name}'"))?;
        router.insert(name.clone(), Arc::new(client));
    }
    Ok(router)
}

fn report_failure(formatter: &Formatter, error: &PipelineError) {
    if error.error().is_directory() {
        formatter.error_with_hint(&error.error().to_string(), FOLDER_HINT);
        return;
    }
    match error {
        PipelineError::Enumeration(e) => {
            formatter.error(&format!("Failed to enumerate sources: {e}"));
        }
        PipelineError::Transfer { url, error } => {
            formatter.error(&format!("Failed to download {url}: {error}"));
        }
    }
}

fn print_summary(formatter: &Formatter, outcome: PipelineOutcome, snap: &ProgressSnapshot) {
    let status = match outcome {
        PipelineOutcome::Completed => "completed",
        PipelineOutcome::Cancelled => "cancelled",
    };
    let output = GetOutput::new(status, snap);
    if formatter.is_json() {
        formatter.json(&output);
        return;
    }

    let size = formatter.style_size(&output.bytes_human);
    let elapsed = formatter.style_dim(&format!("in {:.1}s", output.elapsed_secs));
    let noun = if output.objects == 1 { "object" } else { "objects" };
    match outcome {
        PipelineOutcome::Completed => formatter.success(&format!(
            "Downloaded {} {noun} ({size}) {elapsed}",
            output.objects
        )),
        PipelineOutcome::Cancelled => formatter.warning(&format!(
            "Cancelled after {} {noun} ({size}) {elapsed}",
            output.objects
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(paths: &[&str]) -> GetArgs {
        GetArgs {
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_split_target_from_sources() {
        let args = args(&["s3/a/1.txt", "s3/a/2.txt", "local/"]);
        let (sources, target) = args.split();
        assert_eq!(sources, ["s3/a/1.txt", "s3/a/2.txt"]);
        assert_eq!(target, PathBuf::from("local/"));
    }

    #[test]
    fn test_source_aliases_deduplicated() {
        let sources = vec![
            "s3/a/1.txt".to_string(),
            "minio/b/photos...".to_string(),
            "s3/c/*.log".to_string(),
        ];
        assert_eq!(source_aliases(&sources).unwrap(), vec!["s3", "minio"]);
    }

    #[test]
    fn test_local_source_is_usage_error() {
        let sources = vec!["./file.txt".to_string()];
        let err = source_aliases(&sources).unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::UsageError);
    }

    #[test]
    fn test_summary_output() {
        let snap = ProgressSnapshot {
            objects: 2,
            bytes: 30,
            in_flight_bytes: 0,
            total_bytes: 30,
            elapsed_secs: 0.12345,
        };
        let output = GetOutput::new("completed", &snap);
        assert_eq!(output.bytes_human, "30 B");
        assert_eq!(output.elapsed_secs, 0.123);
    }
}
