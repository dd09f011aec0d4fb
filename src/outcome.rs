//! Per-item fetch results and the run summary built from them.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::store::write_atomic;

/// Terminal state of one `(video_id, asset kind)` attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Success(T),
    Skipped(SkipReason),
    Failed(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Output artifact already exists on disk.
    AlreadyPresent,
    UnrecognizedUrl,
}

/// Classified remote or subprocess failures. All of them are recoverable at
/// the single-video boundary.
///
/// The transcript variants come from substring matches on the resolver's
/// diagnostic text and are therefore approximate; anything unmatched lands in
/// [`ErrorKind::Resolver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("403 Forbidden; check the API key and quota")]
    Unauthorized,
    #[error("video not found or comments disabled")]
    NotFound,
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("transcripts are disabled for this video")]
    TranscriptsDisabled,
    #[error("no transcript found for this video")]
    NoTranscript,
    #[error("resolver failed: {0}")]
    Resolver(String),
    #[error("resolver timed out after {}s", .0.as_secs())]
    ResolverTimeout(Duration),
    #[error("could not launch resolver: {0}")]
    ResolverLaunch(String),
}

impl ErrorKind {
    /// Stable short label used as the summary key.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::HttpStatus(_) => "http_status",
            ErrorKind::Transport(_) => "transport",
            ErrorKind::MalformedResponse(_) => "malformed_response",
            ErrorKind::TranscriptsDisabled => "transcripts_disabled",
            ErrorKind::NoTranscript => "no_transcript",
            ErrorKind::Resolver(_) => "resolver",
            ErrorKind::ResolverTimeout(_) => "resolver_timeout",
            ErrorKind::ResolverLaunch(_) => "resolver_launch",
        }
    }
}

/// Tally of one pipeline run. Item failures never change the exit status;
/// this is the only place they are accounted for.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub asset: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub urls_seen: usize,
    pub invalid_urls: usize,
    pub succeeded: usize,
    pub already_present: usize,
    pub failed: BTreeMap<String, usize>,
    pub unclassified_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_written: Option<usize>,
}

impl RunSummary {
    pub fn new(asset: &str) -> Self {
        Self {
            asset: asset.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            urls_seen: 0,
            invalid_urls: 0,
            succeeded: 0,
            already_present: 0,
            failed: BTreeMap::new(),
            unclassified_failures: 0,
            rows_written: None,
        }
    }

    pub fn record<T>(&mut self, outcome: &FetchOutcome<T>) {
        match outcome {
            FetchOutcome::Success(_) => self.succeeded += 1,
            FetchOutcome::Skipped(SkipReason::AlreadyPresent) => self.already_present += 1,
            FetchOutcome::Skipped(SkipReason::UnrecognizedUrl) => self.invalid_urls += 1,
            FetchOutcome::Failed(kind) => {
                *self.failed.entry(kind.label().to_string()).or_default() += 1;
            }
        }
    }

    pub fn record_unclassified(&mut self) {
        self.unclassified_failures += 1;
    }

    pub fn total_failed(&self) -> usize {
        self.failed.values().sum::<usize>() + self.unclassified_failures
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn print(&self) {
        println!();
        println!("===================================");
        println!("{} run complete", self.asset);
        println!("===================================");
        println!("URLs read: {}", self.urls_seen);
        println!("Invalid URLs skipped: {}", self.invalid_urls);
        println!("Fetched: {}", self.succeeded);
        println!("Already present: {}", self.already_present);
        println!("Failed: {}", self.total_failed());
        for (label, count) in &self.failed {
            println!("  - {label}: {count}");
        }
        if self.unclassified_failures > 0 {
            println!("  - unclassified: {}", self.unclassified_failures);
        }
        if let Some(rows) = self.rows_written {
            println!("Rows written: {rows}");
        }
    }

    /// Written atomically so a reader polling the file never sees a partial
    /// document.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let payload = serde_json::to_vec_pretty(self).context("serializing run summary")?;
        write_atomic(path, &payload)
    }
}
