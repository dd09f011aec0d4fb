//! Sequential acquisition runs: manifest rows in, assets or skips out.
//!
//! Each URL is normalized, fetched and written (or skipped) before the next
//! one is read. Every per-item failure stops at the item; only local setup
//! errors and the final comment table write surface as `Err`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::comments::{CommentApi, CommentTable, fetch_comments};
use crate::manifest::ManifestReader;
use crate::outcome::{FetchOutcome, RunSummary, SkipReason};
use crate::thumbnails::{ImageSource, ThumbnailFetcher};
use crate::transcripts::{TranscriptFetcher, TranscriptResolver};
use crate::video_id::{VideoId, parse_video_id};

/// Drives `fetch` over every recognizable URL and hands successful payloads
/// to `keep`. `Err` from `fetch` is an unclassified failure: logged, counted,
/// and otherwise ignored.
pub fn process_urls<T>(
    urls: impl IntoIterator<Item = String>,
    summary: &mut RunSummary,
    mut fetch: impl FnMut(&VideoId) -> Result<FetchOutcome<T>>,
    mut keep: impl FnMut(&VideoId, T),
) {
    for url in urls {
        summary.urls_seen += 1;
        let Some(video_id) = parse_video_id(&url) else {
            warn!(%url, "Could not extract video ID, skipping");
            summary.record::<T>(&FetchOutcome::Skipped(SkipReason::UnrecognizedUrl));
            continue;
        };

        match fetch(&video_id) {
            Ok(outcome) => {
                summary.record(&outcome);
                match outcome {
                    FetchOutcome::Success(value) => keep(&video_id, value),
                    FetchOutcome::Skipped(_) => {}
                    FetchOutcome::Failed(kind) => warn!(%video_id, "{kind}"),
                }
            }
            Err(err) => {
                warn!(%video_id, "Failed to process: {err:#}");
                summary.record_unclassified();
            }
        }
    }
}

/// Fetches one page of comments per video and writes the whole run as a
/// single table at `output`, replacing any previous table. Nothing is written
/// when no comments were collected.
pub fn run_comments(
    manifests: &[PathBuf],
    api: &impl CommentApi,
    max_results: u32,
    output: &Path,
) -> Result<RunSummary> {
    let mut summary = RunSummary::new("comments");
    let mut table = CommentTable::new();

    process_urls(
        ManifestReader::new(manifests.iter().cloned()),
        &mut summary,
        |video_id| {
            info!(%video_id, "Fetching comments");
            Ok(fetch_comments(api, video_id, max_results))
        },
        |video_id, records| {
            info!(%video_id, count = records.len(), "Fetched comments");
            table.extend(records);
        },
    );

    if table.is_empty() {
        info!("No comments found or fetched");
    } else {
        info!(rows = table.len(), path = %output.display(), "Writing comments");
    }
    summary.rows_written = Some(table.write_csv(output)?);
    summary.finish();
    Ok(summary)
}

pub fn run_thumbnails<S: ImageSource>(
    manifests: &[PathBuf],
    fetcher: &ThumbnailFetcher<S>,
) -> Result<RunSummary> {
    fetcher.store().prepare()?;
    let mut summary = RunSummary::new("thumbnails");
    process_urls(
        ManifestReader::new(manifests.iter().cloned()),
        &mut summary,
        |video_id| fetcher.fetch(video_id),
        |_, _| {},
    );
    summary.finish();
    Ok(summary)
}

pub fn run_transcripts<R: TranscriptResolver>(
    manifests: &[PathBuf],
    fetcher: &TranscriptFetcher<R>,
) -> Result<RunSummary> {
    fetcher.store().prepare()?;
    let mut summary = RunSummary::new("transcripts");
    process_urls(
        ManifestReader::new(manifests.iter().cloned()),
        &mut summary,
        |video_id| fetcher.fetch(video_id),
        |_, _| {},
    );
    summary.finish();
    Ok(summary)
}
