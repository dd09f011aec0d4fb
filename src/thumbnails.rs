//! Thumbnail downloads from the public image host.

use anyhow::Result;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::comments::classify_http_error;
use crate::outcome::{ErrorKind, FetchOutcome, SkipReason};
use crate::store::AssetStore;
use crate::video_id::VideoId;

pub const DEFAULT_QUALITY: &str = "hqdefault";

// Upper bound on a single image body; real thumbnails are well under 1 MiB.
const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

pub fn thumbnail_url(video_id: &VideoId, quality: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/{quality}.jpg")
}

/// Something that can return the bytes behind an image address.
pub trait ImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ErrorKind>;
}

pub struct HttpImageSource {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpImageSource {
    pub fn new(agent: ureq::Agent) -> Self {
        Self {
            agent,
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ErrorKind> {
        let response = self.agent.get(url).call().map_err(classify_http_error)?;
        if response.status() != 200 {
            return Err(ErrorKind::HttpStatus(response.status()));
        }
        read_capped(response.into_reader(), self.max_bytes)
    }
}

/// Oversized bodies are rejected outright; a truncated image saved under its
/// final name would look complete to the existence check.
fn read_capped(reader: impl Read, max_bytes: u64) -> Result<Vec<u8>, ErrorKind> {
    let mut bytes = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| ErrorKind::Transport(err.to_string()))?;
    if bytes.len() as u64 > max_bytes {
        return Err(ErrorKind::MalformedResponse(format!(
            "image larger than {max_bytes} bytes"
        )));
    }
    Ok(bytes)
}

/// Downloads `<video_id>.jpg` unless it is already on disk.
pub struct ThumbnailFetcher<S> {
    source: S,
    store: AssetStore,
    quality: String,
}

impl<S: ImageSource> ThumbnailFetcher<S> {
    pub fn new(source: S, store: AssetStore) -> Self {
        Self::with_quality(source, store, DEFAULT_QUALITY)
    }

    pub fn with_quality(source: S, store: AssetStore, quality: &str) -> Self {
        Self {
            source,
            store,
            quality: quality.to_string(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// `Err` is reserved for local I/O failures while saving; remote failures
    /// come back as [`FetchOutcome::Failed`].
    pub fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome<PathBuf>> {
        if self.store.contains(video_id) {
            debug!(%video_id, "Thumbnail already present");
            return Ok(FetchOutcome::Skipped(SkipReason::AlreadyPresent));
        }

        let url = thumbnail_url(video_id, &self.quality);
        info!(%video_id, "Downloading thumbnail");
        let bytes = match self.source.fetch(&url) {
            Ok(bytes) => bytes,
            Err(kind) => return Ok(FetchOutcome::Failed(kind)),
        };
        let path = self.store.write(video_id, &bytes)?;
        Ok(FetchOutcome::Success(path))
    }
}
