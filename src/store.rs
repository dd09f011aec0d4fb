//! On-disk layout and per-asset existence checks.
//!
//! Presence of `<dir>/<video_id>.<ext>` is the durable record that an asset
//! was fetched. Files are written through a temp file and renamed, so a
//! present file is always a complete one.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::video_id::VideoId;

const COMMENTS_SUBDIR: &str = "comments";
const THUMBNAILS_SUBDIR: &str = "thumbnails";
const TRANSCRIPTS_SUBDIR: &str = "transcripts";
const COMMENTS_FILE: &str = "comments.csv";
const DEFAULT_MANIFESTS: [&str; 2] = ["mtv.csv", "nmtv.csv"];

/// Every filesystem location the fetch binaries touch.
#[derive(Debug, Clone)]
pub struct MediaLayout {
    pub root: PathBuf,
    pub comments: PathBuf,
    pub comments_file: PathBuf,
    pub thumbnails: PathBuf,
    pub transcripts: PathBuf,
}

impl MediaLayout {
    pub fn new(root: &Path) -> Self {
        let root = root.to_path_buf();
        let comments = root.join(COMMENTS_SUBDIR);
        let comments_file = comments.join(COMMENTS_FILE);
        let thumbnails = root.join(THUMBNAILS_SUBDIR);
        let transcripts = root.join(TRANSCRIPTS_SUBDIR);
        Self {
            root,
            comments,
            comments_file,
            thumbnails,
            transcripts,
        }
    }

    /// Manifests used when none are named on the command line.
    pub fn default_manifests(&self) -> Vec<PathBuf> {
        DEFAULT_MANIFESTS
            .iter()
            .map(|name| self.root.join(name))
            .collect()
    }

    pub fn thumbnail_store(&self) -> AssetStore {
        AssetStore::new(&self.thumbnails, "jpg")
    }

    pub fn transcript_store(&self) -> AssetStore {
        AssetStore::new(&self.transcripts, "txt")
    }
}

/// Directory of one-file-per-video artifacts.
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
    extension: &'static str,
}

impl AssetStore {
    pub fn new(dir: &Path, extension: &'static str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            extension,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {}", self.dir.display()))
    }

    pub fn path_for(&self, video_id: &VideoId) -> PathBuf {
        self.dir.join(format!("{}.{}", video_id, self.extension))
    }

    pub fn contains(&self, video_id: &VideoId) -> bool {
        self.path_for(video_id).exists()
    }

    pub fn write(&self, video_id: &VideoId, contents: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(video_id);
        write_atomic(&path, contents)?;
        Ok(path)
    }
}

/// Writes `contents` to a sibling temp file and renames it over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("writing {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}
