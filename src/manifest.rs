//! Streams video URLs out of one or more CSV manifests.

use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

const URL_COLUMN: &str = "url";

/// Lazily yields the `url` column of every manifest, in file order then row
/// order. Missing or unreadable manifests are logged and skipped; blank URLs
/// are skipped silently. No deduplication happens here.
pub struct ManifestReader {
    pending: VecDeque<PathBuf>,
    current: Option<OpenManifest>,
}

struct OpenManifest {
    path: PathBuf,
    records: csv::StringRecordsIntoIter<File>,
    url_column: usize,
}

impl ManifestReader {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            pending: paths.into_iter().map(Into::into).collect(),
            current: None,
        }
    }

    fn open_next(&mut self) -> Option<OpenManifest> {
        while let Some(path) = self.pending.pop_front() {
            if !path.exists() {
                warn!(manifest = %path.display(), "File not found, skipping");
                continue;
            }
            match OpenManifest::open(&path) {
                Ok(manifest) => {
                    info!(manifest = %path.display(), "Reading manifest");
                    return Some(manifest);
                }
                Err(err) => {
                    warn!(manifest = %path.display(), "Skipping manifest: {err:#}");
                }
            }
        }
        None
    }
}

impl OpenManifest {
    fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("reading header of {}", path.display()))?;
        let Some(url_column) = headers.iter().position(is_url_header) else {
            bail!("no `{URL_COLUMN}` column in header");
        };
        Ok(Self {
            path: path.to_path_buf(),
            records: reader.into_records(),
            url_column,
        })
    }
}

fn is_url_header(name: &str) -> bool {
    name.trim_start_matches('\u{feff}').trim() == URL_COLUMN
}

impl Iterator for ManifestReader {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.open_next()?);
            }
            let manifest = self.current.as_mut()?;
            match manifest.records.next() {
                Some(Ok(record)) => {
                    let url = record.get(manifest.url_column).unwrap_or("").trim();
                    if !url.is_empty() {
                        return Some(url.to_string());
                    }
                }
                Some(Err(err)) => {
                    warn!(manifest = %manifest.path.display(), "Skipping unreadable row: {err}");
                }
                None => self.current = None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn collect(paths: &[PathBuf]) -> Vec<String> {
        ManifestReader::new(paths.iter().cloned()).collect()
    }

    #[test]
    fn yields_urls_in_file_then_row_order() -> Result<()> {
        let dir = tempdir()?;
        let first = dir.path().join("mtv.csv");
        let second = dir.path().join("nmtv.csv");
        fs::write(&first, "title,url\nOne,https://youtu.be/a\nTwo,https://youtu.be/b\n")?;
        fs::write(&second, "url,notes\nhttps://youtu.be/c,x\n")?;

        assert_eq!(
            collect(&[first, second]),
            vec!["https://youtu.be/a", "https://youtu.be/b", "https://youtu.be/c"]
        );
        Ok(())
    }

    #[test]
    fn missing_manifest_does_not_stop_the_rest() -> Result<()> {
        let dir = tempdir()?;
        let present = dir.path().join("present.csv");
        fs::write(&present, "url\nhttps://youtu.be/a\n")?;

        assert_eq!(
            collect(&[dir.path().join("absent.csv"), present]),
            vec!["https://youtu.be/a"]
        );
        Ok(())
    }

    #[test]
    fn blank_and_short_rows_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("m.csv");
        fs::write(
            &path,
            "title,url\nBlank,\nSpaces,   \nShort\nGood,  https://youtu.be/a  \n",
        )?;

        assert_eq!(collect(&[path]), vec!["https://youtu.be/a"]);
        Ok(())
    }

    #[test]
    fn duplicates_are_preserved() -> Result<()> {
        let dir = tempdir()?;
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.csv");
        fs::write(&first, "url\nhttps://youtu.be/a\nhttps://youtu.be/a\n")?;
        fs::write(&second, "url\nhttps://youtu.be/a\n")?;

        assert_eq!(collect(&[first, second]).len(), 3);
        Ok(())
    }

    #[test]
    fn header_with_bom_is_recognized() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("excel.csv");
        fs::write(&path, "\u{feff}url,title\nhttps://youtu.be/a,One\n")?;

        assert_eq!(collect(&[path]), vec!["https://youtu.be/a"]);
        Ok(())
    }

    #[test]
    fn manifest_without_url_column_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let wrong = dir.path().join("wrong.csv");
        let right = dir.path().join("right.csv");
        fs::write(&wrong, "link\nhttps://youtu.be/x\n")?;
        fs::write(&right, "url\nhttps://youtu.be/a\n")?;

        assert_eq!(collect(&[wrong, right]), vec!["https://youtu.be/a"]);
        Ok(())
    }
}
