//! Canonical video identifiers.
//!
//! Manifests carry whatever URL shape the curator pasted. Everything
//! downstream is keyed by the bare identifier, so the four recognized shapes
//! collapse to the same [`VideoId`].

use std::fmt;
use url::Url;

/// Opaque identifier that names a video across all URL surface forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(String);

impl VideoId {
    /// Wraps an already-canonical identifier. Only ASCII letters, digits,
    /// `-` and `_` are accepted, so the value is always safe as a file stem.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then_some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extracts the identifier from a video URL.
///
/// Recognized forms:
/// - `https://youtu.be/<id>`
/// - `https://www.youtube.com/watch?v=<id>`
/// - `https://www.youtube.com/embed/<id>`
/// - `https://www.youtube.com/v/<id>`
///
/// Anything else, including strings that are not URLs at all, yields `None`.
/// Callers treat that as a skip, never as a failure.
pub fn parse_video_id(raw: &str) -> Option<VideoId> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?;
    let mut segments = url.path_segments()?;

    match host {
        "youtu.be" => VideoId::new(segments.next()?),
        "www.youtube.com" | "youtube.com" => match segments.next()? {
            "watch" if url.path() == "/watch" => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .and_then(|(_, value)| VideoId::new(value.into_owned())),
            "embed" | "v" => VideoId::new(segments.next()?),
            _ => None,
        },
        _ => None,
    }
}
