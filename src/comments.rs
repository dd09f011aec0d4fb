//! Top-level comments from the YouTube Data API and the aggregate table they
//! are flushed into.
//!
//! Only the first page of `commentThreads` is requested (at most 100 items).
//! Videos with more comments than that silently lose the remainder.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

use crate::config::ApiKey;
use crate::outcome::{ErrorKind, FetchOutcome};
use crate::store::write_atomic;
use crate::video_id::VideoId;

pub const COMMENT_THREADS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/commentThreads";
pub const MAX_RESULTS_CAP: u32 = 100;
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// One row of the aggregate table. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub video_id: String,
    pub author: String,
    pub published_at: String,
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentThreadPage {
    #[serde(default)]
    pub items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
pub struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default)]
    pub author_display_name: Option<String>,
    #[serde(default)]
    pub text_display: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl CommentThread {
    pub fn from_snippet(snippet: CommentSnippet) -> Self {
        Self {
            snippet: ThreadSnippet {
                top_level_comment: TopLevelComment { snippet },
            },
        }
    }
}

/// Remote comment listing. The HTTP client implements it for real runs;
/// tests substitute canned pages.
pub trait CommentApi {
    fn comment_threads(
        &self,
        video_id: &VideoId,
        max_results: u32,
    ) -> Result<CommentThreadPage, ErrorKind>;
}

/// `commentThreads` client bound to one credential.
pub struct YoutubeDataApi {
    agent: ureq::Agent,
    endpoint: Url,
    key: ApiKey,
}

impl YoutubeDataApi {
    pub fn new(agent: ureq::Agent, key: ApiKey) -> Result<Self> {
        Self::with_endpoint(agent, key, COMMENT_THREADS_ENDPOINT)
    }

    pub fn with_endpoint(agent: ureq::Agent, key: ApiKey, endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("parsing endpoint {endpoint}"))?;
        Ok(Self {
            agent,
            endpoint,
            key,
        })
    }

    fn request_url(&self, video_id: &VideoId, max_results: u32) -> Url {
        comment_threads_url(&self.endpoint, video_id, &self.key, max_results)
    }
}

impl CommentApi for YoutubeDataApi {
    fn comment_threads(
        &self,
        video_id: &VideoId,
        max_results: u32,
    ) -> Result<CommentThreadPage, ErrorKind> {
        let url = self.request_url(video_id, max_results);
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(classify_http_error)?;
        if response.status() != 200 {
            return Err(ErrorKind::HttpStatus(response.status()));
        }
        response
            .into_json::<CommentThreadPage>()
            .map_err(|err| ErrorKind::MalformedResponse(err.to_string()))
    }
}

pub fn comment_threads_url(
    endpoint: &Url,
    video_id: &VideoId,
    key: &ApiKey,
    max_results: u32,
) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("part", "snippet")
        .append_pair("videoId", video_id.as_str())
        .append_pair("key", key.expose())
        .append_pair("maxResults", &clamp_max_results(max_results).to_string())
        .append_pair("textFormat", "plainText");
    url
}

pub fn clamp_max_results(requested: u32) -> u32 {
    requested.clamp(1, MAX_RESULTS_CAP)
}

pub fn classify_status(code: u16) -> ErrorKind {
    match code {
        403 => ErrorKind::Unauthorized,
        404 => ErrorKind::NotFound,
        other => ErrorKind::HttpStatus(other),
    }
}

pub(crate) fn classify_http_error(err: ureq::Error) -> ErrorKind {
    match err {
        ureq::Error::Status(code, _) => classify_status(code),
        ureq::Error::Transport(transport) => ErrorKind::Transport(describe_transport(&transport)),
    }
}

// The request URL carries the API key; its Display form must never reach a log.
fn describe_transport(transport: &ureq::Transport) -> String {
    let mut text = transport.kind().to_string();
    if let Some(message) = transport.message() {
        text.push_str(": ");
        text.push_str(message);
    }
    if let Some(source) = std::error::Error::source(transport) {
        text.push_str(": ");
        text.push_str(&source.to_string());
    }
    match transport.url().and_then(|url| url.query()) {
        Some(query) if !query.is_empty() => text.replace(query, "<redacted>"),
        _ => text,
    }
}

pub fn records_from_page(video_id: &VideoId, page: CommentThreadPage) -> Vec<CommentRecord> {
    page.items
        .into_iter()
        .map(|thread| {
            let snippet = thread.snippet.top_level_comment.snippet;
            CommentRecord {
                video_id: video_id.to_string(),
                author: snippet
                    .author_display_name
                    .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
                published_at: snippet.published_at.unwrap_or_default(),
                text: snippet.text_display.unwrap_or_default(),
            }
        })
        .collect()
}

/// Fetches one page of comments. Every failure is classified; the caller
/// treats it as an empty set and moves on.
pub fn fetch_comments(
    api: &impl CommentApi,
    video_id: &VideoId,
    max_results: u32,
) -> FetchOutcome<Vec<CommentRecord>> {
    match api.comment_threads(video_id, clamp_max_results(max_results)) {
        Ok(page) => FetchOutcome::Success(records_from_page(video_id, page)),
        Err(kind) => FetchOutcome::Failed(kind),
    }
}

/// Comment rows accumulated across every manifest of a run. Nothing is
/// persisted until [`CommentTable::write_csv`]; an interrupted run loses them.
#[derive(Debug, Default)]
pub struct CommentTable {
    records: Vec<CommentRecord>,
}

impl CommentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = CommentRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CommentRecord] {
        &self.records
    }

    /// Replaces `path` with the accumulated rows and returns how many were
    /// written. An empty table writes nothing and leaves any previous file
    /// and the directory untouched.
    pub fn write_csv(&self, path: &Path) -> Result<usize> {
        if self.records.is_empty() {
            return Ok(0);
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &self.records {
            writer
                .serialize(record)
                .with_context(|| format!("encoding comment for {}", record.video_id))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("flushing comment table: {}", err.error()))?;
        write_atomic(path, &bytes)?;
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::build_agent;
    use crate::test_support::{closed_port_url, serve_once};
    use std::cell::RefCell;
    use std::time::Duration;
    use tempfile::tempdir;

    fn vid(value: &str) -> VideoId {
        VideoId::new(value).unwrap()
    }

    fn snippet(author: Option<&str>, text: Option<&str>, published: Option<&str>) -> CommentThread {
        CommentThread::from_snippet(CommentSnippet {
            author_display_name: author.map(str::to_string),
            text_display: text.map(str::to_string),
            published_at: published.map(str::to_string),
        })
    }

    struct CannedApi {
        response: RefCell<Option<Result<CommentThreadPage, ErrorKind>>>,
        requested: RefCell<Vec<u32>>,
    }

    impl CannedApi {
        fn new(response: Result<CommentThreadPage, ErrorKind>) -> Self {
            Self {
                response: RefCell::new(Some(response)),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommentApi for CannedApi {
        fn comment_threads(
            &self,
            _video_id: &VideoId,
            max_results: u32,
        ) -> Result<CommentThreadPage, ErrorKind> {
            self.requested.borrow_mut().push(max_results);
            self.response
                .borrow_mut()
                .take()
                .unwrap_or_else(|| Ok(CommentThreadPage::default()))
        }
    }

    #[test]
    fn request_url_carries_every_parameter() {
        let endpoint = Url::parse(COMMENT_THREADS_ENDPOINT).unwrap();
        let url = comment_threads_url(&endpoint, &vid("abc123"), &ApiKey::new("k3y"), 500);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("part".to_string(), "snippet".to_string()),
                ("videoId".to_string(), "abc123".to_string()),
                ("key".to_string(), "k3y".to_string()),
                ("maxResults".to_string(), "100".to_string()),
                ("textFormat".to_string(), "plainText".to_string()),
            ]
        );
    }

    #[test]
    fn status_codes_map_to_distinct_kinds() {
        assert_eq!(classify_status(403), ErrorKind::Unauthorized);
        assert_eq!(classify_status(404), ErrorKind::NotFound);
        assert_eq!(classify_status(500), ErrorKind::HttpStatus(500));
    }

    fn live_api(base: &str, key: &str) -> YoutubeDataApi {
        YoutubeDataApi::with_endpoint(
            build_agent(Duration::from_secs(5)),
            ApiKey::new(key),
            &format!("{base}/youtube/v3/commentThreads"),
        )
        .unwrap()
    }

    #[test]
    fn transport_failure_does_not_leak_the_key() {
        let api = live_api(&closed_port_url(), "SECRET-KEY-123");
        let FetchOutcome::Failed(kind) = fetch_comments(&api, &vid("abc"), 100) else {
            panic!("expected a failure against a closed port");
        };
        assert!(matches!(kind, ErrorKind::Transport(_)));
        assert!(!kind.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{kind:?}").contains("SECRET-KEY-123"));
    }

    #[test]
    fn live_status_codes_are_classified() {
        let cases = [
            ("403 Forbidden", ErrorKind::Unauthorized),
            ("404 Not Found", ErrorKind::NotFound),
            ("500 Internal Server Error", ErrorKind::HttpStatus(500)),
        ];
        for (status, expected) in cases {
            let api = live_api(&serve_once(status, "{}"), "k3y");
            assert_eq!(
                fetch_comments(&api, &vid("abc"), 100),
                FetchOutcome::Failed(expected)
            );
        }
    }

    #[test]
    fn live_page_is_parsed_into_rows() {
        let body = r#"{"items":[{"snippet":{"topLevelComment":{"snippet":{"authorDisplayName":"Ada","textDisplay":"hi","publishedAt":"2024-01-01T00:00:00Z"}}}}]}"#;
        let api = live_api(&serve_once("200 OK", body), "k3y");
        let FetchOutcome::Success(records) = fetch_comments(&api, &vid("abc"), 100) else {
            panic!("expected rows");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].author, "Ada");
        assert_eq!(records[0].text, "hi");
    }

    #[test]
    fn live_non_json_body_is_malformed() {
        let api = live_api(&serve_once("200 OK", "<html>quota</html>"), "k3y");
        assert!(matches!(
            fetch_comments(&api, &vid("abc"), 100),
            FetchOutcome::Failed(ErrorKind::MalformedResponse(_))
        ));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let page = CommentThreadPage {
            items: vec![
                snippet(None, None, None),
                snippet(Some("Ada"), Some("first!"), Some("2024-01-01T00:00:00Z")),
            ],
        };
        let records = records_from_page(&vid("abc"), page);
        assert_eq!(records[0].author, "Unknown");
        assert_eq!(records[0].text, "");
        assert_eq!(records[0].published_at, "");
        assert_eq!(
            records[1],
            CommentRecord {
                video_id: "abc".into(),
                author: "Ada".into(),
                published_at: "2024-01-01T00:00:00Z".into(),
                text: "first!".into(),
            }
        );
    }

    #[test]
    fn page_json_deserializes_nested_snippets() {
        let raw = r#"{
            "kind": "youtube#commentThreadListResponse",
            "items": [
                {"snippet": {"topLevelComment": {"snippet": {
                    "authorDisplayName": "Ada",
                    "textDisplay": "hello",
                    "publishedAt": "2024-02-03T04:05:06Z"
                }}}},
                {"snippet": {"topLevelComment": {"snippet": {}}}}
            ]
        }"#;
        let page: CommentThreadPage = serde_json::from_str(raw).unwrap();
        let records = records_from_page(&vid("abc"), page);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "hello");
        assert_eq!(records[1].author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn page_without_items_is_empty() {
        let page: CommentThreadPage = serde_json::from_str("{}").unwrap();
        assert!(records_from_page(&vid("abc"), page).is_empty());
    }

    #[test]
    fn fetch_failure_is_contained() {
        let api = CannedApi::new(Err(ErrorKind::NotFound));
        let outcome = fetch_comments(&api, &vid("abc"), 100);
        assert_eq!(outcome, FetchOutcome::Failed(ErrorKind::NotFound));
    }

    #[test]
    fn fetch_clamps_requested_page_size() {
        let api = CannedApi::new(Ok(CommentThreadPage::default()));
        fetch_comments(&api, &vid("abc"), 0);
        assert_eq!(*api.requested.borrow(), vec![1]);
    }

    #[test]
    fn write_csv_uses_fixed_header_order() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("comments").join("comments.csv");
        let mut table = CommentTable::new();
        table.extend(vec![CommentRecord {
            video_id: "abc".into(),
            author: "Ada".into(),
            published_at: "2024-01-01T00:00:00Z".into(),
            text: "hi, there".into(),
        }]);

        assert_eq!(table.write_csv(&path)?, 1);
        assert_eq!(
            fs::read_to_string(&path)?,
            "video_id,author,published_at,text\nabc,Ada,2024-01-01T00:00:00Z,\"hi, there\"\n"
        );
        Ok(())
    }

    #[test]
    fn second_run_overwrites_first() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("comments.csv");
        let row = |id: &str| CommentRecord {
            video_id: id.into(),
            author: "a".into(),
            published_at: String::new(),
            text: "t".into(),
        };

        let mut first = CommentTable::new();
        first.extend(vec![row("one"), row("one")]);
        first.write_csv(&path)?;

        let mut second = CommentTable::new();
        second.extend(vec![row("two")]);
        second.write_csv(&path)?;

        let contents = fs::read_to_string(&path)?;
        assert!(!contents.contains("one"));
        assert_eq!(contents.lines().count(), 2);
        Ok(())
    }

    #[test]
    fn empty_table_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("comments").join("comments.csv");
        assert_eq!(CommentTable::new().write_csv(&path)?, 0);
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
        Ok(())
    }
}
