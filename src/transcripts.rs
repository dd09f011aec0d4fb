//! Plain-text transcripts resolved through an external command.
//!
//! The default resolver is the `youtube_transcript_api` module run as a
//! subprocess: `<cmd...> <video_id> --format text`. Exit status zero means
//! stdout holds the transcript. Anything else is classified from stderr.

use anyhow::{Result, bail};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::outcome::{ErrorKind, FetchOutcome, SkipReason};
use crate::store::AssetStore;
use crate::video_id::VideoId;

pub const DEFAULT_FORMAT: &str = "text";

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const DISABLED_MARKER: &str = "TranscriptsDisabled";
const NOT_FOUND_MARKER: &str = "NoTranscriptFound";

/// Identifier in, transcript text or classified failure out.
pub trait TranscriptResolver {
    fn resolve(&self, video_id: &VideoId) -> Result<String, ErrorKind>;
}

/// Best-effort reading of the resolver's diagnostics. Matching is on the
/// exception names the tool prints, so wording changes upstream degrade to
/// [`ErrorKind::Resolver`].
pub fn classify_failure(stderr: &str) -> ErrorKind {
    if stderr.contains(DISABLED_MARKER) {
        ErrorKind::TranscriptsDisabled
    } else if stderr.contains(NOT_FOUND_MARKER) {
        ErrorKind::NoTranscript
    } else {
        let first_line = stderr
            .trim()
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .unwrap_or("Unknown error");
        ErrorKind::Resolver(first_line.to_string())
    }
}

#[derive(Debug)]
pub struct ResolverOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the resolver as a child process with a hard deadline.
#[derive(Debug, Clone)]
pub struct SubprocessResolver {
    program: String,
    args: Vec<String>,
    format: String,
    timeout: Duration,
}

impl SubprocessResolver {
    /// `command` is the program followed by any fixed leading arguments.
    pub fn new(command: &[String], timeout: Duration) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("transcript resolver command is empty");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            format: DEFAULT_FORMAT.to_string(),
            timeout,
        })
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    fn command(&self, video_id: &VideoId) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(video_id.as_str())
            .arg("--format")
            .arg(&self.format);
        command
    }

    pub fn run(&self, video_id: &VideoId) -> Result<ResolverOutput, ErrorKind> {
        run_with_deadline(self.command(video_id), self.timeout)
    }
}

impl TranscriptResolver for SubprocessResolver {
    fn resolve(&self, video_id: &VideoId) -> Result<String, ErrorKind> {
        let output = self.run(video_id)?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(classify_failure(&output.stderr))
        }
    }
}

/// Pipes are drained on their own threads; otherwise a transcript larger than
/// the pipe buffer would block the child and trip the deadline. The deadline
/// also bounds collecting their output, since a descendant of the resolver can
/// keep the pipes open after the resolver itself has exited.
fn run_with_deadline(mut command: Command, timeout: Duration) -> Result<ResolverOutput, ErrorKind> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|err| ErrorKind::ResolverLaunch(err.to_string()))?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ErrorKind::ResolverTimeout(timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(ErrorKind::Resolver(format!("waiting for resolver: {err}"))),
        }
    };

    let (Some(stdout), Some(stderr)) = (collect(stdout, deadline), collect(stderr, deadline))
    else {
        return Err(ErrorKind::ResolverTimeout(timeout));
    };
    Ok(ResolverOutput {
        status,
        stdout,
        stderr,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// `None` when the pipe is still open at `deadline`. The reader thread is
/// left to finish on its own.
fn collect(pipe: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<String> {
    let Some(pipe) = pipe else {
        return Some(String::new());
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    pipe.recv_timeout(remaining)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes `<video_id>.txt` unless it is already on disk.
pub struct TranscriptFetcher<R> {
    resolver: R,
    store: AssetStore,
}

impl<R: TranscriptResolver> TranscriptFetcher<R> {
    pub fn new(resolver: R, store: AssetStore) -> Self {
        Self { resolver, store }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome<PathBuf>> {
        if self.store.contains(video_id) {
            debug!(%video_id, "Transcript already present");
            return Ok(FetchOutcome::Skipped(SkipReason::AlreadyPresent));
        }

        info!(%video_id, "Fetching transcript");
        let text = match self.resolver.resolve(video_id) {
            Ok(text) => text,
            Err(kind) => return Ok(FetchOutcome::Failed(kind)),
        };
        let path = self.store.write(video_id, text.as_bytes())?;
        info!(%video_id, path = %path.display(), "Saved transcript");
        Ok(FetchOutcome::Success(path))
    }
}
