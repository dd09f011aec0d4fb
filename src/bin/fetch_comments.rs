#![forbid(unsafe_code)]

//! Fetches the first page of top-level comments for every manifest video and
//! writes them to `<media-root>/comments/comments.csv`.

use anyhow::Result;
use clap::Parser;
use tubemeta_tools::cli::CommonArgs;
use tubemeta_tools::comments::{MAX_RESULTS_CAP, YoutubeDataApi};
use tubemeta_tools::pipeline::run_comments;

#[derive(Parser)]
#[command(name = "fetch_comments")]
#[command(about = "Fetch top-level comments into a single CSV table")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Comments requested per video (single page, clamped to 1..=100)
    #[arg(long, default_value_t = MAX_RESULTS_CAP)]
    max_results: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let session = cli.common.start(None)?;

    // Checked before any client exists so a missing key never reaches the
    // network.
    let key = session.settings.require_api_key()?.clone();

    session.banner("Comment Fetcher");
    let api = YoutubeDataApi::new(session.http_agent(), key)?;
    let summary = run_comments(
        &session.manifests,
        &api,
        cli.max_results,
        &session.layout.comments_file,
    )?;
    if summary.rows_written.unwrap_or(0) > 0 {
        println!("Comments: {}", session.layout.comments_file.display());
    }
    session.report(&summary)
}
