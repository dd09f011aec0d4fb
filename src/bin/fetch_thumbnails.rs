#![forbid(unsafe_code)]

//! Downloads `<video_id>.jpg` for every manifest video that does not have one
//! yet.

use anyhow::Result;
use clap::Parser;
use tubemeta_tools::cli::CommonArgs;
use tubemeta_tools::pipeline::run_thumbnails;
use tubemeta_tools::thumbnails::{DEFAULT_QUALITY, HttpImageSource, ThumbnailFetcher};

#[derive(Parser)]
#[command(name = "fetch_thumbnails")]
#[command(about = "Download one thumbnail image per video")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Thumbnail variant, e.g. hqdefault, mqdefault, maxresdefault
    #[arg(long, default_value = DEFAULT_QUALITY)]
    quality: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let session = cli.common.start(None)?;

    session.banner("Thumbnail Fetcher");
    let fetcher = ThumbnailFetcher::with_quality(
        HttpImageSource::new(session.http_agent()),
        session.layout.thumbnail_store(),
        &cli.quality,
    );
    let summary = run_thumbnails(&session.manifests, &fetcher)?;
    println!("Thumbnails: {}", session.layout.thumbnails.display());
    session.report(&summary)
}
