#![forbid(unsafe_code)]

//! Resolves a plain-text transcript for every manifest video that does not
//! have one yet, via an external resolver command.

use anyhow::Result;
use clap::Parser;
use tubemeta_tools::cli::CommonArgs;
use tubemeta_tools::pipeline::run_transcripts;
use tubemeta_tools::transcripts::{DEFAULT_FORMAT, SubprocessResolver, TranscriptFetcher};

#[derive(Parser)]
#[command(name = "fetch_transcripts")]
#[command(about = "Fetch plain-text transcripts through an external resolver")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Resolver command line; the video id and `--format <fmt>` are appended
    #[arg(long)]
    resolver: Option<String>,

    /// Output format passed to the resolver
    #[arg(long, default_value = DEFAULT_FORMAT)]
    format: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let session = cli.common.start(cli.resolver.clone())?;

    session.banner("Transcript Fetcher");
    let resolver = SubprocessResolver::new(
        &session.settings.resolver_command,
        session.settings.resolver_timeout,
    )?
    .with_format(&cli.format);
    let fetcher = TranscriptFetcher::new(resolver, session.layout.transcript_store());
    let summary = run_transcripts(&session.manifests, &fetcher)?;
    println!("Transcripts: {}", session.layout.transcripts.display());
    session.report(&summary)
}
