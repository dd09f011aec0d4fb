//! Flags shared by every fetch binary, plus the glue that turns them into
//! settings, an HTTP agent and a list of manifests.

use anyhow::Result;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Settings, SettingsOverrides, resolve_settings};
use crate::logging;
use crate::outcome::RunSummary;
use crate::store::MediaLayout;

#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// CSV manifests with a `url` column (default: <media-root>/mtv.csv and
    /// <media-root>/nmtv.csv)
    #[arg(value_name = "MANIFEST")]
    pub manifests: Vec<PathBuf>,

    /// Root directory of the output layout
    #[arg(long)]
    pub media_root: Option<PathBuf>,

    /// Key/value file holding YOUTUBE_KEY and friends
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Also write the run summary as JSON to this path
    #[arg(long)]
    pub summary_file: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long)]
    pub utc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Everything a binary needs after argument parsing.
pub struct Session {
    pub settings: Settings,
    pub layout: MediaLayout,
    pub manifests: Vec<PathBuf>,
    summary_file: Option<PathBuf>,
}

impl CommonArgs {
    /// Installs logging and resolves configuration. `resolver_command` is only
    /// passed by the transcript binary.
    pub fn start(&self, resolver_command: Option<String>) -> Result<Session> {
        logging::init(self.log_level, self.utc);

        let settings = resolve_settings(SettingsOverrides {
            media_root: self.media_root.clone(),
            resolver_command,
            env_path: self.env_file.clone(),
            ..SettingsOverrides::default()
        })?;
        let layout = MediaLayout::new(&settings.media_root);
        let manifests = if self.manifests.is_empty() {
            layout.default_manifests()
        } else {
            self.manifests.clone()
        };

        Ok(Session {
            settings,
            layout,
            manifests,
            summary_file: self.summary_file.clone(),
        })
    }
}

impl Session {
    pub fn http_agent(&self) -> ureq::Agent {
        build_agent(self.settings.http_timeout)
    }

    pub fn banner(&self, title: &str) {
        println!("===================================");
        println!("{title}");
        println!("===================================");
        println!("Media root: {}", self.layout.root.display());
        for manifest in &self.manifests {
            println!("Manifest: {}", manifest.display());
        }
        println!();
    }

    pub fn report(&self, summary: &RunSummary) -> Result<()> {
        summary.print();
        if let Some(path) = &self.summary_file {
            summary.write_json(path)?;
            println!("Summary: {}", path.display());
        }
        Ok(())
    }
}

pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(concat!("tubemeta-tools/", env!("CARGO_PKG_VERSION")))
        .build()
}
