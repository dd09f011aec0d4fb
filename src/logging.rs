use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc};

use crate::cli::LogLevel;

// e.g. 2026-02-14 19:44:09.123 -08:00
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %:z";

/// `RUST_LOG` takes precedence over the command-line level. Only the first
/// call installs a subscriber.
pub fn init(level: LogLevel, utc: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = if utc {
        builder
            .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()))
            .try_init()
    } else {
        builder
            .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
            .try_init()
    };
}
