// logging.rs — tracing subscriber setup for the CLI.
//
// Human-readable events go to stderr; the same events are appended as JSON
// lines to `<log_dir>/spacekeep.log`.

use std::fs::OpenOptions;
use std::sync::Mutex;

use sk_space::SpaceConfig;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FILE_NAME: &str = "spacekeep.log";

const CRATES: [&str; 4] = ["spacekeep", "sk_space", "sk_files", "sk_exec"];

pub fn init(config: &SpaceConfig, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for krate in CRATES {
        filter = filter.add_directive(format!("{krate}={level}").parse()?);
    }

    let log_path = config.log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false),
        )
        .with(fmt::layer().json().with_writer(Mutex::new(file)))
        .try_init()?;

    tracing::debug!("logging to {}", log_path.display());
    Ok(())
}
