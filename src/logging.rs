//! Log sink construction.
//!
//! The logger is built once, explicitly, at the top of `main` from the
//! verbosity count and optional log file. `RUST_LOG` can still refine it per
//! module, e.g. `RUST_LOG=vlc_autoplay::transport=trace`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Builder, Target};
use log::LevelFilter;

/// `-v` count to level: none is warnings only, one adds info, two or more
/// add debug.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Builds a logger writing `timestamp, target, LEVEL, message` records to
/// stderr, or appending them to `logfile` when one is given.
pub fn builder(verbosity: u8, logfile: Option<&Path>) -> Result<Builder> {
    let mut builder = Builder::new();
    builder.filter_level(level_for(verbosity));
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{}, {}, {}, {}",
            buf.timestamp_millis(),
            record.target(),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = logfile {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    Ok(builder)
}

/// Installs the logger as the global `log` sink.
pub fn init(verbosity: u8, logfile: Option<&Path>) -> Result<()> {
    builder(verbosity, logfile)?
        .try_init()
        .context("A logger was already installed")?;
    log::info!("{} started", env!("CARGO_PKG_NAME"));
    if let Some(path) = logfile {
        log::debug!("Logging to file: {}", path.display());
    }
    Ok(())
}
