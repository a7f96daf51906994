//! # Feed Orchestration
//!
//! One feed run applies a single rule: while fewer than `min_queue_len`
//! items wait after the current one, pick a random file and enqueue it; then
//! start playback if it is stopped.
//!
//! The depth is asked again after every enqueue rather than assumed to rise
//! by one, since the RC dialect prunes played entries while counting and the
//! player may be changing the queue at the same time. Nothing is rolled back
//! on failure: items enqueued before an error stay queued.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use rand::Rng;

use crate::config::FeedConfig;
use crate::console::{self, PlayerConsole};
use crate::selector::MediaSelector;
use crate::sniff::MediaTypeOracle;

/// What a feed run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Files enqueued, in order.
    pub enqueued: Vec<PathBuf>,
    /// Queue depth observed after the last enqueue.
    pub final_depth: usize,
    /// Whether the play command was sent.
    pub started_playback: bool,
}

/// Result of [`connect_and_play`]. `open_console` is only set in keep-open
/// mode; the caller is then responsible for closing it.
pub struct FeedOutcome {
    pub report: FeedReport,
    pub open_console: Option<Box<dyn PlayerConsole>>,
}

/// Tops up the queue of an already connected console and makes sure it plays.
///
/// # Errors
///
/// - any console failure, with the failing step as context
/// - media selection failure (empty library, retry bound reached)
/// - the depth still below the minimum after `max_enqueues` enqueues
pub fn feed<C, O, R>(
    console: &mut C,
    selector: &MediaSelector<O>,
    library_root: &Path,
    rng: &mut R,
    min_queue_len: usize,
    max_enqueues: usize,
) -> Result<FeedReport>
where
    C: PlayerConsole + ?Sized,
    O: MediaTypeOracle,
    R: Rng + ?Sized,
{
    let mut report = FeedReport::default();
    let mut depth = console.queue_depth().context("Failed to read the queue depth")?;

    while depth < min_queue_len {
        if report.enqueued.len() >= max_enqueues {
            bail!(
                "Queue depth is still {depth} after {} enqueues (minimum {min_queue_len}); giving up",
                report.enqueued.len()
            );
        }

        let media = selector
            .select(library_root, rng)
            .context("Failed to select media to enqueue")?;
        console
            .enqueue(&media)
            .with_context(|| format!("Failed to enqueue {}", media.display()))?;
        report.enqueued.push(media);

        depth = console
            .queue_depth()
            .context("Failed to re-read the queue depth after enqueueing")?;
    }
    report.final_depth = depth;

    report.started_playback = console.play().context("Failed to start playback")?;
    info!(
        "Feed finished: {} enqueued, depth {}, playback {}",
        report.enqueued.len(),
        report.final_depth,
        if report.started_playback { "started" } else { "already running" }
    );
    Ok(report)
}

/// Connects with the configured dialect, runs [`feed`], and logs out.
///
/// The logout is attempted even when the feed failed. In keep-open mode a
/// successful run returns the console still connected instead.
pub fn connect_and_play(config: &FeedConfig) -> Result<FeedOutcome> {
    let settings = config.console_settings();
    let mut console = console::connect(config.dialect, &settings).with_context(|| {
        format!(
            "Failed to connect to the {} console at {}:{}",
            config.dialect, config.host, config.port
        )
    })?;

    let selector = config.selector();
    let mut rng = rand::thread_rng();
    let result = feed(
        console.as_mut(),
        &selector,
        &config.library_root,
        &mut rng,
        config.min_queue_len,
        config.max_enqueues_per_run,
    );

    match result {
        Ok(report) if config.keep_open => {
            info!("Leaving the console session open");
            Ok(FeedOutcome {
                report,
                open_console: Some(console),
            })
        }
        Ok(report) => {
            if let Err(err) = console.close() {
                warn!("Logout failed: {err}");
            }
            Ok(FeedOutcome {
                report,
                open_console: None,
            })
        }
        Err(err) => {
            if let Err(close_err) = console.close() {
                warn!("Logout after failure also failed: {close_err}");
            }
            Err(err)
        }
    }
}
