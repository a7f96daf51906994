//! # vlc-autoplay
//!
//! Tops up a running VLC instance's queue with random files from a media
//! library, then makes sure it is playing. Meant to be run from cron or a
//! systemd timer.
//!
//! ## Usage
//!
//! ```bash
//! # RC dialect against a local console, shows from ~/Videos
//! vlc-autoplay -v feed
//!
//! # VLM broadcast object "shows", custom library
//! vlc-autoplay feed --dialect vlm -n shows -d /srv/shows
//!
//! # What would be enqueued?
//! vlc-autoplay pick -d /srv/shows
//! ```

use std::io::{self, BufRead};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::{debug, info, warn};

use vlc_autoplay::cli::{self, Command};
use vlc_autoplay::completion;
use vlc_autoplay::config::FeedConfig;
use vlc_autoplay::feeder;

/// Parses arguments, builds the logger, loads configuration, and routes the
/// command.
fn main() -> Result<()> {
    let args = cli::Args::parse();

    if let Command::Completion { shell } = args.command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(
            completion::shell_to_completion_shell(shell),
            &mut cmd,
            &mut io::stdout(),
        );
        return Ok(());
    }

    vlc_autoplay::logging::init(args.verbose, args.logfile.as_deref())?;
    let config = FeedConfig::load(args.config.as_deref())?;
    run(args.command, config)
}

fn run(command: Command, mut config: FeedConfig) -> Result<()> {
    match command {
        Command::Feed(feed_args) => {
            feed_args.apply(&mut config);
            debug!(
                "Feeding {} console at {}:{} from {} (minimum queue {})",
                config.dialect,
                config.host,
                config.port,
                config.library_root.display(),
                config.min_queue_len
            );

            let outcome = feeder::connect_and_play(&config)?;
            info!(
                "Enqueued {} files; queue depth now {}",
                outcome.report.enqueued.len(),
                outcome.report.final_depth
            );
            for path in &outcome.report.enqueued {
                println!("{}", path.display());
            }

            if let Some(mut console) = outcome.open_console {
                eprintln!("Console session left open; press Enter to log out.");
                let mut line = String::new();
                if let Err(err) = io::stdin().lock().read_line(&mut line) {
                    warn!("Could not read from stdin: {err}");
                }
                console.close()?;
            }
        }
        Command::Pick(library_args) => {
            library_args.apply(&mut config);
            let path = config
                .selector()
                .select(&config.library_root, &mut rand::thread_rng())?;
            println!("{}", path.display());
        }
        Command::Completion { .. } => {}
    }

    Ok(())
}
