//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `vlc-autoplay` binary.
//!
//! ## Commands
//!
//! - `feed`: top up the player's queue and make sure it is playing
//! - `pick`: print the file the selector would choose, without connecting
//! - `completion`: print a shell completion script
//!
//! ## Examples
//!
//! ```bash
//! vlc-autoplay -v feed -d ~/Videos/shows
//! vlc-autoplay feed --dialect vlm -n shows -P secret
//! vlc-autoplay pick -d ~/Music --media audio
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::FeedConfig;
use crate::console::Dialect;
use crate::sniff::MediaKind;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Top-level arguments.
#[derive(Parser, Debug)]
#[command(name = "vlc-autoplay")]
#[command(about = "Keep a VLC play queue topped up with random media from a library")]
#[command(version)]
pub struct Args {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Append log records to this file instead of stderr
    #[arg(short, long, global = true, value_name = "FILE")]
    pub logfile: Option<PathBuf>,

    /// Read settings from this JSON file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the console, enqueue media while the queue is short, then play
    ///
    /// Played entries other than the current one are removed from the
    /// playlist (RC dialect). A new random file is enqueued until at least
    /// `--min-queue` items wait after the current one, and playback is started
    /// if it is stopped.
    Feed(FeedArgs),

    /// Print the file a feed run would enqueue, without touching the player
    Pick(LibraryArgs),

    /// Generate shell completions
    ///
    /// Usage: vlc-autoplay completion bash > ~/.local/share/bash-completion/completions/vlc-autoplay
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Where media is picked from.
#[derive(ClapArgs, Debug, Default)]
pub struct LibraryArgs {
    /// Library root to search for media
    #[arg(short, long = "dump", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub dump: Option<PathBuf>,

    /// Media kinds that may be enqueued (repeatable; default: all)
    #[arg(long = "media", value_name = "KIND")]
    pub media: Vec<MediaKind>,
}

#[derive(ClapArgs, Debug, Default)]
pub struct FeedArgs {
    /// Console host name or address
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Console port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Console password
    #[arg(short = 'P', long, env = "VLC_AUTOPLAY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Broadcast object to control (VLM dialect)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Console command dialect
    #[arg(long, value_enum)]
    pub dialect: Option<Dialect>,

    /// Minimum number of unplayed items to keep queued
    #[arg(long, value_name = "N")]
    pub min_queue: Option<usize>,

    /// Leave the session open after a successful run, until Enter is pressed
    #[arg(long)]
    pub keep_open: bool,

    #[command(flatten)]
    pub library: LibraryArgs,
}

impl LibraryArgs {
    pub fn apply(&self, config: &mut FeedConfig) {
        if let Some(dump) = &self.dump {
            config.library_root = dump.clone();
        }
        if !self.media.is_empty() {
            config.media_kinds = self.media.clone();
        }
    }
}

impl FeedArgs {
    /// Overrides config file values with the flags that were given.
    pub fn apply(&self, config: &mut FeedConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(name) = &self.name {
            config.source_name = name.clone();
        }
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        if let Some(min_queue) = self.min_queue {
            config.min_queue_len = min_queue;
        }
        if self.keep_open {
            config.keep_open = true;
        }
        self.library.apply(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_feed_flags_override_config() {
        let args = Args::try_parse_from([
            "vlc-autoplay",
            "-vv",
            "feed",
            "-H",
            "media-box",
            "-p",
            "4213",
            "-n",
            "cartoons",
            "-d",
            "/srv/cartoons",
            "--dialect",
            "vlm",
            "--min-queue",
            "4",
            "--media",
            "video",
            "--media",
            "image",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);

        let Command::Feed(feed) = args.command else {
            panic!("expected the feed command");
        };
        let mut config = FeedConfig::default();
        feed.apply(&mut config);

        assert_eq!(config.host, "media-box");
        assert_eq!(config.port, 4213);
        assert_eq!(config.source_name, "cartoons");
        assert_eq!(config.library_root, PathBuf::from("/srv/cartoons"));
        assert_eq!(config.dialect, Dialect::Vlm);
        assert_eq!(config.min_queue_len, 4);
        assert_eq!(config.media_kinds, vec![MediaKind::Video, MediaKind::Image]);
        assert_eq!(config.password, "admin", "unset flags keep the config value");
        assert!(!config.keep_open);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["vlc-autoplay", "pick", "-v", "-l", "/tmp/feed.log", "-d", "/srv"]).unwrap();
        assert_eq!(args.verbose, 1);
        assert_eq!(args.logfile, Some(PathBuf::from("/tmp/feed.log")));
        assert!(matches!(args.command, Command::Pick(_)));
    }

    #[test]
    fn test_unknown_media_kind_is_rejected() {
        assert!(Args::try_parse_from(["vlc-autoplay", "pick", "--media", "text"]).is_err());
    }
}
