//! Keeps a VLC play queue topped up with random media, over the player's
//! telnet console.
//!
//! Core modules:
//! - [`transport`] - Line-oriented TCP text connection with soft timeouts
//! - [`console`] - Login, the RC and VLM dialects, and their parsers
//! - [`selector`] - Random recursive media selection with backtracking
//! - [`sniff`] - Content-type detection from magic numbers
//! - [`feeder`] - The feed rule: enqueue while short, then play
//!
//! ### Supporting Modules
//!
//! - [`config`] - Defaults, JSON config file, flag overrides
//! - [`cli`] - Command-line interface definitions
//! - [`completion`] - Shell completion generation
//! - [`logging`] - Log sink construction
//! - [`error`] - Error taxonomy
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use vlc_autoplay::config::FeedConfig;
//! use vlc_autoplay::feeder;
//!
//! let config = FeedConfig {
//!     min_queue_len: 3,
//!     ..FeedConfig::default()
//! };
//! let outcome = feeder::connect_and_play(&config)?;
//! println!("Enqueued {} files", outcome.report.enqueued.len());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod console;
pub mod error;
pub mod feeder;
pub mod logging;
pub mod selector;
pub mod sniff;
pub mod transport;

pub use error::AutoplayError;
