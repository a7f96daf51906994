//! # Player Console
//!
//! Client for the media player's telnet console. Two incompatible command
//! dialects are spoken behind the one [`PlayerConsole`] trait:
//!
//! - **RC** ([`rc::RcConsole`]): the plain playlist. `playlist` prints a table
//!   of entries, `is_playing` prints `0` or `1`, `enqueue` appends a file.
//! - **VLM** ([`vlm::VlmConsole`]): a named broadcast object. `show <name>`
//!   prints an indented status tree, `setup <name> input` appends a file,
//!   `control <name> play` starts it.
//!
//! Both start with the same handshake: wait for `Password: `, send the
//! password, wait for the `> ` prompt.
//!
//! ## Queue depth
//!
//! The two dialects count remaining items differently and that difference is
//! kept on purpose:
//!
//! - RC deletes every already-played entry other than the current one, then
//!   counts entries after the current one. With nothing playing, every
//!   remaining entry counts.
//! - VLM subtracts the instance's `playlistindex` from the number of inputs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vlc_autoplay::console::{self, ConsoleSettings, Dialect};
//!
//! fn main() -> Result<(), vlc_autoplay::AutoplayError> {
//!     let settings = ConsoleSettings::default();
//!     let mut console = console::connect(Dialect::Rc, &settings)?;
//!     if console.queue_depth()? == 0 {
//!         console.enqueue(std::path::Path::new("/media/shows/pilot.mkv"))?;
//!     }
//!     console.play()?;
//!     console.close()
//! }
//! ```

pub mod listing;
pub mod rc;
pub mod session;
pub mod status;
pub mod vlm;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AutoplayError;

pub use rc::RcConsole;
pub use session::Session;
pub use vlm::VlmConsole;

/// Command prompt printed after every response.
pub const PROMPT: &str = "> ";
pub const PASSWORD_PROMPT: &str = "Password: ";
pub const LOGOUT_COMMAND: &str = "logout";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4212;
pub const DEFAULT_PASSWORD: &str = "admin";
pub const DEFAULT_SOURCE_NAME: &str = "shows";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Plain playlist console (`playlist`, `enqueue`, `play`)
    #[default]
    Rc,
    /// Broadcast manager console (`show`, `setup`, `control`)
    Vlm,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Rc => f.write_str("rc"),
            Dialect::Vlm => f.write_str("vlm"),
        }
    }
}

/// Everything needed to open and drive one console session.
#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Broadcast object name; only the VLM dialect uses it.
    pub source_name: String,
    pub connect_timeout: Duration,
    pub ack_timeout: Duration,
    pub query_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: DEFAULT_PASSWORD.to_string(),
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            connect_timeout: Duration::from_secs(5),
            ack_timeout: Duration::from_millis(1000),
            query_timeout: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// The capability set the orchestrator drives, independent of dialect.
pub trait PlayerConsole {
    fn dialect(&self) -> Dialect;

    /// Number of queued items still to be played after the current one.
    /// Always re-read from the console; the RC dialect prunes played entries
    /// as a side effect.
    fn queue_depth(&mut self) -> Result<usize, AutoplayError>;

    fn is_playing(&mut self) -> Result<bool, AutoplayError>;

    /// Appends a file to the queue as a `file://` URI. The path is sent as-is,
    /// without any quoting of special characters.
    fn enqueue(&mut self, media: &Path) -> Result<(), AutoplayError>;

    /// Starts playback unless it is already running. Returns whether the play
    /// command was sent.
    fn play(&mut self) -> Result<bool, AutoplayError>;

    /// Logs out and closes the connection. Safe to call more than once.
    fn close(&mut self) -> Result<(), AutoplayError>;
}

/// Connects and logs in using the given dialect.
///
/// # Errors
///
/// Returns a transport error if the console cannot be reached.
pub fn connect(dialect: Dialect, settings: &ConsoleSettings) -> Result<Box<dyn PlayerConsole>, AutoplayError> {
    let session = Session::open(settings)?;
    Ok(match dialect {
        Dialect::Rc => Box::new(RcConsole::new(session)),
        Dialect::Vlm => Box::new(VlmConsole::new(session, &settings.source_name)),
    })
}

pub(crate) fn file_uri(media: &Path) -> String {
    format!("file://{}", media.display())
}
