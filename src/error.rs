//! # Error Taxonomy
//!
//! Every failure the console client and the media selector can report. None of
//! these are retried; the orchestrator surfaces them to its caller.
//!
//! - **Transport**: [`AutoplayError::Connect`], [`AutoplayError::Transport`],
//!   [`AutoplayError::ConnectionClosed`], [`AutoplayError::Decode`]
//! - **Protocol**: [`AutoplayError::ProtocolParse`]
//! - **Media**: [`AutoplayError::MediaExhausted`], [`AutoplayError::Library`]

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutoplayError {
    #[error("Cannot connect to console at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("Console transport failed while {action}: {source}")]
    Transport {
        action: String,
        #[source]
        source: io::Error,
    },
    #[error("Console closed the connection while {action}")]
    ConnectionClosed { action: String },
    #[error("Console sent text that is not valid UTF-8: {source}")]
    Decode {
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("Unexpected response to `{command}` (parser state: {state}): {detail}")]
    ProtocolParse {
        command: String,
        state: String,
        detail: String,
    },
    #[error("No media found under {}: {reason}", root.display())]
    MediaExhausted { root: PathBuf, reason: String },
    #[error("Cannot read media library at {}: {source}", path.display())]
    Library {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AutoplayError {
    pub fn transport(action: &str, source: io::Error) -> Self {
        AutoplayError::Transport {
            action: action.to_string(),
            source,
        }
    }

    pub fn connection_closed(action: &str) -> Self {
        AutoplayError::ConnectionClosed {
            action: action.to_string(),
        }
    }

    pub fn protocol_parse(command: &str, state: impl ToString, detail: impl Into<String>) -> Self {
        AutoplayError::ProtocolParse {
            command: command.to_string(),
            state: state.to_string(),
            detail: detail.into(),
        }
    }

    pub fn media_exhausted(root: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AutoplayError::MediaExhausted {
            root: root.into(),
            reason: reason.into(),
        }
    }

    /// True for failures of the byte stream itself rather than of its content.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AutoplayError::Connect { .. }
                | AutoplayError::Transport { .. }
                | AutoplayError::ConnectionClosed { .. }
                | AutoplayError::Decode { .. }
        )
    }
}
