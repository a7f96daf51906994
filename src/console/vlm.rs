use std::path::Path;

use log::info;

use crate::console::status::StatusTree;
use crate::console::{file_uri, Dialect, PlayerConsole, Session};
use crate::error::AutoplayError;

const INPUTS_PATH: &str = "inputs";
const STATE_PATH: &str = "instances.instance.state";
const INDEX_PATH: &str = "instances.instance.playlistindex";

/// Console speaking the VLM dialect against one named broadcast object.
#[derive(Debug)]
pub struct VlmConsole {
    session: Session,
    name: String,
}

impl VlmConsole {
    pub fn new(session: Session, name: &str) -> Self {
        Self {
            session,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetches and parses the object's status dump.
    pub fn status(&mut self) -> Result<StatusTree, AutoplayError> {
        info!("Getting status of {} media object", self.name);
        let command = format!("show {}", self.name);
        let response = self.session.query(&command)?;
        StatusTree::parse_show(&command, &response)
    }
}

impl PlayerConsole for VlmConsole {
    fn dialect(&self) -> Dialect {
        Dialect::Vlm
    }

    fn queue_depth(&mut self) -> Result<usize, AutoplayError> {
        let status = self.status()?;
        let depth = depth_from_status(&status, &self.name)?;
        info!("{depth} tracks in {} queue and unplayed", self.name);
        Ok(depth)
    }

    fn is_playing(&mut self) -> Result<bool, AutoplayError> {
        let status = self.status()?;
        Ok(status.scalar(STATE_PATH) == Some("playing"))
    }

    fn enqueue(&mut self, media: &Path) -> Result<(), AutoplayError> {
        info!("Adding \"{}\" to {} queue", media.display(), self.name);
        let command = format!("setup {} input \"{}\"", self.name, file_uri(media));
        self.session.acknowledge(&command)
    }

    fn play(&mut self) -> Result<bool, AutoplayError> {
        if self.is_playing()? {
            return Ok(false);
        }
        info!("Playing {} media", self.name);
        self.session.acknowledge(&format!("control {} play", self.name))?;
        Ok(true)
    }

    fn close(&mut self) -> Result<(), AutoplayError> {
        self.session.logout()
    }
}

/// Inputs minus the current playlist index. Missing paths count as zero.
fn depth_from_status(status: &StatusTree, name: &str) -> Result<usize, AutoplayError> {
    let total = status.count(INPUTS_PATH);
    let position = match status.scalar(INDEX_PATH) {
        Some(index) => index.parse::<usize>().map_err(|_| {
            AutoplayError::protocol_parse(
                &format!("show {name}"),
                INDEX_PATH,
                format!("playlistindex is not a non-negative integer: {index:?}"),
            )
        })?,
        None => 0,
    };
    Ok(total.saturating_sub(position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(body: &str) -> StatusTree {
        StatusTree::parse("show shows", body).unwrap()
    }

    #[test]
    fn test_depth_is_inputs_minus_index() {
        let tree = status(
            "inputs\n    1 : file:///a\n    2 : file:///b\n    3 : file:///c\ninstances\n    instance\n        playlistindex : 1\n",
        );
        assert_eq!(depth_from_status(&tree, "shows").unwrap(), 2);
    }

    #[test]
    fn test_depth_without_instance_counts_all_inputs() {
        let tree = status("inputs\n    1 : file:///a\n    2 : file:///b\ninstances\n");
        assert_eq!(depth_from_status(&tree, "shows").unwrap(), 2);
    }

    #[test]
    fn test_depth_without_inputs_is_zero() {
        let tree = status("type : broadcast\ninputs\n");
        assert_eq!(depth_from_status(&tree, "shows").unwrap(), 0);
    }

    #[test]
    fn test_depth_saturates_when_index_exceeds_inputs() {
        let tree = status("inputs\n    1 : file:///a\ninstances\n    instance\n        playlistindex : 4\n");
        assert_eq!(depth_from_status(&tree, "shows").unwrap(), 0);
    }

    #[test]
    fn test_non_numeric_index_is_a_parse_error() {
        let tree = status("inputs\n    1 : file:///a\ninstances\n    instance\n        playlistindex : first\n");
        let err = depth_from_status(&tree, "shows").unwrap_err();
        match err {
            AutoplayError::ProtocolParse { command, state, .. } => {
                assert_eq!(command, "show shows");
                assert_eq!(state, INDEX_PATH);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
