use std::path::Path;

use log::info;

use crate::console::listing::{parse_listing, plan_queue, QueueEntry, PLAYLIST_COMMAND};
use crate::console::{file_uri, Dialect, PlayerConsole, Session};
use crate::error::AutoplayError;

const IS_PLAYING_COMMAND: &str = "is_playing";
const PLAY_COMMAND: &str = "play";

/// Console speaking the RC dialect against the player's own playlist.
#[derive(Debug)]
pub struct RcConsole {
    session: Session,
}

impl RcConsole {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Fetches and parses the current playlist.
    pub fn playlist(&mut self) -> Result<Vec<QueueEntry>, AutoplayError> {
        info!("Querying playlist");
        let response = self.session.query(PLAYLIST_COMMAND)?;
        parse_listing(&response)
    }

    pub fn delete(&mut self, id: u32) -> Result<(), AutoplayError> {
        info!("Deleting entry {id} from the queue");
        self.session.acknowledge(&format!("delete {id}"))
    }
}

impl PlayerConsole for RcConsole {
    fn dialect(&self) -> Dialect {
        Dialect::Rc
    }

    fn queue_depth(&mut self) -> Result<usize, AutoplayError> {
        let entries = self.playlist()?;
        let plan = plan_queue(&entries);
        for id in &plan.stale {
            self.delete(*id)?;
        }
        info!("{} tracks in queue and unplayed", plan.unplayed);
        Ok(plan.unplayed)
    }

    fn is_playing(&mut self) -> Result<bool, AutoplayError> {
        info!("Querying player state");
        let response = self.session.query(IS_PLAYING_COMMAND)?;
        parse_is_playing(&response)
    }

    fn enqueue(&mut self, media: &Path) -> Result<(), AutoplayError> {
        info!("Adding \"{}\" to the queue", media.display());
        self.session.acknowledge(&format!("enqueue {}", file_uri(media)))
    }

    fn play(&mut self) -> Result<bool, AutoplayError> {
        if self.is_playing()? {
            return Ok(false);
        }
        info!("Playing");
        self.session.acknowledge(PLAY_COMMAND)?;
        Ok(true)
    }

    fn close(&mut self) -> Result<(), AutoplayError> {
        self.session.logout()
    }
}

/// The first line that is exactly `0` or `1` once trimmed decides.
fn parse_is_playing(response: &str) -> Result<bool, AutoplayError> {
    response
        .lines()
        .find_map(|line| match line.trim() {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        })
        .ok_or_else(|| {
            AutoplayError::protocol_parse(
                IS_PLAYING_COMMAND,
                "reply",
                format!("no 0/1 line in {:?}", response.trim_end()),
            )
        })
}
