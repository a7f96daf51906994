//! Parser for the RC console's `playlist` listing and the pruning policy
//! applied to it.
//!
//! A listing looks like this (VLC 3.x):
//!
//! ```text
//! +----[ Playlist - playlist ]
//! | 1 - Playlist
//! |   4 - s01e01.mkv (00:22:10) [played 1 time]
//! |  *5 - s01e02.mkv (00:21:58)
//! |   6 - s01e03.mkv (00:22:31)
//! | 2 - Media Library
//! +----[ End of playlist ]
//! ```
//!
//! The scan walks `unknown → begin → listing → finished`. Any deviation from
//! that grammar is a [`AutoplayError::ProtocolParse`].

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::console::PROMPT;
use crate::error::AutoplayError;

pub const PLAYLIST_COMMAND: &str = "playlist";

const SECTION_HEADER: &str = "+----[ Playlist - playlist ]";
const PLAYLIST_NODE: &str = "| 1 - Playlist";
const ENTRY_PREFIX: &str = "|  ";
const LIBRARY_NODE: &str = "| 2 - Media Library";

lazy_static! {
    static ref ENTRY_PATTERN: Regex = Regex::new(
        r"^\|  (?P<playing>[* ])(?P<id>[0-9]+) - .+?(?: \[played (?P<played>[0-9]+) times?\])?$"
    )
    .expect("playlist entry pattern compiles");
}

/// One row of a playlist listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: u32,
    /// Marked with `*` by the console.
    pub playing: bool,
    /// Present only for entries the player has already played.
    pub played: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    Unknown,
    Begin,
    Listing,
    Finished,
}

impl fmt::Display for ListingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListingState::Unknown => "unknown",
            ListingState::Begin => "begin",
            ListingState::Listing => "listing",
            ListingState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Parses a full `playlist` response into its entries, in listing order.
///
/// # Errors
///
/// - an entry line in the playlist section that does not match the entry pattern
/// - the prompt reappearing before the next section header
/// - more than one entry flagged as currently playing
/// - the response ending before the next section header (truncated read)
pub fn parse_listing(response: &str) -> Result<Vec<QueueEntry>, AutoplayError> {
    let mut state = ListingState::Unknown;
    let mut entries: Vec<QueueEntry> = Vec::new();

    for line in response.lines() {
        match state {
            ListingState::Unknown if line.starts_with(SECTION_HEADER) => {
                state = ListingState::Begin;
            }
            ListingState::Begin if line.starts_with(PLAYLIST_NODE) => {
                state = ListingState::Listing;
            }
            ListingState::Listing if line.starts_with(ENTRY_PREFIX) => {
                let entry = parse_entry(line)?;
                if entry.playing && entries.iter().any(|e| e.playing) {
                    return Err(AutoplayError::protocol_parse(
                        PLAYLIST_COMMAND,
                        state,
                        format!("second entry marked as playing: {:?}", line.trim_end()),
                    ));
                }
                entries.push(entry);
            }
            ListingState::Listing if line.starts_with(LIBRARY_NODE) => {
                state = ListingState::Finished;
                break;
            }
            _ if line.starts_with(PROMPT) => {
                return Err(AutoplayError::protocol_parse(
                    PLAYLIST_COMMAND,
                    state,
                    format!("prompt appeared before the playlist section ended: {line:?}"),
                ));
            }
            _ => {}
        }
    }

    if state != ListingState::Finished {
        return Err(AutoplayError::protocol_parse(
            PLAYLIST_COMMAND,
            state,
            format!("response ended before {LIBRARY_NODE:?} ({} entries read)", entries.len()),
        ));
    }

    Ok(entries)
}

fn parse_entry(line: &str) -> Result<QueueEntry, AutoplayError> {
    let trimmed = line.trim_end();
    let malformed = || {
        AutoplayError::protocol_parse(
            PLAYLIST_COMMAND,
            ListingState::Listing,
            format!("unrecognised playlist entry: {trimmed:?}"),
        )
    };

    let caps = ENTRY_PATTERN.captures(trimmed).ok_or_else(malformed)?;
    let id = caps["id"].parse::<u32>().map_err(|_| malformed())?;
    let played = match caps.name("played") {
        Some(count) => Some(count.as_str().parse::<u32>().map_err(|_| malformed())?),
        None => None,
    };

    Ok(QueueEntry {
        id,
        playing: &caps["playing"] == "*",
        played,
    })
}

/// What to do with a listing: which entries to delete and how many remain
/// to be played.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueuePlan {
    /// Ids of already-played entries other than the current one.
    pub stale: Vec<u32>,
    pub unplayed: usize,
}

/// Applies the pruning policy to a listing.
///
/// Every played entry that is not the current one is stale. The unplayed
/// count is the number of kept entries after the current one; with nothing
/// playing it is the number of kept entries.
pub fn plan_queue(entries: &[QueueEntry]) -> QueuePlan {
    let mut plan = QueuePlan::default();
    let mut kept = 0;
    let mut after_current = 0;
    let mut seen_current = false;

    for entry in entries {
        if entry.played.is_some() && !entry.playing {
            plan.stale.push(entry.id);
            continue;
        }
        kept += 1;
        if entry.playing {
            seen_current = true;
        } else if seen_current {
            after_current += 1;
        }
    }

    plan.unplayed = if seen_current { after_current } else { kept };
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "+----[ Playlist - playlist ]\r\n\
| 1 - Playlist\r\n\
|   4 - s01e01.mkv (00:22:10) [played 1 time]\r\n\
|  *5 - s01e02.mkv (00:21:58) [played 2 times]\r\n\
|   6 - s01e03.mkv (00:22:31)\r\n\
|   7 - s01e04 - the return.mkv (00:22:31)\r\n\
| 2 - Media Library\r\n\
+----[ End of playlist ]\r\n\
> ";

    fn entry(id: u32, playing: bool, played: Option<u32>) -> QueueEntry {
        QueueEntry { id, playing, played }
    }

    #[test]
    fn test_parse_listing_reads_all_entries() {
        let entries = parse_listing(LISTING).unwrap();
        assert_eq!(
            entries,
            vec![
                entry(4, false, Some(1)),
                entry(5, true, Some(2)),
                entry(6, false, None),
                entry(7, false, None),
            ]
        );
    }

    #[test]
    fn test_parse_listing_empty_playlist() {
        let response = "+----[ Playlist - playlist ]\n| 1 - Playlist\n| 2 - Media Library\n+----[ End of playlist ]\n> ";
        assert!(parse_listing(response).unwrap().is_empty());
    }

    #[test]
    fn test_parse_listing_ignores_noise_before_header() {
        let response = format!("status change: ( play state: 3 )\r\n{LISTING}");
        assert_eq!(parse_listing(&response).unwrap().len(), 4);
    }

    #[test]
    fn test_unmatched_entry_line_is_fatal() {
        let response = "+----[ Playlist - playlist ]\n| 1 - Playlist\n|  x9 - broken\n| 2 - Media Library\n";
        let err = parse_listing(response).unwrap_err();
        match err {
            AutoplayError::ProtocolParse { command, state, detail } => {
                assert_eq!(command, "playlist");
                assert_eq!(state, "listing");
                assert!(detail.contains("x9 - broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_prompt_before_sections_is_fatal() {
        let err = parse_listing("Unknown command `playlist'.\r\n> ").unwrap_err();
        match err {
            AutoplayError::ProtocolParse { state, .. } => assert_eq!(state, "unknown"),
            other => panic!("unexpected error: {other}"),
        }

        let err = parse_listing("+----[ Playlist - playlist ]\r\n> ").unwrap_err();
        match err {
            AutoplayError::ProtocolParse { state, .. } => assert_eq!(state, "begin"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_listing_is_fatal() {
        let response = "+----[ Playlist - playlist ]\n| 1 - Playlist\n|   4 - a.mkv (00:01:00)\n";
        assert!(matches!(
            parse_listing(response),
            Err(AutoplayError::ProtocolParse { .. })
        ));
    }

    #[test]
    fn test_two_playing_entries_is_fatal() {
        let response = "+----[ Playlist - playlist ]\n| 1 - Playlist\n|  *4 - a.mkv\n|  *5 - b.mkv\n| 2 - Media Library\n";
        assert!(matches!(
            parse_listing(response),
            Err(AutoplayError::ProtocolParse { .. })
        ));
    }

    #[test]
    fn test_plan_prunes_played_entries_and_counts_after_current() {
        // m = 2 stale entries around the current one, k = 3 unplayed after it
        let entries = vec![
            entry(1, false, Some(1)),
            entry(2, true, Some(1)),
            entry(3, false, None),
            entry(4, false, Some(3)),
            entry(5, false, None),
            entry(6, false, None),
        ];
        let plan = plan_queue(&entries);
        assert_eq!(plan.stale, vec![1, 4]);
        assert_eq!(plan.unplayed, 3);
    }

    #[test]
    fn test_plan_without_current_counts_kept_entries() {
        let entries = vec![
            entry(10, false, Some(1)),
            entry(11, false, None),
            entry(12, false, None),
        ];
        let plan = plan_queue(&entries);
        assert_eq!(plan.stale, vec![10]);
        assert_eq!(plan.unplayed, 2);
    }

    #[test]
    fn test_plan_entries_before_current_are_not_counted() {
        let entries = vec![
            entry(1, false, None),
            entry(2, true, None),
            entry(3, false, None),
        ];
        assert_eq!(plan_queue(&entries), QueuePlan { stale: vec![], unplayed: 1 });
    }

    #[test]
    fn test_plan_of_empty_listing() {
        assert_eq!(plan_queue(&[]), QueuePlan::default());
    }
}
