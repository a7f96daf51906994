//! # Content Sniffing
//!
//! Classifies files by their leading bytes rather than their extension. The
//! selector only cares about the top-level part of the MIME type (`video`,
//! `audio`, `image`), which is what [`MediaKind`] models.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Bytes read from the head of each file.
pub const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Video, MediaKind::Audio, MediaKind::Image];

    /// Maps a MIME type to its media kind by the part before the slash.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.split('/').next()? {
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "image" => Some(MediaKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        };
        f.write_str(name)
    }
}

/// Answers "what kind of content is this file".
pub trait MediaTypeOracle {
    /// MIME type of the file's content, `None` when unrecognised.
    fn mime_type(&self, path: &Path) -> io::Result<Option<String>>;

    fn media_kind(&self, path: &Path) -> io::Result<Option<MediaKind>> {
        Ok(self.mime_type(path)?.as_deref().and_then(MediaKind::from_mime))
    }
}

/// Oracle that matches well-known magic numbers in the first
/// [`SNIFF_LEN`] bytes of a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

impl MediaTypeOracle for MagicSniffer {
    fn mime_type(&self, path: &Path) -> io::Result<Option<String>> {
        let mut header = Vec::with_capacity(SNIFF_LEN);
        File::open(path)?
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut header)?;
        Ok(sniff_mime(&header).map(str::to_string))
    }
}

/// Detects the MIME type of a file from its header bytes.
pub fn sniff_mime(header: &[u8]) -> Option<&'static str> {
    let at = |offset: usize, magic: &[u8]| header.get(offset..offset + magic.len()) == Some(magic);

    // ISO base media: size, then "ftyp", then the major brand
    if at(4, b"ftyp") {
        return Some(match header.get(8..12) {
            Some(b"M4A ") | Some(b"M4B ") | Some(b"M4P ") => "audio/mp4",
            Some(b"qt  ") => "video/quicktime",
            Some(b"avif") | Some(b"avis") => "image/avif",
            Some(b"heic") | Some(b"heix") | Some(b"mif1") => "image/heic",
            Some(b"3gp4") | Some(b"3gp5") | Some(b"3gp6") => "video/3gpp",
            _ => "video/mp4",
        });
    }

    if at(0, &[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some(if contains(header, b"webm") {
            "video/webm"
        } else {
            "video/x-matroska"
        });
    }

    if header.len() > 188 && header[0] == 0x47 && header[188] == 0x47 {
        return Some("video/mp2t");
    }

    if at(0, &[0x00, 0x00, 0x01, 0xBA]) || at(0, &[0x00, 0x00, 0x01, 0xB3]) {
        return Some("video/mpeg");
    }

    if at(0, b"RIFF") {
        return match header.get(8..12) {
            Some(b"AVI ") => Some("video/x-msvideo"),
            Some(b"WAVE") => Some("audio/x-wav"),
            Some(b"WEBP") => Some("image/webp"),
            _ => None,
        };
    }

    if at(0, b"FLV\x01") {
        return Some("video/x-flv");
    }

    if at(0, &[0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11]) {
        return Some("video/x-ms-asf");
    }

    if at(0, b"OggS") {
        return Some(if contains(header, b"\x80theora") {
            "video/ogg"
        } else if contains(header, b"\x01vorbis") || contains(header, b"OpusHead") || contains(header, b"\x7fFLAC") {
            "audio/ogg"
        } else {
            "application/ogg"
        });
    }

    if at(0, b"fLaC") {
        return Some("audio/flac");
    }

    if at(0, b"FORM") && (at(8, b"AIFF") || at(8, b"AIFC")) {
        return Some("audio/x-aiff");
    }

    if at(0, b"MThd") {
        return Some("audio/midi");
    }

    if at(0, b"#!AMR") {
        return Some("audio/amr");
    }

    if at(0, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }

    if at(0, &[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    if at(0, b"GIF87a") || at(0, b"GIF89a") {
        return Some("image/gif");
    }

    // "BM", file size, then two reserved zero words
    if at(0, b"BM") && at(6, &[0, 0, 0, 0]) {
        return Some("image/bmp");
    }

    if at(0, b"II*\x00") || at(0, b"MM\x00*") {
        return Some("image/tiff");
    }

    if at(0, b"ID3") {
        return Some("audio/mpeg");
    }

    // UTF-16 byte-order marks collide with the frame sync below
    if at(0, &[0xFF, 0xFE]) || at(0, &[0xFE, 0xFF]) {
        return None;
    }

    match header {
        // ADTS: sync word with layer bits 00
        [0xFF, second, ..] if second & 0xF6 == 0xF0 => Some("audio/aac"),
        [0xFF, second, third, ..] if is_mpeg_frame_header(*second, *third) => Some("audio/mpeg"),
        _ => None,
    }
}

/// MPEG audio frame sync with a non-reserved layer, a usable bitrate index
/// and a non-reserved sampling rate.
fn is_mpeg_frame_header(second: u8, third: u8) -> bool {
    let sync = second & 0xE0 == 0xE0;
    let layer = second & 0x06 != 0;
    let bitrate = third >> 4 != 0x0F;
    let sampling = (third >> 2) & 0x03 != 0x03;
    sync && layer && bitrate && sampling
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
