//! # Configuration Module
//!
//! Every tunable of a feed run lives in [`FeedConfig`]. Values come from
//! three layers, later ones winning field by field:
//!
//! 1. built-in defaults (a local console on port 4212, `~/Videos`)
//! 2. a JSON file: `--config <FILE>`, else the platform config file if present
//!    - Linux: `~/.config/vlc-autoplay/config.json`
//!    - macOS: `~/Library/Application Support/vlc-autoplay/config.json`
//!    - Windows: `%APPDATA%\vlc-autoplay\config.json`
//! 3. command-line flags
//!
//! Every field is optional in the file:
//!
//! ```json
//! { "dialect": "vlm", "source_name": "shows", "min_queue_len": 3 }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::console::{ConsoleSettings, Dialect, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_SOURCE_NAME};
use crate::selector::{MediaSelector, DEFAULT_MAX_DEPTH, DEFAULT_MAX_RETRIES};
use crate::sniff::MediaKind;

const APP_DIR: &str = "vlc-autoplay";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Broadcast object controlled in the VLM dialect.
    pub source_name: String,
    pub library_root: PathBuf,
    pub dialect: Dialect,
    /// Enqueue until at least this many items wait after the current one.
    pub min_queue_len: usize,
    pub media_kinds: Vec<MediaKind>,
    pub ack_timeout_ms: u64,
    pub query_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_selection_retries: usize,
    pub max_selection_depth: usize,
    /// Safety stop for a queue whose depth never rises.
    pub max_enqueues_per_run: usize,
    /// Leave the session open after a successful run.
    pub keep_open: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: DEFAULT_PASSWORD.to_string(),
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            library_root: default_library_root(),
            dialect: Dialect::Rc,
            min_queue_len: 2,
            media_kinds: MediaKind::ALL.to_vec(),
            ack_timeout_ms: 1000,
            query_timeout_ms: 5000,
            poll_interval_ms: 10,
            max_selection_retries: DEFAULT_MAX_RETRIES,
            max_selection_depth: DEFAULT_MAX_DEPTH,
            max_enqueues_per_run: 32,
            keep_open: false,
        }
    }
}

impl FeedConfig {
    /// Loads the file layer.
    ///
    /// An explicit path must exist and parse. Without one, the platform
    /// config file is used when present and the defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or is not valid
    /// JSON for this structure.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Self::default()),
            },
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Config is not valid JSON for a feed configuration")
    }

    pub fn console_settings(&self) -> ConsoleSettings {
        ConsoleSettings {
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone(),
            source_name: self.source_name.clone(),
            connect_timeout: Duration::from_millis(self.query_timeout_ms),
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
            query_timeout: Duration::from_millis(self.query_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn selector(&self) -> MediaSelector {
        MediaSelector::with_kinds(&self.media_kinds)
            .max_retries(self.max_selection_retries)
            .max_depth(self.max_selection_depth)
    }
}

/// `<config_dir>/vlc-autoplay/config.json`, if the platform has a config
/// directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn default_library_root() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join("Videos")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4212);
        assert_eq!(config.password, "admin");
        assert_eq!(config.source_name, "shows");
        assert_eq!(config.dialect, Dialect::Rc);
        assert_eq!(config.min_queue_len, 2);
        assert_eq!(config.media_kinds, vec![MediaKind::Video, MediaKind::Audio, MediaKind::Image]);
        assert!(config.library_root.ends_with("Videos"));
        assert!(!config.keep_open);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config = FeedConfig::from_json(
            r#"{ "dialect": "vlm", "min_queue_len": 3, "media_kinds": ["audio"], "library_root": "/srv/music" }"#,
        )
        .unwrap();
        assert_eq!(config.dialect, Dialect::Vlm);
        assert_eq!(config.min_queue_len, 3);
        assert_eq!(config.media_kinds, vec![MediaKind::Audio]);
        assert_eq!(config.library_root, PathBuf::from("/srv/music"));
        assert_eq!(config.port, 4212, "unspecified fields fall back to defaults");
    }

    #[test]
    fn test_unknown_dialect_is_rejected() {
        let err = FeedConfig::from_json(r#"{ "dialect": "http" }"#).unwrap_err();
        assert!(format!("{err:#}").contains("unknown variant"), "got: {err:#}");
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "host": "10.0.0.5", "port": 4213 }}"#).unwrap();

        let config = FeedConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 4213);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let err = FeedConfig::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_console_settings_conversion() {
        let config = FeedConfig {
            ack_timeout_ms: 250,
            query_timeout_ms: 750,
            poll_interval_ms: 2,
            ..FeedConfig::default()
        };
        let settings = config.console_settings();
        assert_eq!(settings.ack_timeout, Duration::from_millis(250));
        assert_eq!(settings.query_timeout, Duration::from_millis(750));
        assert_eq!(settings.poll_interval, Duration::from_millis(2));
        assert_eq!(settings.source_name, "shows");
    }
}
