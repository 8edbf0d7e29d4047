//! Runtime settings: built-in defaults, then the config file, then flags.
//!
//! Config file (default ~/.config/gcalert/config.toml), every key optional:
//!
//! ```toml
//! secrets_file = "~/.config/gcalert/oauth.toml"
//! alarm_interval = 30
//! query_interval = 180
//! lookahead_days = 3
//! reconnect_interval = 300
//! threads_offset = 5
//! time_format = "%Y-%m-%d  %H:%M"
//! icon = "gtk-dialog-info"
//! debug = false
//! quiet = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use gcalert_core::driver::FetchSettings;
use gcalert_core::{GcalertError, ScanSettings, TimeFormat};
use serde::Deserialize;

use crate::cli::Cli;

const DEFAULT_ALARM_INTERVAL: u64 = 30;
const DEFAULT_QUERY_INTERVAL: u64 = 180;
const DEFAULT_LOOKAHEAD_DAYS: u32 = 3;
const DEFAULT_RECONNECT_INTERVAL: u64 = 300;
const DEFAULT_THREADS_OFFSET: u64 = 5;
const DEFAULT_ICON: &str = "gtk-dialog-info";

const MIN_ALARM_INTERVAL: u64 = 5;
const MIN_QUERY_INTERVAL: u64 = 5;
const MIN_LOOKAHEAD_DAYS: u32 = 1;
const MAX_LOOKAHEAD_DAYS: u32 = 365;

const CONFIG_FILENAME: &str = "config.toml";
const SECRETS_FILENAME: &str = "oauth.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

/// The config file. Keys mirror the command-line flags.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub secrets_file: Option<String>,
    pub alarm_interval: Option<u64>,
    pub query_interval: Option<u64>,
    pub lookahead_days: Option<u32>,
    pub reconnect_interval: Option<u64>,
    pub threads_offset: Option<u64>,
    pub time_format: Option<String>,
    pub icon: Option<String>,
    pub debug: Option<bool>,
    pub quiet: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub secrets_file: PathBuf,
    pub alarm_interval: Duration,
    pub query_interval: Duration,
    pub lookahead_days: u32,
    pub reconnect_interval: Duration,
    pub threads_offset: Duration,
    pub time_format: TimeFormat,
    pub icon: String,
    pub verbosity: Verbosity,
}

impl Settings {
    /// Read the config file (if any) and apply the flags on top.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => load_file_config(path)?,
            None => {
                let path = config_dir()?.join(CONFIG_FILENAME);
                if path.exists() {
                    load_file_config(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };

        Self::resolve(cli, file)
    }

    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self> {
        let secrets_file = match (&cli.secret, &file.secrets_file) {
            (Some(path), _) => expand_path(&path.to_string_lossy()),
            (None, Some(path)) => expand_path(path),
            (None, None) => config_dir()?.join(SECRETS_FILENAME),
        };

        let time_format = cli
            .timeformat
            .as_deref()
            .or(file.time_format.as_deref())
            .map(TimeFormat::new)
            .transpose()?
            .unwrap_or_default();

        let debug = cli.debug || file.debug.unwrap_or(false);
        let quiet = cli.quiet || file.quiet.unwrap_or(false);
        let verbosity = if debug {
            Verbosity::Debug
        } else if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        };

        let alarm = cli
            .alarm
            .or(file.alarm_interval)
            .unwrap_or(DEFAULT_ALARM_INTERVAL)
            .max(MIN_ALARM_INTERVAL);
        let query = cli
            .query
            .or(file.query_interval)
            .unwrap_or(DEFAULT_QUERY_INTERVAL)
            .max(MIN_QUERY_INTERVAL);
        let lookahead_days = cli
            .look
            .or(file.lookahead_days)
            .unwrap_or(DEFAULT_LOOKAHEAD_DAYS)
            .max(MIN_LOOKAHEAD_DAYS);
        if lookahead_days > MAX_LOOKAHEAD_DAYS {
            return Err(GcalertError::Config(format!(
                "Lookahead of {} days is too far; at most {} days are supported",
                lookahead_days, MAX_LOOKAHEAD_DAYS
            ))
            .into());
        }
        let reconnect = cli
            .retry
            .or(file.reconnect_interval)
            .unwrap_or(DEFAULT_RECONNECT_INTERVAL);
        let offset = cli
            .offset
            .or(file.threads_offset)
            .unwrap_or(DEFAULT_THREADS_OFFSET);

        Ok(Settings {
            secrets_file,
            alarm_interval: Duration::from_secs(alarm),
            query_interval: Duration::from_secs(query),
            lookahead_days,
            reconnect_interval: Duration::from_secs(reconnect),
            threads_offset: Duration::from_secs(offset),
            time_format,
            icon: cli
                .icon
                .clone()
                .or(file.icon)
                .unwrap_or_else(|| DEFAULT_ICON.to_string()),
            verbosity,
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            query_interval: self.query_interval,
            reconnect_interval: self.reconnect_interval,
            lookahead_days: self.lookahead_days,
            time_format: self.time_format.clone(),
        }
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            alarm_interval: self.alarm_interval,
            threads_offset: self.threads_offset,
        }
    }
}

/// ~/.config/gcalert
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("gcalert"))
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))
}

/// Expand ~ in paths to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&Cli::default(), FileConfig::default()).unwrap();

        assert_eq!(settings.alarm_interval, Duration::from_secs(30));
        assert_eq!(settings.query_interval, Duration::from_secs(180));
        assert_eq!(settings.lookahead_days, 3);
        assert_eq!(settings.reconnect_interval, Duration::from_secs(300));
        assert_eq!(settings.threads_offset, Duration::from_secs(5));
        assert_eq!(settings.time_format, TimeFormat::default());
        assert_eq!(settings.icon, "gtk-dialog-info");
        assert_eq!(settings.verbosity, Verbosity::Normal);
        assert!(settings.secrets_file.ends_with("gcalert/oauth.toml"));
    }

    #[test]
    fn test_flags_override_file() {
        let cli = Cli {
            alarm: Some(60),
            icon: Some("bell".to_string()),
            ..Default::default()
        };
        let file = FileConfig {
            alarm_interval: Some(15),
            query_interval: Some(90),
            icon: Some("clock".to_string()),
            ..Default::default()
        };

        let settings = Settings::resolve(&cli, file).unwrap();
        assert_eq!(settings.alarm_interval, Duration::from_secs(60));
        assert_eq!(settings.query_interval, Duration::from_secs(90));
        assert_eq!(settings.icon, "bell");
    }

    #[test]
    fn test_intervals_are_floored() {
        let cli = Cli {
            alarm: Some(0),
            query: Some(1),
            look: Some(0),
            ..Default::default()
        };

        let settings = Settings::resolve(&cli, FileConfig::default()).unwrap();
        assert_eq!(settings.alarm_interval, Duration::from_secs(MIN_ALARM_INTERVAL));
        assert_eq!(settings.query_interval, Duration::from_secs(MIN_QUERY_INTERVAL));
        assert_eq!(settings.lookahead_days, MIN_LOOKAHEAD_DAYS);
    }

    #[test]
    fn test_lookahead_above_ceiling_is_rejected() {
        let cli = Cli {
            look: Some(u32::MAX),
            ..Default::default()
        };
        let err = Settings::resolve(&cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Lookahead"));

        let file = FileConfig {
            lookahead_days: Some(MAX_LOOKAHEAD_DAYS + 1),
            ..Default::default()
        };
        assert!(Settings::resolve(&Cli::default(), file).is_err());

        let cli = Cli {
            look: Some(MAX_LOOKAHEAD_DAYS),
            ..Default::default()
        };
        let settings = Settings::resolve(&cli, FileConfig::default()).unwrap();
        assert_eq!(settings.lookahead_days, MAX_LOOKAHEAD_DAYS);
    }

    #[test]
    fn test_invalid_time_format_is_rejected() {
        let cli = Cli {
            timeformat: Some("%H:%Q".to_string()),
            ..Default::default()
        };
        assert!(Settings::resolve(&cli, FileConfig::default()).is_err());
    }

    #[test]
    fn test_debug_wins_over_quiet() {
        let cli = Cli {
            debug: true,
            quiet: true,
            ..Default::default()
        };
        let settings = Settings::resolve(&cli, FileConfig::default()).unwrap();
        assert_eq!(settings.verbosity, Verbosity::Debug);

        let file = FileConfig {
            quiet: Some(true),
            ..Default::default()
        };
        let settings = Settings::resolve(&Cli::default(), file).unwrap();
        assert_eq!(settings.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn test_load_explicit_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "query_interval = 600\nlookahead_days = 7\nicon = \"bell\"").unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let settings = Settings::load(&cli).unwrap();
        assert_eq!(settings.query_interval, Duration::from_secs(600));
        assert_eq!(settings.lookahead_days, 7);
        assert_eq!(settings.icon, "bell");
    }

    #[test]
    fn test_config_file_type_errors_are_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alarm_interval = \"often\"").unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = Settings::load(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/gcalert/config.toml")),
            ..Default::default()
        };
        assert!(Settings::load(&cli).is_err());
    }

    #[test]
    fn test_expand_path() {
        let expanded = expand_path("~/gcalert/oauth.toml");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.ends_with("gcalert/oauth.toml"));

        assert_eq!(expand_path("/tmp/oauth.toml"), PathBuf::from("/tmp/oauth.toml"));
    }
}
