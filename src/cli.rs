use std::path::PathBuf;

use clap::Parser;

/// Command-line flags. Every option can also be set in the config file;
/// flags given here win.
#[derive(Parser, Debug, Default)]
#[command(name = "gcalert", version)]
#[command(about = "Polls Google Calendar and displays reminder notifications for events")]
pub struct Cli {
    /// Config file applied before any command-line flags [default: ~/.config/gcalert/config.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Location of the OAuth credentials cache [default: ~/.config/gcalert/oauth.toml]
    #[arg(short, long, value_name = "FILE")]
    pub secret: Option<PathBuf>,

    /// Print debug messages
    #[arg(short, long)]
    pub debug: bool,

    /// Disable all non-debug messages
    #[arg(short = 'u', long)]
    pub quiet: bool,

    /// Seconds between queries for new calendar events [default: 180]
    #[arg(short, long, value_name = "SECONDS")]
    pub query: Option<u64>,

    /// Seconds between checking for reminders to display [default: 30]
    #[arg(short, long, value_name = "SECONDS")]
    pub alarm: Option<u64>,

    /// Days to look ahead when checking for new events [default: 3]
    #[arg(short, long, value_name = "DAYS")]
    pub look: Option<u32>,

    /// Seconds to wait between reconnection attempts [default: 300]
    #[arg(short, long, value_name = "SECONDS")]
    pub retry: Option<u64>,

    /// Seconds the first alarm scan waits for the first fetch [default: 5]
    #[arg(long, value_name = "SECONDS")]
    pub offset: Option<u64>,

    /// strftime(3) format for event times [default: "%Y-%m-%d  %H:%M"]
    #[arg(short, long = "timeformat", value_name = "FORMAT")]
    pub timeformat: Option<String>,

    /// Icon shown in reminder notifications [default: gtk-dialog-info]
    #[arg(short, long, value_name = "ICON")]
    pub icon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_short_flags() {
        let cli = Cli::try_parse_from([
            "gcalert", "-d", "-u", "-q", "60", "-a", "10", "-l", "7", "-r", "30", "-t", "%H:%M",
            "-i", "bell",
        ])
        .unwrap();

        assert!(cli.debug);
        assert!(cli.quiet);
        assert_eq!(cli.query, Some(60));
        assert_eq!(cli.alarm, Some(10));
        assert_eq!(cli.look, Some(7));
        assert_eq!(cli.retry, Some(30));
        assert_eq!(cli.timeformat.as_deref(), Some("%H:%M"));
        assert_eq!(cli.icon.as_deref(), Some("bell"));
    }

    #[test]
    fn test_long_flags() {
        let cli = Cli::try_parse_from(["gcalert", "--query", "90", "--quiet", "--secret", "/tmp/oauth.toml"])
            .unwrap();

        assert_eq!(cli.query, Some(90));
        assert!(cli.quiet);
        assert_eq!(cli.secret, Some(PathBuf::from("/tmp/oauth.toml")));
    }

    #[test]
    fn test_non_numeric_interval_is_a_clear_error() {
        let err = Cli::try_parse_from(["gcalert", "--alarm", "soon"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("--alarm"));
    }

    #[test]
    fn test_negative_lookahead_is_rejected() {
        assert!(Cli::try_parse_from(["gcalert", "--look", "-1"]).is_err());
    }
}
