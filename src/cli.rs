//! CLI argument parsing for callcost

use crate::report::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "callcost")]
#[command(version)]
#[command(about = "Call-timing recorder with threshold-based slow-call reporting", long_about = None)]
pub struct Cli {
    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON Lines begin/end event log and print slow-call reports
    Replay(ReplayArgs),
}

#[derive(clap::Args, Debug)]
pub struct ReplayArgs {
    /// Event log to replay
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Recorder configuration (TOML)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Threshold for events that carry none (overrides the config)
    #[arg(short, long, value_name = "N")]
    pub threshold: Option<u64>,

    /// Output format (overrides the config)
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Print per-call aggregates to stderr after replay
    #[arg(short, long)]
    pub summary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay_args(cli: Cli) -> ReplayArgs {
        match cli.command {
            Command::Replay(args) => args,
        }
    }

    #[test]
    fn test_cli_parses_replay() {
        let cli = Cli::parse_from(["callcost", "replay", "events.jsonl"]);
        assert!(!cli.debug);
        let args = replay_args(cli);
        assert_eq!(args.file, PathBuf::from("events.jsonl"));
        assert!(args.config.is_none());
        assert!(args.threshold.is_none());
        assert!(args.format.is_none());
        assert!(!args.summary);
    }

    #[test]
    fn test_cli_replay_overrides() {
        let cli = Cli::parse_from([
            "callcost",
            "--debug",
            "replay",
            "events.jsonl",
            "--config",
            "callcost.toml",
            "--threshold",
            "16",
            "--format",
            "json",
            "--summary",
        ]);
        assert!(cli.debug);
        let args = replay_args(cli);
        assert_eq!(args.config, Some(PathBuf::from("callcost.toml")));
        assert_eq!(args.threshold, Some(16));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(args.summary);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["callcost"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["callcost", "replay", "e.jsonl", "--format", "csv"]).is_err());
    }
}
