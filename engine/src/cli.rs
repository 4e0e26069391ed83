//! CLI interface for Transit
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Transit query engine
///
/// Answers free-text questions about buses, routes and arrival times using
/// fleet telemetry, weather and an optional LLM.
#[derive(Parser, Debug)]
#[command(name = "transit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a question
    Ask {
        /// The question, e.g. "When will bus B1 reach stop S1?"
        query: String,
    },

    /// Show the plan a question would run, without executing it
    Plan {
        query: String,
    },

    /// List the documents available to retrieval
    Corpus,

    /// Run system diagnostics
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_globals() {
        let cli = Cli::try_parse_from([
            "transit",
            "--json",
            "ask",
            "When will bus B1 reach stop S1?",
            "--log",
            "debug",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        match cli.command {
            Command::Ask { query } => assert_eq!(query, "When will bus B1 reach stop S1?"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_doctor_with_config() {
        let cli = Cli::try_parse_from(["transit", "doctor", "--config", "/tmp/t.toml"]).unwrap();
        assert!(matches!(cli.command, Command::Doctor));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
    }

    #[test]
    fn test_ask_requires_query() {
        assert!(Cli::try_parse_from(["transit", "ask"]).is_err());
    }
}
