//! CLI argument definitions using clap
//!
//! Commands:
//! - resource-viewsets serve --config <path> [--port N] [--log-level L]
//! - resource-viewsets check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::observability::LogLevel;

/// Serve read-only hypermedia resources over HTTP
#[derive(Parser, Debug)]
#[command(name = "resource-viewsets")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the configured resources and serve them
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./viewsets.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long, env = "VIEWSETS_PORT")]
        port: Option<u16>,

        /// Log level (RUST_LOG takes precedence)
        #[arg(long, value_enum, default_value = "info")]
        log_level: LogLevel,
    },

    /// Validate a configuration file and exit
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./viewsets.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_arguments() {
        let cli = Cli::try_parse_from([
            "resource-viewsets",
            "serve",
            "--config",
            "demo.json",
            "--port",
            "9000",
            "--log-level",
            "debug",
        ])
        .unwrap();

        match cli.command {
            Command::Serve {
                config,
                port,
                log_level,
            } => {
                assert_eq!(config, PathBuf::from("demo.json"));
                assert_eq!(port, Some(9000));
                assert_eq!(log_level, LogLevel::Debug);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_uses_default_config_path() {
        let cli = Cli::try_parse_from(["resource-viewsets", "check"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Check { config } if config == PathBuf::from("./viewsets.json")
        ));
    }
}
