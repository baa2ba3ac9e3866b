//! CLI module
//!
//! Provides command-line interface for:
//! - serve: load resources from a config file and serve them over HTTP
//! - check: validate a config file and exit

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check, run, run_command, serve};
pub use config::{AppConfig, ResourceConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
