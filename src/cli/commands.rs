//! CLI command implementations

use std::path::Path;

use crate::observability::{init_tracing, LogLevel};
use crate::rest_api::RestServer;

use super::args::{Cli, Command};
use super::config::AppConfig;
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve {
            config,
            port,
            log_level,
        } => serve(&config, port, log_level),
        Command::Check { config } => check(&config).map(|summary| println!("{}", summary)),
    }
}

/// Load the config, mount its resources and serve until the server stops
pub fn serve(config_path: &Path, port: Option<u16>, log_level: LogLevel) -> CliResult<()> {
    init_tracing(log_level);

    let mut config = AppConfig::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let resources = config.build_router()?;
    let server = RestServer::new(config.server.clone(), resources);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime
        .block_on(server.start())
        .map_err(|e| CliError::serve_failed(e.to_string()))
}

/// Validate and wire the config without binding a socket
pub fn check(config_path: &Path) -> CliResult<String> {
    let config = AppConfig::load(config_path)?;
    config.build_router()?;

    let records: usize = config.resources.iter().map(|r| r.records.len()).sum();
    Ok(format!(
        "{}: {} resource(s), {} record(s)",
        config_path.display(),
        config.resources.len(),
        records
    ))
}
