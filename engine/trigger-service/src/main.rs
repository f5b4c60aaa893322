//! Trigger emulator
//!
//! Entry point of `trigger-emu`: parses the command line, loads the
//! configuration, initializes logging and hands over to the CLI handler.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use trigger_service::{initialize_logging_with_config, Cli, CliHandler};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let handler = CliHandler::from_command(&cli.command).context("Failed to load configuration")?;
    initialize_logging_with_config(&handler.config().logging)?;

    info!("Starting trigger emulator v{}", env!("CARGO_PKG_VERSION"));
    handler.handle_command(cli.command)
}
