//! ## smittvakt-cli
//! **Operational command-line interface**
//! Smittvakt main entrypoint: load signature databases, scan files and
//! directory trees, inspect database contents.
//!
//! ### Expectations:
//! - POSIX-compliant argument parsing
//! - Per-file verdict lines plus an aggregate summary
//! - Exit code 1 when anything was detected

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use smittvakt_config::SmittvaktConfig;
use smittvakt_telemetry::EventLogger;

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(scan_args) => {
            let config = SmittvaktConfig::load().context("loading configuration")?;
            EventLogger::init_with_default(&config.telemetry.log_level);
            commands::run_scan(scan_args, config).await
        }
        Commands::DbInfo(dbinfo_args) => {
            EventLogger::init();
            commands::run_dbinfo(dbinfo_args)
        }
    }
}
