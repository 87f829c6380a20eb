//! Podsync CLI
//!
//! Usage: podsync [--json] [-v...] watch [PATH] [OPTIONS]

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Watch {
            path,
            delay,
            ignores,
            component,
            application,
            project,
            pod,
            container,
            destination,
        } => commands::watch::cmd_watch(
            &path,
            commands::watch::WatchArgs {
                delay,
                ignores,
                component,
                application,
                project,
                pod,
                container,
                destination,
            },
            cli.json,
        ),
    }
}

fn init_tracing(verbose: u8) {
    // Logs go to stderr so stdout stays clean for progress and NDJSON
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli::log_level(verbose).into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
