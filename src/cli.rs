use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Podsync - push source changes into a running OpenShift component
#[derive(Parser, Debug)]
#[command(name = "podsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format for CI (one JSON object per line)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the component source and push changes once they settle
    Watch {
        /// Component directory (or a single file to watch)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Seconds of quiet before pushing (overrides watch.delay_secs)
        #[arg(long, value_name = "SECS")]
        delay: Option<u64>,

        /// Extra gitignore-style pattern to ignore (repeatable)
        #[arg(long = "ignore", value_name = "GLOB")]
        ignores: Vec<String>,

        /// Component name
        #[arg(long)]
        component: Option<String>,

        /// Application the component belongs to
        #[arg(long = "app")]
        application: Option<String>,

        /// OpenShift project the pod runs in
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Pod to push into
        #[arg(long)]
        pod: Option<String>,

        /// Container within the pod
        #[arg(short, long)]
        container: Option<String>,

        /// Destination directory inside the container
        #[arg(long, value_name = "DIR")]
        destination: Option<String>,
    },
}

/// Default log filter for a `-v` count, used when RUST_LOG is unset
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
