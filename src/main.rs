mod cache;
mod cli;
mod commands;
mod config;
mod error;
mod filter;
mod model;
mod pipeline;
mod preprocess;
mod sources;
#[cfg(test)]
mod testing;
mod util;
mod value;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => commands::process::run(args),
        Commands::Normalize(args) => commands::normalize::run(args),
        Commands::Naturalize(args) => commands::naturalize::run(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::Forget(args) => commands::forget::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
