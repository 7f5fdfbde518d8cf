//! keywarden - unattended lifecycle manager for a sealed secret-store server
//!
//! This is the main entry point for the keywarden command-line interface.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use commands::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let ctx = AppContext {
        vault_addr: cli.vault_addr,
        keystore_dir: cli.keystore_dir,
    };

    match cli.command {
        Commands::Init(args) => commands::init::run(args, &ctx).await,
        Commands::Unseal(args) => commands::unseal::run(args, &ctx).await,
        Commands::Configure(args) => commands::configure::run(args, &ctx).await,
        Commands::StepDown(args) => commands::step_down::run(args, &ctx).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
