//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// keywarden - unattended init, unseal, and configuration for a sealed
/// secret store
#[derive(Parser, Debug)]
#[command(name = "keywarden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Address of the secret-store server
    #[arg(
        long,
        env = "VAULT_ADDR",
        default_value = "https://127.0.0.1:8200",
        global = true
    )]
    pub vault_addr: String,

    /// Directory backing the file keystore
    #[arg(long, default_value = "/etc/keywarden/keystore", global = true)]
    pub keystore_dir: Utf8PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the server and store the produced shares
    Init(InitArgs),

    /// Unseal the server from stored shares
    Unseal(UnsealArgs),

    /// Reconcile the server's configuration from a declarative document
    Configure(ConfigureArgs),

    /// Instruct the active node to step down
    StepDown(StepDownArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// How many key shares to produce
    #[arg(long, default_value_t = 5)]
    pub secret_shares: u32,

    /// How many shares are needed to unseal
    #[arg(long, default_value_t = 3)]
    pub secret_threshold: u32,

    /// Exchange the server-issued root token for this one
    #[arg(long)]
    pub init_root_token: Option<String>,

    /// Store the effective root token in the keystore
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    pub store_root_token: bool,

    /// Round-trip the keystore before initializing
    #[arg(long)]
    pub preflight_checks: bool,
}

#[derive(Args, Debug)]
pub struct UnsealArgs {
    /// Initialize the server first if needed
    #[arg(long)]
    pub init: bool,

    #[command(flatten)]
    pub init_args: InitArgs,
}

#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Path to the configuration document (default: vault-config.yml)
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,
}

#[derive(Args, Debug)]
pub struct StepDownArgs {
    /// Address of the active node (default: --vault-addr)
    #[arg(long)]
    pub address: Option<String>,
}
