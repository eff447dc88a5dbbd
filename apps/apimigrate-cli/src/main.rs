//! apimigrate - bulk export/import of API-management configuration
//!
//! Subcommands:
//! - `export` walks the source organization and stages artifacts on disk
//! - `import` reconciles a staging directory against a destination
//! - `kvm-keys` explores key-value map keys in an environment
//! - `purge-developer-apps` deletes every developer app on the destination

use clap::{ArgAction, Parser, Subcommand};

mod commands;
mod config;
mod error;
mod logging;

use error::CliResult;

/// apimigrate - migrate API-management configuration between environments
#[derive(Parser)]
#[command(name = "apimigrate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export entity collections to a staging directory
    Export(commands::export::ExportArgs),

    /// Import a staging directory into a destination organization
    Import(commands::import::ImportArgs),

    /// List key-value map keys in an environment
    KvmKeys(commands::kvm_keys::KvmKeysArgs),

    /// Delete every developer app on the destination
    PurgeDeveloperApps(commands::purge::PurgeArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Export(args) => commands::export::execute(args).await,
        Commands::Import(args) => commands::import::execute(args).await,
        Commands::KvmKeys(args) => commands::kvm_keys::execute(args).await,
        Commands::PurgeDeveloperApps(args) => commands::purge::execute(args).await,
    }
}
