//! `apimigrate export` - stage an organization's configuration on disk.

use crate::config::ConnectionArgs;
use crate::error::{CliError, CliResult};
use apimigrate_client::RetryPolicy;
use apimigrate_engine::{catalog, export, ArtifactStore, KindSelector, MigrateContext, Summary};
use chrono::Utc;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, clap::Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Directory to export into; defaults to exported-<timestamp>
    #[arg(short = 'D', long)]
    pub destination: Option<PathBuf>,

    /// Entity kind to export, or "all"
    #[arg(short = 'E', long, default_value = "all")]
    pub entity: String,

    /// Target environment, required for environment-scoped kinds
    #[arg(short, long)]
    pub env: Option<String>,

    /// List and log only; write no artifacts
    #[arg(short, long)]
    pub trial: bool,

    /// Maximum concurrent operations per entity kind
    #[arg(long, default_value_t = apimigrate_engine::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

pub async fn execute(args: ExportArgs) -> CliResult<()> {
    let selector: KindSelector = args
        .entity
        .parse()
        .map_err(|e: apimigrate_engine::EngineError| CliError::Config(e.to_string()))?;
    catalog::require_environment(&selector.kinds(), args.env.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;

    let destination = args.destination.unwrap_or_else(default_destination);
    debug!(
        destination = %destination.display(),
        "limitations: encrypted KVM values are not extracted, keystore private keys are not \
         exported, organization-scoped KVMs are not walked"
    );

    let client = args.connection.connect().await?;
    let ctx = MigrateContext {
        client,
        store: ArtifactStore::new(&destination, args.trial),
        summary: Summary::new(),
        retry: RetryPolicy::default(),
        env: args.env,
        trial: args.trial,
        concurrency: args.concurrency,
    };

    export::run(&ctx, &selector).await?;

    println!("{}", ctx.summary.render());
    Ok(())
}

fn default_destination() -> PathBuf {
    PathBuf::from(format!("exported-{}", Utc::now().format("%Y%m%d-%H%M%S")))
}
