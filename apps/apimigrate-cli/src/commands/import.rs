//! `apimigrate import` - reconcile a staging directory against a
//! destination organization.

use crate::config::ConnectionArgs;
use crate::error::{CliError, CliResult};
use apimigrate_client::RetryPolicy;
use apimigrate_engine::{catalog, import, ArtifactStore, KindSelector, MigrateContext, Summary};
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Directory holding a previous export
    #[arg(short = 'D', long)]
    pub destination: PathBuf,

    /// Entity kind to import, or "all"
    #[arg(short = 'E', long, default_value = "all")]
    pub entity: String,

    /// Target environment, required for environment-scoped kinds
    #[arg(short, long)]
    pub env: Option<String>,

    /// List and log only; perform no remote mutation
    #[arg(short, long)]
    pub trial: bool,

    /// Maximum concurrent operations per entity kind
    #[arg(long, default_value_t = apimigrate_engine::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

pub async fn execute(args: ImportArgs) -> CliResult<()> {
    let selector: KindSelector = args
        .entity
        .parse()
        .map_err(|e: apimigrate_engine::EngineError| CliError::Config(e.to_string()))?;
    catalog::require_environment(&selector.kinds(), args.env.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;

    let client = args.connection.connect().await?;
    let ctx = MigrateContext {
        client,
        store: ArtifactStore::new(&args.destination, args.trial),
        summary: Summary::new(),
        retry: RetryPolicy::default(),
        env: args.env,
        trial: args.trial,
        concurrency: args.concurrency,
    };

    import::run(&ctx, &selector).await?;

    println!("{}", ctx.summary.render());
    Ok(())
}
