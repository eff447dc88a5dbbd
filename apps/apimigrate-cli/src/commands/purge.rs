//! `apimigrate purge-developer-apps` - delete every developer app on the
//! destination organization.
//!
//! Used to reset a destination before re-importing. Destructive, so it
//! refuses to run without `--yes`.

use crate::config::ConnectionArgs;
use crate::error::{CliError, CliResult};
use tracing::{info, warn};

#[derive(Debug, clap::Args)]
pub struct PurgeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Confirm deletion of every developer app
    #[arg(long)]
    pub yes: bool,
}

pub async fn execute(args: PurgeArgs) -> CliResult<()> {
    if !args.yes {
        return Err(CliError::Validation(
            "this deletes every developer app in the organization; pass --yes to confirm".into(),
        ));
    }

    let client = args.connection.connect().await?;
    let developers = client.list_developers().await?;

    let mut deleted: u64 = 0;
    for developer in &developers {
        let apps = match client.list_developer_apps(developer).await {
            Ok(apps) => apps,
            Err(error) => {
                warn!(developer = %developer, error = %error, "listing apps failed");
                continue;
            }
        };
        for app in apps {
            match client.delete_developer_app(developer, &app).await {
                Ok(()) => {
                    info!(developer = %developer, app = %app, "deleted");
                    deleted += 1;
                }
                Err(error) => {
                    warn!(developer = %developer, app = %app, error = %error, "delete failed");
                }
            }
        }
    }

    println!("deleted {deleted} developer app(s)");
    Ok(())
}
