//! `apimigrate kvm-keys` - explore key-value map keys in an environment.

use crate::config::ConnectionArgs;
use crate::error::{CliError, CliResult};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, clap::Args)]
pub struct KvmKeysArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Environment to inspect
    #[arg(short, long)]
    pub env: String,

    /// Only maps whose name matches this regex
    #[arg(long)]
    pub map_filter: Option<String>,

    /// Only keys matching this regex
    #[arg(long)]
    pub key_filter: Option<String>,
}

pub async fn execute(args: KvmKeysArgs) -> CliResult<()> {
    let map_filter = compile(args.map_filter.as_deref())?;
    let key_filter = compile(args.key_filter.as_deref())?;

    let client = args.connection.connect().await?;
    let maps = client.list_kvms(&args.env).await?;

    let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for map in maps {
        if let Some(re) = &map_filter {
            if !re.is_match(&map) {
                continue;
            }
        }
        let keys = match client.list_kvm_keys(&args.env, &map).await {
            Ok(keys) => keys,
            Err(error) => {
                warn!(map = %map, error = %error, "listing keys failed");
                continue;
            }
        };
        let keys: Vec<String> = keys
            .into_iter()
            .filter(|k| key_filter.as_ref().map_or(true, |re| re.is_match(k)))
            .collect();
        if !keys.is_empty() {
            result.insert(map, keys);
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::Validation(format!("failed to render result: {e}")))?
    );
    Ok(())
}

fn compile(pattern: Option<&str>) -> CliResult<Option<Regex>> {
    pattern
        .map(|p| Regex::new(p).map_err(|e| CliError::Config(format!("invalid regex '{p}': {e}"))))
        .transpose()
}
