//! Export walker: serialize remote entity collections into the artifact
//! store, one kind at a time in catalog order.

use crate::catalog::{EntityKind, KindSelector};
use crate::error::EngineResult;
use crate::limit::fan_out;
use crate::MigrateContext;
use apimigrate_client::client::BundleCollection;
use apimigrate_client::models::DeploymentStatus;
use tracing::{info, warn};

/// Run the export walker for every selected kind.
///
/// A kind whose listing fails is skipped with a warning; sibling kinds
/// still run. Only errors the caller can do nothing about (none today)
/// would propagate.
pub async fn run(ctx: &MigrateContext, selector: &KindSelector) -> EngineResult<()> {
    for kind in plan(selector) {
        info!(kind = %kind, "exporting");
        if let Err(error) = export_kind(ctx, kind).await {
            warn!(kind = %kind, error = %error, "kind export failed; continuing with remaining kinds");
        }
    }
    Ok(())
}

/// Kinds to walk for a selector.
///
/// With `all`, encrypted maps and certificates ride along with the kvm and
/// keystore walkers, so their standalone passes are dropped to avoid
/// walking the same listings twice.
fn plan(selector: &KindSelector) -> Vec<EntityKind> {
    match selector {
        KindSelector::All => EntityKind::ALL
            .into_iter()
            .filter(|k| !matches!(k, EntityKind::EncryptedKvm | EntityKind::Certificate))
            .collect(),
        KindSelector::One(kind) => vec![*kind],
    }
}

async fn export_kind(ctx: &MigrateContext, kind: EntityKind) -> EngineResult<()> {
    match kind {
        EntityKind::Product => export_products(ctx).await,
        EntityKind::App => export_apps(ctx).await,
        EntityKind::DeveloperApp => export_developer_apps(ctx).await,
        EntityKind::Proxy | EntityKind::SharedFlow => export_bundles(ctx, kind).await,
        EntityKind::Kvm => export_kvms(ctx, false).await,
        EntityKind::EncryptedKvm => export_kvms(ctx, true).await,
        EntityKind::TargetServer => export_targetservers(ctx).await,
        EntityKind::Keystore => export_keystores(ctx, true).await,
        EntityKind::Certificate => export_keystores(ctx, false).await,
    }
}

async fn export_products(ctx: &MigrateContext) -> EngineResult<()> {
    let names = ctx.client.list_products().await?;
    ctx.summary.add_found(EntityKind::Product, names.len() as u64);
    info!(count = names.len(), "found API products");

    let limiter = ctx.limiter();
    fan_out(&limiter, EntityKind::Product, names, |name| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        async move {
            let record = client.get_product(&name).await?;
            store.write_json(EntityKind::Product, &name, &record).await?;
            summary.add_exported(EntityKind::Product, 1);
            Ok(())
        }
    })
    .await;
    Ok(())
}

async fn export_apps(ctx: &MigrateContext) -> EngineResult<()> {
    let ids = ctx.client.list_apps().await?;
    ctx.summary.add_found(EntityKind::App, ids.len() as u64);
    info!(count = ids.len(), "found apps");

    let limiter = ctx.limiter();
    fan_out(&limiter, EntityKind::App, ids, |app_id| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        async move {
            let record = client.get_app(&app_id).await?;
            store.write_json(EntityKind::App, &app_id, &record).await?;
            summary.add_exported(EntityKind::App, 1);
            Ok(())
        }
    })
    .await;
    Ok(())
}

async fn export_developer_apps(ctx: &MigrateContext) -> EngineResult<()> {
    let developers = ctx.client.list_developers().await?;
    let limiter = ctx.limiter();

    for email in developers {
        let names = match ctx.client.list_developer_apps(&email).await {
            Ok(names) => names,
            Err(error) => {
                warn!(developer = %email, error = %error, "listing developer apps failed");
                continue;
            }
        };
        ctx.summary
            .add_found(EntityKind::DeveloperApp, names.len() as u64);

        fan_out(&limiter, EntityKind::DeveloperApp, names, |name| {
            let client = ctx.client.clone();
            let store = ctx.store.clone();
            let summary = ctx.summary.clone();
            let email = email.clone();
            async move {
                let record = client.get_developer_app(&email, &name).await?;
                store
                    .write_json(EntityKind::DeveloperApp, &record.name, &record)
                    .await?;
                summary.add_exported(EntityKind::DeveloperApp, 1);
                Ok(())
            }
        })
        .await;
    }
    Ok(())
}

async fn export_bundles(ctx: &MigrateContext, kind: EntityKind) -> EngineResult<()> {
    let collection = match kind.bundle_collection() {
        Some(collection) => collection,
        None => return Ok(()),
    };
    let env = ctx.environment(kind)?.to_string();
    let names = ctx.client.list_bundles(collection).await?;
    ctx.summary.add_found(kind, names.len() as u64);
    info!(kind = %kind, count = names.len(), "found bundles");

    let limiter = ctx.limiter();
    fan_out(&limiter, kind, names, |name| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let env = env.clone();
        async move {
            let deployments = find_deployments(&client, collection, &name).await;
            let Some(revision) = deployments.deployed_revision_in(&env) else {
                info!(kind = %kind, name = %name, env = %env, "no deployed revision; skipping");
                return Ok(());
            };
            let bytes = client.export_bundle(collection, &name, revision).await?;
            store.write(kind, &format!("{name}.zip"), &bytes).await?;
            summary.add_exported(kind, 1);
            Ok(())
        }
    })
    .await;
    Ok(())
}

/// Deployment lookup treats any failure as "not deployed anywhere".
async fn find_deployments(
    client: &apimigrate_client::MgmtClient,
    collection: BundleCollection,
    name: &str,
) -> DeploymentStatus {
    match client.get_deployments(collection, name).await {
        Ok(status) => status,
        Err(error) => {
            warn!(name = %name, error = %error, "deployment lookup failed; treating as undeployed");
            DeploymentStatus::default()
        }
    }
}

async fn export_kvms(ctx: &MigrateContext, encrypted_only: bool) -> EngineResult<()> {
    let listed_as = if encrypted_only {
        EntityKind::EncryptedKvm
    } else {
        EntityKind::Kvm
    };
    let env = ctx.environment(listed_as)?.to_string();
    let names = ctx.client.list_kvms(&env).await?;
    ctx.summary.add_found(listed_as, names.len() as u64);
    info!(count = names.len(), "found key-value maps");

    let limiter = ctx.limiter();
    fan_out(&limiter, listed_as, names, |name| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let env = env.clone();
        async move {
            let record = client.get_kvm(&env, &name).await?;
            if record.encrypted {
                // Encrypted values are masked by the platform; the artifact
                // still records the map shell and whatever entries came back.
                info!(map = %name, "map is encrypted");
                store
                    .write_json(EntityKind::EncryptedKvm, &name, &record)
                    .await?;
                summary.add_exported(EntityKind::EncryptedKvm, 1);
            } else if !encrypted_only {
                store.write_json(EntityKind::Kvm, &name, &record).await?;
                summary.add_exported(EntityKind::Kvm, 1);
            }
            Ok(())
        }
    })
    .await;
    Ok(())
}

async fn export_targetservers(ctx: &MigrateContext) -> EngineResult<()> {
    let env = ctx.environment(EntityKind::TargetServer)?.to_string();
    let names = ctx.client.list_targetservers(&env).await?;
    ctx.summary
        .add_found(EntityKind::TargetServer, names.len() as u64);
    info!(count = names.len(), "found target servers");

    let limiter = ctx.limiter();
    fan_out(&limiter, EntityKind::TargetServer, names, |name| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let env = env.clone();
        async move {
            let record = client.get_targetserver(&env, &name).await?;
            store
                .write_json(EntityKind::TargetServer, &name, &record)
                .await?;
            summary.add_exported(EntityKind::TargetServer, 1);
            Ok(())
        }
    })
    .await;
    Ok(())
}

/// Walk keystores; `include_docs` also persists the keystore records
/// themselves (false for the certificate-only pass).
async fn export_keystores(ctx: &MigrateContext, include_docs: bool) -> EngineResult<()> {
    let env = ctx.environment(EntityKind::Keystore)?.to_string();
    let names = ctx.client.list_keystores(&env).await?;
    if include_docs {
        ctx.summary.add_found(EntityKind::Keystore, names.len() as u64);
    }
    info!(count = names.len(), "found keystores");

    let limiter = ctx.limiter();
    fan_out(&limiter, EntityKind::Keystore, names, |name| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let retry = ctx.retry.clone();
        let env = env.clone();
        async move {
            let record = client.get_keystore(&env, &name).await?;
            if include_docs {
                store.write_json(EntityKind::Keystore, &name, &record).await?;
                summary.add_exported(EntityKind::Keystore, 1);
            }
            if record.certs.is_empty() {
                return Ok(());
            }

            info!(keystore = %name, count = record.certs.len(), "found certificates");
            summary.add_found(EntityKind::Certificate, record.certs.len() as u64);
            for cert in &record.certs {
                // Certificate export is the operation most prone to
                // transient throttling; it goes through the retry driver.
                let exported = retry
                    .execute("export certificate", || client.export_cert(&env, &name, cert))
                    .await;
                match exported {
                    Ok(pem) => {
                        // The same certificate may back several aliases;
                        // rewriting it is harmless.
                        store
                            .write(EntityKind::Certificate, &format!("{cert}.crt"), pem.as_bytes())
                            .await?;
                        summary.add_exported(EntityKind::Certificate, 1);
                    }
                    Err(error) => {
                        warn!(keystore = %name, certificate = %cert, error = %error, "certificate export failed");
                    }
                }
            }
            Ok(())
        }
    })
    .await;
    Ok(())
}
