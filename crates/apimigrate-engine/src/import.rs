//! Import reconciler: read staged artifacts and create whatever the
//! destination is missing, kind by kind in catalog order.
//!
//! Reconciliation is idempotent: every kind first builds a membership set
//! from the destination's own listing, then only acts on staged entities
//! absent from it. Re-running after a partial failure therefore never
//! duplicates work.

use crate::catalog::{EntityKind, KindSelector};
use crate::error::{EngineError, EngineResult};
use crate::limit::fan_out;
use crate::store::artifact_stem;
use crate::MigrateContext;
use apimigrate_client::models::{
    AppRecord, KeystoreRecord, KvmRecord, NewCredential, ProductRecord, TargetServerRecord,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Run the import reconciler for every selected kind.
pub async fn run(ctx: &MigrateContext, selector: &KindSelector) -> EngineResult<()> {
    for kind in plan(selector) {
        info!(kind = %kind, "importing");
        if let Err(error) = import_kind(ctx, kind).await {
            warn!(kind = %kind, error = %error, "kind import failed; continuing with remaining kinds");
        }
    }
    Ok(())
}

/// Kinds to reconcile for a selector.
///
/// With `all`, the certificate pass is covered by the keystore reconciler
/// (which imports aliases), so its standalone pass is dropped. Encrypted
/// maps keep their own pass: they live in a separate staging directory.
fn plan(selector: &KindSelector) -> Vec<EntityKind> {
    match selector {
        KindSelector::All => EntityKind::ALL
            .into_iter()
            .filter(|k| !matches!(k, EntityKind::Certificate))
            .collect(),
        KindSelector::One(kind) => vec![*kind],
    }
}

async fn import_kind(ctx: &MigrateContext, kind: EntityKind) -> EngineResult<()> {
    match kind {
        EntityKind::Product => import_products(ctx).await,
        EntityKind::App => {
            // Org-level app snapshots are reference-only: the platform only
            // creates apps through a developer, so the developerApp pass is
            // what reconciles them.
            info!("app snapshots are not imported directly; covered by developerApp");
            Ok(())
        }
        EntityKind::DeveloperApp => import_developer_apps(ctx).await,
        EntityKind::Proxy | EntityKind::SharedFlow => import_bundles(ctx, kind).await,
        EntityKind::Kvm => import_kvms(ctx, EntityKind::Kvm).await,
        EntityKind::EncryptedKvm => import_kvms(ctx, EntityKind::EncryptedKvm).await,
        EntityKind::TargetServer => import_targetservers(ctx).await,
        EntityKind::Keystore => import_keystores(ctx, true).await,
        EntityKind::Certificate => import_keystores(ctx, false).await,
    }
}

async fn import_products(ctx: &MigrateContext) -> EngineResult<()> {
    let files = ctx.store.list(EntityKind::Product).await?;
    ctx.summary.add_found(EntityKind::Product, files.len() as u64);
    let existing: Arc<HashSet<String>> =
        Arc::new(ctx.client.list_products().await?.into_iter().collect());

    let limiter = ctx.limiter();
    fan_out(&limiter, EntityKind::Product, files, |filename| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let existing = existing.clone();
        let trial = ctx.trial;
        async move {
            let record: ProductRecord = store.read_json(EntityKind::Product, &filename).await?;
            if existing.contains(&record.name) {
                info!(product = %record.name, "already exists; skipping");
                return Ok(());
            }
            if trial {
                info!(product = %record.name, "trial: would create product");
                return Ok(());
            }
            client.create_product(&record).await?;
            summary.add_imported(EntityKind::Product, 1);
            Ok(())
        }
    })
    .await;
    Ok(())
}

async fn import_developer_apps(ctx: &MigrateContext) -> EngineResult<()> {
    let files = ctx.store.list(EntityKind::DeveloperApp).await?;
    ctx.summary
        .add_found(EntityKind::DeveloperApp, files.len() as u64);

    let developers = ctx.client.list_developers().await?;
    // The platform assigns developer ids itself, so staged apps cannot be
    // re-attached to their original owner. Every import goes to the first
    // developer the destination lists.
    let Some(email) = developers.first().cloned() else {
        return Err(EngineError::NoDestinationDeveloper);
    };
    info!(developer = %email, "attaching imported apps to destination developer");

    let mut membership: HashSet<String> = HashSet::new();
    for developer in &developers {
        membership.extend(ctx.client.list_developer_apps(developer).await?);
    }
    let existing = Arc::new(membership);
    let now_ms = Utc::now().timestamp_millis();

    let limiter = ctx.limiter();
    fan_out(&limiter, EntityKind::DeveloperApp, files, |filename| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let existing = existing.clone();
        let email = email.clone();
        let trial = ctx.trial;
        async move {
            let record: AppRecord = store.read_json(EntityKind::DeveloperApp, &filename).await?;
            if existing.contains(&record.name) {
                info!(app = %record.name, "already exists; skipping");
                return Ok(());
            }
            if trial {
                info!(app = %record.name, "trial: would import app and credentials");
                return Ok(());
            }

            // Creation mints a placeholder credential with no product
            // grants; it is removed once the real credentials are attached.
            let created = client.create_developer_app(&email, &record).await?;

            for credential in record.credentials.iter().filter(|c| c.is_active_at(now_ms)) {
                let request = NewCredential {
                    consumer_key: credential.consumer_key.clone(),
                    consumer_secret: credential.consumer_secret.clone(),
                    api_products: credential
                        .api_products
                        .iter()
                        .map(|grant| grant.apiproduct.clone())
                        .collect(),
                    expires_in_seconds: credential.expires_in_seconds(now_ms),
                };
                if let Err(error) = client.add_credential(&email, &record.name, &request).await {
                    warn!(app = %record.name, key = %credential.consumer_key, error = %error, "credential import failed");
                }
            }

            match created.credentials.iter().find(|c| c.is_placeholder()) {
                Some(placeholder) => {
                    if let Err(error) = client
                        .delete_credential(&email, &record.name, &placeholder.consumer_key)
                        .await
                    {
                        warn!(app = %record.name, error = %error, "placeholder credential removal failed");
                    }
                }
                None => {
                    warn!(app = %record.name, "no placeholder credential reported on creation");
                }
            }

            summary.add_imported(EntityKind::DeveloperApp, 1);
            Ok(())
        }
    })
    .await;
    Ok(())
}

async fn import_bundles(ctx: &MigrateContext, kind: EntityKind) -> EngineResult<()> {
    let collection = match kind.bundle_collection() {
        Some(collection) => collection,
        None => return Ok(()),
    };
    let files = ctx.store.list(kind).await?;
    ctx.summary.add_found(kind, files.len() as u64);
    let env = ctx.environment(kind)?.to_string();
    let existing: Arc<HashSet<String>> =
        Arc::new(ctx.client.list_bundles(collection).await?.into_iter().collect());

    let limiter = ctx.limiter();
    fan_out(&limiter, kind, files, |filename| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let existing = existing.clone();
        let env = env.clone();
        let trial = ctx.trial;
        async move {
            let name = artifact_stem(&filename).to_string();
            if trial {
                info!(kind = %kind, name = %name, "trial: would import and deploy");
                return Ok(());
            }

            // Import is idempotent but deployment state may differ, so an
            // already-present bundle is still deployed.
            let revision = if existing.contains(&name) {
                info!(kind = %kind, name = %name, "already exists; deploying only");
                let bundle = client.get_bundle(collection, &name).await?;
                match bundle.latest_revision() {
                    Some(revision) => revision.to_string(),
                    None => {
                        warn!(kind = %kind, name = %name, "no revisions on destination; nothing to deploy");
                        return Ok(());
                    }
                }
            } else {
                let bytes = store.read_raw(kind, &filename).await?;
                let imported = client.import_bundle(collection, &name, bytes).await?;
                summary.add_imported(kind, 1);
                match imported.revision {
                    Some(revision) => revision,
                    None => {
                        warn!(kind = %kind, name = %name, "import reported no revision; skipping deployment");
                        return Ok(());
                    }
                }
            };
            client.deploy(collection, &name, &env, &revision).await?;
            Ok(())
        }
    })
    .await;
    Ok(())
}

async fn import_kvms(ctx: &MigrateContext, kind: EntityKind) -> EngineResult<()> {
    let files = ctx.store.list(kind).await?;
    ctx.summary.add_found(kind, files.len() as u64);
    let env = ctx.environment(kind)?.to_string();
    let existing: Arc<HashSet<String>> =
        Arc::new(ctx.client.list_kvms(&env).await?.into_iter().collect());

    let limiter = ctx.limiter();
    fan_out(&limiter, kind, files, |filename| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let existing = existing.clone();
        let env = env.clone();
        let trial = ctx.trial;
        async move {
            let record: KvmRecord = store.read_json(kind, &filename).await?;
            let encrypted = record.encrypted || kind == EntityKind::EncryptedKvm;

            if trial {
                info!(map = %record.name, entries = record.entry.len(), "trial: would reconcile map");
                return Ok(());
            }

            if existing.contains(&record.name) {
                info!(map = %record.name, "already exists");
            } else {
                client.create_kvm(&env, &record.name, encrypted).await?;
                summary.add_imported(kind, 1);
            }

            // The staged export is the source of truth: entries are written
            // unconditionally, replacing whatever the destination holds.
            for entry in &record.entry {
                if let Err(error) = client
                    .upsert_kvm_entry(&env, &record.name, &entry.name, &entry.value)
                    .await
                {
                    warn!(map = %record.name, key = %entry.name, error = %error, "entry upsert failed");
                }
            }
            Ok(())
        }
    })
    .await;
    Ok(())
}

async fn import_targetservers(ctx: &MigrateContext) -> EngineResult<()> {
    let files = ctx.store.list(EntityKind::TargetServer).await?;
    ctx.summary
        .add_found(EntityKind::TargetServer, files.len() as u64);
    let env = ctx.environment(EntityKind::TargetServer)?.to_string();
    let existing: Arc<HashSet<String>> =
        Arc::new(ctx.client.list_targetservers(&env).await?.into_iter().collect());

    let limiter = ctx.limiter();
    fan_out(&limiter, EntityKind::TargetServer, files, |filename| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let existing = existing.clone();
        let env = env.clone();
        let trial = ctx.trial;
        async move {
            let record: TargetServerRecord =
                store.read_json(EntityKind::TargetServer, &filename).await?;
            if existing.contains(&record.name) {
                info!(targetserver = %record.name, "already exists; skipping");
                return Ok(());
            }
            if trial {
                info!(targetserver = %record.name, "trial: would create target server");
                return Ok(());
            }
            client.create_targetserver(&env, &record).await?;
            summary.add_imported(EntityKind::TargetServer, 1);
            Ok(())
        }
    })
    .await;
    Ok(())
}

/// Reconcile keystores; `create_shell` also creates missing keystores
/// (false for the certificate-only pass, which needs them to exist).
async fn import_keystores(ctx: &MigrateContext, create_shell: bool) -> EngineResult<()> {
    let files = ctx.store.list(EntityKind::Keystore).await?;
    if create_shell {
        ctx.summary.add_found(EntityKind::Keystore, files.len() as u64);
    }
    let env = ctx.environment(EntityKind::Keystore)?.to_string();
    let existing: Arc<HashSet<String>> =
        Arc::new(ctx.client.list_keystores(&env).await?.into_iter().collect());

    let limiter = ctx.limiter();
    fan_out(&limiter, EntityKind::Keystore, files, |filename| {
        let client = ctx.client.clone();
        let store = ctx.store.clone();
        let summary = ctx.summary.clone();
        let existing = existing.clone();
        let retry = ctx.retry.clone();
        let env = env.clone();
        let trial = ctx.trial;
        async move {
            let record: KeystoreRecord = store.read_json(EntityKind::Keystore, &filename).await?;

            if trial {
                info!(keystore = %record.name, aliases = record.aliases.len(), "trial: would reconcile keystore");
                return Ok(());
            }

            if !existing.contains(&record.name) {
                if create_shell {
                    client.create_keystore(&env, &record.name).await?;
                    summary.add_imported(EntityKind::Keystore, 1);
                } else {
                    return Err(EngineError::KeystoreMissing(record.name));
                }
            } else {
                info!(keystore = %record.name, "already exists");
            }

            if record.aliases.is_empty() {
                return Ok(());
            }

            let present: HashSet<String> = client
                .get_aliases(&env, &record.name)
                .await?
                .into_iter()
                .collect();

            for alias in &record.aliases {
                if present.contains(&alias.alias_name) {
                    info!(keystore = %record.name, alias = %alias.alias_name, "alias already exists");
                    continue;
                }

                // Both referenced artifacts must be staged; absence fails
                // this alias only.
                let cert_file = format!("{}.crt", alias.cert);
                let cert_pem = match store.read_raw(EntityKind::Certificate, &cert_file).await {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(error) => {
                        warn!(keystore = %record.name, alias = %alias.alias_name, artifact = %cert_file, error = %error, "certificate artifact missing; alias skipped");
                        continue;
                    }
                };
                let key_pem = match &alias.key {
                    Some(key) => {
                        let key_file = format!("{key}.key");
                        match store.read_raw(EntityKind::Certificate, &key_file).await {
                            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                            Err(error) => {
                                warn!(keystore = %record.name, alias = %alias.alias_name, artifact = %key_file, error = %error, "key artifact missing; alias skipped");
                                continue;
                            }
                        }
                    }
                    None => None,
                };

                // Alias import shares the certificate retry budget.
                let imported = retry
                    .execute("import alias", || {
                        client.import_alias(
                            &env,
                            &record.name,
                            &alias.alias_name,
                            &cert_pem,
                            key_pem.as_deref(),
                        )
                    })
                    .await;
                match imported {
                    Ok(()) => summary.add_imported(EntityKind::Certificate, 1),
                    Err(error) => {
                        warn!(keystore = %record.name, alias = %alias.alias_name, error = %error, "alias import failed");
                    }
                }
            }
            Ok(())
        }
    })
    .await;
    Ok(())
}
