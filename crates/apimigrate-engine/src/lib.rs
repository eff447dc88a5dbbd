//! Dependency-ordered export/import engine for API-management configuration.
//!
//! The engine walks entity kinds in the catalog's topological order. Export
//! serializes each remote collection into the artifact store; import reads
//! the store back and reconciles it against the destination, creating only
//! what is missing. Per-entity failures are logged and contained; only
//! connection-level failures abort a run.

pub mod catalog;
pub mod error;
pub mod export;
pub mod import;
pub mod limit;
pub mod store;
pub mod summary;

pub use catalog::{ArtifactShape, EntityKind, KindSelector};
pub use error::{EngineError, EngineResult};
pub use store::ArtifactStore;
pub use summary::Summary;

use apimigrate_client::{MgmtClient, RetryPolicy};

/// Default number of concurrent entity operations per kind.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Everything a migration run needs, shared by both walkers.
#[derive(Debug, Clone)]
pub struct MigrateContext {
    /// Management API collaborator.
    pub client: MgmtClient,
    /// Staging area for artifacts.
    pub store: ArtifactStore,
    /// Run-wide counters.
    pub summary: Summary,
    /// Backoff policy for operations classified retryable.
    pub retry: RetryPolicy,
    /// Target environment for environment-scoped kinds.
    pub env: Option<String>,
    /// Suppress all remote mutation and artifact writes.
    pub trial: bool,
    /// Per-kind fan-out bound.
    pub concurrency: usize,
}

impl MigrateContext {
    /// The target environment, or the configuration error for `kind`.
    pub fn environment(&self, kind: EntityKind) -> EngineResult<&str> {
        self.env
            .as_deref()
            .ok_or_else(|| EngineError::MissingEnvironment {
                kind: kind.wire_name().to_string(),
            })
    }

    /// Fresh limiter for one kind's fan-out.
    #[must_use]
    pub fn limiter(&self) -> limit::KindLimiter {
        limit::KindLimiter::new(self.concurrency)
    }
}
