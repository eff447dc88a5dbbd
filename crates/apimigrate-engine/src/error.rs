//! Engine error types.

use apimigrate_client::ClientError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the migration engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An environment-scoped kind was selected without `--env`.
    #[error("an environment is required for {kind} operations")]
    MissingEnvironment { kind: String },

    /// The entity filter did not name a known kind.
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    /// Import was requested for a kind with no staged artifacts.
    #[error("nothing staged for {kind}: {} does not exist", path.display())]
    NothingStaged { kind: String, path: PathBuf },

    /// Filesystem failure in the artifact store.
    #[error("artifact I/O failed at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A staged artifact could not be parsed.
    #[error("malformed artifact {}", path.display())]
    MalformedArtifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The destination has no developer to attach staged apps to.
    #[error("no developer exists on the destination organization")]
    NoDestinationDeveloper,

    /// An alias references a keystore the destination does not have.
    #[error("keystore {0} does not exist on the destination")]
    KeystoreMissing(String),

    /// The per-kind concurrency limiter was closed.
    #[error("concurrency limiter closed")]
    LimiterClosed,

    /// A management API call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}
