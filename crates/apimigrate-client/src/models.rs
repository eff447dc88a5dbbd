//! Wire records for the management API.
//!
//! Each record is typed only for the fields the migration engine inspects;
//! everything else is preserved verbatim in a flattened `extra` map so that
//! an exported record re-imports without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel expiry meaning "never expires".
pub const NEVER_EXPIRES: i64 = -1;

/// A developer or organization app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRecord {
    /// App name, unique per owner.
    pub name: String,

    /// Platform-assigned identifier, present on exported snapshots.
    #[serde(rename = "appId", default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Consumer credentials attached to the app.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<Credential>,

    /// All remaining fields, round-tripped untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A consumer key/secret pair with its product grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub consumer_key: String,

    #[serde(default)]
    pub consumer_secret: String,

    /// Products this credential is approved for. The placeholder credential
    /// the platform mints on app creation has none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_products: Vec<ProductGrant>,

    /// Expiry as epoch milliseconds, or [`NEVER_EXPIRES`].
    #[serde(default = "never_expires")]
    pub expires_at: i64,

    #[serde(default = "default_credential_status")]
    pub status: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn never_expires() -> i64 {
    NEVER_EXPIRES
}

fn default_credential_status() -> String {
    "approved".to_string()
}

impl Credential {
    /// Whether this credential should be recreated on the destination at
    /// import time `now_ms` (epoch milliseconds): not revoked, and either
    /// never expiring or expiring in the future.
    #[must_use]
    pub fn is_active_at(&self, now_ms: i64) -> bool {
        self.status != "revoked" && (self.expires_at == NEVER_EXPIRES || now_ms < self.expires_at)
    }

    /// Whether this looks like the placeholder credential the platform
    /// creates automatically on app creation (no product grants).
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.api_products.is_empty()
    }

    /// Remaining lifetime in whole seconds at `now_ms`, or
    /// [`NEVER_EXPIRES`] for non-expiring credentials.
    #[must_use]
    pub fn expires_in_seconds(&self, now_ms: i64) -> i64 {
        if self.expires_at == NEVER_EXPIRES {
            NEVER_EXPIRES
        } else {
            (self.expires_at - now_ms) / 1000
        }
    }
}

/// A single product grant inside a credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGrant {
    pub apiproduct: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request body for creating a credential on an imported app.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredential {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub api_products: Vec<String>,
    pub expires_in_seconds: i64,
}

/// An API product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A key-value map with its entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvmRecord {
    pub name: String,

    #[serde(default)]
    pub encrypted: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<KvmEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a key-value map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvmEntry {
    pub name: String,
    pub value: String,
}

/// A target server definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetServerRecord {
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A keystore with its certificate and alias inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreRecord {
    pub name: String,

    /// Certificate names stored in the keystore.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certs: Vec<String>,

    /// Aliases binding a name to a certificate and optional private key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<AliasRef>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An alias inside a keystore record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasRef {
    pub alias_name: String,

    /// Name of the certificate artifact this alias references.
    pub cert: String,

    /// Name of the private-key artifact, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Per-environment deployment state of a bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentStatus {
    #[serde(default)]
    pub environment: Vec<EnvironmentDeployment>,
}

/// Deployment state of one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentDeployment {
    pub name: String,

    #[serde(default)]
    pub revision: Vec<RevisionState>,
}

/// One revision's lifecycle state within an environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionState {
    pub name: String,
    pub state: String,
}

impl DeploymentStatus {
    /// The revision currently deployed in `env`, or `None` when nothing is.
    ///
    /// The platform reports at most one deployed revision today; if it ever
    /// reports several, the first listed wins. This is a deliberate policy,
    /// not an oversight.
    #[must_use]
    pub fn deployed_revision_in(&self, env: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|e| e.name == env)?
            .revision
            .iter()
            .find(|r| r.state == "deployed")
            .map(|r| r.name.as_str())
    }
}

/// Result of importing a bundle: the revision the platform assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleImportResult {
    pub name: String,

    #[serde(default)]
    pub revision: Option<String>,
}

/// A bundle's revision inventory, used to resolve the latest revision when
/// re-deploying an already-present bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleRecord {
    pub name: String,

    #[serde(default)]
    pub revision: Vec<String>,
}

impl BundleRecord {
    /// Highest revision by numeric ordinal (revisions are decimal strings).
    #[must_use]
    pub fn latest_revision(&self) -> Option<&str> {
        self.revision
            .iter()
            .max_by_key(|r| r.parse::<u64>().unwrap_or(0))
            .map(String::as_str)
    }
}
