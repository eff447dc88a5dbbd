//! Static registry of migratable entity kinds.
//!
//! The catalog is a pure lookup table: per kind it knows the artifact
//! directory, the serialization shape, whether an environment is required,
//! and which kinds must be migrated first. There is no dynamic behavior.

use crate::error::{EngineError, EngineResult};
use apimigrate_client::client::BundleCollection;
use std::str::FromStr;

/// The closed set of entity kinds the engine can migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Product,
    App,
    DeveloperApp,
    Proxy,
    SharedFlow,
    Kvm,
    EncryptedKvm,
    TargetServer,
    Keystore,
    Certificate,
}

/// How a kind's artifact is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactShape {
    /// One JSON document per entity.
    JsonDocument,
    /// A binary bundle resolved from the deployed revision.
    BundleRevision,
    /// Raw bytes (PEM certificates).
    BinaryBlob,
}

impl EntityKind {
    /// All kinds in fixed topological order: every kind appears after its
    /// dependencies.
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Product,
        EntityKind::App,
        EntityKind::DeveloperApp,
        EntityKind::Proxy,
        EntityKind::SharedFlow,
        EntityKind::Kvm,
        EntityKind::EncryptedKvm,
        EntityKind::TargetServer,
        EntityKind::Keystore,
        EntityKind::Certificate,
    ];

    /// Wire name used on the CLI and in logs.
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::App => "app",
            EntityKind::DeveloperApp => "developerApp",
            EntityKind::Proxy => "proxy",
            EntityKind::SharedFlow => "sharedFlow",
            EntityKind::Kvm => "kvm",
            EntityKind::EncryptedKvm => "encryptedKvm",
            EntityKind::TargetServer => "targetServer",
            EntityKind::Keystore => "keystore",
            EntityKind::Certificate => "certificate",
        }
    }

    /// Subdirectory of the staging root holding this kind's artifacts.
    #[must_use]
    pub fn directory(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::App => "apps",
            EntityKind::DeveloperApp => "developerapps",
            EntityKind::Proxy => "proxies",
            EntityKind::SharedFlow => "sharedflows",
            EntityKind::Kvm => "kvms",
            EntityKind::EncryptedKvm => "encrypted_kvms",
            EntityKind::TargetServer => "targetservers",
            EntityKind::Keystore => "keystores",
            EntityKind::Certificate => "certificates",
        }
    }

    /// Whether operations on this kind need a target environment.
    ///
    /// Key-value maps, target servers, keystores and certificates are
    /// environment-scoped resources. Proxies and shared flows are
    /// organization-scoped, but their deployment state is per environment,
    /// so migrating them needs an environment too.
    #[must_use]
    pub fn requires_environment(&self) -> bool {
        !matches!(
            self,
            EntityKind::Product | EntityKind::App | EntityKind::DeveloperApp
        )
    }

    /// Serialization shape of this kind's artifacts.
    #[must_use]
    pub fn shape(&self) -> ArtifactShape {
        match self {
            EntityKind::Proxy | EntityKind::SharedFlow => ArtifactShape::BundleRevision,
            EntityKind::Certificate => ArtifactShape::BinaryBlob,
            _ => ArtifactShape::JsonDocument,
        }
    }

    /// Kinds that must be migrated before this one.
    #[must_use]
    pub fn dependencies(&self) -> &'static [EntityKind] {
        match self {
            EntityKind::App => &[EntityKind::Product],
            EntityKind::DeveloperApp => &[EntityKind::App],
            EntityKind::Certificate => &[EntityKind::Keystore],
            _ => &[],
        }
    }

    /// The bundle collection for deployable kinds.
    #[must_use]
    pub fn bundle_collection(&self) -> Option<BundleCollection> {
        match self {
            EntityKind::Proxy => Some(BundleCollection::Proxies),
            EntityKind::SharedFlow => Some(BundleCollection::SharedFlows),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for EntityKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|kind| {
                kind.wire_name().eq_ignore_ascii_case(&lowered) || kind.directory() == lowered
            })
            .ok_or_else(|| EngineError::UnknownKind(s.to_string()))
    }
}

/// CLI entity filter: one kind, or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSelector {
    All,
    One(EntityKind),
}

impl KindSelector {
    /// The kinds this selector covers, in catalog order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EntityKind> {
        match self {
            KindSelector::All => EntityKind::ALL.to_vec(),
            KindSelector::One(kind) => vec![*kind],
        }
    }
}

impl FromStr for KindSelector {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(KindSelector::All)
        } else {
            Ok(KindSelector::One(s.parse()?))
        }
    }
}

impl std::fmt::Display for KindSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KindSelector::All => f.write_str("all"),
            KindSelector::One(kind) => kind.fmt(f),
        }
    }
}

/// Fail fast when any selected kind needs an environment that was not given.
///
/// This runs before any remote call is made.
pub fn require_environment(kinds: &[EntityKind], env: Option<&str>) -> EngineResult<()> {
    if env.is_some() {
        return Ok(());
    }
    match kinds.iter().find(|k| k.requires_environment()) {
        Some(kind) => Err(EngineError::MissingEnvironment {
            kind: kind.wire_name().to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_respects_dependency_order() {
        for (index, kind) in EntityKind::ALL.iter().enumerate() {
            for dep in kind.dependencies() {
                let dep_index = EntityKind::ALL
                    .iter()
                    .position(|k| k == dep)
                    .expect("dependency must be in ALL");
                assert!(
                    dep_index < index,
                    "{dep} must come before {kind} in catalog order"
                );
            }
        }
    }

    #[test]
    fn test_parse_wire_names_case_insensitive() {
        assert_eq!(
            "developerApp".parse::<EntityKind>().unwrap(),
            EntityKind::DeveloperApp
        );
        assert_eq!(
            "targetserver".parse::<EntityKind>().unwrap(),
            EntityKind::TargetServer
        );
        assert_eq!("KVM".parse::<EntityKind>().unwrap(), EntityKind::Kvm);
    }

    #[test]
    fn test_parse_accepts_directory_names() {
        assert_eq!(
            "sharedflows".parse::<EntityKind>().unwrap(),
            EntityKind::SharedFlow
        );
        assert_eq!(
            "encrypted_kvms".parse::<EntityKind>().unwrap(),
            EntityKind::EncryptedKvm
        );
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let error = "developers".parse::<EntityKind>().unwrap_err();
        assert!(matches!(error, EngineError::UnknownKind(_)));
    }

    #[test]
    fn test_selector_all() {
        let selector: KindSelector = "all".parse().unwrap();
        assert_eq!(selector.kinds().len(), 10);
        assert_eq!(selector.kinds()[0], EntityKind::Product);
    }

    #[test]
    fn test_require_environment_flags_scoped_kinds() {
        let error = require_environment(&[EntityKind::Proxy], None).unwrap_err();
        assert!(matches!(
            error,
            EngineError::MissingEnvironment { kind } if kind == "proxy"
        ));

        require_environment(&[EntityKind::Product], None).unwrap();
        require_environment(&EntityKind::ALL, Some("test")).unwrap();
    }

    #[test]
    fn test_org_scoped_kinds_do_not_need_env() {
        assert!(!EntityKind::Product.requires_environment());
        assert!(!EntityKind::App.requires_environment());
        assert!(!EntityKind::DeveloperApp.requires_environment());
        assert!(EntityKind::Keystore.requires_environment());
        assert!(EntityKind::Proxy.requires_environment());
    }

    #[test]
    fn test_shapes() {
        assert_eq!(EntityKind::Proxy.shape(), ArtifactShape::BundleRevision);
        assert_eq!(EntityKind::Certificate.shape(), ArtifactShape::BinaryBlob);
        assert_eq!(EntityKind::Kvm.shape(), ArtifactShape::JsonDocument);
    }
}
