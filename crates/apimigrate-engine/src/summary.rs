//! Run-wide summary accumulator.
//!
//! Shared by every concurrent entity task; each update is an atomic
//! read-modify-write under the lock, so counts cannot be lost to
//! interleaving at suspension points.

use crate::catalog::EntityKind;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Counters for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    /// Entities found by remote or staged listings.
    pub found: u64,
    /// Artifacts written during export.
    pub exported: u64,
    /// Entities created/imported on the destination.
    pub imported: u64,
}

/// Cheap-to-clone accumulator of per-kind counts.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    inner: Arc<Mutex<BTreeMap<EntityKind, KindCounts>>>,
}

impl Summary {
    /// Create an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, kind: EntityKind, apply: impl FnOnce(&mut KindCounts)) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        apply(map.entry(kind).or_default());
    }

    /// Record `n` entities found for a kind.
    pub fn add_found(&self, kind: EntityKind, n: u64) {
        self.update(kind, |c| c.found += n);
    }

    /// Record `n` artifacts exported for a kind.
    pub fn add_exported(&self, kind: EntityKind, n: u64) {
        self.update(kind, |c| c.exported += n);
    }

    /// Record `n` entities imported for a kind.
    pub fn add_imported(&self, kind: EntityKind, n: u64) {
        self.update(kind, |c| c.imported += n);
    }

    /// Current counts, snapshot under the lock.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<EntityKind, KindCounts> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Render the summary as one line per kind.
    #[must_use]
    pub fn render(&self) -> String {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return "nothing to report".to_string();
        }
        snapshot
            .iter()
            .map(|(kind, c)| {
                format!(
                    "{}: found={} exported={} imported={}",
                    kind.wire_name(),
                    c.found,
                    c.exported,
                    c.imported
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
