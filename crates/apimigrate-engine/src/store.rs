//! Directory-per-kind artifact store.
//!
//! Layout: `<root>/<kind-directory>/<artifact>`. Writes are atomic per
//! artifact (temp sibling + rename) and create the kind directory on first
//! use. Listing order is filesystem-dependent; callers must treat each
//! artifact independently.

use crate::catalog::EntityKind;
use crate::error::{EngineError, EngineResult};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix used for in-flight writes, never visible in listings.
const TMP_SUFFIX: &str = ".tmp";

/// Staging area for exported artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    /// Trial mode: log what would be written instead of writing.
    trial: bool,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. Nothing is created until the first
    /// write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, trial: bool) -> Self {
        Self {
            root: root.into(),
            trial,
        }
    }

    /// The staging root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.directory())
    }

    fn io_error(path: PathBuf) -> impl FnOnce(std::io::Error) -> EngineError {
        move |source| EngineError::Io { path, source }
    }

    /// Persist an artifact, replacing any previous artifact with the same
    /// name. This is the single choke point trial mode bypasses.
    pub async fn write(
        &self,
        kind: EntityKind,
        filename: &str,
        bytes: &[u8],
    ) -> EngineResult<PathBuf> {
        let path = self.kind_dir(kind).join(filename);
        if self.trial {
            info!(kind = %kind, artifact = %path.display(), "trial: would write artifact");
            return Ok(path);
        }

        let dir = self.kind_dir(kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(Self::io_error(dir))?;

        let tmp = path.with_file_name(format!("{filename}{TMP_SUFFIX}"));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(Self::io_error(tmp.clone()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(Self::io_error(path.clone()))?;

        debug!(kind = %kind, artifact = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(path)
    }

    /// Serialize a record to `<name>.json` under the kind directory.
    pub async fn write_json<T: Serialize>(
        &self,
        kind: EntityKind,
        name: &str,
        record: &T,
    ) -> EngineResult<PathBuf> {
        let body = serde_json::to_vec_pretty(record).map_err(|source| {
            EngineError::MalformedArtifact {
                path: self.kind_dir(kind).join(format!("{name}.json")),
                source,
            }
        })?;
        self.write(kind, &format!("{name}.json"), &body).await
    }

    /// List artifact filenames staged for a kind.
    ///
    /// A missing kind directory means nothing was staged, which is an error
    /// for import of that kind (the caller skips the kind, not the run).
    pub async fn list(&self, kind: EntityKind) -> EngineResult<Vec<String>> {
        let dir = self.kind_dir(kind);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::NothingStaged {
                    kind: kind.wire_name().to_string(),
                    path: dir,
                });
            }
            Err(source) => return Err(EngineError::Io { path: dir, source }),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(Self::io_error(dir.clone()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(TMP_SUFFIX) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read and parse a staged JSON artifact.
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        filename: &str,
    ) -> EngineResult<T> {
        let path = self.kind_dir(kind).join(filename);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(Self::io_error(path.clone()))?;
        serde_json::from_slice(&bytes).map_err(|source| EngineError::MalformedArtifact {
            path,
            source,
        })
    }

    /// Read a staged artifact as raw bytes.
    pub async fn read_raw(&self, kind: EntityKind, filename: &str) -> EngineResult<Vec<u8>> {
        let path = self.kind_dir(kind).join(filename);
        tokio::fs::read(&path).await.map_err(Self::io_error(path))
    }
}

/// Artifact name derived from a filename: the stem before the last
/// extension (`orders.zip` → `orders`).
#[must_use]
pub fn artifact_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(index) if index > 0 => &filename[..index],
        _ => filename,
    }
}
