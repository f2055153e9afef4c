//! Per-request scratch files: unique naming, materialization and cleanup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Error;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Process-wide scratch directory shared by all requests.
///
/// Requests never collide inside it because every file name starts with a
/// freshly allocated identifier.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub async fn new(root: PathBuf) -> Result<Self, Error> {
        fs::create_dir_all(&root).await.map_err(|e| {
            Error::Scratch(format!(
                "Failed to create scratch directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Timestamp, process-local sequence number and a random suffix
    pub fn allocate_id(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let suffix = Uuid::new_v4().simple().to_string();

        format!("run-{}-{}-{}", millis, sequence, &suffix[..8])
    }

    /// Path for `<id>.<extension>` inside the scratch root
    pub fn source_path(&self, id: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, extension))
    }

    /// Path for the compiled unit named after the source file's base name
    pub fn binary_path(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Private home directory for one request
    pub fn home_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.home", id))
    }

    /// Creates the request's home directory and registers it with
    /// `artifacts`, so anything a toolchain caches there goes with it
    pub async fn create_home(&self, id: &str, artifacts: &mut ArtifactSet) -> Result<PathBuf, Error> {
        let path = self.home_path(id);

        fs::create_dir(&path).await.map_err(|e| {
            Error::Scratch(format!("Failed to create {}: {}", path.display(), e))
        })?;
        artifacts.push(path.clone());

        Ok(path)
    }

    /// Writes `code` to a new `<id>.<extension>` file and registers it with
    /// `artifacts`. Never overwrites an existing file.
    pub async fn materialize(
        &self,
        id: &str,
        extension: &str,
        code: &str,
        artifacts: &mut ArtifactSet,
    ) -> Result<PathBuf, Error> {
        let path = self.source_path(id, extension);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                Error::Scratch(format!("Failed to create {}: {}", path.display(), e))
            })?;
        artifacts.push(path.clone());

        file.write_all(code.as_bytes())
            .await
            .map_err(|e| Error::Scratch(format!("Failed to write {}: {}", path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| Error::Scratch(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!("Materialized source at {}", path.display());
        Ok(path)
    }
}

/// Paths created for one execution, removed when the set is dropped.
///
/// Removal is best-effort: failures are logged and never reported to the
/// caller.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };

            match result {
                Ok(()) => debug!("Removed scratch artifact {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove scratch artifact {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        self.cleanup();
    }
}
