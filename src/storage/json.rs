//! JSON file implementation of the state store

use crate::state::{CrawlState, STATE_VERSION};
use crate::storage::traits::{StateStore, StorageResult};
use crate::StateError;
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes `bytes` to `path` through a temporary sibling file and a rename
///
/// The target is either left untouched or fully replaced.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Crawl state stored as a single pretty-printed JSON document
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl Into<String>) -> StateError {
        StateError::Corrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

impl StateStore for JsonStateStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> StorageResult<CrawlState> {
        if !self.exists() {
            return Err(StateError::Missing(self.path.clone()));
        }

        let contents = std::fs::read_to_string(&self.path)?;

        // Check the version before the full parse so old formats get a clear error
        let raw: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| self.corrupt(e.to_string()))?;
        let found = raw
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| self.corrupt("missing version field"))?;
        if found != u64::from(STATE_VERSION) {
            return Err(StateError::VersionMismatch {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                expected: STATE_VERSION,
            });
        }

        let state: CrawlState =
            serde_json::from_value(raw).map_err(|e| self.corrupt(e.to_string()))?;

        state.check_invariants().map_err(|reason| self.corrupt(reason))?;

        if let Some(entry) = state.manifest.iter().find(|e| !e.pdf_ref.is_file()) {
            return Err(self.corrupt(format!(
                "rendered page {} is missing from {}",
                entry.url,
                entry.pdf_ref.display()
            )));
        }

        tracing::debug!(
            "Loaded crawl state from {}: {} rendered, {} queued",
            self.path.display(),
            state.pages_rendered,
            state.frontier.len()
        );

        Ok(state)
    }

    fn save(&mut self, state: &CrawlState) -> StorageResult<()> {
        let mut snapshot = state.clone();
        snapshot.saved_at = Some(Utc::now());

        let json = serde_json::to_vec_pretty(&snapshot)?;
        write_atomic(&self.path, &json)?;

        tracing::debug!("Saved crawl state to {}", self.path.display());
        Ok(())
    }

    fn remove(&mut self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn recorded_scratch_dir(&self) -> Option<PathBuf> {
        let contents = std::fs::read(&self.path).ok()?;
        let raw: serde_json::Value = serde_json::from_slice(&contents).ok()?;
        raw.get("scratch_dir")?.as_str().map(PathBuf::from)
    }
}

/// Marker in the name of every scratch directory
pub const SCRATCH_MARKER: &str = ".pages-";

/// Removes a scratch directory of rendered pages
///
/// Directories whose name lacks [`SCRATCH_MARKER`] are left alone, so a
/// hand-edited state file cannot point this at arbitrary paths.
pub fn remove_scratch_dir(dir: &Path) -> std::io::Result<()> {
    let is_scratch = dir
        .file_name()
        .map(|name| name.to_string_lossy().contains(SCRATCH_MARKER))
        .unwrap_or(false);
    if !is_scratch {
        tracing::warn!("Not removing {}: not a scratch directory", dir.display());
        return Ok(());
    }

    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            tracing::debug!("Removed scratch directory {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
