//! Storage trait for crawl state persistence

use crate::state::CrawlState;
use crate::StateError;
use std::path::PathBuf;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StateError>;

/// Trait for crawl state backends
///
/// A backend holds at most one snapshot. `save` must replace it atomically:
/// a reader never observes a partially written snapshot.
pub trait StateStore {
    /// Returns true if a snapshot exists
    fn exists(&self) -> bool;

    /// Loads and validates the snapshot
    ///
    /// Fails with `StateError::Missing` when there is none and
    /// `StateError::Corrupt` when it cannot be parsed or is inconsistent.
    fn load(&self) -> StorageResult<CrawlState>;

    /// Persists a snapshot, replacing any previous one
    fn save(&mut self, state: &CrawlState) -> StorageResult<()>;

    /// Removes the snapshot if present
    fn remove(&mut self) -> StorageResult<()>;

    /// Scratch directory named by the stored snapshot
    ///
    /// Read leniently, so a snapshot that fails `load` still reveals where
    /// its rendered pages live.
    fn recorded_scratch_dir(&self) -> Option<PathBuf>;
}
