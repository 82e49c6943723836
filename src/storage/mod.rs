//! Storage module for persisting crawl state
//!
//! The crawl state is a single JSON document. It is written after every
//! `save-interval` processed pages and on interruption, always through a
//! temporary file in the same directory followed by a rename.

mod json;
mod traits;

pub use json::{remove_scratch_dir, write_atomic, JsonStateStore, SCRATCH_MARKER};
pub use traits::{StateStore, StorageResult};

use std::path::Path;

/// Opens the JSON state store at `path`
pub fn open_store(path: &Path) -> JsonStateStore {
    JsonStateStore::new(path)
}
