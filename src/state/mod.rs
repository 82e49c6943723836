//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageStatus`: Tracks the status of individual pages (pending, rendering, rendered, ...)
//! - `CrawlStatus`: The crawl-level state machine (idle, running, completed, paused, aborted)
//! - `CrawlState`: Frontier, visited set, manifest and counters; the resumable snapshot

mod crawl_state;
mod page_state;

// Re-export main types
pub use crawl_state::{CrawlState, Frontier, ManifestEntry, PageNode, PageRecord, STATE_VERSION};
pub use page_state::{CrawlStatus, PageStatus};
