//! Pagebinder: bind a whole website into one navigable PDF
//!
//! This crate crawls every same-domain page reachable from a base URL in
//! breadth-first order, renders each page to PDF through a browser, and merges
//! the renders into a single document with an optional clickable table of contents.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Pagebinder operations
#[derive(Debug, Error)]
pub enum PagebinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Assembly error: {0}")]
    Assemble(#[from] AssembleError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid filter pattern '{pattern}': {source}")]
    FilterConfig {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Errors raised while loading or persisting crawl state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Crawl state at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Crawl state format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Crawl state was created with different settings; rerun with the original URL, limits and filters or start fresh")]
    SettingsMismatch,

    #[error("Invalid page status transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: state::PageStatus,
        to: state::PageStatus,
    },

    #[error("No crawl state found at {0}")]
    Missing(PathBuf),

    #[error("Failed to serialize crawl state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-page render failures. These never escape the crawl loop.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Render timed out after {0}s")]
    Timeout(u64),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Errors raised while merging the final document
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("No pages were rendered; nothing to assemble")]
    EmptyManifest,

    #[error("Rendered page is missing: {0}")]
    MissingPage(PathBuf),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Invalid PDF structure: {0}")]
    Structure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Re-export commonly used types
pub use config::Settings;
pub use state::{CrawlState, CrawlStatus, PageStatus};
pub use crate::url::{normalize_url, UrlClassifier};
