//! Configuration module for Pagebinder
//!
//! Settings come from two layers: an optional TOML file and command-line
//! overrides. Both are merged into one validated [`Settings`] value before any
//! crawl state is touched.
//!
//! # Example
//!
//! ```no_run
//! use pagebinder::config::{load_settings, Overrides};
//!
//! let settings = load_settings("https://example.com/", None, Overrides::default()).unwrap();
//! println!("Will render at most {} pages", settings.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CrawlConfig, FileConfig, OutputConfig, Overrides, RendererConfig, Settings};

// Re-export parser functions
pub use parser::{compute_fingerprint, load_file_config, load_settings, resolve_settings};
