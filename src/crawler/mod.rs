//! Crawler module for rendering pages and driving the traversal
//!
//! This module contains the core crawling logic, including:
//! - The `PageRenderer` interface and its Chrome implementation
//! - HTML parsing for links and titles
//! - The HEAD-based content-type probe
//! - Overall crawl coordination

mod browser;
mod coordinator;
mod parser;
mod probe;
mod renderer;

pub use browser::{find_chrome_executable, ChromeRenderer};
pub use coordinator::{discard_saved_state, prepare_state, run_crawl, Coordinator};
pub use parser::{parse_html, ParsedPage};
pub use probe::{build_http_client, is_html_content_type, HttpProbe, ProbeResult};
pub use renderer::{PageRenderer, RenderedPage};
