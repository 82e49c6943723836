use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

/// Contents of an optional TOML configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub crawl: CrawlConfig,
    pub renderer: RendererConfig,
    pub output: OutputConfig,
}

/// Crawl traversal limits and filters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum number of pages to render
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum link depth from the base URL (unlimited when absent)
    #[serde(rename = "max-depth")]
    pub max_depth: Option<u32>,

    /// Regex patterns a URL path must match (any of them) to be admitted
    pub include: Vec<String>,

    /// Regex patterns that reject a URL path when matched
    pub exclude: Vec<String>,

    /// Consecutive render failures tolerated before the crawl aborts
    #[serde(rename = "failure-threshold")]
    pub failure_threshold: u32,

    /// Persist crawl state every N processed pages
    #[serde(rename = "save-interval")]
    pub save_interval: u32,

    /// Send a HEAD request before rendering and skip non-HTML pages
    #[serde(rename = "probe-content-type")]
    pub probe_content_type: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_depth: None,
            include: Vec::new(),
            exclude: Vec::new(),
            failure_threshold: 5,
            save_interval: 1,
            probe_content_type: true,
        }
    }
}

/// Browser rendering configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Run the browser without a visible window
    pub headless: bool,

    /// Time to let the page settle after navigation (milliseconds)
    #[serde(rename = "settle-time")]
    pub settle_time: u64,

    /// Per-page render timeout (seconds)
    pub timeout: u64,

    #[serde(rename = "window-width")]
    pub window_width: u32,

    #[serde(rename = "window-height")]
    pub window_height: u32,

    /// Print CSS backgrounds into the PDF
    #[serde(rename = "print-background")]
    pub print_background: bool,

    /// Page margin on every side (inches)
    pub margin: f64,

    /// Explicit Chrome/Chromium binary; discovered automatically when absent
    #[serde(rename = "chrome-executable")]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            headless: true,
            settle_time: 3000,
            timeout: 30,
            window_width: 1200,
            window_height: 800,
            print_background: true,
            margin: 0.4,
            chrome_executable: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the merged PDF
    pub path: PathBuf,

    /// Path of the resumable crawl state file
    #[serde(rename = "state-file")]
    pub state_file: PathBuf,

    /// Prepend a hierarchical table of contents
    pub index: bool,

    /// Heading printed on the first table of contents page
    #[serde(rename = "toc-title")]
    pub toc_title: String,

    /// Keep per-page PDFs and the state file after a completed run
    #[serde(rename = "keep-scratch")]
    pub keep_scratch: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("website.pdf"),
            state_file: PathBuf::from("crawler_state.json"),
            index: false,
            toc_title: "Table of Contents".to_string(),
            keep_scratch: false,
        }
    }
}

/// Values given on the command line; they take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub max_pages: Option<u32>,
    pub max_depth: Option<u32>,
    pub no_headless: bool,
    pub index: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub resume: bool,
    pub state_file: Option<PathBuf>,
}

/// Fully resolved and validated run settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// The URL the crawl starts from, already canonicalized
    pub base_url: Url,
    pub crawl: CrawlConfig,
    pub renderer: RendererConfig,
    pub output: OutputConfig,
    /// Continue from the persisted state file instead of starting fresh
    pub resume: bool,
}
