use crate::config::types::{FileConfig, Overrides, Settings};
use crate::config::validation::validate;
use crate::url::normalize_url;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a TOML configuration file
///
/// Missing sections and keys fall back to their defaults.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Merges file configuration with command-line overrides and validates the result
///
/// # Arguments
///
/// * `base_url` - The URL the crawl starts from
/// * `file` - Values read from the configuration file (or defaults)
/// * `overrides` - Values given on the command line
///
/// # Returns
///
/// * `Ok(Settings)` - Merged and validated settings
/// * `Err(ConfigError)` - Invalid base URL, limits, or filter patterns
pub fn resolve_settings(
    base_url: &str,
    file: FileConfig,
    overrides: Overrides,
) -> Result<Settings, ConfigError> {
    let base_url = normalize_url(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", base_url, e)))?;

    let FileConfig {
        mut crawl,
        mut renderer,
        mut output,
    } = file;

    if let Some(max_pages) = overrides.max_pages {
        crawl.max_pages = max_pages;
    }
    if overrides.max_depth.is_some() {
        crawl.max_depth = overrides.max_depth;
    }
    if !overrides.include.is_empty() {
        crawl.include = overrides.include;
    }
    if !overrides.exclude.is_empty() {
        crawl.exclude = overrides.exclude;
    }
    if overrides.no_headless {
        renderer.headless = false;
    }
    if let Some(path) = overrides.output {
        output.path = path;
    }
    if let Some(state_file) = overrides.state_file {
        output.state_file = state_file;
    }
    if overrides.index {
        output.index = true;
    }

    let settings = Settings {
        base_url,
        crawl,
        renderer,
        output,
        resume: overrides.resume,
    };

    validate(&settings)?;

    Ok(settings)
}

/// Loads settings from an optional configuration file plus overrides
///
/// # Example
///
/// ```no_run
/// use pagebinder::config::{load_settings, Overrides};
/// use std::path::Path;
///
/// let settings = load_settings(
///     "https://example.com/",
///     Some(Path::new("pagebinder.toml")),
///     Overrides::default(),
/// ).unwrap();
/// println!("State file: {}", settings.output.state_file.display());
/// ```
pub fn load_settings(
    base_url: &str,
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<Settings, ConfigError> {
    let file = match config_path {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };
    resolve_settings(base_url, file, overrides)
}

/// Computes a SHA-256 fingerprint of the settings that define a crawl
///
/// Two runs with the same fingerprint make identical admission decisions, so a
/// persisted state may only be resumed under a matching fingerprint.
pub fn compute_fingerprint(settings: &Settings) -> String {
    let mut hasher = Sha256::new();
    hasher.update(settings.base_url.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(settings.crawl.max_pages.to_le_bytes());
    match settings.crawl.max_depth {
        Some(depth) => {
            hasher.update(b"depth");
            hasher.update(depth.to_le_bytes());
        }
        None => hasher.update(b"unbounded"),
    }
    for pattern in &settings.crawl.include {
        hasher.update(b"\0include\0");
        hasher.update(pattern.as_bytes());
    }
    for pattern in &settings.crawl.exclude {
        hasher.update(b"\0exclude\0");
        hasher.update(pattern.as_bytes());
    }
    hex::encode(hasher.finalize())
}
