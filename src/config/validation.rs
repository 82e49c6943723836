use crate::config::types::{CrawlConfig, OutputConfig, RendererConfig, Settings};
use crate::url::UrlFilter;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    validate_crawl_config(&settings.crawl)?;
    validate_renderer_config(&settings.renderer)?;
    validate_output_config(&settings.output)?;
    Ok(())
}

/// Validates crawl limits and compiles the filter patterns
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.failure_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "failure_threshold must be >= 1, got {}",
            config.failure_threshold
        )));
    }

    if config.save_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "save_interval must be >= 1, got {}",
            config.save_interval
        )));
    }

    // Surfaces FilterConfig errors before any state is touched
    UrlFilter::new(&config.include, &config.exclude)?;

    Ok(())
}

/// Validates browser rendering configuration
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "renderer timeout must be >= 1s, got {}s",
            config.timeout
        )));
    }

    if config.window_width < 320 || config.window_height < 240 {
        return Err(ConfigError::Validation(format!(
            "window size must be at least 320x240, got {}x{}",
            config.window_width, config.window_height
        )));
    }

    if !(0.0..=2.0).contains(&config.margin) {
        return Err(ConfigError::Validation(format!(
            "margin must be between 0 and 2 inches, got {}",
            config.margin
        )));
    }

    if let Some(ref path) = config.chrome_executable {
        if !path.exists() {
            return Err(ConfigError::Validation(format!(
                "chrome_executable does not exist: {}",
                path.display()
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if config.state_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "state_file cannot be empty".to_string(),
        ));
    }

    if config.path == config.state_file {
        return Err(ConfigError::Validation(
            "output path and state_file must differ".to_string(),
        ));
    }

    Ok(())
}
