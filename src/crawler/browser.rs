//! Chrome-backed page renderer
//!
//! Launches one browser for the whole crawl and prints every page through the
//! DevTools protocol. Pages are opened and closed per render; the browser
//! process lives until `close` is called.

use crate::config::RendererConfig;
use crate::crawler::parser::parse_html;
use crate::crawler::renderer::{PageRenderer, RenderedPage};
use crate::{PagebinderError, RenderError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// A4 paper size in inches
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;

/// Locates a Chrome or Chromium executable
///
/// The configured path wins; otherwise well-known install locations are tried,
/// then `which` on common binary names.
pub fn find_chrome_executable(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.clone());
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    if let Some(path) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "windows") {
        return None;
    }

    ["chromium", "chromium-browser", "google-chrome", "chrome"]
        .iter()
        .filter_map(|cmd| Command::new("which").arg(cmd).output().ok())
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .find(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Renders pages with a single shared Chrome session
pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    config: RendererConfig,
}

impl ChromeRenderer {
    /// Launches the browser
    pub async fn launch(config: &RendererConfig) -> Result<Self, PagebinderError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .request_timeout(Duration::from_secs(config.timeout))
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--hide-scrollbars")
            .arg("--mute-audio");

        if !config.headless {
            builder = builder.with_head();
        }

        match find_chrome_executable(config.chrome_executable.as_ref()) {
            Some(path) => {
                tracing::info!("Using browser at {}", path.display());
                builder = builder.chrome_executable(path);
            }
            None => tracing::warn!("No Chrome executable found; relying on chromiumoxide defaults"),
        }

        let browser_config = builder
            .build()
            .map_err(|e| PagebinderError::Browser(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| PagebinderError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
            tracing::debug!("Browser handler task completed");
        });

        Ok(Self {
            browser,
            handler,
            config: config.clone(),
        })
    }

    fn pdf_params(&self) -> PrintToPdfParams {
        let margin = Some(self.config.margin);
        PrintToPdfParams {
            print_background: Some(self.config.print_background),
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            margin_top: margin,
            margin_bottom: margin,
            margin_left: margin,
            margin_right: margin,
            prefer_css_page_size: Some(true),
            ..Default::default()
        }
    }

    async fn render_on(&self, page: &Page, url: &Url) -> Result<RenderedPage, RenderError> {
        page.goto(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        // Give client-side scripts time to finish drawing
        tokio::time::sleep(Duration::from_millis(self.config.settle_time)).await;

        let pdf = page
            .pdf(self.pdf_params())
            .await
            .map_err(|e| RenderError::Pdf(e.to_string()))?;

        let html = page
            .content()
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        let parsed = parse_html(&html);

        let final_url = page
            .url()
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?
            .and_then(|u| Url::parse(&u).ok());

        Ok(RenderedPage {
            pdf,
            final_url,
            title: parsed.title,
            links: parsed.links,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&mut self, url: &Url) -> Result<RenderedPage, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        let timeout = Duration::from_secs(self.config.timeout);
        let result = match tokio::time::timeout(timeout, self.render_on(&page, url)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout(self.config.timeout)),
        };

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close tab for {}: {}", url, e);
        }

        result
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.browser
            .close()
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}
