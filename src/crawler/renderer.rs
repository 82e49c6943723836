//! Page renderer interface
//!
//! The coordinator only ever talks to a `PageRenderer`. The production
//! implementation drives a real browser; tests inject a deterministic fake.

use crate::RenderError;
use async_trait::async_trait;
use url::Url;

/// Result of rendering one page
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// The printed PDF document
    pub pdf: Vec<u8>,

    /// Where the browser ended up after redirects, when known
    pub final_url: Option<Url>,

    /// Document title
    pub title: Option<String>,

    /// Raw `href` values in document order
    pub links: Vec<String>,
}

/// Renders a URL to PDF and reports its outbound links
///
/// Calls are strictly sequential: the coordinator never has more than one
/// render in flight, so implementations may hold a single browser session.
#[async_trait]
pub trait PageRenderer: Send {
    /// Renders one page. Timeouts are reported as `RenderError::Timeout`.
    async fn render(&mut self, url: &Url) -> Result<RenderedPage, RenderError>;

    /// Releases the underlying session
    async fn close(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}
