//! Content-type probe
//!
//! Before a page is handed to the browser, a HEAD request checks whether the
//! URL serves an HTML document. Binary downloads (PDFs, images, archives)
//! would otherwise stall the renderer or produce blank pages.

use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use url::Url;

/// Outcome of probing one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// Served as HTML, or the header was absent
    Html,

    /// Served with a non-HTML Content-Type; the page should be skipped
    NotHtml {
        /// The Content-Type received
        content_type: String,
    },

    /// The probe itself failed; the page is rendered anyway
    Inconclusive {
        /// Error description
        reason: String,
    },
}

/// Builds the HTTP client used for probing
///
/// # Example
///
/// ```
/// use pagebinder::crawler::build_http_client;
///
/// let client = build_http_client(10).unwrap();
/// ```
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if a Content-Type value denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    matches!(mime.as_str(), "text/html" | "application/xhtml+xml")
}

/// Sends HEAD requests to classify pages before rendering
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a probe with a default client
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(timeout_secs)?))
    }

    /// Checks the Content-Type served for `url`
    ///
    /// | Condition                         | Result         |
    /// |-----------------------------------|----------------|
    /// | 2xx with HTML or no Content-Type  | `Html`         |
    /// | 2xx with any other Content-Type   | `NotHtml`      |
    /// | Non-2xx status (HEAD may be unsupported) | `Inconclusive` |
    /// | Network error or timeout          | `Inconclusive` |
    pub async fn check(&self, url: &Url) -> ProbeResult {
        let response = match self.client.head(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    "connection refused".to_string()
                } else {
                    e.to_string()
                };
                return ProbeResult::Inconclusive { reason };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeResult::Inconclusive {
                reason: format!("HEAD returned {}", status.as_u16()),
            };
        }

        match response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            Some(ct) if !ct.trim().is_empty() && !is_html_content_type(ct) => ProbeResult::NotHtml {
                content_type: ct.to_string(),
            },
            _ => ProbeResult::Html,
        }
    }
}
