//! URL handling module for Pagebinder
//!
//! This module canonicalizes URLs, decides same-domain membership and applies
//! the include/exclude filters. Depth limits are not handled here: depth
//! depends on traversal order, so the frontier enforces it on admission.

mod domain;
mod filter;
mod normalize;

use crate::config::CrawlConfig;
use crate::ConfigError;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_same_domain};
pub use filter::UrlFilter;
pub use normalize::{canonicalize, normalize_url, resolve_link};

/// Why a discovered link was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Empty, anchor-only, non-http(s) or unparsable reference
    Unnavigable,
    /// Host (or port) differs from the base URL
    CrossDomain,
    /// Matched an exclude pattern
    Excluded,
    /// Include patterns are configured and none matched
    NotIncluded,
}

/// Outcome of classifying one raw link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClassification {
    /// The link is crawlable; carries its canonical form
    Accepted(Url),
    /// The link must not enter the frontier
    Rejected(RejectReason),
}

/// Canonicalizes and filters links relative to one base URL
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    base_url: Url,
    filter: UrlFilter,
}

impl UrlClassifier {
    /// Creates a classifier for the given (already canonical) base URL
    pub fn new(base_url: Url, filter: UrlFilter) -> Self {
        Self { base_url, filter }
    }

    /// Builds a classifier from crawl settings, compiling the filter patterns
    pub fn from_config(base_url: Url, config: &CrawlConfig) -> Result<Self, ConfigError> {
        let filter = UrlFilter::new(&config.include, &config.exclude)?;
        Ok(Self::new(base_url, filter))
    }

    /// The canonical base URL this classifier is anchored on
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Classifies a raw link found on `page_url`
    ///
    /// # Examples
    ///
    /// ```
    /// use pagebinder::url::{LinkClassification, RejectReason, UrlClassifier, UrlFilter};
    /// use url::Url;
    ///
    /// let base = Url::parse("https://site.test/").unwrap();
    /// let classifier = UrlClassifier::new(base.clone(), UrlFilter::allow_all());
    ///
    /// assert_eq!(
    ///     classifier.classify("/a/", &base),
    ///     LinkClassification::Accepted(Url::parse("https://site.test/a").unwrap())
    /// );
    /// assert_eq!(
    ///     classifier.classify("https://elsewhere.test/", &base),
    ///     LinkClassification::Rejected(RejectReason::CrossDomain)
    /// );
    /// ```
    pub fn classify(&self, raw_url: &str, page_url: &Url) -> LinkClassification {
        let mut url = match resolve_link(raw_url, page_url) {
            Some(url) => url,
            None => return LinkClassification::Rejected(RejectReason::Unnavigable),
        };

        if !is_same_domain(&self.base_url, &url) {
            return LinkClassification::Rejected(RejectReason::CrossDomain);
        }

        // http and https variants of one page share a single canonical form
        if url.scheme() != self.base_url.scheme() && url.set_scheme(self.base_url.scheme()).is_err()
        {
            return LinkClassification::Rejected(RejectReason::Unnavigable);
        }

        if self.filter.is_excluded(&url) {
            return LinkClassification::Rejected(RejectReason::Excluded);
        }

        if !self.filter.is_included(&url) {
            return LinkClassification::Rejected(RejectReason::NotIncluded);
        }

        LinkClassification::Accepted(url)
    }

    /// Returns the canonical URL for a raw link, or `None` if it is rejected
    pub fn normalize(&self, raw_url: &str, page_url: &Url) -> Option<Url> {
        match self.classify(raw_url, page_url) {
            LinkClassification::Accepted(url) => Some(url),
            LinkClassification::Rejected(_) => None,
        }
    }

    /// Canonical form of a same-domain URL, ignoring the filters
    ///
    /// Used when matching links inside rendered documents against the
    /// manifest, where filtering has already happened.
    pub fn canonical_key(&self, raw_url: &str) -> Option<String> {
        let mut url = resolve_link(raw_url, &self.base_url)?;
        if !is_same_domain(&self.base_url, &url) {
            return None;
        }
        if url.scheme() != self.base_url.scheme() {
            url.set_scheme(self.base_url.scheme()).ok()?;
        }
        Some(url.into())
    }
}
