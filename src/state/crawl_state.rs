//! Traversal state: frontier, visited set, manifest and counters
//!
//! `CrawlState` is the single value the coordinator owns and mutates. It is
//! serialized as-is to the state file, so everything needed to resume a crawl
//! lives here and nowhere else.

use crate::config::{compute_fingerprint, Settings};
use crate::state::PageStatus;
use crate::StateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::PathBuf;
use url::Url;

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

/// A URL admitted to the crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNode {
    /// Canonical URL
    pub url: String,

    /// Link distance from the base URL
    pub depth: u32,

    /// The page that first linked here (`None` for the base URL)
    pub parent_url: Option<String>,

    /// Admission counter; strictly increasing across the whole crawl
    pub discovery_order: u64,

    #[serde(default)]
    pub status: PageStatus,
}

impl PageNode {
    /// Moves the node to a new status, rejecting illegal transitions
    pub fn advance(&mut self, next: PageStatus) -> Result<(), StateError> {
        if !self.status.can_transition_to(next) {
            return Err(StateError::InvalidTransition {
                url: self.url.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// FIFO queue of admitted, not yet processed pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frontier {
    queue: VecDeque<PageNode>,
}

impl Frontier {
    pub fn push(&mut self, node: PageNode) {
        self.queue.push_back(node);
    }

    pub fn pop(&mut self) -> Option<PageNode> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageNode> {
        self.queue.iter()
    }
}

/// One successfully rendered page, in discovery order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub url: String,
    pub depth: u32,
    pub parent_url: Option<String>,
    pub discovery_order: u64,

    /// Location of the rendered single-page PDF
    pub pdf_ref: PathBuf,

    /// Document title reported by the renderer
    #[serde(default)]
    pub title: Option<String>,
}

/// A page that was not rendered, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub reason: String,
}

/// Complete, serializable crawl state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlState {
    pub version: u32,

    /// Fingerprint of the crawl-defining settings
    pub fingerprint: String,

    pub base_url: String,
    pub max_pages: u32,
    pub max_depth: Option<u32>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    /// Every URL ever admitted (frontier, rendered, failed or skipped)
    pub visited: BTreeSet<String>,
    pub frontier: Frontier,
    pub manifest: Vec<ManifestEntry>,
    pub pages_rendered: u32,

    #[serde(default)]
    pub failed: Vec<PageRecord>,
    #[serde(default)]
    pub skipped: Vec<PageRecord>,
    #[serde(default)]
    pub consecutive_failures: u32,

    pub next_discovery_order: u64,

    /// Directory holding the per-page PDFs
    pub scratch_dir: PathBuf,

    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl CrawlState {
    /// Creates a fresh state seeded with the base URL at depth 0
    ///
    /// The base URL is admitted unconditionally: it is the root of the
    /// document even when it does not match the include filters.
    pub fn new(settings: &Settings, scratch_dir: PathBuf) -> Self {
        let mut state = Self {
            version: STATE_VERSION,
            fingerprint: compute_fingerprint(settings),
            base_url: settings.base_url.to_string(),
            max_pages: settings.crawl.max_pages,
            max_depth: settings.crawl.max_depth,
            include_patterns: settings.crawl.include.clone(),
            exclude_patterns: settings.crawl.exclude.clone(),
            visited: BTreeSet::new(),
            frontier: Frontier::default(),
            manifest: Vec::new(),
            pages_rendered: 0,
            failed: Vec::new(),
            skipped: Vec::new(),
            consecutive_failures: 0,
            next_discovery_order: 0,
            scratch_dir,
            saved_at: None,
        };

        let base = settings.base_url.clone();
        state.admit(&base, 0, None);
        state
    }

    /// Admits a canonical URL into the frontier
    ///
    /// Returns false (and changes nothing) if the URL was already admitted,
    /// its depth exceeds `max_depth`, or the page limit has been reached.
    pub fn admit(&mut self, url: &Url, depth: u32, parent: Option<&Url>) -> bool {
        if self.is_capped() {
            return false;
        }

        if let Some(max_depth) = self.max_depth {
            if depth > max_depth {
                return false;
            }
        }

        if !self.visited.insert(url.to_string()) {
            return false;
        }

        let node = PageNode {
            url: url.to_string(),
            depth,
            parent_url: parent.map(|p| p.to_string()),
            discovery_order: self.next_discovery_order,
            status: PageStatus::Pending,
        };
        self.next_discovery_order += 1;
        self.frontier.push(node);
        true
    }

    /// Marks a canonical URL as seen without queueing it
    ///
    /// Used for redirect targets: their content was already rendered under
    /// the requested URL. Returns false if the URL was already known.
    pub fn mark_visited(&mut self, canonical: &str) -> bool {
        self.visited.insert(canonical.to_string())
    }

    /// Takes the next page in breadth-first order
    pub fn pop(&mut self) -> Option<PageNode> {
        self.frontier.pop()
    }

    /// True once `pages_rendered` has reached `max_pages`
    pub fn is_capped(&self) -> bool {
        self.pages_rendered >= self.max_pages
    }

    /// Records a rendered page and resets the consecutive failure counter
    pub fn record_rendered(&mut self, node: &PageNode, pdf_ref: PathBuf, title: Option<String>) {
        self.manifest.push(ManifestEntry {
            url: node.url.clone(),
            depth: node.depth,
            parent_url: node.parent_url.clone(),
            discovery_order: node.discovery_order,
            pdf_ref,
            title,
        });
        self.pages_rendered += 1;
        self.consecutive_failures = 0;
    }

    /// Records a render failure; returns the new consecutive failure count
    pub fn record_failed(&mut self, node: &PageNode, reason: impl Into<String>) -> u32 {
        self.failed.push(PageRecord {
            url: node.url.clone(),
            reason: reason.into(),
        });
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    /// Records a page that was deliberately not rendered
    pub fn record_skipped(&mut self, node: &PageNode, reason: impl Into<String>) {
        self.skipped.push(PageRecord {
            url: node.url.clone(),
            reason: reason.into(),
        });
    }

    /// Returns true if this state was created with the given settings
    pub fn matches_settings(&self, settings: &Settings) -> bool {
        self.fingerprint == compute_fingerprint(settings)
    }

    /// Checks the structural invariants of a loaded state
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.pages_rendered as usize != self.manifest.len() {
            return Err(format!(
                "pages_rendered is {} but the manifest has {} entries",
                self.pages_rendered,
                self.manifest.len()
            ));
        }

        if self.pages_rendered > self.max_pages {
            return Err(format!(
                "pages_rendered {} exceeds max_pages {}",
                self.pages_rendered, self.max_pages
            ));
        }

        let processed = self
            .manifest
            .iter()
            .map(|e| e.url.as_str())
            .chain(self.failed.iter().map(|r| r.url.as_str()))
            .chain(self.skipped.iter().map(|r| r.url.as_str()));
        for url in self.frontier.iter().map(|n| n.url.as_str()).chain(processed) {
            if !self.visited.contains(url) {
                return Err(format!("{} is tracked but missing from visited", url));
            }
        }

        let mut orders = HashSet::new();
        let node_orders = self
            .frontier
            .iter()
            .map(|n| n.discovery_order)
            .chain(self.manifest.iter().map(|e| e.discovery_order));
        for order in node_orders {
            if order >= self.next_discovery_order || !orders.insert(order) {
                return Err(format!("discovery order {} is duplicated or out of range", order));
            }
        }

        if let Some(max_depth) = self.max_depth {
            let too_deep = self
                .frontier
                .iter()
                .map(|n| (&n.url, n.depth))
                .chain(self.manifest.iter().map(|e| (&e.url, e.depth)))
                .find(|(_, depth)| *depth > max_depth);
            if let Some((url, depth)) = too_deep {
                return Err(format!("{} has depth {} beyond max_depth {}", url, depth, max_depth));
            }
        }

        Ok(())
    }
}
