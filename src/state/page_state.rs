/// Page and crawl status definitions for tracking crawl progress
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a page in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    // ===== Active States =====
    /// Page has been admitted to the frontier and waits for its turn
    #[default]
    Pending,

    /// Page is currently being rendered by the browser
    Rendering,

    // ===== Terminal States =====
    /// Page was rendered and appended to the manifest
    Rendered,

    /// The renderer failed for this page (timeout, navigation or print error)
    Failed,

    /// Page was not rendered because it is not an HTML document
    Skipped,
}

impl PageStatus {
    /// Returns true if this is a terminal status (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rendered | Self::Failed | Self::Skipped)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// ```text
    /// pending -> rendering -> rendered | failed
    /// pending -> skipped
    /// ```
    pub fn can_transition_to(&self, next: PageStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Rendering)
                | (Self::Pending, Self::Skipped)
                | (Self::Rendering, Self::Rendered)
                | (Self::Rendering, Self::Failed)
        )
    }

    /// Stable lowercase name, as written to the state file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rendering => "rendering",
            Self::Rendered => "rendered",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Crawl-level state machine
///
/// ```text
/// Idle -> Running -> Completed | Paused | Aborted
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStatus {
    Idle,
    Running,
    /// Frontier exhausted, or `capped` when the page limit was reached first
    Completed { capped: bool },
    /// Interrupted by a signal; state was persisted and can be resumed
    Paused,
    /// Too many consecutive render failures or an unrecoverable environment error
    Aborted { reason: String },
}

impl CrawlStatus {
    /// Returns true if the run should exit with a failure code
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed { capped: false } => write!(f, "completed"),
            Self::Completed { capped: true } => write!(f, "completed (page limit reached)"),
            Self::Paused => write!(f, "paused"),
            Self::Aborted { reason } => write!(f, "aborted: {}", reason),
        }
    }
}
