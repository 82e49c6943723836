//! End-of-run report
//!
//! Every run ends with a report, whether it completed, was paused or aborted.

use crate::state::{CrawlState, CrawlStatus, PageRecord};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// How the crawl ended
    pub status: CrawlStatus,

    /// Pages in the manifest
    pub pages_rendered: u32,

    /// Pages the renderer gave up on
    pub pages_failed: usize,

    /// Pages not rendered because they are not HTML
    pub pages_skipped: usize,

    /// Admitted pages that were never processed
    pub frontier_remaining: usize,

    /// Rendered pages per depth
    pub depth_breakdown: BTreeMap<u32, usize>,

    /// The assembled document, when one was written
    pub output_path: Option<PathBuf>,

    /// State file to pass to `--resume`, when the run can be continued
    pub state_file: Option<PathBuf>,

    /// Every failed page with its reason
    pub failures: Vec<PageRecord>,
}

impl CrawlReport {
    /// Builds a report from the final crawl state
    pub fn from_state(status: CrawlStatus, state: &CrawlState) -> Self {
        let mut depth_breakdown = BTreeMap::new();
        for entry in &state.manifest {
            *depth_breakdown.entry(entry.depth).or_insert(0) += 1;
        }

        Self {
            status,
            pages_rendered: state.pages_rendered,
            pages_failed: state.failed.len(),
            pages_skipped: state.skipped.len(),
            frontier_remaining: state.frontier.len(),
            depth_breakdown,
            output_path: None,
            state_file: None,
            failures: state.failed.clone(),
        }
    }

    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }

    pub fn with_state_file(mut self, path: Option<PathBuf>) -> Self {
        self.state_file = path;
        self
    }

    /// Returns the process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.status.is_failure() {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Crawl Report ===")?;
        writeln!(f)?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "  Pages rendered: {}", self.pages_rendered)?;
        writeln!(f, "  Pages failed: {}", self.pages_failed)?;
        writeln!(f, "  Pages skipped: {}", self.pages_skipped)?;
        writeln!(f, "  Pages left in frontier: {}", self.frontier_remaining)?;

        if !self.depth_breakdown.is_empty() {
            writeln!(f)?;
            writeln!(f, "Pages by depth:")?;
            for (depth, count) in &self.depth_breakdown {
                writeln!(f, "  {}: {}", depth, count)?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  - {}: {}", failure.url, failure.reason)?;
            }
        }

        writeln!(f)?;
        match &self.output_path {
            Some(path) => writeln!(f, "Output: {}", path.display())?,
            None => writeln!(f, "Output: none written")?,
        }

        if let Some(state_file) = &self.state_file {
            writeln!(
                f,
                "Progress saved to {}; rerun with --resume to continue",
                state_file.display()
            )?;
        }

        Ok(())
    }
}

/// Prints the report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", report);
}
