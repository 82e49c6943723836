//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the breadth-first crawl loop:
//! - Preparing a fresh or resumed `CrawlState`
//! - Popping pages in FIFO order and handing them to the renderer
//! - Classifying and admitting discovered links
//! - Persisting state and honoring interruption between pages
//! - Assembling the final document once the crawl completes

use crate::config::Settings;
use crate::crawler::probe::{HttpProbe, ProbeResult};
use crate::crawler::renderer::PageRenderer;
use crate::output::{assemble_options, Assembler, CrawlReport, LopdfMerger};
use crate::state::{CrawlState, CrawlStatus, PageNode, PageStatus};
use crate::storage::{remove_scratch_dir, StateStore, SCRATCH_MARKER};
use crate::url::{LinkClassification, UrlClassifier};
use crate::{PagebinderError, StateError, UrlError};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

/// Loads the state to resume from, or creates a fresh one
///
/// Resuming is explicit: without `settings.resume` an existing state file is
/// ignored here and only replaced once the first page has been processed.
/// On resume the stored state must load cleanly and must have been created
/// with the same crawl-defining settings.
pub fn prepare_state<S: StateStore>(
    settings: &Settings,
    store: &S,
) -> Result<CrawlState, PagebinderError> {
    if settings.resume {
        let state = store.load()?;
        if !state.matches_settings(settings) {
            return Err(StateError::SettingsMismatch.into());
        }
        tracing::info!(
            "Resuming crawl of {}: {} pages rendered, {} queued",
            state.base_url,
            state.pages_rendered,
            state.frontier.len()
        );
        return Ok(state);
    }

    if store.exists() {
        tracing::info!("Ignoring existing crawl state; starting a fresh crawl");
    }

    Ok(CrawlState::new(settings, scratch_dir_for(&settings.output.state_file)))
}

/// Deletes the saved state and the rendered pages it refers to
pub fn discard_saved_state<S: StateStore>(store: &mut S) -> Result<(), PagebinderError> {
    if let Some(dir) = store.recorded_scratch_dir() {
        remove_scratch_dir(&dir)?;
    }
    store.remove()?;
    Ok(())
}

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Per-run directory for rendered pages, next to the state file
fn scratch_dir_for(state_file: &Path) -> PathBuf {
    let parent = match state_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = state_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "crawler_state".to_string());
    parent.join(format!(
        "{}{}{}-{}-{}",
        stem,
        SCRATCH_MARKER,
        Utc::now().format("%Y%m%d%H%M%S"),
        std::process::id(),
        SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Main crawler coordinator structure
pub struct Coordinator<R: PageRenderer, S: StateStore> {
    settings: Arc<Settings>,
    renderer: R,
    store: S,
    classifier: UrlClassifier,
    probe: Option<HttpProbe>,
    state: CrawlState,
    status: CrawlStatus,
    stop: Arc<AtomicBool>,
    last_error: Option<String>,
    processed_since_save: u32,
    dirty: bool,
    /// Scratch directory of the snapshot this run replaces
    superseded_scratch: Option<PathBuf>,
}

impl<R: PageRenderer, S: StateStore> Coordinator<R, S> {
    /// Creates a coordinator over a prepared state
    ///
    /// The content-type probe is enabled according to `probe-content-type`.
    pub fn new(
        settings: Arc<Settings>,
        state: CrawlState,
        renderer: R,
        store: S,
    ) -> Result<Self, PagebinderError> {
        let classifier = UrlClassifier::from_config(settings.base_url.clone(), &settings.crawl)?;
        let superseded_scratch = store
            .recorded_scratch_dir()
            .filter(|dir| dir != &state.scratch_dir);
        let probe = if settings.crawl.probe_content_type {
            Some(HttpProbe::with_timeout(settings.renderer.timeout)?)
        } else {
            None
        };

        Ok(Self {
            settings,
            renderer,
            store,
            classifier,
            probe,
            state,
            status: CrawlStatus::Idle,
            stop: Arc::new(AtomicBool::new(false)),
            last_error: None,
            processed_since_save: 0,
            dirty: false,
            superseded_scratch,
        })
    }

    /// Replaces the content-type probe
    pub fn with_probe(mut self, probe: Option<HttpProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Shares an interruption flag with the caller
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn status(&self) -> &CrawlStatus {
        &self.status
    }

    pub fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    /// Runs the crawl loop until it completes, is paused or aborts
    ///
    /// Per-page render failures never escape this loop. Errors returned here
    /// are environmental: the state file or scratch directory could not be
    /// written.
    pub async fn run(&mut self) -> Result<CrawlStatus, PagebinderError> {
        self.status = CrawlStatus::Running;
        tracing::info!(
            "Starting crawl of {} (max {} pages{})",
            self.settings.base_url,
            self.state.max_pages,
            self.state
                .max_depth
                .map(|d| format!(", max depth {}", d))
                .unwrap_or_default()
        );

        let status = loop {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("Interrupted; saving progress");
                break CrawlStatus::Paused;
            }

            if self.state.is_capped() {
                tracing::info!("Reached the limit of {} pages", self.state.max_pages);
                break CrawlStatus::Completed {
                    capped: !self.state.frontier.is_empty(),
                };
            }

            let Some(node) = self.state.pop() else {
                tracing::info!("Frontier is empty, crawl complete");
                break CrawlStatus::Completed { capped: false };
            };

            self.process_page(node).await?;
            self.dirty = true;
            self.processed_since_save += 1;

            if self.processed_since_save >= self.settings.crawl.save_interval {
                self.save()?;
            }

            let threshold = self.settings.crawl.failure_threshold;
            if self.state.consecutive_failures >= threshold {
                let reason = format!(
                    "{} consecutive render failures (last: {})",
                    self.state.consecutive_failures,
                    self.last_error.as_deref().unwrap_or("unknown")
                );
                tracing::error!("Aborting crawl: {}", reason);
                break CrawlStatus::Aborted { reason };
            }
        };

        if self.dirty {
            self.save()?;
        }

        self.status = status.clone();
        tracing::info!(
            "Crawl {}: {} rendered, {} failed, {} skipped, {} queued",
            status,
            self.state.pages_rendered,
            self.state.failed.len(),
            self.state.skipped.len(),
            self.state.frontier.len()
        );
        Ok(status)
    }

    /// Probes, renders and records one page
    async fn process_page(&mut self, mut node: PageNode) -> Result<(), PagebinderError> {
        let url = Url::parse(&node.url).map_err(|e| UrlError::Parse(e.to_string()))?;

        if let Some(probe) = &self.probe {
            match probe.check(&url).await {
                ProbeResult::NotHtml { content_type } => {
                    node.advance(PageStatus::Skipped)?;
                    tracing::info!("Skipping {} ({})", url, content_type);
                    self.state
                        .record_skipped(&node, format!("not an HTML page: {}", content_type));
                    return Ok(());
                }
                ProbeResult::Inconclusive { reason } => {
                    tracing::debug!("Probe inconclusive for {}: {}", url, reason);
                }
                ProbeResult::Html => {}
            }
        }

        node.advance(PageStatus::Rendering)?;
        let page = match self.renderer.render(&url).await {
            Ok(page) => page,
            Err(e) => {
                node.advance(PageStatus::Failed)?;
                let failures = self.state.record_failed(&node, e.to_string());
                tracing::warn!(
                    "Failed to render {} ({} in a row): {}",
                    url,
                    failures,
                    e
                );
                self.last_error = Some(e.to_string());
                return Ok(());
            }
        };

        let pdf_ref = self
            .state
            .scratch_dir
            .join(format!("page_{:04}.pdf", node.discovery_order));
        tokio::fs::create_dir_all(&self.state.scratch_dir).await?;
        tokio::fs::write(&pdf_ref, &page.pdf).await?;

        // Relative links resolve against where the browser actually landed
        let page_url = page.final_url.as_ref().unwrap_or(&url);
        if let Some(landed) = self.classifier.canonical_key(page_url.as_str()) {
            if landed != node.url && self.state.mark_visited(&landed) {
                tracing::debug!("{} redirected to {}", url, landed);
            }
        }
        let mut admitted = 0;
        for raw in &page.links {
            match self.classifier.classify(raw, page_url) {
                LinkClassification::Accepted(link) => {
                    if self.state.admit(&link, node.depth + 1, Some(&url)) {
                        tracing::debug!("Admitted {} at depth {}", link, node.depth + 1);
                        admitted += 1;
                    }
                }
                LinkClassification::Rejected(reason) => {
                    tracing::debug!("Rejected {} ({:?})", raw, reason);
                }
            }
        }

        node.advance(PageStatus::Rendered)?;
        self.state.record_rendered(&node, pdf_ref, page.title);
        tracing::info!(
            "[{}/{}] Rendered {} (depth {}, {} new links)",
            self.state.pages_rendered,
            self.state.max_pages,
            url,
            node.depth,
            admitted
        );

        Ok(())
    }

    fn save(&mut self) -> Result<(), PagebinderError> {
        self.store.save(&self.state)?;
        self.processed_since_save = 0;
        self.dirty = false;

        // Nothing refers to the previous run's pages once its state is gone
        if let Some(dir) = self.superseded_scratch.take() {
            tracing::info!("Removing pages of the previous crawl in {}", dir.display());
            remove_scratch_dir(&dir)?;
        }
        Ok(())
    }

    /// Closes the renderer, assembles the document and cleans up
    ///
    /// The document is written only when the crawl completed with at least
    /// one rendered page. After a successful write the state file and the
    /// scratch directory are removed unless `keep-scratch` is set. Paused and
    /// aborted crawls keep both so they can be resumed.
    pub async fn finish(mut self) -> Result<CrawlReport, PagebinderError> {
        if let Err(e) = self.renderer.close().await {
            tracing::warn!("Failed to shut down renderer: {}", e);
        }

        let report = CrawlReport::from_state(self.status.clone(), &self.state);

        let completed = matches!(self.status, CrawlStatus::Completed { .. });
        if !completed {
            let state_file = self.resumable_state_file();
            return Ok(report.with_state_file(state_file));
        }

        if self.state.manifest.is_empty() {
            tracing::warn!("No pages were rendered; no document written");
            return Ok(report);
        }

        let output = self.settings.output.path.clone();
        let assembler = Assembler::new(LopdfMerger::new(), assemble_options(&self.settings));
        assembler.assemble(&self.state.manifest, &self.classifier, &output)?;

        if !self.settings.output.keep_scratch {
            self.cleanup()?;
        }

        Ok(report.with_output(Some(output)))
    }

    /// State file to mention in the report, if one exists on disk
    fn resumable_state_file(&self) -> Option<PathBuf> {
        self.store
            .exists()
            .then(|| self.settings.output.state_file.clone())
    }

    /// Removes the state file and the rendered pages
    pub fn cleanup(&mut self) -> Result<(), PagebinderError> {
        self.store.remove()?;
        remove_scratch_dir(&self.state.scratch_dir)?;
        Ok(())
    }
}

/// Runs a complete crawl with the given renderer
///
/// This is the main entry point:
///
/// 1. Load or create the crawl state
/// 2. Run the breadth-first loop until completion, interruption or abort
/// 3. Assemble the document on completion
/// 4. Return the report
///
/// State problems are reported before the renderer is used at all.
///
/// # Example
///
/// ```no_run
/// use pagebinder::config::{load_settings, Overrides};
/// use pagebinder::crawler::{run_crawl, ChromeRenderer};
/// use pagebinder::storage::open_store;
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = load_settings("https://example.com/", None, Overrides::default())?;
/// let store = open_store(&settings.output.state_file);
/// let renderer = ChromeRenderer::launch(&settings.renderer).await?;
/// let report = run_crawl(settings, renderer, store, Arc::new(AtomicBool::new(false))).await?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl<R: PageRenderer, S: StateStore>(
    settings: Settings,
    renderer: R,
    store: S,
    stop: Arc<AtomicBool>,
) -> Result<CrawlReport, PagebinderError> {
    let state = prepare_state(&settings, &store)?;
    let mut coordinator =
        Coordinator::new(Arc::new(settings), state, renderer, store)?.with_stop_flag(stop);
    coordinator.run().await?;
    coordinator.finish().await
}
