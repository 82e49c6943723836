//! Integration tests for the crawler
//!
//! These tests drive the coordinator with an in-memory renderer that serves a
//! fixed site map, so every crawl is deterministic. The content-type probe is
//! exercised against a wiremock server.

use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, ObjectId};
use pagebinder::config::{resolve_settings, FileConfig, Overrides, Settings};
use pagebinder::crawler::{
    discard_saved_state, prepare_state, run_crawl, Coordinator, HttpProbe, PageRenderer,
    RenderedPage,
};
use pagebinder::state::{CrawlStatus, ManifestEntry};
use pagebinder::storage::{open_store, JsonStateStore, StateStore};
use pagebinder::{PagebinderError, RenderError, StateError};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "https://site.test/";

/// A site map: canonical URL -> raw links found on that page
#[derive(Clone, Default)]
struct FakeSite {
    links: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    redirects: HashMap<String, String>,
}

impl FakeSite {
    fn new(base: &str, pages: &[(&str, &[&str])]) -> Self {
        let base = Url::parse(base).unwrap();
        let links = pages
            .iter()
            .map(|(page, links)| {
                let url = base.join(page).unwrap().to_string();
                (url, links.iter().map(|l| l.to_string()).collect())
            })
            .collect();
        Self {
            links,
            failing: HashSet::new(),
            redirects: HashMap::new(),
        }
    }

    fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Serves `to` when `from` is requested
    fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }
}

/// Deterministic renderer over a `FakeSite`
struct FakeRenderer {
    site: FakeSite,
    rendered: Arc<Mutex<Vec<String>>>,
    stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl FakeRenderer {
    fn new(site: &FakeSite) -> Self {
        Self {
            site: site.clone(),
            rendered: Arc::new(Mutex::new(Vec::new())),
            stop_after: None,
        }
    }

    /// Raises `flag` once `count` pages have been rendered
    fn stopping_after(mut self, count: usize, flag: Arc<AtomicBool>) -> Self {
        self.stop_after = Some((count, flag));
        self
    }

    fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.rendered)
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&mut self, url: &Url) -> Result<RenderedPage, RenderError> {
        let key = url.to_string();
        let count = {
            let mut rendered = self.rendered.lock().unwrap();
            rendered.push(key.clone());
            rendered.len()
        };
        if let Some((limit, flag)) = &self.stop_after {
            if count >= *limit {
                flag.store(true, Ordering::SeqCst);
            }
        }

        if self.site.failing.contains(&key) {
            return Err(RenderError::Timeout(30));
        }
        let landed = match self.site.redirects.get(&key) {
            Some(target) => Url::parse(target).unwrap(),
            None => url.clone(),
        };
        let url = &landed;
        let key = url.to_string();
        let links = self
            .site
            .links
            .get(&key)
            .ok_or_else(|| RenderError::Navigation(format!("no such page: {}", key)))?;

        let absolute: Vec<String> = links
            .iter()
            .filter_map(|l| url.join(l).ok())
            .map(String::from)
            .collect();

        Ok(RenderedPage {
            pdf: page_pdf(url.as_str(), &absolute),
            final_url: Some(landed.clone()),
            title: Some(url.path().to_string()),
            links: links.clone(),
        })
    }
}

/// One-page PDF tagged with its URL and carrying a URI link per outbound link
fn page_pdf(page_url: &str, links: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let annots: Vec<Object> = links
        .iter()
        .map(|link| {
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![0.into(), 0.into(), 100.into(), 20.into()],
                "A" => dictionary! {
                    "S" => "URI",
                    "URI" => Object::string_literal(link.as_str()),
                },
            }))
        })
        .collect();

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "PageUrl" => Object::string_literal(page_url),
        "Annots" => annots,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn settings_for(base: &str, dir: &Path, overrides: Overrides) -> Settings {
    let mut file = FileConfig::default();
    file.crawl.probe_content_type = false;
    file.output.path = dir.join("site.pdf");
    file.output.state_file = dir.join("state.json");
    resolve_settings(base, file, overrides).unwrap()
}

fn settings(dir: &Path, overrides: Overrides) -> Settings {
    settings_for(BASE, dir, overrides)
}

/// Runs a crawl to its end and returns the status and final manifest
async fn crawl(
    settings: Settings,
    renderer: FakeRenderer,
    stop: Arc<AtomicBool>,
) -> (CrawlStatus, Vec<ManifestEntry>, usize) {
    let store = open_store(&settings.output.state_file);
    let state = prepare_state(&settings, &store).unwrap();
    let mut coordinator = Coordinator::new(Arc::new(settings), state, renderer, store)
        .unwrap()
        .with_stop_flag(stop);
    let status = coordinator.run().await.unwrap();
    let manifest = coordinator.state().manifest.clone();
    let frontier = coordinator.state().frontier.len();
    coordinator.finish().await.unwrap();
    (status, manifest, frontier)
}

fn paths(manifest: &[ManifestEntry]) -> Vec<String> {
    manifest
        .iter()
        .map(|e| Url::parse(&e.url).unwrap().path().to_string())
        .collect()
}

fn wide_site() -> FakeSite {
    FakeSite::new(
        BASE,
        &[
            ("/", &["/a", "/b", "https://other.test/x"]),
            ("/a", &["/c", "/", "mailto:team@site.test"]),
            ("/b", &["/d", "/a#section"]),
            ("/c", &["/e"]),
            ("/d", &[]),
            ("/e", &[]),
        ],
    )
}

#[tokio::test]
async fn test_max_depth_limits_admission() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new(BASE, &[("/", &["/a"]), ("/a", &["/b"]), ("/b", &[])]);
    let settings = settings(
        dir.path(),
        Overrides {
            max_depth: Some(1),
            ..Overrides::default()
        },
    );

    let renderer = FakeRenderer::new(&site);
    let log = renderer.log();
    let (status, manifest, _) = crawl(settings, renderer, Arc::new(AtomicBool::new(false))).await;

    assert_eq!(status, CrawlStatus::Completed { capped: false });
    assert_eq!(paths(&manifest), vec!["/", "/a"]);
    assert_eq!(manifest[0].depth, 0);
    assert_eq!(manifest[1].depth, 1);
    assert!(!log.lock().unwrap().contains(&"https://site.test/b".to_string()));
}

#[tokio::test]
async fn test_max_pages_caps_crawl() {
    let dir = TempDir::new().unwrap();
    let settings = settings(
        dir.path(),
        Overrides {
            max_pages: Some(2),
            ..Overrides::default()
        },
    );

    let (status, manifest, frontier) = crawl(
        settings,
        FakeRenderer::new(&wide_site()),
        Arc::new(AtomicBool::new(false)),
    )
    .await;

    assert_eq!(status, CrawlStatus::Completed { capped: true });
    assert_eq!(manifest.len(), 2);
    assert!(frontier > 0);
}

#[tokio::test]
async fn test_include_filter() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new(
        BASE,
        &[
            ("/", &["/docs/a", "/blog/b"]),
            ("/docs/a", &[]),
            ("/blog/b", &[]),
        ],
    );
    let settings = settings(
        dir.path(),
        Overrides {
            include: vec![r".*\/docs\/.*".to_string()],
            ..Overrides::default()
        },
    );

    let renderer = FakeRenderer::new(&site);
    let log = renderer.log();
    let (_, manifest, _) = crawl(settings, renderer, Arc::new(AtomicBool::new(false))).await;

    // The base URL itself is always rendered
    assert_eq!(paths(&manifest), vec!["/", "/docs/a"]);
    assert!(!log.lock().unwrap().iter().any(|u| u.contains("/blog/")));
}

#[tokio::test]
async fn test_manifest_is_unique_same_domain_and_bfs_ordered() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), Overrides::default());

    let (_, manifest, _) = crawl(
        settings,
        FakeRenderer::new(&wide_site()),
        Arc::new(AtomicBool::new(false)),
    )
    .await;

    assert_eq!(paths(&manifest), vec!["/", "/a", "/b", "/c", "/d", "/e"]);

    let unique: HashSet<_> = manifest.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(unique.len(), manifest.len());
    assert!(manifest.iter().all(|e| e.url.starts_with(BASE)));

    let depths: Vec<u32> = manifest.iter().map(|e| e.depth).collect();
    assert!(depths.windows(2).all(|w| w[0] <= w[1]));
    let orders: Vec<u64> = manifest.iter().map(|e| e.discovery_order).collect();
    assert!(orders.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_resume_is_idempotent() {
    let reference_dir = TempDir::new().unwrap();
    let (_, reference, _) = crawl(
        settings(reference_dir.path(), Overrides::default()),
        FakeRenderer::new(&wide_site()),
        Arc::new(AtomicBool::new(false)),
    )
    .await;
    let key = |m: &[ManifestEntry]| -> Vec<(String, u32, Option<String>, u64)> {
        m.iter()
            .map(|e| (e.url.clone(), e.depth, e.parent_url.clone(), e.discovery_order))
            .collect()
    };

    for interrupt_after in 1..reference.len() {
        let dir = TempDir::new().unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let first = FakeRenderer::new(&wide_site()).stopping_after(interrupt_after, Arc::clone(&stop));
        let first_log = first.log();
        let (status, _, _) = crawl(settings(dir.path(), Overrides::default()), first, stop).await;
        assert_eq!(status, CrawlStatus::Paused);
        assert!(dir.path().join("state.json").is_file());
        assert!(!dir.path().join("site.pdf").exists());

        let resume = Overrides {
            resume: true,
            ..Overrides::default()
        };
        let second = FakeRenderer::new(&wide_site());
        let second_log = second.log();
        let (status, resumed, _) = crawl(
            settings(dir.path(), resume),
            second,
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        assert_eq!(status, CrawlStatus::Completed { capped: false });
        assert_eq!(key(&resumed), key(&reference), "interrupted after {}", interrupt_after);

        let total = first_log.lock().unwrap().len() + second_log.lock().unwrap().len();
        assert_eq!(total, reference.len(), "a page was rendered twice");

        // Completed crawls clean up after themselves
        assert!(dir.path().join("site.pdf").is_file());
        assert!(!dir.path().join("state.json").exists());
    }
}

#[tokio::test]
async fn test_corrupt_state_aborts_before_rendering() {
    let dir = TempDir::new().unwrap();
    let state_file = dir.path().join("state.json");
    std::fs::write(&state_file, b"{\"version\": 1, \"visited\": [").unwrap();
    std::fs::write(dir.path().join("site.pdf"), b"previous output").unwrap();

    let settings = settings(
        dir.path(),
        Overrides {
            resume: true,
            ..Overrides::default()
        },
    );
    let renderer = FakeRenderer::new(&wide_site());
    let log = renderer.log();
    let store = open_store(&settings.output.state_file);

    let err = run_crawl(settings, renderer, store, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PagebinderError::State(StateError::Corrupt { .. })
    ));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(
        std::fs::read(&state_file).unwrap(),
        b"{\"version\": 1, \"visited\": ["
    );
    assert_eq!(
        std::fs::read(dir.path().join("site.pdf")).unwrap(),
        b"previous output"
    );
}

#[tokio::test]
async fn test_resume_without_state_file() {
    let dir = TempDir::new().unwrap();
    let settings = settings(
        dir.path(),
        Overrides {
            resume: true,
            ..Overrides::default()
        },
    );
    let store = JsonStateStore::new(&settings.output.state_file);

    let err = prepare_state(&settings, &store).unwrap_err();
    assert!(matches!(err, PagebinderError::State(StateError::Missing(_))));
}

#[tokio::test]
async fn test_resume_with_different_settings_is_rejected() {
    let dir = TempDir::new().unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let renderer = FakeRenderer::new(&wide_site()).stopping_after(1, Arc::clone(&stop));
    crawl(settings(dir.path(), Overrides::default()), renderer, stop).await;

    let changed = settings(
        dir.path(),
        Overrides {
            resume: true,
            max_pages: Some(3),
            ..Overrides::default()
        },
    );
    let store = open_store(&changed.output.state_file);
    let err = prepare_state(&changed, &store).unwrap_err();
    assert!(matches!(
        err,
        PagebinderError::State(StateError::SettingsMismatch)
    ));
}

#[tokio::test]
async fn test_consecutive_failures_abort() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new(
        BASE,
        &[("/", &["/a", "/b", "/c"]), ("/a", &[]), ("/b", &[]), ("/c", &[])],
    )
    .failing("https://site.test/a")
    .failing("https://site.test/b")
    .failing("https://site.test/c");

    let mut file = FileConfig::default();
    file.crawl.probe_content_type = false;
    file.crawl.failure_threshold = 2;
    file.output.path = dir.path().join("site.pdf");
    file.output.state_file = dir.path().join("state.json");
    let settings = resolve_settings(BASE, file, Overrides::default()).unwrap();

    let store = open_store(&settings.output.state_file);
    let report = run_crawl(
        settings,
        FakeRenderer::new(&site),
        store,
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .unwrap();

    assert!(matches!(report.status, CrawlStatus::Aborted { .. }));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.pages_rendered, 1);
    assert_eq!(report.pages_failed, 2);
    assert_eq!(report.frontier_remaining, 1);
    assert!(report.output_path.is_none());
    assert!(dir.path().join("state.json").is_file());
}

#[tokio::test]
async fn test_single_failure_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let site = wide_site().failing("https://site.test/b");
    let (status, manifest, _) = crawl(
        settings(dir.path(), Overrides::default()),
        FakeRenderer::new(&site),
        Arc::new(AtomicBool::new(false)),
    )
    .await;

    assert_eq!(status, CrawlStatus::Completed { capped: false });
    // /d was only reachable through /b
    assert_eq!(paths(&manifest), vec!["/", "/a", "/c", "/e"]);
}

/// Maps every page object id of `doc` to its zero-based index
fn page_indices(doc: &Document) -> HashMap<ObjectId, usize> {
    doc.get_pages()
        .into_values()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect()
}

fn page_url(doc: &Document, page: ObjectId) -> String {
    match doc.get_dictionary(page).unwrap().get(b"PageUrl").unwrap() {
        Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
        other => panic!("unexpected PageUrl {:?}", other),
    }
}

fn link_dests(doc: &Document, page: ObjectId) -> Vec<ObjectId> {
    let Ok(annots) = doc.get_dictionary(page).unwrap().get(b"Annots") else {
        return Vec::new();
    };
    annots
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| {
            let annot = doc.get_dictionary(a.as_reference().unwrap()).unwrap();
            let dest = annot.get(b"Dest").ok()?.as_array().unwrap();
            Some(dest[0].as_reference().unwrap())
        })
        .collect()
}

#[tokio::test]
async fn test_toc_round_trip() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new(
        BASE,
        &[
            ("/", &["/a", "/b"]),
            ("/a", &["/a/x", "/b"]),
            ("/b", &["https://other.test/"]),
            ("/a/x", &[]),
        ],
    );
    let settings = settings(
        dir.path(),
        Overrides {
            index: true,
            ..Overrides::default()
        },
    );
    let output = settings.output.path.clone();
    let store = open_store(&settings.output.state_file);

    let report = run_crawl(
        settings,
        FakeRenderer::new(&site),
        store,
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .unwrap();
    assert_eq!(report.output_path.as_deref(), Some(output.as_path()));

    let doc = Document::load(&output).unwrap();
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let indices = page_indices(&doc);

    // One TOC page followed by the four rendered pages in BFS order
    assert_eq!(pages.len(), 5);
    let body: Vec<String> = pages[1..].iter().map(|&p| page_url(&doc, p)).collect();
    assert_eq!(
        body,
        vec![
            "https://site.test/",
            "https://site.test/a",
            "https://site.test/b",
            "https://site.test/a/x",
        ]
    );

    // TOC entries run by depth, then discovery order, and land on the matching page
    let toc_targets: Vec<String> = link_dests(&doc, pages[0])
        .into_iter()
        .map(|dest| {
            assert!(indices[&dest] >= 1, "TOC link points into the TOC");
            page_url(&doc, dest)
        })
        .collect();
    assert_eq!(
        toc_targets,
        vec![
            "https://site.test/",
            "https://site.test/a",
            "https://site.test/b",
            "https://site.test/a/x",
        ]
    );

    // In-page links to rendered pages became internal jumps
    let from_root: Vec<String> = link_dests(&doc, pages[1])
        .into_iter()
        .map(|dest| page_url(&doc, dest))
        .collect();
    assert_eq!(from_root, vec!["https://site.test/a", "https://site.test/b"]);

    // Links outside the manifest stay external
    assert!(link_dests(&doc, pages[3]).is_empty());
}

#[tokio::test]
async fn test_without_index_pages_follow_manifest_order() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), Overrides::default());
    let output = settings.output.path.clone();
    let store = open_store(&settings.output.state_file);

    run_crawl(
        settings,
        FakeRenderer::new(&wide_site()),
        store,
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .unwrap();

    let doc = Document::load(&output).unwrap();
    let urls: Vec<String> = doc
        .get_pages()
        .into_values()
        .map(|p| page_url(&doc, p))
        .collect();
    assert_eq!(urls.len(), 6);
    assert_eq!(urls[0], BASE);
    assert_eq!(urls[5], "https://site.test/e");
}

#[tokio::test]
async fn test_content_type_check_skips_non_html_pages() {
    let mock_server = MockServer::start().await;
    let base = format!("{}/", mock_server.uri());

    Mock::given(method("HEAD"))
        .and(path("/manual.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .mount(&mock_server)
        .await;

    // HEAD not allowed: inconclusive, so the page is rendered anyway
    Mock::given(method("HEAD"))
        .and(path("/guide"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&mock_server)
        .await;

    Mock::given(method("HEAD"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let site = FakeSite::new(
        &base,
        &[
            ("/", &["/manual.pdf", "/guide"]),
            ("/guide", &[]),
            ("/manual.pdf", &[]),
        ],
    );

    let dir = TempDir::new().unwrap();
    let settings = settings_for(&base, dir.path(), Overrides::default());
    let store = open_store(&settings.output.state_file);
    let state = prepare_state(&settings, &store).unwrap();

    let renderer = FakeRenderer::new(&site);
    let log = renderer.log();
    let mut coordinator = Coordinator::new(Arc::new(settings), state, renderer, store)
        .unwrap()
        .with_probe(Some(HttpProbe::with_timeout(5).unwrap()));

    let status = coordinator.run().await.unwrap();
    assert_eq!(status, CrawlStatus::Completed { capped: false });

    let state = coordinator.state();
    assert_eq!(paths(&state.manifest), vec!["/", "/guide"]);
    assert_eq!(state.skipped.len(), 1);
    assert!(state.skipped[0].url.ends_with("/manual.pdf"));
    assert!(state.skipped[0].reason.contains("application/pdf"));
    assert!(!log.lock().unwrap().iter().any(|u| u.ends_with("/manual.pdf")));
}

#[tokio::test]
async fn test_fresh_crawl_keeps_old_state_until_first_page() {
    let dir = TempDir::new().unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let renderer = FakeRenderer::new(&wide_site()).stopping_after(2, Arc::clone(&stop));
    crawl(settings(dir.path(), Overrides::default()), renderer, stop).await;

    let state_file = dir.path().join("state.json");
    let before = std::fs::read(&state_file).unwrap();

    // A fresh run interrupted before its first page leaves the old state alone
    let stop = Arc::new(AtomicBool::new(true));
    let (status, manifest, _) = crawl(
        settings(dir.path(), Overrides::default()),
        FakeRenderer::new(&wide_site()),
        stop,
    )
    .await;
    assert_eq!(status, CrawlStatus::Paused);
    assert!(manifest.is_empty());
    assert_eq!(std::fs::read(&state_file).unwrap(), before);

    let store = JsonStateStore::new(&state_file);
    assert_eq!(store.load().unwrap().pages_rendered, 2);
}

#[tokio::test]
async fn test_redirect_target_is_not_rendered_again() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new(
        BASE,
        &[
            ("/", &["/old", "/a"]),
            ("/a", &["/new"]),
            ("/new", &["/a"]),
        ],
    )
    .redirect("https://site.test/old", "https://site.test/new");

    let renderer = FakeRenderer::new(&site);
    let log = renderer.log();
    let (status, manifest, _) = crawl(
        settings(dir.path(), Overrides::default()),
        renderer,
        Arc::new(AtomicBool::new(false)),
    )
    .await;

    assert_eq!(status, CrawlStatus::Completed { capped: false });
    assert_eq!(paths(&manifest), vec!["/", "/old", "/a"]);
    assert!(!log.lock().unwrap().contains(&"https://site.test/new".to_string()));
}

/// Pauses a crawl after two pages and returns its scratch directory
async fn paused_crawl(dir: &Path) -> std::path::PathBuf {
    let stop = Arc::new(AtomicBool::new(false));
    let renderer = FakeRenderer::new(&wide_site()).stopping_after(2, Arc::clone(&stop));
    let (status, _, _) = crawl(settings(dir, Overrides::default()), renderer, stop).await;
    assert_eq!(status, CrawlStatus::Paused);

    let scratch = JsonStateStore::new(&dir.join("state.json"))
        .load()
        .unwrap()
        .scratch_dir;
    assert!(scratch.join("page_0000.pdf").is_file());
    scratch
}

#[tokio::test]
async fn test_fresh_crawl_removes_previous_scratch_pages() {
    let dir = TempDir::new().unwrap();
    let old_scratch = paused_crawl(dir.path()).await;

    let stop = Arc::new(AtomicBool::new(false));
    let renderer = FakeRenderer::new(&wide_site()).stopping_after(1, Arc::clone(&stop));
    crawl(settings(dir.path(), Overrides::default()), renderer, stop).await;

    let state = JsonStateStore::new(&dir.path().join("state.json")).load().unwrap();
    assert_ne!(state.scratch_dir, old_scratch);
    assert!(!old_scratch.exists());
    assert!(state.scratch_dir.is_dir());
}

#[tokio::test]
async fn test_fresh_crawl_over_corrupt_state_removes_its_pages() {
    let dir = TempDir::new().unwrap();
    let old_scratch = paused_crawl(dir.path()).await;

    // Truncate the manifest so the state no longer loads
    let state_file = dir.path().join("state.json");
    let mut raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&state_file).unwrap()).unwrap();
    raw["manifest"] = serde_json::Value::Array(Vec::new());
    std::fs::write(&state_file, serde_json::to_vec(&raw).unwrap()).unwrap();
    assert!(JsonStateStore::new(&state_file).load().is_err());

    crawl(
        settings(dir.path(), Overrides::default()),
        FakeRenderer::new(&wide_site()),
        Arc::new(AtomicBool::new(false)),
    )
    .await;

    assert!(!old_scratch.exists());
    assert!(dir.path().join("site.pdf").is_file());
}

#[tokio::test]
async fn test_discard_saved_state_removes_pages() {
    let dir = TempDir::new().unwrap();
    let old_scratch = paused_crawl(dir.path()).await;

    let mut store = JsonStateStore::new(&dir.path().join("state.json"));
    discard_saved_state(&mut store).unwrap();

    assert!(!store.exists());
    assert!(!old_scratch.exists());
    // Nothing left to discard is fine
    discard_saved_state(&mut store).unwrap();
}
