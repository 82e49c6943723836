//! Document assembly and table of contents
//!
//! The assembler decides *what* goes where: page order, TOC entries, TOC
//! pagination and link targets. Byte-level PDF work is delegated to a
//! `PdfMerger`.

use crate::output::pdf::{is_mostly_encodable, MergePlan, PdfMerger, TocLine, TocPlan};
use crate::state::ManifestEntry;
use crate::storage::write_atomic;
use crate::url::UrlClassifier;
use crate::AssembleError;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use url::Url;

/// A4 page size in PDF points
pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;

/// One line of the table of contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub url: String,
    pub label: String,

    /// Tree depth; the root is level 0
    pub level: usize,

    /// Position in the manifest, or `None` for a virtual root
    pub manifest_index: Option<usize>,
}

/// Hierarchy of rendered pages built from first-discoverer links
#[derive(Debug, Clone)]
pub struct TocTree {
    entries: Vec<TocEntry>,
}

impl TocTree {
    /// Builds the tree for `manifest`
    ///
    /// The root is the manifest entry for `base_url`. If the base URL was not
    /// rendered, a virtual root without a link target takes its place. Pages
    /// whose parent is not in the manifest hang off the root.
    ///
    /// Entries after the root are ordered by crawl depth, then discovery
    /// order. `level` follows the parent links and only drives indentation.
    pub fn build(manifest: &[ManifestEntry], base_url: &Url) -> Self {
        let base = base_url.as_str();
        let index_of: HashMap<&str, usize> = manifest
            .iter()
            .enumerate()
            .map(|(i, e)| (e.url.as_str(), i))
            .collect();
        let root = index_of.get(base).copied();

        let mut children: HashMap<Option<usize>, Vec<usize>> = HashMap::new();
        for (i, entry) in manifest.iter().enumerate() {
            if Some(i) == root {
                continue;
            }
            let parent = entry
                .parent_url
                .as_deref()
                .and_then(|p| index_of.get(p).copied())
                .filter(|&p| p != i);
            // Orphans attach to the root
            let parent = parent.or(root);
            children.entry(parent).or_default().push(i);
        }

        // Tree levels, walked breadth-first from the root
        let mut levels: HashMap<usize, usize> = HashMap::new();
        let mut queue: VecDeque<(Option<usize>, usize)> = VecDeque::from([(root, 0)]);
        while let Some((node, level)) = queue.pop_front() {
            for &kid in children.get(&node).into_iter().flatten() {
                if levels.contains_key(&kid) {
                    continue;
                }
                levels.insert(kid, level + 1);
                queue.push_back((Some(kid), level + 1));
            }
        }

        let mut entries = Vec::with_capacity(manifest.len() + 1);
        match root {
            Some(i) => entries.push(Self::entry(manifest, i, 0)),
            None => entries.push(TocEntry {
                url: base.to_string(),
                label: base.to_string(),
                level: 0,
                manifest_index: None,
            }),
        }

        let mut rest: Vec<usize> = (0..manifest.len()).filter(|&i| Some(i) != root).collect();
        rest.sort_by_key(|&i| (manifest[i].depth, manifest[i].discovery_order));
        // Parent cycles in a hand-edited manifest leave entries without a level
        entries.extend(
            rest.into_iter()
                .map(|i| Self::entry(manifest, i, levels.get(&i).copied().unwrap_or(1))),
        );

        Self { entries }
    }

    fn entry(manifest: &[ManifestEntry], index: usize, level: usize) -> TocEntry {
        let entry = &manifest[index];
        TocEntry {
            url: entry.url.clone(),
            label: toc_label(entry),
            level,
            manifest_index: Some(index),
        }
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }
}

/// Title when known and printable in the TOC font, else the URL path
pub fn toc_label(entry: &ManifestEntry) -> String {
    if let Some(title) = entry
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty() && is_mostly_encodable(t))
    {
        return title.to_string();
    }
    match Url::parse(&entry.url) {
        Ok(url) => url.path().to_string(),
        Err(_) => entry.url.clone(),
    }
}

/// Fixed-size pagination of TOC lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocLayout {
    pub margin: i64,
    pub title_size: i64,
    pub font_size: i64,
    pub line_height: i64,
}

impl Default for TocLayout {
    fn default() -> Self {
        Self {
            margin: 56,
            title_size: 18,
            font_size: 11,
            line_height: 16,
        }
    }
}

impl TocLayout {
    /// Space reserved under the top margin for the title on every TOC page
    pub fn title_block(&self) -> i64 {
        self.title_size * 2
    }

    pub fn lines_per_page(&self) -> usize {
        let usable = PAGE_HEIGHT - 2 * self.margin - self.title_block();
        (usable / self.line_height).max(1) as usize
    }

    /// Number of pages needed for `lines` entries; at least one
    pub fn page_count(&self, lines: usize) -> usize {
        lines.div_ceil(self.lines_per_page()).max(1)
    }

    /// Indentation in points for a tree level
    pub fn indent(&self, level: usize) -> i64 {
        (level.min(12) as i64) * 14
    }
}

/// Options for one assembly
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub index: bool,
    pub toc_title: String,
    pub layout: TocLayout,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            index: false,
            toc_title: "Table of Contents".to_string(),
            layout: TocLayout::default(),
        }
    }
}

/// What was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleSummary {
    pub output_path: PathBuf,
    pub toc_pages: usize,
    pub total_pages: usize,
    pub documents_merged: usize,
}

/// Merges the manifest into the final document
pub struct Assembler<M: PdfMerger> {
    merger: M,
    options: AssembleOptions,
}

impl<M: PdfMerger> Assembler<M> {
    pub fn new(merger: M, options: AssembleOptions) -> Self {
        Self { merger, options }
    }

    /// Writes the merged document to `output`
    ///
    /// Pages appear strictly in manifest order. With an index, TOC pages are
    /// prepended and every target is shifted by the TOC page count. In-page
    /// links to rendered URLs become internal jumps; all other links stay
    /// external.
    pub fn assemble(
        &self,
        manifest: &[ManifestEntry],
        classifier: &UrlClassifier,
        output: &Path,
    ) -> Result<AssembleSummary, AssembleError> {
        if manifest.is_empty() {
            return Err(AssembleError::EmptyManifest);
        }

        let mut page_counts = Vec::with_capacity(manifest.len());
        for entry in manifest {
            if !entry.pdf_ref.is_file() {
                return Err(AssembleError::MissingPage(entry.pdf_ref.clone()));
            }
            page_counts.push(self.merger.page_count(&entry.pdf_ref)?);
        }

        let toc = if self.options.index {
            let tree = TocTree::build(manifest, classifier.base_url());
            Some(tree)
        } else {
            None
        };
        let toc_pages = toc
            .as_ref()
            .map(|t| self.options.layout.page_count(t.entries().len()))
            .unwrap_or(0);

        // Absolute first page of every manifest entry
        let mut starts = Vec::with_capacity(manifest.len());
        let mut next = toc_pages;
        for count in &page_counts {
            starts.push(next);
            next += count;
        }
        let total_pages = next;

        let targets: HashMap<&str, usize> = manifest
            .iter()
            .zip(&starts)
            .map(|(e, &s)| (e.url.as_str(), s))
            .collect();
        let resolve = |uri: &str| -> Option<usize> {
            let key = classifier.canonical_key(uri)?;
            targets.get(key.as_str()).copied()
        };

        let toc_plan = toc.map(|tree| {
            let lines: Vec<TocLine> = tree
                .entries()
                .iter()
                .map(|e| TocLine {
                    label: e.label.clone(),
                    level: e.level,
                    target: e.manifest_index.map(|i| starts[i]),
                })
                .collect();
            let per_page = self.options.layout.lines_per_page();
            TocPlan {
                title: self.options.toc_title.clone(),
                layout: self.options.layout,
                pages: lines.chunks(per_page).map(<[TocLine]>::to_vec).collect(),
            }
        });

        let sources: Vec<&Path> = manifest.iter().map(|e| e.pdf_ref.as_path()).collect();
        let plan = MergePlan {
            sources,
            toc: toc_plan,
            resolve_link: &resolve,
        };

        let bytes = self.merger.merge(&plan)?;
        write_atomic(output, &bytes)?;

        tracing::info!(
            "Wrote {} ({} pages, {} TOC pages)",
            output.display(),
            total_pages,
            toc_pages
        );

        Ok(AssembleSummary {
            output_path: output.to_path_buf(),
            toc_pages,
            total_pages,
            documents_merged: manifest.len(),
        })
    }
}
