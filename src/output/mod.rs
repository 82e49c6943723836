//! Output module for producing the final document and run report
//!
//! This module handles:
//! - Building the table of contents tree from the manifest
//! - Merging rendered pages into one PDF with lopdf
//! - Printing the end-of-run report

pub mod assembler;
pub mod pdf;
pub mod report;

pub use assembler::{AssembleOptions, AssembleSummary, Assembler, TocEntry, TocLayout, TocTree};
pub use pdf::{make_internal_link, LopdfMerger, MergePlan, PdfMerger, TocLine, TocPlan};
pub use report::{print_report, CrawlReport};

use crate::config::Settings;

/// Assembly options derived from the output settings
pub fn assemble_options(settings: &Settings) -> AssembleOptions {
    AssembleOptions {
        index: settings.output.index,
        toc_title: settings.output.toc_title.clone(),
        layout: TocLayout::default(),
    }
}
