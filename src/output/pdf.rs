//! PDF merge primitive backed by lopdf
//!
//! `LopdfMerger` concatenates single-page-set documents, renders the table of
//! contents as real PDF pages with Link annotations, and rewrites URI links
//! that point at merged pages into internal destinations.

use crate::output::assembler::{TocLayout, PAGE_HEIGHT, PAGE_WIDTH};
use crate::AssembleError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

/// Page attributes a page may inherit from its page tree ancestors
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// One rendered TOC line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocLine {
    pub label: String,
    pub level: usize,

    /// Absolute zero-based page index in the merged document
    pub target: Option<usize>,
}

/// Pre-paginated table of contents
#[derive(Debug, Clone)]
pub struct TocPlan {
    pub title: String,
    pub layout: TocLayout,
    pub pages: Vec<Vec<TocLine>>,
}

/// Everything a merger needs to produce the final document
pub struct MergePlan<'a> {
    /// Source documents, in output order
    pub sources: Vec<&'a Path>,

    /// TOC pages to prepend
    pub toc: Option<TocPlan>,

    /// Maps a link URI to an absolute page index, or `None` to leave it external
    pub resolve_link: &'a dyn Fn(&str) -> Option<usize>,
}

/// Low-level PDF operations used by the assembler
pub trait PdfMerger {
    /// Number of pages in a source document
    fn page_count(&self, source: &Path) -> Result<usize, AssembleError>;

    /// Produces the merged document bytes
    fn merge(&self, plan: &MergePlan<'_>) -> Result<Vec<u8>, AssembleError>;
}

/// Builds a Link annotation jumping to `target_page`
pub fn make_internal_link(target_page: ObjectId, rect: [i64; 4]) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
        "Dest" => vec![Object::Reference(target_page), Object::Name(b"Fit".to_vec())],
    }
}

/// Byte for `c` in WinAnsiEncoding, the encoding of the TOC font
pub fn winansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        _ => return None,
    };
    Some(byte)
}

/// Returns true if at least half of the visible characters can be drawn
pub fn is_mostly_encodable(label: &str) -> bool {
    let visible = label.chars().filter(|c| !c.is_whitespace());
    let (total, encodable) = visible.fold((0usize, 0usize), |(total, ok), c| {
        (total + 1, ok + usize::from(winansi_byte(c).is_some()))
    });
    encodable * 2 >= total
}

/// Encodes a label for the TOC font, truncated to `max_chars`
fn pdf_safe_label(label: &str, max_chars: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = label
        .chars()
        .map(|c| winansi_byte(c).unwrap_or(b'?'))
        .collect();
    if bytes.len() > max_chars {
        bytes.truncate(max_chars.saturating_sub(3));
        bytes.extend_from_slice(b"...");
    }
    bytes
}

fn type_name(object: &Object) -> Option<&[u8]> {
    match object.as_dict().ok()?.get(b"Type").ok()? {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Returns the URI of a Link annotation with a URI action
fn link_uri(doc: &Document, annot: &Dictionary) -> Option<String> {
    match annot.get(b"Subtype").ok()? {
        Object::Name(name) if name.as_slice() == b"Link" => {}
        _ => return None,
    }

    let action = match annot.get(b"A").ok()? {
        Object::Dictionary(dict) => dict,
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        _ => return None,
    };
    match action.get(b"S").ok()? {
        Object::Name(name) if name.as_slice() == b"URI" => {}
        _ => return None,
    }
    match action.get(b"URI").ok()? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Copies inherited attributes onto the page so it survives re-parenting
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) -> Result<(), AssembleError> {
    for key in INHERITABLE {
        if doc.get_dictionary(page_id)?.has(key) {
            continue;
        }

        let mut current = doc
            .get_dictionary(page_id)?
            .get(b"Parent")
            .and_then(Object::as_reference)
            .ok();
        let mut found = None;
        let mut hops = 0;
        while let Some(id) = current {
            let node = doc.get_dictionary(id)?;
            if let Ok(value) = node.get(key) {
                found = Some(value.clone());
                break;
            }
            current = node.get(b"Parent").and_then(Object::as_reference).ok();
            hops += 1;
            if hops > 64 {
                return Err(AssembleError::Structure("page tree is too deep or cyclic".into()));
            }
        }

        if let Some(value) = found {
            doc.get_dictionary_mut(page_id)?.set(key.to_vec(), value);
        }
    }
    Ok(())
}

/// Merger implementation using lopdf
#[derive(Debug, Clone, Default)]
pub struct LopdfMerger;

impl LopdfMerger {
    pub fn new() -> Self {
        Self
    }

    /// Moves all pages of `source` into `out`, returning their ids in order
    fn import(&self, out: &mut Document, source: &Path) -> Result<Vec<ObjectId>, AssembleError> {
        let mut doc = Document::load(source)?;
        doc.renumber_objects_with(out.max_id + 1);

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(AssembleError::Structure(format!(
                "{} has no pages",
                source.display()
            )));
        }
        for &page_id in &page_ids {
            inherit_page_attributes(&mut doc, page_id)?;
        }

        if let Some(max) = doc.objects.keys().map(|(id, _)| *id).max() {
            out.max_id = out.max_id.max(max);
        }

        for (id, object) in doc.objects {
            match type_name(&object) {
                Some(b"Catalog") | Some(b"Pages") => continue,
                _ => {
                    out.objects.insert(id, object);
                }
            }
        }

        Ok(page_ids)
    }

    /// Turns URI links to merged pages into internal destinations
    fn rewrite_links(
        &self,
        out: &mut Document,
        body_pages: &[ObjectId],
        all_pages: &[ObjectId],
        resolve: &dyn Fn(&str) -> Option<usize>,
    ) -> Result<usize, AssembleError> {
        let mut rewritten = 0;

        for &page_id in body_pages {
            let annot_ids: Vec<ObjectId> = match out.get_dictionary(page_id)?.get(b"Annots") {
                Ok(Object::Array(items)) => {
                    items.iter().filter_map(|o| o.as_reference().ok()).collect()
                }
                Ok(Object::Reference(id)) => out
                    .get_object(*id)?
                    .as_array()?
                    .iter()
                    .filter_map(|o| o.as_reference().ok())
                    .collect(),
                _ => Vec::new(),
            };

            for annot_id in annot_ids {
                let uri = match out.get_dictionary(annot_id) {
                    Ok(annot) => link_uri(out, annot),
                    Err(_) => None,
                };
                let Some(target) = uri.as_deref().and_then(resolve) else {
                    continue;
                };
                let Some(&target_page) = all_pages.get(target) else {
                    continue;
                };

                let annot = out.get_dictionary_mut(annot_id)?;
                annot.remove(b"A");
                annot.set(
                    "Dest",
                    vec![Object::Reference(target_page), Object::Name(b"Fit".to_vec())],
                );
                rewritten += 1;
            }
        }

        Ok(rewritten)
    }

    /// Writes one TOC page into the reserved object id
    #[allow(clippy::too_many_arguments)]
    fn build_toc_page(
        &self,
        out: &mut Document,
        page_id: ObjectId,
        pages_id: ObjectId,
        font_id: ObjectId,
        plan: &TocPlan,
        lines: &[TocLine],
        all_pages: &[ObjectId],
    ) -> Result<(), AssembleError> {
        let layout = &plan.layout;
        let top = PAGE_HEIGHT - layout.margin;
        let right = PAGE_WIDTH - layout.margin;
        let char_width = (layout.font_size / 2).max(1);

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), Object::Integer(layout.title_size)]),
            Operation::new(
                "Td",
                vec![Object::Integer(layout.margin), Object::Integer(top - layout.title_size)],
            ),
            Operation::new(
                "Tj",
                vec![Object::string_literal(pdf_safe_label(&plan.title, 60))],
            ),
            Operation::new("ET", vec![]),
        ];
        let mut annots = Vec::new();

        let first_line = top - layout.title_block() - layout.line_height;
        for (i, line) in lines.iter().enumerate() {
            let x = layout.margin + layout.indent(line.level);
            let y = first_line - (i as i64) * layout.line_height;

            let number = line.target.map(|t| (t + 1).to_string()).unwrap_or_default();
            let number_width = number.len() as i64 * char_width;
            let label_room = (right - x - number_width - 2 * char_width).max(char_width);
            let label = pdf_safe_label(&line.label, (label_room / char_width) as usize);

            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(layout.font_size)]),
                Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
                Operation::new("Tj", vec![Object::string_literal(label)]),
                Operation::new("ET", vec![]),
            ]);

            let Some(target) = line.target else {
                continue;
            };
            let target_page = all_pages.get(target).copied().ok_or_else(|| {
                AssembleError::Structure(format!("TOC target page {} does not exist", target + 1))
            })?;

            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(layout.font_size)]),
                Operation::new(
                    "Td",
                    vec![Object::Integer(right - number_width), Object::Integer(y)],
                ),
                Operation::new("Tj", vec![Object::string_literal(number)]),
                Operation::new("ET", vec![]),
            ]);

            let rect = [x, y - 4, right, y + layout.font_size + 1];
            annots.push(Object::Reference(
                out.add_object(make_internal_link(target_page, rect)),
            ));
        }

        let content = Content { operations };
        let content_id = out.add_object(Stream::new(Dictionary::new(), content.encode()?));

        let page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Annots" => annots,
        };
        out.objects.insert(page_id, Object::Dictionary(page));
        Ok(())
    }
}

impl PdfMerger for LopdfMerger {
    fn page_count(&self, source: &Path) -> Result<usize, AssembleError> {
        Ok(Document::load(source)?.get_pages().len())
    }

    fn merge(&self, plan: &MergePlan<'_>) -> Result<Vec<u8>, AssembleError> {
        let mut out = Document::with_version("1.7");
        let pages_id = out.new_object_id();

        // TOC pages are reserved up front so links can point forward
        let toc_page_ids: Vec<ObjectId> = plan
            .toc
            .as_ref()
            .map(|toc| toc.pages.iter().map(|_| out.new_object_id()).collect())
            .unwrap_or_default();

        let mut body_pages = Vec::new();
        for source in &plan.sources {
            body_pages.extend(self.import(&mut out, source)?);
        }

        let all_pages: Vec<ObjectId> = toc_page_ids
            .iter()
            .chain(body_pages.iter())
            .copied()
            .collect();

        for &page_id in &body_pages {
            out.get_dictionary_mut(page_id)?.set("Parent", pages_id);
        }

        let rewritten = self.rewrite_links(&mut out, &body_pages, &all_pages, plan.resolve_link)?;
        tracing::debug!("Rewrote {} links to internal destinations", rewritten);

        if let Some(toc) = &plan.toc {
            let font_id = out.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
            for (lines, &page_id) in toc.pages.iter().zip(&toc_page_ids) {
                self.build_toc_page(&mut out, page_id, pages_id, font_id, toc, lines, &all_pages)?;
            }
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => all_pages.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            "Count" => Object::Integer(all_pages.len() as i64),
        };
        out.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = out.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        out.trailer.set("Root", catalog_id);

        out.prune_objects();
        out.compress();

        let mut bytes = Vec::new();
        out.save_to(&mut bytes)?;
        Ok(bytes)
    }
}
