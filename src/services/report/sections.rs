//! Section Extraction
//!
//! Finds fully-closed, identifier-tagged section blocks in report HTML.

use std::collections::HashSet;

use assetworks_core::{ReportSection, SectionType, UNTITLED_SECTION};

use super::html::{attribute, find_blocks, strip_tags};

/// Tags that can carry a report section.
const SECTION_TAGS: &[&str] = &["div", "section", "article"];

/// Heading tags that provide a section title.
const TITLE_TAGS: &[&str] = &["h2", "h3", "h4"];

/// Prefix an `id` attribute needs to count as a section identifier.
const SECTION_ID_PREFIX: &str = "section_";

/// Section identifier carried by a start tag, if any.
fn section_id(attrs: &[(String, String)]) -> Option<&str> {
    if let Some(id) = attribute(attrs, "data-section-id") {
        let id = id.trim();
        if !id.is_empty() {
            return Some(id);
        }
    }
    attribute(attrs, "id")
        .map(str::trim)
        .filter(|id| id.starts_with(SECTION_ID_PREFIX))
}

fn is_section_start(tag: &str, attrs: &[(String, String)]) -> bool {
    SECTION_TAGS.contains(&tag) && section_id(attrs).is_some()
}

/// Plain text of the first h2-h4 in a fragment, or the untitled placeholder.
pub fn section_title(fragment: &str) -> String {
    find_blocks(fragment, |tag, _| TITLE_TAGS.contains(&tag))
        .first()
        .map(|heading| strip_tags(&fragment[heading.inner.clone()]).trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED_SECTION.to_string())
}

/// Extract every complete section in `html`, in document order.
///
/// A section whose id was already seen earlier in the document is skipped
/// and does not consume an `order` value.
pub fn extract_sections(html: &str) -> Vec<ReportSection> {
    let mut seen = HashSet::new();
    let mut sections = Vec::new();

    for block in find_blocks(html, is_section_start) {
        let Some(id) = section_id(&block.attrs) else {
            continue;
        };

        if block.nested > 0 {
            tracing::debug!(
                section_id = id,
                nested = block.nested,
                "Nested section blocks folded into enclosing section"
            );
        }

        if !seen.insert(id.to_string()) {
            tracing::debug!(section_id = id, "Skipping duplicate section id");
            continue;
        }

        let fragment = &html[block.outer.clone()];
        sections.push(ReportSection {
            id: id.to_string(),
            section_type: SectionType::from_section_id(id),
            title: section_title(&html[block.inner.clone()]),
            html_content: fragment.to_string(),
            order: sections.len() as u32,
        });
    }

    sections
}
