//! Insight Extraction
//!
//! Finds fully-closed blocks whose class marks them as insights and turns
//! them into classified plain-text observations.

use assetworks_core::{Insight, Severity};

use super::html::{attribute, find_blocks, strip_tags};

/// Tags that can carry an insight.
const INSIGHT_TAGS: &[&str] = &["div", "section", "aside", "p", "li"];

/// An insight block located in the buffer, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightMatch {
    /// Byte offset of the block's opening tag; stable as the buffer grows
    pub offset: usize,
    pub text: String,
    pub severity: Severity,
}

fn is_insight_start(tag: &str, attrs: &[(String, String)]) -> bool {
    INSIGHT_TAGS.contains(&tag)
        && attribute(attrs, "class").is_some_and(|class| class.to_lowercase().contains("insight"))
}

/// Locate every non-empty insight block in `html`, in document order.
pub fn find_insights(html: &str) -> Vec<InsightMatch> {
    find_blocks(html, is_insight_start)
        .into_iter()
        .filter_map(|block| {
            let raw = &html[block.outer.clone()];
            let text = strip_tags(raw).trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(InsightMatch {
                offset: block.outer.start,
                text,
                severity: Severity::classify(raw),
            })
        })
        .collect()
}

/// Extract every insight in `html` with sequential ids starting at 1.
pub fn extract_insights(html: &str) -> Vec<Insight> {
    find_insights(html)
        .into_iter()
        .enumerate()
        .map(|(i, m)| Insight {
            id: Insight::synthetic_id(i + 1),
            text: m.text,
            severity: m.severity,
        })
        .collect()
}
