//! Incremental Report Extraction
//!
//! Per-generation state that turns a growing HTML buffer into the sections
//! and insights not yet relayed to the client.

use std::collections::{HashMap, HashSet};

use assetworks_core::{Insight, ReportSection};

use super::insights::find_insights;
use super::sections::extract_sections;

/// Entries discovered by the latest chunk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractionUpdate {
    pub new_sections: Vec<ReportSection>,
    pub new_insights: Vec<Insight>,
}

impl ExtractionUpdate {
    pub fn is_empty(&self) -> bool {
        self.new_sections.is_empty() && self.new_insights.is_empty()
    }
}

/// Accumulates one generation's output and tracks what has been relayed.
///
/// The whole buffer is re-scanned on every chunk. Section identity is the
/// section id; insight identity is the byte offset of the insight block,
/// which cannot move because the buffer only grows. Insight ids are
/// assigned once, at first discovery.
#[derive(Debug, Default)]
pub struct ReportExtractor {
    buffer: String,
    sections: Vec<ReportSection>,
    relayed_section_ids: HashSet<String>,
    insights: Vec<Insight>,
    insight_ids: HashMap<usize, String>,
}

impl ReportExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return whatever it completed.
    pub fn push(&mut self, chunk: &str) -> ExtractionUpdate {
        if chunk.is_empty() {
            return ExtractionUpdate::default();
        }
        self.buffer.push_str(chunk);

        let mut update = ExtractionUpdate::default();

        for section in extract_sections(&self.buffer) {
            if self.relayed_section_ids.insert(section.id.clone()) {
                self.sections.push(section.clone());
                update.new_sections.push(section);
            }
        }

        for found in find_insights(&self.buffer) {
            if self.insight_ids.contains_key(&found.offset) {
                continue;
            }
            let id = Insight::synthetic_id(self.insights.len() + 1);
            self.insight_ids.insert(found.offset, id.clone());
            let insight = Insight {
                id,
                text: found.text,
                severity: found.severity,
            };
            self.insights.push(insight.clone());
            update.new_insights.push(insight);
        }

        update
    }

    /// Everything received so far, verbatim.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// All sections relayed so far, in discovery order.
    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    /// All insights relayed so far, in discovery order.
    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    /// Consume the extractor, returning buffer, sections and insights.
    pub fn into_parts(self) -> (String, Vec<ReportSection>, Vec<Insight>) {
        (self.buffer, self.sections, self.insights)
    }
}
