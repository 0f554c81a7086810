//! Report Structure Types
//!
//! Sections and insights recognised inside generated report HTML. These are
//! relayed to clients while a report streams and persisted with the final
//! report, so their JSON shape is part of the wire protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Title used when a section carries no usable heading.
pub const UNTITLED_SECTION: &str = "Untitled Section";

/// Kind of report component a section represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Chart,
    Table,
    Text,
    Metric,
    Insight,
}

impl SectionType {
    /// Infer the section type from its identifier.
    ///
    /// Substrings are checked case-insensitively in priority order
    /// chart, table, metric, insight; anything else is `Text`.
    pub fn from_section_id(id: &str) -> Self {
        let id = id.to_lowercase();
        if id.contains("chart") {
            SectionType::Chart
        } else if id.contains("table") {
            SectionType::Table
        } else if id.contains("metric") {
            SectionType::Metric
        } else if id.contains("insight") {
            SectionType::Insight
        } else {
            SectionType::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Chart => "chart",
            SectionType::Table => "table",
            SectionType::Text => "text",
            SectionType::Metric => "metric",
            SectionType::Insight => "insight",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity classification of an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Success,
}

impl Severity {
    /// Classify the raw (untrimmed) HTML of an insight block.
    ///
    /// First matching rule wins: critical/danger, then warning, then
    /// success/positive, otherwise info.
    pub fn classify(raw_html: &str) -> Self {
        let html = raw_html.to_lowercase();
        if html.contains("critical") || html.contains("danger") {
            Severity::Critical
        } else if html.contains("warning") {
            Severity::Warning
        } else if html.contains("success") || html.contains("positive") {
            Severity::Success
        } else {
            Severity::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
            Severity::Success => "success",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A self-contained, identifier-tagged block of report HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    /// Identifier taken from the section tag, unique within one report
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub title: String,
    /// The full fragment, enclosing tag included
    pub html_content: String,
    /// Zero-based discovery index
    pub order: u32,
}

/// A short classified observation extracted from an insight block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    /// `insight_<n>`, assigned at first discovery
    pub id: String,
    pub text: String,
    pub severity: Severity,
}

impl Insight {
    /// Build the synthetic id for the `n`-th insight (1-based).
    pub fn synthetic_id(n: usize) -> String {
        format!("insight_{}", n)
    }
}
