//! Extraction Integration Tests
//!
//! Feeds chunked report HTML through the incremental extractor and checks:
//! - sections are emitted once, complete, and in document order
//! - tags split across chunks delay emission until closed
//! - insight severity and empty-block handling
//! - incremental results equal a full re-scan of the final buffer

use assetworks::services::report::{extract_insights, extract_sections, ReportExtractor};
use assetworks_core::{SectionType, Severity};

use crate::support::REPORT_CHUNKS;

// ============================================================================
// Sections
// ============================================================================

#[test]
fn test_unique_sections_counted_and_ordered() {
    let html = (1..=5)
        .map(|i| {
            format!(
                r#"<section data-section-id="section_text_{i}"><h2>Part {i}</h2><p>Body</p></section>"#
            )
        })
        .collect::<String>();

    let sections = extract_sections(&html);
    assert_eq!(sections.len(), 5);
    for (rank, section) in sections.iter().enumerate() {
        assert_eq!(section.order, rank as u32);
        assert_eq!(section.id, format!("section_text_{}", rank + 1));
        assert_eq!(section.title, format!("Part {}", rank + 1));
    }
}

#[test]
fn test_metric_section_streamed_in_three_chunks() {
    let mut extractor = ReportExtractor::new();

    assert!(extractor
        .push(r#"<div data-section-id="section_metric_1">"#)
        .is_empty());
    assert!(extractor.push("<h3>Revenue</h3><p>$4.2M</p>").is_empty());
    let update = extractor.push("</div>");

    assert_eq!(update.new_sections.len(), 1);
    let section = &update.new_sections[0];
    assert_eq!(section.id, "section_metric_1");
    assert_eq!(section.section_type, SectionType::Metric);
    assert_eq!(section.title, "Revenue");
    assert_eq!(section.order, 0);
}

#[test]
fn test_closing_tag_split_across_chunks() {
    let mut extractor = ReportExtractor::new();
    extractor.push(r#"<div data-section-id="section_table_q3"><h3>Q3</h3></di"#);
    assert!(extractor.sections().is_empty());

    let update = extractor.push("v>");
    assert_eq!(update.new_sections.len(), 1);
    assert_eq!(update.new_sections[0].section_type, SectionType::Table);
}

#[test]
fn test_sections_relayed_at_most_once() {
    let mut extractor = ReportExtractor::new();
    let mut relayed = Vec::new();
    for chunk in REPORT_CHUNKS {
        relayed.extend(extractor.push(chunk).new_sections);
    }
    // More chunks after everything closed must not re-emit anything
    assert!(extractor.push("<p>Footnotes</p>").is_empty());

    let ids: Vec<_> = relayed.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["section_metric_1", "section_chart_1"]);
    assert_eq!(relayed[1].title, "Margins");
}

// ============================================================================
// Insights
// ============================================================================

#[test]
fn test_empty_insight_blocks_skipped() {
    let html = r#"
        <div class="insight"></div>
        <div class="insight">   <span> </span> </div>
        <div class="insight insight-positive">Cash flow improved</div>
    "#;
    let insights = extract_insights(html);
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].text, "Cash flow improved");
    assert_eq!(insights[0].severity, Severity::Success);
}

#[test]
fn test_critical_wins_over_warning() {
    let insights =
        extract_insights(r#"<div class="insight warning">critical liquidity shortfall</div>"#);
    assert_eq!(insights[0].severity, Severity::Critical);
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_incremental_matches_full_rescan() {
    let mut extractor = ReportExtractor::new();
    for chunk in REPORT_CHUNKS {
        extractor.push(chunk);
    }

    assert_eq!(extractor.sections(), extract_sections(extractor.buffer()).as_slice());
    assert_eq!(extractor.insights(), extract_insights(extractor.buffer()).as_slice());
    assert_eq!(extractor.buffer(), REPORT_CHUNKS.concat());
}

#[test]
fn test_single_character_chunks() {
    let html = REPORT_CHUNKS.concat();
    let mut extractor = ReportExtractor::new();
    let mut buf = [0u8; 4];
    for c in html.chars() {
        extractor.push(c.encode_utf8(&mut buf));
    }

    assert_eq!(extractor.sections().len(), 2);
    assert_eq!(extractor.insights().len(), 1);
    assert_eq!(extractor.insights()[0].severity, Severity::Critical);
}
