//! Report Generation
//!
//! Streaming report generation: HTML block scanning, section and insight
//! extraction, the relay pipeline, persistence and generation tracking.

pub mod extractor;
pub mod html;
pub mod insights;
pub mod persistence;
pub mod pipeline;
pub mod prompt;
pub mod registry;
pub mod sections;
pub mod service;

pub use extractor::{ExtractionUpdate, ReportExtractor};
pub use insights::extract_insights;
pub use persistence::{ReportStore, SqliteReportStore};
pub use pipeline::{GenerationContext, GenerationOutcome, ReportPipeline};
pub use registry::{GenerationGuard, GenerationRegistry};
pub use sections::extract_sections;
pub use service::{GenerateReportRequest, ProviderFactory, ReportService};
