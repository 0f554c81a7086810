//! Services
//!
//! Business logic services for the application.
//! Services handle the core functionality and are called by commands.

pub mod entities;
pub mod report;

pub use entities::{extract_entities, EntityKind, ExtractedEntity};
pub use report::{GenerateReportRequest, GenerationRegistry, ReportPipeline, ReportService};
