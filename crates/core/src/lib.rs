//! AssetWorks Core
//!
//! Foundational types for the AssetWorks workspace: the report structure
//! model (sections, insights), the stream event vocabularies, and the core
//! error type. This crate has no dependency on storage, HTTP, or providers.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `report` - Report sections and insights (`ReportSection`, `Insight`)
//! - `streaming` - Provider stream events, adapter trait, and relay events

pub mod error;
pub mod report;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Report Structure ───────────────────────────────────────────────────
pub use report::{Insight, ReportSection, SectionType, Severity, UNTITLED_SECTION};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{
    AdapterError, FailureKind, ReportStreamEvent, StreamAdapter, UnifiedStreamEvent,
};
