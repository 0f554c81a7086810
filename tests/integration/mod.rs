//! Integration Tests Module
//!
//! End-to-end tests for the AssetWorks backend: incremental extraction,
//! the generation pipeline against the SQLite store, storage flows and the
//! HTTP API. No network calls are made; providers are scripted.

// Shared scripted provider and helpers
mod support;

// Incremental section/insight extraction tests
mod extraction_test;

// Generation pipeline tests (relay, persistence, cancellation)
mod report_pipeline_test;


// HTTP router tests
mod api_test;
