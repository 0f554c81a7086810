//! Utilities
//!
//! Common utilities used throughout the server.

pub mod error;
pub mod paths;

pub use error::*;
pub use paths::*;
