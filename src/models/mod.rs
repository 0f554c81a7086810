//! Data Models
//!
//! Contains the data structures exchanged over HTTP and stored in SQLite.

pub mod report;
pub mod response;
pub mod settings;
pub mod thread;

pub use report::*;
pub use response::*;
pub use settings::*;
pub use thread::*;
