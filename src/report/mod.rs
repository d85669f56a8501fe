//! Reporting utilities: result summaries and tables.

pub mod format;

pub use format::*;
