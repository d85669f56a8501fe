//! Input/output helpers.
//!
//! - chart row exports (CSV) (`export`)
//! - saved result JSON read/write (`results`)

pub mod export;
pub mod results;

pub use export::*;
pub use results::*;
