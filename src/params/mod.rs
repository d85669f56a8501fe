//! Parameter store and per-model presets.

pub mod presets;
pub mod store;

pub use presets::*;
pub use store::*;
