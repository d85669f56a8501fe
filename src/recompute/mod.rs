//! Debounced recompute: edits in, chart series out.

pub mod debounce;
pub mod pipeline;

pub use debounce::Debouncer;
pub use pipeline::{CONNECTION_FAILED, PipelineState, RecomputePipeline};
