//! Chart data shaping.
//!
//! - strike-keyed merge of response arrays (`merge`)
//! - per-computation-type series derivation and axis bounds (`series`)
//! - client-side preview curves for the dynamic widgets (`preview`)

pub mod merge;
pub mod preview;
pub mod series;

pub use merge::{Field, SeriesSource, merge_by_strike};
pub use preview::{PreviewKind, PreviewPoint, preview};
pub use series::{ChartSeries, SeriesKind, SeriesLine, axis_bounds, calibration_error, demo_series, derive_series};
