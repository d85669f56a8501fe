//! Domain types used throughout the workbench.
//!
//! This module defines:
//!
//! - model selection enums (`ComputationType`, `ZabrModel`, `ModelType`)
//! - the permissive parameter map (`ParameterSet`, `ParamValue`)
//! - backend response types (`CalibrationResponse`, `CalibrationOutcome`)
//! - chart rows (`ChartPoint`)

pub mod types;

pub use types::*;
