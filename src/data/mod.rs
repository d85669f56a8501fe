//! Calibration backend integration.
//!
//! - request shaping per endpoint (`request`)
//! - the `CalibrationBackend` trait and its reqwest implementation (`client`)

pub mod client;
pub mod request;

pub use client::{BackendClient, CalibrationBackend, run_request};
pub use request::CalibrationRequest;
