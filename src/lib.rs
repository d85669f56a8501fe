//! `calib-workbench` library crate.
//!
//! The binary (`calib`) is a thin wrapper around this library so that:
//!
//! - the parameter store, recompute pipeline and chart merge are testable
//!   without a terminal or a running backend
//! - the one-shot CLI and the TUI share one code path to the backend

pub mod app;
pub mod chart;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod params;
pub mod plot;
pub mod recompute;
pub mod report;
pub mod tui;
