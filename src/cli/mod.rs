//! Command-line parsing for the calibration workbench.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! command dispatch (`app`) and from the pipeline/chart code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ComputationType, ModelType, ZabrModel};
use crate::error::AppError;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "calib", version, about = "Volatility calibration workbench (ASV / SVI / ZABR)")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand; they override the environment.
#[derive(Debug, Args, Clone, Default)]
pub struct GlobalArgs {
    /// Backend base URL (overrides CALIB_API_BASE_URL).
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// HTTP timeout in seconds (overrides CALIB_TIMEOUT_SECS).
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one ASV calibration and print a summary.
    Calibrate(CalibrateArgs),
    /// Run one ZABR variables-impact calculation and print a summary.
    Zabr(ZabrArgs),
    /// Probe the backend health endpoint.
    Health,
    /// Show backend defaults and ranges for a ZABR model.
    ModelInfo(ModelInfoArgs),
    /// Print the built-in parameter presets.
    Presets(PresetsArgs),
    /// Plot a previously saved result JSON.
    Plot(PlotArgs),
    /// Launch the interactive workbench.
    Tui(TuiArgs),
}

/// Output options shared by `calibrate` and `zabr`.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Override a parameter (repeatable), e.g. `--set rho=0.1`.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Skip the health probe before calibrating.
    #[arg(long)]
    pub no_health: bool,

    /// Render an ASCII plot of the result.
    #[arg(long)]
    pub plot: bool,

    /// Print at most this many chart rows (0 hides the table).
    #[arg(long, default_value_t = 12)]
    pub rows: usize,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export chart rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Save the raw result (parameters + response) to JSON.
    #[arg(long, value_name = "JSON")]
    pub save: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CalibrateArgs {
    /// Computation type.
    #[arg(long, value_name = "TYPE", default_value = "volatility_asv", value_parser = parse_computation_type)]
    pub model: ComputationType,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ZabrArgs {
    /// ZABR model (`zabr_classic`/`classical`, `sabr_pde`/`pde`, `zabr_mixture`/`mixture`).
    #[arg(long, value_name = "MODEL", default_value = "zabr_classic", value_parser = parse_zabr_model)]
    pub model: ZabrModel,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ModelInfoArgs {
    #[arg(long, value_name = "MODEL", default_value = "zabr_classic", value_parser = parse_zabr_model)]
    pub model: ZabrModel,
}

#[derive(Debug, Args, Clone)]
pub struct PresetsArgs {
    /// Only show this model type.
    #[arg(long, value_name = "MODEL", value_parser = parse_model_type)]
    pub model: Option<ModelType>,
}

/// Options for plotting a saved result.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Result JSON written by `calib calibrate --save`.
    #[arg(long, value_name = "JSON")]
    pub result: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone, Default)]
pub struct TuiArgs {
    /// Model type to start with.
    #[arg(long, value_name = "MODEL", value_parser = parse_model_type)]
    pub model: Option<ModelType>,
}

fn parse_model_type(raw: &str) -> Result<ModelType, String> {
    raw.parse::<ModelType>().map_err(|e| e.message().to_string())
}

fn parse_computation_type(raw: &str) -> Result<ComputationType, String> {
    ComputationType::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ComputationType::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown computation type '{raw}' (expected one of: {})", known.join(", "))
    })
}

fn parse_zabr_model(raw: &str) -> Result<ZabrModel, String> {
    ZabrModel::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ZabrModel::ALL.iter().map(|m| m.as_str()).collect();
        format!("unknown ZABR model '{raw}' (expected one of: {})", known.join(", "))
    })
}

/// Split a `--set KEY=VALUE` argument.
pub fn parse_assignment(raw: &str) -> Result<(String, String), AppError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| AppError::input(format!("Invalid --set '{raw}': expected KEY=VALUE.")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::input(format!("Invalid --set '{raw}': empty key.")));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
