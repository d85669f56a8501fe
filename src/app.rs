//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads configuration and starts logging
//! - runs one-shot calibrations or launches the TUI
//! - prints reports/plots and writes optional exports

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::cli::{CalibrateArgs, Cli, Command, ModelInfoArgs, OutputArgs, PlotArgs, PresetsArgs, TuiArgs, ZabrArgs};
use crate::config::AppConfig;
use crate::data::{BackendClient, CalibrationBackend};
use crate::domain::ModelType;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `calib` binary.
pub fn run() -> Result<(), AppError> {
    // `calib` and `calib --base-url ...` behave like `calib tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    let config = AppConfig::from_env()?.with_overrides(cli.global.base_url.as_deref(), cli.global.timeout_secs)?;
    crate::logging::init(&config)?;
    info!(base_url = %config.base_url, "calib starting");

    match cli.command {
        Command::Calibrate(args) => handle_calibrate(&config, args),
        Command::Zabr(args) => handle_zabr(&config, args),
        Command::Health => handle_health(&config),
        Command::ModelInfo(args) => handle_model_info(&config, args),
        Command::Presets(args) => handle_presets(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(config, args),
    }
}

fn handle_calibrate(config: &AppConfig, args: CalibrateArgs) -> Result<(), AppError> {
    run_and_print(config, ModelType::Asv(args.model), &args.output)
}

fn handle_zabr(config: &AppConfig, args: ZabrArgs) -> Result<(), AppError> {
    run_and_print(config, ModelType::Zabr(args.model), &args.output)
}

fn run_and_print(config: &AppConfig, model: ModelType, output: &OutputArgs) -> Result<(), AppError> {
    let client = BackendClient::new(config)?;
    let params = pipeline::build_parameters(model, &output.set)?;
    let run = pipeline::run_once(&client, model, params, !output.no_health)?;

    println!("{}", crate::report::format_outcome_summary(&run.outcome, &run.series));
    if output.rows > 0 {
        println!("{}", crate::report::format_points_table(&run.series, output.rows));
    }
    if output.plot {
        println!(
            "{}",
            crate::plot::render_ascii_plot(&run.series, output.width, output.height)
        );
    }

    // Optional exports.
    if let Some(path) = &output.export {
        crate::io::write_points_csv(path, &run.series)?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &output.save {
        let saved = crate::io::SavedResult::new(&run.outcome, &run.parameters, client.base_url());
        crate::io::write_result_json(path, &saved)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn handle_health(config: &AppConfig) -> Result<(), AppError> {
    let client = BackendClient::new(config)?;
    let body = client.health()?;
    let pretty = serde_json::to_string_pretty(&body)
        .map_err(|e| AppError::backend(format!("Failed to format health response: {e}")))?;
    println!("{} is up\n{pretty}", client.base_url());
    Ok(())
}

fn handle_model_info(config: &AppConfig, args: ModelInfoArgs) -> Result<(), AppError> {
    let client = BackendClient::new(config)?;
    let info = client.model_info(args.model)?;
    println!("{}", crate::report::format_model_info(&info));
    Ok(())
}

fn handle_presets(args: PresetsArgs) -> Result<(), AppError> {
    let models: Vec<ModelType> = match args.model {
        Some(model) => vec![model],
        None => ModelType::ALL.to_vec(),
    };
    let tables: Vec<_> = models
        .into_iter()
        .map(|m| (m, crate::params::preset(m)))
        .collect();
    print!("{}", crate::report::format_presets(&tables));
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let saved = crate::io::read_result_json(&args.result)?;
    let outcome = saved.outcome()?;
    let series = crate::chart::derive_series(&outcome);

    println!("{}", crate::report::format_outcome_summary(&outcome, &series));
    println!("{}", crate::plot::render_ascii_plot(&series, args.width, args.height));
    Ok(())
}

fn handle_tui(config: AppConfig, args: TuiArgs) -> Result<(), AppError> {
    let client: Arc<dyn CalibrationBackend> = Arc::new(BackendClient::new(&config)?);
    crate::tui::run(config, client, args.model)
}

/// Rewrite argv so `calib` defaults to `calib tui`.
///
/// Rules:
/// - `calib`                      -> `calib tui`
/// - `calib --base-url URL ...`   -> `calib tui --base-url URL ...`
/// - `calib --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise it is a subcommand (or a typo clap will report).
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_tui() {
        assert_eq!(rewrite_args(args(&["calib"])), args(&["calib", "tui"]));
        assert_eq!(
            rewrite_args(args(&["calib", "--model", "sabr_pde"])),
            args(&["calib", "tui", "--model", "sabr_pde"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(args(&["calib", "health"])), args(&["calib", "health"]));
        assert_eq!(rewrite_args(args(&["calib", "--help"])), args(&["calib", "--help"]));
    }

    #[test]
    fn rewritten_flags_parse_as_tui() {
        let cli = Cli::parse_from(rewrite_args(args(&["calib", "--base-url", "http://x:1", "--model", "pde"])));
        assert_eq!(cli.global.base_url.as_deref(), Some("http://x:1"));
        let Command::Tui(tui) = cli.command else {
            panic!("expected tui");
        };
        assert_eq!(tui.model, Some(ModelType::Zabr(crate::domain::ZabrModel::SabrPde)));
    }
}
