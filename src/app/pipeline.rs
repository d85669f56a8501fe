//! One-shot calibration shared by the `calibrate` and `zabr` commands.
//!
//! The TUI drives the debounced `RecomputePipeline` instead; this is the
//! synchronous path: parameters -> optional health probe -> request -> series.

use std::sync::Arc;

use tracing::info;

use crate::chart::{ChartSeries, derive_series};
use crate::cli::parse_assignment;
use crate::data::{CalibrationBackend, CalibrationRequest, run_request};
use crate::domain::{CalibrationOutcome, ModelType, ParameterSet};
use crate::error::AppError;
use crate::params::ParameterStore;
use crate::recompute::CONNECTION_FAILED;

/// All outputs of a single one-shot calibration.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Parameters actually sent (preset-completed).
    pub parameters: ParameterSet,
    pub outcome: CalibrationOutcome,
    pub series: ChartSeries,
}

/// Start from `model`'s preset and apply `KEY=VALUE` overrides in order.
pub fn build_parameters(model: ModelType, assignments: &[String]) -> Result<Arc<ParameterSet>, AppError> {
    let mut store = ParameterStore::new(model);
    for raw in assignments {
        let (key, value) = parse_assignment(raw)?;
        store.set(&key, &value);
    }
    Ok(store.snapshot())
}

/// Run one calibration against `backend`.
pub fn run_once(
    backend: &dyn CalibrationBackend,
    model: ModelType,
    params: Arc<ParameterSet>,
    probe: bool,
) -> Result<RunOutput, AppError> {
    if probe {
        backend
            .health()
            .map_err(|e| AppError::backend(format!("{CONNECTION_FAILED} ({})", e.message())))?;
    }

    let request = CalibrationRequest::new(model, params);
    let outcome = run_request(backend, &request)?;
    let series = derive_series(&outcome);
    info!(
        model = %model,
        points = series.points.len(),
        response_time_ms = outcome.response_time_ms,
        "one-shot calibration finished"
    );

    Ok(RunOutput {
        parameters: request.complete_params(),
        outcome,
        series,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{CalibrationData, CalibrationResponse, ComputationType, ZabrModel};

    struct Recorder {
        healthy: bool,
        bodies: Mutex<Vec<serde_json::Value>>,
    }

    impl CalibrationBackend for Recorder {
        fn health(&self) -> Result<serde_json::Value, AppError> {
            if self.healthy {
                Ok(serde_json::json!({"status": "ok"}))
            } else {
                Err(AppError::backend("connection refused"))
            }
        }

        fn calibrate(&self, request: &CalibrationRequest) -> Result<CalibrationResponse, AppError> {
            self.bodies.lock().unwrap().push(request.body()?);
            Ok(CalibrationResponse {
                data: CalibrationData {
                    strikes: vec![2100.0, 2000.0],
                    vols: Some(vec![0.19, 0.18]),
                    ..CalibrationData::default()
                },
                ..CalibrationResponse::default()
            })
        }
    }

    fn recorder(healthy: bool) -> Recorder {
        Recorder {
            healthy,
            bodies: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn overrides_apply_on_top_of_preset() {
        let model = ModelType::Asv(ComputationType::Density);
        let params = build_parameters(model, &["rho=0.25".to_string(), "n=oops".to_string()]).unwrap();
        assert_eq!(params.number("rho"), Some(0.25));
        assert_eq!(params.number("n"), Some(0.0));
        assert_eq!(params.number("spot"), Some(2000.0));
        assert!(build_parameters(model, &["rho".to_string()]).is_err());
    }

    #[test]
    fn run_once_posts_flat_body_and_sorts_series() {
        let backend = recorder(true);
        let model = ModelType::Asv(ComputationType::VolatilityAsv);
        let params = build_parameters(model, &[]).unwrap();
        let run = run_once(&backend, model, params, true).unwrap();

        let bodies = backend.bodies.lock().unwrap();
        assert_eq!(bodies[0]["computationType"], "volatility_asv");
        assert_eq!(bodies[0]["n"], 400.0);
        assert_eq!(run.series.points[0].strike, 2000.0);
        assert_eq!(run.series.points[0].calibrated_vol, Some(0.18));
    }

    #[test]
    fn unhealthy_backend_stops_before_calibrating() {
        let backend = recorder(false);
        let model = ModelType::Zabr(ZabrModel::ZabrClassic);
        let params = build_parameters(model, &[]).unwrap();
        let err = run_once(&backend, model, params, true).unwrap_err();
        assert!(err.message().starts_with("Backend connection failed"));
        assert_eq!(err.exit_code(), crate::error::EXIT_BACKEND);
        assert!(backend.bodies.lock().unwrap().is_empty());
    }
}
