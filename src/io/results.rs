//! Read/write saved result JSON files.
//!
//! A saved result is the raw backend response plus what produced it:
//! - model type and the exact parameters sent
//! - client-side timing
//! - when it was saved
//!
//! `calib plot --result` re-derives the chart from the raw response, so saved
//! files stay valid when series derivation changes.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CalibrationOutcome, CalibrationResponse, ModelType, ParameterSet};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResult {
    pub tool: String,
    pub saved_at: DateTime<Utc>,
    pub base_url: String,
    pub model: String,
    pub parameters: ParameterSet,
    pub response_time_ms: u64,
    pub response: CalibrationResponse,
}

impl SavedResult {
    pub fn new(outcome: &CalibrationOutcome, parameters: &ParameterSet, base_url: &str) -> Self {
        Self {
            tool: "calib".to_string(),
            saved_at: Utc::now(),
            base_url: base_url.to_string(),
            model: outcome.model.as_str().to_string(),
            parameters: parameters.clone(),
            response_time_ms: outcome.response_time_ms,
            response: outcome.response.clone(),
        }
    }

    /// Rebuild the outcome this file was saved from.
    pub fn outcome(&self) -> Result<CalibrationOutcome, AppError> {
        let model: ModelType = self.model.parse()?;
        Ok(CalibrationOutcome {
            model,
            response: self.response.clone(),
            response_time_ms: self.response_time_ms,
        })
    }
}

/// Write a saved result JSON file.
pub fn write_result_json(path: &Path, saved: &SavedResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create result JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, saved)
        .map_err(|e| AppError::config(format!("Failed to write result JSON: {e}")))?;
    Ok(())
}

/// Read a saved result JSON file.
pub fn read_result_json(path: &Path) -> Result<SavedResult, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open result JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::config(format!("Invalid result JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CalibrationData, ComputationType};
    use crate::params::presets::preset;

    #[test]
    fn saved_result_survives_a_file_round_trip() {
        let model = ModelType::Asv(ComputationType::VolatilitySvi);
        let outcome = CalibrationOutcome {
            model,
            response: CalibrationResponse {
                computation_type: Some("volatility_svi".to_string()),
                data: CalibrationData {
                    strikes: vec![1800.0, 1900.0],
                    vols: Some(vec![0.21, 0.2]),
                    ..CalibrationData::default()
                },
                ..CalibrationResponse::default()
            },
            response_time_ms: 17,
        };
        let saved = SavedResult::new(&outcome, &preset(model), "http://localhost:5005");

        let path = std::env::temp_dir().join(format!("calib-result-{}.json", std::process::id()));
        write_result_json(&path, &saved).unwrap();
        let back = read_result_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back, saved);
        assert_eq!(back.outcome().unwrap(), outcome);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = read_result_json(Path::new("/nonexistent/calib/result.json")).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
    }
}
