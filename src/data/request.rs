//! Request shaping for the calibration backend.
//!
//! The two widgets speak different body formats:
//!
//! - ASV: the flat parameter map itself, including `computationType`
//! - ZABR: `{model_type, parameters, use_cache}` with `vol_of_vol` renamed to
//!   `nu` and only the active model's extra knobs included

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{ModelType, ParamValue, ParameterSet, ZabrModel};
use crate::error::AppError;
use crate::params::presets::preset;

pub const ASV_CALIBRATION_PATH: &str = "/api/AnalyticalSigmaVolatilityCalibration";
pub const ZABR_CALCULATE_PATH: &str = "/api/zabr-variables-impact/calculate";
pub const ZABR_MODEL_INFO_PATH: &str = "/api/zabr-variables-impact/model-info";
pub const HEALTH_PATH: &str = "/health";

const PDE_KEYS: &[&str] = &["N", "timesteps", "nd"];
const MIXTURE_KEYS: &[&str] = &[
    "beta1",
    "beta2",
    "d",
    "high_strike",
    "vol_low",
    "low_strike",
    "forward_cut_off",
    "smothing_factor",
];

/// One calibration request: the model type plus an immutable parameter snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRequest {
    pub model: ModelType,
    pub params: Arc<ParameterSet>,
}

#[derive(Debug, Serialize)]
struct ZabrBody<'a> {
    model_type: &'a str,
    parameters: BTreeMap<String, ParamValue>,
    use_cache: bool,
}

impl CalibrationRequest {
    pub fn new(model: ModelType, params: Arc<ParameterSet>) -> Self {
        Self { model, params }
    }

    /// Endpoint path for this request.
    pub fn path(&self) -> &'static str {
        match self.model {
            ModelType::Asv(_) => ASV_CALIBRATION_PATH,
            ModelType::Zabr(_) => ZABR_CALCULATE_PATH,
        }
    }

    /// Parameters with every missing preset key filled in.
    pub fn complete_params(&self) -> ParameterSet {
        let mut params = (*self.params).clone();
        params.fill_missing_from(&preset(self.model));
        if params.computation_type.trim().is_empty() {
            params.computation_type = self.model.as_str().to_string();
        }
        params
    }

    /// JSON body sent to the backend.
    pub fn body(&self) -> Result<serde_json::Value, AppError> {
        let params = self.complete_params();
        let value = match self.model {
            ModelType::Asv(_) => serde_json::to_value(&params),
            ModelType::Zabr(model) => serde_json::to_value(ZabrBody {
                model_type: model.as_str(),
                parameters: zabr_parameters(model, params.values),
                use_cache: true,
            }),
        };
        value.map_err(|e| AppError::input(format!("Failed to encode request body: {e}")))
    }
}

fn zabr_parameters(model: ZabrModel, mut values: BTreeMap<String, ParamValue>) -> BTreeMap<String, ParamValue> {
    if let Some(vol_of_vol) = values.remove("vol_of_vol") {
        values.insert("nu".to_string(), vol_of_vol);
    }
    if model != ZabrModel::SabrPde {
        for key in PDE_KEYS {
            values.remove(*key);
        }
    }
    if model != ZabrModel::ZabrMixture {
        for key in MIXTURE_KEYS {
            values.remove(*key);
        }
    }
    values
}
