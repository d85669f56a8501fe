//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - sent to the calibration backend as JSON request bodies
//! - parsed from backend responses
//! - saved to disk and reloaded later for plotting

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Computation types served by the ASV calibration endpoint.
///
/// The wire names (`volatility_asv`, `dynamic_svi`, ...) are what the backend
/// expects in the `computationType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationType {
    VolatilityAsv,
    Density,
    VolatilitySvi,
    DynamicAsv,
    DynamicSvi,
}

impl ComputationType {
    pub const ALL: [ComputationType; 5] = [
        ComputationType::VolatilityAsv,
        ComputationType::Density,
        ComputationType::VolatilitySvi,
        ComputationType::DynamicAsv,
        ComputationType::DynamicSvi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComputationType::VolatilityAsv => "volatility_asv",
            ComputationType::Density => "density",
            ComputationType::VolatilitySvi => "volatility_svi",
            ComputationType::DynamicAsv => "dynamic_asv",
            ComputationType::DynamicSvi => "dynamic_svi",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ComputationType::VolatilityAsv => "ASV Volatility",
            ComputationType::Density => "Density Function",
            ComputationType::VolatilitySvi => "SVI Volatility",
            ComputationType::DynamicAsv => "Dynamic ASV",
            ComputationType::DynamicSvi => "Dynamic SVI",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ComputationType::VolatilityAsv => {
                "Analytical Sigma Volatility model calibration with implied volatilities"
            }
            ComputationType::Density => {
                "Computes probability density functions based on calibrated model"
            }
            ComputationType::VolatilitySvi => "Stochastic Volatility Inspired model calibration",
            ComputationType::DynamicAsv => "Interactive ASV model with real-time parameter sliders",
            ComputationType::DynamicSvi => "Interactive SVI model with real-time parameter sliders",
        }
    }

    /// Dynamic types recompute automatically on every (debounced) edit.
    pub fn is_dynamic(self) -> bool {
        matches!(self, ComputationType::DynamicAsv | ComputationType::DynamicSvi)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

/// Model variants served by the ZABR variables-impact endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZabrModel {
    ZabrClassic,
    SabrPde,
    ZabrMixture,
}

impl ZabrModel {
    pub const ALL: [ZabrModel; 3] = [ZabrModel::ZabrClassic, ZabrModel::SabrPde, ZabrModel::ZabrMixture];

    pub fn as_str(self) -> &'static str {
        match self {
            ZabrModel::ZabrClassic => "zabr_classic",
            ZabrModel::SabrPde => "sabr_pde",
            ZabrModel::ZabrMixture => "zabr_mixture",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ZabrModel::ZabrClassic => "ZABR Classic",
            ZabrModel::SabrPde => "SABR PDE",
            ZabrModel::ZabrMixture => "ZABR Mixture",
        }
    }

    /// Short selector name used by the ZABR widget (`classical`, `pde`, `mixture`).
    pub fn calibration_type(self) -> &'static str {
        match self {
            ZabrModel::ZabrClassic => "classical",
            ZabrModel::SabrPde => "pde",
            ZabrModel::ZabrMixture => "mixture",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == raw || m.calibration_type() == raw)
    }
}

/// Which calibration widget (and therefore which backend endpoint) a model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Widget {
    Asv,
    Zabr,
}

impl Widget {
    pub fn display_name(self) -> &'static str {
        match self {
            Widget::Asv => "ASV Calibration",
            Widget::Zabr => "ZABR Variables Impact",
        }
    }
}

/// The active model type of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    Asv(ComputationType),
    Zabr(ZabrModel),
}

impl ModelType {
    pub const ALL: [ModelType; 8] = [
        ModelType::Asv(ComputationType::VolatilityAsv),
        ModelType::Asv(ComputationType::Density),
        ModelType::Asv(ComputationType::VolatilitySvi),
        ModelType::Asv(ComputationType::DynamicAsv),
        ModelType::Asv(ComputationType::DynamicSvi),
        ModelType::Zabr(ZabrModel::ZabrClassic),
        ModelType::Zabr(ZabrModel::SabrPde),
        ModelType::Zabr(ZabrModel::ZabrMixture),
    ];

    pub fn widget(self) -> Widget {
        match self {
            ModelType::Asv(_) => Widget::Asv,
            ModelType::Zabr(_) => Widget::Zabr,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Asv(c) => c.as_str(),
            ModelType::Zabr(m) => m.as_str(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelType::Asv(c) => c.display_name(),
            ModelType::Zabr(m) => m.display_name(),
        }
    }

    /// Every ZABR model auto-updates; only the `dynamic_*` ASV types do.
    pub fn is_dynamic(self) -> bool {
        match self {
            ModelType::Asv(c) => c.is_dynamic(),
            ModelType::Zabr(_) => true,
        }
    }

    /// Next model type within the same widget (wraps around).
    pub fn next(self) -> Self {
        self.step(1)
    }

    /// Previous model type within the same widget (wraps around).
    pub fn prev(self) -> Self {
        self.step(-1)
    }

    fn step(self, delta: isize) -> Self {
        let siblings: Vec<ModelType> = Self::ALL
            .into_iter()
            .filter(|m| m.widget() == self.widget())
            .collect();
        let n = siblings.len() as isize;
        let idx = siblings.iter().position(|m| *m == self).unwrap_or(0) as isize;
        siblings[(idx + delta).rem_euclid(n) as usize]
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Some(c) = ComputationType::parse(raw) {
            return Ok(ModelType::Asv(c));
        }
        if let Some(m) = ZabrModel::parse(raw) {
            return Ok(ModelType::Zabr(m));
        }
        let known: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
        Err(AppError::input(format!(
            "Unknown model type '{raw}'. Expected one of: {}.",
            known.join(", ")
        )))
    }
}

/// A single parameter value.
///
/// The store is permissive: most values are numbers, but the ZABR widget also
/// carries booleans (`use_vol_adjustement`) and free-form text survives as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Flag(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Flag(v) => write!(f, "{v}"),
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

/// Flat parameter map plus the `computationType` discriminator.
///
/// Serializes as a single flat JSON object, which is exactly the body the ASV
/// endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(rename = "computationType")]
    pub computation_type: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new(computation_type: impl Into<String>) -> Self {
        Self {
            computation_type: computation_type.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(ParamValue::as_f64)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(ParamValue::as_bool)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.values.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every key of `preset` that is missing here.
    ///
    /// Existing values (including unknown keys) are never touched.
    pub fn fill_missing_from(&mut self, preset: &ParameterSet) {
        for (key, value) in &preset.values {
            self.values.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// `metadata` (or `meta`) block of a backend response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computation_type: Option<String>,
    #[serde(default, rename = "computationType", skip_serializing_if = "Option::is_none")]
    pub computation_type_camel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// `data` block of a backend response.
///
/// Both endpoints share this shape: the ASV endpoint fills `vols` / `density`
/// and the market-quote arrays, the ZABR endpoint fills the
/// `*_volatility` arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    #[serde(default)]
    pub strikes: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vols: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_strikes: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_volatility: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_volatility: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility_difference: Option<Vec<f64>>,
    #[serde(default, rename = "computationType", skip_serializing_if = "Option::is_none")]
    pub computation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
}

/// Full backend response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason on `status: "error"` bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, rename = "computationType", skip_serializing_if = "Option::is_none")]
    pub computation_type: Option<String>,
    #[serde(default)]
    pub data: CalibrationData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
    /// Older services name the block `meta`; some send both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMetadata>,
}

impl CalibrationResponse {
    /// Resolve which computation type this response describes.
    ///
    /// Lookup order: top-level `computationType`, then the metadata blocks
    /// (`metadata` before `meta`, `computationType` or `computation_type`),
    /// then `data.computationType`. Legacy responses carry none of these and
    /// resolve to `requested`, or `volatility_asv` without one.
    pub fn resolve_computation_type(&self, requested: Option<ComputationType>) -> ComputationType {
        let from_meta = self.metadata_blocks().flat_map(|m| {
            [
                m.computation_type_camel.as_deref(),
                m.computation_type.as_deref(),
            ]
        });
        std::iter::once(self.computation_type.as_deref())
            .chain(from_meta)
            .chain(std::iter::once(self.data.computation_type.as_deref()))
            .flatten()
            .find_map(ComputationType::parse)
            .or(requested)
            .unwrap_or(ComputationType::VolatilityAsv)
    }

    /// Whether the backend served this result from its cache.
    pub fn cached(&self) -> bool {
        self.metadata_blocks()
            .find_map(|m| m.cached)
            .or(self.data.cached)
            .unwrap_or(false)
    }

    /// Backend-reported execution time, when present.
    pub fn execution_time_ms(&self) -> Option<f64> {
        self.metadata_blocks()
            .find_map(|m| m.execution_time_ms)
            .or(self.data.response_time_ms)
    }

    fn metadata_blocks(&self) -> impl Iterator<Item = &ResponseMetadata> {
        self.metadata.iter().chain(self.meta.iter())
    }
}

/// A parsed backend response together with client-side metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOutcome {
    pub model: ModelType,
    pub response: CalibrationResponse,
    /// Wall-clock round trip measured by the client.
    pub response_time_ms: u64,
}

impl CalibrationOutcome {
    /// Computation type of an ASV outcome; the requested type fills in for
    /// responses that don't name one. `None` for ZABR.
    pub fn computation_type(&self) -> Option<ComputationType> {
        match self.model {
            ModelType::Asv(requested) => Some(self.response.resolve_computation_type(Some(requested))),
            ModelType::Zabr(_) => None,
        }
    }
}

/// One row of chart data: a strike plus whichever series have a value there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub strike: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibrated_vol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_vol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_vol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
}

impl ChartPoint {
    pub fn at(strike: f64) -> Self {
        Self {
            strike,
            ..Self::default()
        }
    }
}

/// ZABR model metadata served by `GET /api/zabr-variables-impact/model-info/{model}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_parameters: BTreeMap<String, ParamValue>,
    /// `name -> [min, max, step]`.
    #[serde(default)]
    pub parameter_ranges: BTreeMap<String, [f64; 3]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_type_parses_wire_names_and_zabr_selectors() {
        assert_eq!(
            "dynamic_svi".parse::<ModelType>().unwrap(),
            ModelType::Asv(ComputationType::DynamicSvi)
        );
        assert_eq!(
            "pde".parse::<ModelType>().unwrap(),
            ModelType::Zabr(ZabrModel::SabrPde)
        );
        let err = "heston".parse::<ModelType>().unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
    }

    #[test]
    fn model_type_cycles_within_widget() {
        let last_asv = ModelType::Asv(ComputationType::DynamicSvi);
        assert_eq!(last_asv.next(), ModelType::Asv(ComputationType::VolatilityAsv));
        let first_zabr = ModelType::Zabr(ZabrModel::ZabrClassic);
        assert_eq!(first_zabr.prev(), ModelType::Zabr(ZabrModel::ZabrMixture));
    }

    #[test]
    fn parameter_set_serializes_flat() {
        let mut p = ParameterSet::new("volatility_asv");
        p.insert("spot", ParamValue::Number(2245.0656));
        p.insert("use_cache", ParamValue::Flag(true));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["computationType"], "volatility_asv");
        assert_eq!(json["spot"], 2245.0656);
        assert_eq!(json["use_cache"], true);
    }

    #[test]
    fn missing_computation_type_defaults_to_volatility_asv() {
        let resp: CalibrationResponse =
            serde_json::from_str(r#"{"data":{"strikes":[1.0],"vols":[0.2]}}"#).unwrap();
        assert_eq!(resp.resolve_computation_type(None), ComputationType::VolatilityAsv);
        assert_eq!(
            resp.resolve_computation_type(Some(ComputationType::Density)),
            ComputationType::Density
        );
    }

    #[test]
    fn computation_type_found_under_meta_block() {
        let resp: CalibrationResponse = serde_json::from_str(
            r#"{"status":"success","data":{"strikes":[]},"meta":{"computationType":"density","cached":true}}"#,
        )
        .unwrap();
        assert_eq!(resp.resolve_computation_type(None), ComputationType::Density);
        assert!(resp.cached());
    }

    #[test]
    fn metadata_and_meta_blocks_can_coexist() {
        let resp: CalibrationResponse = serde_json::from_str(
            r#"{"data":{},"metadata":{"execution_time_ms":8.0},"meta":{"computation_type":"volatility_svi","cached":true}}"#,
        )
        .unwrap();
        assert_eq!(
            resp.resolve_computation_type(Some(ComputationType::Density)),
            ComputationType::VolatilitySvi
        );
        assert!(resp.cached());
        assert_eq!(resp.execution_time_ms(), Some(8.0));
    }

    #[test]
    fn top_level_type_wins_over_metadata() {
        let resp: CalibrationResponse = serde_json::from_str(
            r#"{"computationType":"volatility_svi","metadata":{"computation_type":"density"},"data":{}}"#,
        )
        .unwrap();
        assert_eq!(
            resp.resolve_computation_type(Some(ComputationType::Density)),
            ComputationType::VolatilitySvi
        );
    }

    #[test]
    fn chart_point_omits_absent_series() {
        let p = ChartPoint {
            calibrated_vol: Some(0.18),
            ..ChartPoint::at(2000.0)
        };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"strike":2000.0,"calibratedVol":0.18}"#);
    }
}
