//! Parameter store: the active model type plus an immutable parameter snapshot.
//!
//! Every mutation builds a new `ParameterSet` and swaps it in, so snapshots
//! handed to the recompute pipeline never change underneath a running request.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{ModelType, ParamValue, ParameterSet};
use crate::params::presets::{preset, slider_range};

/// Keys whose values are stored as text instead of being parsed as numbers.
const TEXT_KEYS: &[&str] = &["computationType", "calibration_type"];

#[derive(Debug, Clone)]
pub struct ParameterStore {
    model: ModelType,
    current: Arc<ParameterSet>,
}

impl ParameterStore {
    /// Create a store for `model`, loaded with its static preset.
    pub fn new(model: ModelType) -> Self {
        Self {
            model,
            current: Arc::new(preset(model)),
        }
    }

    pub fn model(&self) -> ModelType {
        self.model
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<ParameterSet> {
        Arc::clone(&self.current)
    }

    /// Set `key` from raw user input.
    ///
    /// Numeric input that fails to parse is stored as `0`. Text keys
    /// (`computationType`, `calibration_type`) are stored verbatim. Unknown
    /// keys are accepted as-is.
    pub fn set(&mut self, key: &str, raw: &str) -> Arc<ParameterSet> {
        if key == "computationType" {
            return self.replace(|p| p.computation_type = raw.trim().to_string());
        }
        if TEXT_KEYS.contains(&key) {
            return self.replace(|p| p.insert(key, ParamValue::Text(raw.trim().to_string())));
        }
        let value = parse_number_or_zero(raw);
        self.set_number(key, value)
    }

    /// Set a numeric parameter (slider edit).
    pub fn set_number(&mut self, key: &str, value: f64) -> Arc<ParameterSet> {
        self.replace(|p| p.insert(key, ParamValue::Number(value)))
    }

    /// Set a boolean parameter (toggle edit).
    pub fn set_flag(&mut self, key: &str, value: bool) -> Arc<ParameterSet> {
        self.replace(|p| p.insert(key, ParamValue::Flag(value)))
    }

    /// Move a numeric parameter by `steps` slider steps, clamped to its range.
    ///
    /// Returns `None` when the key has no slider range or is not numeric.
    pub fn nudge(&mut self, key: &str, steps: i32) -> Option<Arc<ParameterSet>> {
        let range = slider_range(self.model, key)?;
        let current = self.current.number(key)?;
        let next = range.clamp(current + f64::from(steps) * range.step);
        // Snap to the step grid so repeated nudges don't accumulate float noise.
        let snapped = (next / range.step).round() * range.step;
        Some(self.set_number(key, range.clamp(snapped)))
    }

    /// Flip a boolean parameter. Returns `None` when `key` is not a flag.
    pub fn toggle(&mut self, key: &str) -> Option<Arc<ParameterSet>> {
        let current = self.current.flag(key)?;
        Some(self.set_flag(key, !current))
    }

    /// Restore the static preset for `model`, discarding all edits.
    pub fn reset(&mut self, model: ModelType) -> Arc<ParameterSet> {
        self.model = model;
        self.current = Arc::new(preset(model));
        debug!(model = %model, "parameters reset to preset");
        self.snapshot()
    }

    /// Switch to another model type (loads its preset).
    pub fn select(&mut self, model: ModelType) -> Arc<ParameterSet> {
        self.reset(model)
    }

    fn replace(&mut self, edit: impl FnOnce(&mut ParameterSet)) -> Arc<ParameterSet> {
        let mut next = (*self.current).clone();
        edit(&mut next);
        self.current = Arc::new(next);
        self.snapshot()
    }
}

/// Parse a number the way the sliders/inputs do: anything unparsable is `0`.
pub fn parse_number_or_zero(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComputationType, ZabrModel};

    fn asv_store() -> ParameterStore {
        ParameterStore::new(ModelType::Asv(ComputationType::DynamicAsv))
    }

    #[test]
    fn set_returns_new_snapshot_and_keeps_old_one() {
        let mut store = asv_store();
        let before = store.snapshot();
        let after = store.set("atm", "0.25");
        assert_eq!(before.number("atm"), Some(0.1929));
        assert_eq!(after.number("atm"), Some(0.25));
        assert_eq!(store.snapshot().number("atm"), Some(0.25));
    }

    #[test]
    fn unparsable_input_becomes_zero() {
        let mut store = asv_store();
        let p = store.set("skew", "abc");
        assert_eq!(p.number("skew"), Some(0.0));
        let p = store.set("skew", "");
        assert_eq!(p.number("skew"), Some(0.0));
    }

    #[test]
    fn unknown_keys_are_stored() {
        let mut store = asv_store();
        let p = store.set("my_custom_knob", "1.5");
        assert_eq!(p.number("my_custom_knob"), Some(1.5));
    }

    #[test]
    fn computation_type_is_stored_as_text() {
        let mut store = asv_store();
        let p = store.set("computationType", "density");
        assert_eq!(p.computation_type, "density");
    }

    #[test]
    fn reset_restores_exact_preset() {
        let mut store = asv_store();
        store.set("atm", "0.9");
        store.set("extra", "3");
        store.set("fwd", "nope");
        let model = store.model();
        let p = store.reset(model);
        assert_eq!(*p, preset(model));
    }

    #[test]
    fn select_switches_model_and_preset() {
        let mut store = asv_store();
        let p = store.select(ModelType::Zabr(ZabrModel::SabrPde));
        assert_eq!(store.model(), ModelType::Zabr(ZabrModel::SabrPde));
        assert_eq!(p.number("expiry"), Some(30.0));
        assert!(p.get("atm").is_none());
    }

    #[test]
    fn nudge_clamps_to_slider_range() {
        let mut store = ParameterStore::new(ModelType::Zabr(ZabrModel::ZabrClassic));
        let p = store.nudge("rho", 1).unwrap();
        assert!((p.number("rho").unwrap() - -0.47).abs() < 1e-12);
        let p = store.nudge("rho", -1000).unwrap();
        assert!((p.number("rho").unwrap() - -0.99).abs() < 1e-12);
        assert!(store.nudge("not_a_slider", 1).is_none());
    }

    #[test]
    fn toggle_flips_flags_only() {
        let mut store = ParameterStore::new(ModelType::Zabr(ZabrModel::ZabrClassic));
        let p = store.toggle("use_vol_adjustement").unwrap();
        assert_eq!(p.flag("use_vol_adjustement"), Some(false));
        assert!(store.toggle("alpha").is_none());
    }
}
