//! Static preset tables and slider ranges for every model type.

use crate::domain::{ComputationType, ModelType, ParamValue, ParameterSet, ZabrModel};

const VOLATILITY_ASV: &[(&str, f64)] = &[
    ("n", 400.0),
    ("spot", 2245.0656),
    ("expiry", 1.0),
    ("r", 0.003),
    ("q", 0.0022),
    ("beta", 0.4158),
    ("rho", 0.2256),
    ("volvol", 0.2),
];

const DENSITY: &[(&str, f64)] = &[
    ("n", 150.0),
    ("spot", 2000.0),
    ("expiry", 0.5),
    ("r", 0.02),
    ("q", 0.01),
    ("beta", 0.5),
    ("rho", -0.3),
    ("volvol", 0.3),
];

const VOLATILITY_SVI: &[(&str, f64)] = &[
    ("n", 100.0),
    ("spot", 1800.0),
    ("expiry", 0.25),
    ("r", 0.015),
    ("q", 0.005),
    ("beta", 0.7),
    ("rho", 0.1),
    ("volvol", 0.4),
];

const DYNAMIC_BASE: &[(&str, f64)] = &[
    ("n", 400.0),
    ("spot", 2273.684211),
    ("expiry", 1.0),
    ("r", 0.003),
    ("q", 0.0022),
    ("beta", 0.4158),
    ("rho", 0.2256),
    ("volvol", 0.2),
    ("fwd", 1.0),
    ("time", 0.333),
];

const DYNAMIC_ASV_EXTRA: &[(&str, f64)] = &[
    ("ctrl_p", 0.2),
    ("ctrl_c", 0.2),
    ("atm", 0.1929),
    ("skew", 0.02268),
    ("smile", 0.00317),
    ("put", 0.00213),
    ("call", 0.00006),
];

const DYNAMIC_SVI_EXTRA: &[(&str, f64)] = &[("b", 0.1), ("m", 0.01), ("sigma", 0.4)];

const ZABR_CLASSIC: &[(&str, f64)] = &[
    ("forward", 0.03),
    ("expiry", 10.0),
    ("alpha", 0.09),
    ("beta", 0.7),
    ("vol_of_vol", 0.47),
    ("rho", -0.48),
    ("shift", 0.0),
    ("gamma", 1.0),
    ("N", 100.0),
    ("timesteps", 5.0),
    ("nd", 5.0),
];

const SABR_PDE: &[(&str, f64)] = &[
    ("forward", 0.02),
    ("expiry", 30.0),
    ("alpha", 0.035),
    ("beta", 0.25),
    ("vol_of_vol", 1.0),
    ("rho", -0.1),
    ("shift", 0.0),
    ("gamma", 1.0),
    ("N", 100.0),
    ("timesteps", 5.0),
    ("nd", 5.0),
];

const ZABR_MIXTURE: &[(&str, f64)] = &[
    ("forward", -0.0007),
    ("expiry", 30.0),
    ("alpha", 0.0132),
    ("beta", 0.2),
    ("vol_of_vol", 0.1978),
    ("rho", -0.444),
    ("shift", 0.0),
    ("gamma", 1.0),
    ("beta1", 0.2),
    ("beta2", 1.25),
    ("d", 0.2),
    ("high_strike", 0.1),
    ("vol_low", 0.0001),
    ("low_strike", 0.02),
    ("forward_cut_off", 0.02),
    ("smothing_factor", 0.001),
];

/// Wire name of the ZABR vol-adjustment toggle (spelling is the backend's).
pub const VOL_ADJUSTMENT_KEY: &str = "use_vol_adjustement";

/// Build the static preset for a model type.
///
/// The returned set is a fresh copy; callers are free to mutate it.
pub fn preset(model: ModelType) -> ParameterSet {
    let mut set = ParameterSet::new(model.as_str());
    for table in preset_tables(model) {
        for &(key, value) in *table {
            set.insert(key, ParamValue::Number(value));
        }
    }
    if let ModelType::Zabr(_) = model {
        set.insert(VOL_ADJUSTMENT_KEY, ParamValue::Flag(true));
    }
    set
}

fn preset_tables(model: ModelType) -> &'static [&'static [(&'static str, f64)]] {
    match model {
        ModelType::Asv(ComputationType::VolatilityAsv) => &[VOLATILITY_ASV],
        ModelType::Asv(ComputationType::Density) => &[DENSITY],
        ModelType::Asv(ComputationType::VolatilitySvi) => &[VOLATILITY_SVI],
        ModelType::Asv(ComputationType::DynamicAsv) => &[DYNAMIC_BASE, DYNAMIC_ASV_EXTRA],
        ModelType::Asv(ComputationType::DynamicSvi) => &[DYNAMIC_BASE, DYNAMIC_SVI_EXTRA],
        ModelType::Zabr(ZabrModel::ZabrClassic) => &[ZABR_CLASSIC],
        ModelType::Zabr(ZabrModel::SabrPde) => &[SABR_PDE],
        ModelType::Zabr(ZabrModel::ZabrMixture) => &[ZABR_MIXTURE],
    }
}

/// Slider bounds for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SliderRange {
    const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Slider range for `key` under `model`, if the widget exposes one.
///
/// Keys without a range (e.g. `spot`, `n` on the static ASV types) are still
/// editable by typing a value; they just cannot be nudged.
pub fn slider_range(model: ModelType, key: &str) -> Option<SliderRange> {
    match model {
        ModelType::Asv(ComputationType::DynamicSvi) => match key {
            "fwd" => Some(SliderRange::new(0.25, 2.5, 0.01)),
            "time" => Some(SliderRange::new(0.1, 10.0, 0.001)),
            "b" => Some(SliderRange::new(0.01, 1.0, 0.01)),
            "m" => Some(SliderRange::new(-5.0, 5.0, 0.001)),
            "sigma" => Some(SliderRange::new(-1.0, 1.0, 0.01)),
            _ => None,
        },
        ModelType::Asv(_) => match key {
            "fwd" => Some(SliderRange::new(0.25, 5.0, 0.01)),
            "time" => Some(SliderRange::new(0.1, 10.0, 0.001)),
            "ctrl_p" | "ctrl_c" => Some(SliderRange::new(0.05, 1.0, 0.01)),
            "atm" => Some(SliderRange::new(0.0001, 1.0, 0.0001)),
            "skew" => Some(SliderRange::new(-0.95, 0.95, 0.00001)),
            "smile" | "put" | "call" => Some(SliderRange::new(-2.0, 2.0, 0.00001)),
            "n" => Some(SliderRange::new(10.0, 2000.0, 10.0)),
            "beta" => Some(SliderRange::new(0.0, 1.0, 0.001)),
            "rho" => Some(SliderRange::new(-1.0, 1.0, 0.001)),
            _ => None,
        },
        ModelType::Zabr(_) => match key {
            "forward" => Some(SliderRange::new(-0.01, 0.1, 0.0001)),
            "expiry" => Some(SliderRange::new(1.0, 30.0, 1.0)),
            "alpha" => Some(SliderRange::new(0.001, 0.5, 0.0001)),
            "beta" => Some(SliderRange::new(0.1, 1.0, 0.01)),
            "vol_of_vol" | "nu" => Some(SliderRange::new(0.1, 2.0, 0.01)),
            "rho" => Some(SliderRange::new(-0.99, 0.99, 0.01)),
            "gamma" => Some(SliderRange::new(0.1, 3.0, 0.01)),
            "shift" => Some(SliderRange::new(-0.1, 0.1, 0.001)),
            "N" => Some(SliderRange::new(50.0, 500.0, 1.0)),
            "timesteps" => Some(SliderRange::new(1.0, 100.0, 1.0)),
            "nd" => Some(SliderRange::new(1.0, 10.0, 1.0)),
            "beta1" | "d" | "high_strike" => Some(SliderRange::new(0.01, 1.0, 0.01)),
            "beta2" => Some(SliderRange::new(0.1, 5.0, 0.01)),
            "vol_low" => Some(SliderRange::new(0.00001, 0.01, 0.00001)),
            "low_strike" | "forward_cut_off" => Some(SliderRange::new(0.001, 0.1, 0.001)),
            "smothing_factor" => Some(SliderRange::new(0.0001, 0.01, 0.0001)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatility_asv_preset_matches_table() {
        let p = preset(ModelType::Asv(ComputationType::VolatilityAsv));
        assert_eq!(p.computation_type, "volatility_asv");
        assert_eq!(p.len(), 8);
        assert_eq!(p.number("n"), Some(400.0));
        assert_eq!(p.number("spot"), Some(2245.0656));
        assert_eq!(p.number("volvol"), Some(0.2));
    }

    #[test]
    fn dynamic_presets_carry_shared_base() {
        let asv = preset(ModelType::Asv(ComputationType::DynamicAsv));
        let svi = preset(ModelType::Asv(ComputationType::DynamicSvi));
        assert_eq!(asv.number("fwd"), svi.number("fwd"));
        assert_eq!(asv.number("atm"), Some(0.1929));
        assert_eq!(svi.number("sigma"), Some(0.4));
        assert!(svi.get("atm").is_none());
    }

    #[test]
    fn zabr_presets_enable_vol_adjustment() {
        for model in ZabrModel::ALL {
            let p = preset(ModelType::Zabr(model));
            assert_eq!(p.flag(VOL_ADJUSTMENT_KEY), Some(true));
            assert_eq!(p.computation_type, model.as_str());
        }
        let mixture = preset(ModelType::Zabr(ZabrModel::ZabrMixture));
        assert_eq!(mixture.number("forward"), Some(-0.0007));
        assert!(mixture.get("N").is_none());
    }

    #[test]
    fn svi_forward_range_is_narrower() {
        let asv = slider_range(ModelType::Asv(ComputationType::DynamicAsv), "fwd").unwrap();
        let svi = slider_range(ModelType::Asv(ComputationType::DynamicSvi), "fwd").unwrap();
        assert_eq!(asv.max, 5.0);
        assert_eq!(svi.max, 2.5);
    }
}
