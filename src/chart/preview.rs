//! Client-side preview curves for the dynamic ASV/SVI widgets.
//!
//! These are closed-form placeholders (a parabola in moneyness and a Gaussian
//! density), drawn instantly on every edit while the backend recomputes.

use std::f64::consts::PI;

use crate::domain::ParameterSet;

/// Number of strikes on the preview grid.
pub const PREVIEW_POINTS: usize = 100;

/// Vol floor applied by the preview smile.
pub const MIN_PREVIEW_VOL: f64 = 0.1;

/// Default time-to-expiry when `time` is missing or zero.
const DEFAULT_TIME: f64 = 0.333;

/// Smile shape inputs read from a parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmileShape {
    pub fwd: f64,
    pub time: f64,
    pub atm: f64,
    pub skew: f64,
    pub smile: f64,
}

/// Shape the widget starts from; the "initial" curve is always drawn with it.
pub const INITIAL_SHAPE: SmileShape = SmileShape {
    fwd: 1.0,
    time: DEFAULT_TIME,
    atm: 0.1929,
    skew: 0.02268,
    smile: 0.00317,
};

impl SmileShape {
    /// Read the shape from `params`; missing keys fall back to `INITIAL_SHAPE`.
    pub fn from_params(params: &ParameterSet) -> Self {
        let fwd = params
            .number("fwd")
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(INITIAL_SHAPE.fwd);
        let time = params
            .number("time")
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_TIME);
        Self {
            fwd,
            time,
            atm: params.number("atm").unwrap_or(INITIAL_SHAPE.atm),
            skew: params.number("skew").unwrap_or(INITIAL_SHAPE.skew),
            smile: params.number("smile").unwrap_or(INITIAL_SHAPE.smile),
        }
    }

    pub fn vol(&self, strike: f64) -> f64 {
        let x = (strike - self.fwd) / self.fwd;
        (self.atm + self.skew * x + self.smile * x * x).max(MIN_PREVIEW_VOL)
    }

    pub fn density(&self, strike: f64) -> f64 {
        let vol = self.vol(strike);
        let z = (strike - self.fwd) / (vol * self.time.sqrt());
        (-0.5 * z * z).exp() / (vol * (2.0 * PI * self.time).sqrt())
    }
}

/// `[max(0.1, 0.5·fwd), 1.5·fwd]` sampled at `PREVIEW_POINTS` strikes.
pub fn strike_grid(fwd: f64) -> Vec<f64> {
    let lo = (fwd * 0.5).max(0.1);
    let hi = fwd * 1.5;
    let n = PREVIEW_POINTS;
    (0..n)
        .map(|i| lo + i as f64 * (hi - lo) / (n as f64 - 1.0))
        .collect()
}

/// One preview row: the initial curve and the current curve at a strike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewPoint {
    pub strike: f64,
    pub initial: f64,
    pub current: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Smile,
    Density,
}

impl PreviewKind {
    pub fn toggle(self) -> Self {
        match self {
            PreviewKind::Smile => PreviewKind::Density,
            PreviewKind::Density => PreviewKind::Smile,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PreviewKind::Smile => "Preview: volatility smile",
            PreviewKind::Density => "Preview: density",
        }
    }
}

/// Compute a preview curve over the grid of the *current* forward.
pub fn preview(kind: PreviewKind, params: &ParameterSet) -> Vec<PreviewPoint> {
    let current = SmileShape::from_params(params);
    strike_grid(current.fwd)
        .into_iter()
        .map(|strike| {
            let (initial, now) = match kind {
                PreviewKind::Smile => (INITIAL_SHAPE.vol(strike), current.vol(strike)),
                PreviewKind::Density => (INITIAL_SHAPE.density(strike), current.density(strike)),
            };
            PreviewPoint {
                strike,
                initial,
                current: now,
            }
        })
        .collect()
}
