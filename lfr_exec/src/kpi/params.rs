//! KPI evaluation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for KPI evaluation
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Fraction of the log, taken from the end, over which the steady state
    /// is measured. Must be in (0, 1].
    #[serde(default = "default_tail_frac")]
    pub tail_frac: f64,

    /// Half width of the settling band as a fraction of the distance between
    /// the initial and steady state lateral errors.
    #[serde(default = "default_settling_tol_frac")]
    pub settling_tol_frac: f64,

    /// Minimum half width of the settling band. Also the initial lateral
    /// error below which overshoot is not measured.
    ///
    /// Units: meters
    #[serde(default = "default_band_floor_m")]
    pub band_floor_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            tail_frac: default_tail_frac(),
            settling_tol_frac: default_settling_tol_frac(),
            band_floor_m: default_band_floor_m(),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_tail_frac() -> f64 {
    0.1
}

fn default_settling_tol_frac() -> f64 {
    0.02
}

fn default_band_floor_m() -> f64 {
    1e-3
}
