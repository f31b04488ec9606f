//! # KPI evaluation module
//!
//! Post-run evaluation of the lateral error history. All functions are pure
//! and never modify the log they are given.
//!
//! The steady state is measured over a tail window at the end of the log. The
//! settling band is centred on the steady state value, and its half width is
//! a fraction of the distance from the initial error to the steady state,
//! with a lower floor so that a run which starts on the path still has a
//! finite band.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod eval;
pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use serde::Serialize;

pub use eval::*;
pub use params::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of the key performance indicators of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiSummary {
    /// Peak excursion beyond the steady state, on the opposite side to the
    /// initial error, as a percentage of the initial error
    pub overshoot_pct: f64,

    /// Time from which the lateral error stays in the settling band, `None`
    /// if the run never settled
    ///
    /// Units: seconds
    pub settling_time_s: Option<f64>,

    /// Mean absolute lateral error over the tail window
    ///
    /// Units: meters
    pub steady_state_err_m: f64,

    /// Mean signed lateral error over the tail window
    ///
    /// Units: meters
    pub steady_state_value_m: f64,

    /// Peak absolute lateral error
    ///
    /// Units: meters
    pub peak_lat_err_m: f64,

    /// Root mean square lateral error
    ///
    /// Units: meters
    pub rms_lat_err_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during KPI evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KpiError {
    #[error("Cannot evaluate KPIs of an empty log")]
    EmptyLog,

    #[error("Time and lateral error series have different lengths ({times} and {lat_errs})")]
    LengthMismatch { times: usize, lat_errs: usize },

    #[error("Non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    #[error("Time does not increase at index {index}")]
    NonMonotonicTime { index: usize },

    #[error("Invalid KPI parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KpiSummary {
    /// The summary as a map from KPI name to value. An unsettled run has an
    /// infinite settling time.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        let mut map = BTreeMap::new();

        map.insert("overshoot_pct", self.overshoot_pct);
        map.insert(
            "settling_time_s",
            self.settling_time_s.unwrap_or(std::f64::INFINITY),
        );
        map.insert("steady_state_err_m", self.steady_state_err_m);
        map.insert("steady_state_value_m", self.steady_state_value_m);
        map.insert("peak_lat_err_m", self.peak_lat_err_m);
        map.insert("rms_lat_err_m", self.rms_lat_err_m);

        map
    }

    /// True if the run settled.
    pub fn settled(&self) -> bool {
        self.settling_time_s.is_some()
    }
}
