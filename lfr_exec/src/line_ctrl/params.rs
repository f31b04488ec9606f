//! Line control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for line control
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Controller gains
    pub gains: Gains,

    /// Nominal (maximum) speed demand
    ///
    /// Units: meters/second
    pub nom_speed_ms: f64,

    /// Minimum speed demand
    ///
    /// Units: meters/second
    pub min_speed_ms: f64,

    /// Rate at which the speed demand is reduced with heading error
    ///
    /// Units: 1/radians
    pub slow_gain: f64,

    /// Limit on the magnitude of the lateral error integral
    ///
    /// Units: meter seconds
    #[serde(default = "default_integral_limit")]
    pub integral_limit: f64,

    /// Limit on the magnitude of the angular velocity demand
    ///
    /// Units: radians/second
    pub max_ang_vel_rads: f64,

    /// The limit on lateral error. Above this limit tracking is considered
    /// lost and the previous command is held.
    ///
    /// Units: meters
    #[serde(default)]
    pub tracking_loss_limit_m: Option<f64>,
}

/// Gains of the line controller.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    /// Lateral error proportional gain
    pub k_p: f64,

    /// Lateral error integral gain. Zero gives a PD controller.
    #[serde(default)]
    pub k_i: f64,

    /// Lateral error derivative gain
    #[serde(default)]
    pub k_d: f64,

    /// Heading error proportional gain
    pub k_head: f64,

    /// Curvature feedforward gain
    #[serde(default)]
    pub k_ff: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_integral_limit() -> f64 {
    1.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_params() {
        let p: Params = util::params::from_str(
            r#"
            nom_speed_ms = 1.0
            min_speed_ms = 0.3
            slow_gain = 1.0
            max_ang_vel_rads = 2.0

            [gains]
            k_p = 1.5
            k_d = 0.1
            k_head = 2.5
            k_ff = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(p.gains.k_i, 0.0);
        assert_eq!(p.gains.k_ff, 1.0);
        assert_eq!(p.integral_limit, 1.0);
        assert_eq!(p.tracking_loss_limit_m, None);
    }
}
