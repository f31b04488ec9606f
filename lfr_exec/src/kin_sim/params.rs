//! Kinematic simulation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the kinematic simulator
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Seed for the simulator's random number generator
    #[serde(default)]
    pub seed: u64,

    /// Standard deviation of the Gaussian noise added to the speed command
    ///
    /// Units: meters/second
    #[serde(default)]
    pub noise_speed_std_ms: f64,

    /// Standard deviation of the Gaussian noise added to the angular
    /// velocity command
    ///
    /// Units: radians/second
    #[serde(default)]
    pub noise_ang_vel_std_rads: f64,

    /// Magnitude of the angular velocity impulse applied during a
    /// disturbance. Zero disables disturbances.
    ///
    /// Units: radians/second
    #[serde(default)]
    pub dist_mag_rads: f64,

    /// Probability per step of a disturbance starting
    #[serde(default)]
    pub dist_prob: f64,

    /// Duration of a disturbance
    ///
    /// Units: seconds
    #[serde(default = "default_dist_duration_s")]
    pub dist_duration_s: f64,

    /// Integration scheme
    #[serde(default)]
    pub integrator: Integrator,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Fixed step integration schemes.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// Explicit Euler, using the heading at the start of the step
    Euler,

    /// Midpoint, using the heading half way through the step
    Midpoint,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            seed: 0,
            noise_speed_std_ms: 0.0,
            noise_ang_vel_std_rads: 0.0,
            dist_mag_rads: 0.0,
            dist_prob: 0.0,
            dist_duration_s: default_dist_duration_s(),
            integrator: Integrator::default(),
        }
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator::Euler
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_dist_duration_s() -> f64 {
    0.1
}
