//! # Controller interface
//!
//! Data returned by the controller to the simulator each step.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A velocity command for the robot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlCommand {
    /// Linear (forward) speed
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Angular velocity, +ve counter-clockwise
    ///
    /// Units: radians/second
    pub ang_vel_rads: f64,
}

/// The tracking error between the robot and the reference path.
///
/// Signs follow the right hand rule about Z: a +ve lateral error means the
/// path is to the robot's left, a +ve heading error means the path heading is
/// counter-clockwise of the robot's heading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackingError {
    /// Lateral error
    ///
    /// Units: meters
    pub lat_err_m: f64,

    /// Heading error in (-pi, pi]
    ///
    /// Units: radians
    pub head_err_rad: f64,

    /// Rate of change of the lateral error
    ///
    /// Units: meters/second
    pub lat_err_rate_ms: f64,
}

/// A demand issued by the controller for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CtrlDemand {
    /// Index of the step the demand responds to
    pub step: u64,

    /// The command to execute
    pub cmd: ControlCommand,

    /// The tracking error the command was computed from
    pub error: TrackingError,

    /// If true the controller could not track the path on this step and the
    /// command is the previous one held.
    pub tracking_lost: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A fault which prevents the controller producing any command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CtrlFault {
    /// The control law produced a non-finite command
    NumericDivergence {
        lat_err_m: f64,
        head_err_rad: f64,
        ang_vel_rads: f64,
        speed_ms: f64,
    },
}

/// The controller's response to a `SimState`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CtrlResponse {
    Demand(CtrlDemand),
    Fault { step: u64, fault: CtrlFault },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ControlCommand {
    /// Create a new command
    pub fn new(speed_ms: f64, ang_vel_rads: f64) -> Self {
        Self { speed_ms, ang_vel_rads }
    }

    /// The stop command
    pub fn stop() -> Self {
        Self::default()
    }

    /// Returns true if both elements of the command are finite.
    pub fn is_finite(&self) -> bool {
        self.speed_ms.is_finite() && self.ang_vel_rads.is_finite()
    }
}

impl CtrlResponse {
    /// Index of the step this response belongs to
    pub fn step(&self) -> u64 {
        match self {
            CtrlResponse::Demand(d) => d.step,
            CtrlResponse::Fault { step, .. } => *step,
        }
    }
}

impl std::fmt::Display for CtrlFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CtrlFault::NumericDivergence {
                lat_err_m,
                head_err_rad,
                ang_vel_rads,
                speed_ms,
            } => write!(
                f,
                "non-finite command (v = {} m/s, w = {} rad/s) from e_y = {} m, e_head = {} rad",
                speed_ms, ang_vel_rads, lat_err_m, head_err_rad
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_response_step() {
        let d = CtrlResponse::Demand(CtrlDemand {
            step: 4,
            cmd: ControlCommand::new(1.0, 0.1),
            error: TrackingError::default(),
            tracking_lost: false,
        });
        assert_eq!(d.step(), 4);

        let f = CtrlResponse::Fault {
            step: 9,
            fault: CtrlFault::NumericDivergence {
                lat_err_m: 0.0,
                head_err_rad: 0.0,
                ang_vel_rads: std::f64::NAN,
                speed_ms: 1.0,
            },
        };
        assert_eq!(f.step(), 9);
    }

    #[test]
    fn test_response_json() {
        let d = CtrlResponse::Demand(CtrlDemand {
            step: 1,
            cmd: ControlCommand::new(0.5, -0.2),
            error: TrackingError {
                lat_err_m: 0.1,
                head_err_rad: 0.0,
                lat_err_rate_ms: 0.0,
            },
            tracking_lost: true,
        });

        let s = serde_json::to_string(&d).unwrap();
        assert!(s.contains("\"tracking_lost\":true"));
        let back: CtrlResponse = serde_json::from_str(&s).unwrap();
        assert_eq!(back, d);
    }
}
