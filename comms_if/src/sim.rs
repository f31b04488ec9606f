//! # Simulator interface
//!
//! Data published by the simulator to the controller each step.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::wrap_pi;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The pose (position and heading in the world frame) of the robot.
///
/// The heading is measured counter-clockwise from the +ve x axis and is
/// always held in the range (-pi, pi].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// X position
    ///
    /// Units: meters
    pub x_m: f64,

    /// Y position
    ///
    /// Units: meters
    pub y_m: f64,

    /// Heading
    ///
    /// Units: radians
    pub head_rad: f64,
}

/// State message sent from the simulator to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Index of the step this state belongs to
    pub step: u64,

    /// Simulation time at the start of the step
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Pose of the robot at the start of the step
    pub pose: Pose,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    /// Create a new pose, normalising the heading.
    pub fn new(x_m: f64, y_m: f64, head_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            head_rad: wrap_pi(head_rad),
        }
    }

    /// Returns true if all elements of the pose are finite.
    pub fn is_finite(&self) -> bool {
        self.x_m.is_finite() && self.y_m.is_finite() && self.head_rad.is_finite()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_pose_normalised() {
        let p = Pose::new(1.0, 2.0, 3.0 * PI / 2.0);
        assert!((p.head_rad + PI / 2.0).abs() < 1e-12);

        let p = Pose::new(0.0, 0.0, -PI);
        assert_eq!(p.head_rad, PI);
    }

    #[test]
    fn test_pose_finite() {
        assert!(Pose::new(0.0, 0.0, 0.0).is_finite());
        assert!(!Pose::new(std::f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Pose::new(0.0, std::f64::INFINITY, 0.0).is_finite());
    }
}
