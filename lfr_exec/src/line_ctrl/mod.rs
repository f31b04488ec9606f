//! # Line following control module
//!
//! Line following control keeps the robot on the reference path. Each cycle the robot's pose is
//! projected onto the path to find the nearest reference point, from which two errors are found:
//!
//! - The lateral error is the signed distance from the robot to the path, measured along the
//!   path's left normal. It is positive when the path lies to the robot's left.
//! - The heading error is the path's tangent heading minus the robot's heading, wrapped into
//!   (-pi, pi]. It is positive when the path points counter-clockwise of the robot.
//!
//! The angular velocity demand is the sum of a PID term on the lateral error, a proportional term
//! on the heading error and a feedforward term on the path curvature, saturated to the maximum
//! turn rate. The speed demand is reduced as the heading error grows, so the robot slows down
//! while it is badly aligned with the path.
//!
//! If the projection fails, or the lateral error exceeds the tracking loss limit, tracking is
//! considered lost. The previous command is then held and the controller's state is frozen until
//! tracking is recovered.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controller;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::ctrl::CtrlFault;
use util::archive::ArchiveError;

pub use controller::*;
pub use params::{Gains, Params};
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur in line control.
#[derive(Debug, thiserror::Error)]
pub enum CtrlError {
    #[error("Invalid controller parameters: {0}")]
    InvalidParams(String),

    #[error("Controller output diverged: {0}")]
    NumericDivergence(CtrlFault),

    #[error("Could not initialise the controller archive: {0}")]
    ArchiveInitError(ArchiveError),
}
