//! # Kinematic simulation module
//!
//! Simulates a differential drive (unicycle) robot. Given a linear speed `v` and angular velocity
//! `w` the robot moves according to
//!
//! ```text
//! x' = v cos(head)
//! y' = v sin(head)
//! head' = w
//! ```
//!
//! which is integrated with a fixed step. Before integration the commanded speeds can be
//! disturbed by additive Gaussian noise, and by occasional angular impulses which last for a
//! short time. All randomness comes from the random number generator given to the simulator, so
//! runs with the same seed are identical.
//!
//! The simulator is a simple state machine: it is `Idle` until started from an initial pose,
//! `Running` while it accepts commands, and `Stopped` once the run ends. `Stopped` is terminal.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{ctrl::ControlCommand, sim::Pose};
use util::archive::ArchiveError;

pub use params::{Integrator, Params};
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The modes of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMode {
    Idle,
    Running,
    Stopped,
}

/// Possible errors that can occur during simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Invalid simulator parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid initial pose: {0:?}")]
    InvalidInitialPose(Pose),

    #[error("The time step must be finite and positive, found {0}")]
    InvalidTimeStep(f64),

    #[error("The command must be finite, found {0:?}")]
    InvalidCommand(ControlCommand),

    #[error("The simulator is not running (mode is {0:?})")]
    NotRunning(SimMode),

    #[error("The simulator has already been started (mode is {0:?})")]
    AlreadyStarted(SimMode),

    #[error("The simulated pose diverged to {pose:?} under command {cmd:?}")]
    NumericDivergence { pose: Pose, cmd: ControlCommand },

    #[error("Could not initialise the simulator archive: {0}")]
    ArchiveInitError(ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimError {
    /// Returns true if the error is caused by invalid configuration (parameters, time step or
    /// command) rather than by the simulation itself.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SimError::InvalidParams(_)
                | SimError::InvalidInitialPose(_)
                | SimError::InvalidTimeStep(_)
                | SimError::InvalidCommand(_)
        )
    }
}
