//! # Run module
//!
//! Drives a single closed loop run. Each step the simulator's pose is sent to the controller over
//! a [`Link`](comms_if::net::Link), the response is checked to belong to the same step, the step is
//! logged, and the command is applied to the simulator. The controller and simulator strictly
//! alternate, whether the controller is called directly or runs on another thread.
//!
//! A run ends when its duration is reached, when a [`StopHandle`] is triggered, or when a failure
//! occurs. Failures are reported with a [`Diagnostic`] describing the step in which they
//! happened, and the log collected up to that point is kept.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod driver;
pub mod params;
mod traj_log;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use driver::*;
pub use params::Params;
pub use traj_log::*;
