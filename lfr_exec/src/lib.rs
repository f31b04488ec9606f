//! # Line following robot library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access the modules of
//! the line following simulation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Kinematic simulation - integrates the unicycle model of the robot
pub mod kin_sim;

/// Key performance indicators - evaluates the lateral error history of a run
pub mod kpi;

/// Line control - keeps the robot on the reference path
pub mod line_ctrl;

/// Path reference - the path to follow and projection onto it
pub mod path_ref;

/// Run driver - alternates the controller and simulator over a fixed step loop
pub mod run;
