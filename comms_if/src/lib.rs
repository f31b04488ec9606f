//! # Communications interface crate.
//!
//! Provides the interface types passed between the simulator and the
//! controller, and the transport used to carry them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulator side data: the robot pose and the per-step state message
pub mod sim;

/// Controller side data: commands, tracking errors and controller responses
pub mod ctrl;

/// Transport module
pub mod net;
