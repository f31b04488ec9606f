//! # Path reference module
//!
//! The path reference supplies the path the robot shall follow. Paths are either analytic curves
//! of the form `y = f(x)` over a finite domain of `x`, or a sampled polyline of waypoints.
//!
//! For any pose the module finds the closest point on the path (the reference point), the
//! heading of the path's tangent at that point and the signed curvature of the path there. The
//! tangent points in the direction of increasing path parameter, and curvature is positive for a
//! left (counter-clockwise) turn.
//!
//! Projection is stateless: the same pose always projects onto the same reference point. Poses
//! beyond the ends of the path project onto the nearest endpoint.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
mod path;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

pub use params::{Params, PathShape};
pub use path::PathRef;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The result of projecting a pose onto the path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefPoint {
    /// Path parameter of the point. For analytic paths this is the x
    /// coordinate, for waypoint paths the distance along the path.
    pub param: f64,

    /// Position of the reference point
    ///
    /// Units: meters
    pub point_m: Vector2<f64>,

    /// Heading of the path tangent (angle to the +ve x axis)
    ///
    /// Units: radians
    pub head_rad: f64,

    /// Signed curvature, +ve for a left turn
    ///
    /// Units: 1/meters
    pub curv_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with the path reference.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum PathError {
    #[error("Invalid path definition: {0}")]
    InvalidParams(String),

    #[error("Could not project the pose ({x_m}, {y_m}) onto the path")]
    ProjectionFailed { x_m: f64, y_m: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RefPoint {
    /// Unit vector pointing along the path tangent.
    pub fn direction(&self) -> Vector2<f64> {
        Vector2::new(self.head_rad.cos(), self.head_rad.sin())
    }

    /// Returns true if all elements of the point are finite.
    pub fn is_finite(&self) -> bool {
        self.param.is_finite()
            && self.point_m.iter().all(|v| v.is_finite())
            && self.head_rad.is_finite()
            && self.curv_m.is_finite()
    }
}
