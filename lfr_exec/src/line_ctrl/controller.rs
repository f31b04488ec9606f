//! # Line controller
//!
//! The control law itself. The controller holds no mutable state: each call to
//! [`Controller::compute`] takes the current [`ControllerState`] and returns its successor as
//! part of the output.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{CtrlError, Gains, Params};
use crate::path_ref::{PathRef, RefPoint};
use comms_if::{
    ctrl::{ControlCommand, CtrlFault, TrackingError},
    sim::Pose,
};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The line controller.
#[derive(Debug, Clone)]
pub struct Controller {
    params: Params,

    /// Control period
    ///
    /// Units: seconds
    time_step_s: f64,
}

/// The evolving state of the controller, passed into and returned from each
/// call to `compute`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerState {
    /// The gains in use
    pub gains: Gains,

    /// The lateral error integral accumulation
    pub integral: f64,

    /// Lateral error from the previous sample, `None` before the first sample
    pub prev_lat_err_m: Option<f64>,

    /// The last command emitted, held while tracking is lost
    pub last_cmd: Option<ControlCommand>,

    /// The last tracking error computed
    pub last_error: TrackingError,
}

/// Output of one controller cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CtrlOutput {
    pub cmd: ControlCommand,
    pub state: ControllerState,
    pub error: TrackingError,
    pub report: CtrlReport,
}

/// Status report for a controller cycle, containing the intermediate terms of
/// the control law.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct CtrlReport {
    /// Step index of the cycle, set by the module wrapper
    pub step: u64,

    /// Simulation time of the cycle, set by the module wrapper
    pub time_s: f64,

    pub lat_err_m: f64,
    pub head_err_rad: f64,
    pub lat_err_rate_ms: f64,

    pub ref_x_m: f64,
    pub ref_y_m: f64,
    pub ref_head_rad: f64,
    pub ref_curv_m: f64,

    pub integral: f64,

    pub p_term: f64,
    pub i_term: f64,
    pub d_term: f64,
    pub head_term: f64,
    pub ff_term: f64,

    /// Angular velocity demand before saturation
    pub ang_vel_unsat_rads: f64,

    /// True if the angular velocity demand was saturated
    pub ang_vel_saturated: bool,

    pub speed_ms: f64,
    pub ang_vel_rads: f64,

    /// True if tracking was lost and the previous command held
    pub tracking_lost: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Controller {
    /// Create a new controller from the parameters and control period.
    pub fn new(params: Params, time_step_s: f64) -> Result<Self, CtrlError> {
        validate_params(&params)?;

        if !(time_step_s.is_finite() && time_step_s > 0.0) {
            return Err(CtrlError::InvalidParams(format!(
                "The time step must be finite and positive, found {}",
                time_step_s
            )));
        }

        Ok(Self {
            params,
            time_step_s,
        })
    }

    /// The state the controller starts a run in.
    pub fn initial_state(&self) -> ControllerState {
        ControllerState::new(self.params.gains)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Compute the command for the given pose.
    ///
    /// Returns the command, the successor state, the tracking error and a report. Loss of
    /// tracking is not an error, it is flagged in the report and the previous command is held.
    pub fn compute(
        &self,
        state: &ControllerState,
        pose: &Pose,
        path: &PathRef,
    ) -> Result<CtrlOutput, CtrlError> {
        // ---- ERRORS ----

        let ref_point = match path.project(pose) {
            Ok(r) => r,
            Err(e) => {
                debug!("Tracking lost, cannot project pose onto path: {}", e);
                return Ok(self.hold(state, state.last_error));
            }
        };

        let (lat_err_m, head_err_rad) = tracking_errors(&ref_point, pose);

        let lat_err_rate_ms = match state.prev_lat_err_m {
            Some(prev) => (lat_err_m - prev) / self.time_step_s,
            None => 0.0,
        };

        let error = TrackingError {
            lat_err_m,
            head_err_rad,
            lat_err_rate_ms,
        };

        if let Some(limit_m) = self.params.tracking_loss_limit_m {
            if lat_err_m.abs() > limit_m {
                debug!(
                    "Tracking lost, lateral error {:.3} m exceeds the {:.3} m limit",
                    lat_err_m, limit_m
                );
                return Ok(self.hold(state, error));
            }
        }

        // ---- CONTROL LAW ----

        let gains = &state.gains;

        // Integral is only accumulated when used, so a PD controller keeps it
        // at exactly zero
        let mut integral = state.integral;
        if gains.k_i > 0.0 {
            integral = (integral + lat_err_m * self.time_step_s)
                .clamp(-self.params.integral_limit, self.params.integral_limit);
        }

        let mut report = CtrlReport {
            lat_err_m,
            head_err_rad,
            lat_err_rate_ms,
            ref_x_m: ref_point.point_m[0],
            ref_y_m: ref_point.point_m[1],
            ref_head_rad: ref_point.head_rad,
            ref_curv_m: ref_point.curv_m,
            integral,
            p_term: gains.k_p * lat_err_m,
            i_term: gains.k_i * integral,
            d_term: gains.k_d * lat_err_rate_ms,
            head_term: gains.k_head * head_err_rad,
            ff_term: gains.k_ff * ref_point.curv_m,
            ..Default::default()
        };

        report.ang_vel_unsat_rads =
            report.p_term + report.i_term + report.d_term + report.head_term + report.ff_term;

        let max_ang_vel_rads = self.params.max_ang_vel_rads;
        let ang_vel_rads = report
            .ang_vel_unsat_rads
            .clamp(-max_ang_vel_rads, max_ang_vel_rads);
        report.ang_vel_saturated = report.ang_vel_unsat_rads.abs() > max_ang_vel_rads;

        let speed_ms = self.speed_demand(head_err_rad);

        let cmd = ControlCommand::new(speed_ms, ang_vel_rads);
        if !cmd.is_finite() {
            return Err(CtrlError::NumericDivergence(CtrlFault::NumericDivergence {
                lat_err_m,
                head_err_rad,
                ang_vel_rads,
                speed_ms,
            }));
        }

        report.speed_ms = speed_ms;
        report.ang_vel_rads = ang_vel_rads;

        trace!(
            "e_y = {:.4} m, e_head = {:.4} rad, cmd = ({:.3} m/s, {:.3} rad/s)",
            lat_err_m,
            head_err_rad,
            speed_ms,
            ang_vel_rads
        );

        Ok(CtrlOutput {
            cmd,
            state: ControllerState {
                gains: state.gains,
                integral,
                prev_lat_err_m: Some(lat_err_m),
                last_cmd: Some(cmd),
                last_error: error,
            },
            error,
            report,
        })
    }

    /// Speed demand for the given heading error.
    ///
    /// Equal to the nominal speed when aligned with the path, decreasing
    /// linearly with the magnitude of the heading error down to the minimum
    /// speed.
    pub fn speed_demand(&self, head_err_rad: f64) -> f64 {
        let p = &self.params;
        (p.nom_speed_ms * (1.0 - p.slow_gain * head_err_rad.abs()))
            .clamp(p.min_speed_ms, p.nom_speed_ms)
    }

    /// Output for a cycle in which tracking is lost: the previous command (or
    /// a stop) and the unchanged state.
    fn hold(&self, state: &ControllerState, error: TrackingError) -> CtrlOutput {
        let cmd = state.last_cmd.unwrap_or_else(ControlCommand::stop);

        CtrlOutput {
            cmd,
            state: *state,
            error,
            report: CtrlReport {
                lat_err_m: error.lat_err_m,
                head_err_rad: error.head_err_rad,
                lat_err_rate_ms: error.lat_err_rate_ms,
                integral: state.integral,
                speed_ms: cmd.speed_ms,
                ang_vel_rads: cmd.ang_vel_rads,
                tracking_lost: true,
                ..Default::default()
            },
        }
    }
}

impl ControllerState {
    /// A fresh state with the given gains.
    pub fn new(gains: Gains) -> Self {
        Self {
            gains,
            integral: 0.0,
            prev_lat_err_m: None,
            last_cmd: None,
            last_error: TrackingError::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculate the lateral and heading errors of the pose relative to the
/// reference point.
///
/// The lateral error is positive if the path is to the left of the robot,
/// the heading error is positive if the path points counter-clockwise of the
/// robot.
pub fn tracking_errors(ref_point: &RefPoint, pose: &Pose) -> (f64, f64) {
    let pos_m = Vector2::new(pose.x_m, pose.y_m);
    let left_normal = Vector2::new(-ref_point.head_rad.sin(), ref_point.head_rad.cos());

    let lat_err_m = (ref_point.point_m - pos_m).dot(&left_normal);
    let head_err_rad = wrap_pi(ref_point.head_rad - pose.head_rad);

    (lat_err_m, head_err_rad)
}

fn validate_params(params: &Params) -> Result<(), CtrlError> {
    let invalid = |msg: String| Err(CtrlError::InvalidParams(msg));

    let g = &params.gains;
    for (name, value) in &[
        ("k_p", g.k_p),
        ("k_i", g.k_i),
        ("k_d", g.k_d),
        ("k_head", g.k_head),
        ("k_ff", g.k_ff),
    ] {
        if !value.is_finite() {
            return invalid(format!("Gain {} must be finite, found {}", name, value));
        }
    }
    if g.k_i < 0.0 {
        return invalid(format!("Gain k_i must be non-negative, found {}", g.k_i));
    }

    if !(params.nom_speed_ms.is_finite() && params.nom_speed_ms > 0.0) {
        return invalid(format!(
            "nom_speed_ms must be finite and positive, found {}",
            params.nom_speed_ms
        ));
    }
    if !(params.min_speed_ms.is_finite()
        && params.min_speed_ms >= 0.0
        && params.min_speed_ms <= params.nom_speed_ms)
    {
        return invalid(format!(
            "min_speed_ms must be in [0, {}], found {}",
            params.nom_speed_ms, params.min_speed_ms
        ));
    }
    if !(params.slow_gain.is_finite() && params.slow_gain >= 0.0) {
        return invalid(format!(
            "slow_gain must be finite and non-negative, found {}",
            params.slow_gain
        ));
    }
    if !(params.integral_limit.is_finite() && params.integral_limit > 0.0) {
        return invalid(format!(
            "integral_limit must be finite and positive, found {}",
            params.integral_limit
        ));
    }
    if !(params.max_ang_vel_rads.is_finite() && params.max_ang_vel_rads > 0.0) {
        return invalid(format!(
            "max_ang_vel_rads must be finite and positive, found {}",
            params.max_ang_vel_rads
        ));
    }
    if let Some(limit_m) = params.tracking_loss_limit_m {
        if !(limit_m.is_finite() && limit_m > 0.0) {
            return invalid(format!(
                "tracking_loss_limit_m must be finite and positive, found {}",
                limit_m
            ));
        }
    }

    Ok(())
}
