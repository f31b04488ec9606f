//! Run parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use comms_if::sim::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for a simulation run
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Fixed time step of the loop
    ///
    /// Units: seconds
    pub time_step_s: f64,

    /// Duration of the run
    ///
    /// Units: seconds
    pub duration_s: f64,

    /// Initial X position of the robot
    ///
    /// Units: meters
    #[serde(default)]
    pub init_x_m: f64,

    /// Initial Y position of the robot
    ///
    /// Units: meters
    #[serde(default)]
    pub init_y_m: f64,

    /// Initial heading of the robot
    ///
    /// Units: radians
    #[serde(default)]
    pub init_head_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// The initial pose of the robot.
    pub fn init_pose(&self) -> Pose {
        Pose::new(self.init_x_m, self.init_y_m, self.init_head_rad)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{kin_sim, kpi, line_ctrl, path_ref};
    use std::path::PathBuf;

    fn param_file(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("params")
            .join(name)
    }

    #[test]
    fn test_default_param_files() {
        let run: Params = util::params::load_from(param_file("run.toml")).unwrap();
        assert!(run.time_step_s > 0.0);
        assert_eq!(run.init_pose(), Pose::default());

        let path: path_ref::Params = util::params::load_from(param_file("path_ref.toml")).unwrap();
        assert_eq!(path.shape.type_name(), "curved");
        assert!(path_ref::PathRef::new(&path).is_ok());

        let sim: kin_sim::Params = util::params::load_from(param_file("kin_sim.toml")).unwrap();
        assert_eq!(sim.integrator, kin_sim::Integrator::Euler);

        let ctrl: line_ctrl::Params =
            util::params::load_from(param_file("line_ctrl.toml")).unwrap();
        assert!(line_ctrl::Controller::new(ctrl, run.time_step_s).is_ok());

        let kpi: kpi::Params = util::params::load_from(param_file("kpi.toml")).unwrap();
        assert_eq!(kpi, kpi::Params::default());
    }
}
