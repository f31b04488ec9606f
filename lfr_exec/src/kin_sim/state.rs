//! Kinematic simulator state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;

// Internal
use super::{Integrator, Params, SimError, SimMode};
use comms_if::{ctrl::ControlCommand, sim::Pose};
use util::{archive::Archiver, module::State, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic simulator.
///
/// Generic over the random number generator so that tests can supply their
/// own. When initialised through [`State::init`] the generator is seeded from
/// the parameters.
pub struct KinSim<R: Rng = StdRng> {
    params: Params,

    mode: SimMode,

    pose: Pose,

    time_s: f64,

    num_steps: u64,

    rng: R,

    speed_noise: Normal<f64>,

    ang_vel_noise: Normal<f64>,

    /// Number of steps left in the current disturbance
    dist_steps_remaining: usize,

    /// Angular velocity of the current disturbance
    dist_ang_vel_rads: f64,

    report: StatusReport,

    arch_report: Archiver,
}

/// Input to one cyclic step of the simulator.
#[derive(Debug, Clone, Copy)]
pub struct SimInput {
    pub cmd: ControlCommand,
    pub dt_s: f64,
}

/// Status report from the last simulator step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    /// Index of the step this report was produced in
    pub step: u64,

    /// Simulation time at the end of the step
    pub time_s: f64,

    /// Noise added to the speed command
    pub speed_noise_ms: f64,

    /// Noise added to the angular velocity command
    pub ang_vel_noise_rads: f64,

    /// Angular velocity added by a disturbance
    pub dist_ang_vel_rads: f64,

    /// True if a disturbance was applied this step
    pub disturbance_active: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<R: Rng> KinSim<R> {
    /// Create a new simulator in the `Idle` mode.
    pub fn new(params: Params, rng: R) -> Result<Self, SimError> {
        validate_params(&params)?;

        let speed_noise = Normal::new(0.0, params.noise_speed_std_ms)
            .map_err(|e| SimError::InvalidParams(e.to_string()))?;
        let ang_vel_noise = Normal::new(0.0, params.noise_ang_vel_std_rads)
            .map_err(|e| SimError::InvalidParams(e.to_string()))?;

        Ok(Self {
            params,
            mode: SimMode::Idle,
            pose: Pose::default(),
            time_s: 0.0,
            num_steps: 0,
            rng,
            speed_noise,
            ang_vel_noise,
            dist_steps_remaining: 0,
            dist_ang_vel_rads: 0.0,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        })
    }

    /// Start the simulation from the given pose.
    pub fn start(&mut self, pose: Pose) -> Result<(), SimError> {
        if self.mode != SimMode::Idle {
            return Err(SimError::AlreadyStarted(self.mode));
        }

        if !pose.is_finite() {
            return Err(SimError::InvalidInitialPose(pose));
        }

        self.pose = Pose::new(pose.x_m, pose.y_m, pose.head_rad);
        self.time_s = 0.0;
        self.num_steps = 0;
        self.mode = SimMode::Running;

        debug!("Simulation started from {:?}", self.pose);

        Ok(())
    }

    /// Stop the simulation. Once stopped the simulator cannot be restarted.
    pub fn stop(&mut self) {
        if self.mode != SimMode::Stopped {
            debug!(
                "Simulation stopped after {} steps ({:.3} s)",
                self.num_steps, self.time_s
            );
        }
        self.mode = SimMode::Stopped;
    }

    /// Advance the simulation by `dt_s` seconds under the given command,
    /// returning the new pose.
    ///
    /// If the integration produces a non-finite pose the simulator is stopped
    /// and `NumericDivergence` is returned.
    pub fn step(&mut self, cmd: ControlCommand, dt_s: f64) -> Result<Pose, SimError> {
        if self.mode != SimMode::Running {
            return Err(SimError::NotRunning(self.mode));
        }
        if !(dt_s.is_finite() && dt_s > 0.0) {
            return Err(SimError::InvalidTimeStep(dt_s));
        }
        if !cmd.is_finite() {
            return Err(SimError::InvalidCommand(cmd));
        }

        let mut report = StatusReport::default();

        // Gaussian noise, only drawn when enabled so the generator is not
        // advanced by a noiseless simulator
        if self.params.noise_speed_std_ms > 0.0 {
            report.speed_noise_ms = self.speed_noise.sample(&mut self.rng);
        }
        if self.params.noise_ang_vel_std_rads > 0.0 {
            report.ang_vel_noise_rads = self.ang_vel_noise.sample(&mut self.rng);
        }

        // Disturbance impulses
        if self.dist_steps_remaining == 0
            && self.params.dist_mag_rads > 0.0
            && self.rng.gen::<f64>() < self.params.dist_prob
        {
            let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            self.dist_ang_vel_rads = sign * self.params.dist_mag_rads;
            self.dist_steps_remaining =
                ((self.params.dist_duration_s / dt_s).floor() as usize).max(1);

            debug!(
                "Disturbance of {:.3} rad/s for {} steps at t = {:.3} s",
                self.dist_ang_vel_rads, self.dist_steps_remaining, self.time_s
            );
        }
        if self.dist_steps_remaining > 0 {
            report.dist_ang_vel_rads = self.dist_ang_vel_rads;
            report.disturbance_active = true;
            self.dist_steps_remaining -= 1;
        }

        let applied = ControlCommand::new(
            cmd.speed_ms + report.speed_noise_ms,
            cmd.ang_vel_rads + report.ang_vel_noise_rads + report.dist_ang_vel_rads,
        );

        let raw = integrate(self.params.integrator, &self.pose, &applied, dt_s);

        if !raw.is_finite() {
            self.mode = SimMode::Stopped;
            return Err(SimError::NumericDivergence { pose: raw, cmd: applied });
        }

        self.pose = Pose::new(raw.x_m, raw.y_m, raw.head_rad);
        self.time_s += dt_s;
        self.num_steps += 1;

        report.step = self.num_steps;
        report.time_s = self.time_s;
        self.report = report;

        if let Err(e) = self.arch_report.serialise(&self.report) {
            warn!("Could not archive simulator report: {}", e);
        }

        Ok(self.pose)
    }

    /// Current mode of the simulator
    pub fn mode(&self) -> SimMode {
        self.mode
    }

    /// Current pose of the robot
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Simulation time since start
    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// Status report from the most recent step
    pub fn report(&self) -> &StatusReport {
        &self.report
    }
}

impl<R: Rng + SeedableRng> State for KinSim<R> {
    type InitData = Params;
    type InitError = SimError;

    type InputData = SimInput;
    type OutputData = Pose;
    type StatusReport = StatusReport;
    type ProcError = SimError;

    fn init(init_data: Self::InitData, session: &Session) -> Result<Self, Self::InitError> {
        let rng = R::seed_from_u64(init_data.seed);
        let mut sim = Self::new(init_data, rng)?;

        sim.arch_report = Archiver::from_path(session, "kin_sim/status_report.csv")
            .map_err(SimError::ArchiveInitError)?;

        Ok(sim)
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let pose = self.step(input_data.cmd, input_data.dt_s)?;
        Ok((pose, self.report))
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn validate_params(params: &Params) -> Result<(), SimError> {
    let non_neg = |name: &str, value: f64| {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(SimError::InvalidParams(format!(
                "{} must be finite and non-negative, found {}",
                name, value
            )))
        }
    };

    non_neg("noise_speed_std_ms", params.noise_speed_std_ms)?;
    non_neg("noise_ang_vel_std_rads", params.noise_ang_vel_std_rads)?;
    non_neg("dist_mag_rads", params.dist_mag_rads)?;
    non_neg("dist_duration_s", params.dist_duration_s)?;

    if !(0.0..=1.0).contains(&params.dist_prob) {
        return Err(SimError::InvalidParams(format!(
            "dist_prob must be in [0, 1], found {}",
            params.dist_prob
        )));
    }

    Ok(())
}

/// Integrate the unicycle model over one step. The returned heading is not
/// wrapped.
fn integrate(integrator: Integrator, pose: &Pose, cmd: &ControlCommand, dt_s: f64) -> Pose {
    let path_head_rad = match integrator {
        Integrator::Euler => pose.head_rad,
        Integrator::Midpoint => pose.head_rad + 0.5 * cmd.ang_vel_rads * dt_s,
    };

    Pose {
        x_m: pose.x_m + cmd.speed_ms * path_head_rad.cos() * dt_s,
        y_m: pose.y_m + cmd.speed_ms * path_head_rad.sin() * dt_s,
        head_rad: pose.head_rad + cmd.ang_vel_rads * dt_s,
    }
}
