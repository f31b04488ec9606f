//! Run driver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{LogError, LogRecord, Params, TrajectoryLog};
use crate::kin_sim::{KinSim, SimError, SimInput, SimMode};
use comms_if::{
    ctrl::{ControlCommand, CtrlResponse},
    net::{Link, LinkError},
    sim::{Pose, SimState},
};
use util::module::State;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum number of steps in a single run.
///
/// Each step adds one record to the in-memory log, so this bounds the log to
/// around 100 MB.
pub const MAX_NUM_STEPS: usize = 1_000_000;

/// Maximum number of log records allocated up front.
const MAX_PREALLOC_STEPS: usize = 65_536;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A closed loop run of the simulator against a controller reached through
/// the link `L`.
pub struct Run<L> {
    params: Params,

    num_steps: usize,

    sim: KinSim,

    link: L,

    log: TrajectoryLog,

    stop: StopHandle,

    executed: bool,
}

/// A handle used to stop a run from elsewhere, for example another thread.
///
/// The run checks the handle at the start of every step.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

/// Statistics of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStats {
    /// Number of steps executed
    pub num_steps: usize,

    /// True if the run was stopped before its duration was reached
    pub stopped_early: bool,

    /// Number of steps in which tracking was lost
    pub num_tracking_lost: usize,

    /// Number of steps in which a disturbance was applied
    pub num_disturbed: usize,
}

/// Description of the step in which a run failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub step: u64,
    pub time_s: f64,

    /// Pose at the start of the failed step
    pub pose: Pose,

    /// Command issued in the failed step, if one was received
    pub cmd: Option<ControlCommand>,

    pub cause: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Invalid run configuration: {0}")]
    Config(String),

    #[error("The run has already been executed")]
    AlreadyExecuted,

    #[error("Numeric divergence: {0}")]
    NumericDivergence(Box<Diagnostic>),

    #[error("Simulator failure: {0}")]
    Sim(Box<Diagnostic>),

    #[error("Link failure: {diag}")]
    Link {
        diag: Box<Diagnostic>,
        source: LinkError,
    },

    #[error("Could not log step: {0}")]
    Log(#[from] LogError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<L> Run<L>
where
    L: Link<SimState, CtrlResponse>,
{
    /// Create a new run.
    ///
    /// The simulator must not have been started yet.
    pub fn new(params: Params, sim: KinSim, link: L) -> Result<Self, RunError> {
        if !(params.time_step_s.is_finite() && params.time_step_s > 0.0) {
            return Err(RunError::Config(format!(
                "time_step_s must be finite and positive, found {}",
                params.time_step_s
            )));
        }
        if !(params.duration_s.is_finite() && params.duration_s > 0.0) {
            return Err(RunError::Config(format!(
                "duration_s must be finite and positive, found {}",
                params.duration_s
            )));
        }

        let num_steps = util::time::num_steps(params.duration_s, params.time_step_s)
            .filter(|n| *n <= MAX_NUM_STEPS)
            .ok_or_else(|| {
                RunError::Config(format!(
                    "A duration of {} s in {} s steps exceeds the maximum of {} steps",
                    params.duration_s, params.time_step_s, MAX_NUM_STEPS
                ))
            })?;
        if num_steps == 0 {
            return Err(RunError::Config(format!(
                "A duration of {} s is shorter than one {} s step",
                params.duration_s, params.time_step_s
            )));
        }

        if !params.init_pose().is_finite() {
            return Err(RunError::Config(format!(
                "The initial pose must be finite, found {:?}",
                params.init_pose()
            )));
        }

        if sim.mode() != SimMode::Idle {
            return Err(RunError::Config(format!(
                "The simulator must be idle, found {:?}",
                sim.mode()
            )));
        }

        Ok(Self {
            params,
            num_steps,
            sim,
            link,
            log: TrajectoryLog::with_capacity(num_steps.min(MAX_PREALLOC_STEPS)),
            stop: StopHandle::default(),
            executed: false,
        })
    }

    /// Get a handle which can be used to stop the run.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Execute the run.
    ///
    /// A run can only be executed once. Whether the run succeeds or fails the
    /// simulator is left stopped and the log can be read with [`Run::log`].
    pub fn execute(&mut self) -> Result<RunStats, RunError> {
        if self.executed {
            return Err(RunError::AlreadyExecuted);
        }
        self.executed = true;

        self.sim
            .start(self.params.init_pose())
            .map_err(|e| RunError::Config(e.to_string()))?;

        info!(
            "Starting run of {} steps of {} s from {:?}",
            self.num_steps,
            self.params.time_step_s,
            self.params.init_pose()
        );

        let result = self.run_steps();

        self.sim.stop();

        match result {
            Ok(ref stats) => info!(
                "Run complete after {} steps ({} with tracking lost, {} disturbed)",
                stats.num_steps, stats.num_tracking_lost, stats.num_disturbed
            ),
            Err(ref e) => warn!("Run failed after {} steps: {}", self.log.len(), e),
        }

        result
    }

    /// The log of the run so far
    pub fn log(&self) -> &TrajectoryLog {
        &self.log
    }

    /// Consume the run, returning its log.
    ///
    /// This also drops the link, disconnecting any remote controller.
    pub fn into_log(self) -> TrajectoryLog {
        self.log
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn sim(&self) -> &KinSim {
        &self.sim
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    fn run_steps(&mut self) -> Result<RunStats, RunError> {
        let dt_s = self.params.time_step_s;

        let mut stats = RunStats {
            num_steps: 0,
            stopped_early: false,
            num_tracking_lost: 0,
            num_disturbed: 0,
        };

        for step in 0..self.num_steps as u64 {
            if self.stop.is_stopped() {
                info!("Run stopped externally at step {}", step);
                stats.stopped_early = true;
                break;
            }

            let time_s = step as f64 * dt_s;
            let pose = self.sim.pose();

            // ---- CONTROL ----

            let response = self
                .link
                .exchange(SimState { step, time_s, pose })
                .map_err(|source| RunError::Link {
                    diag: diagnostic(step, time_s, pose, None, &source),
                    source,
                })?;

            if response.step() != step {
                let source = LinkError::OutOfOrder {
                    expected: step,
                    found: response.step(),
                };
                return Err(RunError::Link {
                    diag: diagnostic(step, time_s, pose, None, &source),
                    source,
                });
            }

            let demand = match response {
                CtrlResponse::Demand(d) => d,
                CtrlResponse::Fault { fault, .. } => {
                    return Err(RunError::NumericDivergence(diagnostic(
                        step, time_s, pose, None, &fault,
                    )))
                }
            };

            if demand.tracking_lost {
                warn!(
                    "Tracking lost at step {} (t = {:.3} s), holding command {:?}",
                    step, time_s, demand.cmd
                );
                stats.num_tracking_lost += 1;
            }

            // ---- SIMULATION ----

            let sim_result = self.sim.proc(&SimInput {
                cmd: demand.cmd,
                dt_s,
            });

            let disturbance_active = match sim_result {
                Ok((_, ref report)) => report.disturbance_active,
                Err(_) => false,
            };
            if disturbance_active {
                stats.num_disturbed += 1;
            }

            self.log.push(LogRecord {
                step,
                time_s,
                pose,
                error: demand.error,
                cmd: demand.cmd,
                tracking_lost: demand.tracking_lost,
                disturbance_active,
            })?;

            if let Err(e) = sim_result {
                let diag = diagnostic(step, time_s, pose, Some(demand.cmd), &e);
                return Err(match e {
                    SimError::NumericDivergence { .. } => RunError::NumericDivergence(diag),
                    _ => RunError::Sim(diag),
                });
            }

            stats.num_steps += 1;
        }

        debug!("Final pose {:?}", self.sim.pose());

        Ok(stats)
    }
}

impl StopHandle {
    /// Request that the run stops at the start of its next step.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl RunError {
    /// The diagnostic of the failed step, if the run failed during a step.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            RunError::NumericDivergence(d) | RunError::Sim(d) => Some(d.as_ref()),
            RunError::Link { diag, .. } => Some(diag.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} (t = {:.3} s) at ({:.3} m, {:.3} m, {:.3} rad): {}",
            self.step, self.time_s, self.pose.x_m, self.pose.y_m, self.pose.head_rad, self.cause
        )?;

        if let Some(cmd) = self.cmd {
            write!(
                f,
                " [command {:.3} m/s, {:.3} rad/s]",
                cmd.speed_ms, cmd.ang_vel_rads
            )?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn diagnostic<E: fmt::Display>(
    step: u64,
    time_s: f64,
    pose: Pose,
    cmd: Option<ControlCommand>,
    cause: &E,
) -> Box<Diagnostic> {
    Box::new(Diagnostic {
        step,
        time_s,
        pose,
        cmd,
        cause: cause.to_string(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        kin_sim,
        kpi,
        line_ctrl::{self, Gains, LineCtrl},
        path_ref::{self, PathRef, PathShape},
    };
    use comms_if::{
        ctrl::CtrlDemand,
        net::channel_link,
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn sim(params: kin_sim::Params) -> KinSim {
        let seed = params.seed;
        KinSim::new(params, StdRng::seed_from_u64(seed)).unwrap()
    }

    fn straight() -> PathRef {
        PathRef::new(&path_ref::Params {
            x_start_m: -5.0,
            length_m: 30.0,
            shape: PathShape::Straight,
        })
        .unwrap()
    }

    fn ctrl_params(gains: Gains) -> line_ctrl::Params {
        line_ctrl::Params {
            gains,
            nom_speed_ms: 1.0,
            min_speed_ms: 0.3,
            slow_gain: 1.0,
            integral_limit: 1.0,
            max_ang_vel_rads: 10.0,
            tracking_loss_limit_m: None,
        }
    }

    fn pd_gains() -> Gains {
        Gains {
            k_p: 2.0,
            k_i: 0.0,
            k_d: 0.5,
            k_head: 1.0,
            k_ff: 0.0,
        }
    }

    fn line_ctrl(gains: Gains, path: PathRef, time_step_s: f64) -> LineCtrl {
        LineCtrl::new(line_ctrl::InitData {
            params: ctrl_params(gains),
            path,
            time_step_s,
        })
        .unwrap()
    }

    fn run_params(init_y_m: f64) -> Params {
        Params {
            time_step_s: 0.05,
            duration_s: 10.0,
            init_x_m: 0.0,
            init_y_m,
            init_head_rad: 0.0,
        }
    }

    /// Run the standard lateral offset scenario with the given simulator
    /// parameters.
    fn offset_scenario(sim_params: kin_sim::Params) -> (Run<LineCtrl>, Result<RunStats, RunError>) {
        let mut run = Run::new(
            run_params(-1.0),
            sim(sim_params),
            line_ctrl(pd_gains(), straight(), 0.05),
        )
        .unwrap();
        let result = run.execute();
        (run, result)
    }

    /// A link which always answers for the wrong step.
    struct OffByOne;

    impl Link<SimState, CtrlResponse> for OffByOne {
        fn exchange(&mut self, request: SimState) -> Result<CtrlResponse, LinkError> {
            Ok(CtrlResponse::Demand(CtrlDemand {
                step: request.step + 1,
                cmd: ControlCommand::new(1.0, 0.0),
                error: Default::default(),
                tracking_lost: false,
            }))
        }
    }

    /// A link which always demands the same command.
    struct Fixed(ControlCommand);

    impl Link<SimState, CtrlResponse> for Fixed {
        fn exchange(&mut self, request: SimState) -> Result<CtrlResponse, LinkError> {
            Ok(CtrlResponse::Demand(CtrlDemand {
                step: request.step,
                cmd: self.0,
                error: Default::default(),
                tracking_lost: false,
            }))
        }
    }

    /// A link which stops the run after a given step.
    struct Stopping {
        inner: LineCtrl,
        handle: StopHandle,
        stop_after: u64,
    }

    impl Link<SimState, CtrlResponse> for Stopping {
        fn exchange(&mut self, request: SimState) -> Result<CtrlResponse, LinkError> {
            if request.step == self.stop_after {
                self.handle.stop();
            }
            self.inner.exchange(request)
        }
    }

    #[test]
    fn test_on_path_stays_on_path() {
        let mut run = Run::new(
            run_params(0.0),
            sim(kin_sim::Params::default()),
            line_ctrl(pd_gains(), straight(), 0.05),
        )
        .unwrap();

        let stats = run.execute().unwrap();
        assert_eq!(stats.num_steps, 200);
        assert!(!stats.stopped_early);
        assert_eq!(run.log().len(), 200);

        for r in run.log().records() {
            assert_eq!(r.error.lat_err_m, 0.0);
            assert_eq!(r.error.head_err_rad, 0.0);
        }

        let kpi = kpi::evaluate(run.log(), &kpi::Params::default()).unwrap();
        assert_eq!(kpi.overshoot_pct, 0.0);
        assert_eq!(kpi.steady_state_err_m, 0.0);
        assert_eq!(kpi.settling_time_s, Some(0.0));

        assert_eq!(run.sim().mode(), SimMode::Stopped);
    }

    #[test]
    fn test_lateral_offset_response() {
        let (run, result) = offset_scenario(kin_sim::Params::default());
        result.unwrap();

        assert_eq!(run.log().records()[0].error.lat_err_m, 1.0);

        let kpi = kpi::evaluate(run.log(), &kpi::Params::default()).unwrap();
        assert!(kpi.steady_state_value_m.abs() < 0.05);
        assert!(kpi.steady_state_err_m < 0.05);
        assert!(kpi.overshoot_pct < 10.0);
        assert!(kpi.settling_time_s.unwrap() < 10.0);

        // PD control never accumulates an integral
        assert_eq!(run.link().state().integral, 0.0);
    }

    #[test]
    fn test_lateral_offset_with_noise() {
        let (noiseless, result) = offset_scenario(kin_sim::Params::default());
        result.unwrap();
        let noiseless_kpi = kpi::evaluate(noiseless.log(), &kpi::Params::default()).unwrap();

        let mut sim_params = kin_sim::Params::default();
        sim_params.noise_ang_vel_std_rads = 0.05;
        sim_params.seed = 1;

        let (noisy, result) = offset_scenario(sim_params);
        result.unwrap();
        let noisy_kpi = kpi::evaluate(noisy.log(), &kpi::Params::default()).unwrap();

        assert!(noisy_kpi.steady_state_err_m < 3.0 * noiseless_kpi.steady_state_err_m.max(0.01));
        assert!(noisy_kpi.peak_lat_err_m <= 1.5);
    }

    #[test]
    fn test_sine_tracking() {
        let path = PathRef::new(&path_ref::Params {
            x_start_m: 0.0,
            length_m: 40.0,
            shape: PathShape::from_type_name("sine").unwrap(),
        })
        .unwrap();
        let gains = Gains {
            k_p: 1.5,
            k_i: 0.0,
            k_d: 0.1,
            k_head: 2.5,
            k_ff: 1.0,
        };

        let params = Params {
            time_step_s: 0.02,
            duration_s: 20.0,
            init_x_m: 0.0,
            init_y_m: 0.0,
            init_head_rad: 0.0,
        };
        let mut run = Run::new(params, sim(kin_sim::Params::default()), line_ctrl(gains, path, 0.02))
            .unwrap();
        run.execute().unwrap();

        let second_half = &run.log().records()[run.num_steps() / 2..];
        for r in second_half {
            assert!(r.error.lat_err_m.abs() < 0.1);
        }
    }

    #[test]
    fn test_split_matches_local() {
        let mut sim_params = kin_sim::Params::default();
        sim_params.noise_ang_vel_std_rads = 0.05;
        sim_params.seed = 5;

        let (local, result) = offset_scenario(sim_params.clone());
        result.unwrap();

        let (client, server) = channel_link();
        let remote = line_ctrl(pd_gains(), straight(), 0.05);
        let jh = std::thread::spawn(move || remote.serve(server));

        let mut run = Run::new(run_params(-1.0), sim(sim_params), client).unwrap();
        run.execute().unwrap();
        let log = run.into_log();

        assert_eq!(jh.join().unwrap(), 200);
        assert_eq!(&log, local.log());
    }

    #[test]
    fn test_stop_before_start() {
        let mut run = Run::new(
            run_params(-1.0),
            sim(kin_sim::Params::default()),
            line_ctrl(pd_gains(), straight(), 0.05),
        )
        .unwrap();

        run.stop_handle().stop();
        let stats = run.execute().unwrap();
        assert!(stats.stopped_early);
        assert_eq!(stats.num_steps, 0);
        assert!(run.log().is_empty());
        assert_eq!(run.sim().mode(), SimMode::Stopped);
    }

    #[test]
    fn test_stop_during_run() {
        let link = Stopping {
            inner: line_ctrl(pd_gains(), straight(), 0.05),
            handle: StopHandle::default(),
            stop_after: 49,
        };
        let mut run = Run::new(run_params(-1.0), sim(kin_sim::Params::default()), link).unwrap();
        run.link.handle = run.stop_handle();

        let stats = run.execute().unwrap();
        assert!(stats.stopped_early);
        assert_eq!(stats.num_steps, 50);
        assert_eq!(run.log().len(), 50);
        assert_eq!(run.sim().mode(), SimMode::Stopped);
    }

    #[test]
    fn test_out_of_order_response() {
        let mut run = Run::new(run_params(0.0), sim(kin_sim::Params::default()), OffByOne).unwrap();

        match run.execute() {
            Err(RunError::Link { diag, source }) => {
                assert_eq!(source, LinkError::OutOfOrder { expected: 0, found: 1 });
                assert_eq!(diag.step, 0);
            }
            r => panic!("Expected a link error, got {:?}", r),
        }
        assert!(run.log().is_empty());
    }

    #[test]
    fn test_controller_divergence() {
        let gains = Gains {
            k_p: std::f64::MAX,
            k_i: 0.0,
            k_d: 0.0,
            k_head: std::f64::MAX,
            k_ff: 0.0,
        };
        let params = Params {
            init_y_m: -2.0,
            init_head_rad: 2.0,
            ..run_params(0.0)
        };
        let mut run = Run::new(params, sim(kin_sim::Params::default()), line_ctrl(gains, straight(), 0.05))
            .unwrap();

        let err = run.execute().unwrap_err();
        assert!(matches!(err, RunError::NumericDivergence(_)));
        assert_eq!(err.diagnostic().map(|d| d.step), Some(0));
        assert_eq!(run.sim().mode(), SimMode::Stopped);
    }

    #[test]
    fn test_simulator_divergence() {
        let params = Params {
            time_step_s: 10.0,
            duration_s: 100.0,
            ..run_params(0.0)
        };
        let cmd = ControlCommand::new(std::f64::MAX, 0.0);
        let mut run = Run::new(params, sim(kin_sim::Params::default()), Fixed(cmd)).unwrap();

        let err = run.execute().unwrap_err();
        assert!(matches!(err, RunError::NumericDivergence(_)));

        let diag = err.diagnostic().unwrap();
        assert_eq!(diag.step, 0);
        assert_eq!(diag.cmd, Some(cmd));

        // The failed step is still logged
        assert_eq!(run.log().len(), 1);
    }

    #[test]
    fn test_tracking_loss_recorded() {
        let limit_m = 0.5;
        let mut params = ctrl_params(pd_gains());
        params.tracking_loss_limit_m = Some(limit_m);

        let mut ctrl = LineCtrl::new(line_ctrl::InitData {
            params,
            path: straight(),
            time_step_s: 0.05,
        })
        .unwrap();

        // Issue one command inside the limit so there is something to hold
        let (primed, _) = ctrl
            .proc(&SimState {
                step: 0,
                time_s: 0.0,
                pose: Pose::new(0.0, -0.3, 0.0),
            })
            .unwrap();
        assert!(!primed.tracking_lost);
        let held = primed.cmd;
        assert_ne!(held, ControlCommand::stop());

        // Start beyond the limit
        let mut run = Run::new(run_params(-1.0), sim(kin_sim::Params::default()), ctrl).unwrap();
        let stats = run.execute().unwrap();

        let records = run.log().records();
        let num_lost = records.iter().filter(|r| r.tracking_lost).count();

        assert!(records[0].tracking_lost);
        assert_eq!(records[0].error.lat_err_m, 1.0);
        assert!(num_lost > 0);
        assert_eq!(stats.num_tracking_lost, num_lost);

        for r in records {
            assert_eq!(r.tracking_lost, r.error.lat_err_m.abs() > limit_m, "step {}", r.step);
        }

        // The command is held until tracking resumes
        for r in records.iter().take_while(|r| r.tracking_lost) {
            assert_eq!(r.cmd, held);
        }
    }

    #[test]
    fn test_oversized_run_rejected() {
        let link = || Fixed(ControlCommand::stop());

        let mut p = run_params(0.0);
        p.time_step_s = 1e-3;
        p.duration_s = 1e300;
        assert!(matches!(
            Run::new(p, sim(kin_sim::Params::default()), link()),
            Err(RunError::Config(_))
        ));

        // One step over the limit
        let mut p = run_params(0.0);
        p.time_step_s = 1.0;
        p.duration_s = (MAX_NUM_STEPS + 1) as f64;
        assert!(matches!(
            Run::new(p, sim(kin_sim::Params::default()), link()),
            Err(RunError::Config(_))
        ));

        // At the limit the run is accepted without allocating it all up front
        let mut p = run_params(0.0);
        p.time_step_s = 1.0;
        p.duration_s = MAX_NUM_STEPS as f64;
        let run = Run::new(p, sim(kin_sim::Params::default()), link()).unwrap();
        assert_eq!(run.num_steps(), MAX_NUM_STEPS);
        assert!(run.log().is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let link = || Fixed(ControlCommand::stop());

        let mut p = run_params(0.0);
        p.time_step_s = 0.0;
        assert!(matches!(
            Run::new(p, sim(kin_sim::Params::default()), link()),
            Err(RunError::Config(_))
        ));

        let mut p = run_params(0.0);
        p.duration_s = std::f64::NAN;
        assert!(Run::new(p, sim(kin_sim::Params::default()), link()).is_err());

        let mut p = run_params(0.0);
        p.init_head_rad = std::f64::INFINITY;
        assert!(Run::new(p, sim(kin_sim::Params::default()), link()).is_err());

        let mut started = sim(kin_sim::Params::default());
        started.start(Pose::default()).unwrap();
        assert!(Run::new(run_params(0.0), started, link()).is_err());
    }

    #[test]
    fn test_execute_once() {
        let mut run = Run::new(
            run_params(0.0),
            sim(kin_sim::Params::default()),
            Fixed(ControlCommand::new(1.0, 0.0)),
        )
        .unwrap();

        run.execute().unwrap();
        assert!(matches!(run.execute(), Err(RunError::AlreadyExecuted)));
    }
}
