//! Line following robot simulation executable entry point.
//!
//! # Architecture
//!
//! The executable:
//!
//!     - Creates a session and initialises logging
//!     - Loads the parameters, applying any command line overrides
//!     - Initialises all modules
//!     - Executes a single run, with the controller either called directly or
//!       on its own thread behind a channel link (`--split`)
//!     - Archives the trajectory log and evaluates the KPIs of the run
//!
//! Parameters are loaded from the `params` directory of the software root,
//! given by the `LFR_SW_ROOT` environment variable or the current directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{error, info, warn};
use serde::Serialize;
use std::thread;
use structopt::StructOpt;

// Internal
use comms_if::{
    ctrl::CtrlResponse,
    net::{channel_link, Link},
    sim::SimState,
};
use lfr_lib::{
    kin_sim::{self, KinSim},
    kpi,
    line_ctrl::{self, LineCtrl},
    path_ref::{self, PathRef, PathShape},
    run::{self, Run, RunError, RunStats, TrajectoryLog},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of points the reference path is sampled at for its archive.
const PATH_ARCHIVE_POINTS: usize = 500;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line following robot simulation
#[derive(Debug, StructOpt)]
#[structopt(name = "lfr_exec")]
struct Opts {
    /// Override the path type (straight, sine or curved)
    #[structopt(long)]
    path_type: Option<String>,

    /// Override the standard deviation of the angular velocity noise in
    /// radians/second
    #[structopt(long)]
    noise_std: Option<f64>,

    /// Override the simulator seed
    #[structopt(long)]
    seed: Option<u64>,

    /// Run the controller on its own thread behind a channel link
    #[structopt(long)]
    split: bool,

    /// Directory to create the session in, relative to the software root
    #[structopt(long, default_value = "sessions")]
    sessions_dir: String,
}

/// A point on the reference path, as archived.
#[derive(Serialize)]
struct PathPoint {
    x_m: f64,
    y_m: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("lfr_exec", &opts.sessions_dir).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Line Following Robot Simulation\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let run_params: run::Params =
        util::params::load("run.toml").wrap_err("Could not load run params")?;
    let mut path_params: path_ref::Params =
        util::params::load("path_ref.toml").wrap_err("Could not load path params")?;
    let mut sim_params: kin_sim::Params =
        util::params::load("kin_sim.toml").wrap_err("Could not load simulator params")?;
    let ctrl_params: line_ctrl::Params =
        util::params::load("line_ctrl.toml").wrap_err("Could not load line control params")?;
    let kpi_params: kpi::Params =
        util::params::load("kpi.toml").wrap_err("Could not load KPI params")?;

    if let Some(ref name) = opts.path_type {
        path_params.shape = PathShape::from_type_name(name)
            .ok_or_else(|| eyre!("Unknown path type \"{}\"", name))?;
    }
    if let Some(std) = opts.noise_std {
        sim_params.noise_ang_vel_std_rads = std;
    }
    if let Some(seed) = opts.seed {
        sim_params.seed = seed;
    }

    info!("Exec parameters loaded");

    // ---- MODULE INITIALISATION ----

    let path = PathRef::new(&path_params).wrap_err("Failed to build the reference path")?;
    let (start_m, end_m) = path.endpoints();
    info!(
        "Following a {} path from ({:.2}, {:.2}) to ({:.2}, {:.2})",
        path_params.shape.type_name(),
        start_m[0],
        start_m[1],
        end_m[0],
        end_m[1]
    );

    let mut path_arch =
        Archiver::from_path(&session, "path_ref.csv").wrap_err("Failed to archive the path")?;
    for p in path.sample(PATH_ARCHIVE_POINTS) {
        path_arch
            .serialise(PathPoint {
                x_m: p[0],
                y_m: p[1],
            })
            .wrap_err("Failed to archive the path")?;
    }

    let sim: KinSim = KinSim::init(sim_params, &session).wrap_err("Failed to initialise KinSim")?;
    info!("KinSim init complete");

    let line_ctrl = LineCtrl::init(
        line_ctrl::InitData {
            params: ctrl_params,
            path,
            time_step_s: run_params.time_step_s,
        },
        &session,
    )
    .wrap_err("Failed to initialise LineCtrl")?;
    info!("LineCtrl init complete");

    // ---- RUN ----

    let (result, log) = if opts.split {
        info!("Running the controller behind a channel link");

        let (client, server) = channel_link();
        let ctrl_jh = thread::spawn(move || line_ctrl.serve(server));

        let outcome = execute(Run::new(run_params, sim, client)?);

        // The client has been dropped with the run, so the server will exit
        match ctrl_jh.join() {
            Ok(n) => info!("Controller served {} requests", n),
            Err(_) => warn!("The controller thread panicked"),
        }

        outcome
    } else {
        execute(Run::new(run_params, sim, line_ctrl)?)
    };

    // ---- OUTPUT ----

    let mut log_arch = Archiver::from_path(&session, "trajectory.csv")
        .wrap_err("Failed to create the trajectory archive")?;
    log.archive(&mut log_arch)
        .wrap_err("Failed to archive the trajectory")?;

    let stats = match result {
        Ok(s) => s,
        Err(e) => {
            error!("Run failed: {}", e);
            if let Some(diag) = e.diagnostic() {
                session.save("diagnostic.json", diag);
            }
            session.exit();
            return Err(e).wrap_err("Run failed");
        }
    };
    session.save("run_stats.json", &stats);

    let kpis = kpi::evaluate(&log, &kpi_params).wrap_err("Could not evaluate KPIs")?;
    info!("KPIs:");
    for (name, value) in kpis.to_map() {
        info!("    {:<22} {:.4}", name, value);
    }
    if !kpis.settled() {
        warn!("The lateral error did not settle");
    }
    session.save("kpi.json", &kpis);

    session.exit();

    Ok(())
}

/// Execute the run, returning its result and log.
fn execute<L>(mut run: Run<L>) -> (Result<RunStats, RunError>, TrajectoryLog)
where
    L: Link<SimState, CtrlResponse>,
{
    let result = run.execute();
    (result, run.into_log())
}
