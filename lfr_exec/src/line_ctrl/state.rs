//! Line control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, warn};

// Internal
use super::*;
use crate::path_ref::PathRef;
use comms_if::{
    ctrl::{CtrlDemand, CtrlResponse},
    net::{ChannelServer, Link, LinkError},
    sim::SimState,
};
use util::{archive::Archiver, module::State, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line control module.
pub struct LineCtrl {
    controller: Controller,

    /// The path being followed
    path: PathRef,

    /// Current controller state, advanced each cycle
    state: ControllerState,

    report: CtrlReport,

    arch_report: Archiver,
}

/// Data required to initialise line control.
#[derive(Debug, Clone)]
pub struct InitData {
    pub params: Params,
    pub path: PathRef,

    /// Control period
    ///
    /// Units: seconds
    pub time_step_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineCtrl {
    /// Create the module without archiving.
    pub fn new(init_data: InitData) -> Result<Self, CtrlError> {
        let controller = Controller::new(init_data.params, init_data.time_step_s)?;
        let state = controller.initial_state();

        Ok(Self {
            controller,
            path: init_data.path,
            state,
            report: CtrlReport::default(),
            arch_report: Archiver::default(),
        })
    }

    /// Current controller state
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Report from the most recent cycle
    pub fn report(&self) -> &CtrlReport {
        &self.report
    }

    pub fn path(&self) -> &PathRef {
        &self.path
    }

    /// Reset the controller state for the start of a new run.
    pub fn reset(&mut self) {
        self.state = self.controller.initial_state();
        self.report = CtrlReport::default();
    }

    /// Serve requests from the given channel until the client disconnects,
    /// returning the number of requests served.
    ///
    /// This is intended to be run on a separate thread to the simulator.
    pub fn serve(mut self, server: ChannelServer<SimState, CtrlResponse>) -> usize {
        server.serve(|req| self.respond(&req))
    }

    /// Process one request, mapping a divergence into a fault response.
    fn respond(&mut self, req: &SimState) -> CtrlResponse {
        match self.proc(req) {
            Ok((demand, _)) => CtrlResponse::Demand(demand),
            Err(CtrlError::NumericDivergence(fault)) => {
                error!("Controller diverged at step {}: {}", req.step, fault);
                CtrlResponse::Fault {
                    step: req.step,
                    fault,
                }
            }
            // Construction is the only source of other errors
            Err(e) => {
                error!("Unexpected controller error at step {}: {}", req.step, e);
                CtrlResponse::Demand(CtrlDemand {
                    step: req.step,
                    cmd: self.state.last_cmd.unwrap_or_default(),
                    error: self.state.last_error,
                    tracking_lost: true,
                })
            }
        }
    }
}

impl State for LineCtrl {
    type InitData = InitData;
    type InitError = CtrlError;

    type InputData = SimState;
    type OutputData = CtrlDemand;
    type StatusReport = CtrlReport;
    type ProcError = CtrlError;

    fn init(init_data: Self::InitData, session: &Session) -> Result<Self, Self::InitError> {
        let mut line_ctrl = Self::new(init_data)?;

        line_ctrl.arch_report = Archiver::from_path(session, "line_ctrl/status_report.csv")
            .map_err(CtrlError::ArchiveInitError)?;

        Ok(line_ctrl)
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let out = self
            .controller
            .compute(&self.state, &input_data.pose, &self.path)?;

        self.state = out.state;

        self.report = out.report;
        self.report.step = input_data.step;
        self.report.time_s = input_data.time_s;

        if let Err(e) = self.arch_report.serialise(&self.report) {
            warn!("Could not archive line control report: {}", e);
        }

        Ok((
            CtrlDemand {
                step: input_data.step,
                cmd: out.cmd,
                error: out.error,
                tracking_lost: out.report.tracking_lost,
            },
            self.report,
        ))
    }
}

impl Link<SimState, CtrlResponse> for LineCtrl {
    fn exchange(&mut self, request: SimState) -> Result<CtrlResponse, LinkError> {
        Ok(self.respond(&request))
    }
}
