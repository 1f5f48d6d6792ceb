//! Arbitration between the helm and the autopilot.
//!
//! Manual helm input while a program is engaged suppresses it for a fixed
//! window of simulation time; when the window lapses without further input
//! the program resumes where it left off.

use tracing::{debug, info, warn};

use bridgesim_core::enums::{AutopilotKind, ControlMode};
use bridgesim_core::state::{AutopilotView, NavigationView};

use crate::program::{AutopilotContext, AutopilotError, AutopilotOutput, AutopilotProgram};

/// What the controller wants applied this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationResult {
    /// Helm has control; leave thrust and attitude alone.
    Idle,
    Command(AutopilotOutput),
    /// The program finished; control returned to the helm.
    Completed(AutopilotKind),
    /// The program failed and was disengaged.
    Failed {
        kind: AutopilotKind,
        error: AutopilotError,
    },
}

#[derive(Debug, Clone)]
pub struct NavigationController {
    mode: ControlMode,
    program: Option<AutopilotProgram>,
    /// Simulation time at which a manual override lapses.
    override_until: f64,
    override_timeout: f64,
}

impl NavigationController {
    pub fn new(override_timeout: f64) -> Self {
        Self {
            mode: ControlMode::Manual,
            program: None,
            override_until: 0.0,
            override_timeout,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn program(&self) -> Option<&AutopilotProgram> {
        self.program.as_ref()
    }

    /// Replace any running program. Returns the kind of the one replaced.
    pub fn engage(&mut self, program: AutopilotProgram) -> Option<AutopilotKind> {
        let kind = program.kind();
        let previous = self.program.replace(program).map(|p| p.kind());
        self.mode = ControlMode::Autopilot;
        info!(program = ?kind, replaced = ?previous, "autopilot engaged");
        previous
    }

    /// Drop the running program and return to manual control.
    pub fn disengage(&mut self) -> Option<AutopilotKind> {
        self.mode = ControlMode::Manual;
        let previous = self.program.take().map(|p| p.kind());
        if let Some(kind) = previous {
            info!(program = ?kind, "autopilot disengaged");
        }
        previous
    }

    /// Record helm input. Suppresses the autopilot if one is engaged.
    pub fn manual_input(&mut self, sim_time: f64) {
        if self.program.is_none() {
            return;
        }
        if self.mode == ControlMode::Autopilot {
            debug!(sim_time, "manual override");
        }
        self.mode = ControlMode::ManualOverride;
        self.override_until = sim_time + self.override_timeout;
    }

    pub fn override_remaining(&self, sim_time: f64) -> f64 {
        if self.mode == ControlMode::ManualOverride {
            (self.override_until - sim_time).max(0.0)
        } else {
            0.0
        }
    }

    pub fn update(&mut self, ctx: &AutopilotContext, dt: f64, sim_time: f64) -> NavigationResult {
        if self.mode == ControlMode::ManualOverride && sim_time >= self.override_until {
            debug!(sim_time, "manual override lapsed, autopilot resuming");
            self.mode = ControlMode::Autopilot;
        }
        if self.mode != ControlMode::Autopilot {
            return NavigationResult::Idle;
        }
        let Some(program) = self.program.as_mut() else {
            self.mode = ControlMode::Manual;
            return NavigationResult::Idle;
        };

        let kind = program.kind();
        match program.compute(ctx, dt, sim_time) {
            Ok(Some(output)) => NavigationResult::Command(output),
            Ok(None) => {
                info!(program = ?kind, sim_time, "autopilot complete");
                self.program = None;
                self.mode = ControlMode::Manual;
                NavigationResult::Completed(kind)
            }
            Err(error) => {
                warn!(program = ?kind, %error, sim_time, "autopilot failed, reverting to manual");
                self.program = None;
                self.mode = ControlMode::Manual;
                NavigationResult::Failed { kind, error }
            }
        }
    }

    pub fn view(&self, sim_time: f64) -> NavigationView {
        NavigationView {
            mode: self.mode,
            autopilot: self.program.as_ref().map(|p| AutopilotView {
                program: p.kind(),
                phase: p.phase().to_string(),
                target: p.target_label(),
            }),
            override_remaining_secs: self.override_remaining(sim_time),
        }
    }
}
