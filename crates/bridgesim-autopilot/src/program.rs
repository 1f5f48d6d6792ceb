//! The autopilot program contract.
//!
//! Every program turns an `AutopilotContext` into a thrust fraction and a
//! heading. `Ok(None)` means the program has finished; errors are caught
//! by the `NavigationController`, which hands control back to the helm.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bridgesim_core::commands::{AutopilotRequest, TargetRef};
use bridgesim_core::config::AutopilotGains;
use bridgesim_core::enums::AutopilotKind;
use bridgesim_core::math::{normalize_angle, vector_to_heading};
use bridgesim_core::types::{Heading, Kinematics, ShipId};

use crate::formation::Formation;
use crate::goto::GoToPosition;
use crate::hold::{HoldPosition, HoldVelocity};
use crate::intercept::Intercept;
use crate::match_velocity::MatchVelocity;

/// Floor for max acceleration so braking math never divides by zero.
pub(crate) const MIN_ACCEL: f64 = 1e-6;

/// What a program asks of the ship for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutopilotOutput {
    /// Fraction of available thrust, in [0, 1].
    pub thrust: f64,
    /// World heading for the nose.
    pub heading: Heading,
}

/// Flagship state for formation flying.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagshipState {
    pub kinematics: Kinematics,
    /// Flagship yaw (degrees); formation offsets rotate with it.
    pub yaw: f64,
}

/// Input to a program for a single ship.
#[derive(Debug, Clone, Default)]
pub struct AutopilotContext {
    pub own: Kinematics,
    /// Current nose heading, held when a program has no preferred direction.
    pub heading: Heading,
    /// Acceleration at full thrust (m/s²), after propulsion degradation.
    pub max_accel: f64,
    /// Resolved target for intercept and velocity matching.
    pub target: Option<Kinematics>,
    pub flagship: Option<FlagshipState>,
    /// Positions of other formation members.
    pub neighbors: Vec<DVec3>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutopilotError {
    #[error("target `{0}` lost")]
    TargetLost(String),
    #[error("{0:?} produced a non-finite command")]
    NonFiniteOutput(AutopilotKind),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Turn a desired acceleration into a thrust fraction and heading.
pub(crate) fn steer(accel: DVec3, max_accel: f64, cap: f64, fallback: Heading) -> AutopilotOutput {
    let heading = vector_to_heading(accel).unwrap_or(fallback);
    let thrust = if max_accel > 0.0 {
        (accel.length() / max_accel).min(cap)
    } else {
        0.0
    };
    AutopilotOutput { thrust, heading }
}

/// Zero thrust, nose unchanged.
pub(crate) fn coast(heading: Heading) -> AutopilotOutput {
    AutopilotOutput {
        thrust: 0.0,
        heading,
    }
}

/// All programs behind one interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AutopilotProgram {
    GoToPosition(GoToPosition),
    Intercept(Intercept),
    MatchVelocity(MatchVelocity),
    HoldPosition(HoldPosition),
    HoldVelocity(HoldVelocity),
    Formation(Formation),
}

impl AutopilotProgram {
    /// Build a program from a crew request. Setpoints for the hold programs
    /// are captured from `own` at engage time.
    pub fn from_request(
        request: &AutopilotRequest,
        gains: &AutopilotGains,
        own: &Kinematics,
    ) -> Result<Self, AutopilotError> {
        let program = match request {
            AutopilotRequest::GoToPosition {
                target,
                stop_at_target,
                arrival_tolerance,
                arrival_speed_tolerance,
                cruise_speed,
            } => {
                if !target.is_finite() {
                    return Err(AutopilotError::InvalidParameter(
                        "go-to target must be finite".to_string(),
                    ));
                }
                let mut goto = GoToPosition::new(*target, *stop_at_target, gains);
                if let Some(tol) = arrival_tolerance {
                    goto.arrival_tolerance = require_positive("arrival_tolerance", *tol)?;
                }
                if let Some(tol) = arrival_speed_tolerance {
                    goto.arrival_speed_tolerance =
                        require_positive("arrival_speed_tolerance", *tol)?;
                }
                if let Some(speed) = cruise_speed {
                    goto.cruise_speed = require_positive("cruise_speed", *speed)?;
                }
                AutopilotProgram::GoToPosition(goto)
            }
            AutopilotRequest::Intercept { target } => {
                AutopilotProgram::Intercept(Intercept::new(target.clone(), gains))
            }
            AutopilotRequest::MatchVelocity { target } => AutopilotProgram::MatchVelocity(
                MatchVelocity::new(Some(target.clone()), gains),
            ),
            AutopilotRequest::HoldPosition => {
                AutopilotProgram::HoldPosition(HoldPosition::new(own.position, gains))
            }
            AutopilotRequest::HoldVelocity => {
                AutopilotProgram::HoldVelocity(HoldVelocity::new(own.velocity, gains))
            }
            AutopilotRequest::Formation {
                flagship,
                offset,
                echelon,
                match_velocity,
                wingmen,
            } => {
                if !offset.is_finite() {
                    return Err(AutopilotError::InvalidParameter(
                        "formation offset must be finite".to_string(),
                    ));
                }
                AutopilotProgram::Formation(Formation {
                    flagship: flagship.clone(),
                    offset: *offset,
                    echelon: *echelon,
                    match_velocity: *match_velocity,
                    wingmen: wingmen.clone(),
                    position_gain: gains.formation_position_gain,
                    velocity_gain: gains.formation_velocity_gain,
                    min_separation: gains.formation_min_separation,
                })
            }
        };
        Ok(program)
    }

    pub fn kind(&self) -> AutopilotKind {
        match self {
            AutopilotProgram::GoToPosition(_) => AutopilotKind::GoToPosition,
            AutopilotProgram::Intercept(_) => AutopilotKind::Intercept,
            AutopilotProgram::MatchVelocity(_) => AutopilotKind::MatchVelocity,
            AutopilotProgram::HoldPosition(_) => AutopilotKind::HoldPosition,
            AutopilotProgram::HoldVelocity(_) => AutopilotKind::HoldVelocity,
            AutopilotProgram::Formation(_) => AutopilotKind::Formation,
        }
    }

    /// Current phase, for the helm display.
    pub fn phase(&self) -> &'static str {
        match self {
            AutopilotProgram::GoToPosition(p) => p.phase.label(),
            AutopilotProgram::Intercept(p) => p.phase.label(),
            AutopilotProgram::MatchVelocity(p) => {
                if p.matched {
                    "MATCHED"
                } else {
                    "MATCHING"
                }
            }
            AutopilotProgram::HoldPosition(p) => {
                if p.holding {
                    "HOLDING"
                } else {
                    "CORRECTING"
                }
            }
            AutopilotProgram::HoldVelocity(p) => {
                if p.holding {
                    "HOLDING"
                } else {
                    "CORRECTING"
                }
            }
            AutopilotProgram::Formation(_) => "STATION",
        }
    }

    /// Ship or contact this program follows, if any.
    pub fn target_ref(&self) -> Option<&TargetRef> {
        match self {
            AutopilotProgram::Intercept(p) => Some(&p.target),
            AutopilotProgram::MatchVelocity(p) => p.target.as_ref(),
            _ => None,
        }
    }

    pub fn flagship(&self) -> Option<&ShipId> {
        match self {
            AutopilotProgram::Formation(p) => Some(&p.flagship),
            _ => None,
        }
    }

    pub fn wingmen(&self) -> &[ShipId] {
        match self {
            AutopilotProgram::Formation(p) => &p.wingmen,
            _ => &[],
        }
    }

    /// Human-readable target description.
    pub fn target_label(&self) -> Option<String> {
        match self {
            AutopilotProgram::GoToPosition(p) => Some(format!(
                "({:.0}, {:.0}, {:.0})",
                p.target.x, p.target.y, p.target.z
            )),
            AutopilotProgram::Formation(p) => Some(p.flagship.to_string()),
            _ => self.target_ref().map(|t| t.label().to_string()),
        }
    }

    /// Run one step. Thrust is clamped to [0, 1] and the heading normalized.
    pub fn compute(
        &mut self,
        ctx: &AutopilotContext,
        dt: f64,
        sim_time: f64,
    ) -> Result<Option<AutopilotOutput>, AutopilotError> {
        let output = match self {
            AutopilotProgram::GoToPosition(p) => p.compute(ctx, sim_time),
            AutopilotProgram::Intercept(p) => p.compute(ctx, dt, sim_time),
            AutopilotProgram::MatchVelocity(p) => p.compute(ctx, dt).map(Some),
            AutopilotProgram::HoldPosition(p) => Ok(Some(p.compute(ctx))),
            AutopilotProgram::HoldVelocity(p) => Ok(Some(p.compute(ctx))),
            AutopilotProgram::Formation(p) => p.compute(ctx).map(Some),
        }?;

        let Some(output) = output else {
            return Ok(None);
        };
        if !(output.thrust.is_finite()
            && output.heading.pitch.is_finite()
            && output.heading.yaw.is_finite())
        {
            return Err(AutopilotError::NonFiniteOutput(self.kind()));
        }
        Ok(Some(AutopilotOutput {
            thrust: output.thrust.clamp(0.0, 1.0),
            heading: Heading::new(
                output.heading.pitch.clamp(-90.0, 90.0),
                normalize_angle(output.heading.yaw),
            ),
        }))
    }
}

fn require_positive(name: &str, value: f64) -> Result<f64, AutopilotError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AutopilotError::InvalidParameter(format!(
            "{name} must be positive, got {value}"
        )))
    }
}
