//! Fly to a fixed point: accelerate, coast, brake, hold.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bridgesim_core::config::AutopilotGains;
use bridgesim_core::constants::GOTO_COAST_FRACTION;

use crate::program::{steer, AutopilotContext, AutopilotError, AutopilotOutput, MIN_ACCEL};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoToPhase {
    #[default]
    Accelerate,
    Coast,
    Brake,
    Hold,
}

impl GoToPhase {
    pub fn label(self) -> &'static str {
        match self {
            GoToPhase::Accelerate => "ACCELERATE",
            GoToPhase::Coast => "COAST",
            GoToPhase::Brake => "BRAKE",
            GoToPhase::Hold => "HOLD",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoToPosition {
    pub target: DVec3,
    /// Keep station at the target instead of completing on arrival.
    pub stop_at_target: bool,
    pub arrival_tolerance: f64,
    pub arrival_speed_tolerance: f64,
    pub cruise_speed: f64,
    pub brake_buffer: f64,
    /// Fraction of max acceleration the braking profile assumes.
    pub brake_margin: f64,
    pub velocity_gain: f64,
    pub phase: GoToPhase,
}

impl GoToPosition {
    pub fn new(target: DVec3, stop_at_target: bool, gains: &AutopilotGains) -> Self {
        Self {
            target,
            stop_at_target,
            arrival_tolerance: gains.arrival_tolerance,
            arrival_speed_tolerance: gains.arrival_speed_tolerance,
            cruise_speed: gains.cruise_speed,
            brake_buffer: gains.brake_buffer,
            brake_margin: gains.brake_margin,
            velocity_gain: gains.velocity_gain,
            phase: GoToPhase::Accelerate,
        }
    }

    /// Distance at which braking must start for the given closing speed.
    pub fn brake_distance(&self, closing_speed: f64, max_accel: f64) -> f64 {
        let closing = closing_speed.max(0.0);
        closing * closing / (2.0 * max_accel.max(MIN_ACCEL)) + self.brake_buffer
    }

    pub fn compute(
        &mut self,
        ctx: &AutopilotContext,
        sim_time: f64,
    ) -> Result<Option<AutopilotOutput>, AutopilotError> {
        let to_target = self.target - ctx.own.position;
        let distance = to_target.length();
        let speed = ctx.own.velocity.length();
        let accel = ctx.max_accel.max(MIN_ACCEL);
        let dir = if distance > 1e-9 {
            to_target / distance
        } else {
            DVec3::ZERO
        };

        let arrived = distance <= self.arrival_tolerance && speed <= self.arrival_speed_tolerance;
        let next = if arrived {
            if !self.stop_at_target {
                debug!(sim_time, distance, speed, "go-to arrived");
                return Ok(None);
            }
            GoToPhase::Hold
        } else {
            match self.phase {
                GoToPhase::Hold | GoToPhase::Brake => GoToPhase::Brake,
                GoToPhase::Accelerate | GoToPhase::Coast => {
                    let closing = ctx.own.velocity.dot(dir);
                    if distance <= self.brake_distance(closing, accel) {
                        GoToPhase::Brake
                    } else if speed >= GOTO_COAST_FRACTION * self.cruise_speed {
                        GoToPhase::Coast
                    } else {
                        GoToPhase::Accelerate
                    }
                }
            }
        };
        if next != self.phase {
            debug!(
                sim_time,
                from = self.phase.label(),
                to = next.label(),
                distance,
                speed,
                "go-to phase change"
            );
            self.phase = next;
        }

        let desired_velocity = match self.phase {
            GoToPhase::Accelerate => dir * self.cruise_speed,
            GoToPhase::Coast => dir * speed,
            GoToPhase::Brake => {
                let remaining = (distance - self.arrival_tolerance / 2.0).max(0.0);
                let profile = (2.0 * self.brake_margin * accel * remaining).sqrt();
                dir * profile.min(self.cruise_speed.max(speed))
            }
            GoToPhase::Hold => {
                let creep = to_target * 0.1;
                let cap = 0.5 * self.arrival_speed_tolerance;
                if creep.length() > cap {
                    creep.normalize() * cap
                } else {
                    creep
                }
            }
        };

        let command = (desired_velocity - ctx.own.velocity) * self.velocity_gain;
        Ok(Some(steer(command, accel, 1.0, ctx.heading)))
    }
}

#[cfg(test)]
mod tests {
    use bridgesim_core::types::Kinematics;

    use super::*;

    fn ctx(position: DVec3, velocity: DVec3) -> AutopilotContext {
        AutopilotContext {
            own: Kinematics::new(position, velocity),
            max_accel: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_accelerating_toward_target() {
        let target = DVec3::new(100_000.0, 0.0, 0.0);
        let mut goto = GoToPosition::new(target, true, &AutopilotGains::default());
        let out = goto.compute(&ctx(DVec3::ZERO, DVec3::ZERO), 0.0).unwrap().unwrap();
        assert_eq!(goto.phase, GoToPhase::Accelerate);
        assert_eq!(out.thrust, 1.0);
        assert!(out.heading.yaw.abs() < 1e-9 && out.heading.pitch.abs() < 1e-9);
    }

    #[test]
    fn test_brake_is_sticky() {
        let target = DVec3::new(10_000.0, 0.0, 0.0);
        let mut goto = GoToPosition::new(target, true, &AutopilotGains::default());
        // 400 m/s closing needs 8 km + buffer to stop at 10 m/s².
        let fast = ctx(DVec3::new(1_950.0, 0.0, 0.0), DVec3::new(400.0, 0.0, 0.0));
        goto.compute(&fast, 0.0).unwrap();
        assert_eq!(goto.phase, GoToPhase::Brake);
        // Slower now, so the braking distance is short, but BRAKE stays.
        let slow = ctx(DVec3::new(2_000.0, 0.0, 0.0), DVec3::new(50.0, 0.0, 0.0));
        goto.compute(&slow, 0.1).unwrap();
        assert_eq!(goto.phase, GoToPhase::Brake);
    }

    #[test]
    fn test_completes_on_arrival_without_stop() {
        let target = DVec3::new(1000.0, 0.0, 0.0);
        let mut goto = GoToPosition::new(target, false, &AutopilotGains::default());
        let out = goto.compute(&ctx(target + DVec3::new(10.0, 0.0, 0.0), DVec3::ZERO), 0.0);
        assert_eq!(out, Ok(None));
    }

    #[test]
    fn test_hold_reverts_to_brake_when_too_fast() {
        let target = DVec3::new(1000.0, 0.0, 0.0);
        let mut goto = GoToPosition::new(target, true, &AutopilotGains::default());
        goto.compute(&ctx(target, DVec3::ZERO), 0.0).unwrap();
        assert_eq!(goto.phase, GoToPhase::Hold);

        // Still on the target point, but drifting far above the speed tolerance.
        goto.compute(&ctx(target, DVec3::new(30.0, 0.0, 0.0)), 0.1).unwrap();
        assert_eq!(goto.phase, GoToPhase::Brake);

        goto.compute(&ctx(target, DVec3::ZERO), 0.2).unwrap();
        assert_eq!(goto.phase, GoToPhase::Hold);
    }

    #[test]
    fn test_fast_pass_inside_tolerance_does_not_hold() {
        let target = DVec3::new(1000.0, 0.0, 0.0);
        let mut goto = GoToPosition::new(target, true, &AutopilotGains::default());
        goto.compute(&ctx(target, DVec3::new(30.0, 0.0, 0.0)), 0.0).unwrap();
        assert_eq!(goto.phase, GoToPhase::Brake, "too fast to hold");
    }
}
