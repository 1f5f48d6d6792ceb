//! Null out relative velocity against a target.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use bridgesim_core::commands::TargetRef;
use bridgesim_core::config::AutopilotGains;
use bridgesim_core::constants::*;
use bridgesim_core::math::vector_to_heading;

use crate::program::{coast, AutopilotContext, AutopilotError, AutopilotOutput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchVelocity {
    /// `None` when embedded in another program that supplies the target.
    pub target: Option<TargetRef>,
    pub tolerance: f64,
    pub safety_factor: f64,
    pub matched: bool,
}

/// Thrust fraction for a velocity error of `delta_v` m/s, before the safety
/// factor and overshoot cap.
pub fn banded_thrust(delta_v: f64) -> f64 {
    if delta_v < MATCH_NEAR_ZERO_SPEED {
        MATCH_MINIMAL_THRUST
    } else if delta_v < MATCH_SMALL_SPEED {
        0.5 * delta_v / MATCH_SMALL_SPEED
    } else if delta_v < MATCH_MEDIUM_SPEED {
        0.5 + 0.5 * (delta_v - MATCH_SMALL_SPEED) / (MATCH_MEDIUM_SPEED - MATCH_SMALL_SPEED)
    } else {
        1.0
    }
}

impl MatchVelocity {
    pub fn new(target: Option<TargetRef>, gains: &AutopilotGains) -> Self {
        Self {
            target,
            tolerance: gains.match_tolerance,
            safety_factor: gains.match_safety_factor,
            matched: false,
        }
    }

    pub fn compute(
        &mut self,
        ctx: &AutopilotContext,
        dt: f64,
    ) -> Result<AutopilotOutput, AutopilotError> {
        let target = ctx.target.ok_or_else(|| {
            AutopilotError::TargetLost(
                self.target
                    .as_ref()
                    .map(|t| t.label().to_string())
                    .unwrap_or_default(),
            )
        })?;
        Ok(self.toward(target.velocity, ctx, dt))
    }

    /// Steer toward an explicit velocity.
    pub fn toward(&mut self, velocity: DVec3, ctx: &AutopilotContext, dt: f64) -> AutopilotOutput {
        let delta = velocity - ctx.own.velocity;
        let magnitude = delta.length();
        if magnitude < self.tolerance {
            self.matched = true;
            return coast(ctx.heading);
        }
        self.matched = false;

        let mut thrust = banded_thrust(magnitude) * self.safety_factor;
        if ctx.max_accel > 0.0 && dt > 0.0 {
            thrust = thrust.min(magnitude / (ctx.max_accel * dt));
        }
        AutopilotOutput {
            thrust,
            heading: vector_to_heading(delta).unwrap_or(ctx.heading),
        }
    }
}

#[cfg(test)]
mod tests {
    use bridgesim_core::types::Kinematics;

    use super::*;

    fn ctx(own_velocity: DVec3, target_velocity: DVec3) -> AutopilotContext {
        AutopilotContext {
            own: Kinematics::new(DVec3::ZERO, own_velocity),
            max_accel: 10.0,
            target: Some(Kinematics::new(DVec3::new(500.0, 0.0, 0.0), target_velocity)),
            ..Default::default()
        }
    }

    #[test]
    fn test_thrust_bands() {
        assert_eq!(banded_thrust(0.6), 0.05);
        assert!((banded_thrust(5.0) - 0.25).abs() < 1e-12);
        assert!((banded_thrust(55.0) - 0.75).abs() < 1e-12);
        assert_eq!(banded_thrust(250.0), 1.0);
    }

    #[test]
    fn test_zero_thrust_below_tolerance() {
        let mut program = MatchVelocity::new(None, &AutopilotGains::default());
        let out = program
            .compute(&ctx(DVec3::new(100.0, 0.0, 0.0), DVec3::new(100.3, 0.0, 0.0)), 1.0 / 30.0)
            .unwrap();
        assert_eq!(out.thrust, 0.0);
        assert!(program.matched);
    }

    #[test]
    fn test_never_overshoots_in_one_tick() {
        let mut program = MatchVelocity::new(None, &AutopilotGains::default());
        let dt = 1.0 / 30.0;
        let out = program
            .compute(&ctx(DVec3::ZERO, DVec3::new(0.2, 0.2, 0.0)), dt)
            .unwrap();
        // |dv| ≈ 0.28 is under tolerance; push it just over.
        assert_eq!(out.thrust, 0.0);
        let out = program
            .compute(&ctx(DVec3::ZERO, DVec3::new(0.6, 0.0, 0.0)), dt)
            .unwrap();
        assert!(out.thrust * 10.0 * dt <= 0.6 + 1e-12, "thrust {}", out.thrust);
    }

    #[test]
    fn test_missing_target_is_error() {
        let mut program = MatchVelocity::new(
            Some(TargetRef::Contact("C-004".to_string())),
            &AutopilotGains::default(),
        );
        let mut context = ctx(DVec3::ZERO, DVec3::ZERO);
        context.target = None;
        assert_eq!(
            program.compute(&context, 0.1),
            Err(AutopilotError::TargetLost("C-004".to_string()))
        );
    }
}
