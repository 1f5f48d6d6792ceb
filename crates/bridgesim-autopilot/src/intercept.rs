//! Run down a moving target, then settle alongside it.
//!
//! Far out the program flies a lead-pursuit course at pursuit speed. Inside
//! the approach range it meters closing speed in proportion to range, and
//! once close and slow enough it hands over to velocity matching.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bridgesim_core::commands::TargetRef;
use bridgesim_core::config::AutopilotGains;
use bridgesim_core::constants::*;
use bridgesim_core::relative::{closing_speed, range, solve_intercept_time};

use crate::match_velocity::MatchVelocity;
use crate::program::{steer, AutopilotContext, AutopilotError, AutopilotOutput, MIN_ACCEL};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterceptPhase {
    #[default]
    Intercept,
    Approach,
    Match,
}

impl InterceptPhase {
    pub fn label(self) -> &'static str {
        match self {
            InterceptPhase::Intercept => "INTERCEPT",
            InterceptPhase::Approach => "APPROACH",
            InterceptPhase::Match => "MATCH",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intercept {
    pub target: TargetRef,
    pub approach_range: f64,
    pub match_range: f64,
    pub match_closing_speed: f64,
    pub pursuit_speed: f64,
    pub velocity_gain: f64,
    pub phase: InterceptPhase,
    matcher: MatchVelocity,
}

/// Closing speed to hold at `range` meters during approach.
pub fn approach_closing_speed(range: f64) -> f64 {
    (APPROACH_CLOSING_PER_METER * range)
        .clamp(APPROACH_MIN_CLOSING_SPEED, APPROACH_MAX_CLOSING_SPEED)
}

impl Intercept {
    pub fn new(target: TargetRef, gains: &AutopilotGains) -> Self {
        Self {
            target,
            approach_range: gains.approach_range,
            match_range: gains.match_range,
            match_closing_speed: gains.match_closing_speed,
            pursuit_speed: gains.pursuit_speed,
            velocity_gain: gains.velocity_gain,
            phase: InterceptPhase::Intercept,
            matcher: MatchVelocity::new(None, gains),
        }
    }

    pub fn compute(
        &mut self,
        ctx: &AutopilotContext,
        dt: f64,
        sim_time: f64,
    ) -> Result<Option<AutopilotOutput>, AutopilotError> {
        let target = ctx
            .target
            .ok_or_else(|| AutopilotError::TargetLost(self.target.label().to_string()))?;
        let distance = range(&ctx.own, &target);
        let closing = closing_speed(&ctx.own, &target);

        let next = if distance <= self.match_range && closing <= self.match_closing_speed {
            InterceptPhase::Match
        } else if distance <= self.approach_range {
            InterceptPhase::Approach
        } else {
            InterceptPhase::Intercept
        };
        if next != self.phase {
            debug!(
                sim_time,
                target = self.target.label(),
                from = self.phase.label(),
                to = next.label(),
                distance,
                closing,
                "intercept phase change"
            );
            self.phase = next;
        }

        let accel = ctx.max_accel.max(MIN_ACCEL);
        let line_of_sight = target.position - ctx.own.position;
        let dir = line_of_sight.normalize_or_zero();
        let desired_velocity = match self.phase {
            InterceptPhase::Match => {
                return Ok(Some(self.matcher.toward(target.velocity, ctx, dt)));
            }
            InterceptPhase::Approach => target.velocity + dir * approach_closing_speed(distance),
            InterceptPhase::Intercept => self.pursuit_velocity(line_of_sight, target.velocity),
        };
        let command = (desired_velocity - ctx.own.velocity) * self.velocity_gain;
        Ok(Some(steer(command, accel, 1.0, ctx.heading)))
    }

    /// Velocity at pursuit speed that meets the target if it holds course.
    /// Falls back to pure pursuit when the target outruns us.
    fn pursuit_velocity(&self, line_of_sight: DVec3, target_velocity: DVec3) -> DVec3 {
        match solve_intercept_time(line_of_sight, target_velocity, self.pursuit_speed) {
            Some(t) if t > 0.0 => {
                (line_of_sight + target_velocity * t).normalize_or_zero() * self.pursuit_speed
            }
            _ => line_of_sight.normalize_or_zero() * self.pursuit_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use bridgesim_core::types::Kinematics;

    use super::*;

    fn ctx(own: Kinematics, target: Kinematics) -> AutopilotContext {
        AutopilotContext {
            own,
            max_accel: 10.0,
            target: Some(target),
            ..Default::default()
        }
    }

    fn program() -> Intercept {
        Intercept::new(TargetRef::Contact("C-001".to_string()), &AutopilotGains::default())
    }

    #[test]
    fn test_phase_gates() {
        let mut p = program();
        let target = Kinematics::new(DVec3::new(50_000.0, 0.0, 0.0), DVec3::ZERO);
        p.compute(&ctx(Kinematics::default(), target), 1.0 / 30.0, 0.0).unwrap();
        assert_eq!(p.phase, InterceptPhase::Intercept);

        let target = Kinematics::new(DVec3::new(5_000.0, 0.0, 0.0), DVec3::ZERO);
        p.compute(&ctx(Kinematics::default(), target), 1.0 / 30.0, 1.0).unwrap();
        assert_eq!(p.phase, InterceptPhase::Approach);

        // Close but still closing fast: stay in approach.
        let target = Kinematics::new(DVec3::new(800.0, 0.0, 0.0), DVec3::ZERO);
        let fast = Kinematics::new(DVec3::ZERO, DVec3::new(120.0, 0.0, 0.0));
        p.compute(&ctx(fast, target), 1.0 / 30.0, 2.0).unwrap();
        assert_eq!(p.phase, InterceptPhase::Approach);

        let slow = Kinematics::new(DVec3::ZERO, DVec3::new(20.0, 0.0, 0.0));
        p.compute(&ctx(slow, target), 1.0 / 30.0, 3.0).unwrap();
        assert_eq!(p.phase, InterceptPhase::Match);
    }

    #[test]
    fn test_leads_crossing_target() {
        let mut p = program();
        let target = Kinematics::new(DVec3::new(50_000.0, 0.0, 0.0), DVec3::new(0.0, 200.0, 0.0));
        let out = p
            .compute(&ctx(Kinematics::default(), target), 1.0 / 30.0, 0.0)
            .unwrap()
            .unwrap();
        assert!(out.heading.yaw > 5.0, "should lead ahead of the target, yaw {}", out.heading.yaw);
    }

    #[test]
    fn test_approach_closing_band() {
        assert_eq!(approach_closing_speed(100.0), 10.0);
        assert!((approach_closing_speed(5_000.0) - 100.0).abs() < 1e-9);
        assert_eq!(approach_closing_speed(20_000.0), 200.0);
    }

    #[test]
    fn test_lost_target_is_error() {
        let mut p = program();
        let context = AutopilotContext {
            max_accel: 10.0,
            ..Default::default()
        };
        assert!(matches!(
            p.compute(&context, 0.1, 0.0),
            Err(AutopilotError::TargetLost(_))
        ));
    }
}
