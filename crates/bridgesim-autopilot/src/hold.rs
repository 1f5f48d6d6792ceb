//! Station keeping against a setpoint captured at engage time.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use bridgesim_core::config::AutopilotGains;

use crate::program::{coast, steer, AutopilotContext, AutopilotOutput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldPosition {
    pub setpoint: DVec3,
    pub position_gain: f64,
    pub velocity_gain: f64,
    pub max_speed: f64,
    pub thrust_cap: f64,
    pub position_tolerance: f64,
    pub velocity_tolerance: f64,
    pub holding: bool,
}

impl HoldPosition {
    pub fn new(setpoint: DVec3, gains: &AutopilotGains) -> Self {
        Self {
            setpoint,
            position_gain: gains.hold_position_gain,
            velocity_gain: gains.velocity_gain,
            max_speed: gains.hold_max_speed,
            thrust_cap: gains.hold_thrust_cap,
            position_tolerance: gains.hold_position_tolerance,
            velocity_tolerance: gains.hold_velocity_tolerance,
            holding: false,
        }
    }

    pub fn compute(&mut self, ctx: &AutopilotContext) -> AutopilotOutput {
        let error = self.setpoint - ctx.own.position;
        let velocity = ctx.own.velocity;
        if error.length() <= self.position_tolerance
            && velocity.length() <= self.velocity_tolerance
        {
            self.holding = true;
            return coast(ctx.heading);
        }
        self.holding = false;

        let desired = (error * self.position_gain).clamp_length_max(self.max_speed);
        let command = (desired - velocity) * self.velocity_gain;
        steer(command, ctx.max_accel, self.thrust_cap, ctx.heading)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldVelocity {
    pub setpoint: DVec3,
    pub velocity_gain: f64,
    pub thrust_cap: f64,
    pub velocity_tolerance: f64,
    pub holding: bool,
}

impl HoldVelocity {
    pub fn new(setpoint: DVec3, gains: &AutopilotGains) -> Self {
        Self {
            setpoint,
            velocity_gain: gains.velocity_gain,
            thrust_cap: gains.hold_thrust_cap,
            velocity_tolerance: gains.hold_velocity_tolerance,
            holding: false,
        }
    }

    pub fn compute(&mut self, ctx: &AutopilotContext) -> AutopilotOutput {
        let error = self.setpoint - ctx.own.velocity;
        if error.length() <= self.velocity_tolerance {
            self.holding = true;
            return coast(ctx.heading);
        }
        self.holding = false;
        steer(error * self.velocity_gain, ctx.max_accel, self.thrust_cap, ctx.heading)
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
    fn test_hold_position_inside_tolerance_coasts() {
        let mut hold = HoldPosition::new(DVec3::ZERO, &AutopilotGains::default());
        let out = hold.compute(&ctx(DVec3::new(3.0, 0.0, 0.0), DVec3::new(0.1, 0.0, 0.0)));
        assert_eq!(out.thrust, 0.0);
        assert!(hold.holding);
    }

    #[test]
    fn test_hold_position_thrust_is_capped() {
        let mut hold = HoldPosition::new(DVec3::ZERO, &AutopilotGains::default());
        let out = hold.compute(&ctx(DVec3::new(5_000.0, 0.0, 0.0), DVec3::new(200.0, 0.0, 0.0)));
        assert_eq!(out.thrust, 0.5);
        assert!((out.heading.yaw.abs() - 180.0).abs() < 1e-9, "should push back toward setpoint");
    }

    #[test]
    fn test_hold_velocity_corrects_drift() {
        let mut hold = HoldVelocity::new(DVec3::new(100.0, 0.0, 0.0), &AutopilotGains::default());
        let out = hold.compute(&ctx(DVec3::ZERO, DVec3::new(100.0, 2.0, 0.0)));
        assert!((out.thrust - 0.2).abs() < 1e-12, "thrust {}", out.thrust);
        assert!((out.heading.yaw + 90.0).abs() < 1e-9);
    }
}
