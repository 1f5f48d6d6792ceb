//! Keep a slot relative to a flagship.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use bridgesim_core::constants::FORMATION_REPULSION_WEIGHT;
use bridgesim_core::math::rotate_about_up;
use bridgesim_core::types::ShipId;

use crate::program::{steer, AutopilotContext, AutopilotError, AutopilotOutput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    pub flagship: ShipId,
    /// Slot offset in the flagship's yaw frame (m).
    pub offset: DVec3,
    pub echelon: bool,
    /// Damp toward the flagship's velocity rather than to rest.
    pub match_velocity: bool,
    pub wingmen: Vec<ShipId>,
    pub position_gain: f64,
    pub velocity_gain: f64,
    pub min_separation: f64,
}

impl Formation {
    /// World position of our slot.
    pub fn slot(&self, flagship_position: DVec3, flagship_yaw: f64) -> DVec3 {
        flagship_position + rotate_about_up(self.offset, flagship_yaw)
    }

    pub fn compute(&self, ctx: &AutopilotContext) -> Result<AutopilotOutput, AutopilotError> {
        let flagship = ctx
            .flagship
            .ok_or_else(|| AutopilotError::TargetLost(self.flagship.to_string()))?;
        let slot = self.slot(flagship.kinematics.position, flagship.yaw);

        let position_error = slot - ctx.own.position;
        let velocity_error = if self.match_velocity {
            flagship.kinematics.velocity - ctx.own.velocity
        } else {
            -ctx.own.velocity
        };
        let mut command =
            position_error * self.position_gain + velocity_error * self.velocity_gain;

        if self.echelon {
            if let Some(repulsion) = self.repulsion(ctx) {
                command = command * (1.0 - FORMATION_REPULSION_WEIGHT)
                    + repulsion * FORMATION_REPULSION_WEIGHT;
            }
        }
        Ok(steer(command, ctx.max_accel, 1.0, ctx.heading))
    }

    /// Push away from neighbors inside the minimum separation, scaled up to
    /// full acceleration at zero distance. `None` if nobody is too close.
    fn repulsion(&self, ctx: &AutopilotContext) -> Option<DVec3> {
        let mut push = DVec3::ZERO;
        let mut crowded = false;
        for neighbor in &ctx.neighbors {
            let away = ctx.own.position - *neighbor;
            let distance = away.length();
            if distance >= self.min_separation {
                continue;
            }
            crowded = true;
            let strength = ctx.max_accel * (1.0 - distance / self.min_separation);
            push += away.normalize_or_zero() * strength;
        }
        crowded.then_some(push)
    }
}

#[cfg(test)]
mod tests {
    use bridgesim_core::config::AutopilotGains;
    use bridgesim_core::types::Kinematics;

    use crate::program::FlagshipState;

    use super::*;

    fn formation(echelon: bool) -> Formation {
        let gains = AutopilotGains::default();
        Formation {
            flagship: ShipId::new("flag"),
            offset: DVec3::new(-500.0, 0.0, 0.0),
            echelon,
            match_velocity: true,
            wingmen: vec![ShipId::new("wing-2")],
            position_gain: gains.formation_position_gain,
            velocity_gain: gains.formation_velocity_gain,
            min_separation: gains.formation_min_separation,
        }
    }

    #[test]
    fn test_slot_rotates_with_flagship_yaw() {
        let f = formation(false);
        let slot = f.slot(DVec3::ZERO, 90.0);
        assert!((slot - DVec3::new(0.0, -500.0, 0.0)).length() < 1e-6, "slot {slot}");
    }

    #[test]
    fn test_in_slot_at_flagship_speed_needs_no_thrust() {
        let f = formation(false);
        let velocity = DVec3::new(100.0, 0.0, 0.0);
        let ctx = AutopilotContext {
            own: Kinematics::new(DVec3::new(-500.0, 0.0, 0.0), velocity),
            max_accel: 10.0,
            flagship: Some(FlagshipState {
                kinematics: Kinematics::new(DVec3::ZERO, velocity),
                yaw: 0.0,
            }),
            ..Default::default()
        };
        let out = f.compute(&ctx).unwrap();
        assert!(out.thrust < 1e-9, "thrust {}", out.thrust);
    }

    #[test]
    fn test_echelon_pushes_away_from_crowding_neighbor() {
        let f = formation(true);
        let ctx = AutopilotContext {
            own: Kinematics::new(DVec3::new(-500.0, 0.0, 0.0), DVec3::ZERO),
            max_accel: 10.0,
            flagship: Some(FlagshipState::default()),
            neighbors: vec![DVec3::new(-500.0, 50.0, 0.0)],
            ..Default::default()
        };
        let out = f.compute(&ctx).unwrap();
        assert!(out.thrust > 0.0);
        assert!(out.heading.yaw < 0.0, "should steer away (-Y), yaw {}", out.heading.yaw);
    }

    #[test]
    fn test_missing_flagship_is_error() {
        let f = formation(false);
        let ctx = AutopilotContext::default();
        assert!(matches!(f.compute(&ctx), Err(AutopilotError::TargetLost(_))));
    }
}
