//! Rigid-body integration system.
//!
//! Orientation integrates as a body-frame quaternion increment and is
//! renormalized every tick; the pitch/yaw/roll mirror is re-derived from
//! it. Translation is explicit forward Euler: `v += a·dt; p += v·dt`.

use glam::{DQuat, DVec3};
use hecs::World;
use tracing::warn;

use bridgesim_core::components::ShipState;
use bridgesim_core::constants::*;
use bridgesim_core::enums::GimbalLockLevel;
use bridgesim_core::events::{EventBus, SimEvent};
use bridgesim_core::math::{
    normalize_attitude, quat_to_attitude, sanitize_components, sanitize_magnitude,
};
use bridgesim_core::types::AxisRates;

use crate::systems::damage::DamageModel;

/// Gimbal-lock band for a pitch angle in degrees.
pub fn gimbal_level(pitch: f64) -> GimbalLockLevel {
    let pitch = pitch.abs();
    if pitch >= GIMBAL_CRITICAL_PITCH {
        GimbalLockLevel::Critical
    } else if pitch >= GIMBAL_WARNING_PITCH {
        GimbalLockLevel::Warning
    } else {
        GimbalLockLevel::Clear
    }
}

/// Body-frame rotation for one step of `rates` (deg/s).
///
/// Pitch is nose-up, which is a negative turn about the body Y axis in
/// the `Rz(yaw)·Ry(-pitch)·Rx(roll)` convention.
pub fn rotation_increment(rates: &AxisRates, dt: f64) -> DQuat {
    let scaled = DVec3::new(
        rates.roll.to_radians(),
        -rates.pitch.to_radians(),
        rates.yaw.to_radians(),
    ) * dt;
    DQuat::from_scaled_axis(scaled)
}

/// Advance one ship by `dt`.
///
/// `thrust_factor` scales commanded thrust (propulsion health) and
/// `turn_factor` scales rotation rates (maneuvering health).
pub fn step(
    ship: &mut ShipState,
    dt: f64,
    thrust_factor: f64,
    turn_factor: f64,
    events: &mut EventBus,
) {
    let mut repaired: Vec<&'static str> = Vec::new();

    // --- Rotation ---
    let (accel, fixed) = sanitize_rates(ship.angular_acceleration);
    ship.angular_acceleration = accel;
    if fixed {
        repaired.push("angular_acceleration");
    }
    ship.angular_velocity.pitch += ship.angular_acceleration.pitch * dt;
    ship.angular_velocity.yaw += ship.angular_acceleration.yaw * dt;
    ship.angular_velocity.roll += ship.angular_acceleration.roll * dt;
    let (rates, fixed) = sanitize_rates(ship.angular_velocity);
    ship.angular_velocity = rates;
    if fixed {
        repaired.push("angular_velocity");
    }

    if turn_factor > 0.0 && !ship.angular_velocity.is_zero() {
        let effective = AxisRates::new(
            ship.angular_velocity.pitch * turn_factor,
            ship.angular_velocity.yaw * turn_factor,
            ship.angular_velocity.roll * turn_factor,
        );
        ship.rotation = (ship.rotation * rotation_increment(&effective, dt)).normalize();
    }
    if !ship.rotation.is_finite() {
        ship.rotation = DQuat::IDENTITY;
        repaired.push("rotation");
    }
    ship.orientation = normalize_attitude(quat_to_attitude(ship.rotation));

    let level = gimbal_level(ship.orientation.pitch);
    if level > ship.gimbal_level {
        events.publish(SimEvent::GimbalLock {
            ship_id: ship.id.clone(),
            pitch: ship.orientation.pitch,
            level,
        });
    }
    ship.gimbal_level = level;

    // --- Translation ---
    let (thrust, fixed) = sanitize_magnitude(ship.thrust, ship.max_thrust);
    if fixed && !ship.thrust.is_finite() {
        repaired.push("thrust");
    }
    ship.thrust = thrust;

    let world_thrust = ship.rotation * (ship.thrust * thrust_factor);
    let (acceleration, fixed) = sanitize_magnitude(world_thrust / ship.mass, MAX_ACCELERATION);
    ship.acceleration = acceleration;
    if fixed {
        repaired.push("acceleration");
    }

    let (velocity, fixed) =
        sanitize_magnitude(ship.velocity + ship.acceleration * dt, MAX_VELOCITY);
    ship.velocity = velocity;
    if fixed {
        repaired.push("velocity");
    }

    let (position, fixed) = sanitize_components(ship.position + ship.velocity * dt, MAX_POSITION);
    ship.position = position;
    if fixed {
        repaired.push("position");
    }

    for field in repaired {
        ship.needs_recovery = true;
        ship.recovery_count += 1;
        warn!(ship = %ship.id, field, "numeric recovery");
        events.publish(SimEvent::NumericRecovery {
            ship_id: ship.id.clone(),
            field: field.to_string(),
        });
    }
}

fn sanitize_rates(rates: AxisRates) -> (AxisRates, bool) {
    let (v, fixed) = sanitize_components(
        DVec3::new(rates.pitch, rates.yaw, rates.roll),
        MAX_ANGULAR_RATE,
    );
    (AxisRates::new(v.x, v.y, v.z), fixed)
}

/// Integrate every ship. A destroyed ship's subsystems report factor 0,
/// so it drifts without thrust or rotation.
pub fn run(world: &mut World, dt: f64, events: &mut EventBus) {
    for (_entity, (ship, damage)) in world.query_mut::<(&mut ShipState, Option<&DamageModel>)>() {
        let (thrust_factor, turn_factor) = match damage {
            Some(d) => (d.factor(PROPULSION), d.factor(MANEUVERING)),
            None => (1.0, 1.0),
        };
        step(ship, dt, thrust_factor, turn_factor, events);
    }
}
