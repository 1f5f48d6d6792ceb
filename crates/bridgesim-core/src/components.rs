//! Plain data records shared between systems.
//!
//! `ShipState` is the per-ship kinematic record attached to every ship
//! entity. The remaining records are produced by the sensor, weapon, and
//! damage systems. Game logic lives in systems, not here.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{Attitude, AxisRates, Heading, ShipId};

/// Owned kinematic and configuration record for one ship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipState {
    pub id: ShipId,
    /// Ship class name (e.g. "frigate"), resolved by high-accuracy sensors.
    pub ship_class: String,
    pub size_class: SizeClass,
    /// World position (m).
    pub position: DVec3,
    /// World velocity (m/s).
    pub velocity: DVec3,
    /// Authoritative orientation.
    pub rotation: DQuat,
    /// Normalized mirror of `rotation` in degrees, re-derived every tick.
    pub orientation: Attitude,
    /// deg/s per axis, applied in the ship's body frame.
    pub angular_velocity: AxisRates,
    /// deg/s² per axis.
    pub angular_acceleration: AxisRates,
    /// kg
    pub mass: f64,
    /// kg·m²
    pub moment_of_inertia: f64,
    /// Commanded thrust in the ship frame (N). +X is forward.
    pub thrust: DVec3,
    /// Thrust magnitude ceiling (N).
    pub max_thrust: f64,
    /// Acceleration from the last integration step, world frame (m/s²).
    pub acceleration: DVec3,
    /// Base emission signature seen by passive sensors.
    pub signature: f64,
    /// Last gimbal-lock level reported.
    pub gimbal_level: GimbalLockLevel,
    /// Set when the integrator had to repair a corrupted value.
    pub needs_recovery: bool,
    pub recovery_count: u32,
}

impl ShipState {
    /// Forward unit vector in world frame.
    pub fn forward(&self) -> DVec3 {
        self.rotation * DVec3::X
    }

    /// Current throttle as a fraction of max thrust.
    pub fn throttle(&self) -> f64 {
        if self.max_thrust <= 0.0 {
            return 0.0;
        }
        (self.thrust.length() / self.max_thrust).clamp(0.0, 1.0)
    }
}

/// One observer's belief about another ship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactData {
    /// Stable per-observer id, unrelated to the true ship id.
    pub contact_id: String,
    pub position: DVec3,
    pub velocity: DVec3,
    /// Confidence at the last update, in [0, 1].
    pub confidence: f64,
    /// Simulation time of the last update (s).
    pub last_update: f64,
    pub method: DetectionMethod,
    /// Bearing relative to the observer's nose at the last update.
    pub bearing: Heading,
    pub distance: f64,
    pub signature: f64,
    pub classification: Classification,
}

/// Transient fire-control solution for one (weapon, target) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiringSolution {
    pub range: f64,
    /// Angle between the line of sight and the aim vector (degrees).
    pub lead_angle: f64,
    /// World heading the projectile must be launched along.
    pub aim: Heading,
    pub intercept_point: DVec3,
    pub time_of_flight: f64,
    pub hit_probability: f64,
    /// A ballistic solution exists for the current target.
    pub tracking: bool,
    /// The aim lies inside the turret's arc.
    pub in_arc: bool,
    pub ready_to_fire: bool,
    /// Why the weapon cannot fire, when `ready_to_fire` is false.
    pub reason: Option<String>,
}

/// Health and heat pools of one ship subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemHealth {
    pub name: String,
    pub max_health: f64,
    pub health: f64,
    pub heat: f64,
    pub max_heat: f64,
    pub criticality: Criticality,
    /// Health fraction at or below which the subsystem is offline.
    pub failure_threshold: f64,
    /// Heat fraction at which the subsystem overheats.
    pub overheat_threshold: f64,
    /// Performance lost at maximum heat.
    pub overheat_penalty: f64,
    /// Heat removed per second.
    pub heat_dissipation: f64,
    /// Relative chance of absorbing subsystem damage from a hit.
    pub hit_weight: f64,
}
