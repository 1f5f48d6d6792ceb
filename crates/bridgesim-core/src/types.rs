//! Fundamental geometric and simulation types.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use glam::{DQuat, DVec3};

/// True identity of a ship. Never shown to other ships' crews; sensors
/// report per-observer contact ids instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipId(pub String);

impl ShipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShipId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl SimTime {
    /// Advance by one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.tick += 1;
        self.elapsed_secs += dt;
    }
}

/// Position and velocity of a body, in world frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: DVec3,
    pub velocity: DVec3,
}

impl Kinematics {
    pub fn new(position: DVec3, velocity: DVec3) -> Self {
        Self { position, velocity }
    }

    /// Position extrapolated `t` seconds ahead at constant velocity.
    pub fn predict(&self, t: f64) -> DVec3 {
        self.position + self.velocity * t
    }
}

/// Human-readable orientation in degrees, each component in [-180, 180).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Attitude {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Per-axis rates (deg/s for angular velocity, deg/s² for acceleration).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisRates {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl AxisRates {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    pub fn is_zero(&self) -> bool {
        self.pitch == 0.0 && self.yaw == 0.0 && self.roll == 0.0
    }
}

/// Pointing direction without roll (degrees). Pitch is positive up,
/// yaw is measured from +X toward +Y.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub pitch: f64,
    pub yaw: f64,
}

impl Heading {
    pub fn new(pitch: f64, yaw: f64) -> Self {
        Self { pitch, yaw }
    }
}
