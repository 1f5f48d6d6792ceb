//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Who is flying the ship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Helm has direct control, no autopilot output.
    #[default]
    Manual,
    /// Helm touched the controls while autopilot was engaged; autopilot is
    /// suppressed until the override window expires.
    ManualOverride,
    /// Autopilot program drives thrust and heading.
    Autopilot,
}

/// Coarse hull size bucket, the first thing sensors can resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    Small,
    #[default]
    Medium,
    Large,
}

/// What an observer knows about a contact's identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "value")]
pub enum Classification {
    #[default]
    Unknown,
    Size(SizeClass),
    Class(String),
}

/// How a contact was last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[default]
    Passive,
    Active,
}

/// Subsystem status, derived from health alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsystemStatus {
    Online,
    Damaged,
    Offline,
    Destroyed,
}

/// How much losing a subsystem hurts the ship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criticality {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Gimbal-lock proximity. Purely observational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GimbalLockLevel {
    #[default]
    Clear,
    Warning,
    Critical,
}

/// Autopilot program identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutopilotKind {
    GoToPosition,
    Intercept,
    MatchVelocity,
    HoldPosition,
    HoldVelocity,
    Formation,
}

/// Weapon family, for display and event context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    #[default]
    Railgun,
    Autocannon,
    Torpedo,
}
