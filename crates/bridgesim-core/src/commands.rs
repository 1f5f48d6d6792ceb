//! Commands sent to ships from outside the simulation core.
//!
//! Commands are either applied immediately through `Simulator::command` or
//! queued for the next tick boundary.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enums::AutopilotKind;
use crate::error::CommandError;
use crate::types::ShipId;

/// Names accepted by `ShipCommand::from_name`.
pub const COMMAND_NAMES: &[&str] = &[
    "set_thrust",
    "set_orientation",
    "rotate",
    "apply_torque",
    "engage_autopilot",
    "disengage_autopilot",
    "ping_sensors",
    "set_weapon_target",
    "fire_weapon",
];

/// What a weapon or autopilot program is aimed at.
///
/// Crews address targets by their own contact id; scenario and AI code may
/// address ships directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TargetRef {
    Contact(String),
    Ship(ShipId),
}

impl TargetRef {
    pub fn label(&self) -> &str {
        match self {
            TargetRef::Contact(id) => id,
            TargetRef::Ship(id) => id.as_str(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Program selection and parameters for `EngageAutopilot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "program", rename_all = "snake_case")]
pub enum AutopilotRequest {
    GoToPosition {
        target: DVec3,
        #[serde(default = "default_true")]
        stop_at_target: bool,
        #[serde(default)]
        arrival_tolerance: Option<f64>,
        #[serde(default)]
        arrival_speed_tolerance: Option<f64>,
        #[serde(default)]
        cruise_speed: Option<f64>,
    },
    Intercept {
        target: TargetRef,
    },
    MatchVelocity {
        target: TargetRef,
    },
    HoldPosition,
    HoldVelocity,
    Formation {
        flagship: ShipId,
        /// Slot offset from the flagship, rotated by the flagship's yaw.
        offset: DVec3,
        /// Blend in separation from `wingmen` when too close.
        #[serde(default)]
        echelon: bool,
        #[serde(default = "default_true")]
        match_velocity: bool,
        #[serde(default)]
        wingmen: Vec<ShipId>,
    },
}

impl AutopilotRequest {
    pub fn kind(&self) -> AutopilotKind {
        match self {
            AutopilotRequest::GoToPosition { .. } => AutopilotKind::GoToPosition,
            AutopilotRequest::Intercept { .. } => AutopilotKind::Intercept,
            AutopilotRequest::MatchVelocity { .. } => AutopilotKind::MatchVelocity,
            AutopilotRequest::HoldPosition => AutopilotKind::HoldPosition,
            AutopilotRequest::HoldVelocity => AutopilotKind::HoldVelocity,
            AutopilotRequest::Formation { .. } => AutopilotKind::Formation,
        }
    }
}

/// All ship actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShipCommand {
    // --- Helm (manual) ---
    /// Set ship-frame thrust in newtons (+X forward).
    SetThrust { thrust: DVec3 },
    /// Snap to an attitude in degrees and stop rotating.
    SetOrientation {
        pitch: f64,
        yaw: f64,
        #[serde(default)]
        roll: f64,
    },
    /// Set body angular velocity in deg/s.
    Rotate { pitch: f64, yaw: f64, roll: f64 },
    /// Apply torque (N·m) per axis; angular acceleration = torque / inertia.
    ApplyTorque { pitch: f64, yaw: f64, roll: f64 },

    // --- Navigation ---
    EngageAutopilot { request: AutopilotRequest },
    DisengageAutopilot,

    // --- Sensors ---
    PingSensors,

    // --- Weapons ---
    SetWeaponTarget {
        weapon: String,
        target: Option<TargetRef>,
    },
    FireWeapon {
        weapon: String,
        #[serde(default)]
        target: Option<TargetRef>,
    },
}

impl ShipCommand {
    /// Parse the string-named command surface: `name` plus a JSON object of
    /// arguments (or `null` for commands without arguments).
    pub fn from_name(name: &str, args: Value) -> Result<Self, CommandError> {
        if !COMMAND_NAMES.contains(&name) {
            return Err(CommandError::UnknownCommand(name.to_string()));
        }
        let mut object = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(CommandError::InvalidArgument(format!(
                    "arguments for `{name}` must be an object, got {other}"
                )))
            }
        };
        object.insert("type".to_string(), Value::String(name.to_string()));
        serde_json::from_value(Value::Object(object))
            .map_err(|e| CommandError::InvalidArgument(format!("{name}: {e}")))
    }

    /// Helm inputs that count as manual control.
    pub fn is_manual_helm(&self) -> bool {
        matches!(
            self,
            ShipCommand::SetThrust { .. }
                | ShipCommand::SetOrientation { .. }
                | ShipCommand::Rotate { .. }
                | ShipCommand::ApplyTorque { .. }
        )
    }
}

/// Successful (non-error) result of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    /// A resource is exhausted or a timer has not elapsed. Retry later.
    NotReady { reason: String },
    Fired { hit: bool, hull_damage: f64 },
}
