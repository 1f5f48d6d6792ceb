//! Error types for the command surface and configuration loading.

use thiserror::Error;

use crate::types::ShipId;

/// Invalid input on the command surface. Returned to the caller, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown ship `{0}`")]
    UnknownShip(ShipId),
    #[error("ship `{ship}` has no {system} system")]
    SystemUnavailable { ship: ShipId, system: &'static str },
    #[error("ship `{ship}` has no weapon `{weapon}`")]
    UnknownWeapon { ship: ShipId, weapon: String },
    #[error("target `{0}` not found")]
    TargetNotFound(String),
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("ship `{0}` already exists")]
    DuplicateShip(ShipId),
    #[error("autopilot rejected request: {0}")]
    Autopilot(String),
}

/// Problems found while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
