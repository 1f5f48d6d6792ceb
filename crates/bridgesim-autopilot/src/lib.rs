//! Autopilot for BRIDGESIM.
//!
//! Navigation programs (go-to, intercept, velocity matching, station
//! keeping, formation) and the controller that arbitrates them against
//! manual helm input. No ECS dependency; operates on plain data.

pub mod formation;
pub mod goto;
pub mod hold;
pub mod intercept;
pub mod match_velocity;
pub mod navigation;
pub mod program;

pub use bridgesim_core as core;

pub use navigation::{NavigationController, NavigationResult};
pub use program::{
    AutopilotContext, AutopilotError, AutopilotOutput, AutopilotProgram, FlagshipState,
};
