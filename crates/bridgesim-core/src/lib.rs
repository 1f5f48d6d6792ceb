//! Core types and definitions for the BRIDGESIM ship simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! components, commands, configuration, state views, events, constants,
//! and the vector/relative-motion math used by autopilot and targeting.
//! It has no dependency on the ECS or any runtime framework.

pub mod commands;
pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod math;
pub mod relative;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
