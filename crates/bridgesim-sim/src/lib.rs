//! Simulation engine for BRIDGESIM.
//!
//! Owns the hecs ECS world, runs ship systems at a fixed tick rate,
//! and produces SimSnapshots for the bridge stations.

pub mod engine;
pub mod runner;
pub mod systems;
pub mod world_setup;

pub use bridgesim_core as core;
pub use engine::Simulator;
pub use runner::{LoopCommand, SimLoop};
