//! ECS systems that operate on the simulation world each tick.
//!
//! Systems are free functions that take `&mut World` (or `&World` for read-only).
//! They do not own state; all state lives in components.

pub mod damage;
pub mod navigation;
pub mod physics;
pub mod power;
pub mod sensors;
pub mod snapshot;
pub mod weapons;
