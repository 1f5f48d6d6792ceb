//! Sensor systems: passive scanning, active pings, and per-observer
//! contact tracking.
//!
//! Sensors see true ship state through noise; everything downstream of a
//! sensor (crews, autopilot, weapons addressing a contact) works from the
//! observer's `ContactTracker`, never from true ship ids.

pub mod active;
pub mod passive;
pub mod tracker;

use glam::DVec3;
use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use bridgesim_core::components::ShipState;
use bridgesim_core::constants::*;
use bridgesim_core::enums::{Classification, DetectionMethod, SizeClass};
use bridgesim_core::events::EventBus;
use bridgesim_core::types::{Kinematics, ShipId};

use crate::systems::sensors::tracker::ContactTracker;

/// What any sensor can observe of one ship this tick.
#[derive(Debug, Clone)]
pub struct Emitter {
    pub entity: Entity,
    pub id: ShipId,
    pub kinematics: Kinematics,
    /// Emitted signature: base × (1 + 0.5·throttle).
    pub signature: f64,
    pub ship_class: String,
    pub size_class: SizeClass,
}

/// One noisy observation, ready for a tracker.
#[derive(Debug, Clone)]
pub struct Detection {
    pub ship: ShipId,
    pub position: DVec3,
    pub velocity: DVec3,
    pub accuracy: f64,
    pub method: DetectionMethod,
    pub signature: f64,
    pub classification: Classification,
}

pub fn emitted_signature(base: f64, throttle: f64) -> f64 {
    base * (1.0 + THROTTLE_SIGNATURE_GAIN * throttle.clamp(0.0, 1.0))
}

/// Every ship as seen by sensors, ordered by id so RNG draws are stable.
pub fn collect_emitters(world: &World) -> Vec<Emitter> {
    let mut emitters: Vec<Emitter> = world
        .query::<&ShipState>()
        .iter()
        .map(|(entity, ship)| Emitter {
            entity,
            id: ship.id.clone(),
            kinematics: Kinematics::new(ship.position, ship.velocity),
            signature: emitted_signature(ship.signature, ship.throttle()),
            ship_class: ship.ship_class.clone(),
            size_class: ship.size_class,
        })
        .collect();
    emitters.sort_by(|a, b| a.id.cmp(&b.id));
    emitters
}

/// Identity resolved at a given accuracy.
pub fn classify(accuracy: f64, emitter: &Emitter) -> Classification {
    if accuracy > CLASSIFY_FULL_ACCURACY {
        Classification::Class(emitter.ship_class.clone())
    } else if accuracy > CLASSIFY_SIZE_ACCURACY {
        Classification::Size(emitter.size_class)
    } else {
        Classification::Unknown
    }
}

/// Standard normal sample (Box–Muller).
pub fn gaussian(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn jitter(rng: &mut ChaCha8Rng, sigma: f64) -> DVec3 {
    if sigma <= 0.0 {
        return DVec3::ZERO;
    }
    DVec3::new(gaussian(rng), gaussian(rng), gaussian(rng)) * sigma
}

/// Noise standard deviations (position m, velocity m/s) for an
/// observation at `distance` with the given accuracy.
pub fn noise_sigma(distance: f64, accuracy: f64) -> (f64, f64) {
    let miss = (1.0 - accuracy).clamp(0.0, 1.0);
    (
        distance * POSITION_NOISE_FRACTION * miss,
        VELOCITY_NOISE_BASE * miss,
    )
}

/// Observe `emitter` from `observer_position` with the given accuracy.
pub fn observe(
    emitter: &Emitter,
    observer_position: DVec3,
    accuracy: f64,
    method: DetectionMethod,
    rng: &mut ChaCha8Rng,
) -> Detection {
    let distance = (emitter.kinematics.position - observer_position).length();
    let (position_sigma, velocity_sigma) = noise_sigma(distance, accuracy);
    Detection {
        ship: emitter.id.clone(),
        position: emitter.kinematics.position + jitter(rng, position_sigma),
        velocity: emitter.kinematics.velocity + jitter(rng, velocity_sigma),
        accuracy,
        method,
        signature: emitter.signature,
        classification: classify(accuracy, emitter),
    }
}

/// Passive scans for every due sensor, then staleness pruning for every
/// tracker.
pub fn run(world: &mut World, rng: &mut ChaCha8Rng, tick: u64, now: f64, events: &mut EventBus) {
    passive::run(world, rng, tick, now, events);
    for (_entity, (ship, tracker)) in world.query_mut::<(&ShipState, &mut ContactTracker)>() {
        tracker.prune(&ship.id, now, events);
    }
}
