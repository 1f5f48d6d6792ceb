//! Passive sensor scanning.
//!
//! Each due sensor rolls once per ship in range against an accuracy built
//! from range and emitted signature. The very first scan is a free look:
//! everything in range is picked up without a roll.

use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use bridgesim_core::components::ShipState;
use bridgesim_core::config::PassiveSensorConfig;
use bridgesim_core::constants::*;
use bridgesim_core::enums::DetectionMethod;
use bridgesim_core::events::EventBus;
use bridgesim_core::types::{Attitude, Kinematics, ShipId};

use crate::systems::damage::DamageModel;
use crate::systems::sensors::tracker::ContactTracker;
use crate::systems::sensors::{collect_emitters, observe, Detection};

#[derive(Debug, Clone)]
pub struct PassiveSensor {
    pub range: f64,
    pub scan_interval_ticks: u32,
    /// Scans completed so far.
    pub scans: u64,
}

impl PassiveSensor {
    pub fn from_config(config: &PassiveSensorConfig) -> Self {
        Self {
            range: config.range,
            scan_interval_ticks: config.scan_interval_ticks,
            scans: 0,
        }
    }

    pub fn is_due(&self, tick: u64) -> bool {
        tick % u64::from(self.scan_interval_ticks.max(1)) == 0
    }

    pub fn effective_range(&self, sensors_factor: f64) -> f64 {
        self.range * sensors_factor
    }
}

/// Detection accuracy for a target at `distance` with emitted `signature`.
pub fn detection_accuracy(distance: f64, effective_range: f64, signature: f64) -> f64 {
    if effective_range <= 0.0 {
        return 0.0;
    }
    let range_score = (1.0 - distance / effective_range).clamp(0.0, 1.0);
    let signature_score = (signature / SIGNATURE_REFERENCE).clamp(0.0, 1.0);
    PASSIVE_RANGE_WEIGHT * range_score + PASSIVE_SIGNATURE_WEIGHT * signature_score
}

struct Scan {
    entity: Entity,
    id: ShipId,
    own: Kinematics,
    attitude: Attitude,
    range: f64,
    free_look: bool,
}

pub fn run(world: &mut World, rng: &mut ChaCha8Rng, tick: u64, now: f64, events: &mut EventBus) {
    let mut scans: Vec<Scan> = Vec::new();
    for (entity, (ship, sensor, damage)) in
        world.query_mut::<(&ShipState, &mut PassiveSensor, Option<&DamageModel>)>()
    {
        if !sensor.is_due(tick) {
            continue;
        }
        let factor = damage.map_or(1.0, |d| d.factor(SENSORS));
        scans.push(Scan {
            entity,
            id: ship.id.clone(),
            own: Kinematics::new(ship.position, ship.velocity),
            attitude: ship.orientation,
            range: sensor.effective_range(factor),
            free_look: sensor.scans == 0,
        });
        sensor.scans += 1;
    }
    if scans.is_empty() {
        return;
    }
    scans.sort_by(|a, b| a.id.cmp(&b.id));

    let emitters = collect_emitters(world);
    for scan in scans {
        if scan.range <= 0.0 {
            continue;
        }
        let mut detections: Vec<Detection> = Vec::new();
        for emitter in &emitters {
            if emitter.id == scan.id {
                continue;
            }
            let distance = emitter.kinematics.position.distance(scan.own.position);
            if distance > scan.range {
                continue;
            }
            let accuracy = detection_accuracy(distance, scan.range, emitter.signature);
            if !scan.free_look && rng.gen::<f64>() >= accuracy {
                continue;
            }
            detections.push(observe(
                emitter,
                scan.own.position,
                accuracy,
                DetectionMethod::Passive,
                rng,
            ));
        }

        if let Ok(mut tracker) = world.get::<&mut ContactTracker>(scan.entity) {
            for detection in &detections {
                tracker.ingest(&scan.id, &scan.own, &scan.attitude, detection, now, events);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_weights() {
        assert!((detection_accuracy(0.0, 50_000.0, 2.0) - 1.0).abs() < 1e-12);
        assert!((detection_accuracy(25_000.0, 50_000.0, 1.0) - 0.5).abs() < 1e-12);
        assert!((detection_accuracy(50_000.0, 50_000.0, 0.0)).abs() < 1e-12);
        assert_eq!(detection_accuracy(10.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_scan_schedule() {
        let sensor = PassiveSensor::from_config(&PassiveSensorConfig::default());
        assert!(sensor.is_due(0));
        assert!(!sensor.is_due(5));
        assert!(sensor.is_due(DEFAULT_SCAN_INTERVAL_TICKS as u64 * 3));
    }
}
