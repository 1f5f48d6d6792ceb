//! Active sensor pings.
//!
//! A ping is a manual action: it resolves everything within range at high
//! accuracy, but every ship listening passively within twice that range
//! learns exactly where the pinging ship is.

use hecs::{Entity, World};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use bridgesim_core::commands::CommandOutcome;
use bridgesim_core::components::ShipState;
use bridgesim_core::config::ActiveSensorConfig;
use bridgesim_core::constants::*;
use bridgesim_core::enums::DetectionMethod;
use bridgesim_core::error::CommandError;
use bridgesim_core::events::{EventBus, SimEvent};
use bridgesim_core::types::{Attitude, Kinematics, ShipId};

use crate::systems::damage::DamageModel;
use crate::systems::power::PowerGrid;
use crate::systems::sensors::passive::PassiveSensor;
use crate::systems::sensors::tracker::ContactTracker;
use crate::systems::sensors::{collect_emitters, observe};

#[derive(Debug, Clone)]
pub struct ActiveSensor {
    pub range: f64,
    pub cooldown_secs: f64,
    pub power_cost: f64,
    pub last_ping: Option<f64>,
}

impl ActiveSensor {
    pub fn from_config(config: &ActiveSensorConfig) -> Self {
        Self {
            range: config.range,
            cooldown_secs: config.cooldown_secs,
            power_cost: config.power_cost,
            last_ping: None,
        }
    }

    pub fn cooldown_remaining(&self, now: f64) -> f64 {
        self.last_ping
            .map_or(0.0, |t| (t + self.cooldown_secs - now).max(0.0))
    }
}

/// Accuracy of an active return at `distance`.
pub fn active_accuracy(distance: f64, range: f64) -> f64 {
    (ACTIVE_ACCURACY_BASE - ACTIVE_ACCURACY_FALLOFF * distance / range).clamp(0.0, 1.0)
}

/// Fire `pinger`'s active sensor.
///
/// Checks run in order: sensor fitted, sensors subsystem working, cooldown,
/// power. Only the first is an error; the rest report `NotReady`.
pub fn ping(
    world: &mut World,
    rng: &mut ChaCha8Rng,
    pinger: Entity,
    ship_id: &ShipId,
    now: f64,
    events: &mut EventBus,
) -> Result<CommandOutcome, CommandError> {
    let (id, own, attitude) = {
        let ship = world
            .get::<&ShipState>(pinger)
            .map_err(|_| CommandError::UnknownShip(ship_id.clone()))?;
        (
            ship.id.clone(),
            Kinematics::new(ship.position, ship.velocity),
            ship.orientation,
        )
    };

    let (range, cooldown, cost) = match world.get::<&ActiveSensor>(pinger) {
        Ok(sensor) => (sensor.range, sensor.cooldown_remaining(now), sensor.power_cost),
        Err(_) => {
            return Err(CommandError::SystemUnavailable {
                ship: id,
                system: "active sensor",
            })
        }
    };

    let factor = world
        .get::<&DamageModel>(pinger)
        .map_or(1.0, |d| d.factor(SENSORS));
    if factor <= 0.0 {
        return Ok(not_ready("sensors offline"));
    }
    if cooldown > 0.0 {
        return Ok(not_ready(&format!("active sensor recharging ({cooldown:.1} s)")));
    }
    if let Ok(mut grid) = world.get::<&mut PowerGrid>(pinger) {
        if !grid.try_draw(cost) {
            return Ok(not_ready("insufficient power"));
        }
    }
    if let Ok(mut sensor) = world.get::<&mut ActiveSensor>(pinger) {
        sensor.last_ping = Some(now);
    }

    let range = range * factor;
    info!(ship = %id, range, sim_time = now, "active ping");
    events.publish(SimEvent::SensorPing {
        ship_id: id.clone(),
        position: own.position,
        range,
        sim_time: now,
    });

    let emitters = collect_emitters(world);

    // Returns for the pinging ship.
    let mut returns = Vec::new();
    for emitter in emitters.iter().filter(|e| e.id != id) {
        let distance = emitter.kinematics.position.distance(own.position);
        if distance <= range {
            let accuracy = active_accuracy(distance, range);
            returns.push(observe(emitter, own.position, accuracy, DetectionMethod::Active, rng));
        }
    }
    if let Ok(mut tracker) = world.get::<&mut ContactTracker>(pinger) {
        for detection in &returns {
            tracker.ingest(&id, &own, &attitude, detection, now, events);
        }
    }

    // Everyone listening hears the ping.
    let Some(source) = emitters.iter().find(|e| e.id == id) else {
        return Ok(CommandOutcome::Applied);
    };
    let mut listeners: Vec<(Entity, ShipId, Kinematics, Attitude)> = world
        .query::<(&ShipState, &PassiveSensor, Option<&DamageModel>)>()
        .iter()
        .filter(|(entity, (ship, _, damage))| {
            *entity != pinger
                && damage.map_or(true, |d| d.factor(SENSORS) > 0.0)
                && ship.position.distance(own.position) <= PING_DETECTION_RANGE_FACTOR * range
        })
        .map(|(entity, (ship, _, _))| {
            (
                entity,
                ship.id.clone(),
                Kinematics::new(ship.position, ship.velocity),
                ship.orientation,
            )
        })
        .collect();
    listeners.sort_by(|a, b| a.1.cmp(&b.1));

    for (entity, listener, kinematics, listener_attitude) in listeners {
        let detection = observe(
            source,
            kinematics.position,
            PING_CONTACT_ACCURACY,
            DetectionMethod::Passive,
            rng,
        );
        if let Ok(mut tracker) = world.get::<&mut ContactTracker>(entity) {
            debug!(listener = %listener, source = %id, "ping heard");
            tracker.ingest(&listener, &kinematics, &listener_attitude, &detection, now, events);
        }
    }

    Ok(CommandOutcome::Applied)
}

fn not_ready(reason: &str) -> CommandOutcome {
    CommandOutcome::NotReady {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_accuracy_falloff() {
        assert!((active_accuracy(0.0, 100_000.0) - 0.95).abs() < 1e-12);
        assert!((active_accuracy(100_000.0, 100_000.0) - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_cooldown_uses_sim_time() {
        let mut sensor = ActiveSensor::from_config(&ActiveSensorConfig::default());
        assert_eq!(sensor.cooldown_remaining(0.0), 0.0);
        sensor.last_ping = Some(5.0);
        assert!((sensor.cooldown_remaining(8.0) - 7.0).abs() < 1e-12);
        assert_eq!(sensor.cooldown_remaining(15.0), 0.0);
    }
}
