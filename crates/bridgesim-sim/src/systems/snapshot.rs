//! Snapshot system: queries the ECS world and builds a complete SimSnapshot.
//!
//! This system is read-only. It never modifies the world.

use std::collections::BTreeMap;

use hecs::{Entity, World};

use bridgesim_autopilot::NavigationController;
use bridgesim_core::components::ShipState;
use bridgesim_core::constants::*;
use bridgesim_core::events::SimEvent;
use bridgesim_core::state::*;
use bridgesim_core::types::{Kinematics, ShipId, SimTime};

use crate::systems::damage::DamageModel;
use crate::systems::power::PowerGrid;
use crate::systems::sensors::active::ActiveSensor;
use crate::systems::sensors::passive::PassiveSensor;
use crate::systems::sensors::tracker::ContactTracker;
use crate::systems::weapons::WeaponBay;

/// Build a complete SimSnapshot from the current world state.
pub fn build_snapshot(
    world: &World,
    index: &BTreeMap<ShipId, Entity>,
    time: &SimTime,
    events: Vec<SimEvent>,
) -> SimSnapshot {
    SimSnapshot {
        time: *time,
        ships: index
            .values()
            .filter_map(|&entity| build_ship(world, entity, time.elapsed_secs))
            .collect(),
        events,
    }
}

/// View of one ship, or `None` if the entity is not a ship.
pub fn build_ship(world: &World, entity: Entity, now: f64) -> Option<ShipView> {
    let ship = world.get::<&ShipState>(entity).ok()?;
    let damage = world.get::<&DamageModel>(entity).ok()?;
    let own = Kinematics::new(ship.position, ship.velocity);

    let navigation = world
        .get::<&NavigationController>(entity)
        .map(|nav| nav.view(now))
        .unwrap_or_default();

    Some(ShipView {
        id: ship.id.clone(),
        ship_class: ship.ship_class.clone(),
        position: ship.position,
        velocity: ship.velocity,
        speed: ship.velocity.length(),
        orientation: ship.orientation,
        angular_velocity: ship.angular_velocity,
        acceleration: ship.acceleration,
        g_force: ship.acceleration.length() / STANDARD_GRAVITY,
        throttle: ship.throttle(),
        gimbal_level: ship.gimbal_level,
        needs_recovery: ship.needs_recovery,
        navigation,
        damage: damage.view(),
        sensors: build_sensors(world, entity, &own, damage.factor(SENSORS), now),
        weapons: world
            .get::<&WeaponBay>(entity)
            .map(|bay| bay.weapons.iter().map(|w| w.view(now)).collect())
            .unwrap_or_default(),
        power: world.get::<&PowerGrid>(entity).ok().map(|g| g.view()),
    })
}

fn build_sensors(
    world: &World,
    entity: Entity,
    own: &Kinematics,
    sensors_factor: f64,
    now: f64,
) -> Option<SensorView> {
    let tracker = world.get::<&ContactTracker>(entity).ok()?;
    let passive = world.get::<&PassiveSensor>(entity).ok();
    let active = world.get::<&ActiveSensor>(entity).ok();
    Some(SensorView {
        passive_range: passive.as_ref().map(|p| p.range),
        effective_range: passive
            .as_ref()
            .map_or(0.0, |p| p.effective_range(sensors_factor)),
        active_fitted: active.is_some(),
        active_cooldown_remaining: active.as_ref().map_or(0.0, |a| a.cooldown_remaining(now)),
        contacts: tracker.view(own, now),
    })
}
