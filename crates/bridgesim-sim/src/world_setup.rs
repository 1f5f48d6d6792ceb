//! Entity spawn factories for setting up the simulation world.
//!
//! Every ship gets a kinematic state, a damage model and a navigation
//! controller. Sensors, weapons and the power grid are attached only when
//! the config fits them, so commands to a missing system fail cleanly.

use glam::DVec3;
use hecs::{Entity, EntityBuilder, World};
use tracing::info;

use bridgesim_autopilot::NavigationController;
use bridgesim_core::components::ShipState;
use bridgesim_core::config::ShipConfig;
use bridgesim_core::enums::GimbalLockLevel;
use bridgesim_core::math::{attitude_to_quat, normalize_attitude, quat_to_attitude};
use bridgesim_core::types::{AxisRates, Heading};

use crate::systems::damage::DamageModel;
use crate::systems::power::PowerGrid;
use crate::systems::sensors::active::ActiveSensor;
use crate::systems::sensors::passive::PassiveSensor;
use crate::systems::sensors::tracker::ContactTracker;
use crate::systems::weapons::WeaponBay;

/// Initial kinematic record for a validated config.
pub fn ship_state_from_config(config: &ShipConfig) -> ShipState {
    let rotation = attitude_to_quat(&normalize_attitude(config.orientation));
    let orientation = normalize_attitude(quat_to_attitude(rotation));
    ShipState {
        id: config.id.clone(),
        ship_class: config.ship_class.clone(),
        size_class: config.size_class(),
        position: config.position,
        velocity: config.velocity,
        rotation,
        orientation,
        angular_velocity: AxisRates::default(),
        angular_acceleration: AxisRates::default(),
        mass: config.mass,
        moment_of_inertia: config.moment_of_inertia(),
        thrust: DVec3::ZERO,
        max_thrust: config.max_thrust,
        acceleration: DVec3::ZERO,
        signature: config.signature,
        // A ship spawned near vertical reports its band on the first tick.
        gimbal_level: GimbalLockLevel::Clear,
        needs_recovery: false,
        recovery_count: 0,
    }
}

/// Spawn one ship with the component bundle its config describes.
pub fn spawn_ship(world: &mut World, config: &ShipConfig) -> Entity {
    let state = ship_state_from_config(config);
    let nose = Heading::new(state.orientation.pitch, state.orientation.yaw);

    let mut builder = EntityBuilder::new();
    builder.add(state);
    builder.add(DamageModel::from_config(config));
    builder.add(NavigationController::new(config.autopilot.manual_override_timeout));
    builder.add(config.autopilot.clone());

    if let Some(passive) = &config.passive_sensor {
        builder.add(PassiveSensor::from_config(passive));
    }
    if let Some(active) = &config.active_sensor {
        builder.add(ActiveSensor::from_config(active));
    }
    if config.passive_sensor.is_some() || config.active_sensor.is_some() {
        builder.add(ContactTracker::new(config.stale_threshold_secs));
    }
    if !config.weapons.is_empty() {
        builder.add(WeaponBay::from_configs(&config.weapons, nose));
    }
    if let Some(power) = &config.power {
        builder.add(PowerGrid::from_config(power));
    }

    let entity = world.spawn(builder.build());
    info!(
        ship = %config.id,
        class = %config.ship_class,
        weapons = config.weapons.len(),
        "ship spawned"
    );
    entity
}

#[cfg(test)]
mod tests {
    use bridgesim_core::config::WeaponConfig;
    use bridgesim_core::types::Attitude;

    use super::*;

    #[test]
    fn test_optional_systems_follow_config() {
        let mut world = World::new();
        let mut bare = ShipConfig::new("bare");
        bare.passive_sensor = None;
        bare.active_sensor = None;
        bare.power = None;
        let bare = spawn_ship(&mut world, &bare);
        assert!(world.get::<&ContactTracker>(bare).is_err());
        assert!(world.get::<&WeaponBay>(bare).is_err());
        assert!(world.get::<&PowerGrid>(bare).is_err());
        assert!(world.get::<&DamageModel>(bare).is_ok());
        assert!(world.get::<&NavigationController>(bare).is_ok());

        let armed = ShipConfig::new("armed").with_weapon(WeaponConfig::default());
        let armed = spawn_ship(&mut world, &armed);
        assert!(world.get::<&ContactTracker>(armed).is_ok());
        assert_eq!(world.get::<&WeaponBay>(armed).unwrap().weapons.len(), 1);
    }

    #[test]
    fn test_turrets_start_along_the_nose() {
        let mut config = ShipConfig::new("alpha").with_weapon(WeaponConfig::default());
        config.orientation = Attitude::new(10.0, 45.0, 0.0);
        let mut world = World::new();
        let entity = spawn_ship(&mut world, &config);
        let bay = world.get::<&WeaponBay>(entity).unwrap();
        let turret = bay.weapons[0].turret;
        assert!((turret.pitch - 10.0).abs() < 1e-6);
        assert!((turret.yaw - 45.0).abs() < 1e-6);
    }

    #[test]
    fn test_orientation_is_normalized_at_spawn() {
        let mut config = ShipConfig::new("alpha");
        config.orientation = Attitude::new(0.0, 270.0, 0.0);
        let state = ship_state_from_config(&config);
        assert!((state.orientation.yaw + 90.0).abs() < 1e-6);
        assert_eq!(state.moment_of_inertia, config.mass * 10.0);
    }
}
