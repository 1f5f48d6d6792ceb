//! Navigation system: runs each ship's controller and applies its output.
//!
//! Contexts are gathered in a read-only pass first (targets, flagships and
//! wingmen live on other entities), then each controller is stepped and its
//! command written back to the ship.

use std::collections::BTreeMap;

use glam::DVec3;
use hecs::{Entity, World};

use bridgesim_autopilot::{
    AutopilotContext, AutopilotProgram, FlagshipState, NavigationController, NavigationResult,
};
use bridgesim_core::commands::TargetRef;
use bridgesim_core::components::ShipState;
use bridgesim_core::constants::*;
use bridgesim_core::events::{EventBus, SimEvent};
use bridgesim_core::math::{heading_to_quat, normalize_attitude, quat_to_attitude};
use bridgesim_core::types::{AxisRates, Heading, Kinematics, ShipId};

use crate::systems::damage::DamageModel;
use crate::systems::sensors::tracker::ContactTracker;

fn kinematics_of(world: &World, entity: Entity) -> Option<Kinematics> {
    let ship = world.get::<&ShipState>(entity).ok()?;
    Some(Kinematics::new(ship.position, ship.velocity))
}

/// Where the program's target is believed to be.
///
/// Contacts resolve through the ship's own tracker (dead-reckoned), so an
/// autopilot chasing a contact sees what the crew sees.
fn resolve_program_target(
    world: &World,
    index: &BTreeMap<ShipId, Entity>,
    entity: Entity,
    target: &TargetRef,
    now: f64,
) -> Option<Kinematics> {
    match target {
        TargetRef::Contact(contact) => world
            .get::<&ContactTracker>(entity)
            .ok()?
            .estimate(contact, now),
        TargetRef::Ship(id) => index
            .get(id)
            .filter(|&&e| e != entity)
            .and_then(|&e| kinematics_of(world, e)),
    }
}

/// Everything one ship's program needs this tick.
pub fn build_context(
    world: &World,
    index: &BTreeMap<ShipId, Entity>,
    entity: Entity,
    program: &AutopilotProgram,
    now: f64,
) -> Option<AutopilotContext> {
    let ship = world.get::<&ShipState>(entity).ok()?;
    let propulsion = world
        .get::<&DamageModel>(entity)
        .map_or(1.0, |d| d.factor(PROPULSION));
    let max_accel = if ship.mass > 0.0 {
        ship.max_thrust * propulsion / ship.mass
    } else {
        0.0
    };

    let target = program
        .target_ref()
        .and_then(|t| resolve_program_target(world, index, entity, t, now));

    let flagship = program
        .flagship()
        .and_then(|id| index.get(id))
        .filter(|&&e| e != entity)
        .and_then(|&e| {
            let flag = world.get::<&ShipState>(e).ok()?;
            Some(FlagshipState {
                kinematics: Kinematics::new(flag.position, flag.velocity),
                yaw: flag.orientation.yaw,
            })
        });

    let neighbors: Vec<DVec3> = program
        .wingmen()
        .iter()
        .filter_map(|id| index.get(id))
        .filter(|&&e| e != entity)
        .filter_map(|&e| kinematics_of(world, e).map(|k| k.position))
        .collect();

    Some(AutopilotContext {
        own: Kinematics::new(ship.position, ship.velocity),
        heading: Heading::new(ship.orientation.pitch, ship.orientation.yaw),
        max_accel,
        target,
        flagship,
        neighbors,
    })
}

/// Write an autopilot command into the ship.
///
/// Thrust is always commanded along the nose. The heading is only taken when
/// maneuvering can still turn the ship; roll is preserved.
pub fn apply_output(ship: &mut ShipState, thrust: f64, heading: &Heading, maneuvering: f64) {
    ship.thrust = DVec3::X * thrust * ship.max_thrust;
    if maneuvering > 0.0 {
        ship.rotation = heading_to_quat(heading, ship.orientation.roll);
        ship.orientation = normalize_attitude(quat_to_attitude(ship.rotation));
        ship.angular_velocity = AxisRates::default();
        ship.angular_acceleration = AxisRates::default();
    }
}

pub fn run(
    world: &mut World,
    index: &BTreeMap<ShipId, Entity>,
    dt: f64,
    now: f64,
    events: &mut EventBus,
) {
    let mut contexts: Vec<(Entity, ShipId, AutopilotContext)> = Vec::new();
    for (id, &entity) in index {
        let Ok(nav) = world.get::<&NavigationController>(entity) else {
            continue;
        };
        let context = nav
            .program()
            .and_then(|p| build_context(world, index, entity, p, now))
            .unwrap_or_default();
        contexts.push((entity, id.clone(), context));
    }

    for (entity, ship_id, context) in contexts {
        let result = match world.get::<&mut NavigationController>(entity) {
            Ok(mut nav) => nav.update(&context, dt, now),
            Err(_) => continue,
        };
        let maneuvering = world
            .get::<&DamageModel>(entity)
            .map_or(1.0, |d| d.factor(MANEUVERING));
        let Ok(mut ship) = world.get::<&mut ShipState>(entity) else {
            continue;
        };

        match result {
            NavigationResult::Idle => {}
            NavigationResult::Command(output) => {
                apply_output(&mut ship, output.thrust, &output.heading, maneuvering);
            }
            NavigationResult::Completed(program) => {
                ship.thrust = DVec3::ZERO;
                events.publish(SimEvent::AutopilotComplete { ship_id, program });
            }
            NavigationResult::Failed { error, .. } => {
                ship.thrust = DVec3::ZERO;
                events.publish(SimEvent::AutopilotDisengaged {
                    ship_id,
                    reason: error.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bridgesim_core::commands::AutopilotRequest;
    use bridgesim_core::config::{AutopilotGains, ShipConfig};
    use bridgesim_core::enums::ControlMode;
    use bridgesim_core::events::EventKind;
    use bridgesim_core::math::heading_to_vector;

    use super::*;
    use crate::world_setup::spawn_ship;

    fn world_with(configs: &[ShipConfig]) -> (World, BTreeMap<ShipId, Entity>) {
        let mut world = World::new();
        let mut index = BTreeMap::new();
        for config in configs {
            let entity = spawn_ship(&mut world, config);
            index.insert(config.id.clone(), entity);
        }
        (world, index)
    }

    fn engage(world: &mut World, entity: Entity, request: AutopilotRequest) {
        let own = kinematics_of(world, entity).unwrap();
        let program =
            AutopilotProgram::from_request(&request, &AutopilotGains::default(), &own).unwrap();
        world
            .get::<&mut NavigationController>(entity)
            .unwrap()
            .engage(program);
    }

    #[test]
    fn test_goto_points_ship_and_thrusts() {
        let (mut world, index) = world_with(&[ShipConfig::new("alpha")]);
        let alpha = index[&ShipId::new("alpha")];
        engage(
            &mut world,
            alpha,
            AutopilotRequest::GoToPosition {
                target: DVec3::new(0.0, 20_000.0, 0.0),
                stop_at_target: true,
                arrival_tolerance: None,
                arrival_speed_tolerance: None,
                cruise_speed: None,
            },
        );
        let mut events = EventBus::new();
        run(&mut world, &index, DT, 0.0, &mut events);

        let ship = world.get::<&ShipState>(alpha).unwrap();
        assert!(ship.thrust.x > 0.0);
        let nose = heading_to_vector(&Heading::new(ship.orientation.pitch, ship.orientation.yaw));
        assert!(nose.dot(DVec3::Y) > 0.99, "nose {nose:?} should face +Y");
    }

    #[test]
    fn test_lost_target_disengages() {
        let (mut world, index) = world_with(&[ShipConfig::new("alpha")]);
        let alpha = index[&ShipId::new("alpha")];
        engage(
            &mut world,
            alpha,
            AutopilotRequest::Intercept {
                target: TargetRef::Contact("C-404".into()),
            },
        );
        let mut events = EventBus::new();
        let rx = events.subscribe(&[EventKind::AutopilotDisengaged]);
        run(&mut world, &index, DT, 0.0, &mut events);

        let nav = world.get::<&NavigationController>(alpha).unwrap();
        assert_eq!(nav.mode(), ControlMode::Manual);
        assert!(nav.program().is_none());
        assert!(matches!(rx.try_recv(), Ok(SimEvent::AutopilotDisengaged { .. })));
    }

    #[test]
    fn test_formation_sees_flagship() {
        let flag = ShipConfig::new("flag").with_velocity(DVec3::new(50.0, 0.0, 0.0));
        let wing = ShipConfig::new("wing").with_position(DVec3::new(-500.0, 300.0, 0.0));
        let (mut world, index) = world_with(&[flag, wing]);
        let wing = index[&ShipId::new("wing")];
        engage(
            &mut world,
            wing,
            AutopilotRequest::Formation {
                flagship: ShipId::new("flag"),
                offset: DVec3::new(-200.0, 200.0, 0.0),
                echelon: false,
                match_velocity: true,
                wingmen: vec![],
            },
        );
        let nav = world.get::<&NavigationController>(wing).unwrap();
        let ctx = build_context(&world, &index, wing, nav.program().unwrap(), 0.0).unwrap();
        let flagship = ctx.flagship.unwrap();
        assert_eq!(flagship.kinematics.velocity, DVec3::new(50.0, 0.0, 0.0));
    }

    #[test]
    fn test_maneuvering_offline_keeps_attitude() {
        let mut ship = crate::world_setup::ship_state_from_config(&ShipConfig::new("alpha"));
        apply_output(&mut ship, 0.5, &Heading::new(0.0, 90.0), 0.0);
        assert!(ship.orientation.yaw.abs() < 1e-9);
        assert!((ship.thrust.x - 0.5 * ship.max_thrust).abs() < 1e-6);
    }
}
