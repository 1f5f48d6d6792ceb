//! End-to-end scenarios driven only through the public simulator API.

use glam::DVec3;

use bridgesim_sim::core::commands::{AutopilotRequest, CommandOutcome, ShipCommand, TargetRef};
use bridgesim_sim::core::config::{ShipConfig, SimConfig, WeaponConfig};
use bridgesim_sim::core::constants::*;
use bridgesim_sim::core::enums::{AutopilotKind, ControlMode};
use bridgesim_sim::core::events::{EventKind, SimEvent};
use bridgesim_sim::core::types::ShipId;
use bridgesim_sim::Simulator;

fn id(name: &str) -> ShipId {
    ShipId::new(name)
}

fn engage(sim: &mut Simulator, ship: &str, request: AutopilotRequest) {
    let outcome = sim.command(&id(ship), ShipCommand::EngageAutopilot { request });
    assert_eq!(outcome, Ok(CommandOutcome::Applied));
}

#[test]
fn goto_with_stop_ends_in_hold() {
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    sim.spawn_ship(ShipConfig::new("alpha")).unwrap();
    let target = DVec3::new(0.0, 5_000.0, 0.0);
    engage(
        &mut sim,
        "alpha",
        AutopilotRequest::GoToPosition {
            target,
            stop_at_target: true,
            arrival_tolerance: None,
            arrival_speed_tolerance: None,
            cruise_speed: None,
        },
    );

    let mut phases = Vec::new();
    for _ in 0..(200 * TICK_RATE) {
        let snapshot = sim.tick();
        let nav = &snapshot.ships[0].navigation;
        let phase = nav.autopilot.as_ref().map(|a| a.phase.clone()).unwrap_or_default();
        if phases.last() != Some(&phase) {
            phases.push(phase);
        }
    }

    assert_eq!(phases.last().map(String::as_str), Some("HOLD"), "phases {phases:?}");
    assert!(phases.iter().any(|p| p == "BRAKE"), "phases {phases:?}");
    let view = sim.ship_state(&id("alpha")).unwrap();
    assert!((view.position - target).length() <= GOTO_ARRIVAL_TOLERANCE);
    assert!(view.speed <= GOTO_ARRIVAL_SPEED_TOLERANCE, "speed {}", view.speed);
    assert_eq!(view.navigation.mode, ControlMode::Autopilot);
}

#[test]
fn goto_without_stop_completes_and_hands_back_control() {
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    sim.spawn_ship(ShipConfig::new("alpha")).unwrap();
    let rx = sim.subscribe(&[EventKind::AutopilotComplete]);
    engage(
        &mut sim,
        "alpha",
        AutopilotRequest::GoToPosition {
            target: DVec3::new(2_000.0, -1_000.0, 500.0),
            stop_at_target: false,
            arrival_tolerance: None,
            arrival_speed_tolerance: None,
            cruise_speed: Some(200.0),
        },
    );

    let mut completed = None;
    for _ in 0..(200 * TICK_RATE) {
        let snapshot = sim.tick();
        if let Some(event) = snapshot
            .events
            .iter()
            .find(|e| matches!(e, SimEvent::AutopilotComplete { .. }))
        {
            completed = Some(event.clone());
            break;
        }
    }

    assert!(
        matches!(
            completed,
            Some(SimEvent::AutopilotComplete {
                program: AutopilotKind::GoToPosition,
                ..
            })
        ),
        "go-to never completed"
    );
    assert!(rx.try_recv().is_ok(), "subscribers see the same event");
    let view = sim.ship_state(&id("alpha")).unwrap();
    assert_eq!(view.navigation.mode, ControlMode::Manual);
    assert_eq!(view.throttle, 0.0);
}

#[test]
fn intercept_closes_and_matches_velocity() {
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    sim.spawn_ship(ShipConfig::new("alpha")).unwrap();
    sim.spawn_ship(
        ShipConfig::new("bravo")
            .with_position(DVec3::new(30_000.0, 0.0, 0.0))
            .with_velocity(DVec3::new(100.0, 50.0, 0.0)),
    )
    .unwrap();
    engage(
        &mut sim,
        "alpha",
        AutopilotRequest::Intercept {
            target: TargetRef::Ship(id("bravo")),
        },
    );

    for _ in 0..(400 * TICK_RATE) {
        sim.tick();
    }

    let alpha = sim.ship_state(&id("alpha")).unwrap();
    let bravo = sim.ship_state(&id("bravo")).unwrap();
    let autopilot = alpha.navigation.autopilot.unwrap();
    assert_eq!(autopilot.phase, "MATCH");
    let range = (bravo.position - alpha.position).length();
    let delta_v = (bravo.velocity - alpha.velocity).length();
    assert!(range <= INTERCEPT_MATCH_RANGE, "range {range}");
    assert!(delta_v < MATCH_VELOCITY_TOLERANCE, "delta v {delta_v}");
}

#[test]
fn intercept_by_contact_closes_range() {
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    sim.spawn_ship(ShipConfig::new("alpha")).unwrap();
    sim.spawn_ship(
        ShipConfig::new("bravo")
            .with_position(DVec3::new(20_000.0, 5_000.0, 0.0))
            .with_velocity(DVec3::new(0.0, 30.0, 0.0)),
    )
    .unwrap();
    // First passive scan assigns the contact id.
    sim.tick();
    engage(
        &mut sim,
        "alpha",
        AutopilotRequest::Intercept {
            target: TargetRef::Contact("C-001".into()),
        },
    );

    for _ in 0..(120 * TICK_RATE) {
        sim.tick();
    }
    let alpha = sim.ship_state(&id("alpha")).unwrap();
    let bravo = sim.ship_state(&id("bravo")).unwrap();
    let range = (bravo.position - alpha.position).length();
    assert!(range < 10_000.0, "range {range} should have closed");
    assert_eq!(
        alpha.navigation.autopilot.map(|a| a.target),
        Some(Some("C-001".to_string()))
    );
}

#[test]
fn formation_holds_slot_on_moving_flagship() {
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    sim.spawn_ship(ShipConfig::new("flag").with_velocity(DVec3::new(50.0, 0.0, 0.0)))
        .unwrap();
    sim.spawn_ship(ShipConfig::new("wing").with_position(DVec3::new(-500.0, 300.0, 0.0)))
        .unwrap();
    let offset = DVec3::new(-200.0, 200.0, 0.0);
    engage(
        &mut sim,
        "wing",
        AutopilotRequest::Formation {
            flagship: id("flag"),
            offset,
            echelon: false,
            match_velocity: true,
            wingmen: vec![],
        },
    );

    for _ in 0..(120 * TICK_RATE) {
        sim.tick();
    }
    let flag = sim.ship_state(&id("flag")).unwrap();
    let wing = sim.ship_state(&id("wing")).unwrap();
    let slot_error = (flag.position + offset - wing.position).length();
    let delta_v = (flag.velocity - wing.velocity).length();
    assert!(slot_error < 20.0, "slot error {slot_error}");
    assert!(delta_v < 2.0, "delta v {delta_v}");
    assert_eq!(wing.navigation.autopilot.unwrap().phase, "STATION");
}

#[test]
fn sustained_fire_overheats_weapons() {
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    let railgun = WeaponConfig {
        cooldown_secs: 0.0,
        heat_per_shot: 31.0,
        power_per_shot: 0.0,
        ..Default::default()
    };
    sim.spawn_ship(ShipConfig::new("alpha").with_weapon(railgun))
        .unwrap();
    sim.spawn_ship(ShipConfig::new("bravo").with_position(DVec3::new(5_000.0, 0.0, 0.0)))
        .unwrap();
    let rx = sim.subscribe(&[EventKind::SubsystemOverheat, EventKind::WeaponFired]);

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        outcomes.push(
            sim.command(
                &id("alpha"),
                ShipCommand::FireWeapon {
                    weapon: "railgun-1".into(),
                    target: Some(TargetRef::Ship(id("bravo"))),
                },
            )
            .unwrap(),
        );
        sim.tick();
    }

    // Three shots pass 90% heat; the weapon refuses from then on.
    let fired = outcomes
        .iter()
        .filter(|o| matches!(o, CommandOutcome::Fired { .. }))
        .count();
    assert_eq!(fired, 3, "outcomes {outcomes:?}");
    assert!(matches!(
        outcomes.last(),
        Some(CommandOutcome::NotReady { reason }) if reason == "weapon overheated"
    ));

    let events: Vec<SimEvent> = rx.try_iter().collect();
    let overheats = events
        .iter()
        .filter(|e| {
            matches!(e, SimEvent::SubsystemOverheat { subsystem, .. } if subsystem == WEAPONS)
        })
        .count();
    assert_eq!(overheats, 1, "overheat is edge-triggered");
}

#[test]
fn destroyed_ship_reports_once() {
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    let railgun = WeaponConfig {
        base_accuracy: 1.0,
        cooldown_secs: 0.0,
        heat_per_shot: 0.0,
        power_per_shot: 0.0,
        damage: 400.0,
        ..Default::default()
    };
    sim.spawn_ship(ShipConfig::new("alpha").with_weapon(railgun))
        .unwrap();
    sim.spawn_ship(ShipConfig::new("bravo").with_position(DVec3::new(500.0, 0.0, 0.0)))
        .unwrap();
    let rx = sim.subscribe(&[EventKind::ShipDestroyed]);

    for _ in 0..10 {
        let _ = sim.command(
            &id("alpha"),
            ShipCommand::FireWeapon {
                weapon: "railgun-1".into(),
                target: Some(TargetRef::Ship(id("bravo"))),
            },
        );
        sim.tick();
    }

    let destroyed: Vec<SimEvent> = rx.try_iter().collect();
    assert_eq!(destroyed.len(), 1);
    let bravo = sim.ship_state(&id("bravo")).unwrap();
    assert!(bravo.damage.destroyed);
    assert_eq!(bravo.damage.hull, 0.0);
}
