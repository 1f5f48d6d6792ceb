//! Fire control: firing solutions, turret slewing, and weapon release.
//!
//! Solutions are recomputed every tick for each weapon with a target.
//! Shots resolve at release (no projectile entities): the hit roll uses the
//! solution's hit probability and damage lands immediately.

use std::collections::BTreeMap;

use glam::{DQuat, DVec3};
use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use bridgesim_core::commands::{CommandOutcome, TargetRef};
use bridgesim_core::components::{FiringSolution, ShipState};
use bridgesim_core::config::WeaponConfig;
use bridgesim_core::constants::*;
use bridgesim_core::error::CommandError;
use bridgesim_core::events::{EventBus, SimEvent};
use bridgesim_core::math::{angle_between, heading_to_vector, vector_to_heading};
use bridgesim_core::relative::{lateral_speed, solve_intercept_time};
use bridgesim_core::state::WeaponView;
use bridgesim_core::types::{Heading, Kinematics, ShipId};

use crate::systems::damage::DamageModel;
use crate::systems::power::PowerGrid;
use crate::systems::sensors::tracker::ContactTracker;

#[derive(Debug, Clone)]
pub struct Weapon {
    pub config: WeaponConfig,
    pub enabled: bool,
    pub ammo: u32,
    pub last_fired: Option<f64>,
    /// World heading the turret currently points along.
    pub turret: Heading,
    pub target: Option<TargetRef>,
    pub solution: Option<FiringSolution>,
}

impl Weapon {
    pub fn from_config(config: &WeaponConfig, initial_heading: Heading) -> Self {
        Self {
            config: config.clone(),
            enabled: true,
            ammo: config.ammo,
            last_fired: None,
            turret: initial_heading,
            target: None,
            solution: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn cooldown_remaining(&self, now: f64) -> f64 {
        self.last_fired
            .map_or(0.0, |t| (t + self.config.cooldown_secs - now).max(0.0))
    }

    /// Change target. The old solution no longer applies.
    pub fn set_target(&mut self, target: Option<TargetRef>) {
        if self.target != target {
            self.solution = None;
        }
        self.target = target;
    }

    /// Turn the turret toward `aim` by at most one tick of slew.
    pub fn slew_toward(&mut self, aim: DVec3, dt: f64) {
        let current = heading_to_vector(&self.turret);
        let next = slew(current, aim, self.config.slew_rate * dt);
        if let Some(heading) = vector_to_heading(next) {
            self.turret = heading;
        }
    }

    pub fn view(&self, now: f64) -> WeaponView {
        WeaponView {
            id: self.config.id.clone(),
            kind: self.config.kind,
            enabled: self.enabled,
            ammo: self.ammo,
            cooldown_remaining: self.cooldown_remaining(now),
            turret: self.turret,
            target: self.target.as_ref().map(|t| t.label().to_string()),
            solution: self.solution.clone(),
        }
    }
}

/// All weapons on one ship.
#[derive(Debug, Clone, Default)]
pub struct WeaponBay {
    pub weapons: Vec<Weapon>,
}

impl WeaponBay {
    pub fn from_configs(configs: &[WeaponConfig], initial_heading: Heading) -> Self {
        Self {
            weapons: configs
                .iter()
                .map(|c| Weapon::from_config(c, initial_heading))
                .collect(),
        }
    }

    pub fn weapon(&self, id: &str) -> Option<&Weapon> {
        self.weapons.iter().find(|w| w.id() == id)
    }

    pub fn weapon_mut(&mut self, id: &str) -> Option<&mut Weapon> {
        self.weapons.iter_mut().find(|w| w.id() == id)
    }
}

/// Rotate `current` toward `desired` by at most `max_step` degrees.
pub fn slew(current: DVec3, desired: DVec3, max_step: f64) -> DVec3 {
    let (Some(from), Some(to)) = (current.try_normalize(), desired.try_normalize()) else {
        return current;
    };
    if angle_between(from, to) <= max_step {
        return to;
    }
    let (axis, _) = DQuat::from_rotation_arc(from, to).to_axis_angle();
    DQuat::from_axis_angle(axis, max_step.to_radians()) * from
}

pub fn hit_probability(
    base_accuracy: f64,
    range: f64,
    max_range: f64,
    lateral: f64,
    weapons_factor: f64,
) -> f64 {
    if range > max_range {
        return 0.0;
    }
    let range_falloff = (1.0 - (range / max_range).powi(2)).max(0.0);
    let lateral_penalty = (1.0 - lateral / LATERAL_SPEED_REFERENCE).max(LATERAL_PENALTY_FLOOR);
    (base_accuracy * range_falloff * lateral_penalty * weapons_factor).clamp(0.0, 1.0)
}

/// Ship-side state that gates a weapon, gathered before the solution.
#[derive(Debug, Clone, Copy)]
pub struct MountStatus {
    pub functional: bool,
    pub weapons_factor: f64,
    pub heat_fraction: f64,
    pub power_available: bool,
    pub now: f64,
}

impl MountStatus {
    fn read(world: &World, entity: Entity, weapon: &WeaponConfig, now: f64) -> Self {
        let (functional, weapons_factor, heat_fraction) = match world.get::<&DamageModel>(entity) {
            Ok(d) => (
                d.is_functional(&weapon.subsystem),
                d.factor(&weapon.subsystem),
                d.heat_fraction(&weapon.subsystem),
            ),
            Err(_) => (true, 1.0, 0.0),
        };
        let power_available = world
            .get::<&PowerGrid>(entity)
            .map_or(true, |g| g.can_draw(weapon.power_per_shot));
        Self {
            functional,
            weapons_factor,
            heat_fraction,
            power_available,
            now,
        }
    }
}

/// Full solution for `weapon` against `target`, with readiness.
pub fn compute_solution(
    weapon: &Weapon,
    shooter: &Kinematics,
    forward: DVec3,
    target: &Kinematics,
    mount: &MountStatus,
) -> FiringSolution {
    let rel_pos = target.position - shooter.position;
    let rel_vel = target.velocity - shooter.velocity;
    let range = rel_pos.length();

    let Some(time_of_flight) = solve_intercept_time(rel_pos, rel_vel, weapon.config.muzzle_speed)
    else {
        return FiringSolution {
            range,
            reason: Some("no firing solution".to_string()),
            ..Default::default()
        };
    };

    let aim_vector = rel_pos + rel_vel * time_of_flight;
    let aim = vector_to_heading(aim_vector).unwrap_or(weapon.turret);
    let in_arc = angle_between(forward, aim_vector) <= weapon.config.arc_half_angle;
    let hit_probability = hit_probability(
        weapon.config.base_accuracy,
        range,
        weapon.config.max_range,
        lateral_speed(rel_pos, rel_vel),
        mount.weapons_factor,
    );
    let turret_error = angle_between(heading_to_vector(&weapon.turret), aim_vector);

    let reason = if !weapon.enabled {
        Some("weapon disabled".to_string())
    } else if !mount.functional {
        Some("weapons offline".to_string())
    } else if range > weapon.config.max_range {
        Some("target out of range".to_string())
    } else if !in_arc {
        Some("target outside firing arc".to_string())
    } else if turret_error > TURRET_ALIGNMENT_TOLERANCE {
        Some(format!("turret slewing ({turret_error:.1}° off)"))
    } else if weapon.cooldown_remaining(mount.now) > 0.0 {
        Some(format!("reloading ({:.1} s)", weapon.cooldown_remaining(mount.now)))
    } else if weapon.ammo == 0 {
        Some("out of ammunition".to_string())
    } else if mount.heat_fraction >= WEAPON_HEAT_LIMIT {
        Some("weapon overheated".to_string())
    } else if !mount.power_available {
        Some("insufficient power".to_string())
    } else {
        None
    };

    FiringSolution {
        range,
        lead_angle: angle_between(rel_pos, aim_vector),
        aim,
        intercept_point: target.predict(time_of_flight),
        time_of_flight,
        hit_probability,
        tracking: true,
        in_arc,
        ready_to_fire: reason.is_none(),
        reason,
    }
}

/// True kinematics of the ship a target reference points at.
pub fn resolve_target(
    world: &World,
    index: &BTreeMap<ShipId, Entity>,
    shooter: Entity,
    target: &TargetRef,
) -> Option<(Entity, ShipId, Kinematics)> {
    let ship_id = match target {
        TargetRef::Ship(id) => id.clone(),
        TargetRef::Contact(contact) => world
            .get::<&ContactTracker>(shooter)
            .ok()?
            .ship_for(contact)?
            .clone(),
    };
    let entity = *index.get(&ship_id)?;
    if entity == shooter {
        return None;
    }
    let ship = world.get::<&ShipState>(entity).ok()?;
    Some((entity, ship_id, Kinematics::new(ship.position, ship.velocity)))
}

struct Aim {
    weapon: usize,
    target: Kinematics,
    mount: MountStatus,
}

/// Slew turrets and refresh solutions for every weapon with a target.
pub fn run(world: &mut World, index: &BTreeMap<ShipId, Entity>, dt: f64, now: f64) {
    for &entity in index.values() {
        let (targets, configs) = match world.get::<&WeaponBay>(entity) {
            Ok(bay) => (
                bay.weapons.iter().map(|w| w.target.clone()).collect::<Vec<_>>(),
                bay.weapons.iter().map(|w| w.config.clone()).collect::<Vec<_>>(),
            ),
            Err(_) => continue,
        };
        let Ok((shooter, forward)) = world
            .get::<&ShipState>(entity)
            .map(|s| (Kinematics::new(s.position, s.velocity), s.forward()))
        else {
            continue;
        };

        let mut aims = Vec::new();
        let mut lost = Vec::new();
        for (i, target) in targets.iter().enumerate() {
            let Some(target) = target else { continue };
            match resolve_target(world, index, entity, target) {
                Some((_, _, kinematics)) => aims.push(Aim {
                    weapon: i,
                    target: kinematics,
                    mount: MountStatus::read(world, entity, &configs[i], now),
                }),
                None => lost.push(i),
            }
        }

        let Ok(mut bay) = world.get::<&mut WeaponBay>(entity) else {
            continue;
        };
        for i in lost {
            bay.weapons[i].solution = None;
        }
        for aim in aims {
            let weapon = &mut bay.weapons[aim.weapon];
            let rel_pos = aim.target.position - shooter.position;
            let rel_vel = aim.target.velocity - shooter.velocity;
            if let Some(t) = solve_intercept_time(rel_pos, rel_vel, weapon.config.muzzle_speed) {
                let aim_vector = rel_pos + rel_vel * t;
                if angle_between(forward, aim_vector) <= weapon.config.arc_half_angle {
                    weapon.slew_toward(aim_vector, dt);
                }
            }
            weapon.solution = Some(compute_solution(
                weapon,
                &shooter,
                forward,
                &aim.target,
                &aim.mount,
            ));
        }
    }
}

fn weapon_error(
    world: &World,
    shooter: Entity,
    ship_id: &ShipId,
    weapon_id: &str,
) -> Option<CommandError> {
    match world.get::<&WeaponBay>(shooter) {
        Err(_) => Some(CommandError::SystemUnavailable {
            ship: ship_id.clone(),
            system: "weapons",
        }),
        Ok(bay) if bay.weapon(weapon_id).is_none() => Some(CommandError::UnknownWeapon {
            ship: ship_id.clone(),
            weapon: weapon_id.to_string(),
        }),
        Ok(_) => None,
    }
}

/// Assign (or clear) a weapon's target.
pub fn set_target(
    world: &mut World,
    index: &BTreeMap<ShipId, Entity>,
    shooter: Entity,
    ship_id: &ShipId,
    weapon_id: &str,
    target: Option<TargetRef>,
) -> Result<CommandOutcome, CommandError> {
    if let Some(err) = weapon_error(world, shooter, ship_id, weapon_id) {
        return Err(err);
    }
    if let Some(t) = &target {
        if resolve_target(world, index, shooter, t).is_none() {
            return Err(CommandError::TargetNotFound(t.label().to_string()));
        }
    }
    if let Ok(mut bay) = world.get::<&mut WeaponBay>(shooter) {
        if let Some(weapon) = bay.weapon_mut(weapon_id) {
            debug!(ship = %ship_id, weapon = weapon_id, target = ?target, "weapon target set");
            weapon.set_target(target);
        }
    }
    Ok(CommandOutcome::Applied)
}

/// Release one shot from `weapon_id`, optionally retargeting first.
#[allow(clippy::too_many_arguments)]
pub fn fire(
    world: &mut World,
    rng: &mut ChaCha8Rng,
    index: &BTreeMap<ShipId, Entity>,
    shooter: Entity,
    ship_id: &ShipId,
    weapon_id: &str,
    target: Option<TargetRef>,
    now: f64,
    events: &mut EventBus,
) -> Result<CommandOutcome, CommandError> {
    if target.is_some() {
        set_target(world, index, shooter, ship_id, weapon_id, target)?;
    } else if let Some(err) = weapon_error(world, shooter, ship_id, weapon_id) {
        return Err(err);
    }

    let Some(weapon) = world
        .get::<&WeaponBay>(shooter)
        .ok()
        .and_then(|bay| bay.weapon(weapon_id).cloned())
    else {
        return Err(CommandError::UnknownWeapon {
            ship: ship_id.clone(),
            weapon: weapon_id.to_string(),
        });
    };
    let Some(target_ref) = weapon.target.clone() else {
        return Ok(CommandOutcome::NotReady {
            reason: "no target assigned".to_string(),
        });
    };
    let (target_entity, target_id, target_kinematics) =
        resolve_target(world, index, shooter, &target_ref)
            .ok_or_else(|| CommandError::TargetNotFound(target_ref.label().to_string()))?;

    let (shooter_kinematics, forward) = world
        .get::<&ShipState>(shooter)
        .map(|s| (Kinematics::new(s.position, s.velocity), s.forward()))
        .map_err(|_| CommandError::UnknownShip(ship_id.clone()))?;
    let mount = MountStatus::read(world, shooter, &weapon.config, now);
    let solution = compute_solution(
        &weapon,
        &shooter_kinematics,
        forward,
        &target_kinematics,
        &mount,
    );

    if let Ok(mut bay) = world.get::<&mut WeaponBay>(shooter) {
        if let Some(w) = bay.weapon_mut(weapon_id) {
            w.solution = Some(solution.clone());
        }
    }
    if let Some(reason) = solution.reason.clone() {
        return Ok(CommandOutcome::NotReady { reason });
    }
    if let Ok(mut grid) = world.get::<&mut PowerGrid>(shooter) {
        if !grid.try_draw(weapon.config.power_per_shot) {
            return Ok(CommandOutcome::NotReady {
                reason: "insufficient power".to_string(),
            });
        }
    }

    if let Ok(mut bay) = world.get::<&mut WeaponBay>(shooter) {
        if let Some(w) = bay.weapon_mut(weapon_id) {
            w.ammo -= 1;
            w.last_fired = Some(now);
        }
    }
    if let Ok(mut damage) = world.get::<&mut DamageModel>(shooter) {
        damage.add_heat(&weapon.config.subsystem, weapon.config.heat_per_shot);
    }

    let hit = rng.gen::<f64>() < solution.hit_probability;
    let mut hull_damage = 0.0;
    let mut subsystem_hit = None;
    if hit {
        if let Ok(mut damage) = world.get::<&mut DamageModel>(target_entity) {
            hull_damage = weapon.config.damage;
            damage.apply_hull_damage(hull_damage);
            subsystem_hit = damage.pick_subsystem(rng);
            if let Some(name) = &subsystem_hit {
                damage.apply_damage(name, weapon.config.damage * SUBSYSTEM_DAMAGE_FRACTION);
            }
            damage.publish_transitions(&target_id, events);
        }
    }

    info!(
        ship = %ship_id,
        weapon = weapon_id,
        target = %target_id,
        hit,
        probability = solution.hit_probability,
        "weapon fired"
    );
    events.publish(SimEvent::WeaponFired {
        ship_id: ship_id.clone(),
        weapon_id: weapon_id.to_string(),
        kind: weapon.config.kind,
        target: target_id,
        target_contact: match &target_ref {
            TargetRef::Contact(c) => Some(c.clone()),
            TargetRef::Ship(_) => None,
        },
        solution,
        hit,
        hull_damage,
        subsystem_hit,
        sim_time: now,
    });

    Ok(CommandOutcome::Fired { hit, hull_damage })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount() -> MountStatus {
        MountStatus {
            functional: true,
            weapons_factor: 1.0,
            heat_fraction: 0.0,
            power_available: true,
            now: 100.0,
        }
    }

    fn railgun() -> Weapon {
        let config = WeaponConfig {
            muzzle_speed: 5000.0,
            max_range: 50_000.0,
            ..Default::default()
        };
        Weapon::from_config(&config, Heading::default())
    }

    #[test]
    fn test_stationary_target_time_of_flight() {
        let solution = compute_solution(
            &railgun(),
            &Kinematics::default(),
            DVec3::X,
            &Kinematics::new(DVec3::new(10_000.0, 0.0, 0.0), DVec3::ZERO),
            &mount(),
        );
        assert!((solution.time_of_flight - 2.0).abs() < 1e-9);
        assert!(solution.lead_angle.abs() < 1e-9);
        assert!(solution.ready_to_fire, "reason: {:?}", solution.reason);
        // 0.9 × (1 − 0.04) × 1.0
        assert!((solution.hit_probability - 0.864).abs() < 1e-9);
    }

    #[test]
    fn test_crossing_target_needs_lead() {
        let solution = compute_solution(
            &railgun(),
            &Kinematics::default(),
            DVec3::X,
            &Kinematics::new(DVec3::new(10_000.0, 0.0, 0.0), DVec3::new(0.0, 600.0, 0.0)),
            &mount(),
        );
        assert!(solution.lead_angle > 1.0);
        assert!(!solution.ready_to_fire, "turret has not slewed to the lead yet");
        assert!(solution.reason.unwrap().starts_with("turret slewing"));
    }

    #[test]
    fn test_readiness_reasons() {
        let target = Kinematics::new(DVec3::new(10_000.0, 0.0, 0.0), DVec3::ZERO);
        let mut weapon = railgun();

        weapon.ammo = 0;
        let s = compute_solution(&weapon, &Kinematics::default(), DVec3::X, &target, &mount());
        assert_eq!(s.reason.as_deref(), Some("out of ammunition"));

        weapon.ammo = 5;
        weapon.last_fired = Some(99.5);
        let s = compute_solution(&weapon, &Kinematics::default(), DVec3::X, &target, &mount());
        assert!(s.reason.unwrap().starts_with("reloading"));

        weapon.last_fired = None;
        let hot = MountStatus {
            heat_fraction: 0.95,
            ..mount()
        };
        let s = compute_solution(&weapon, &Kinematics::default(), DVec3::X, &target, &hot);
        assert_eq!(s.reason.as_deref(), Some("weapon overheated"));

        let far = Kinematics::new(DVec3::new(60_000.0, 0.0, 0.0), DVec3::ZERO);
        let s = compute_solution(&weapon, &Kinematics::default(), DVec3::X, &far, &mount());
        assert_eq!(s.reason.as_deref(), Some("target out of range"));
        assert_eq!(s.hit_probability, 0.0);
    }

    #[test]
    fn test_arc_limits() {
        let mut weapon = railgun();
        weapon.config.arc_half_angle = 45.0;
        let behind = Kinematics::new(DVec3::new(-10_000.0, 0.0, 0.0), DVec3::ZERO);
        let s = compute_solution(&weapon, &Kinematics::default(), DVec3::X, &behind, &mount());
        assert!(!s.in_arc);
        assert_eq!(s.reason.as_deref(), Some("target outside firing arc"));
    }

    #[test]
    fn test_hit_probability_terms() {
        assert!((hit_probability(0.9, 0.0, 50_000.0, 0.0, 1.0) - 0.9).abs() < 1e-12);
        assert!((hit_probability(1.0, 0.0, 50_000.0, 250.0, 1.0) - 0.5).abs() < 1e-12);
        assert!((hit_probability(1.0, 0.0, 50_000.0, 5000.0, 1.0) - 0.2).abs() < 1e-12);
        assert!((hit_probability(1.0, 0.0, 50_000.0, 0.0, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_slew_is_rate_limited() {
        let next = slew(DVec3::X, DVec3::Y, 10.0);
        assert!((angle_between(DVec3::X, next) - 10.0).abs() < 1e-9);
        assert!((angle_between(next, DVec3::Y) - 80.0).abs() < 1e-9);
        let near = DVec3::new(1.0, 0.01, 0.0);
        assert_eq!(slew(DVec3::X, near, 10.0), near.normalize());
    }

    #[test]
    fn test_retarget_clears_solution() {
        let mut weapon = railgun();
        weapon.set_target(Some(TargetRef::Contact("C-001".into())));
        weapon.solution = Some(FiringSolution::default());
        weapon.set_target(Some(TargetRef::Contact("C-001".into())));
        assert!(weapon.solution.is_some(), "same target keeps the solution");
        weapon.set_target(Some(TargetRef::Contact("C-002".into())));
        assert!(weapon.solution.is_none());
    }
}
