//! Subsystem health and heat.
//!
//! Status and performance factors are pure functions of (health, heat).
//! The combined factor is the only way damage reaches other systems:
//! propulsion scales thrust, maneuvering scales rotation and autopilot
//! steering, sensors scale range, weapons gate firing and hit chance, and
//! the reactor scales power regeneration.

use hecs::World;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use bridgesim_core::components::{ShipState, SubsystemHealth};
use bridgesim_core::config::{ShipConfig, SubsystemConfig};
use bridgesim_core::constants::*;
use bridgesim_core::enums::SubsystemStatus;
use bridgesim_core::events::{EventBus, SimEvent};
use bridgesim_core::state::{DamageView, SubsystemView};
use bridgesim_core::types::ShipId;

/// Status from health alone.
pub fn status(health: f64, max_health: f64, failure_threshold: f64) -> SubsystemStatus {
    if health <= 0.0 {
        return SubsystemStatus::Destroyed;
    }
    let fraction = health / max_health;
    if fraction > ONLINE_HEALTH_FRACTION {
        SubsystemStatus::Online
    } else if fraction > failure_threshold {
        SubsystemStatus::Damaged
    } else {
        SubsystemStatus::Offline
    }
}

/// Performance factor from health: 1.0 online, 0.5–1.0 across the damaged
/// band, 0 offline or destroyed.
pub fn degradation_factor(health: f64, max_health: f64, failure_threshold: f64) -> f64 {
    match status(health, max_health, failure_threshold) {
        SubsystemStatus::Online => 1.0,
        SubsystemStatus::Damaged => {
            let band = ONLINE_HEALTH_FRACTION - failure_threshold;
            let t = ((health / max_health - failure_threshold) / band).clamp(0.0, 1.0);
            DAMAGED_FACTOR_FLOOR + (1.0 - DAMAGED_FACTOR_FLOOR) * t
        }
        SubsystemStatus::Offline | SubsystemStatus::Destroyed => 0.0,
    }
}

/// Performance factor from heat: 1.0 below the overheat threshold, then
/// linear down to `1 - penalty` at max heat.
pub fn heat_factor(heat: f64, max_heat: f64, overheat_threshold: f64, penalty: f64) -> f64 {
    let fraction = (heat / max_heat).clamp(0.0, 1.0);
    if fraction < overheat_threshold || overheat_threshold >= 1.0 {
        return 1.0;
    }
    let t = (fraction - overheat_threshold) / (1.0 - overheat_threshold);
    1.0 - penalty * t
}

pub fn subsystem_status(sub: &SubsystemHealth) -> SubsystemStatus {
    status(sub.health, sub.max_health, sub.failure_threshold)
}

pub fn is_overheated(sub: &SubsystemHealth) -> bool {
    sub.heat >= sub.overheat_threshold * sub.max_heat
}

/// Combined degradation × heat factor.
pub fn subsystem_factor(sub: &SubsystemHealth) -> f64 {
    degradation_factor(sub.health, sub.max_health, sub.failure_threshold)
        * heat_factor(sub.heat, sub.max_heat, sub.overheat_threshold, sub.overheat_penalty)
}

fn health_from_config(config: &SubsystemConfig) -> SubsystemHealth {
    SubsystemHealth {
        name: config.name.clone(),
        max_health: config.max_health,
        health: config.max_health,
        heat: 0.0,
        max_heat: config.max_heat,
        criticality: config.criticality,
        failure_threshold: config.failure_threshold,
        overheat_threshold: config.overheat_threshold,
        overheat_penalty: config.overheat_penalty,
        heat_dissipation: config.heat_dissipation,
        hit_weight: config.hit_weight,
    }
}

/// Last state published for one subsystem, so transitions fire once.
#[derive(Debug, Clone, Copy)]
struct Reported {
    status: SubsystemStatus,
    overheated: bool,
}

/// Hull plus per-subsystem pools for one ship.
#[derive(Debug, Clone)]
pub struct DamageModel {
    pub hull: f64,
    pub max_hull: f64,
    subsystems: Vec<SubsystemHealth>,
    reported: Vec<Reported>,
    destroyed_reported: bool,
}

impl DamageModel {
    pub fn new(max_hull: f64, subsystems: &[SubsystemConfig]) -> Self {
        let subsystems: Vec<SubsystemHealth> = subsystems.iter().map(health_from_config).collect();
        let reported = subsystems
            .iter()
            .map(|s| Reported {
                status: subsystem_status(s),
                overheated: false,
            })
            .collect();
        Self {
            hull: max_hull,
            max_hull,
            subsystems,
            reported,
            destroyed_reported: false,
        }
    }

    pub fn from_config(config: &ShipConfig) -> Self {
        Self::new(config.hull, &config.subsystems)
    }

    pub fn subsystems(&self) -> &[SubsystemHealth] {
        &self.subsystems
    }

    pub fn subsystem(&self, name: &str) -> Option<&SubsystemHealth> {
        self.subsystems.iter().find(|s| s.name == name)
    }

    fn subsystem_mut(&mut self, name: &str) -> Option<&mut SubsystemHealth> {
        self.subsystems.iter_mut().find(|s| s.name == name)
    }

    pub fn status(&self, name: &str) -> Option<SubsystemStatus> {
        self.subsystem(name).map(subsystem_status)
    }

    /// Combined factor for `name`. Subsystems a ship doesn't carry never
    /// limit it; a destroyed ship gets nothing from any of them.
    pub fn factor(&self, name: &str) -> f64 {
        if self.is_destroyed() {
            return 0.0;
        }
        self.subsystem(name).map_or(1.0, subsystem_factor)
    }

    /// Online or damaged.
    pub fn is_functional(&self, name: &str) -> bool {
        !self.is_destroyed()
            && self.status(name).map_or(true, |s| {
                matches!(s, SubsystemStatus::Online | SubsystemStatus::Damaged)
            })
    }

    pub fn heat_fraction(&self, name: &str) -> f64 {
        self.subsystem(name)
            .map_or(0.0, |s| (s.heat / s.max_heat).clamp(0.0, 1.0))
    }

    pub fn is_destroyed(&self) -> bool {
        self.hull <= 0.0
    }

    /// Propulsion and maneuvering both out: the ship can neither thrust nor turn.
    pub fn is_mission_kill(&self) -> bool {
        !self.is_functional(PROPULSION) && !self.is_functional(MANEUVERING)
    }

    /// Remove health from a subsystem. Non-positive amounts are ignored so
    /// damage never heals. Returns false if the ship has no such subsystem.
    pub fn apply_damage(&mut self, name: &str, amount: f64) -> bool {
        let Some(sub) = self.subsystem_mut(name) else {
            return false;
        };
        if amount.is_finite() && amount > 0.0 {
            sub.health = (sub.health - amount).max(0.0);
        }
        true
    }

    pub fn apply_hull_damage(&mut self, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            self.hull = (self.hull - amount).max(0.0);
        }
    }

    pub fn add_heat(&mut self, name: &str, amount: f64) {
        if let Some(sub) = self.subsystem_mut(name) {
            sub.heat = (sub.heat + amount).clamp(0.0, sub.max_heat);
        }
    }

    /// Pick a subsystem to absorb a hit, weighted by hit weight. Destroyed
    /// subsystems are skipped.
    pub fn pick_subsystem(&self, rng: &mut ChaCha8Rng) -> Option<String> {
        let candidates: Vec<&SubsystemHealth> = self
            .subsystems
            .iter()
            .filter(|s| s.health > 0.0 && s.hit_weight > 0.0)
            .collect();
        let total: f64 = candidates.iter().map(|s| s.hit_weight).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = rng.gen::<f64>() * total;
        for sub in &candidates {
            if roll < sub.hit_weight {
                return Some(sub.name.clone());
            }
            roll -= sub.hit_weight;
        }
        candidates.last().map(|s| s.name.clone())
    }

    /// Heat from propulsion use, then dissipation.
    pub fn tick_heat(&mut self, dt: f64, throttle: f64) {
        for sub in &mut self.subsystems {
            let mut heat = sub.heat;
            if sub.name == PROPULSION {
                heat += PROPULSION_HEAT_PER_SEC * throttle * dt;
            }
            heat -= sub.heat_dissipation * dt;
            sub.heat = heat.clamp(0.0, sub.max_heat);
        }
    }

    /// Publish status and overheat transitions since the last call.
    pub fn publish_transitions(&mut self, ship_id: &ShipId, events: &mut EventBus) {
        for (sub, reported) in self.subsystems.iter().zip(self.reported.iter_mut()) {
            let now = subsystem_status(sub);
            if now != reported.status {
                debug!(
                    ship = %ship_id,
                    subsystem = %sub.name,
                    from = ?reported.status,
                    to = ?now,
                    "subsystem status"
                );
                events.publish(SimEvent::SubsystemStateChanged {
                    ship_id: ship_id.clone(),
                    subsystem: sub.name.clone(),
                    from: reported.status,
                    to: now,
                });
                match now {
                    SubsystemStatus::Offline => events.publish(SimEvent::SubsystemOffline {
                        ship_id: ship_id.clone(),
                        subsystem: sub.name.clone(),
                    }),
                    SubsystemStatus::Destroyed => events.publish(SimEvent::SubsystemDestroyed {
                        ship_id: ship_id.clone(),
                        subsystem: sub.name.clone(),
                    }),
                    SubsystemStatus::Online | SubsystemStatus::Damaged => {}
                }
                reported.status = now;
            }

            let overheated = is_overheated(sub);
            if overheated && !reported.overheated {
                events.publish(SimEvent::SubsystemOverheat {
                    ship_id: ship_id.clone(),
                    subsystem: sub.name.clone(),
                    heat: sub.heat,
                    max_heat: sub.max_heat,
                });
            } else if !overheated && reported.overheated {
                events.publish(SimEvent::SubsystemCooled {
                    ship_id: ship_id.clone(),
                    subsystem: sub.name.clone(),
                    heat: sub.heat,
                });
            }
            reported.overheated = overheated;
        }

        if self.is_destroyed() && !self.destroyed_reported {
            self.destroyed_reported = true;
            info!(ship = %ship_id, "ship destroyed");
            events.publish(SimEvent::ShipDestroyed {
                ship_id: ship_id.clone(),
            });
        }
    }

    pub fn view(&self) -> DamageView {
        DamageView {
            hull: self.hull,
            max_hull: self.max_hull,
            destroyed: self.is_destroyed(),
            mission_kill: self.is_mission_kill(),
            subsystems: self
                .subsystems
                .iter()
                .map(|s| SubsystemView {
                    name: s.name.clone(),
                    status: subsystem_status(s),
                    health: s.health,
                    max_health: s.max_health,
                    heat: s.heat,
                    max_heat: s.max_heat,
                    overheated: is_overheated(s),
                    criticality: s.criticality,
                    factor: subsystem_factor(s),
                })
                .collect(),
        }
    }
}

/// Heat and transition pass for every ship.
pub fn run(world: &mut World, dt: f64, events: &mut EventBus) {
    for (_entity, (ship, damage)) in world.query_mut::<(&ShipState, &mut DamageModel)>() {
        damage.tick_heat(dt, ship.throttle());
        damage.publish_transitions(&ship.id, events);
    }
}
