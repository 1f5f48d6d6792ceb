//! Read-only views: the visible state handed to bridge stations each tick.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::components::FiringSolution;
use crate::enums::*;
use crate::events::SimEvent;
use crate::types::{Attitude, AxisRates, Heading, ShipId, SimTime};

/// Complete simulation state produced by one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub time: SimTime,
    /// Ships ordered by id.
    pub ships: Vec<ShipView>,
    /// Events published during the tick, in publish order.
    pub events: Vec<SimEvent>,
}

impl SimSnapshot {
    pub fn ship(&self, id: &ShipId) -> Option<&ShipView> {
        self.ships.iter().find(|s| &s.id == id)
    }
}

/// Everything the helm, tactical and engineering stations can see of one ship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipView {
    pub id: ShipId,
    pub ship_class: String,
    pub position: DVec3,
    pub velocity: DVec3,
    pub speed: f64,
    pub orientation: Attitude,
    pub angular_velocity: AxisRates,
    /// World-frame acceleration from the last tick (m/s²).
    pub acceleration: DVec3,
    /// Acceleration magnitude in standard gravities.
    pub g_force: f64,
    pub throttle: f64,
    pub gimbal_level: GimbalLockLevel,
    pub needs_recovery: bool,
    pub navigation: NavigationView,
    pub damage: DamageView,
    pub sensors: Option<SensorView>,
    pub weapons: Vec<WeaponView>,
    pub power: Option<PowerView>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationView {
    pub mode: ControlMode,
    pub autopilot: Option<AutopilotView>,
    /// Seconds until a manual override hands control back (0 if none).
    pub override_remaining_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotView {
    pub program: AutopilotKind,
    pub phase: String,
    /// Target description: a contact id, ship id, or fixed point.
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorView {
    /// Configured passive range (m), if a passive sensor is fitted.
    pub passive_range: Option<f64>,
    /// Passive range after sensor degradation.
    pub effective_range: f64,
    pub active_fitted: bool,
    pub active_cooldown_remaining: f64,
    /// Contacts, nearest first.
    pub contacts: Vec<ContactView>,
}

/// One tracked contact as shown on the tactical display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactView {
    pub contact_id: String,
    pub position: DVec3,
    pub velocity: DVec3,
    /// Distance from own ship at view time (m).
    pub distance: f64,
    /// Bearing relative to own nose at the last update.
    pub bearing: Heading,
    /// Positive when closing (m/s).
    pub closing_speed: f64,
    /// Confidence after staleness decay.
    pub confidence: f64,
    pub method: DetectionMethod,
    pub classification: Classification,
    pub age_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponView {
    pub id: String,
    pub kind: WeaponKind,
    pub enabled: bool,
    pub ammo: u32,
    pub cooldown_remaining: f64,
    /// Current turret pointing (world heading).
    pub turret: Heading,
    pub target: Option<String>,
    pub solution: Option<FiringSolution>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DamageView {
    pub hull: f64,
    pub max_hull: f64,
    pub destroyed: bool,
    /// Propulsion and maneuvering both out.
    pub mission_kill: bool,
    pub subsystems: Vec<SubsystemView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemView {
    pub name: String,
    pub status: SubsystemStatus,
    pub health: f64,
    pub max_health: f64,
    pub heat: f64,
    pub max_heat: f64,
    pub overheated: bool,
    pub criticality: Criticality,
    /// Combined degradation x heat factor.
    pub factor: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerView {
    pub capacity: f64,
    pub stored: f64,
    pub regen_per_sec: f64,
}
