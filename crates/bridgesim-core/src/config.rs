//! Configuration records with defaults, validated once at load time.
//!
//! Every record deserializes from JSON with `#[serde(default)]`, so a
//! scenario file only has to name what differs from the defaults.

use std::collections::HashSet;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::{Criticality, SizeClass, WeaponKind};
use crate::error::ConfigError;
use crate::types::{Attitude, ShipId};

/// Configuration for starting a new simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    /// Fixed tick length in seconds.
    pub dt: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { seed: 42, dt: DT }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::invalid("dt", "must be a positive number of seconds"));
        }
        Ok(())
    }
}

/// Passive sensor parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveSensorConfig {
    pub range: f64,
    pub scan_interval_ticks: u32,
}

impl Default for PassiveSensorConfig {
    fn default() -> Self {
        Self {
            range: DEFAULT_PASSIVE_RANGE,
            scan_interval_ticks: DEFAULT_SCAN_INTERVAL_TICKS,
        }
    }
}

/// Active sensor parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveSensorConfig {
    pub range: f64,
    pub cooldown_secs: f64,
    pub power_cost: f64,
}

impl Default for ActiveSensorConfig {
    fn default() -> Self {
        Self {
            range: DEFAULT_ACTIVE_RANGE,
            cooldown_secs: DEFAULT_ACTIVE_COOLDOWN_SECS,
            power_cost: DEFAULT_ACTIVE_POWER_COST,
        }
    }
}

/// One weapon mount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub id: String,
    pub kind: WeaponKind,
    /// Projectile speed relative to the firing ship (m/s).
    pub muzzle_speed: f64,
    pub max_range: f64,
    /// Hit probability at point-blank range against a non-maneuvering target.
    pub base_accuracy: f64,
    /// Hull damage on a hit.
    pub damage: f64,
    pub cooldown_secs: f64,
    pub ammo: u32,
    pub power_per_shot: f64,
    pub heat_per_shot: f64,
    /// Half-angle of the turret arc around the nose (degrees, 180 = all round).
    pub arc_half_angle: f64,
    /// Turret slew rate (deg/s).
    pub slew_rate: f64,
    /// Subsystem whose health and heat gate this weapon.
    pub subsystem: String,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            id: "railgun-1".to_string(),
            kind: WeaponKind::Railgun,
            muzzle_speed: 5000.0,
            max_range: 50_000.0,
            base_accuracy: 0.9,
            damage: 50.0,
            cooldown_secs: 2.0,
            ammo: 100,
            power_per_shot: 20.0,
            heat_per_shot: 10.0,
            arc_half_angle: 180.0,
            slew_rate: 90.0,
            subsystem: WEAPONS.to_string(),
        }
    }
}

/// One damageable subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemConfig {
    pub name: String,
    pub max_health: f64,
    pub max_heat: f64,
    pub criticality: Criticality,
    pub failure_threshold: f64,
    pub overheat_threshold: f64,
    pub overheat_penalty: f64,
    pub heat_dissipation: f64,
    pub hit_weight: f64,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_health: 100.0,
            max_heat: 100.0,
            criticality: Criticality::Medium,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            overheat_threshold: DEFAULT_OVERHEAT_THRESHOLD,
            overheat_penalty: DEFAULT_OVERHEAT_PENALTY,
            heat_dissipation: DEFAULT_HEAT_DISSIPATION,
            hit_weight: 1.0,
        }
    }
}

impl SubsystemConfig {
    pub fn named(name: &str, criticality: Criticality, hit_weight: f64) -> Self {
        Self {
            name: name.to_string(),
            criticality,
            hit_weight,
            ..Default::default()
        }
    }
}

/// The standard subsystem fit.
pub fn default_subsystems() -> Vec<SubsystemConfig> {
    vec![
        SubsystemConfig::named(PROPULSION, Criticality::High, 2.0),
        SubsystemConfig::named(MANEUVERING, Criticality::High, 1.5),
        SubsystemConfig::named(SENSORS, Criticality::Medium, 1.0),
        SubsystemConfig::named(WEAPONS, Criticality::Medium, 1.5),
        SubsystemConfig::named(REACTOR, Criticality::Critical, 1.0),
        SubsystemConfig::named(LIFE_SUPPORT, Criticality::Critical, 0.5),
    ]
}

/// Reactor output and storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub capacity: f64,
    pub regen_per_sec: f64,
    /// Starting charge; full if unset.
    pub initial: Option<f64>,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POWER_CAPACITY,
            regen_per_sec: DEFAULT_POWER_REGEN,
            initial: None,
        }
    }
}

/// Tunable autopilot gains and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotGains {
    pub arrival_tolerance: f64,
    pub arrival_speed_tolerance: f64,
    pub brake_buffer: f64,
    pub cruise_speed: f64,
    pub brake_margin: f64,
    pub velocity_gain: f64,
    pub approach_range: f64,
    pub match_range: f64,
    pub match_closing_speed: f64,
    pub pursuit_speed: f64,
    pub match_tolerance: f64,
    pub match_safety_factor: f64,
    pub hold_position_gain: f64,
    pub hold_max_speed: f64,
    pub hold_thrust_cap: f64,
    pub hold_position_tolerance: f64,
    pub hold_velocity_tolerance: f64,
    pub formation_position_gain: f64,
    pub formation_velocity_gain: f64,
    pub formation_min_separation: f64,
    pub manual_override_timeout: f64,
}

impl Default for AutopilotGains {
    fn default() -> Self {
        Self {
            arrival_tolerance: GOTO_ARRIVAL_TOLERANCE,
            arrival_speed_tolerance: GOTO_ARRIVAL_SPEED_TOLERANCE,
            brake_buffer: GOTO_BRAKE_BUFFER,
            cruise_speed: GOTO_CRUISE_SPEED,
            brake_margin: GOTO_BRAKE_MARGIN,
            velocity_gain: VELOCITY_TRACKING_GAIN,
            approach_range: INTERCEPT_APPROACH_RANGE,
            match_range: INTERCEPT_MATCH_RANGE,
            match_closing_speed: INTERCEPT_MATCH_CLOSING_SPEED,
            pursuit_speed: INTERCEPT_PURSUIT_SPEED,
            match_tolerance: MATCH_VELOCITY_TOLERANCE,
            match_safety_factor: MATCH_SAFETY_FACTOR,
            hold_position_gain: HOLD_POSITION_GAIN,
            hold_max_speed: HOLD_MAX_CORRECTION_SPEED,
            hold_thrust_cap: HOLD_THRUST_CAP,
            hold_position_tolerance: HOLD_POSITION_TOLERANCE,
            hold_velocity_tolerance: HOLD_VELOCITY_TOLERANCE,
            formation_position_gain: FORMATION_POSITION_GAIN,
            formation_velocity_gain: FORMATION_VELOCITY_GAIN,
            formation_min_separation: FORMATION_MIN_SEPARATION,
            manual_override_timeout: MANUAL_OVERRIDE_TIMEOUT_SECS,
        }
    }
}

impl AutopilotGains {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("arrival_tolerance", self.arrival_tolerance),
            ("arrival_speed_tolerance", self.arrival_speed_tolerance),
            ("cruise_speed", self.cruise_speed),
            ("velocity_gain", self.velocity_gain),
            ("approach_range", self.approach_range),
            ("match_range", self.match_range),
            ("match_closing_speed", self.match_closing_speed),
            ("pursuit_speed", self.pursuit_speed),
            ("match_tolerance", self.match_tolerance),
            ("hold_position_gain", self.hold_position_gain),
            ("hold_max_speed", self.hold_max_speed),
            ("hold_position_tolerance", self.hold_position_tolerance),
            ("hold_velocity_tolerance", self.hold_velocity_tolerance),
            ("formation_position_gain", self.formation_position_gain),
            ("formation_velocity_gain", self.formation_velocity_gain),
            ("formation_min_separation", self.formation_min_separation),
        ];
        for (field, value) in positive {
            require_positive(&format!("autopilot.{field}"), value)?;
        }
        let fractions = [
            ("brake_margin", self.brake_margin),
            ("match_safety_factor", self.match_safety_factor),
            ("hold_thrust_cap", self.hold_thrust_cap),
        ];
        for (field, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::invalid(
                    format!("autopilot.{field}"),
                    "must be in (0, 1]",
                ));
            }
        }
        if !(self.brake_buffer >= 0.0 && self.manual_override_timeout >= 0.0) {
            return Err(ConfigError::invalid(
                "autopilot",
                "brake_buffer and manual_override_timeout must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Everything needed to spawn one ship. Absent optional systems are simply
/// not attached to the ship.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipConfig {
    pub id: ShipId,
    pub ship_class: String,
    pub position: DVec3,
    pub velocity: DVec3,
    pub orientation: Attitude,
    pub mass: f64,
    /// Defaults to `mass * DEFAULT_INERTIA_PER_KG`.
    pub moment_of_inertia: Option<f64>,
    pub max_thrust: f64,
    pub signature: f64,
    pub hull: f64,
    pub passive_sensor: Option<PassiveSensorConfig>,
    pub active_sensor: Option<ActiveSensorConfig>,
    pub weapons: Vec<WeaponConfig>,
    pub subsystems: Vec<SubsystemConfig>,
    pub power: Option<PowerConfig>,
    pub autopilot: AutopilotGains,
    pub stale_threshold_secs: f64,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            id: ShipId::new(""),
            ship_class: "frigate".to_string(),
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            orientation: Attitude::default(),
            mass: 100_000.0,
            moment_of_inertia: None,
            max_thrust: 1_000_000.0,
            signature: 1.0,
            hull: 1000.0,
            passive_sensor: Some(PassiveSensorConfig::default()),
            active_sensor: Some(ActiveSensorConfig::default()),
            weapons: Vec::new(),
            subsystems: default_subsystems(),
            power: Some(PowerConfig::default()),
            autopilot: AutopilotGains::default(),
            stale_threshold_secs: DEFAULT_STALE_THRESHOLD_SECS,
        }
    }
}

impl ShipConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ShipId::new(id),
            ..Default::default()
        }
    }

    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: DVec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_weapon(mut self, weapon: WeaponConfig) -> Self {
        self.weapons.push(weapon);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ShipConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn moment_of_inertia(&self) -> f64 {
        self.moment_of_inertia
            .unwrap_or(self.mass * DEFAULT_INERTIA_PER_KG)
    }

    pub fn size_class(&self) -> SizeClass {
        size_class_for_mass(self.mass)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ConfigError::invalid("id", "must not be empty"));
        }
        require_positive("mass", self.mass)?;
        require_positive("moment_of_inertia", self.moment_of_inertia())?;
        require_non_negative("max_thrust", self.max_thrust)?;
        require_non_negative("signature", self.signature)?;
        require_positive("hull", self.hull)?;
        require_positive("stale_threshold_secs", self.stale_threshold_secs)?;
        if !(self.position.is_finite() && self.velocity.is_finite()) {
            return Err(ConfigError::invalid("position/velocity", "must be finite"));
        }

        if let Some(passive) = &self.passive_sensor {
            require_positive("passive_sensor.range", passive.range)?;
            if passive.scan_interval_ticks == 0 {
                return Err(ConfigError::invalid(
                    "passive_sensor.scan_interval_ticks",
                    "must be at least 1",
                ));
            }
        }
        if let Some(active) = &self.active_sensor {
            require_positive("active_sensor.range", active.range)?;
            require_non_negative("active_sensor.cooldown_secs", active.cooldown_secs)?;
            require_non_negative("active_sensor.power_cost", active.power_cost)?;
        }

        let mut subsystem_names = HashSet::new();
        for sub in &self.subsystems {
            let field = format!("subsystems.{}", sub.name);
            if sub.name.is_empty() || !subsystem_names.insert(sub.name.as_str()) {
                return Err(ConfigError::invalid(field, "names must be unique and non-empty"));
            }
            require_positive(&field, sub.max_health)?;
            require_positive(&field, sub.max_heat)?;
            require_non_negative(&field, sub.heat_dissipation)?;
            require_non_negative(&field, sub.hit_weight)?;
            for value in [sub.failure_threshold, sub.overheat_threshold, sub.overheat_penalty] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::invalid(field, "thresholds must be in [0, 1]"));
                }
            }
        }

        let mut weapon_ids = HashSet::new();
        for weapon in &self.weapons {
            let field = format!("weapons.{}", weapon.id);
            if weapon.id.is_empty() || !weapon_ids.insert(weapon.id.as_str()) {
                return Err(ConfigError::invalid(field, "ids must be unique and non-empty"));
            }
            require_positive(&field, weapon.muzzle_speed)?;
            require_positive(&field, weapon.max_range)?;
            require_non_negative(&field, weapon.cooldown_secs)?;
            require_non_negative(&field, weapon.damage)?;
            require_positive(&field, weapon.slew_rate)?;
            if !(0.0..=1.0).contains(&weapon.base_accuracy) {
                return Err(ConfigError::invalid(field, "base_accuracy must be in [0, 1]"));
            }
            if !(weapon.arc_half_angle > 0.0 && weapon.arc_half_angle <= 180.0) {
                return Err(ConfigError::invalid(field, "arc_half_angle must be in (0, 180]"));
            }
            if !subsystem_names.contains(weapon.subsystem.as_str()) {
                return Err(ConfigError::invalid(
                    field,
                    format!("unknown subsystem `{}`", weapon.subsystem),
                ));
            }
        }

        if let Some(power) = &self.power {
            require_non_negative("power.capacity", power.capacity)?;
            require_non_negative("power.regen_per_sec", power.regen_per_sec)?;
            if let Some(initial) = power.initial {
                if !(0.0..=power.capacity).contains(&initial) {
                    return Err(ConfigError::invalid("power.initial", "must be within capacity"));
                }
            }
        }

        self.autopilot.validate()
    }
}

/// Size bucket for a hull mass.
pub fn size_class_for_mass(mass: f64) -> SizeClass {
    if mass <= SMALL_SHIP_MAX_MASS {
        SizeClass::Small
    } else if mass <= MEDIUM_SHIP_MAX_MASS {
        SizeClass::Medium
    } else {
        SizeClass::Large
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be non-negative, got {value}")))
    }
}
