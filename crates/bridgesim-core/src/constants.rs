//! Simulation constants and tuning parameters.

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 30;

/// Seconds per tick.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

/// Standard gravity for g-force readouts (m/s²).
pub const STANDARD_GRAVITY: f64 = 9.806_65;

// --- Physics ---

/// Default moment of inertia per kilogram of mass (kg·m² / kg).
pub const DEFAULT_INERTIA_PER_KG: f64 = 10.0;

/// |pitch| at which a gimbal-lock warning is raised (degrees).
pub const GIMBAL_WARNING_PITCH: f64 = 85.0;

/// |pitch| at which a critical gimbal-lock signal is raised (degrees).
pub const GIMBAL_CRITICAL_PITCH: f64 = 89.0;

/// Per-component position bound (meters).
pub const MAX_POSITION: f64 = 1e12;

/// Velocity magnitude bound (m/s).
pub const MAX_VELOCITY: f64 = 1e6;

/// Acceleration magnitude bound (m/s²).
pub const MAX_ACCELERATION: f64 = 1e4;

/// Angular rate bound (deg/s or deg/s²).
pub const MAX_ANGULAR_RATE: f64 = 1e5;

// --- Subsystem names ---

pub const PROPULSION: &str = "propulsion";
pub const MANEUVERING: &str = "maneuvering";
pub const SENSORS: &str = "sensors";
pub const WEAPONS: &str = "weapons";
pub const REACTOR: &str = "reactor";
pub const LIFE_SUPPORT: &str = "life_support";

// --- Damage / heat ---

/// Health fraction above which a subsystem is fully online.
pub const ONLINE_HEALTH_FRACTION: f64 = 0.75;

/// Default health fraction at or below which a subsystem is offline.
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.25;

/// Degradation factor at the bottom of the damaged band.
pub const DAMAGED_FACTOR_FLOOR: f64 = 0.5;

/// Default heat fraction at which a subsystem overheats.
pub const DEFAULT_OVERHEAT_THRESHOLD: f64 = 0.8;

/// Default performance lost at maximum heat.
pub const DEFAULT_OVERHEAT_PENALTY: f64 = 0.5;

/// Default heat dissipated per second.
pub const DEFAULT_HEAT_DISSIPATION: f64 = 5.0;

/// Heat added to propulsion per second at full throttle.
pub const PROPULSION_HEAT_PER_SEC: f64 = 3.0;

/// Fraction of weapon damage routed to a random subsystem on a hit.
pub const SUBSYSTEM_DAMAGE_FRACTION: f64 = 0.5;

// --- Power ---

pub const DEFAULT_POWER_CAPACITY: f64 = 1000.0;
pub const DEFAULT_POWER_REGEN: f64 = 50.0;

// --- Passive sensors ---

/// Default passive sensor range (meters).
pub const DEFAULT_PASSIVE_RANGE: f64 = 50_000.0;

/// Default ticks between passive scans (~0.33 s at 30 Hz).
pub const DEFAULT_SCAN_INTERVAL_TICKS: u32 = 10;

/// Weight of the range term in the passive accuracy score.
pub const PASSIVE_RANGE_WEIGHT: f64 = 0.6;

/// Weight of the signature term in the passive accuracy score.
pub const PASSIVE_SIGNATURE_WEIGHT: f64 = 0.4;

/// Signature that saturates the signature score.
pub const SIGNATURE_REFERENCE: f64 = 2.0;

/// Signature increase at full throttle (fraction of base).
pub const THROTTLE_SIGNATURE_GAIN: f64 = 0.5;

/// Accuracy above which the full ship class is resolved.
pub const CLASSIFY_FULL_ACCURACY: f64 = 0.9;

/// Accuracy above which the size bucket is resolved.
pub const CLASSIFY_SIZE_ACCURACY: f64 = 0.7;

/// Position noise standard deviation as a fraction of distance at zero accuracy.
pub const POSITION_NOISE_FRACTION: f64 = 0.05;

/// Velocity noise standard deviation at zero accuracy (m/s).
pub const VELOCITY_NOISE_BASE: f64 = 20.0;

// --- Active sensors ---

pub const DEFAULT_ACTIVE_RANGE: f64 = 100_000.0;
pub const DEFAULT_ACTIVE_COOLDOWN_SECS: f64 = 10.0;
pub const DEFAULT_ACTIVE_POWER_COST: f64 = 200.0;

/// Active accuracy at zero range.
pub const ACTIVE_ACCURACY_BASE: f64 = 0.95;

/// Active accuracy lost at maximum range.
pub const ACTIVE_ACCURACY_FALLOFF: f64 = 0.1;

/// A ping is audible out to this multiple of its own range.
pub const PING_DETECTION_RANGE_FACTOR: f64 = 2.0;

/// Accuracy of the contact a listener gains on a pinging ship.
pub const PING_CONTACT_ACCURACY: f64 = 0.95;

// --- Contact tracking ---

/// Seconds after which a contact is considered stale.
pub const DEFAULT_STALE_THRESHOLD_SECS: f64 = 60.0;

/// Effective confidence below which classification reads as unknown.
pub const CLASSIFICATION_CONFIDENCE_THRESHOLD: f64 = 0.3;

// --- Weapons ---

/// Turret must be within this angle of the aim to fire (degrees).
pub const TURRET_ALIGNMENT_TOLERANCE: f64 = 5.0;

/// Weapons refuse to fire at or above this fraction of max heat.
pub const WEAPON_HEAT_LIMIT: f64 = 0.9;

/// Lateral speed at which the lateral penalty bottoms out (m/s).
pub const LATERAL_SPEED_REFERENCE: f64 = 500.0;

/// Minimum lateral-velocity factor.
pub const LATERAL_PENALTY_FLOOR: f64 = 0.2;

// --- Ship size buckets (kg) ---

pub const SMALL_SHIP_MAX_MASS: f64 = 50_000.0;
pub const MEDIUM_SHIP_MAX_MASS: f64 = 500_000.0;

// --- Navigation ---

/// Seconds autopilot stays suppressed after manual input.
pub const MANUAL_OVERRIDE_TIMEOUT_SECS: f64 = 5.0;

// --- GoToPosition ---

pub const GOTO_ARRIVAL_TOLERANCE: f64 = 50.0;
pub const GOTO_ARRIVAL_SPEED_TOLERANCE: f64 = 1.0;
pub const GOTO_BRAKE_BUFFER: f64 = 100.0;
pub const GOTO_CRUISE_SPEED: f64 = 500.0;

/// Fraction of max acceleration assumed by the braking profile.
pub const GOTO_BRAKE_MARGIN: f64 = 0.8;

/// Speed fraction of cruise at which ACCELERATE becomes COAST.
pub const GOTO_COAST_FRACTION: f64 = 0.98;

/// Velocity-tracking gain (1/s).
pub const VELOCITY_TRACKING_GAIN: f64 = 1.0;

// --- Intercept ---

pub const INTERCEPT_APPROACH_RANGE: f64 = 10_000.0;
pub const INTERCEPT_MATCH_RANGE: f64 = 1_000.0;
pub const INTERCEPT_MATCH_CLOSING_SPEED: f64 = 50.0;
pub const INTERCEPT_PURSUIT_SPEED: f64 = 500.0;

/// Desired closing speed per meter of range during approach (1/s).
pub const APPROACH_CLOSING_PER_METER: f64 = 0.02;
pub const APPROACH_MIN_CLOSING_SPEED: f64 = 10.0;
pub const APPROACH_MAX_CLOSING_SPEED: f64 = 200.0;

// --- MatchVelocity ---

pub const MATCH_VELOCITY_TOLERANCE: f64 = 0.5;
pub const MATCH_SAFETY_FACTOR: f64 = 0.9;
pub const MATCH_NEAR_ZERO_SPEED: f64 = 1.0;
pub const MATCH_SMALL_SPEED: f64 = 10.0;
pub const MATCH_MEDIUM_SPEED: f64 = 100.0;
pub const MATCH_MINIMAL_THRUST: f64 = 0.05;

// --- Hold ---

pub const HOLD_POSITION_GAIN: f64 = 0.1;
pub const HOLD_MAX_CORRECTION_SPEED: f64 = 20.0;
pub const HOLD_THRUST_CAP: f64 = 0.5;
pub const HOLD_POSITION_TOLERANCE: f64 = 5.0;
pub const HOLD_VELOCITY_TOLERANCE: f64 = 0.2;

// --- Formation ---

pub const FORMATION_POSITION_GAIN: f64 = 0.04;
pub const FORMATION_VELOCITY_GAIN: f64 = 0.4;
pub const FORMATION_MIN_SEPARATION: f64 = 200.0;

/// Share of the echelon steering given to separation.
pub const FORMATION_REPULSION_WEIGHT: f64 = 0.3;
