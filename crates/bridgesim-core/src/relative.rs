//! Relative-motion calculus shared by autopilot programs and targeting.
//!
//! Range, closing speed, closest point of approach, and the closed-form
//! constant-speed intercept solution.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::types::Kinematics;

/// Quadratic coefficients smaller than this are treated as zero.
pub const INTERCEPT_EPSILON: f64 = 1e-9;

/// Closest point of approach between two bodies moving at constant velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    /// Seconds from now until CPA (0 if already diverging).
    pub time: f64,
    /// Separation at CPA (meters).
    pub distance: f64,
    /// Observer position at CPA.
    pub observer_position: DVec3,
    /// Target position at CPA.
    pub target_position: DVec3,
}

/// Distance between two bodies (meters).
pub fn range(observer: &Kinematics, target: &Kinematics) -> f64 {
    observer.position.distance(target.position)
}

/// Rate at which the separation shrinks (m/s). Positive when closing.
pub fn closing_speed(observer: &Kinematics, target: &Kinematics) -> f64 {
    let rel_pos = target.position - observer.position;
    let rel_vel = target.velocity - observer.velocity;
    let dist = rel_pos.length();
    if dist < INTERCEPT_EPSILON {
        return 0.0;
    }
    -rel_pos.dot(rel_vel) / dist
}

/// Component of relative velocity perpendicular to the line of sight (m/s).
pub fn lateral_speed(rel_pos: DVec3, rel_vel: DVec3) -> f64 {
    let dist = rel_pos.length();
    if dist < INTERCEPT_EPSILON {
        return rel_vel.length();
    }
    let los = rel_pos / dist;
    (rel_vel - los * rel_vel.dot(los)).length()
}

/// Closest point of approach assuming both bodies hold their velocity.
pub fn closest_approach(observer: &Kinematics, target: &Kinematics) -> ClosestApproach {
    let rel_pos = target.position - observer.position;
    let rel_vel = target.velocity - observer.velocity;
    let speed_sq = rel_vel.length_squared();
    let time = if speed_sq < INTERCEPT_EPSILON {
        0.0
    } else {
        (-rel_pos.dot(rel_vel) / speed_sq).max(0.0)
    };
    let observer_position = observer.predict(time);
    let target_position = target.predict(time);
    ClosestApproach {
        time,
        distance: observer_position.distance(target_position),
        observer_position,
        target_position,
    }
}

/// Smallest positive `t` with `|rel_pos + rel_vel·t| = speed·t`.
///
/// `rel_pos`/`rel_vel` are the target's position and velocity relative to
/// the shooter (or pursuer). Returns `None` when no intercept exists.
pub fn solve_intercept_time(rel_pos: DVec3, rel_vel: DVec3, speed: f64) -> Option<f64> {
    let c = rel_pos.length_squared();
    if c == 0.0 {
        return Some(0.0);
    }
    if speed.is_nan() || speed <= 0.0 {
        return None;
    }
    let a = rel_vel.length_squared() - speed * speed;
    let b = 2.0 * rel_pos.dot(rel_vel);

    if a.abs() < INTERCEPT_EPSILON {
        // Target speed equals projectile speed: b·t + c = 0.
        if b < 0.0 {
            return Some(-c / b);
        }
        return None;
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t1 = (-b - sq) / (2.0 * a);
    let t2 = (-b + sq) / (2.0 * a);
    [t1, t2]
        .into_iter()
        .filter(|t| t.is_finite() && *t > 0.0)
        .reduce(f64::min)
}

/// Predicted meeting point for a constant-speed projectile or pursuer.
/// Returns the point and the time to reach it.
pub fn lead_point(shooter: &Kinematics, target: &Kinematics, speed: f64) -> Option<(DVec3, f64)> {
    let rel_pos = target.position - shooter.position;
    let rel_vel = target.velocity - shooter.velocity;
    let t = solve_intercept_time(rel_pos, rel_vel, speed)?;
    Some((target.predict(t), t))
}
