//! Vector and rotation helpers.
//!
//! Frame convention: ship forward is +X, up is +Z. A heading of
//! (pitch, yaw) points along `(cos p cos y, cos p sin y, sin p)`, and a full
//! attitude is the intrinsic rotation `Rz(yaw) · Ry(-pitch) · Rx(roll)`.

use glam::{DQuat, DVec3, EulerRot};

use crate::types::{Attitude, Heading};

/// Vectors shorter than this are treated as zero when extracting directions.
pub const DIRECTION_EPSILON: f64 = 1e-9;

/// Wrap an angle in degrees into [-180, 180).
pub fn normalize_angle(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Signed smallest difference `a - b` in degrees, in [-180, 180).
pub fn angle_difference(a: f64, b: f64) -> f64 {
    normalize_angle(a - b)
}

/// Normalize every component of an attitude into [-180, 180).
pub fn normalize_attitude(attitude: Attitude) -> Attitude {
    Attitude {
        pitch: normalize_angle(attitude.pitch),
        yaw: normalize_angle(attitude.yaw),
        roll: normalize_angle(attitude.roll),
    }
}

/// Build the rotation quaternion for an attitude given in degrees.
pub fn attitude_to_quat(attitude: &Attitude) -> DQuat {
    DQuat::from_euler(
        EulerRot::ZYX,
        attitude.yaw.to_radians(),
        (-attitude.pitch).to_radians(),
        attitude.roll.to_radians(),
    )
}

/// Extract a normalized attitude (degrees) from a rotation quaternion.
pub fn quat_to_attitude(rotation: DQuat) -> Attitude {
    let (yaw, neg_pitch, roll) = rotation.normalize().to_euler(EulerRot::ZYX);
    Attitude {
        pitch: normalize_angle(-neg_pitch.to_degrees()),
        yaw: normalize_angle(yaw.to_degrees()),
        roll: normalize_angle(roll.to_degrees()),
    }
}

/// Unit vector for a heading.
pub fn heading_to_vector(heading: &Heading) -> DVec3 {
    let p = heading.pitch.to_radians();
    let y = heading.yaw.to_radians();
    DVec3::new(p.cos() * y.cos(), p.cos() * y.sin(), p.sin())
}

/// Heading of a direction vector, or `None` for a (near) zero vector.
pub fn vector_to_heading(direction: DVec3) -> Option<Heading> {
    let length = direction.length();
    if !length.is_finite() || length < DIRECTION_EPSILON {
        return None;
    }
    let pitch = (direction.z / length).clamp(-1.0, 1.0).asin().to_degrees();
    let yaw = direction.y.atan2(direction.x).to_degrees();
    Some(Heading {
        pitch: normalize_angle(pitch),
        yaw: normalize_angle(yaw),
    })
}

/// Rotation that points the ship along `heading` while keeping `roll`.
pub fn heading_to_quat(heading: &Heading, roll: f64) -> DQuat {
    attitude_to_quat(&Attitude::new(heading.pitch, heading.yaw, roll))
}

/// Angle between two vectors in degrees. Zero if either is degenerate.
pub fn angle_between(a: DVec3, b: DVec3) -> f64 {
    let denom = a.length() * b.length();
    if denom < DIRECTION_EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Bearing of a world-frame direction relative to an observer's attitude.
///
/// Approximation: the observer's roll is ignored and pitch/yaw are
/// subtracted directly instead of composing full 3D rotations. Accurate for
/// level flight, increasingly wrong at high pitch or roll.
pub fn relative_bearing(observer: &Attitude, direction: DVec3) -> Heading {
    let world = vector_to_heading(direction).unwrap_or_default();
    Heading {
        pitch: angle_difference(world.pitch, observer.pitch),
        yaw: angle_difference(world.yaw, observer.yaw),
    }
}

/// Rotate a vector about the world up axis.
pub fn rotate_about_up(vector: DVec3, yaw_degrees: f64) -> DVec3 {
    DQuat::from_rotation_z(yaw_degrees.to_radians()) * vector
}

/// Replace non-finite components with zero and clamp the magnitude.
/// Returns the sanitized vector and whether anything was changed.
pub fn sanitize_magnitude(vector: DVec3, max_magnitude: f64) -> (DVec3, bool) {
    let (mut v, mut changed) = zero_non_finite(vector);
    if v.length() > max_magnitude {
        v = v.clamp_length_max(max_magnitude);
        changed = true;
    }
    (v, changed)
}

/// Replace non-finite components with zero and clamp each component to
/// `[-bound, bound]`.
pub fn sanitize_components(vector: DVec3, bound: f64) -> (DVec3, bool) {
    let (v, changed) = zero_non_finite(vector);
    let clamped = v.clamp(DVec3::splat(-bound), DVec3::splat(bound));
    (clamped, changed || clamped != v)
}

fn zero_non_finite(vector: DVec3) -> (DVec3, bool) {
    let fix = |c: f64| if c.is_finite() { c } else { 0.0 };
    let v = DVec3::new(fix(vector.x), fix(vector.y), fix(vector.z));
    (v, !vector.is_finite())
}
