//! Quaternion helpers.
//!
//! `glam` covers the algebra; these functions add the conversions the
//! bond law needs with the exact degenerate-case behavior it relies on.

use std::f64::consts::PI;

use glam::{DQuat, DVec3};
use voxsim_types::Scalar;

use crate::precision::Precision;

/// Converts a unit quaternion to a rotation vector (axis × angle).
///
/// Identity (and any `w >= 1` from rounding) maps to the zero vector.
pub fn to_rotation_vector(q: DQuat) -> DVec3 {
    let square_length = 1.0 - q.w * q.w;
    if square_length <= 0.0 {
        return DVec3::ZERO;
    }
    let w = q.w.min(1.0);
    DVec3::new(q.x, q.y, q.z) * (2.0 * w.acos() / square_length.sqrt())
}

/// Builds a unit quaternion from a rotation vector (axis × angle).
pub fn from_rotation_vector(v: DVec3) -> DQuat {
    let angle = v.length();
    if angle == 0.0 {
        return DQuat::IDENTITY;
    }
    DQuat::from_axis_angle(v / angle, angle)
}

/// Returns the rotation that takes direction `v` onto +X.
///
/// Nearly-aligned inputs use a first-order approximation, an exactly
/// reversed input returns a half turn about Y, and the zero vector
/// returns identity.
pub fn align_to_pos_x(v: DVec3, precision: Precision) -> DQuat {
    if v == DVec3::ZERO {
        return DQuat::IDENTITY;
    }

    let small = precision.small_angle_rad();
    if v.x > 0.0 {
        let y_over_x = v.y / v.x;
        let z_over_x = v.z / v.x;
        if y_over_x.abs() < small && z_over_x.abs() < small {
            let y = 0.5 * z_over_x;
            let z = -0.5 * y_over_x;
            return DQuat::from_xyzw(0.0, y, z, 1.0 - 0.5 * (y * y + z * z));
        }
    }

    let n = v.normalize();
    let theta = n.x.clamp(-1.0, 1.0).acos();
    if theta > PI - precision.discard_angle_rad() {
        return DQuat::from_xyzw(0.0, 1.0, 0.0, 0.0);
    }

    let axis_mag_inv = 1.0 / (n.z * n.z + n.y * n.y).sqrt();
    let half = 0.5 * theta;
    let s = half.sin();
    DQuat::from_xyzw(0.0, n.z * axis_mag_inv * s, -n.y * axis_mag_inv * s, half.cos())
}

/// Rotates `v` by the inverse of unit quaternion `q`.
#[inline]
pub fn rotate_inv(q: DQuat, v: DVec3) -> DVec3 {
    q.conjugate() * v
}

/// Total rotation angle of a unit quaternion (radians).
pub fn angle(q: DQuat) -> Scalar {
    2.0 * q.w.min(1.0).acos()
}

/// Renormalizes `q`, snapping to identity once `w` reaches one.
pub fn normalize_fast(q: DQuat) -> DQuat {
    let l = q.length();
    if l == 0.0 {
        return DQuat::IDENTITY;
    }
    let n = q / l;
    if n.w >= 1.0 {
        DQuat::IDENTITY
    } else {
        n
    }
}
