//! Integration tests for voxsim-math.

use std::f64::consts::{FRAC_PI_2, PI};

use voxsim_math::quat::{align_to_pos_x, from_rotation_vector, rotate_inv, to_rotation_vector};
use voxsim_math::{BondAxis, BondDir, DQuat, DVec3, Precision};

fn approx_vec(a: DVec3, b: DVec3, tol: f64) -> bool {
    (a - b).length() < tol
}

// ─── Rotation Vector Tests ────────────────────────────────────

#[test]
fn identity_has_zero_rotation_vector() {
    assert_eq!(to_rotation_vector(DQuat::IDENTITY), DVec3::ZERO);
}

#[test]
fn rotation_vector_of_quarter_turn() {
    let q = DQuat::from_axis_angle(DVec3::Z, FRAC_PI_2);
    let v = to_rotation_vector(q);
    assert!(approx_vec(v, DVec3::new(0.0, 0.0, FRAC_PI_2), 1e-12), "got {v:?}");
}

#[test]
fn rotation_vector_inverts_from_rotation_vector() {
    let v = DVec3::new(0.1, -0.4, 0.25);
    let back = to_rotation_vector(from_rotation_vector(v));
    assert!(approx_vec(v, back, 1e-12), "got {back:?}");
}

#[test]
fn zero_rotation_vector_is_identity() {
    assert_eq!(from_rotation_vector(DVec3::ZERO), DQuat::IDENTITY);
}

#[test]
fn rotate_inv_undoes_rotation() {
    let q = DQuat::from_axis_angle(DVec3::new(1.0, 1.0, 0.0).normalize(), 0.7);
    let v = DVec3::new(0.3, -0.2, 0.9);
    let back = rotate_inv(q, q * v);
    assert!(approx_vec(v, back, 1e-12));
}

// ─── Align To +X Tests ────────────────────────────────────────

#[test]
fn align_of_x_axis_is_identity() {
    let q = align_to_pos_x(DVec3::X, Precision::Medium);
    assert!((q.w - 1.0).abs() < 1e-12);
}

#[test]
fn align_maps_direction_onto_x() {
    let v = DVec3::new(1.0, 2.0, -0.5);
    let q = align_to_pos_x(v, Precision::Medium);
    let rotated = q * v;
    assert!(approx_vec(rotated, DVec3::new(v.length(), 0.0, 0.0), 1e-9), "got {rotated:?}");
}

#[test]
fn align_small_angle_is_first_order_accurate() {
    let v = DVec3::new(1.0, 1e-4, -2e-4);
    let q = align_to_pos_x(v, Precision::Medium);
    let rotated = q * v;
    assert!(rotated.y.abs() < 1e-7 && rotated.z.abs() < 1e-7, "got {rotated:?}");
}

#[test]
fn align_reversed_is_half_turn() {
    let q = align_to_pos_x(-DVec3::X, Precision::Medium);
    assert_eq!(q, DQuat::from_xyzw(0.0, 1.0, 0.0, 0.0));
    let rotated = q * -DVec3::X;
    assert!(approx_vec(rotated, DVec3::X, 1e-12));
}

#[test]
fn align_zero_vector_is_identity() {
    assert_eq!(align_to_pos_x(DVec3::ZERO, Precision::High), DQuat::IDENTITY);
}

// ─── Bond Axis Tests ──────────────────────────────────────────

#[test]
fn axis_from_offset() {
    assert_eq!(BondAxis::from_offset(DVec3::new(0.001, 0.0, 0.0)), Some(BondAxis::X));
    assert_eq!(BondAxis::from_offset(DVec3::new(0.0, -1.0, 0.0)), Some(BondAxis::Y));
    assert_eq!(BondAxis::from_offset(DVec3::new(0.0, 0.0, 2.0)), Some(BondAxis::Z));
    assert_eq!(BondAxis::from_offset(DVec3::new(1.0, 1.0, 0.0)), None);
    assert_eq!(BondAxis::from_offset(DVec3::ZERO), None);
}

#[test]
fn to_x_dir_maps_bond_axis_onto_x() {
    assert_eq!(BondAxis::Y.to_x_dir(DVec3::Y), DVec3::X);
    assert_eq!(BondAxis::Z.to_x_dir(DVec3::Z), DVec3::X);
}

#[test]
fn to_orig_dir_inverts_to_x_dir() {
    let v = DVec3::new(0.3, -1.2, 4.5);
    for axis in [BondAxis::X, BondAxis::Y, BondAxis::Z] {
        assert_eq!(axis.to_orig_dir(axis.to_x_dir(v)), v, "axis {axis:?}");
    }
}

#[test]
fn quaternion_frame_change_matches_vector_frame_change() {
    let q = DQuat::from_axis_angle(DVec3::new(0.2, 0.9, -0.1).normalize(), 0.4);
    let v = DVec3::new(0.5, 0.1, -0.7);
    for axis in [BondAxis::Y, BondAxis::Z] {
        let lhs = axis.to_x_dir_quat(q) * axis.to_x_dir(v);
        let rhs = axis.to_x_dir(q * v);
        assert!(approx_vec(lhs, rhs, 1e-12), "axis {axis:?}: {lhs:?} vs {rhs:?}");
    }
}

#[test]
fn bond_dir_layout() {
    assert_eq!(BondDir::from_axis(BondAxis::Y, true), BondDir::NegY);
    assert!(BondDir::NegZ.is_negative());
    assert!(!BondDir::PosX.is_negative());
    assert_eq!(BondDir::PosZ.axis(), BondAxis::Z);
    assert_eq!(BondDir::NegX.offset(), [-1, 0, 0]);
}

// ─── Precision Tests ──────────────────────────────────────────

#[test]
fn precision_thresholds_tighten() {
    let all = Precision::all();
    for pair in all.windows(2) {
        assert!(pair[1].small_angle_rad() < pair[0].small_angle_rad());
        assert!(pair[1].bond_bend_rad() < pair[0].bond_bend_rad());
    }
}

#[test]
fn hysteresis_band_is_wider() {
    let p = Precision::Medium;
    assert!(p.smallish_angle_w() < p.small_angle_w());
    assert!(p.small_angle_w() < 1.0);
    assert!(PI > p.small_angle_rad());
}
