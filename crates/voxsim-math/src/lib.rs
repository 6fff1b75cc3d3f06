//! # voxsim-math
//!
//! Vector and rotation primitives for the voxsim lattice engine.
//!
//! Provides:
//! - Re-exports of the double-precision `glam` types (`DVec3`, `DQuat`)
//! - Rotation-vector conversions and the align-to-+X rotation used by bonds
//! - Bond axes and the canonical +X frame rotations
//! - Runtime precision presets for small-angle approximations

pub mod axis;
pub mod precision;
pub mod quat;

// Re-export glam types as the canonical math types for voxsim.
pub use glam::{DQuat, DVec3};

pub use axis::{BondAxis, BondDir};
pub use precision::Precision;
