//! Runtime precision presets.
//!
//! Each preset trades accuracy of the small-angle approximations against
//! how often bonds fall back to the exact large-angle formulation.

use serde::{Deserialize, Serialize};
use voxsim_types::constants::HYSTERESIS_FACTOR;
use voxsim_types::Scalar;

/// Accuracy preset for small-angle approximations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Precision {
    /// ~0.1% error budget.
    Low,
    /// ~0.01% error budget.
    #[default]
    Medium,
    /// ~0.0001% error budget.
    High,
    /// ~1e-8% error budget.
    Max,
}

impl Precision {
    /// Angles below this (radians) use small-angle approximations.
    pub fn small_angle_rad(self) -> Scalar {
        match self {
            Precision::Low => 0.0548,
            Precision::Medium => 1.732e-2,
            Precision::High => 1.732e-3,
            Precision::Max => 1.732e-5,
        }
    }

    /// Angles below this (radians) are treated as zero.
    pub fn discard_angle_rad(self) -> Scalar {
        match self {
            Precision::Low => 1e-4,
            Precision::Medium | Precision::High => 1e-7,
            Precision::Max => 1e-12,
        }
    }

    /// Turn ratio under which a bond may use the small-angle formulation.
    pub fn bond_bend_rad(self) -> Scalar {
        match self {
            Precision::Low => 0.1,
            Precision::Medium => 0.05,
            Precision::High => 0.02,
            Precision::Max => 0.002,
        }
    }

    /// Quaternion `w` above which a rotation counts as small.
    pub fn small_angle_w(self) -> Scalar {
        (self.small_angle_rad() * 0.5).cos()
    }

    /// Quaternion `w` above which a rotation counts as small-ish (hysteresis band).
    pub fn smallish_angle_w(self) -> Scalar {
        (HYSTERESIS_FACTOR * self.small_angle_rad() * 0.5).cos()
    }

    /// Returns all presets, coarsest first.
    pub fn all() -> &'static [Precision] {
        &[Precision::Low, Precision::Medium, Precision::High, Precision::Max]
    }
}
