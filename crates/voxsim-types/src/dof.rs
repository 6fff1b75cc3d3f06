//! Degree-of-freedom bitmask.
//!
//! Bits 0..2 are the X/Y/Z translations, bits 3..5 the X/Y/Z rotations.
//! A set bit means the DOF is fixed to its prescribed value.

use serde::{Deserialize, Serialize};

/// Fixed-DOF mask for a voxel or boundary region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dof(pub u8);

impl Dof {
    pub const NONE: Dof = Dof(0);
    pub const X: Dof = Dof(1 << 0);
    pub const Y: Dof = Dof(1 << 1);
    pub const Z: Dof = Dof(1 << 2);
    pub const TX: Dof = Dof(1 << 3);
    pub const TY: Dof = Dof(1 << 4);
    pub const TZ: Dof = Dof(1 << 5);
    pub const TRANSLATION: Dof = Dof(0b000_111);
    pub const ROTATION: Dof = Dof(0b111_000);
    pub const ALL: Dof = Dof(0b111_111);

    /// Returns true if every DOF in `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: Dof) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no DOF is fixed.
    #[inline]
    pub fn is_free(self) -> bool {
        self.0 == 0
    }

    /// Returns true if all six DOF are fixed.
    #[inline]
    pub fn is_all_fixed(self) -> bool {
        self.contains(Dof::ALL)
    }

    /// Returns true if the translation along `axis` (0 = X, 1 = Y, 2 = Z) is fixed.
    #[inline]
    pub fn translation_fixed(self, axis: usize) -> bool {
        axis < 3 && self.0 & (1 << axis) != 0
    }

    /// Returns true if the rotation about `axis` (0 = X, 1 = Y, 2 = Z) is fixed.
    #[inline]
    pub fn rotation_fixed(self, axis: usize) -> bool {
        axis < 3 && self.0 & (1 << (axis + 3)) != 0
    }
}

impl std::ops::BitOr for Dof {
    type Output = Dof;

    fn bitor(self, rhs: Dof) -> Dof {
        Dof(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Dof {
    fn bitor_assign(&mut self, rhs: Dof) {
        self.0 |= rhs.0;
    }
}
