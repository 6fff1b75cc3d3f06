//! Lattice bond axes.
//!
//! Bonds only ever run along a lattice axis. Every bond computation is
//! done as if the bond pointed along +X; these helpers map Y and Z
//! bonds into that canonical frame and back.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Axis a bond runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondAxis {
    X,
    Y,
    Z,
}

impl BondAxis {
    /// Classifies a nominal offset between two voxel centres.
    ///
    /// Returns `None` for oblique (or zero) offsets.
    pub fn from_offset(offset: DVec3) -> Option<BondAxis> {
        match (offset.x != 0.0, offset.y != 0.0, offset.z != 0.0) {
            (true, false, false) => Some(BondAxis::X),
            (false, true, false) => Some(BondAxis::Y),
            (false, false, true) => Some(BondAxis::Z),
            _ => None,
        }
    }

    /// 0 for X, 1 for Y, 2 for Z.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            BondAxis::X => 0,
            BondAxis::Y => 1,
            BondAxis::Z => 2,
        }
    }

    /// The two axes perpendicular to this one, in ascending order.
    pub fn lateral(self) -> [usize; 2] {
        match self {
            BondAxis::X => [1, 2],
            BondAxis::Y => [0, 2],
            BondAxis::Z => [0, 1],
        }
    }

    /// Maps a vector from world orientation into the canonical +X bond frame.
    #[inline]
    pub fn to_x_dir(self, v: DVec3) -> DVec3 {
        match self {
            BondAxis::X => v,
            BondAxis::Y => DVec3::new(v.y, -v.x, v.z),
            BondAxis::Z => DVec3::new(v.z, v.y, -v.x),
        }
    }

    /// Maps an orientation into the canonical +X bond frame.
    #[inline]
    pub fn to_x_dir_quat(self, q: DQuat) -> DQuat {
        match self {
            BondAxis::X => q,
            BondAxis::Y => DQuat::from_xyzw(q.y, -q.x, q.z, q.w),
            BondAxis::Z => DQuat::from_xyzw(q.z, q.y, -q.x, q.w),
        }
    }

    /// Inverse of [`BondAxis::to_x_dir`].
    #[inline]
    pub fn to_orig_dir(self, v: DVec3) -> DVec3 {
        match self {
            BondAxis::X => v,
            BondAxis::Y => DVec3::new(-v.y, v.x, v.z),
            BondAxis::Z => DVec3::new(-v.z, v.y, v.x),
        }
    }
}

/// One of the six lattice bond slots of a voxel.
///
/// Even slots point along the positive axis (this voxel is the bond's
/// first voxel), odd slots along the negative axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondDir {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl BondDir {
    pub const ALL: [BondDir; 6] = [
        BondDir::PosX,
        BondDir::NegX,
        BondDir::PosY,
        BondDir::NegY,
        BondDir::PosZ,
        BondDir::NegZ,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// True for the negative-direction slots, where the voxel is the bond's second voxel.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.index() % 2 == 1
    }

    pub fn axis(self) -> BondAxis {
        match self {
            BondDir::PosX | BondDir::NegX => BondAxis::X,
            BondDir::PosY | BondDir::NegY => BondAxis::Y,
            BondDir::PosZ | BondDir::NegZ => BondAxis::Z,
        }
    }

    /// Slot for the positive (`negative == false`) or negative side of `axis`.
    pub fn from_axis(axis: BondAxis, negative: bool) -> BondDir {
        BondDir::ALL[axis.index() * 2 + usize::from(negative)]
    }

    /// Integer lattice step for this direction.
    pub fn offset(self) -> [i32; 3] {
        match self {
            BondDir::PosX => [1, 0, 0],
            BondDir::NegX => [-1, 0, 0],
            BondDir::PosY => [0, 1, 0],
            BondDir::NegY => [0, -1, 0],
            BondDir::PosZ => [0, 0, 1],
            BondDir::NegZ => [0, 0, -1],
        }
    }
}
