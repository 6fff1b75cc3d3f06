//! Strongly-typed identifiers for simulation entities.
//!
//! Voxels and bonds live in arenas owned by the simulation. Handles are
//! plain indices that never move, so cross references survive cloning
//! and arena growth without any pointer repair.

use serde::{Deserialize, Serialize};

/// Index into the simulation's voxel arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoxelId(pub u32);

/// Index into the simulation's bond arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BondId(pub u32);

/// Index into the material palette. Zero is reserved for empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u16);

impl VoxelId {
    /// Returns the raw index as `usize` for array indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BondId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl MaterialId {
    /// The empty-cell marker.
    pub const EMPTY: MaterialId = MaterialId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true for the empty-cell marker.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for VoxelId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u32> for BondId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u16> for MaterialId {
    fn from(val: u16) -> Self {
        Self(val)
    }
}
