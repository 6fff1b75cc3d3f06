//! Per-step aggregate statistics.

use serde::{Deserialize, Serialize};
use voxsim_math::DVec3;
use voxsim_types::Scalar;

/// Which statistics to compute after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatMask(pub u16);

impl StatMask {
    pub const NONE: StatMask = StatMask(0);
    pub const CENTER_OF_MASS: StatMask = StatMask(1 << 0);
    pub const DISPLACEMENT: StatMask = StatMask(1 << 1);
    pub const VELOCITY: StatMask = StatMask(1 << 2);
    pub const KINETIC_ENERGY: StatMask = StatMask(1 << 3);
    pub const STRAIN_ENERGY: StatMask = StatMask(1 << 4);
    pub const ENG_STRAIN: StatMask = StatMask(1 << 5);
    pub const ENG_STRESS: StatMask = StatMask(1 << 6);
    pub const PRESSURE: StatMask = StatMask(1 << 7);
    pub const ALL: StatMask = StatMask(0xff);

    #[inline]
    pub fn contains(self, other: StatMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for StatMask {
    fn default() -> Self {
        StatMask::ALL
    }
}

impl std::ops::BitOr for StatMask {
    type Output = StatMask;

    fn bitor(self, rhs: StatMask) -> StatMask {
        StatMask(self.0 | rhs.0)
    }
}

/// Whole-object statistics of the most recent step.
///
/// Fields outside the configured [`StatMask`] keep their last value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimStats {
    pub center_of_mass: DVec3,
    pub initial_center_of_mass: DVec3,
    /// Distance the centre of mass has travelled from its initial position.
    pub total_displacement: Scalar,
    /// `total_displacement` in lattice dimensions.
    pub normalized_displacement: Scalar,

    pub max_voxel_displacement: Scalar,
    pub max_voxel_velocity: Scalar,
    pub max_voxel_kinetic_energy: Scalar,
    /// Largest single-voxel move during the last step.
    pub max_move: Scalar,

    pub max_bond_strain: Scalar,
    pub max_bond_stress: Scalar,
    pub max_bond_strain_energy: Scalar,

    pub total_kinetic_energy: Scalar,
    pub total_strain_energy: Scalar,

    pub max_pressure: Scalar,
    pub min_pressure: Scalar,

    pub yielded_bonds: usize,
    pub broken_bonds: usize,
    pub voxels_on_floor: usize,
}

impl SimStats {
    /// Kinetic plus strain energy.
    pub fn total_energy(&self) -> Scalar {
        self.total_kinetic_energy + self.total_strain_energy
    }
}

/// Reaction and motion summary of one boundary region.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionStats {
    pub name: String,
    pub voxel_count: usize,
    /// Sum of the bond forces acting on the region's voxels.
    pub force: DVec3,
    /// `force` projected on the prescribed displacement direction.
    pub force_along_displacement: Scalar,
    /// Mean displacement of the region's voxels from nominal.
    pub average_displacement: DVec3,
}
