//! Read-only views handed to the parallel bond and voxel phases.

use voxsim_contact::FloorContact;
use voxsim_lattice::{ActuationLimit, Temperature};
use voxsim_material::MaterialPalette;
use voxsim_math::Precision;
use voxsim_types::{Scalar, VoxelId};

use crate::bond::Bond;
use crate::config::{Damping, Features, StiffnessAdaptation};
use crate::voxel::{Voxel, VoxelControl};

/// Everything a bond update may read.
#[derive(Clone, Copy)]
pub struct BondContext<'a> {
    pub voxels: &'a [Voxel],
    pub palette: &'a MaterialPalette,
    pub features: Features,
    pub bond_damping: Scalar,
    pub precision: Precision,
    pub temperature: Temperature,
    pub dt: Scalar,
    pub time: Scalar,
}

/// Everything a voxel update may read.
#[derive(Clone, Copy)]
pub struct VoxelContext<'a> {
    pub bonds: &'a [Bond],
    /// Extension outputs, indexed by voxel id. May be shorter than the voxel arena.
    pub controls: &'a [VoxelControl],
    pub features: Features,
    pub damping: Damping,
    /// Gravitational acceleration along Z.
    pub gravity: Scalar,
    pub floor: FloorContact,
    pub fluid_drag: Scalar,
    pub temperature: Temperature,
    pub actuation: ActuationLimit,
    pub max_velocity_fraction: Scalar,
    pub min_temp_factor: Scalar,
    pub init_time: Scalar,
    pub actuation_start_time: Scalar,
    pub development_end_time: Scalar,
    pub stiffness: Option<StiffnessAdaptation>,
    pub dt: Scalar,
    pub time: Scalar,
}

impl VoxelContext<'_> {
    /// Control inputs of `voxel`, or the neutral control when none were written.
    pub fn control(&self, voxel: VoxelId) -> VoxelControl {
        self.controls.get(voxel.index()).copied().unwrap_or_default()
    }
}
