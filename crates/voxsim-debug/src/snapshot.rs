//! State snapshots for replay and debugging.
//!
//! A snapshot records the kinematic state of every voxel and the history
//! state of every internal bond. Two runs of the same input should produce
//! identical snapshots at the same step; [`StateSnapshot::diff`] shows
//! where they part.

use std::path::Path;

use serde::{Deserialize, Serialize};
use voxsim_solver::{Bond, Simulation};
use voxsim_types::{VoxsimError, VoxsimResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelState {
    pub position: [f64; 3],
    /// Quaternion as `[x, y, z, w]`.
    pub orientation: [f64; 4],
    pub linear_momentum: [f64; 3],
    pub angular_momentum: [f64; 3],
    pub scale: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondState {
    pub strain: f64,
    pub stress: f64,
    pub max_strain: f64,
    pub strain_offset: f64,
    pub yielded: bool,
    pub broken: bool,
}

/// Serialized with `bincode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub step: u64,
    pub time: f64,
    pub voxels: Vec<VoxelState>,
    /// Internal bonds only; collision bonds are rebuilt on demand.
    pub bonds: Vec<BondState>,
}

/// Largest differences between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnapshotDiff {
    pub max_position_delta: f64,
    pub max_strain_delta: f64,
    /// Bonds whose yielded or broken flags differ.
    pub flag_mismatches: usize,
}

impl SnapshotDiff {
    pub fn is_identical(&self) -> bool {
        self.max_position_delta == 0.0 && self.max_strain_delta == 0.0 && self.flag_mismatches == 0
    }
}

impl StateSnapshot {
    pub fn capture(sim: &Simulation) -> Self {
        let voxels = sim
            .voxels()
            .iter()
            .map(|v| VoxelState {
                position: v.position.to_array(),
                orientation: v.orientation.to_array(),
                linear_momentum: v.linear_momentum.to_array(),
                angular_momentum: v.angular_momentum.to_array(),
                scale: v.scale,
                pressure: v.pressure,
            })
            .collect();
        let bonds = sim
            .bonds()
            .iter()
            .filter_map(|b| match b {
                Bond::Internal(b) => Some(BondState {
                    strain: b.strain,
                    stress: b.stress,
                    max_strain: b.max_strain,
                    strain_offset: b.strain_offset,
                    yielded: b.yielded,
                    broken: b.broken,
                }),
                Bond::Collision(_) => None,
            })
            .collect();
        Self {
            step: sim.step_count(),
            time: sim.time(),
            voxels,
            bonds,
        }
    }

    pub fn to_bytes(&self) -> VoxsimResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| VoxsimError::Serialization(format!("snapshot encoding failed: {e}")))
    }

    pub fn from_bytes(data: &[u8]) -> VoxsimResult<Self> {
        bincode::deserialize(data).map_err(|e| VoxsimError::Serialization(format!("snapshot decoding failed: {e}")))
    }

    pub fn write(&self, path: &Path) -> VoxsimResult<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> VoxsimResult<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Compares two snapshots of the same lattice.
    pub fn diff(&self, other: &StateSnapshot) -> VoxsimResult<SnapshotDiff> {
        if self.voxels.len() != other.voxels.len() || self.bonds.len() != other.bonds.len() {
            return Err(VoxsimError::InvalidLattice(format!(
                "snapshots differ in shape: {}/{} voxels, {}/{} bonds",
                self.voxels.len(),
                other.voxels.len(),
                self.bonds.len(),
                other.bonds.len()
            )));
        }
        let mut diff = SnapshotDiff::default();
        for (a, b) in self.voxels.iter().zip(&other.voxels) {
            let delta = a
                .position
                .iter()
                .zip(&b.position)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt();
            diff.max_position_delta = diff.max_position_delta.max(delta);
        }
        for (a, b) in self.bonds.iter().zip(&other.bonds) {
            diff.max_strain_delta = diff.max_strain_delta.max((a.strain - b.strain).abs());
            if a.yielded != b.yielded || a.broken != b.broken {
                diff.flag_mismatches += 1;
            }
        }
        Ok(diff)
    }
}
