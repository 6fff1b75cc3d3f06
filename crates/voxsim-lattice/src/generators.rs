//! Procedural lattice generators for benchmarks and testing.
//!
//! Every generator fills a lattice that is exactly as large as the object,
//! so normalized boundary regions line up with the object's faces.

use voxsim_types::{MaterialId, Scalar};

use crate::lattice::VoxelLattice;

/// A straight chain of `n` voxels along X.
///
/// # Example
/// ```
/// use voxsim_lattice::generators::chain;
/// use voxsim_types::MaterialId;
/// let lattice = chain(20, 0.001, MaterialId(1));
/// assert_eq!(lattice.occupied_count(), 20);
/// assert_eq!(lattice.dims(), [20, 1, 1]);
/// ```
pub fn chain(n: usize, voxel_size: Scalar, material: MaterialId) -> VoxelLattice {
    block([n, 1, 1], voxel_size, material)
}

/// A solid box of `dims` voxels, all of one material.
pub fn block(dims: [usize; 3], voxel_size: Scalar, material: MaterialId) -> VoxelLattice {
    VoxelLattice::from_fn(dims, voxel_size, |_| material)
}

/// A solid box alternating two materials in a 3D checkerboard.
pub fn checkerboard(dims: [usize; 3], voxel_size: Scalar, a: MaterialId, b: MaterialId) -> VoxelLattice {
    VoxelLattice::from_fn(dims, voxel_size, |[i, j, k]| if (i + j + k) % 2 == 0 { a } else { b })
}

/// A solid box whose lower `split` layers (along Z) use `bottom`, the rest `top`.
pub fn layered(dims: [usize; 3], voxel_size: Scalar, split: usize, bottom: MaterialId, top: MaterialId) -> VoxelLattice {
    VoxelLattice::from_fn(dims, voxel_size, |[_, _, k]| if k < split { bottom } else { top })
}
