//! Dense voxel lattice.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use voxsim_material::MaterialPalette;
use voxsim_math::BondDir;
use voxsim_types::{MaterialId, Scalar, VoxsimError, VoxsimResult};

/// A regular grid of cubic cells, each empty or holding one material.
///
/// Cell `(i, j, k)` is stored at `i + nx·(j + ny·k)` and its centre sits
/// at `((i, j, k) + 0.5)·voxel_size`, so the workspace spans
/// `[0, dims·voxel_size]` on every axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelLattice {
    dims: [usize; 3],
    voxel_size: Scalar,
    cells: Vec<MaterialId>,
}

impl VoxelLattice {
    /// Creates an all-empty lattice.
    pub fn new(dims: [usize; 3], voxel_size: Scalar) -> Self {
        Self {
            dims,
            voxel_size,
            cells: vec![MaterialId::EMPTY; dims[0] * dims[1] * dims[2]],
        }
    }

    /// Fills every cell with `pick(i, j, k)`.
    pub fn from_fn(dims: [usize; 3], voxel_size: Scalar, pick: impl Fn([usize; 3]) -> MaterialId) -> Self {
        let mut lattice = Self::new(dims, voxel_size);
        for index in 0..lattice.cells.len() {
            let coords = lattice.coords(index);
            lattice.cells[index] = pick(coords);
        }
        lattice
    }

    /// Builds a lattice from a flat cell buffer.
    pub fn from_cells(dims: [usize; 3], voxel_size: Scalar, cells: Vec<MaterialId>) -> VoxsimResult<Self> {
        let lattice = Self {
            dims,
            voxel_size,
            cells,
        };
        lattice.check_shape()?;
        Ok(lattice)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Edge length of one cell in meters.
    pub fn voxel_size(&self) -> Scalar {
        self.voxel_size
    }

    pub fn cells(&self) -> &[MaterialId] {
        &self.cells
    }

    /// Total number of cells, occupied or not.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|m| !m.is_empty()).count()
    }

    /// Flat index of `(i, j, k)`, or `None` outside the lattice.
    pub fn index(&self, i: i64, j: i64, k: i64) -> Option<usize> {
        let [nx, ny, nz] = self.dims.map(|d| d as i64);
        if i < 0 || j < 0 || k < 0 || i >= nx || j >= ny || k >= nz {
            return None;
        }
        Some((i + nx * (j + ny * k)) as usize)
    }

    /// Grid coordinates of a flat index.
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let [nx, ny, _] = self.dims;
        [index % nx, (index / nx) % ny, index / (nx * ny)]
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> MaterialId {
        self.index(i as i64, j as i64, k as i64)
            .map_or(MaterialId::EMPTY, |idx| self.cells[idx])
    }

    pub fn material_at(&self, index: usize) -> MaterialId {
        self.cells.get(index).copied().unwrap_or(MaterialId::EMPTY)
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, material: MaterialId) -> VoxsimResult<()> {
        let idx = self.index(i as i64, j as i64, k as i64).ok_or_else(|| {
            VoxsimError::InvalidLattice(format!(
                "cell ({i}, {j}, {k}) is outside lattice {:?}",
                self.dims
            ))
        })?;
        self.cells[idx] = material;
        Ok(())
    }

    /// Marks cell `index` empty.
    pub fn clear_cell(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = MaterialId::EMPTY;
        }
    }

    /// Occupied neighbour of cell `index` in direction `dir`.
    pub fn neighbor(&self, index: usize, dir: BondDir) -> Option<usize> {
        let [i, j, k] = self.coords(index);
        let [di, dj, dk] = dir.offset();
        let n = self.index(i as i64 + di as i64, j as i64 + dj as i64, k as i64 + dk as i64)?;
        (!self.cells[n].is_empty()).then_some(n)
    }

    /// Iterates `(flat index, material)` over occupied cells in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, MaterialId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_empty())
            .map(|(i, &m)| (i, m))
    }

    /// Nominal centre of cell `index` in meters.
    pub fn cell_center(&self, index: usize) -> DVec3 {
        let [i, j, k] = self.coords(index);
        (DVec3::new(i as f64, j as f64, k as f64) + 0.5) * self.voxel_size
    }

    /// Size of the whole workspace in meters.
    pub fn workspace(&self) -> DVec3 {
        DVec3::new(self.dims[0] as f64, self.dims[1] as f64, self.dims[2] as f64) * self.voxel_size
    }

    /// Checks the grid against a palette: shape, voxel size, and that every
    /// occupied cell names a palette material.
    pub fn validate(&self, palette: &MaterialPalette) -> VoxsimResult<()> {
        self.check_shape()?;
        if self.occupied_count() == 0 {
            return Err(VoxsimError::InvalidLattice("lattice has no occupied cells".into()));
        }
        for (index, material) in self.occupied() {
            if palette.get(material).is_none() {
                return Err(VoxsimError::InvalidLattice(format!(
                    "cell {:?} uses material {} which is not in the palette",
                    self.coords(index),
                    material.0
                )));
            }
        }
        Ok(())
    }

    fn check_shape(&self) -> VoxsimResult<()> {
        if self.dims.iter().any(|&d| d == 0) {
            return Err(VoxsimError::InvalidLattice(format!(
                "lattice dimensions must be non-zero, got {:?}",
                self.dims
            )));
        }
        let expected = self.dims[0] * self.dims[1] * self.dims[2];
        if self.cells.len() != expected {
            return Err(VoxsimError::InvalidLattice(format!(
                "expected {expected} cells for dimensions {:?}, got {}",
                self.dims,
                self.cells.len()
            )));
        }
        if !(self.voxel_size > 0.0 && self.voxel_size.is_finite()) {
            return Err(VoxsimError::InvalidLattice(format!(
                "voxel size must be positive, got {}",
                self.voxel_size
            )));
        }
        Ok(())
    }
}
