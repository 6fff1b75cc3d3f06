//! Spatial hash broad phase for uniform-grid collision detection.
//!
//! Partitions space into a uniform grid and bins points into cells.
//! Candidate pairs are generated from points in the same or adjacent cells,
//! so any two points closer than one cell size are always reported.

use std::collections::HashMap;

use voxsim_math::DVec3;
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

use crate::broad::{BroadPhase, CandidatePair};

/// Spatial hash broad phase using a uniform grid.
///
/// Cell size should be at least the largest distance at which a pair matters.
pub struct SpatialHash {
    /// Inverse cell size (cached for performance).
    inv_cell_size: Scalar,
    /// Hash map from cell key to list of point indices.
    grid: HashMap<(i64, i64, i64), Vec<u32>>,
}

impl SpatialHash {
    /// Create a new spatial hash with the given cell size.
    pub fn new(cell_size: Scalar) -> Self {
        let cell_size = cell_size.max(1e-9);
        Self {
            inv_cell_size: 1.0 / cell_size,
            grid: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> Scalar {
        1.0 / self.inv_cell_size
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.grid.len()
    }

    /// Hash a position to a cell key.
    fn cell_key(&self, p: DVec3) -> (i64, i64, i64) {
        let c = (p * self.inv_cell_size).floor();
        (c.x as i64, c.y as i64, c.z as i64)
    }
}

impl BroadPhase for SpatialHash {
    fn update(&mut self, points: &[DVec3]) -> VoxsimResult<()> {
        self.grid.clear();

        for (i, &p) in points.iter().enumerate() {
            if !p.is_finite() {
                return Err(VoxsimError::InvariantViolation(format!(
                    "point {i} has non-finite position {p:?}"
                )));
            }
            self.grid.entry(self.cell_key(p)).or_default().push(i as u32);
        }

        Ok(())
    }

    fn query_pairs(&self) -> Vec<CandidatePair> {
        let mut pairs = Vec::new();

        for (&(cx, cy, cz), points) in &self.grid {
            // Pairs within the cell
            for i in 0..points.len() {
                for j in (i + 1)..points.len() {
                    pairs.push(CandidatePair::new(points[i], points[j]));
                }
            }

            // Pairs with the 26 neighbouring cells, visiting each cell pair once
            for dx in -1..=1_i64 {
                for dy in -1..=1_i64 {
                    for dz in -1..=1_i64 {
                        let nkey = (cx + dx, cy + dy, cz + dz);
                        if nkey <= (cx, cy, cz) {
                            continue;
                        }

                        if let Some(neighbors) = self.grid.get(&nkey) {
                            for &a in points {
                                for &b in neighbors {
                                    pairs.push(CandidatePair::new(a, b));
                                }
                            }
                        }
                    }
                }
            }
        }

        pairs.sort_unstable();
        pairs
    }

    fn name(&self) -> &str {
        "spatial_hash"
    }
}
