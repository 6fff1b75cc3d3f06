//! Lattice connectivity queries.
//!
//! Two occupied cells are connected when they share a face. These
//! queries back the pre-flight checks (floating clusters) and the
//! collision broad phase (surface cells, bond-hop exclusion).

use std::collections::VecDeque;

use glam::DVec3;
use voxsim_math::BondDir;

use crate::boundary::BoundaryRegion;
use crate::lattice::VoxelLattice;

/// Precomputed face-neighbour table for the occupied cells of a lattice.
#[derive(Debug, Clone)]
pub struct Topology {
    /// Flat lattice index of each occupied cell, in index order.
    pub cells: Vec<usize>,

    /// For each occupied cell, the position in `cells` of its neighbour
    /// in each [`BondDir`] slot.
    pub neighbors: Vec<[Option<u32>; 6]>,
}

impl Topology {
    pub fn build(lattice: &VoxelLattice) -> Self {
        let cells: Vec<usize> = lattice.occupied().map(|(i, _)| i).collect();
        let mut slot = vec![u32::MAX; lattice.cell_count()];
        for (n, &cell) in cells.iter().enumerate() {
            slot[cell] = n as u32;
        }

        let neighbors = cells
            .iter()
            .map(|&cell| BondDir::ALL.map(|dir| lattice.neighbor(cell, dir).map(|n| slot[n])))
            .collect();

        Self { cells, neighbors }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of face neighbours of occupied cell `n`.
    pub fn neighbor_count(&self, n: usize) -> usize {
        self.neighbors[n].iter().flatten().count()
    }

    /// A cell with fewer than six neighbours lies on the surface.
    pub fn is_surface(&self, n: usize) -> bool {
        self.neighbor_count(n) < 6
    }

    /// Connected clusters of occupied cells, each listed in BFS order.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.len()];
        let mut components = Vec::new();
        for start in 0..self.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(n) = queue.pop_front() {
                component.push(n);
                for m in self.neighbors[n].iter().flatten() {
                    let m = *m as usize;
                    if !seen[m] {
                        seen[m] = true;
                        queue.push_back(m);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// Cells reachable from `start` in at most `hops` bond hops, excluding `start`.
    pub fn within_hops(&self, start: usize, hops: usize) -> Vec<usize> {
        let mut depth = vec![usize::MAX; self.len()];
        depth[start] = 0;
        let mut queue = VecDeque::from([start]);
        let mut found = Vec::new();
        while let Some(n) = queue.pop_front() {
            if depth[n] == hops {
                continue;
            }
            for m in self.neighbors[n].iter().flatten() {
                let m = *m as usize;
                if depth[m] == usize::MAX {
                    depth[m] = depth[n] + 1;
                    found.push(m);
                    queue.push_back(m);
                }
            }
        }
        found
    }
}

/// Empties every occupied cell that is not connected, through face
/// neighbours, to a cell touched by a fully fixed region. Cells with no
/// neighbours at all are removed too. Returns the number of cells emptied.
pub fn remove_disconnected(lattice: &mut VoxelLattice, regions: &[BoundaryRegion]) -> usize {
    let topology = Topology::build(lattice);
    let envelope = lattice.workspace();
    let half = DVec3::splat(0.5 * lattice.voxel_size());

    let mut keep = vec![false; topology.len()];
    let mut queue: VecDeque<usize> = (0..topology.len())
        .filter(|&n| {
            let center = lattice.cell_center(topology.cells[n]);
            regions
                .iter()
                .any(|r| r.is_all_fixed() && r.touches(center, half, envelope))
        })
        .collect();
    for &n in &queue {
        keep[n] = true;
    }
    while let Some(n) = queue.pop_front() {
        for m in topology.neighbors[n].iter().flatten() {
            let m = *m as usize;
            if !keep[m] {
                keep[m] = true;
                queue.push_back(m);
            }
        }
    }

    let mut removed = 0;
    for (n, &cell) in topology.cells.iter().enumerate() {
        if !keep[n] || topology.neighbor_count(n) == 0 {
            lattice.clear_cell(cell);
            removed += 1;
        }
    }
    removed
}
