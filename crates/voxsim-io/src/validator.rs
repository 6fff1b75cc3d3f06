//! Input validation.
//!
//! Catches data-level errors before a simulation is built: malformed
//! lattices, bad materials, invalid configuration, and boundary
//! conditions that leave parts of the object floating.

use glam::DVec3;
use tracing::debug;
use voxsim_lattice::{BoundaryRegion, Topology, VoxelLattice};
use voxsim_types::{VoxsimError, VoxsimResult};

use crate::contract::SimulationInput;

/// Validates a complete simulation input.
///
/// Checks:
/// - Palette materials and their stress models
/// - Lattice shape, occupancy and material references
/// - Environment, boundary regions and solver config
/// - Without a floor, every connected cluster touches a region fixing translation
pub fn validate_input(input: &SimulationInput) -> VoxsimResult<()> {
    input.palette.validate()?;
    input.lattice.validate(&input.palette)?;
    input.environment.validate()?;
    input.config.validate()?;
    if let Some(tensile) = &input.tensile {
        if tensile.increments == 0 {
            return Err(VoxsimError::InvalidConfig("tensile test needs at least one increment".into()));
        }
    }
    if !input.environment.floor.enabled {
        check_anchoring(&input.lattice, &input.environment.regions)?;
    }
    debug!(
        voxels = input.lattice.occupied_count(),
        materials = input.palette.len(),
        regions = input.environment.regions.len(),
        "input validated"
    );
    Ok(())
}

/// Non-fatal findings about an input that validates.
pub fn lint_input(input: &SimulationInput) -> Vec<String> {
    let mut warnings = Vec::new();
    let topology = Topology::build(&input.lattice);
    for region in &input.environment.regions {
        if touched_cells(&input.lattice, &topology, region).next().is_none() {
            warnings.push(format!("region '{}' touches no voxel", region.name));
        }
    }
    let components = topology.components();
    if components.len() > 1 {
        warnings.push(format!("lattice has {} disconnected clusters", components.len()));
    }
    warnings
}

fn touched_cells<'a>(
    lattice: &'a VoxelLattice,
    topology: &'a Topology,
    region: &'a BoundaryRegion,
) -> impl Iterator<Item = usize> + 'a {
    let half = DVec3::splat(0.5 * lattice.voxel_size());
    let envelope = lattice.workspace();
    (0..topology.len()).filter(move |&n| region.touches(lattice.cell_center(topology.cells[n]), half, envelope))
}

fn check_anchoring(lattice: &VoxelLattice, regions: &[BoundaryRegion]) -> VoxsimResult<()> {
    let topology = Topology::build(lattice);
    let mut anchored = vec![false; topology.len()];
    for region in regions.iter().filter(|r| (0..3).any(|axis| r.fixed.translation_fixed(axis))) {
        for n in touched_cells(lattice, &topology, region) {
            anchored[n] = true;
        }
    }
    if !anchored.iter().any(|&a| a) {
        return Err(VoxsimError::InvalidBoundary(
            "no voxel is fixed and the floor is disabled".into(),
        ));
    }
    for component in topology.components() {
        if !component.iter().any(|&n| anchored[n]) {
            let first = lattice.coords(topology.cells[component[0]]);
            return Err(VoxsimError::InvalidBoundary(format!(
                "a cluster of {} voxels starting at cell {first:?} is not connected to any fixed voxel",
                component.len()
            )));
        }
    }
    Ok(())
}
