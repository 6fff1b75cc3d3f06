//! Integration tests for voxsim-lattice.

use glam::DVec3;
use voxsim_lattice::generators::{block, chain, checkerboard, layered};
use voxsim_lattice::{
    remove_disconnected, BoundaryRegion, Environment, RegionShape, Temperature, Topology, VoxelLattice,
};
use voxsim_material::{Material, MaterialPalette};
use voxsim_math::BondDir;
use voxsim_types::{Dof, MaterialId};

fn palette() -> MaterialPalette {
    let mut p = MaterialPalette::empty();
    p.add(Material::linear("a", 1.0e6, 0.35, 1000.0));
    p.add(Material::linear("b", 1.0e7, 0.35, 1000.0));
    p
}

// ─── Lattice Tests ────────────────────────────────────────────

#[test]
fn index_and_coords_round_trip() {
    let lattice = VoxelLattice::new([3, 4, 5], 0.01);
    for index in 0..lattice.cell_count() {
        let [i, j, k] = lattice.coords(index);
        assert_eq!(lattice.index(i as i64, j as i64, k as i64), Some(index));
    }
    assert_eq!(lattice.index(-1, 0, 0), None);
    assert_eq!(lattice.index(3, 0, 0), None);
}

#[test]
fn cell_center_is_offset_by_half() {
    let lattice = chain(3, 0.002, MaterialId(1));
    let c = lattice.cell_center(2);
    assert!((c - DVec3::new(0.005, 0.001, 0.001)).length() < 1e-15, "got {c:?}");
    assert!((lattice.workspace() - DVec3::new(0.006, 0.002, 0.002)).length() < 1e-15);
}

#[test]
fn neighbor_skips_empty_cells() {
    let mut lattice = chain(3, 0.001, MaterialId(1));
    lattice.set(1, 0, 0, MaterialId::EMPTY).unwrap();
    assert_eq!(lattice.neighbor(0, BondDir::PosX), None);
    assert_eq!(lattice.neighbor(0, BondDir::NegX), None);
    assert_eq!(lattice.occupied_count(), 2);
}

#[test]
fn set_out_of_bounds_is_error() {
    let mut lattice = VoxelLattice::new([2, 2, 2], 0.001);
    assert!(lattice.set(2, 0, 0, MaterialId(1)).is_err());
}

#[test]
fn from_cells_checks_length() {
    assert!(VoxelLattice::from_cells([2, 1, 1], 0.001, vec![MaterialId(1)]).is_err());
    assert!(VoxelLattice::from_cells([2, 1, 1], 0.001, vec![MaterialId(1); 2]).is_ok());
    assert!(VoxelLattice::from_cells([2, 1, 1], 0.0, vec![MaterialId(1); 2]).is_err());
}

#[test]
fn validate_against_palette() {
    let p = palette();
    block([2, 2, 2], 0.001, MaterialId(2)).validate(&p).unwrap();
    assert!(block([2, 2, 2], 0.001, MaterialId(3)).validate(&p).is_err());
    assert!(VoxelLattice::new([2, 2, 2], 0.001).validate(&p).is_err());
}

// ─── Generator Tests ──────────────────────────────────────────

#[test]
fn checkerboard_alternates() {
    let lattice = checkerboard([2, 2, 1], 0.001, MaterialId(1), MaterialId(2));
    assert_eq!(lattice.get(0, 0, 0), MaterialId(1));
    assert_eq!(lattice.get(1, 0, 0), MaterialId(2));
    assert_eq!(lattice.get(1, 1, 0), MaterialId(1));
}

#[test]
fn layered_splits_along_z() {
    let lattice = layered([1, 1, 4], 0.001, 1, MaterialId(1), MaterialId(2));
    assert_eq!(lattice.get(0, 0, 0), MaterialId(1));
    assert_eq!(lattice.get(0, 0, 3), MaterialId(2));
}

// ─── Topology Tests ───────────────────────────────────────────

#[test]
fn chain_topology() {
    let topo = Topology::build(&chain(4, 0.001, MaterialId(1)));
    assert_eq!(topo.len(), 4);
    assert_eq!(topo.neighbor_count(0), 1);
    assert_eq!(topo.neighbor_count(1), 2);
    assert!(topo.is_surface(1));
    assert_eq!(topo.components().len(), 1);
}

#[test]
fn interior_cell_is_not_surface() {
    let topo = Topology::build(&block([3, 3, 3], 0.001, MaterialId(1)));
    assert!(!topo.is_surface(13));
    assert!(topo.is_surface(0));
}

#[test]
fn split_chain_has_two_components() {
    let mut lattice = chain(5, 0.001, MaterialId(1));
    lattice.set(2, 0, 0, MaterialId::EMPTY).unwrap();
    let topo = Topology::build(&lattice);
    let components = topo.components();
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].len(), 2);
}

#[test]
fn within_hops_on_chain() {
    let topo = Topology::build(&chain(6, 0.001, MaterialId(1)));
    let mut near = topo.within_hops(0, 2);
    near.sort_unstable();
    assert_eq!(near, vec![1, 2]);
}

#[test]
fn remove_disconnected_keeps_anchored_cluster() {
    let mut lattice = chain(6, 1.0, MaterialId(1));
    lattice.set(3, 0, 0, MaterialId::EMPTY).unwrap();
    let anchor = BoundaryRegion::fixed_box("anchor", DVec3::ZERO, DVec3::new(0.1, 1.0, 1.0));
    let removed = remove_disconnected(&mut lattice, &[anchor]);
    assert_eq!(removed, 2);
    assert_eq!(lattice.occupied_count(), 3);
    assert!(lattice.get(5, 0, 0).is_empty());
}

#[test]
fn remove_disconnected_drops_lone_voxels() {
    let mut lattice = VoxelLattice::new([3, 1, 1], 1.0);
    lattice.set(0, 0, 0, MaterialId(1)).unwrap();
    let anchor = BoundaryRegion::fixed_box("anchor", DVec3::ZERO, DVec3::new(0.1, 1.0, 1.0));
    assert_eq!(remove_disconnected(&mut lattice, &[anchor]), 1);
    assert_eq!(lattice.occupied_count(), 0);
}

// ─── Boundary Region Tests ────────────────────────────────────

#[test]
fn box_touching_is_strict() {
    let envelope = DVec3::ONE;
    let region = RegionShape::Box {
        min: DVec3::ZERO,
        size: DVec3::new(0.25, 1.0, 1.0),
    };
    let half = DVec3::splat(0.125);
    // Cell spanning [0, 0.25] overlaps the region.
    assert!(region.touches(DVec3::splat(0.125), half, envelope));
    // Cell spanning [0.25, 0.5] only shares a face.
    assert!(!region.touches(DVec3::new(0.375, 0.125, 0.125), half, envelope));
}

#[test]
fn sphere_touching() {
    let envelope = DVec3::splat(1.0);
    let region = RegionShape::Sphere {
        center: DVec3::splat(0.5),
        radius: 0.1,
    };
    assert!(region.touches(DVec3::splat(0.5), DVec3::splat(0.01), envelope));
    assert!(!region.touches(DVec3::ZERO, DVec3::splat(0.01), envelope));
}

#[test]
fn region_constructors() {
    let fixed = BoundaryRegion::fixed_box("base", DVec3::ZERO, DVec3::ONE);
    assert!(fixed.is_all_fixed());
    assert!(!fixed.is_loaded());

    let forced = BoundaryRegion::forced_box("tip", DVec3::ZERO, DVec3::ONE, DVec3::Z);
    assert_eq!(forced.fixed, Dof::NONE);
    assert!(forced.is_loaded());

    let pulled = BoundaryRegion::displaced_box("grip", DVec3::ZERO, DVec3::ONE, DVec3::X);
    assert!(pulled.is_all_fixed());
    assert_eq!(pulled.displacement, DVec3::X);
}

// ─── Environment Tests ────────────────────────────────────────

#[test]
fn temperature_schedule() {
    let temp = Temperature {
        enabled: true,
        vary: true,
        base: 20.0,
        amplitude: 10.0,
        period: 2.0,
    };
    assert!((temp.at(0.5, 0.0) - 30.0).abs() < 1e-12);
    assert!((temp.at(1.5, 0.0) - 10.0).abs() < 1e-12);
    assert_eq!(temp.cycles_at(4.5), 2.0);

    let still = Temperature { period: 0.0, ..temp };
    assert_eq!(still.at(3.0, 0.0), 20.0);
    assert_eq!(still.cycles_at(3.0), 0.0);

    let constant = Temperature { vary: false, ..temp };
    assert_eq!(constant.at(3.0, 0.0), 30.0);
}

#[test]
fn environment_validation() {
    let env = Environment::vacuum().with_region(BoundaryRegion::fixed_box("base", DVec3::ZERO, DVec3::ONE));
    env.validate().unwrap();
    assert_eq!(env.fixed_region_count(), 1);
    assert!(!env.gravity.enabled);

    let mut bad = env.clone();
    bad.floor.slope_deg = 90.0;
    assert!(bad.validate().is_err());
}

#[test]
fn environment_deserializes_with_defaults() {
    let env: Environment = serde_json::from_str(r#"{"floor":{"enabled":true}}"#).unwrap();
    assert!(env.floor.enabled);
    assert!(env.gravity.enabled);
    assert!(env.regions.is_empty());
}
