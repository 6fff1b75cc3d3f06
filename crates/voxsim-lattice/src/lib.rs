//! # voxsim-lattice
//!
//! The voxel object description consumed by the simulation.
//!
//! ## Key Types
//!
//! - [`VoxelLattice`]: Dense grid of material ids with a uniform voxel size.
//! - [`Topology`]: Face-neighbour connectivity queries over occupied cells.
//! - [`Environment`]: Gravity, floor, temperature schedule and boundary regions.
//! - [`BoundaryRegion`]: A region of the workspace that fixes, loads or displaces voxels.
//! - Procedural generators for test and benchmark objects (chains, blocks).

pub mod boundary;
pub mod environment;
pub mod generators;
pub mod lattice;
pub mod topology;

pub use boundary::{BoundaryRegion, RegionShape};
pub use environment::{ActuationLimit, Environment, Floor, Gravity, Temperature};
pub use lattice::VoxelLattice;
pub use topology::{remove_disconnected, Topology};
