//! # voxsim-solver
//!
//! Explicit dynamics of a voxel lattice: every voxel is a point mass with
//! rotational inertia, every pair of face-adjacent voxels is joined by an
//! Euler beam bond, and a semi-implicit Euler step advances the whole
//! lattice in two parallel phases.
//!
//! ## Key Types
//!
//! - [`Simulation`]: Owns the voxel and bond arenas; import, step, run, reset
//! - [`SimConfig`]: Feature toggles, damping, timestep and stop settings
//! - [`Voxel`]: Point mass state and its integration
//! - [`Bond`]: Internal beam bond or collision bond, dispatched by match
//! - [`BondLink`]: Combined material properties and beam stiffness of a bond
//! - [`StopCondition`] / [`StopStatus`]: When a run ends and how it ended
//! - [`SimulationTask`]: A run on a worker thread with progress and cancel
//! - [`TensileTest`]: Quasi-static displacement ramp with reaction forces
//! - [`VoxelExtension`]: Pluggable per-voxel behaviors run before each step

pub mod bond;
pub mod collision_bond;
pub mod config;
pub mod context;
pub mod extension;
pub mod internal_bond;
pub mod link;
pub mod simulation;
pub mod stats;
pub mod stop;
pub mod task;
pub mod tensile;
pub mod voxel;

pub use bond::Bond;
pub use collision_bond::CollisionBond;
pub use config::{Damping, Development, Features, SimConfig, StiffnessAdaptation};
pub use extension::{FloorAccretion, SineActuator, VoxelExtension};
pub use internal_bond::{AngleRegime, InternalBond};
pub use link::{BondLink, DampingCoefficients};
pub use simulation::Simulation;
pub use stats::{RegionStats, SimStats, StatMask};
pub use stop::{History, StopCondition, StopHistories, StopStatus};
pub use task::{Progress, SimulationTask};
pub use tensile::{TensileConfig, TensileRow, TensileTest};
pub use voxel::{Voxel, VoxelControl};
