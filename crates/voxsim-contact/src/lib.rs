//! # voxsim-contact
//!
//! Contact detection and contact laws for voxel lattices.
//!
//! 1. **Broad phase**: Spatial acceleration producing candidate voxel pairs
//!    for collision bonds.
//! 2. **Floor**: Penalty normal force with static/dynamic Coulomb friction
//!    against a (possibly sloped) ground plane.
//!
//! The broad phase is a pluggable trait so small objects can skip hashing.

pub mod broad;
pub mod floor;
pub mod spatial_hash;

pub use broad::{AllPairs, BroadPhase, CandidatePair, NullBroadPhase};
pub use floor::{FloorContact, FloorProbe, FloorResponse};
pub use spatial_hash::SpatialHash;
