//! # voxsim-types
//!
//! Shared types, identifiers, error types, and physical constants
//! for the voxsim lattice mechanics engine.
//!
//! This crate has zero domain logic. It defines the vocabulary
//! that all other voxsim crates share.

pub mod constants;
pub mod dof;
pub mod error;
pub mod ids;
pub mod scalar;

pub use dof::Dof;
pub use error::{VoxsimError, VoxsimResult};
pub use ids::{BondId, MaterialId, VoxelId};
pub use scalar::Scalar;
