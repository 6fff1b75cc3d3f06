//! # voxsim-io
//!
//! Simulation input/output contract and input validation.
//!
//! Defines the boundary types that external tools (CLI, scripts, batch
//! runners) use to hand a lattice to the voxsim core and read results
//! back, in TOML or JSON.

pub mod contract;
pub mod validator;

pub use contract::{Format, SimulationInput, SimulationOutput, VoxelResult};
pub use validator::{lint_input, validate_input};
