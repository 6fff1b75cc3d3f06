//! Error types for the voxsim engine.
//!
//! All crates return `VoxsimResult<T>` from fallible operations.

use thiserror::Error;

/// Unified error type for the voxsim engine.
#[derive(Debug, Error)]
pub enum VoxsimError {
    /// Lattice description is malformed or inconsistent.
    #[error("Invalid lattice: {0}")]
    InvalidLattice(String),

    /// Material parameter is out of valid range.
    #[error("Invalid material parameter: {0}")]
    InvalidMaterial(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Boundary conditions make the run meaningless (nothing fixed, floating clusters).
    #[error("Invalid boundary conditions: {0}")]
    InvalidBoundary(String),

    /// An operation needed an imported simulation.
    #[error("Simulation has not been initialized")]
    NotInitialized,

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The integrator produced non-finite state.
    #[error("Simulation diverged at step {step}: {reason}")]
    Diverged {
        step: u64,
        reason: String,
    },

    /// A simulation invariant was violated.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A long-running driver was cancelled by its caller.
    #[error("Run cancelled after {steps} steps")]
    Cancelled {
        steps: u64,
    },
}

/// Convenience alias for `Result<T, VoxsimError>`.
pub type VoxsimResult<T> = Result<T, VoxsimError>;
