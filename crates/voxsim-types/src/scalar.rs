//! Scalar type alias for the simulation.
//!
//! Lattice mechanics integrates very stiff bonds with tiny timesteps,
//! so positions and momenta are carried in double precision.

/// The floating-point type used throughout the simulation.
pub type Scalar = f64;
