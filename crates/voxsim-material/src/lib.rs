//! # voxsim-material
//!
//! Material definitions and the material palette.
//!
//! ## Design
//!
//! A [`Material`] is immutable once imported into a simulation. Its
//! [`StressModel`] maps a uniaxial engineering strain to a stress and
//! reports whether the material has yielded or failed at that strain.
//! Voxels may run with an adapted modulus, so every evaluation takes an
//! optional modulus override.
//!
//! The [`MaterialPalette`] stores materials indexed by [`MaterialId`],
//! with id 0 reserved for empty lattice cells.
//!
//! [`MaterialId`]: voxsim_types::MaterialId

pub mod model;
pub mod palette;
pub mod properties;

pub use model::{FailCriterion, StressModel, StressResponse, StressStrainCurve};
pub use palette::MaterialPalette;
pub use properties::Material;
