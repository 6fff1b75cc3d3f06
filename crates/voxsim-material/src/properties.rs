//! Physical material properties.

use serde::{Deserialize, Serialize};
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

use crate::model::{StressModel, StressResponse, StressStrainCurve};

/// Physical properties of a voxel material.
///
/// | Field | Unit |
/// |---|---|
/// | `elastic_modulus` | Pa |
/// | `density` | kg/m³ |
/// | `cte` | 1/°C |
/// | `temp_phase` | fraction of a temperature period |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Human-readable name (e.g., "soft_silicone").
    pub name: String,

    /// Young's modulus. For `Data` models this is the initial slope of the curve.
    pub elastic_modulus: Scalar,

    pub poissons_ratio: Scalar,

    pub density: Scalar,

    /// Coefficient of thermal expansion. Drives actuation.
    #[serde(default)]
    pub cte: Scalar,

    /// Phase offset of this material's actuation cycle.
    #[serde(default)]
    pub temp_phase: Scalar,

    /// Static Coulomb friction coefficient against the floor.
    #[serde(default)]
    pub friction_static: Scalar,

    /// Dynamic Coulomb friction coefficient against the floor.
    #[serde(default)]
    pub friction_dynamic: Scalar,

    #[serde(default)]
    pub model: StressModel,
}

impl Material {
    /// A linear-elastic material with no thermal response and no friction.
    pub fn linear(name: impl Into<String>, elastic_modulus: Scalar, poissons_ratio: Scalar, density: Scalar) -> Self {
        Self {
            name: name.into(),
            elastic_modulus,
            poissons_ratio,
            density,
            cte: 0.0,
            temp_phase: 0.0,
            friction_static: 0.0,
            friction_dynamic: 0.0,
            model: StressModel::Linear,
        }
    }

    /// A material described by a measured tensile curve.
    ///
    /// The elastic modulus is taken from the curve's first segment.
    pub fn from_curve(name: impl Into<String>, curve: StressStrainCurve, poissons_ratio: Scalar, density: Scalar) -> Self {
        let mut material = Self::linear(name, curve.elastic_modulus(), poissons_ratio, density);
        material.model = StressModel::Data(curve);
        material
    }

    pub fn with_model(mut self, model: StressModel) -> Self {
        if let StressModel::Data(curve) = &model {
            self.elastic_modulus = curve.elastic_modulus();
        }
        self.model = model;
        self
    }

    pub fn with_cte(mut self, cte: Scalar, temp_phase: Scalar) -> Self {
        self.cte = cte;
        self.temp_phase = temp_phase;
        self
    }

    pub fn with_friction(mut self, friction_static: Scalar, friction_dynamic: Scalar) -> Self {
        self.friction_static = friction_static;
        self.friction_dynamic = friction_dynamic;
        self
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> VoxsimResult<()> {
        let err = |msg: String| Err(VoxsimError::InvalidMaterial(format!("{}: {msg}", self.name)));

        if !(self.elastic_modulus > 0.0 && self.elastic_modulus.is_finite()) {
            return err(format!("elastic modulus must be positive, got {}", self.elastic_modulus));
        }
        if !(0.0..=0.5).contains(&self.poissons_ratio) {
            return err(format!("Poisson's ratio must be in [0, 0.5], got {}", self.poissons_ratio));
        }
        if !(self.density > 0.0 && self.density.is_finite()) {
            return err(format!("density must be positive, got {}", self.density));
        }
        if self.friction_static < 0.0 || self.friction_dynamic < 0.0 {
            return err("friction coefficients must be non-negative".into());
        }
        if !self.cte.is_finite() {
            return err("CTE must be finite".into());
        }

        match &self.model {
            StressModel::Bilinear {
                yield_stress,
                plastic_modulus,
                ..
            } => {
                if *yield_stress <= 0.0 {
                    return err(format!("yield stress must be positive, got {yield_stress}"));
                }
                if *plastic_modulus < 0.0 || *plastic_modulus >= self.elastic_modulus {
                    return err(format!(
                        "plastic modulus must be in [0, E), got {plastic_modulus}"
                    ));
                }
            }
            StressModel::Data(curve) => {
                if (curve.elastic_modulus() - self.elastic_modulus).abs() > 1e-9 * self.elastic_modulus {
                    return err("elastic modulus does not match the stress-strain curve".into());
                }
            }
            StressModel::Linear | StressModel::LinearFail { .. } => {}
        }
        Ok(())
    }

    /// Stress at `strain`, evaluated with `modulus` in place of the
    /// material's own modulus when given.
    pub fn stress(&self, strain: Scalar, modulus: Option<Scalar>) -> StressResponse {
        let e = modulus.filter(|&m| m > 0.0).unwrap_or(self.elastic_modulus);
        self.model.stress(strain, e)
    }

    /// `E / (2(1 + ν))`.
    pub fn shear_modulus(&self) -> Scalar {
        self.elastic_modulus / (2.0 * (1.0 + self.poissons_ratio))
    }

    /// Constrained-volume modulus `E / ((1 − 2ν)(1 + ν))`.
    pub fn volumetric_modulus(&self) -> Scalar {
        self.elastic_modulus / ((1.0 - 2.0 * self.poissons_ratio) * (1.0 + self.poissons_ratio))
    }
}
