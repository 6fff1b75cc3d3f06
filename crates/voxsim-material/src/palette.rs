//! Material palette with built-in presets.
//!
//! Materials are addressed by [`MaterialId`]. Id 0 marks empty lattice
//! cells, so the first registered material gets id 1.

use serde::{Deserialize, Serialize};
use voxsim_types::{MaterialId, VoxsimError, VoxsimResult};

use crate::model::{FailCriterion, StressModel};
use crate::properties::Material;

/// An ordered collection of materials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialPalette {
    materials: Vec<Material>,
}

impl MaterialPalette {
    /// Creates a palette with the built-in presets.
    pub fn with_defaults() -> Self {
        let mut palette = Self::empty();
        palette.add(soft_silicone());
        palette.add(stiff_polymer());
        palette.add(thermal_actuator());
        palette.add(ductile_foam());
        palette.add(brittle_resin());
        palette
    }

    pub fn empty() -> Self {
        Self {
            materials: Vec::new(),
        }
    }

    /// Appends a material and returns its id.
    pub fn add(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() as u16)
    }

    /// Looks up a material. Returns `None` for the empty id and unknown ids.
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        if id.is_empty() {
            return None;
        }
        self.materials.get(id.index() - 1)
    }

    /// Looks up a material id by name.
    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|i| MaterialId(i as u16 + 1))
    }

    pub fn names(&self) -> Vec<&str> {
        self.materials.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i as u16 + 1), m))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Validates every material, reporting the first failure.
    pub fn validate(&self) -> VoxsimResult<()> {
        if self.materials.len() >= u16::MAX as usize {
            return Err(VoxsimError::InvalidMaterial(format!(
                "palette holds {} materials, more than ids can address",
                self.materials.len()
            )));
        }
        self.materials.iter().try_for_each(Material::validate)
    }
}

// ─── Built-in Presets ─────────────────────────────────────────────────

/// Soft silicone rubber. The default passive soft-robot tissue.
fn soft_silicone() -> Material {
    Material::linear("soft_silicone", 1.0e6, 0.35, 1000.0).with_friction(1.0, 0.5)
}

/// Rigid printed polymer, roughly a hundred times stiffer than silicone.
fn stiff_polymer() -> Material {
    Material::linear("stiff_polymer", 1.0e8, 0.35, 1200.0).with_friction(0.6, 0.4)
}

/// Silicone that expands and contracts with the temperature cycle.
fn thermal_actuator() -> Material {
    Material::linear("thermal_actuator", 1.0e6, 0.35, 1000.0)
        .with_cte(0.01, 0.0)
        .with_friction(1.0, 0.5)
}

/// Foam that yields and keeps a permanent set.
fn ductile_foam() -> Material {
    Material::linear("ductile_foam", 5.0e5, 0.3, 300.0).with_model(StressModel::Bilinear {
        yield_stress: 1.0e4,
        plastic_modulus: 5.0e4,
        fail: Some(FailCriterion::MaxStrain(0.5)),
    })
}

/// Stiff resin that snaps once its strength is reached.
fn brittle_resin() -> Material {
    Material::linear("brittle_resin", 2.0e9, 0.3, 1100.0).with_model(StressModel::LinearFail {
        fail: FailCriterion::MaxStress(5.0e7),
    })
}
