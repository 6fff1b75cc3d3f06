//! Boundary-condition regions.
//!
//! Regions are defined in normalized workspace coordinates (`[0, 1]` on
//! each axis) and scaled by the workspace envelope when queried, so a
//! region keeps its meaning when the lattice is resized.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use voxsim_types::{Dof, Scalar, VoxsimError, VoxsimResult};

/// Geometry of a boundary region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RegionShape {
    /// Axis-aligned box from `min` spanning `size`.
    Box { min: DVec3, size: DVec3 },
    /// Sphere; the radius is scaled by the largest envelope dimension.
    Sphere { center: DVec3, radius: Scalar },
}

impl RegionShape {
    /// Returns true if a cell centred at `center` with half extent `half`
    /// overlaps the region. Touching faces do not count.
    pub fn touches(&self, center: DVec3, half: DVec3, envelope: DVec3) -> bool {
        match *self {
            RegionShape::Box { min, size } => {
                let lo = min * envelope;
                let hi = (min + size) * envelope;
                (center + half).cmpgt(lo).all() && (center - half).cmplt(hi).all()
            }
            RegionShape::Sphere { center: c, radius } => {
                let r = radius * envelope.max_element();
                center.distance(c * envelope) < r + half.length()
            }
        }
    }
}

/// A region that fixes, loads or displaces the voxels it touches.
///
/// Force and torque are shared evenly by all touching voxels; prescribed
/// displacements apply to each touching voxel in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRegion {
    #[serde(default)]
    pub name: String,

    pub shape: RegionShape,

    /// Fixed DOF of touching voxels.
    #[serde(default)]
    pub fixed: Dof,

    /// Total applied force in N.
    #[serde(default)]
    pub force: DVec3,

    /// Total applied torque in N·m.
    #[serde(default)]
    pub torque: DVec3,

    /// Prescribed displacement of fixed translations in m.
    #[serde(default)]
    pub displacement: DVec3,

    /// Prescribed rotation vector of fixed rotations in rad.
    #[serde(default)]
    pub angular_displacement: DVec3,
}

impl BoundaryRegion {
    fn with_shape(name: &str, shape: RegionShape) -> Self {
        Self {
            name: name.into(),
            shape,
            fixed: Dof::NONE,
            force: DVec3::ZERO,
            torque: DVec3::ZERO,
            displacement: DVec3::ZERO,
            angular_displacement: DVec3::ZERO,
        }
    }

    /// A box that fixes all six DOF of touching voxels.
    pub fn fixed_box(name: &str, min: DVec3, size: DVec3) -> Self {
        Self {
            fixed: Dof::ALL,
            ..Self::with_shape(name, RegionShape::Box { min, size })
        }
    }

    /// A box applying `force`, shared by the touching voxels.
    pub fn forced_box(name: &str, min: DVec3, size: DVec3, force: DVec3) -> Self {
        Self {
            force,
            ..Self::with_shape(name, RegionShape::Box { min, size })
        }
    }

    /// A fully fixed box moved by `displacement`.
    pub fn displaced_box(name: &str, min: DVec3, size: DVec3, displacement: DVec3) -> Self {
        Self {
            displacement,
            ..Self::fixed_box(name, min, size)
        }
    }

    /// True when every DOF is fixed.
    pub fn is_all_fixed(&self) -> bool {
        self.fixed.is_all_fixed()
    }

    /// True when the region applies a force or torque.
    pub fn is_loaded(&self) -> bool {
        self.force != DVec3::ZERO || self.torque != DVec3::ZERO
    }

    pub fn touches(&self, center: DVec3, half: DVec3, envelope: DVec3) -> bool {
        self.shape.touches(center, half, envelope)
    }

    pub fn validate(&self) -> VoxsimResult<()> {
        let finite = [self.force, self.torque, self.displacement, self.angular_displacement]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(VoxsimError::InvalidBoundary(format!(
                "region '{}' has non-finite loads",
                self.name
            )));
        }
        match self.shape {
            RegionShape::Box { size, .. } if size.min_element() < 0.0 => Err(VoxsimError::InvalidBoundary(
                format!("region '{}' has a negative box size", self.name),
            )),
            RegionShape::Sphere { radius, .. } if radius < 0.0 => Err(VoxsimError::InvalidBoundary(format!(
                "region '{}' has a negative radius",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}
