//! Penetration bond between two nearby, non-adjacent voxels.

use serde::{Deserialize, Serialize};
use voxsim_math::DVec3;
use voxsim_types::constants::COLLISION_ENVELOPE;

use crate::context::BondContext;
use crate::link::BondLink;

/// Repulsive spring that acts only while two voxel envelopes overlap.
///
/// Each voxel is treated as a sphere of diameter `1.5·scale`; the
/// overlap is pushed apart with voxel 1's axial stiffness. No moments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionBond {
    pub link: BondLink,
    pub force1: DVec3,
    pub force2: DVec3,
}

impl CollisionBond {
    pub fn new(link: BondLink) -> Self {
        Self {
            link,
            force1: DVec3::ZERO,
            force2: DVec3::ZERO,
        }
    }

    pub fn update(&mut self, ctx: &BondContext<'_>) {
        let v1 = &ctx.voxels[self.link.voxel1.index()];
        let v2 = &ctx.voxels[self.link.voxel2.index()];

        let offset = v2.position - v1.position;
        let distance = offset.length();
        let overlap = (v1.scale + v2.scale) * COLLISION_ENVELOPE - distance;

        if overlap > 0.0 && distance > 0.0 {
            self.force2 = offset / distance * self.link.a1 * overlap;
            self.force1 = -self.force2;
        } else {
            self.force1 = DVec3::ZERO;
            self.force2 = DVec3::ZERO;
        }
    }

    /// True while the envelopes overlap.
    pub fn is_touching(&self) -> bool {
        self.force2 != DVec3::ZERO
    }
}
