//! The bond arena element.
//!
//! Internal and collision bonds live in one arena so voxels can refer to
//! either by a single [`BondId`](voxsim_types::BondId). Internal bonds
//! occupy the front of the arena for the whole run; collision bonds are
//! appended behind them and truncated on every broad-phase rebuild.

use serde::{Deserialize, Serialize};
use voxsim_math::DVec3;
use voxsim_types::{Scalar, VoxelId};

use crate::collision_bond::CollisionBond;
use crate::context::BondContext;
use crate::internal_bond::InternalBond;
use crate::link::BondLink;

/// A bond of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bond {
    Internal(InternalBond),
    Collision(CollisionBond),
}

impl Bond {
    #[inline]
    pub fn update(&mut self, ctx: &BondContext<'_>) {
        match self {
            Bond::Internal(b) => b.update(ctx),
            Bond::Collision(b) => b.update(ctx),
        }
    }

    pub fn link(&self) -> &BondLink {
        match self {
            Bond::Internal(b) => &b.link,
            Bond::Collision(b) => &b.link,
        }
    }

    pub fn link_mut(&mut self) -> &mut BondLink {
        match self {
            Bond::Internal(b) => &mut b.link,
            Bond::Collision(b) => &mut b.link,
        }
    }

    pub fn as_internal(&self) -> Option<&InternalBond> {
        match self {
            Bond::Internal(b) => Some(b),
            Bond::Collision(_) => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Bond::Internal(_))
    }

    /// Force this bond applies to `voxel`, zero if it is not an end.
    #[inline]
    pub fn force_on(&self, voxel: VoxelId) -> DVec3 {
        let (f1, f2) = match self {
            Bond::Internal(b) => (b.force1, b.force2),
            Bond::Collision(b) => (b.force1, b.force2),
        };
        match self.link().end_of(voxel) {
            Some(0) => f1,
            Some(_) => f2,
            None => DVec3::ZERO,
        }
    }

    /// Moment this bond applies to `voxel` (collision bonds apply none).
    #[inline]
    pub fn moment_on(&self, voxel: VoxelId) -> DVec3 {
        match self {
            Bond::Internal(b) => match b.link.end_of(voxel) {
                Some(0) => -b.moment1,
                Some(_) => -b.moment2,
                None => DVec3::ZERO,
            },
            Bond::Collision(_) => DVec3::ZERO,
        }
    }

    pub fn strain_energy(&self) -> Scalar {
        match self {
            Bond::Internal(b) => b.strain_energy,
            Bond::Collision(_) => 0.0,
        }
    }
}
