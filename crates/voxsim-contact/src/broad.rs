//! Broad phase collision detection trait.
//!
//! Quickly identifies *candidate* voxel pairs. The simulation then
//! filters candidates by distance and bond-hop exclusion before creating
//! collision bonds.

use serde::{Deserialize, Serialize};
use voxsim_math::DVec3;
use voxsim_types::VoxsimResult;

/// Candidate pair of point indices, always with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    pub a: u32,
    pub b: u32,
}

impl CandidatePair {
    /// Builds a pair with its indices ordered.
    pub fn new(a: u32, b: u32) -> Self {
        if a < b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

/// Trait for broad phase collision detection.
///
/// # Implementations
/// - `SpatialHash`: Uniform grid, the default
/// - `AllPairs`: Every pair, for small objects and cross-checking
/// - `NullBroadPhase`: Nothing, for runs without collisions
pub trait BroadPhase: Send + Sync {
    /// Rebuild the acceleration structure from current positions.
    fn update(&mut self, points: &[DVec3]) -> VoxsimResult<()>;

    /// Query candidate pairs, sorted and without duplicates.
    fn query_pairs(&self) -> Vec<CandidatePair>;

    /// Returns the broad phase strategy name.
    fn name(&self) -> &str;
}

/// No-op broad phase for runs that don't need collision.
pub struct NullBroadPhase;

impl BroadPhase for NullBroadPhase {
    fn update(&mut self, _points: &[DVec3]) -> VoxsimResult<()> {
        Ok(())
    }

    fn query_pairs(&self) -> Vec<CandidatePair> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "null_broad_phase"
    }
}

/// Reports every pair of points.
#[derive(Default)]
pub struct AllPairs {
    count: u32,
}

impl BroadPhase for AllPairs {
    fn update(&mut self, points: &[DVec3]) -> VoxsimResult<()> {
        self.count = points.len() as u32;
        Ok(())
    }

    fn query_pairs(&self) -> Vec<CandidatePair> {
        (0..self.count)
            .flat_map(|a| ((a + 1)..self.count).map(move |b| CandidatePair { a, b }))
            .collect()
    }

    fn name(&self) -> &str {
        "all_pairs"
    }
}
