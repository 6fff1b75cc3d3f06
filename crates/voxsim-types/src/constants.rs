//! Physical constants and simulation defaults.

use crate::Scalar;

/// Standard gravitational acceleration (m/s²), applied along −Z.
pub const GRAVITY: Scalar = -9.81;

/// Default fraction of the stability-limited timestep actually used.
pub const DEFAULT_DT_FRACTION: Scalar = 0.9;

/// Number of entries kept in each stop-condition history.
pub const HISTORY_SIZE: usize = 500;

/// Steps between two stop-condition history samples.
pub const HISTORY_SAMPLE_INTERVAL: u64 = (HISTORY_SIZE / 10) as u64;

/// Small-angle regime switch threshold on axial extension (ratio of nominal length).
pub const SA_BOND_EXT_PERC: Scalar = 1.30;

/// How far past a regime threshold a measure must go before switching.
pub const HYSTERESIS_FACTOR: Scalar = 1.1;

/// Fraction of mean stress under which a heterogeneous bond's side
/// stresses are considered equal.
pub const STRESS_MATCH_TOLERANCE: Scalar = 0.0005;

/// Maximum fixed-point refinements when equalizing heterogeneous bond stress.
pub const STRESS_MATCH_MAX_ITERATIONS: u32 = 3;

/// Effective collision diameter as a multiple of the mean voxel scale.
pub const COLLISION_ENVELOPE: Scalar = 0.75;
