//! Simulation configuration.
//!
//! Everything that changes how a run behaves lives here and is owned by
//! the [`Simulation`](crate::Simulation) it was handed to. Nothing is
//! global: two simulations with different configs can step side by side.

use serde::{Deserialize, Serialize};
use voxsim_math::Precision;
use voxsim_types::constants::DEFAULT_DT_FRACTION;
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

use crate::stats::StatMask;
use crate::stop::StopCondition;

/// Feature toggles.
///
/// `gravity`, `floor` and `temperature` mirror the environment and are
/// overwritten from it on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub collisions: bool,
    pub gravity: bool,
    pub floor: bool,
    pub temperature: bool,
    pub temperature_vary: bool,
    pub plasticity: bool,
    pub failure: bool,
    pub volume_effects: bool,
    pub max_velocity: bool,
    pub equilibrium_mode: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            collisions: false,
            gravity: true,
            floor: true,
            temperature: false,
            temperature_vary: false,
            plasticity: true,
            failure: true,
            volume_effects: false,
            max_velocity: true,
            equilibrium_mode: false,
        }
    }
}

/// Damping ratios, as fractions of critical damping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Damping {
    /// Relative motion across internal bonds.
    pub bond: Scalar,
    /// Floor contact along the normal.
    pub collision: Scalar,
    /// Absolute motion of each voxel (ground damping).
    pub slow: Scalar,
}

impl Default for Damping {
    fn default() -> Self {
        Self {
            bond: 1.0,
            collision: 1.0,
            slow: 0.001,
        }
    }
}

/// Size factors for the developmental ramps, relative to nominal size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Development {
    pub initial_size_factor: Scalar,
    pub final_size_factor: Scalar,
}

impl Default for Development {
    fn default() -> Self {
        Self {
            initial_size_factor: 1.0,
            final_size_factor: 1.0,
        }
    }
}

/// Integral controller driving each voxel's elastic modulus from the
/// stress and pressure it has seen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StiffnessAdaptation {
    /// Modulus change per unit of integrated bond stress (1/s).
    pub stress_rate: Scalar,
    /// Modulus change per unit of integrated pressure (1/s).
    pub pressure_rate: Scalar,
    pub min_modulus: Scalar,
    pub max_modulus: Scalar,
    /// Largest modulus change allowed in one step (Pa).
    pub max_delta: Scalar,
}

impl StiffnessAdaptation {
    pub fn validate(&self) -> VoxsimResult<()> {
        if !(self.min_modulus > 0.0 && self.min_modulus <= self.max_modulus) {
            return Err(VoxsimError::InvalidConfig(format!(
                "stiffness bounds must satisfy 0 < min <= max, got [{}, {}]",
                self.min_modulus, self.max_modulus
            )));
        }
        if self.max_delta < 0.0 {
            return Err(VoxsimError::InvalidConfig("max stiffness delta must be non-negative".into()));
        }
        Ok(())
    }
}

/// Configuration for a lattice simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub features: Features,

    pub damping: Damping,

    /// Fraction of the stability-limited timestep actually used (0, 1].
    pub dt_fraction: Scalar,

    /// Largest per-step voxel displacement, as a fraction of its size.
    pub max_velocity_fraction: Scalar,

    /// Collision search radius, in lattice dimensions. Must exceed 1.
    pub collision_horizon: Scalar,

    /// Voxels within this many bond hops of each other never collide.
    pub nearby_hops: usize,

    pub precision: Precision,

    /// Smallest scale thermal contraction may reach, as a fraction of nominal size.
    pub min_temp_factor: Scalar,

    /// Length of the initial window (s): anti-shock growth ramp, no
    /// actuation and no stiffness adaptation before it ends.
    pub init_time: Scalar,

    /// Time (s) before which actuation is held off.
    pub actuation_start_time: Scalar,

    /// Time (s) at which developmental growth reaches its final size.
    pub development_end_time: Scalar,

    pub development: Development,

    pub stop: StopCondition,

    pub stats: StatMask,

    pub stiffness: Option<StiffnessAdaptation>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            features: Features::default(),
            damping: Damping::default(),
            dt_fraction: DEFAULT_DT_FRACTION,
            max_velocity_fraction: 0.1,
            collision_horizon: 3.0,
            nearby_hops: 2,
            precision: Precision::default(),
            min_temp_factor: 0.1,
            init_time: 0.0,
            actuation_start_time: 0.0,
            development_end_time: 0.0,
            development: Development::default(),
            stop: StopCondition::None,
            stats: StatMask::ALL,
            stiffness: None,
        }
    }
}

impl SimConfig {
    /// Slow settling toward static equilibrium: no collisions, no gravity
    /// and no velocity cap, stopping once nothing moves.
    pub fn quasi_static() -> Self {
        Self {
            features: Features {
                gravity: false,
                floor: false,
                max_velocity: false,
                ..Features::default()
            },
            stop: StopCondition::MinMaxMove(1.0e-12),
            ..Default::default()
        }
    }

    /// Free dynamics with collisions and floor contact.
    pub fn dynamic() -> Self {
        Self {
            features: Features {
                collisions: true,
                volume_effects: true,
                ..Features::default()
            },
            damping: Damping {
                bond: 0.1,
                collision: 1.0,
                slow: 0.0,
            },
            ..Default::default()
        }
    }

    /// Short, coarse runs for debugging.
    pub fn debug() -> Self {
        Self {
            precision: Precision::Low,
            stop: StopCondition::MaxTimeSteps(100),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> VoxsimResult<()> {
        if !(self.dt_fraction > 0.0 && self.dt_fraction <= 1.0) {
            return Err(VoxsimError::InvalidConfig(format!(
                "dt_fraction must be in (0, 1], got {}",
                self.dt_fraction
            )));
        }
        let d = self.damping;
        if d.bond < 0.0 || d.collision < 0.0 || d.slow < 0.0 {
            return Err(VoxsimError::InvalidConfig("damping ratios must be non-negative".into()));
        }
        if self.max_velocity_fraction <= 0.0 {
            return Err(VoxsimError::InvalidConfig("max_velocity_fraction must be positive".into()));
        }
        if self.collision_horizon <= 1.0 {
            return Err(VoxsimError::InvalidConfig(format!(
                "collision_horizon must exceed 1, got {}",
                self.collision_horizon
            )));
        }
        if !(self.min_temp_factor > 0.0 && self.min_temp_factor <= 1.0) {
            return Err(VoxsimError::InvalidConfig("min_temp_factor must be in (0, 1]".into()));
        }
        if self.init_time < 0.0 || self.actuation_start_time < 0.0 || self.development_end_time < 0.0 {
            return Err(VoxsimError::InvalidConfig("schedule times must be non-negative".into()));
        }
        let dev = self.development;
        if dev.initial_size_factor <= 0.0 || dev.final_size_factor <= 0.0 {
            return Err(VoxsimError::InvalidConfig("development size factors must be positive".into()));
        }
        self.stop.validate()?;
        if let Some(adaptation) = &self.stiffness {
            adaptation.validate()?;
        }
        Ok(())
    }
}
