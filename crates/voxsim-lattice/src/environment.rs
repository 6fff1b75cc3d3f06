//! Physical environment of a simulation.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use voxsim_types::constants::GRAVITY;
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

use crate::boundary::BoundaryRegion;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gravity {
    pub enabled: bool,
    /// Acceleration along Z in m/s² (negative pulls down).
    pub acceleration: Scalar,
}

impl Default for Gravity {
    fn default() -> Self {
        Self {
            enabled: true,
            acceleration: GRAVITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Floor {
    pub enabled: bool,
    /// Floor slope about Y, in degrees. The floor rises toward +X.
    pub slope_deg: Scalar,
}

impl Floor {
    /// Height of the floor surface at `x`.
    pub fn height_at(&self, x: Scalar) -> Scalar {
        x * (self.slope_deg * PI / 180.0).tan()
    }
}

/// Temperature schedule, in °C.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperature {
    pub enabled: bool,
    /// Periodic variation on/off.
    pub vary: bool,
    pub base: Scalar,
    pub amplitude: Scalar,
    /// Period of the variation in seconds.
    pub period: Scalar,
}

impl Temperature {
    /// Temperature at time `t` for a material whose cycle is shifted by
    /// `phase` (a fraction of one period).
    ///
    /// Without variation the temperature sits at `base + amplitude`; a zero
    /// period holds it at `base`.
    pub fn at(&self, t: Scalar, phase: Scalar) -> Scalar {
        if !self.vary {
            return self.base + self.amplitude;
        }
        if self.period == 0.0 {
            return self.base;
        }
        self.base + self.amplitude * (2.0 * PI * (t / self.period + phase)).sin()
    }

    /// Number of full periods elapsed at time `t` (zero for a zero period).
    pub fn cycles_at(&self, t: Scalar) -> Scalar {
        if self.period > 0.0 {
            (t / self.period).floor()
        } else {
            0.0
        }
    }
}

/// Which way actuation may move a voxel's scale away from nominal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActuationLimit {
    #[default]
    Both,
    ContractOnly,
    ExpandOnly,
}

/// Everything outside the voxel object that acts on it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub gravity: Gravity,
    pub floor: Floor,
    pub temperature: Temperature,
    /// Quadratic drag coefficient of a surrounding fluid. Zero disables drag.
    pub fluid_drag: Scalar,
    pub actuation: ActuationLimit,
    pub regions: Vec<BoundaryRegion>,
}

impl Environment {
    /// No gravity, no floor, no temperature and no regions.
    pub fn vacuum() -> Self {
        Self {
            gravity: Gravity {
                enabled: false,
                ..Gravity::default()
            },
            ..Self::default()
        }
    }

    pub fn with_region(mut self, region: BoundaryRegion) -> Self {
        self.regions.push(region);
        self
    }

    /// Number of regions fixing all six DOF.
    pub fn fixed_region_count(&self) -> usize {
        self.regions.iter().filter(|r| r.is_all_fixed()).count()
    }

    pub fn validate(&self) -> VoxsimResult<()> {
        if !self.gravity.acceleration.is_finite() {
            return Err(VoxsimError::InvalidConfig("gravity acceleration must be finite".into()));
        }
        if !(self.floor.slope_deg.abs() < 90.0) {
            return Err(VoxsimError::InvalidConfig(format!(
                "floor slope must be within (-90, 90) degrees, got {}",
                self.floor.slope_deg
            )));
        }
        if self.temperature.period < 0.0 {
            return Err(VoxsimError::InvalidConfig(format!(
                "temperature period must be non-negative, got {}",
                self.temperature.period
            )));
        }
        if self.fluid_drag < 0.0 {
            return Err(VoxsimError::InvalidConfig(format!(
                "fluid drag must be non-negative, got {}",
                self.fluid_drag
            )));
        }
        self.regions.iter().try_for_each(BoundaryRegion::validate)
    }
}
