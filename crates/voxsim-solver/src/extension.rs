//! Pluggable per-voxel behaviors.
//!
//! Extensions run sequentially before the bond phase of every step. They
//! read voxel state and write only each voxel's [`VoxelControl`].
//! The core never depends on what they do.

use std::f64::consts::PI;

use voxsim_types::Scalar;

use crate::voxel::{Voxel, VoxelControl};

/// A behavior layered onto the voxels of a running simulation.
pub trait VoxelExtension: Send {
    /// Called once per step with the time the step starts at.
    /// `controls[i]` belongs to `voxels[i]`.
    fn before_step(&mut self, time: Scalar, voxels: &[Voxel], controls: &mut [VoxelControl]);

    /// Returns the extension's name.
    fn name(&self) -> &str;
}

/// Open-loop actuation: every voxel follows a sine wave with its own
/// phase, overriding the temperature-driven actuation.
#[derive(Debug, Clone)]
pub struct SineActuator {
    pub frequency: Scalar,
    /// Phase of each voxel in periods. Missing entries use zero.
    pub phases: Vec<Scalar>,
}

impl SineActuator {
    pub fn uniform(frequency: Scalar) -> Self {
        Self {
            frequency,
            phases: Vec::new(),
        }
    }
}

impl VoxelExtension for SineActuator {
    fn before_step(&mut self, time: Scalar, _voxels: &[Voxel], controls: &mut [VoxelControl]) {
        for (i, control) in controls.iter_mut().enumerate() {
            let phase = self.phases.get(i).copied().unwrap_or(0.0);
            control.actuation = Some((2.0 * PI * (self.frequency * time + phase)).sin());
        }
    }

    fn name(&self) -> &str {
        "sine_actuator"
    }
}

/// Grows voxels touching the floor by a constant rate up to a cap.
#[derive(Debug, Clone)]
pub struct FloorAccretion {
    /// Size fraction gained per second of floor contact.
    pub rate: Scalar,
    pub max_accretion: Scalar,
    last_time: Option<Scalar>,
}

impl FloorAccretion {
    pub fn new(rate: Scalar, max_accretion: Scalar) -> Self {
        Self {
            rate,
            max_accretion,
            last_time: None,
        }
    }
}

impl VoxelExtension for FloorAccretion {
    fn before_step(&mut self, time: Scalar, voxels: &[Voxel], controls: &mut [VoxelControl]) {
        let dt = self.last_time.map_or(0.0, |last| time - last);
        self.last_time = Some(time);
        for (voxel, control) in voxels.iter().zip(controls.iter_mut()) {
            if voxel.touching_floor {
                control.accretion = (control.accretion + self.rate * dt).min(self.max_accretion);
            }
        }
    }

    fn name(&self) -> &str {
        "floor_accretion"
    }
}
