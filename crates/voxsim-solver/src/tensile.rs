//! Quasi-static tensile test driver.
//!
//! Ramps every prescribed displacement from zero to its full value over a
//! number of increments, settling the lattice to static equilibrium after
//! each one, and records the reaction force of the pulled region.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use voxsim_math::DVec3;
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

use crate::simulation::Simulation;

/// Fraction of the first increment's peak per-step move used as the
/// settle threshold when none is given. The peak is at least the
/// prescribed step of one increment.
const AUTO_THRESHOLD_FRACTION: Scalar = 1.0e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TensileConfig {
    pub increments: u32,
    /// Largest per-step voxel move (m) at which an increment counts as
    /// settled. `None` derives it from the first motion peak.
    pub settle_threshold: Option<Scalar>,
    pub max_steps_per_increment: u64,
    /// Steps every settle runs before the threshold is checked.
    pub min_steps: u64,
    /// Consecutive steps that must stay below the threshold. Equilibrium
    /// mode restarts motion from rest, so a single quiet step proves nothing.
    pub settle_window: u64,
}

impl Default for TensileConfig {
    fn default() -> Self {
        Self {
            increments: 10,
            settle_threshold: None,
            max_steps_per_increment: 1_000_000,
            min_steps: 5,
            settle_window: 20,
        }
    }
}

/// One settled increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensileRow {
    pub increment: u32,
    pub input_scale: Scalar,
    /// Mean displacement of the pulled region along its pull direction (m).
    pub displacement: Scalar,
    /// Reaction force of the pulled region along its pull direction (N).
    pub force: Scalar,
    /// Engineering values, only for a basic two-region set-up.
    pub strain: Option<Scalar>,
    pub stress: Option<Scalar>,
    pub modulus: Option<Scalar>,
}

/// Gauge of a basic set-up: one fixed region, one displaced region.
#[derive(Debug, Clone, Copy)]
struct Gauge {
    length: Scalar,
    area: Scalar,
}

pub struct TensileTest {
    pub config: TensileConfig,
}

impl TensileTest {
    pub fn new(config: TensileConfig) -> Self {
        Self { config }
    }

    /// Runs the test on an imported simulation.
    ///
    /// `progress` is called after each increment with the number of
    /// increments done and the total. Equilibrium mode is on for the
    /// duration of the run and restored afterwards.
    pub fn run<F>(
        &self,
        sim: &mut Simulation,
        cancel: Option<&AtomicBool>,
        mut progress: F,
    ) -> VoxsimResult<Vec<TensileRow>>
    where
        F: FnMut(u32, u32),
    {
        if self.config.increments == 0 {
            return Err(VoxsimError::InvalidConfig("tensile test needs at least one increment".into()));
        }
        sim.preflight()?;

        let regions = &sim.environment().regions;
        let pull = regions
            .iter()
            .position(|r| r.displacement != DVec3::ZERO)
            .ok_or_else(|| {
                VoxsimError::InvalidBoundary("tensile test needs a region with a prescribed displacement".into())
            })?;
        let direction = regions[pull].displacement.normalize();
        let gauge = basic_gauge(sim, pull, direction);
        info!(
            increments = self.config.increments,
            engineering = gauge.is_some(),
            "tensile test started"
        );

        let was_equilibrium = sim.config().features.equilibrium_mode;
        sim.set_equilibrium_mode(true);
        let result = self.ramp(sim, cancel, pull, direction, gauge, &mut progress);
        sim.set_equilibrium_mode(was_equilibrium);
        result
    }

    fn ramp<F>(
        &self,
        sim: &mut Simulation,
        cancel: Option<&AtomicBool>,
        pull: usize,
        direction: DVec3,
        gauge: Option<Gauge>,
        progress: &mut F,
    ) -> VoxsimResult<Vec<TensileRow>>
    where
        F: FnMut(u32, u32),
    {
        let n = self.config.increments;
        let mut threshold = self.config.settle_threshold;
        let mut rows = Vec::with_capacity(n as usize);

        for i in 0..n {
            let input_scale = (i + 1) as Scalar / n as Scalar;
            sim.scale_external_inputs(input_scale);

            loop {
                let broken = sim.stats().broken_bonds;
                self.settle(sim, cancel, &mut threshold)?;
                if sim.stats().broken_bonds == broken {
                    break;
                }
                debug!(increment = i, broken = sim.stats().broken_bonds, "bonds broke, settling again");
            }

            let region = &sim.region_stats()[pull];
            let displacement = region.average_displacement.dot(direction);
            let force = region.force_along_displacement;
            let (strain, stress, modulus) = match gauge {
                Some(g) => {
                    let strain = displacement / g.length;
                    let stress = force / g.area;
                    let modulus = (strain != 0.0).then(|| stress / strain);
                    (Some(strain), Some(stress), modulus)
                }
                None => (None, None, None),
            };
            rows.push(TensileRow {
                increment: i,
                input_scale,
                displacement,
                force,
                strain,
                stress,
                modulus,
            });
            progress(i + 1, n);
        }

        info!(rows = rows.len(), steps = sim.step_count(), "tensile test finished");
        Ok(rows)
    }

    /// Steps until the largest per-step move stays below the threshold for
    /// a whole settle window.
    fn settle(
        &self,
        sim: &mut Simulation,
        cancel: Option<&AtomicBool>,
        threshold: &mut Option<Scalar>,
    ) -> VoxsimResult<()> {
        let start = sim.step_count();
        let mut peak: Scalar = 0.0;
        let mut quiet: u64 = 0;
        loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!(steps = sim.step_count(), "tensile test cancelled");
                return Err(VoxsimError::Cancelled { steps: sim.step_count() });
            }
            sim.time_step()?;

            let steps = sim.step_count() - start;
            let moved = sim.stats().max_move;
            peak = peak.max(moved);
            if threshold.is_none() && steps >= self.config.min_steps && moved < peak {
                let limit = peak * AUTO_THRESHOLD_FRACTION;
                debug!(limit, "settle threshold derived from first motion peak");
                *threshold = Some(limit);
            }
            match *threshold {
                Some(limit) if moved < limit => quiet += 1,
                _ => quiet = 0,
            }
            if steps >= self.config.min_steps && quiet >= self.config.settle_window.max(1) {
                debug!(steps, "increment settled");
                return Ok(());
            }
            if steps >= self.config.max_steps_per_increment {
                warn!(steps, moved, "increment did not settle within the step limit");
                return Ok(());
            }
        }
    }
}

/// Gauge length and area when the environment is one fully fixed,
/// undisplaced region plus the fully fixed pulled region.
fn basic_gauge(sim: &Simulation, pull: usize, direction: DVec3) -> Option<Gauge> {
    let regions = &sim.environment().regions;
    if regions.len() != 2 || !regions.iter().all(|r| r.is_all_fixed()) {
        return None;
    }
    let anchor = 1 - pull;
    if regions[anchor].displacement != DVec3::ZERO {
        return None;
    }
    let members = sim.region_members();
    let centroid = |i: usize| -> Option<DVec3> {
        let ids = &members[i];
        if ids.is_empty() {
            return None;
        }
        let sum = ids
            .iter()
            .filter_map(|id| sim.voxel(*id))
            .fold(DVec3::ZERO, |acc, v| acc + v.nominal_position);
        Some(sum / ids.len() as Scalar)
    };
    let length = (centroid(pull)? - centroid(anchor)?).dot(direction).abs();
    let size = sim.lattice().voxel_size();
    let area = members[pull].len() as Scalar * size * size;
    (length > 0.0).then_some(Gauge { length, area })
}
