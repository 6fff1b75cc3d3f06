//! Stop conditions and the histories they are judged on.
//!
//! A run is `Running` until its [`StopCondition`] is met (`Reached`), the
//! state goes non-finite (`Diverged`), or a driver cancels it
//! (`Cancelled`). None of these are errors; they are the terminal states
//! a driver reports.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use voxsim_types::constants::{HISTORY_SAMPLE_INTERVAL, HISTORY_SIZE};
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

use crate::stats::SimStats;

/// When a run should stop.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum StopCondition {
    /// Never stops on its own.
    #[default]
    None,
    MaxTimeSteps(u64),
    /// Simulated time in seconds.
    MaxSimTime(Scalar),
    /// Number of temperature periods. Never met with a zero period.
    TempCycles(Scalar),
    /// Energy plateau: the sampled total energy varies by no more than
    /// this fraction of its mean across a full history window.
    ConstMaxEnergy(Scalar),
    /// Sampled kinetic energy per voxel stays below this value (J) across
    /// a full history window.
    MinKE(Scalar),
    /// Largest single-voxel move in one step falls below this distance (m).
    MinMaxMove(Scalar),
}

impl StopCondition {
    pub fn name(&self) -> &str {
        match self {
            StopCondition::None => "none",
            StopCondition::MaxTimeSteps(_) => "max_time_steps",
            StopCondition::MaxSimTime(_) => "max_sim_time",
            StopCondition::TempCycles(_) => "temp_cycles",
            StopCondition::ConstMaxEnergy(_) => "const_max_energy",
            StopCondition::MinKE(_) => "min_ke",
            StopCondition::MinMaxMove(_) => "min_max_move",
        }
    }

    pub fn validate(&self) -> VoxsimResult<()> {
        let value = match *self {
            StopCondition::None | StopCondition::MaxTimeSteps(_) => return Ok(()),
            StopCondition::MaxSimTime(v)
            | StopCondition::TempCycles(v)
            | StopCondition::ConstMaxEnergy(v)
            | StopCondition::MinKE(v)
            | StopCondition::MinMaxMove(v) => v,
        };
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(VoxsimError::InvalidConfig(format!(
                "stop condition {} needs a non-negative value, got {value}",
                self.name()
            )))
        }
    }

    /// Evaluates the condition against the current run state.
    pub fn is_met(&self, probe: &StopProbe<'_>) -> bool {
        let voxels = probe.voxel_count.max(1) as Scalar;
        match *self {
            StopCondition::None => false,
            StopCondition::MaxTimeSteps(n) => probe.step >= n,
            StopCondition::MaxSimTime(t) => probe.time >= t,
            StopCondition::TempCycles(n) => {
                probe.temperature_period > 0.0 && probe.time >= n * probe.temperature_period
            }
            StopCondition::ConstMaxEnergy(fraction) => {
                let energy = &probe.histories.total;
                energy.is_full() && energy.max() - energy.min() <= fraction * energy.mean().abs()
            }
            StopCondition::MinKE(limit) => {
                let kinetic = &probe.histories.kinetic;
                kinetic.is_full() && kinetic.max() / voxels < limit
            }
            StopCondition::MinMaxMove(limit) => probe.step > 0 && probe.max_move < limit,
        }
    }
}

/// Snapshot of the run state a stop condition is judged on.
#[derive(Debug, Clone, Copy)]
pub struct StopProbe<'a> {
    pub step: u64,
    pub time: Scalar,
    pub temperature_period: Scalar,
    pub max_move: Scalar,
    pub voxel_count: usize,
    pub histories: &'a StopHistories,
}

/// Where a run stands.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum StopStatus {
    #[default]
    Running,
    Reached(StopCondition),
    Diverged {
        step: u64,
        reason: String,
    },
    Cancelled {
        steps: u64,
    },
}

impl StopStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StopStatus::Running)
    }
}

/// Fixed-capacity window of the most recent samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    values: VecDeque<Scalar>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, dropping the oldest once full.
    pub fn push(&mut self, value: Scalar) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.values.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn latest(&self) -> Option<Scalar> {
        self.values.back().copied()
    }

    /// Largest sample, or `-inf` when empty.
    pub fn max(&self) -> Scalar {
        self.values.iter().copied().fold(Scalar::NEG_INFINITY, Scalar::max)
    }

    /// Smallest sample, or `+inf` when empty.
    pub fn min(&self) -> Scalar {
        self.values.iter().copied().fold(Scalar::INFINITY, Scalar::min)
    }

    /// Mean of the samples, zero when empty.
    pub fn mean(&self) -> Scalar {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<Scalar>() / self.values.len() as Scalar
    }

    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.values.iter().copied()
    }
}

/// Long-window histories sampled every [`HISTORY_SAMPLE_INTERVAL`] steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopHistories {
    pub kinetic: History,
    pub total: History,
    pub max_move: History,
}

impl Default for StopHistories {
    fn default() -> Self {
        Self {
            kinetic: History::new(HISTORY_SIZE),
            total: History::new(HISTORY_SIZE),
            max_move: History::new(HISTORY_SIZE),
        }
    }
}

impl StopHistories {
    /// Records `stats` if `step` falls on a sampling boundary.
    pub fn sample(&mut self, step: u64, stats: &SimStats) {
        if step % HISTORY_SAMPLE_INTERVAL != 0 {
            return;
        }
        self.kinetic.push(stats.total_kinetic_energy);
        self.total.push(stats.total_energy());
        self.max_move.push(stats.max_move);
    }

    pub fn clear(&mut self) {
        self.kinetic.clear();
        self.total.clear();
        self.max_move.clear();
    }
}
