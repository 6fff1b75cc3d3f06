//! Running a simulation on a worker thread.
//!
//! The worker owns the [`Simulation`] for the length of the run and hands
//! it back on [`SimulationTask::join`]. Progress flows back over a
//! channel; cancellation is a shared flag checked between steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::debug;
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

use crate::simulation::Simulation;
use crate::stop::{StopCondition, StopStatus};

/// A progress report from a running task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub step: u64,
    pub time: Scalar,
    /// Completed fraction for step- or time-bounded runs.
    pub fraction: Option<Scalar>,
}

impl Progress {
    pub fn of(sim: &Simulation) -> Self {
        let fraction = match sim.config().stop {
            StopCondition::MaxTimeSteps(n) if n > 0 => Some(sim.step_count() as Scalar / n as Scalar),
            StopCondition::MaxSimTime(t) if t > 0.0 => Some(sim.time() / t),
            _ => None,
        };
        Self {
            step: sim.step_count(),
            time: sim.time(),
            fraction: fraction.map(|f| f.clamp(0.0, 1.0)),
        }
    }
}

type TaskOutput = (Simulation, VoxsimResult<StopStatus>);

/// A simulation running on its own thread.
pub struct SimulationTask {
    cancel: Arc<AtomicBool>,
    progress: Receiver<Progress>,
    handle: JoinHandle<TaskOutput>,
}

impl SimulationTask {
    /// Starts running `sim` on a new thread, reporting progress every
    /// `report_every` steps (at least 1).
    pub fn spawn(mut sim: Simulation, report_every: u64) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let flag = Arc::clone(&cancel);
        let every = report_every.max(1);

        let handle = std::thread::spawn(move || {
            let result = sim.run_with(Some(&flag), |s| {
                if s.step_count() % every == 0 {
                    // The receiver may be gone; the run goes on regardless.
                    let _ = tx.send(Progress::of(s));
                }
            });
            debug!(steps = sim.step_count(), "simulation task finished");
            (sim, result)
        });

        Self {
            cancel,
            progress: rx,
            handle,
        }
    }

    /// Asks the worker to stop after its current step.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Drains the progress reports received so far.
    pub fn poll_progress(&self) -> Vec<Progress> {
        self.progress.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker and returns the simulation with its final status.
    pub fn join(self) -> VoxsimResult<(Simulation, StopStatus)> {
        let (sim, result) = self
            .handle
            .join()
            .map_err(|_| VoxsimError::InvariantViolation("simulation worker panicked".into()))?;
        Ok((sim, result?))
    }
}
