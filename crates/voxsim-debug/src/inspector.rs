//! Stepping a simulation with hooks attached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::debug;
use voxsim_solver::{Simulation, StopStatus};
use voxsim_types::{VoxsimError, VoxsimResult};

use crate::hooks::InspectionHook;

/// Drives a [`Simulation`] one step at a time and reports to its hooks.
#[derive(Default)]
pub struct Inspector {
    hooks: Vec<Box<dyn InspectionHook>>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hook(&mut self, hook: Box<dyn InspectionHook>) {
        debug!(hook = hook.name(), "inspection hook added");
        self.hooks.push(hook);
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Hands the hooks back, e.g. to drain a [`TelemetryHook`](crate::TelemetryHook).
    pub fn into_hooks(self) -> Vec<Box<dyn InspectionHook>> {
        self.hooks
    }

    /// Runs one step. Divergence is reported through `on_stop`, not as an error.
    pub fn step(&mut self, sim: &mut Simulation) -> VoxsimResult<()> {
        let step = sim.step_count();
        let collisions = sim.collision_bond_count();
        for hook in &mut self.hooks {
            hook.on_step_begin(step, sim.time(), sim.dt());
        }

        let start = Instant::now();
        let result = sim.time_step();
        let wall_time = start.elapsed().as_secs_f64();
        match result {
            Ok(()) | Err(VoxsimError::Diverged { .. }) => {}
            Err(e) => return Err(e),
        }

        let step = sim.step_count();
        let pairs = sim.collision_bond_count();
        for hook in &mut self.hooks {
            hook.on_step_end(step, wall_time);
            hook.on_statistics(step, sim.stats());
            if pairs != collisions {
                hook.on_collision_rebuild(step, pairs);
            }
        }
        if sim.status().is_terminal() {
            self.stop(step, sim.status());
        }
        Ok(())
    }

    /// Steps until the simulation reaches a terminal status.
    pub fn run(&mut self, sim: &mut Simulation, cancel: Option<&AtomicBool>) -> VoxsimResult<StopStatus> {
        sim.preflight()?;
        while !sim.status().is_terminal() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                let status = StopStatus::Cancelled { steps: sim.step_count() };
                self.stop(sim.step_count(), &status);
                return Ok(status);
            }
            self.step(sim)?;
        }
        Ok(sim.status().clone())
    }

    fn stop(&mut self, step: u64, status: &StopStatus) {
        for hook in &mut self.hooks {
            hook.on_stop(step, status);
        }
    }
}
