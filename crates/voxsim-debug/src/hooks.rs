//! Inspection hooks for live debugging.
//!
//! Hooks are driven by an [`Inspector`](crate::Inspector) around each
//! simulation step.
//!
//! ```text
//! for each step:
//!   hook.on_step_begin(...)
//!   hook.on_step_end(...)
//!   hook.on_statistics(...)
//!   hook.on_collision_rebuild(...)   // only when the collision set changed
//! hook.on_stop(...)
//! ```

use std::sync::mpsc::Sender;

use voxsim_solver::{SimStats, StopStatus};
use voxsim_telemetry::events::{EventKind, SimulationEvent};

/// Observer of a running simulation. All methods default to no-ops.
pub trait InspectionHook: Send {
    fn on_step_begin(&mut self, step: u64, time: f64, dt: f64) {
        let _ = (step, time, dt);
    }

    fn on_step_end(&mut self, step: u64, wall_time: f64) {
        let _ = (step, wall_time);
    }

    fn on_statistics(&mut self, step: u64, stats: &SimStats) {
        let _ = (step, stats);
    }

    fn on_collision_rebuild(&mut self, step: u64, pairs: usize) {
        let _ = (step, pairs);
    }

    /// Called once when the run reaches a terminal status.
    fn on_stop(&mut self, step: u64, status: &StopStatus) {
        let _ = (step, status);
    }

    fn name(&self) -> &str;
}

/// Turns hook callbacks into telemetry events.
///
/// Events are buffered for [`drain_events`](Self::drain_events), or sent
/// straight to an event bus when built with [`forwarding`](Self::forwarding).
/// Bond yield and failure events are emitted only when the respective
/// counts grow.
#[derive(Default)]
pub struct TelemetryHook {
    events: Vec<SimulationEvent>,
    sender: Option<Sender<SimulationEvent>>,
    yielded: usize,
    broken: usize,
}

impl TelemetryHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hook that sends every event to `sender`, typically from
    /// [`EventBus::sender`](voxsim_telemetry::EventBus::sender).
    pub fn forwarding(sender: Sender<SimulationEvent>) -> Self {
        Self {
            sender: Some(sender),
            ..Self::default()
        }
    }

    /// Takes the collected events for dispatch.
    pub fn drain_events(&mut self) -> Vec<SimulationEvent> {
        std::mem::take(&mut self.events)
    }

    fn push(&mut self, step: u64, kind: EventKind) {
        let event = SimulationEvent::new(step, kind);
        match &self.sender {
            // Fall back to buffering once the bus is gone.
            Some(tx) => {
                if let Err(returned) = tx.send(event) {
                    self.events.push(returned.0);
                }
            }
            None => self.events.push(event),
        }
    }
}

impl InspectionHook for TelemetryHook {
    fn on_step_begin(&mut self, step: u64, time: f64, dt: f64) {
        self.push(step, EventKind::StepBegin { time, dt });
    }

    fn on_step_end(&mut self, step: u64, wall_time: f64) {
        self.push(step, EventKind::StepEnd { wall_time });
    }

    fn on_statistics(&mut self, step: u64, stats: &SimStats) {
        self.push(
            step,
            EventKind::Statistics {
                kinetic_energy: stats.total_kinetic_energy,
                strain_energy: stats.total_strain_energy,
                max_displacement: stats.max_voxel_displacement,
                max_velocity: stats.max_voxel_velocity,
                max_bond_stress: stats.max_bond_stress,
            },
        );
        if stats.yielded_bonds > self.yielded {
            self.yielded = stats.yielded_bonds;
            self.push(step, EventKind::BondYielded { total: self.yielded as u32 });
        }
        if stats.broken_bonds > self.broken {
            self.broken = stats.broken_bonds;
            self.push(step, EventKind::BondBroken { total: self.broken as u32 });
        }
    }

    fn on_collision_rebuild(&mut self, step: u64, pairs: usize) {
        self.push(step, EventKind::CollisionRebuild { pairs: pairs as u32 });
    }

    fn on_stop(&mut self, step: u64, status: &StopStatus) {
        let status = match status {
            StopStatus::Running => "running".to_string(),
            StopStatus::Reached(condition) => format!("reached {}", condition.name()),
            StopStatus::Diverged { reason, .. } => format!("diverged: {reason}"),
            StopStatus::Cancelled { steps } => format!("cancelled after {steps} steps"),
        };
        self.push(step, EventKind::StopCondition { status });
    }

    fn name(&self) -> &str {
        "telemetry_hook"
    }
}
