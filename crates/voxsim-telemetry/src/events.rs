//! Simulation event types.
//!
//! Events are small value types tagged with the step they belong to. They
//! carry plain numbers so the bus does not depend on the solver.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Step count at the time of the event.
    pub step: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A step is about to run.
    StepBegin {
        /// Simulated time before the step (s).
        time: f64,
        /// Timestep about to be used (s).
        dt: f64,
    },

    /// A step finished.
    StepEnd {
        /// Wall-clock time spent in the step (s).
        wall_time: f64,
    },

    /// Summary statistics after a step.
    Statistics {
        kinetic_energy: f64,
        strain_energy: f64,
        max_displacement: f64,
        max_velocity: f64,
        max_bond_stress: f64,
    },

    /// Collision bonds were rebuilt.
    CollisionRebuild {
        /// Number of collision bonds after the rebuild.
        pairs: u32,
    },

    /// Internal bonds crossed their yield point since the last report.
    BondYielded {
        /// Total yielded bonds.
        total: u32,
    },

    /// Internal bonds failed since the last report.
    BondBroken {
        /// Total broken bonds.
        total: u32,
    },

    /// The run ended.
    StopCondition {
        /// Human-readable terminal status.
        status: String,
    },

    /// Progress of a bounded run or tensile ramp.
    Progress {
        done: u64,
        total: u64,
    },

    /// Free-form event for extensions.
    Custom {
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl SimulationEvent {
    pub fn new(step: u64, kind: EventKind) -> Self {
        Self { step, kind }
    }

    /// Short tag for the event kind, used by line-oriented sinks.
    pub fn tag(&self) -> &'static str {
        match self.kind {
            EventKind::StepBegin { .. } => "step_begin",
            EventKind::StepEnd { .. } => "step_end",
            EventKind::Statistics { .. } => "statistics",
            EventKind::CollisionRebuild { .. } => "collision_rebuild",
            EventKind::BondYielded { .. } => "bond_yielded",
            EventKind::BondBroken { .. } => "bond_broken",
            EventKind::StopCondition { .. } => "stop_condition",
            EventKind::Progress { .. } => "progress",
            EventKind::Custom { .. } => "custom",
        }
    }
}
