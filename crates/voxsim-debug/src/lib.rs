//! # voxsim-debug
//!
//! Inspection hooks and state snapshots for debugging simulation runs.
//! Hooks observe a run step by step without touching the solver; snapshots
//! serialize voxel and bond state to binary so two runs can be compared.

pub mod hooks;
pub mod inspector;
pub mod snapshot;

pub use hooks::{InspectionHook, TelemetryHook};
pub use inspector::Inspector;
pub use snapshot::{BondState, SnapshotDiff, StateSnapshot, VoxelState};
