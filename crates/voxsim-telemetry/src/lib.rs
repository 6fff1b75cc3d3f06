//! # voxsim-telemetry
//!
//! Event bus for simulation telemetry. The solver-facing side emits
//! structured events (step timing, statistics, collision rebuilds, bond
//! yield and failure, stop conditions) that pluggable sinks consume.
//!
//! ## Key Types
//!
//! - [`EventBus`]: Channel-backed dispatch to registered sinks
//! - [`SimulationEvent`] / [`EventKind`]: Step-tagged event payloads
//! - [`EventSink`]: Consumer trait, with [`VecSink`], [`TracingSink`] and [`JsonLinesSink`]

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, SimulationEvent};
pub use sinks::{EventSink, JsonLinesSink, SharedEvents, TracingSink, VecSink};
