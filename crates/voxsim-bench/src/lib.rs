//! # voxsim-bench
//!
//! Regression scenarios for the voxsim solver.
//!
//! Four procedural scenarios with timing and physical metrics, exported
//! as CSV or JSON for tracking across changes. Scenarios with a closed
//! form answer (cantilever, tensile pair) also report their error
//! against it.

pub mod metrics;
pub mod runner;
pub mod scenarios;

pub use metrics::BenchmarkMetrics;
pub use runner::BenchmarkRunner;
pub use scenarios::{Probe, Scenario, ScenarioKind};
