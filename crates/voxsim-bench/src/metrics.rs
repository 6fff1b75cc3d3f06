//! Metrics collected from one benchmark run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub scenario: String,
    pub voxel_count: usize,
    pub bond_count: usize,
    pub timesteps: u64,
    /// Simulated time at the end of the run (s).
    pub sim_time: f64,
    /// Total wall-clock time (s).
    pub total_wall_time: f64,
    pub avg_step_time: f64,
    pub min_step_time: f64,
    pub max_step_time: f64,
    pub final_kinetic_energy: f64,
    pub max_displacement: f64,
    pub broken_bonds: usize,
    /// Terminal status, or `capped` when the step cap ended the run.
    pub status: String,
    pub measured: f64,
    pub reference: Option<f64>,
}

impl BenchmarkMetrics {
    /// `|measured - reference| / |reference|`, when a reference exists.
    pub fn relative_error(&self) -> Option<f64> {
        self.reference
            .filter(|r| *r != 0.0)
            .map(|r| (self.measured - r).abs() / r.abs())
    }

    pub fn to_csv_header() -> String {
        "scenario,voxel_count,bond_count,timesteps,sim_time_s,total_wall_time_s,avg_step_ms,min_step_ms,max_step_ms,final_ke,max_displacement,broken_bonds,status,measured,reference,relative_error".to_string()
    }

    pub fn to_csv_row(&self) -> String {
        let optional = |v: Option<f64>| v.map(|v| format!("{v:.6e}")).unwrap_or_default();
        format!(
            "{},{},{},{},{:.6},{:.6},{:.4},{:.4},{:.4},{:.6e},{:.6e},{},{},{:.6e},{},{}",
            self.scenario,
            self.voxel_count,
            self.bond_count,
            self.timesteps,
            self.sim_time,
            self.total_wall_time,
            self.avg_step_time * 1000.0,
            self.min_step_time * 1000.0,
            self.max_step_time * 1000.0,
            self.final_kinetic_energy,
            self.max_displacement,
            self.broken_bonds,
            self.status,
            self.measured,
            optional(self.reference),
            optional(self.relative_error()),
        )
    }

    /// Header plus one row per run.
    pub fn to_csv(metrics: &[BenchmarkMetrics]) -> String {
        let mut csv = Self::to_csv_header();
        for m in metrics {
            csv.push('\n');
            csv.push_str(&m.to_csv_row());
        }
        csv
    }
}
