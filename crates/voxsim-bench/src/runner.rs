//! Benchmark runner: imports a scenario, steps it and collects metrics.

use std::time::Instant;

use tracing::{info, warn};
use voxsim_solver::{Simulation, StopStatus};
use voxsim_types::{VoxsimError, VoxsimResult};

use crate::metrics::BenchmarkMetrics;
use crate::scenarios::{Probe, Scenario, ScenarioKind};

pub struct BenchmarkRunner;

impl BenchmarkRunner {
    pub fn run(scenario: &Scenario) -> VoxsimResult<BenchmarkMetrics> {
        let mut sim = Simulation::new(scenario.config.clone());
        sim.import(
            scenario.lattice.clone(),
            scenario.palette.clone(),
            scenario.environment.clone(),
        )?;
        sim.preflight()?;

        let mut step_times = Vec::new();
        let total_start = Instant::now();
        while !sim.status().is_terminal() && sim.step_count() < scenario.max_steps {
            let start = Instant::now();
            match sim.time_step() {
                Ok(()) => {}
                Err(VoxsimError::Diverged { step, reason }) => {
                    warn!(scenario = scenario.kind.name(), step, %reason, "benchmark diverged");
                    break;
                }
                Err(e) => return Err(e),
            }
            step_times.push(start.elapsed().as_secs_f64());
        }
        let total_wall_time = total_start.elapsed().as_secs_f64();

        let avg_step_time = if step_times.is_empty() {
            0.0
        } else {
            step_times.iter().sum::<f64>() / step_times.len() as f64
        };
        let min_step_time = step_times.iter().copied().fold(f64::MAX, f64::min);
        let max_step_time = step_times.iter().copied().fold(0.0, f64::max);

        let status = match sim.status() {
            StopStatus::Running => "capped".to_string(),
            StopStatus::Reached(condition) => condition.name().to_string(),
            StopStatus::Diverged { .. } => "diverged".to_string(),
            StopStatus::Cancelled { .. } => "cancelled".to_string(),
        };
        let measured = measure(&sim, scenario.probe)?;
        let stats = sim.stats();
        let metrics = BenchmarkMetrics {
            scenario: scenario.kind.name().to_string(),
            voxel_count: sim.voxels().len(),
            bond_count: sim.internal_bond_count(),
            timesteps: sim.step_count(),
            sim_time: sim.time(),
            total_wall_time,
            avg_step_time,
            min_step_time: if step_times.is_empty() { 0.0 } else { min_step_time },
            max_step_time,
            final_kinetic_energy: stats.total_kinetic_energy,
            max_displacement: stats.max_voxel_displacement,
            broken_bonds: stats.broken_bonds,
            status,
            measured,
            reference: scenario.reference,
        };
        info!(
            scenario = %metrics.scenario,
            steps = metrics.timesteps,
            wall_time = metrics.total_wall_time,
            error = ?metrics.relative_error(),
            "benchmark finished"
        );
        Ok(metrics)
    }

    pub fn run_all() -> VoxsimResult<Vec<BenchmarkMetrics>> {
        ScenarioKind::all()
            .iter()
            .map(|&kind| Self::run(&Scenario::from_kind(kind)))
            .collect()
    }
}

fn measure(sim: &Simulation, probe: Probe) -> VoxsimResult<f64> {
    match probe {
        Probe::VerticalDisplacement { cell: [i, j, k] } => sim
            .voxel_at(i, j, k)
            .map(|v| v.displacement().z.abs())
            .ok_or_else(|| VoxsimError::InvalidLattice(format!("no voxel at cell ({i}, {j}, {k})"))),
        Probe::RegionForce { region } => sim
            .region_stats()
            .get(region)
            .map(|r| r.force_along_displacement)
            .ok_or_else(|| VoxsimError::InvalidBoundary(format!("no boundary region {region}"))),
        Probe::FloorContacts => Ok(sim.stats().voxels_on_floor as f64),
        Probe::MaxDisplacement => Ok(sim
            .voxels()
            .iter()
            .map(|v| v.displacement().length())
            .fold(0.0, f64::max)),
    }
}
