//! CLI command implementations.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use voxsim_bench::metrics::BenchmarkMetrics;
use voxsim_bench::runner::BenchmarkRunner;
use voxsim_bench::scenarios::{Scenario, ScenarioKind};
use voxsim_debug::hooks::TelemetryHook;
use voxsim_debug::inspector::Inspector;
use voxsim_debug::snapshot::StateSnapshot;
use voxsim_io::contract::{SimulationInput, SimulationOutput};
use voxsim_io::validator::{lint_input, validate_input};
use voxsim_solver::{StopCondition, StopStatus, TensileRow, TensileTest};
use voxsim_telemetry::sinks::{JsonLinesSink, TracingSink};
use voxsim_telemetry::EventBus;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Run a simulation from an input file.
pub fn simulate(
    input_path: &Path,
    output_path: Option<&Path>,
    max_steps: Option<u64>,
    snapshot_path: Option<&Path>,
    events_path: Option<&Path>,
) -> CommandResult {
    println!("voxsim Simulation");
    println!("─────────────────");
    println!("Input: {}", input_path.display());

    let mut input = SimulationInput::load(input_path)?;
    if let Some(steps) = max_steps {
        input.config.stop = StopCondition::MaxTimeSteps(steps);
    }
    if input.config.stop == StopCondition::None {
        return Err("the input has no stop condition; pass --max-steps".into());
    }
    for warning in lint_input(&input) {
        println!("Warning: {warning}");
    }

    let mut sim = input.build()?;
    println!(
        "Voxels: {}, bonds: {}, dt: {:.3e}s",
        sim.voxels().len(),
        sim.internal_bond_count(),
        sim.dt()
    );
    println!();

    let mut bus = EventBus::new();
    bus.add_sink(Box::new(TracingSink::new(tracing::Level::DEBUG)));
    if let Some(path) = events_path {
        bus.add_sink(Box::new(JsonLinesSink::new(BufWriter::new(File::create(path)?))));
    }
    let mut inspector = Inspector::new();
    inspector.add_hook(Box::new(TelemetryHook::forwarding(bus.sender())));
    let status = inspector.run(&mut sim, None)?;
    bus.finish();

    let stats = sim.stats();
    println!("Status:        {}", describe(&status));
    println!("Steps:         {}", sim.step_count());
    println!("Sim time:      {:.6}s", sim.time());
    println!("Max displace:  {:.6e}m", stats.max_voxel_displacement);
    println!("Max stress:    {:.6e}Pa", stats.max_bond_stress);
    println!("Kinetic E:     {:.6e}J", stats.total_kinetic_energy);
    println!("Broken bonds:  {}", stats.broken_bonds);
    for region in sim.region_stats() {
        println!(
            "Region {:<12} force [{:.4e}, {:.4e}, {:.4e}]N",
            region.name, region.force.x, region.force.y, region.force.z
        );
    }

    if let Some(path) = snapshot_path {
        StateSnapshot::capture(&sim).write(path)?;
        println!("Snapshot written to: {}", path.display());
    }
    if let Some(path) = events_path {
        println!("Events written to: {}", path.display());
    }
    if let Some(path) = output_path {
        std::fs::write(path, SimulationOutput::from_simulation(&sim).to_json()?)?;
        println!("Results written to: {}", path.display());
    }
    Ok(())
}

/// Run a tensile test from an input file.
pub fn tensile(input_path: &Path, increments: Option<u32>, csv_path: Option<&Path>) -> CommandResult {
    println!("voxsim Tensile Test");
    println!("───────────────────");
    println!("Input: {}", input_path.display());
    println!();

    let input = SimulationInput::load(input_path)?;
    let mut config = input.tensile.clone().unwrap_or_default();
    if let Some(n) = increments {
        config.increments = n;
    }
    let mut sim = input.build()?;
    let rows = TensileTest::new(config).run(&mut sim, None, |done, total| {
        println!("  increment {done}/{total}");
    })?;
    println!();

    let csv = tensile_csv(&rows);
    if let Some(path) = csv_path {
        std::fs::write(path, &csv)?;
        println!("Results written to: {}", path.display());
    } else {
        println!("{csv}");
    }
    Ok(())
}

fn tensile_csv(rows: &[TensileRow]) -> String {
    let optional = |v: Option<f64>| v.map(|v| format!("{v:.6e}")).unwrap_or_default();
    let mut csv = "increment,input_scale,displacement_m,force_n,strain,stress_pa,modulus_pa".to_string();
    for row in rows {
        csv.push_str(&format!(
            "\n{},{:.4},{:.6e},{:.6e},{},{},{}",
            row.increment,
            row.input_scale,
            row.displacement,
            row.force,
            optional(row.strain),
            optional(row.stress),
            optional(row.modulus),
        ));
    }
    csv
}

/// Run the benchmark suite.
pub fn benchmark(scenario_name: &str, max_steps: Option<u64>, output_path: Option<&Path>) -> CommandResult {
    println!("voxsim Benchmark Suite");
    println!("══════════════════════");
    println!();

    let scenarios: Vec<ScenarioKind> = if scenario_name == "all" {
        ScenarioKind::all().to_vec()
    } else {
        match ScenarioKind::from_name(scenario_name) {
            Some(kind) => vec![kind],
            None => {
                let available: Vec<&str> = ScenarioKind::all().iter().map(|k| k.name()).collect();
                return Err(format!("Unknown scenario: '{scenario_name}'. Available: {}, all", available.join(", ")).into());
            }
        }
    };

    let mut all_metrics = Vec::new();
    for &kind in &scenarios {
        let mut scenario = Scenario::from_kind(kind);
        if let Some(steps) = max_steps {
            scenario = scenario.with_max_steps(steps);
        }
        println!(
            "Running: {} ({} voxels, up to {} steps)",
            kind.name(),
            scenario.lattice.occupied_count(),
            scenario.max_steps
        );

        let metrics = BenchmarkRunner::run(&scenario).map_err(|e| format!("Benchmark failed: {e}"))?;
        println!("  Wall time:     {:.3}s", metrics.total_wall_time);
        println!("  Steps:         {} ({})", metrics.timesteps, metrics.status);
        println!("  Avg step:      {:.4}ms", metrics.avg_step_time * 1000.0);
        println!("  Measured:      {:.6e}", metrics.measured);
        if let Some(error) = metrics.relative_error() {
            println!("  Rel. error:    {:.3}%", error * 100.0);
        }
        println!();
        all_metrics.push(metrics);
    }

    let csv = BenchmarkMetrics::to_csv(&all_metrics);
    if let Some(path) = output_path {
        std::fs::write(path, &csv)?;
        println!("Results written to: {}", path.display());
    } else {
        println!("CSV Output:");
        println!("{csv}");
    }
    Ok(())
}

/// Inspect a state snapshot.
pub fn inspect(path: &Path, compare: Option<&Path>) -> CommandResult {
    println!("voxsim Snapshot Inspector");
    println!("─────────────────────────");
    println!();

    let snapshot = StateSnapshot::read(path)?;
    println!("Step:         {}", snapshot.step);
    println!("Sim time:     {:.6}s", snapshot.time);
    println!("Voxels:       {}", snapshot.voxels.len());
    println!("Bonds:        {}", snapshot.bonds.len());
    println!("Yielded:      {}", snapshot.bonds.iter().filter(|b| b.yielded).count());
    println!("Broken:       {}", snapshot.bonds.iter().filter(|b| b.broken).count());
    if !snapshot.voxels.is_empty() {
        let (lo, hi) = snapshot.voxels.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v.position[2]), hi.max(v.position[2]))
        });
        println!("Z range:      [{lo:.6}, {hi:.6}]");
    }
    if let Some(max) = snapshot.bonds.iter().map(|b| b.strain.abs()).reduce(f64::max) {
        println!("Max |strain|: {max:.6e}");
    }

    if let Some(other) = compare {
        let diff = snapshot.diff(&StateSnapshot::read(other)?)?;
        println!();
        println!("Compared with: {}", other.display());
        if diff.is_identical() {
            println!("Snapshots are identical.");
        } else {
            println!("Max position delta: {:.6e}m", diff.max_position_delta);
            println!("Max strain delta:   {:.6e}", diff.max_strain_delta);
            println!("Flag mismatches:    {}", diff.flag_mismatches);
        }
    }
    Ok(())
}

/// Validate a simulation input.
pub fn validate(input_path: &Path) -> CommandResult {
    println!("voxsim Validator");
    println!("────────────────");
    println!();

    let input = SimulationInput::load(input_path)?;
    validate_input(&input)?;
    println!("Voxels:     {}", input.lattice.occupied_count());
    println!("Materials:  {}", input.palette.len());
    println!("Regions:    {}", input.environment.regions.len());
    println!("Stop:       {}", input.config.stop.name());
    for warning in lint_input(&input) {
        println!("Warning: {warning}");
    }
    println!("✅ Input is valid.");
    Ok(())
}

fn describe(status: &StopStatus) -> String {
    match status {
        StopStatus::Running => "running".to_string(),
        StopStatus::Reached(condition) => format!("reached {}", condition.name()),
        StopStatus::Diverged { step, reason } => format!("diverged at step {step}: {reason}"),
        StopStatus::Cancelled { steps } => format!("cancelled after {steps} steps"),
    }
}
