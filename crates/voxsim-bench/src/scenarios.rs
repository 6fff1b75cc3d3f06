//! Benchmark scenarios: lattice, materials, environment and config for
//! each case.
//!
//! 1. **Cantilever**: a clamped chain with a transverse tip load, checked
//!    against Euler beam theory
//! 2. **Tensile pair**: two voxels pulled apart by a prescribed
//!    displacement, checked against Hooke's law
//! 3. **Floor drop**: a block falling onto the floor under gravity
//! 4. **Thermal block**: a clamped bar cycling through a temperature swing

use glam::DVec3;
use serde::{Deserialize, Serialize};

use voxsim_lattice::generators::chain;
use voxsim_lattice::{BoundaryRegion, Environment, VoxelLattice};
use voxsim_material::{Material, MaterialPalette};
use voxsim_solver::{SimConfig, StopCondition};
use voxsim_types::{MaterialId, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioKind {
    Cantilever,
    TensilePair,
    FloorDrop,
    ThermalBlock,
}

impl ScenarioKind {
    pub fn all() -> &'static [ScenarioKind] {
        &[
            ScenarioKind::Cantilever,
            ScenarioKind::TensilePair,
            ScenarioKind::FloorDrop,
            ScenarioKind::ThermalBlock,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::Cantilever => "cantilever",
            ScenarioKind::TensilePair => "tensile_pair",
            ScenarioKind::FloorDrop => "floor_drop",
            ScenarioKind::ThermalBlock => "thermal_block",
        }
    }

    pub fn from_name(name: &str) -> Option<ScenarioKind> {
        Self::all().iter().copied().find(|k| k.name() == name)
    }
}

/// Quantity a scenario measures once the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Probe {
    /// |displacement.z| of the voxel at lattice cell `(i, j, k)`.
    VerticalDisplacement { cell: [usize; 3] },
    /// Reaction force of boundary region `region` along its prescribed displacement.
    RegionForce { region: usize },
    /// Number of voxels touching the floor.
    FloorContacts,
    /// Largest voxel displacement.
    MaxDisplacement,
}

/// A fully specified benchmark scenario.
pub struct Scenario {
    pub kind: ScenarioKind,
    pub lattice: VoxelLattice,
    pub palette: MaterialPalette,
    pub environment: Environment,
    pub config: SimConfig,
    /// Hard cap on steps, whatever the stop condition says.
    pub max_steps: u64,
    pub probe: Probe,
    /// Closed-form value of the probe, when one exists.
    pub reference: Option<Scalar>,
}

fn single_material(material: Material) -> MaterialPalette {
    let mut palette = MaterialPalette::empty();
    palette.add(material);
    palette
}

impl Scenario {
    /// 20 voxels of 1 mm along X, clamped at one end, tip loaded along -Z.
    ///
    /// Reference: tip deflection `F·L³ / (3·E·I)` with `L = 19 mm` between
    /// voxel centres and `I = s⁴/12`.
    pub fn cantilever() -> Self {
        let n = 20;
        let size = 0.001;
        let modulus = 1.0e6;
        let force = 3.0e-5;
        let end = 0.5 / n as Scalar;
        let environment = Environment::vacuum()
            .with_region(BoundaryRegion::fixed_box("root", DVec3::ZERO, DVec3::new(end, 1.0, 1.0)))
            .with_region(BoundaryRegion::forced_box(
                "tip",
                DVec3::new(1.0 - end, 0.0, 0.0),
                DVec3::new(end, 1.0, 1.0),
                DVec3::new(0.0, 0.0, -force),
            ));
        let length = (n - 1) as Scalar * size;
        let inertia = size.powi(4) / 12.0;
        Self {
            kind: ScenarioKind::Cantilever,
            lattice: chain(n, size, MaterialId(1)),
            palette: single_material(Material::linear("soft", modulus, 0.35, 1.0)),
            environment,
            config: SimConfig::quasi_static(),
            max_steps: 300_000,
            probe: Probe::VerticalDisplacement { cell: [n - 1, 0, 0] },
            reference: Some(force * length.powi(3) / (3.0 * modulus * inertia)),
        }
    }

    /// Two 1 m voxels, one anchored, the other displaced 1 mm along X.
    ///
    /// Reference: reaction force `E·A·ε` with `ε = 0.001`.
    pub fn tensile_pair() -> Self {
        let modulus = 1.0e6;
        let pull = 0.001;
        let environment = Environment::vacuum()
            .with_region(BoundaryRegion::fixed_box("anchor", DVec3::ZERO, DVec3::new(0.5, 1.0, 1.0)))
            .with_region(BoundaryRegion::displaced_box(
                "pull",
                DVec3::new(0.5, 0.0, 0.0),
                DVec3::new(0.5, 1.0, 1.0),
                DVec3::new(pull, 0.0, 0.0),
            ));
        let config = SimConfig {
            stop: StopCondition::MaxTimeSteps(50),
            ..SimConfig::quasi_static()
        };
        Self {
            kind: ScenarioKind::TensilePair,
            lattice: chain(2, 1.0, MaterialId(1)),
            palette: single_material(Material::linear("stiff", modulus, 0.35, 1000.0)),
            environment,
            config,
            max_steps: 50,
            probe: Probe::RegionForce { region: 1 },
            reference: Some(modulus * pull),
        }
    }

    /// A 3×3×3 block of 1 cm voxels starting two cells above the floor.
    pub fn floor_drop() -> Self {
        let lattice = VoxelLattice::from_fn([3, 3, 5], 0.01, |[_, _, k]| {
            if k >= 2 {
                MaterialId(1)
            } else {
                MaterialId::EMPTY
            }
        });
        let mut environment = Environment::default();
        environment.floor.enabled = true;
        let config = SimConfig {
            stop: StopCondition::MaxSimTime(0.15),
            ..SimConfig::dynamic()
        };
        Self {
            kind: ScenarioKind::FloorDrop,
            lattice,
            palette: single_material(Material::linear("rubber", 1.0e6, 0.35, 1000.0).with_friction(1.0, 0.5)),
            environment,
            config,
            max_steps: 20_000,
            probe: Probe::FloorContacts,
            reference: None,
        }
    }

    /// A 4-voxel bar of 1 cm clamped at one end, swinging ±10 °C over a
    /// 50 ms period.
    pub fn thermal_block() -> Self {
        let mut environment = Environment::vacuum().with_region(BoundaryRegion::fixed_box(
            "root",
            DVec3::ZERO,
            DVec3::new(0.125, 1.0, 1.0),
        ));
        environment.temperature.enabled = true;
        environment.temperature.vary = true;
        environment.temperature.amplitude = 10.0;
        environment.temperature.period = 0.05;
        let config = SimConfig {
            stop: StopCondition::TempCycles(1.0),
            ..SimConfig::default()
        };
        Self {
            kind: ScenarioKind::ThermalBlock,
            lattice: chain(4, 0.01, MaterialId(1)),
            palette: single_material(Material::linear("active", 1.0e6, 0.35, 1000.0).with_cte(1.0e-3, 0.0)),
            environment,
            config,
            max_steps: 20_000,
            probe: Probe::MaxDisplacement,
            reference: None,
        }
    }

    pub fn from_kind(kind: ScenarioKind) -> Self {
        match kind {
            ScenarioKind::Cantilever => Self::cantilever(),
            ScenarioKind::TensilePair => Self::tensile_pair(),
            ScenarioKind::FloorDrop => Self::floor_drop(),
            ScenarioKind::ThermalBlock => Self::thermal_block(),
        }
    }

    /// Caps the run at `steps`, for quick smoke runs.
    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }
}
