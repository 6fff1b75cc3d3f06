//! Simulation input/output contract types.

use std::path::Path;

use serde::{Deserialize, Serialize};
use voxsim_lattice::{Environment, VoxelLattice};
use voxsim_material::MaterialPalette;
use voxsim_solver::{RegionStats, SimConfig, SimStats, Simulation, StopStatus, TensileConfig, TensileRow};
use voxsim_types::{VoxsimError, VoxsimResult};

/// File format of a contract document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Picks the format from a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// Everything needed to set up a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub lattice: VoxelLattice,
    pub palette: MaterialPalette,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub config: SimConfig,
    /// Present when the input describes a tensile test.
    #[serde(default)]
    pub tensile: Option<TensileConfig>,
}

impl SimulationInput {
    pub fn new(lattice: VoxelLattice, palette: MaterialPalette, environment: Environment, config: SimConfig) -> Self {
        Self {
            lattice,
            palette,
            environment,
            config,
            tensile: None,
        }
    }

    pub fn parse(text: &str, format: Format) -> VoxsimResult<Self> {
        match format {
            Format::Toml => toml::from_str(text).map_err(|e| VoxsimError::Serialization(format!("TOML input: {e}"))),
            Format::Json => {
                serde_json::from_str(text).map_err(|e| VoxsimError::Serialization(format!("JSON input: {e}")))
            }
        }
    }

    pub fn render(&self, format: Format) -> VoxsimResult<String> {
        match format {
            Format::Toml => toml::to_string(self).map_err(|e| VoxsimError::Serialization(format!("TOML input: {e}"))),
            Format::Json => {
                serde_json::to_string_pretty(self).map_err(|e| VoxsimError::Serialization(format!("JSON input: {e}")))
            }
        }
    }

    pub fn load(path: &Path) -> VoxsimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, Format::from_path(path))
    }

    pub fn save(&self, path: &Path) -> VoxsimResult<()> {
        std::fs::write(path, self.render(Format::from_path(path))?)?;
        Ok(())
    }

    /// Validates the input and imports it into a fresh simulation.
    pub fn build(&self) -> VoxsimResult<Simulation> {
        crate::validator::validate_input(self)?;
        let mut sim = Simulation::new(self.config.clone());
        sim.import(self.lattice.clone(), self.palette.clone(), self.environment.clone())?;
        Ok(sim)
    }
}

/// Final state of one voxel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelResult {
    pub cell: [usize; 3],
    pub displacement: [f64; 3],
    pub pressure: f64,
    pub kinetic_energy: f64,
}

/// Results of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub status: StopStatus,
    pub steps: u64,
    pub time: f64,
    pub stats: SimStats,
    pub regions: Vec<RegionStats>,
    pub voxels: Vec<VoxelResult>,
    /// Rows of a tensile test; empty for plain runs.
    #[serde(default)]
    pub tensile: Vec<TensileRow>,
}

impl SimulationOutput {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let lattice = sim.lattice();
        let voxels = sim
            .voxels()
            .iter()
            .map(|v| VoxelResult {
                cell: lattice.coords(v.lattice_index),
                displacement: v.displacement().to_array(),
                pressure: v.pressure,
                kinetic_energy: v.kinetic_energy,
            })
            .collect();
        Self {
            status: sim.status().clone(),
            steps: sim.step_count(),
            time: sim.time(),
            stats: sim.stats().clone(),
            regions: sim.region_stats().to_vec(),
            voxels,
            tensile: Vec::new(),
        }
    }

    pub fn with_tensile(mut self, rows: Vec<TensileRow>) -> Self {
        self.tensile = rows;
        self
    }

    pub fn to_json(&self) -> VoxsimResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| VoxsimError::Serialization(format!("JSON output: {e}")))
    }

    pub fn from_json(text: &str) -> VoxsimResult<Self> {
        serde_json::from_str(text).map_err(|e| VoxsimError::Serialization(format!("JSON output: {e}")))
    }
}
