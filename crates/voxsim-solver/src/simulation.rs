//! The lattice simulation: import, stepping and run drivers.
//!
//! Each step runs in phases:
//! 1. **Collisions**: rebuild collision bonds when voxels have moved far enough
//! 2. **Extensions**: sequentially write per-voxel control inputs
//! 3. **Bonds**: every bond recomputes its loads from voxel state (parallel)
//! 4. **Voxels**: every voxel integrates the loads of its bonds (parallel)
//! 5. **Relink**: bonds of voxels whose modulus changed re-derive their stiffness
//! 6. **Bookkeeping**: time, statistics, histories, equilibrium, divergence, stop condition
//!
//! Bonds only read voxels and voxels only read bonds, so within a phase
//! no element observes another element of the same phase mid-update.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use voxsim_contact::{BroadPhase, FloorContact, SpatialHash};
use voxsim_lattice::{Environment, Topology, VoxelLattice};
use voxsim_material::MaterialPalette;
use voxsim_math::{BondDir, DVec3};
use voxsim_types::{BondId, Scalar, VoxelId, VoxsimError, VoxsimResult};

use crate::bond::Bond;
use crate::collision_bond::CollisionBond;
use crate::config::{Damping, SimConfig};
use crate::context::{BondContext, VoxelContext};
use crate::extension::VoxelExtension;
use crate::internal_bond::InternalBond;
use crate::link::BondLink;
use crate::stats::{RegionStats, SimStats, StatMask};
use crate::stop::{History, StopCondition, StopHistories, StopProbe, StopStatus};
use crate::voxel::{Voxel, VoxelControl};

/// Kinetic energy samples kept to detect the passing of a peak in
/// equilibrium mode.
const EQUILIBRIUM_WINDOW: usize = 6;

/// Bond damping used while equilibrium mode is on.
const EQUILIBRIUM_BOND_DAMPING: Scalar = 0.1;

/// Settings overridden by equilibrium mode, restored when it is turned off.
#[derive(Debug, Clone, Copy)]
struct SavedSettings {
    damping: Damping,
    max_velocity: bool,
}

/// A voxel lattice simulation.
///
/// Owns the voxel and bond arenas, its configuration and environment.
/// Call [`import`](Self::import) before stepping.
pub struct Simulation {
    config: SimConfig,
    saved: Option<SavedSettings>,
    environment: Environment,
    palette: MaterialPalette,
    lattice: VoxelLattice,
    topology: Option<Topology>,

    voxels: Vec<Voxel>,
    bonds: Vec<Bond>,
    internal_bond_count: usize,

    /// Voxels of each boundary region.
    region_members: Vec<Vec<VoxelId>>,
    region_stats: Vec<RegionStats>,

    extensions: Vec<Box<dyn VoxelExtension>>,
    /// Extension outputs, one per voxel.
    controls: Vec<VoxelControl>,
    broad_phase: Option<Box<dyn BroadPhase>>,
    /// Surface voxels, in the order handed to the broad phase.
    surface: Vec<usize>,
    /// For each voxel, the sorted voxels it must never collide with.
    nearby: Vec<Vec<u32>>,
    collisions_built: bool,
    /// Upper bound on how far any voxel moved since the last rebuild.
    motion_since_rebuild: Scalar,

    dt: Scalar,
    optimal_dt: Scalar,
    dt_frozen: bool,
    time: Scalar,
    step: u64,

    stats: SimStats,
    histories: StopHistories,
    kinetic_window: History,
    status: StopStatus,
    initialized: bool,
}

impl Simulation {
    /// Creates an empty simulation. Nothing can step until [`import`](Self::import).
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            saved: None,
            environment: Environment::default(),
            palette: MaterialPalette::empty(),
            lattice: VoxelLattice::new([1, 1, 1], 1.0),
            topology: None,
            voxels: Vec::new(),
            bonds: Vec::new(),
            internal_bond_count: 0,
            region_members: Vec::new(),
            region_stats: Vec::new(),
            extensions: Vec::new(),
            controls: Vec::new(),
            broad_phase: None,
            surface: Vec::new(),
            nearby: Vec::new(),
            collisions_built: false,
            motion_since_rebuild: 0.0,
            dt: 0.0,
            optimal_dt: 0.0,
            dt_frozen: false,
            time: 0.0,
            step: 0,
            stats: SimStats::default(),
            histories: StopHistories::default(),
            kinetic_window: History::new(EQUILIBRIUM_WINDOW),
            status: StopStatus::Running,
            initialized: false,
        }
    }

    /// Builds voxels and bonds from a lattice, its palette and environment.
    ///
    /// Voxels are created in lattice index order. A bond whose ends cannot
    /// be linked (zero modulus, Poisson ratio out of range) is kept as an
    /// inert bond that never carries load. The environment's gravity,
    /// floor and temperature switches overwrite the matching features.
    pub fn import(
        &mut self,
        lattice: VoxelLattice,
        palette: MaterialPalette,
        environment: Environment,
    ) -> VoxsimResult<()> {
        self.config.validate()?;
        palette.validate()?;
        lattice.validate(&palette)?;
        environment.validate()?;

        let topology = Topology::build(&lattice);
        let size = lattice.voxel_size();

        // 1. Voxels
        let mut voxels = Vec::with_capacity(topology.len());
        for (n, &cell) in topology.cells.iter().enumerate() {
            let material_id = lattice.material_at(cell);
            let material = palette.get(material_id).ok_or_else(|| {
                VoxsimError::InvalidLattice(format!("material {} is not in the palette", material_id.0))
            })?;
            voxels.push(Voxel::new(
                VoxelId(n as u32),
                cell,
                material_id,
                material,
                lattice.cell_center(cell),
                size,
                self.config.development,
            ));
        }

        // 2. Internal bonds, one per positive-direction neighbour
        let mut bonds = Vec::new();
        for n in 0..topology.len() {
            for dir in [BondDir::PosX, BondDir::PosY, BondDir::PosZ] {
                let Some(m) = topology.neighbors[n][dir.index()] else {
                    continue;
                };
                let m = m as usize;
                let (id1, id2) = (VoxelId(n as u32), VoxelId(m as u32));
                let bond = match BondLink::link(id1, &voxels[n], id2, &voxels[m]) {
                    Ok(link) => InternalBond::new(link)?,
                    Err(e) => {
                        warn!(voxel1 = n, voxel2 = m, error = %e, "bond left inert");
                        InternalBond::new_inert(BondLink::unlinked(id1, &voxels[n], id2, &voxels[m]))?
                    }
                };
                let id = BondId(bonds.len() as u32);
                bonds.push(Bond::Internal(bond));
                voxels[n].bonds[dir.index()] = Some(id);
                voxels[m].bonds[BondDir::from_axis(dir.axis(), true).index()] = Some(id);
            }
        }
        for voxel in &mut voxels {
            voxel.bonded = voxel.bonds.map(|b| b.is_some());
        }

        // 3. Boundary regions
        let envelope = lattice.workspace();
        let half = DVec3::splat(0.5 * size);
        let mut region_members = Vec::with_capacity(environment.regions.len());
        for region in &environment.regions {
            let members: Vec<VoxelId> = voxels
                .iter()
                .filter(|v| region.touches(v.nominal_position, half, envelope))
                .map(|v| v.id)
                .collect();
            if members.is_empty() {
                warn!(region = %region.name, "boundary region touches no voxels");
            }
            let share = 1.0 / members.len().max(1) as Scalar;
            for id in &members {
                let voxel = &mut voxels[id.index()];
                voxel.fixed |= region.fixed;
                for axis in 0..3 {
                    if region.fixed.translation_fixed(axis) {
                        voxel.external_displacement[axis] = region.displacement[axis];
                    }
                    if region.fixed.rotation_fixed(axis) {
                        voxel.external_rotation[axis] = region.angular_displacement[axis];
                    }
                }
                voxel.external_force += region.force * share;
                voxel.external_torque += region.torque * share;
            }
            region_members.push(members);
        }

        // 4. Environment switches
        let features = &mut self.config.features;
        features.gravity = environment.gravity.enabled;
        features.floor = environment.floor.enabled;
        features.temperature = environment.temperature.enabled;
        features.temperature_vary = environment.temperature.vary;

        // 5. Collision bookkeeping
        self.surface = (0..topology.len()).filter(|&n| topology.is_surface(n)).collect();
        self.nearby = (0..topology.len())
            .map(|n| {
                let mut near: Vec<u32> = topology
                    .within_hops(n, self.config.nearby_hops)
                    .into_iter()
                    .map(|m| m as u32)
                    .collect();
                near.sort_unstable();
                near
            })
            .collect();
        if self.broad_phase.is_none() {
            self.broad_phase = Some(Box::new(SpatialHash::new(self.config.collision_horizon * size)));
        }

        self.controls = vec![VoxelControl::default(); voxels.len()];
        self.voxels = voxels;
        self.internal_bond_count = bonds.len();
        self.bonds = bonds;
        self.region_members = region_members;
        self.region_stats = environment
            .regions
            .iter()
            .map(|r| RegionStats {
                name: r.name.clone(),
                ..RegionStats::default()
            })
            .collect();
        self.lattice = lattice;
        self.palette = palette;
        self.environment = environment;
        self.topology = Some(topology);
        self.initialized = true;

        self.restart_clock();
        self.refresh_dt();
        if !(self.optimal_dt > 0.0 && self.optimal_dt.is_finite()) {
            return Err(VoxsimError::InvalidConfig(
                "could not derive a stable timestep: no voxel has both mass and stiffness".into(),
            ));
        }

        info!(
            voxels = self.voxels.len(),
            bonds = self.internal_bond_count,
            dt = self.dt,
            "lattice imported"
        );
        Ok(())
    }

    /// Adds an extension; extensions run in insertion order.
    pub fn add_extension(&mut self, extension: Box<dyn VoxelExtension>) {
        debug!(extension = extension.name(), "extension added");
        self.extensions.push(extension);
    }

    /// Replaces the collision broad phase. Takes effect on the next rebuild.
    pub fn set_broad_phase(&mut self, broad_phase: Box<dyn BroadPhase>) {
        self.broad_phase = Some(broad_phase);
        self.collisions_built = false;
    }

    /// Checks that the boundary conditions give the run a meaning.
    ///
    /// Without a floor, some voxel must have a fixed translation and every
    /// connected cluster must contain one; otherwise parts of the object
    /// would drift off under any load.
    pub fn preflight(&self) -> VoxsimResult<()> {
        if !self.initialized {
            return Err(VoxsimError::NotInitialized);
        }
        if self.config.features.floor {
            return Ok(());
        }
        let anchored: Vec<bool> = self
            .voxels
            .iter()
            .map(|v| (0..3).any(|axis| v.fixed.translation_fixed(axis)))
            .collect();
        if !anchored.iter().any(|&a| a) {
            return Err(VoxsimError::InvalidBoundary(
                "no voxel is fixed and the floor is disabled".into(),
            ));
        }
        if let Some(topology) = &self.topology {
            for component in topology.components() {
                if !component.iter().any(|&n| anchored[n]) {
                    return Err(VoxsimError::InvalidBoundary(format!(
                        "a cluster of {} voxels is not connected to any fixed voxel",
                        component.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Advances the simulation by one timestep.
    ///
    /// Returns [`VoxsimError::Diverged`] (and records it in
    /// [`status`](Self::status)) once the state goes non-finite.
    pub fn time_step(&mut self) -> VoxsimResult<()> {
        if !self.initialized {
            return Err(VoxsimError::NotInitialized);
        }

        // 1. Collisions
        if self.config.features.collisions && self.needs_collision_rebuild() {
            self.rebuild_collisions()?;
        }

        // 2. Extensions
        let time = self.time;
        for extension in &mut self.extensions {
            extension.before_step(time, &self.voxels, &mut self.controls);
        }

        // 3. Bonds
        let bond_ctx = BondContext {
            voxels: &self.voxels,
            palette: &self.palette,
            features: self.config.features,
            bond_damping: self.config.damping.bond,
            precision: self.config.precision,
            temperature: self.environment.temperature,
            dt: self.dt,
            time: self.time,
        };
        self.bonds.par_iter_mut().for_each(|bond| bond.update(&bond_ctx));

        // 4. Voxels
        let voxel_ctx = VoxelContext {
            bonds: &self.bonds,
            controls: &self.controls,
            features: self.config.features,
            damping: self.config.damping,
            gravity: self.environment.gravity.acceleration,
            floor: FloorContact::new(self.environment.floor.slope_deg),
            fluid_drag: self.environment.fluid_drag,
            temperature: self.environment.temperature,
            actuation: self.environment.actuation,
            max_velocity_fraction: self.config.max_velocity_fraction,
            min_temp_factor: self.config.min_temp_factor,
            init_time: self.config.init_time,
            actuation_start_time: self.config.actuation_start_time,
            development_end_time: self.config.development_end_time,
            stiffness: self.config.stiffness,
            dt: self.dt,
            time: self.time,
        };
        self.voxels.par_iter_mut().for_each(|voxel| voxel.euler_step(&voxel_ctx));

        // 5. Relink
        self.relink_changed();

        // 6. Bookkeeping
        self.time += self.dt;
        self.step += 1;
        self.update_stats();
        self.histories.sample(self.step, &self.stats);
        self.motion_since_rebuild += self.stats.max_voxel_velocity * self.dt;

        if self.config.features.equilibrium_mode {
            self.enforce_equilibrium();
        }

        if let Some(reason) = self.divergence() {
            warn!(step = self.step, %reason, "simulation diverged");
            self.status = StopStatus::Diverged {
                step: self.step,
                reason: reason.clone(),
            };
            return Err(VoxsimError::Diverged { step: self.step, reason });
        }

        if self.status == StopStatus::Running && self.stop_condition_met() {
            info!(step = self.step, time = self.time, condition = self.config.stop.name(), "stop condition reached");
            self.status = StopStatus::Reached(self.config.stop);
        }
        Ok(())
    }

    /// Whether the configured stop condition holds for the current state.
    pub fn stop_condition_met(&self) -> bool {
        let probe = StopProbe {
            step: self.step,
            time: self.time,
            temperature_period: if self.config.features.temperature_vary {
                self.environment.temperature.period
            } else {
                0.0
            },
            max_move: self.stats.max_move,
            voxel_count: self.voxels.len(),
            histories: &self.histories,
        };
        self.config.stop.is_met(&probe)
    }

    /// Steps until the stop condition is reached or the state diverges.
    ///
    /// With [`StopCondition::None`] this never returns on its own; use
    /// [`run_with`](Self::run_with) and a cancel flag instead.
    pub fn run(&mut self) -> VoxsimResult<StopStatus> {
        self.run_with(None, |_| {})
    }

    /// Steps until the run reaches a terminal status, calling `observe`
    /// after every step.
    ///
    /// Divergence and cancellation end the run with `Ok`; they are
    /// reported through the returned status.
    pub fn run_with<F>(&mut self, cancel: Option<&AtomicBool>, mut observe: F) -> VoxsimResult<StopStatus>
    where
        F: FnMut(&Simulation),
    {
        self.preflight()?;
        while !self.status.is_terminal() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                info!(steps = self.step, "run cancelled");
                self.status = StopStatus::Cancelled { steps: self.step };
                break;
            }
            match self.time_step() {
                Ok(()) => observe(self),
                Err(VoxsimError::Diverged { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(self.status.clone())
    }

    /// Returns voxels and bonds to their nominal state and the clock to zero.
    ///
    /// Boundary conditions, extensions and configuration are kept.
    pub fn reset(&mut self) {
        self.bonds.truncate(self.internal_bond_count);
        for voxel in &mut self.voxels {
            voxel.reset();
        }
        self.controls.fill(VoxelControl::default());
        for bond in &mut self.bonds {
            if let Bond::Internal(b) = bond {
                b.inert = b.link.relink(&self.voxels).is_err();
                b.reset();
            }
        }
        for voxel in &mut self.voxels {
            voxel.modulus_changed = false;
        }
        self.restart_clock();
        self.refresh_dt();
        debug!("simulation reset");
    }

    /// An independent copy of this simulation in its current state.
    ///
    /// Extensions are not carried over.
    pub fn sandbox(&self) -> VoxsimResult<Simulation> {
        let mut copy = Simulation::new(self.config.clone());
        copy.import(self.lattice.clone(), self.palette.clone(), self.environment.clone())?;
        copy.config = self.config.clone();
        copy.saved = self.saved;
        copy.voxels = self.voxels.clone();
        copy.controls = self.controls.clone();
        copy.bonds = self.bonds.clone();
        copy.region_stats = self.region_stats.clone();
        copy.collisions_built = self.collisions_built;
        copy.motion_since_rebuild = self.motion_since_rebuild;
        copy.dt = self.dt;
        copy.optimal_dt = self.optimal_dt;
        copy.dt_frozen = self.dt_frozen;
        copy.time = self.time;
        copy.step = self.step;
        copy.stats = self.stats.clone();
        copy.histories = self.histories.clone();
        copy.kinetic_window = self.kinetic_window.clone();
        copy.status = self.status.clone();
        Ok(copy)
    }

    // ─── Timestep ────────────────────────────────────────────

    /// Largest stable timestep for the current bond stiffnesses and masses.
    ///
    /// `1/(2π·√max(k/m))` over both ends of every load-carrying bond,
    /// using `E·s/m` for voxels without bonds.
    pub fn calc_max_dt(&self) -> Scalar {
        let mut max_freq2: Scalar = 0.0;
        for bond in &self.bonds[..self.internal_bond_count] {
            let Bond::Internal(b) = bond else { continue };
            if !b.is_active() {
                continue;
            }
            for id in [b.link.voxel1, b.link.voxel2] {
                let mass = self.voxels[id.index()].mass;
                if mass > 0.0 {
                    max_freq2 = max_freq2.max(b.link.a1 / mass);
                }
            }
        }
        for voxel in self.voxels.iter().filter(|v| v.is_isolated() && v.mass > 0.0) {
            max_freq2 = max_freq2.max(voxel.modulus * voxel.nominal_size / voxel.mass);
        }
        if max_freq2 <= 0.0 {
            return 0.0;
        }
        1.0 / (2.0 * std::f64::consts::PI * max_freq2.sqrt())
    }

    pub fn dt(&self) -> Scalar {
        self.dt
    }

    pub fn optimal_dt(&self) -> Scalar {
        self.optimal_dt
    }

    /// Holds the timestep at its current value even when stiffness changes.
    pub fn freeze_dt(&mut self) {
        self.dt_frozen = true;
    }

    /// Releases a frozen timestep and recomputes it.
    pub fn thaw_dt(&mut self) {
        self.dt_frozen = false;
        self.refresh_dt();
    }

    fn refresh_dt(&mut self) {
        self.optimal_dt = self.calc_max_dt();
        if !self.dt_frozen {
            self.dt = self.config.dt_fraction * self.optimal_dt;
        }
    }

    // ─── Modes and inputs ────────────────────────────────────

    /// Turns kinetic damping toward static equilibrium on or off.
    ///
    /// While on, bond damping is raised to 0.1, slow damping and the
    /// velocity cap are disabled, and all motion is zeroed each time the
    /// total kinetic energy passes a peak. Turning it off restores the
    /// previous settings.
    pub fn set_equilibrium_mode(&mut self, on: bool) {
        if on == self.config.features.equilibrium_mode {
            return;
        }
        if on {
            self.saved = Some(SavedSettings {
                damping: self.config.damping,
                max_velocity: self.config.features.max_velocity,
            });
            self.config.damping.bond = EQUILIBRIUM_BOND_DAMPING;
            self.config.damping.slow = 0.0;
            self.config.features.max_velocity = false;
        } else if let Some(saved) = self.saved.take() {
            self.config.damping = saved.damping;
            self.config.features.max_velocity = saved.max_velocity;
        }
        self.config.features.equilibrium_mode = on;
        self.kinetic_window.clear();
        debug!(on, "equilibrium mode");
    }

    /// Scales every prescribed displacement, rotation and external load by
    /// `factor`, clamped to `[0, 1]`.
    pub fn scale_external_inputs(&mut self, factor: Scalar) {
        let factor = factor.clamp(0.0, 1.0);
        for voxel in &mut self.voxels {
            voxel.input_scale = factor;
        }
    }

    /// Replaces the stop condition and makes a reached run resumable.
    pub fn set_stop_condition(&mut self, stop: StopCondition) {
        self.config.stop = stop;
        if matches!(self.status, StopStatus::Reached(_) | StopStatus::Cancelled { .. }) {
            self.status = StopStatus::Running;
        }
    }

    // ─── Accessors ───────────────────────────────────────────

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn lattice(&self) -> &VoxelLattice {
        &self.lattice
    }

    pub fn palette(&self) -> &MaterialPalette {
        &self.palette
    }

    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    pub fn voxel(&self, id: VoxelId) -> Option<&Voxel> {
        self.voxels.get(id.index())
    }

    /// Mutable voxel access for boundary edits between steps.
    pub fn voxel_mut(&mut self, id: VoxelId) -> Option<&mut Voxel> {
        self.voxels.get_mut(id.index())
    }

    /// Voxel occupying lattice cell `(i, j, k)`, if any.
    pub fn voxel_at(&self, i: usize, j: usize, k: usize) -> Option<&Voxel> {
        let index = self.lattice.index(i as i64, j as i64, k as i64)?;
        let n = self.topology.as_ref()?.cells.binary_search(&index).ok()?;
        self.voxels.get(n)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn internal_bonds(&self) -> impl Iterator<Item = &InternalBond> {
        self.bonds[..self.internal_bond_count].iter().filter_map(Bond::as_internal)
    }

    pub fn internal_bond_count(&self) -> usize {
        self.internal_bond_count
    }

    pub fn collision_bond_count(&self) -> usize {
        self.bonds.len() - self.internal_bond_count
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn region_stats(&self) -> &[RegionStats] {
        &self.region_stats
    }

    /// Voxels touched by each boundary region, in region order.
    pub fn region_members(&self) -> &[Vec<VoxelId>] {
        &self.region_members
    }

    pub fn histories(&self) -> &StopHistories {
        &self.histories
    }

    pub fn status(&self) -> &StopStatus {
        &self.status
    }

    pub fn time(&self) -> Scalar {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Control inputs the extensions wrote for the last step, indexed by voxel id.
    pub fn controls(&self) -> &[VoxelControl] {
        &self.controls
    }

    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    // ─── Internals ───────────────────────────────────────────

    fn restart_clock(&mut self) {
        self.time = 0.0;
        self.step = 0;
        self.status = StopStatus::Running;
        self.histories.clear();
        self.kinetic_window.clear();
        self.collisions_built = false;
        self.motion_since_rebuild = 0.0;
        let com = self.center_of_mass();
        self.stats = SimStats {
            center_of_mass: com,
            initial_center_of_mass: com,
            ..SimStats::default()
        };
    }

    fn center_of_mass(&self) -> DVec3 {
        let mass: Scalar = self.voxels.iter().map(|v| v.mass).sum();
        if mass <= 0.0 {
            return DVec3::ZERO;
        }
        self.voxels
            .iter()
            .fold(DVec3::ZERO, |acc, v| acc + v.position * v.mass)
            / mass
    }

    /// Re-derives the stiffness of every bond touching a voxel whose
    /// modulus changed this step.
    fn relink_changed(&mut self) {
        let mut touched: Vec<BondId> = Vec::new();
        for voxel in self.voxels.iter_mut().filter(|v| v.modulus_changed) {
            touched.extend(voxel.bonds.iter().flatten());
            touched.extend(voxel.collisions.iter());
            voxel.modulus_changed = false;
        }
        if touched.is_empty() {
            return;
        }
        touched.sort_unstable();
        touched.dedup();
        for id in touched {
            let bond = &mut self.bonds[id.index()];
            if let Err(e) = bond.link_mut().relink(&self.voxels) {
                if let Bond::Internal(b) = bond {
                    warn!(bond = id.0, error = %e, "bond left inert after stiffness change");
                    b.inert = true;
                }
            }
        }
        self.refresh_dt();
    }

    fn update_stats(&mut self) {
        let mut mask = self.config.stats;
        mask = mask | self.required_stats();
        let size = self.lattice.voxel_size();
        let voxels = &self.voxels;
        let stats = &mut self.stats;

        stats.max_move = voxels.iter().map(|v| v.last_move).fold(0.0, Scalar::max);
        stats.max_voxel_velocity = voxels.iter().map(|v| v.velocity.length()).fold(0.0, Scalar::max);
        stats.voxels_on_floor = voxels.iter().filter(|v| v.touching_floor).count();

        if mask.contains(StatMask::CENTER_OF_MASS) {
            let mass: Scalar = voxels.iter().map(|v| v.mass).sum();
            if mass > 0.0 {
                stats.center_of_mass = voxels.iter().fold(DVec3::ZERO, |acc, v| acc + v.position * v.mass) / mass;
            }
            stats.total_displacement = stats.center_of_mass.distance(stats.initial_center_of_mass);
            stats.normalized_displacement = stats.total_displacement / size;
        }
        if mask.contains(StatMask::DISPLACEMENT) {
            stats.max_voxel_displacement = voxels.iter().map(|v| v.displacement().length()).fold(0.0, Scalar::max);
        }
        if mask.contains(StatMask::KINETIC_ENERGY) {
            stats.total_kinetic_energy = voxels.iter().map(|v| v.kinetic_energy).sum();
            stats.max_voxel_kinetic_energy = voxels.iter().map(|v| v.kinetic_energy).fold(0.0, Scalar::max);
        }
        if mask.contains(StatMask::PRESSURE) {
            stats.max_pressure = voxels.iter().map(|v| v.pressure).fold(Scalar::NEG_INFINITY, Scalar::max);
            stats.min_pressure = voxels.iter().map(|v| v.pressure).fold(Scalar::INFINITY, Scalar::min);
        }

        let internal = self.bonds[..self.internal_bond_count].iter().filter_map(Bond::as_internal);
        let mut strain_energy = 0.0;
        let mut max_energy: Scalar = 0.0;
        let mut max_strain: Scalar = 0.0;
        let mut max_stress: Scalar = 0.0;
        let (mut yielded, mut broken) = (0, 0);
        for bond in internal {
            strain_energy += bond.strain_energy;
            max_energy = max_energy.max(bond.strain_energy);
            max_strain = max_strain.max(bond.strain.abs());
            max_stress = max_stress.max(bond.stress.abs());
            yielded += usize::from(bond.yielded);
            broken += usize::from(bond.broken);
        }
        stats.yielded_bonds = yielded;
        stats.broken_bonds = broken;
        if mask.contains(StatMask::STRAIN_ENERGY) {
            stats.total_strain_energy = strain_energy;
            stats.max_bond_strain_energy = max_energy;
        }
        if mask.contains(StatMask::ENG_STRAIN) {
            stats.max_bond_strain = max_strain;
        }
        if mask.contains(StatMask::ENG_STRESS) {
            stats.max_bond_stress = max_stress;
        }

        for (region, (members, boundary)) in self
            .region_stats
            .iter_mut()
            .zip(self.region_members.iter().zip(&self.environment.regions))
        {
            let reaction = members
                .iter()
                .fold(DVec3::ZERO, |acc, id| acc - voxels[id.index()].bond_force(&self.bonds));
            let displacement = members
                .iter()
                .fold(DVec3::ZERO, |acc, id| acc + voxels[id.index()].displacement());
            let direction = if boundary.displacement != DVec3::ZERO {
                boundary.displacement.normalize()
            } else {
                boundary.force.normalize_or_zero()
            };
            region.voxel_count = members.len();
            region.force = reaction;
            region.force_along_displacement = reaction.dot(direction);
            region.average_displacement = displacement / members.len().max(1) as Scalar;
        }
    }

    /// Statistics the stop condition and equilibrium mode depend on.
    fn required_stats(&self) -> StatMask {
        let mut mask = match self.config.stop {
            StopCondition::MinKE(_) => StatMask::KINETIC_ENERGY,
            StopCondition::ConstMaxEnergy(_) => StatMask::KINETIC_ENERGY | StatMask::STRAIN_ENERGY,
            _ => StatMask::NONE,
        };
        if self.config.features.equilibrium_mode {
            mask = mask | StatMask::KINETIC_ENERGY;
        }
        mask
    }

    /// Zeroes all motion once the kinetic energy has passed a peak.
    fn enforce_equilibrium(&mut self) {
        let kinetic = self.stats.total_kinetic_energy;
        self.kinetic_window.push(kinetic);
        if self.kinetic_window.len() < 2 || kinetic >= self.kinetic_window.max() {
            return;
        }
        for voxel in &mut self.voxels {
            voxel.linear_momentum = DVec3::ZERO;
            voxel.angular_momentum = DVec3::ZERO;
            voxel.velocity = DVec3::ZERO;
            voxel.angular_velocity = DVec3::ZERO;
            voxel.kinetic_energy = 0.0;
        }
        self.stats.total_kinetic_energy = 0.0;
        self.stats.max_voxel_kinetic_energy = 0.0;
        self.kinetic_window.clear();
    }

    fn divergence(&self) -> Option<String> {
        self.voxels.iter().find_map(|v| {
            if !v.position.is_finite() {
                Some(format!("voxel {} has non-finite position", v.id.0))
            } else if !v.orientation.is_finite() {
                Some(format!("voxel {} has non-finite orientation", v.id.0))
            } else {
                None
            }
        })
    }

    fn needs_collision_rebuild(&self) -> bool {
        let slack = 0.5 * (self.config.collision_horizon - 1.0) * self.lattice.voxel_size();
        !self.collisions_built || self.motion_since_rebuild > slack
    }

    /// Replaces all collision bonds from a fresh broad-phase pass.
    ///
    /// Candidate pairs are dropped when they are within `nearby_hops` bond
    /// hops of each other or further apart than the collision horizon.
    fn rebuild_collisions(&mut self) -> VoxsimResult<()> {
        self.bonds.truncate(self.internal_bond_count);
        for voxel in &mut self.voxels {
            voxel.collisions.clear();
        }

        let points: Vec<DVec3> = self.surface.iter().map(|&n| self.voxels[n].position).collect();
        let broad_phase = self
            .broad_phase
            .get_or_insert_with(|| Box::new(SpatialHash::new(self.config.collision_horizon * self.lattice.voxel_size())));
        broad_phase.update(&points)?;

        let horizon = self.config.collision_horizon * self.lattice.voxel_size();
        for pair in broad_phase.query_pairs() {
            let a = self.surface[pair.a as usize];
            let b = self.surface[pair.b as usize];
            if self.nearby[a].binary_search(&(b as u32)).is_ok() {
                continue;
            }
            if self.voxels[a].position.distance(self.voxels[b].position) > horizon {
                continue;
            }
            let (id1, id2) = (VoxelId(a as u32), VoxelId(b as u32));
            let link = match BondLink::link(id1, &self.voxels[a], id2, &self.voxels[b]) {
                Ok(link) => link,
                Err(e) => {
                    debug!(voxel1 = a, voxel2 = b, error = %e, "collision pair skipped");
                    continue;
                }
            };
            let id = BondId(self.bonds.len() as u32);
            self.bonds.push(Bond::Collision(CollisionBond::new(link)));
            self.voxels[a].collisions.push(id);
            self.voxels[b].collisions.push(id);
        }

        self.collisions_built = true;
        self.motion_since_rebuild = 0.0;
        debug!(
            step = self.step,
            pairs = self.bonds.len() - self.internal_bond_count,
            broad_phase = broad_phase.name(),
            "collision bonds rebuilt"
        );
        Ok(())
    }
}
