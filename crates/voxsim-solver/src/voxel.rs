//! Voxel state and its semi-implicit Euler integration.
//!
//! A voxel is a point mass with a point inertia. Each step it sums the
//! loads of its bonds (read from the bond arena, never written), adds
//! damping, gravity, external, drag and floor forces, then integrates
//! momentum and angular momentum. Its scale follows the developmental
//! ramps and actuation.

use serde::{Deserialize, Serialize};
use voxsim_contact::FloorProbe;
use voxsim_lattice::ActuationLimit;
use voxsim_material::Material;
use voxsim_math::quat::{from_rotation_vector, normalize_fast};
use voxsim_math::{DQuat, DVec3};
use voxsim_types::{BondId, Dof, MaterialId, Scalar, VoxelId};

use crate::bond::Bond;
use crate::config::Development;
use crate::context::VoxelContext;

/// Per-step inputs written by extensions before the voxel phase.
///
/// Owned by the simulation next to the voxel arena, one per voxel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VoxelControl {
    /// Controller output in `[-1, 1]` replacing the sinusoidal actuation.
    pub actuation: Option<Scalar>,
    /// Extra size, as a fraction of nominal size.
    pub accretion: Scalar,
}

/// One lattice cell as a rigid point mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voxel {
    pub id: VoxelId,
    /// Flat index of the cell in the lattice.
    pub lattice_index: usize,
    pub material: MaterialId,
    pub nominal_position: DVec3,
    pub nominal_size: Scalar,

    // ─── Mass properties ───
    pub mass: Scalar,
    pub inertia: Scalar,
    pub first_moment: Scalar,
    mass_inv: Scalar,
    inertia_inv: Scalar,

    // ─── Material ───
    /// Current elastic modulus; drifts under stiffness adaptation.
    pub modulus: Scalar,
    base_modulus: Scalar,
    pub poissons_ratio: Scalar,
    pub cte: Scalar,
    pub temp_phase: Scalar,
    pub friction_static: Scalar,
    pub friction_dynamic: Scalar,
    /// `2·√(m·E·s)`
    linear_damping: Scalar,
    /// `2·√(I·E·s³)`
    angular_damping: Scalar,

    // ─── Dynamic state ───
    pub position: DVec3,
    pub orientation: DQuat,
    pub linear_momentum: DVec3,
    pub angular_momentum: DVec3,
    pub velocity: DVec3,
    pub angular_velocity: DVec3,
    pub kinetic_energy: Scalar,
    pub pressure: Scalar,
    pub scale: Scalar,
    pub last_scale: Scalar,
    pub initial_size: Scalar,
    pub final_size: Scalar,
    /// Distance moved during the last step.
    pub last_move: Scalar,

    // ─── Topology ───
    /// Internal bond in each [`BondDir`](voxsim_math::BondDir) slot.
    pub bonds: [Option<BondId>; 6],
    /// Slots whose bond currently carries load.
    pub bonded: [bool; 6],
    pub collisions: Vec<BondId>,

    // ─── Boundary conditions ───
    pub fixed: Dof,
    pub external_force: DVec3,
    pub external_torque: DVec3,
    pub external_displacement: DVec3,
    pub external_rotation: DVec3,
    /// Ramp factor in `[0, 1]` applied to all external inputs.
    pub input_scale: Scalar,
    /// Force drawn off by an attached input device.
    pub input_force: DVec3,

    // ─── Poisson coupling ───
    /// Sum of the two lateral strains, per bond axis.
    pub transverse_strain_sum: [Scalar; 3],
    /// Cross-section area normal to each bond axis.
    pub cross_section: [Scalar; 3],
    /// Bond strain on the +X/+Y/+Z faces.
    pub strain_pos: [Scalar; 3],
    /// Bond strain on the −X/−Y/−Z faces.
    pub strain_neg: [Scalar; 3],

    stress_integral: Scalar,
    pressure_integral: Scalar,

    /// Set when the modulus changed; the owner re-links attached bonds.
    pub modulus_changed: bool,
    pub static_friction: bool,
    pub touching_floor: bool,
    pub yielded: bool,
    pub broken: bool,
}

impl Voxel {
    pub fn new(
        id: VoxelId,
        lattice_index: usize,
        material_id: MaterialId,
        material: &Material,
        nominal_position: DVec3,
        size: Scalar,
        development: Development,
    ) -> Self {
        let volume = size * size * size;
        let mass = material.density * volume;
        let inertia = mass * size * size / 6.0;
        let first_moment = mass * size / 2.0;
        let degenerate = volume == 0.0 || mass == 0.0 || inertia == 0.0;

        let mut voxel = Self {
            id,
            lattice_index,
            material: material_id,
            nominal_position,
            nominal_size: size,
            mass,
            inertia,
            first_moment,
            mass_inv: if degenerate { 0.0 } else { 1.0 / mass },
            inertia_inv: if degenerate { 0.0 } else { 1.0 / inertia },
            modulus: material.elastic_modulus,
            base_modulus: material.elastic_modulus,
            poissons_ratio: material.poissons_ratio,
            cte: material.cte,
            temp_phase: material.temp_phase,
            friction_static: material.friction_static,
            friction_dynamic: material.friction_dynamic,
            linear_damping: 0.0,
            angular_damping: 0.0,
            position: nominal_position,
            orientation: DQuat::IDENTITY,
            linear_momentum: DVec3::ZERO,
            angular_momentum: DVec3::ZERO,
            velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            kinetic_energy: 0.0,
            pressure: 0.0,
            scale: size,
            last_scale: size,
            initial_size: development.initial_size_factor * size,
            final_size: development.final_size_factor * size,
            last_move: 0.0,
            bonds: [None; 6],
            bonded: [false; 6],
            collisions: Vec::new(),
            fixed: Dof::NONE,
            external_force: DVec3::ZERO,
            external_torque: DVec3::ZERO,
            external_displacement: DVec3::ZERO,
            external_rotation: DVec3::ZERO,
            input_scale: 1.0,
            input_force: DVec3::ZERO,
            transverse_strain_sum: [0.0; 3],
            cross_section: [size * size; 3],
            strain_pos: [0.0; 3],
            strain_neg: [0.0; 3],
            stress_integral: 0.0,
            pressure_integral: 0.0,
            modulus_changed: false,
            static_friction: false,
            touching_floor: false,
            yielded: false,
            broken: false,
        };
        voxel.set_modulus(material.elastic_modulus);
        voxel.modulus_changed = false;
        voxel
    }

    /// Sets the elastic modulus and refreshes the cached damping terms.
    pub fn set_modulus(&mut self, modulus: Scalar) {
        self.modulus = modulus;
        let s = self.nominal_size;
        if self.mass_inv == 0.0 || modulus <= 0.0 {
            self.linear_damping = 0.0;
            self.angular_damping = 0.0;
        } else {
            self.linear_damping = 2.0 * (self.mass * modulus * s).sqrt();
            self.angular_damping = 2.0 * (self.inertia * modulus * s * s * s).sqrt();
        }
        self.modulus_changed = true;
    }

    /// Back to the nominal, unloaded state. Boundary conditions are kept.
    pub fn reset(&mut self) {
        let s = self.nominal_size;
        self.position = self.nominal_position;
        self.orientation = DQuat::IDENTITY;
        self.linear_momentum = DVec3::ZERO;
        self.angular_momentum = DVec3::ZERO;
        self.velocity = DVec3::ZERO;
        self.angular_velocity = DVec3::ZERO;
        self.kinetic_energy = 0.0;
        self.pressure = 0.0;
        self.scale = s;
        self.last_scale = s;
        self.last_move = 0.0;
        self.bonded = self.bonds.map(|b| b.is_some());
        self.collisions.clear();
        self.input_scale = 1.0;
        self.input_force = DVec3::ZERO;
        self.transverse_strain_sum = [0.0; 3];
        self.cross_section = [s * s; 3];
        self.strain_pos = [0.0; 3];
        self.strain_neg = [0.0; 3];
        self.stress_integral = 0.0;
        self.pressure_integral = 0.0;
        self.static_friction = false;
        self.touching_floor = false;
        self.yielded = false;
        self.broken = false;
        if self.modulus != self.base_modulus {
            self.set_modulus(self.base_modulus);
        }
    }

    pub fn mass_inv(&self) -> Scalar {
        self.mass_inv
    }

    /// Spring constant of the voxel against the floor (N/m).
    pub fn linear_stiffness(&self) -> Scalar {
        2.0 * self.modulus * self.nominal_size
    }

    /// Displacement from the nominal position.
    pub fn displacement(&self) -> DVec3 {
        self.position - self.nominal_position
    }

    /// Offset of the +X/+Y/+Z corner from the centre.
    pub fn corner_pos(&self) -> DVec3 {
        (DVec3::ONE + DVec3::from_array(self.strain_pos)) * (0.5 * self.nominal_size)
    }

    /// Offset of the −X/−Y/−Z corner from the centre.
    pub fn corner_neg(&self) -> DVec3 {
        -(DVec3::ONE + DVec3::from_array(self.strain_neg)) * (0.5 * self.nominal_size)
    }

    /// Mean strain along `axis` over the faces that have a bond.
    pub fn axis_strain(&self, axis: usize) -> Scalar {
        match (self.bonded[2 * axis], self.bonded[2 * axis + 1]) {
            (true, true) => 0.5 * (self.strain_pos[axis] + self.strain_neg[axis]),
            (true, false) => self.strain_pos[axis],
            (false, true) => self.strain_neg[axis],
            (false, false) => 0.0,
        }
    }

    /// Hydrostatic pressure from the volumetric strain.
    pub fn compute_pressure(&self) -> Scalar {
        let denom = 3.0 * (1.0 - 2.0 * self.poissons_ratio);
        if denom == 0.0 {
            return 0.0;
        }
        let volumetric = self.axis_strain(0) + self.axis_strain(1) + self.axis_strain(2);
        -self.modulus * volumetric / denom
    }

    /// True when every internal bond slot is empty.
    pub fn is_isolated(&self) -> bool {
        self.bonds.iter().all(Option::is_none)
    }

    /// Advances the voxel by one timestep.
    pub fn euler_step(&mut self, ctx: &VoxelContext<'_>) {
        let dt = ctx.dt;
        let before = self.position;

        if self.fixed.is_all_fixed() && !ctx.features.volume_effects {
            self.linear_momentum = DVec3::ZERO;
            self.angular_momentum = DVec3::ZERO;
            self.position = self.nominal_position + self.input_scale * self.external_displacement;
            self.orientation = from_rotation_vector(self.input_scale * self.external_rotation);
            self.read_bond_state(ctx.bonds);
        } else {
            let force = self.total_force(ctx);
            self.linear_momentum += force * dt;

            let mut step = self.linear_momentum * (dt * self.mass_inv);
            if ctx.features.max_velocity {
                let limit = ctx.max_velocity_fraction * self.nominal_size;
                let length = step.length();
                if length > limit {
                    step *= limit / length;
                }
            }
            self.position += step;

            for axis in 0..3 {
                if self.fixed.translation_fixed(axis) {
                    self.position[axis] =
                        self.nominal_position[axis] + self.input_scale * self.external_displacement[axis];
                    self.linear_momentum[axis] = 0.0;
                }
            }

            let moment = self.total_moment(ctx.bonds);
            self.angular_momentum += moment * dt;
            if ctx.features.volume_effects {
                self.angular_momentum /= 1.01;
            } else {
                self.angular_momentum *=
                    1.0 - 10.0 * ctx.damping.slow * self.inertia_inv * self.angular_damping * dt;
            }

            let w = self.angular_momentum * self.inertia_inv;
            let spin = DQuat::from_xyzw(w.x, w.y, w.z, 0.0) * self.orientation * 0.5;
            self.orientation = normalize_fast(self.orientation + spin * dt);

            if self.fixed.contains(Dof::ROTATION) {
                self.orientation = from_rotation_vector(self.input_scale * self.external_rotation);
                self.angular_momentum = DVec3::ZERO;
            }
        }

        self.scale = self.next_scale(ctx);
        self.last_scale = self.scale;

        self.velocity = self.linear_momentum * self.mass_inv;
        self.angular_velocity = self.angular_momentum * self.inertia_inv;
        self.kinetic_energy = 0.5 * self.mass * self.velocity.length_squared()
            + 0.5 * self.inertia * self.angular_velocity.length_squared();
        self.pressure = self.compute_pressure();
        self.last_move = (self.position - before).length();

        self.adapt_stiffness(ctx);
    }

    /// Refreshes per-slot strains, bonded flags and yield/break flags
    /// from the bond arena.
    fn read_bond_state(&mut self, bonds: &[Bond]) {
        self.strain_pos = [0.0; 3];
        self.strain_neg = [0.0; 3];
        for slot in 0..6 {
            let internal = self.bonds[slot].and_then(|id| bonds[id.index()].as_internal());
            self.bonded[slot] = false;
            let Some(bond) = internal else { continue };
            self.yielded |= bond.yielded;
            self.broken |= bond.broken;
            if !bond.is_active() {
                continue;
            }
            self.bonded[slot] = true;
            let axis = slot / 2;
            if slot % 2 == 0 {
                self.strain_pos[axis] = bond.strain_v1;
            } else {
                self.strain_neg[axis] = bond.strain_v2;
            }
        }
    }

    fn total_force(&mut self, ctx: &VoxelContext<'_>) -> DVec3 {
        let features = ctx.features;
        let mut total = -ctx.damping.slow * self.velocity * self.linear_damping;

        self.read_bond_state(ctx.bonds);
        for id in self.bonds.iter().flatten() {
            total += ctx.bonds[id.index()].force_on(self.id);
        }
        if features.collisions {
            for id in &self.collisions {
                total += ctx.bonds[id.index()].force_on(self.id);
            }
        }

        total -= self.input_force;
        if features.gravity {
            total.z += self.mass * ctx.gravity;
        }
        total += self.input_scale * self.external_force;

        if ctx.fluid_drag > 0.0 {
            let speed = self.velocity.length();
            total -= 0.5 * ctx.fluid_drag * self.scale * self.scale * speed * self.velocity;
        }

        if features.volume_effects {
            self.update_poisson();
        } else {
            let area = self.nominal_size * self.nominal_size;
            self.cross_section = [area; 3];
            self.transverse_strain_sum = [0.0; 3];
        }

        self.touching_floor = false;
        self.static_friction = false;
        if features.floor {
            let probe = FloorProbe {
                position: self.position,
                velocity: self.velocity,
                scale: self.scale,
                mass: self.mass,
                stiffness: self.linear_stiffness(),
                damping: ctx.damping.collision * self.linear_damping,
                friction_static: self.friction_static,
                friction_dynamic: self.friction_dynamic,
                applied_force: total,
                dt: ctx.dt,
            };
            let response = ctx.floor.respond(&probe);
            total += response.force;
            self.touching_floor = response.is_touching();
            self.static_friction = response.static_friction;
            if response.stop_lateral {
                self.linear_momentum.x = 0.0;
                self.linear_momentum.y = 0.0;
            }
            if response.static_friction {
                total.x = 0.0;
                total.y = 0.0;
            }
        }

        total
    }

    fn total_moment(&self, bonds: &[Bond]) -> DVec3 {
        let mut total = self
            .bonds
            .iter()
            .flatten()
            .map(|id| bonds[id.index()].moment_on(self.id))
            .fold(DVec3::ZERO, |acc, m| acc + m);
        total += self.input_scale * self.external_torque;
        for axis in 0..3 {
            if self.fixed.rotation_fixed(axis) {
                total[axis] = 0.0;
            }
        }
        total
    }

    /// Lateral strain and cross-section for each bond axis.
    ///
    /// An axis is tensioned when bonded on both faces, or on one face
    /// while held by a fixed or forced constraint along it. Free axes
    /// contract by `(1 + Σε)^(−ν) − 1` of the tensioned strains.
    fn update_poisson(&mut self) {
        let nu = self.poissons_ratio;
        let mut tensioned = [false; 3];
        let mut strain = [0.0; 3];
        for axis in 0..3 {
            let (pos, neg) = (self.bonded[2 * axis], self.bonded[2 * axis + 1]);
            let held = self.fixed.translation_fixed(axis) || self.external_force[axis] != 0.0;
            tensioned[axis] = (pos && neg) || ((pos || neg) && held);
            if tensioned[axis] {
                strain[axis] = self.axis_strain(axis);
            }
        }

        let count = tensioned.iter().filter(|&&t| t).count();
        match count {
            0 => strain = [0.0; 3],
            1 => {
                let t = tensioned.iter().position(|&t| t).unwrap_or(0);
                let lateral = (1.0 + strain[t]).powf(-nu) - 1.0;
                for (axis, value) in strain.iter_mut().enumerate() {
                    if axis != t {
                        *value = lateral;
                    }
                }
            }
            2 => {
                let free = tensioned.iter().position(|&t| !t).unwrap_or(0);
                let [a, b] = others(free);
                strain[free] = (1.0 + strain[a] + strain[b]).powf(-nu) - 1.0;
            }
            _ => {}
        }

        let area = self.nominal_size * self.nominal_size;
        for axis in 0..3 {
            let [a, b] = others(axis);
            self.transverse_strain_sum[axis] = strain[a] + strain[b];
            self.cross_section[axis] = (1.0 + strain[a]) * (1.0 + strain[b]) * area;
        }
    }

    /// Scale after developmental ramps, actuation and accretion, limited
    /// so it never crosses `[min_scale, max_scale]` moving away from the
    /// last scale.
    fn next_scale(&self, ctx: &VoxelContext<'_>) -> Scalar {
        let s = self.nominal_size;
        let t = ctx.time;
        let init = ctx.init_time;
        let control = ctx.control(self.id);

        let max_scale = match ctx.actuation {
            ActuationLimit::ContractOnly => s,
            _ => 3.0 * s,
        };
        let min_scale = match ctx.actuation {
            ActuationLimit::ExpandOnly => s,
            _ => ctx.min_temp_factor * s,
        };

        let ramp = if init <= 0.0 || t >= 0.5 * init {
            1.0
        } else {
            2.0 * t / init
        };
        let prenatal = ramp * (self.initial_size / s - 1.0);

        let development = if t >= init {
            let end = ctx.development_end_time;
            let k = if end > init { ((t - init) / (end - init)).min(1.0) } else { 1.0 };
            k * (self.final_size / self.initial_size - 1.0)
        } else {
            0.0
        };

        let cte = if t < ctx.actuation_start_time { 0.0 } else { self.cte };
        let actuation = if t < init {
            0.0
        } else if let Some(output) = control.actuation {
            cte * ctx.temperature.amplitude * output
        } else if ctx.features.temperature {
            cte * (ctx.temperature.at(t, self.temp_phase) - ctx.temperature.base)
        } else {
            0.0
        };

        let mut scale = actuation * s + (1.0 + prenatal) * (1.0 + development) * s + control.accretion * s;
        if (scale < self.last_scale && scale < min_scale) || (scale > self.last_scale && scale > max_scale) {
            scale = self.last_scale;
        }
        scale
    }

    fn adapt_stiffness(&mut self, ctx: &VoxelContext<'_>) {
        let Some(adaptation) = ctx.stiffness else { return };
        if ctx.time < ctx.init_time || (adaptation.stress_rate == 0.0 && adaptation.pressure_rate == 0.0) {
            return;
        }

        let stress = self.max_bond_stress(ctx.bonds);
        self.stress_integral += stress * ctx.dt;
        self.pressure_integral += self.pressure * ctx.dt;

        let previous = self.modulus;
        let mut modulus = previous
            + adaptation.stress_rate * self.stress_integral
            + adaptation.pressure_rate * self.pressure_integral;
        let delta = modulus - previous;
        if delta.abs() > adaptation.max_delta {
            modulus = previous + adaptation.max_delta.copysign(delta);
        }
        let modulus = modulus.clamp(adaptation.min_modulus, adaptation.max_modulus);
        if modulus != previous {
            self.set_modulus(modulus);
        }
    }

    /// Largest axial stress over this voxel's load-carrying bonds.
    pub fn max_bond_stress(&self, bonds: &[Bond]) -> Scalar {
        self.bonds
            .iter()
            .flatten()
            .filter_map(|id| bonds[id.index()].as_internal())
            .filter(|b| b.is_active())
            .map(|b| b.stress)
            .fold(0.0, Scalar::max)
    }

    /// Sum of the bond forces acting on this voxel (the reaction for a fixed voxel).
    pub fn bond_force(&self, bonds: &[Bond]) -> DVec3 {
        self.bonds
            .iter()
            .flatten()
            .chain(self.collisions.iter())
            .map(|id| bonds[id.index()].force_on(self.id))
            .fold(DVec3::ZERO, |acc, f| acc + f)
    }
}

fn others(axis: usize) -> [usize; 2] {
    match axis {
        0 => [1, 2],
        1 => [0, 2],
        _ => [0, 1],
    }
}
