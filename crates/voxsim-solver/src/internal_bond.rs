//! Beam bond between two face-adjacent voxels.
//!
//! Every update is done in the bond's canonical frame (bond along +X,
//! voxel 1 at the origin). The relative position and rotation of voxel 2
//! are measured either in voxel 1's frame (small-angle regime) or in a
//! frame aligned with the line between the voxels (large-angle regime),
//! then fed through the beam stiffness matrix:
//!
//! ```text
//! F1 = ( σ·A,  b1·y − b2·(θ1z+θ2z),  b1·z + b2·(θ1y+θ2y) )
//! M1 = ( a2·(θ1x−θ2x),  b2·z + b3·(2θ1y+θ2y),  −b2·y + b3·(2θ1z+θ2z) )
//! M2 = ( a2·(θ2x−θ1x),  b2·z + b3·(θ1y+2θ2y),  −b2·y + b3·(θ1z+2θ2z) )
//! F2 = −F1
//! ```
//!
//! The regime switch uses hysteresis so a bond sitting on a threshold
//! does not flip every step.

use serde::{Deserialize, Serialize};
use voxsim_material::StressResponse;
use voxsim_math::quat::{align_to_pos_x, rotate_inv, to_rotation_vector};
use voxsim_math::{BondAxis, DQuat, DVec3};
use voxsim_types::constants::{
    HYSTERESIS_FACTOR, SA_BOND_EXT_PERC, STRESS_MATCH_MAX_ITERATIONS, STRESS_MATCH_TOLERANCE,
};
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

use crate::context::BondContext;
use crate::link::BondLink;
use crate::voxel::Voxel;

/// Which formulation a bond is currently using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AngleRegime {
    #[default]
    Small,
    Large,
}

/// Stateful beam element between two face-adjacent voxels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalBond {
    pub link: BondLink,
    pub axis: BondAxis,
    pub regime: AngleRegime,

    // ─── Relative kinematics (canonical frame) ───
    pos2: DVec3,
    angle1: DVec3,
    angle2: DVec3,
    last_pos2: DVec3,
    last_angle1: DVec3,
    last_angle2: DVec3,

    // ─── Axial state ───
    pub strain: Scalar,
    pub stress: Scalar,
    pub strain_energy: Scalar,
    /// High-water mark of the axial strain.
    pub max_strain: Scalar,
    /// Permanent set left after yielding.
    pub strain_offset: Scalar,
    /// Strain seen by each end (they differ on heterogeneous bonds).
    pub strain_v1: Scalar,
    pub strain_v2: Scalar,

    // ─── Loads (world frame) ───
    pub force1: DVec3,
    pub force2: DVec3,
    pub moment1: DVec3,
    pub moment2: DVec3,

    pub yielded: bool,
    pub broken: bool,
    /// The link could not be established; the bond carries no load.
    pub inert: bool,
}

impl InternalBond {
    pub fn new(link: BondLink) -> VoxsimResult<Self> {
        let axis = link.axis.ok_or_else(|| {
            VoxsimError::InvalidLattice(format!(
                "voxels {} and {} are not face neighbours",
                link.voxel1.0, link.voxel2.0
            ))
        })?;
        Ok(Self::unloaded(link, axis))
    }

    /// A bond that exists in the lattice but never carries load.
    pub fn new_inert(link: BondLink) -> VoxsimResult<Self> {
        let mut bond = Self::new(link)?;
        bond.inert = true;
        Ok(bond)
    }

    fn unloaded(link: BondLink, axis: BondAxis) -> Self {
        Self {
            link,
            axis,
            regime: AngleRegime::Small,
            pos2: DVec3::ZERO,
            angle1: DVec3::ZERO,
            angle2: DVec3::ZERO,
            last_pos2: DVec3::ZERO,
            last_angle1: DVec3::ZERO,
            last_angle2: DVec3::ZERO,
            strain: 0.0,
            stress: 0.0,
            strain_energy: 0.0,
            max_strain: 0.0,
            strain_offset: 0.0,
            strain_v1: 0.0,
            strain_v2: 0.0,
            force1: DVec3::ZERO,
            force2: DVec3::ZERO,
            moment1: DVec3::ZERO,
            moment2: DVec3::ZERO,
            yielded: false,
            broken: false,
            inert: false,
        }
    }

    /// Clears all state back to the unloaded configuration.
    pub fn reset(&mut self) {
        let inert = self.inert;
        *self = Self {
            inert,
            ..Self::unloaded(self.link.clone(), self.axis)
        };
    }

    /// True while the bond transmits load.
    pub fn is_active(&self) -> bool {
        !self.inert && !self.broken
    }

    /// Relative position of voxel 2 in the canonical frame, minus the rest length.
    pub fn relative_position(&self) -> DVec3 {
        self.pos2
    }

    /// Rotation vectors of both ends in the canonical frame.
    pub fn relative_angles(&self) -> (DVec3, DVec3) {
        (self.angle1, self.angle2)
    }

    fn clear_loads(&mut self) {
        self.force1 = DVec3::ZERO;
        self.force2 = DVec3::ZERO;
        self.moment1 = DVec3::ZERO;
        self.moment2 = DVec3::ZERO;
        self.strain_energy = 0.0;
        self.stress = 0.0;
    }

    /// Recomputes forces and moments from the current voxel state.
    pub fn update(&mut self, ctx: &BondContext<'_>) {
        if !self.is_active() {
            self.clear_loads();
            return;
        }
        let v1 = &ctx.voxels[self.link.voxel1.index()];
        let v2 = &ctx.voxels[self.link.voxel2.index()];
        let axis = self.axis;

        let rel = axis.to_x_dir(v2.position - v1.position);
        let q1 = axis.to_x_dir_quat(v1.orientation);
        let q2 = axis.to_x_dir_quat(v2.orientation);
        let aligned = rotate_inv(q1, rel);
        let relative_rotation = q1.conjugate() * q2;

        let nominal = if ctx.features.volume_effects {
            self.link.length
        } else {
            0.5 * (v1.scale + v2.scale)
        };

        let previous = self.regime;
        self.regime = next_regime(previous, aligned, relative_rotation, nominal, ctx);
        let switched = self.regime != previous;

        let total_rotation = match self.regime {
            AngleRegime::Small => {
                self.angle1 = DVec3::ZERO;
                self.angle2 = to_rotation_vector(relative_rotation);
                self.pos2 = aligned - DVec3::new(nominal, 0.0, 0.0);
                q1.conjugate()
            }
            AngleRegime::Large => {
                let align = align_to_pos_x(aligned, ctx.precision);
                let total = align * q1.conjugate();
                self.pos2 = DVec3::new(rel.length() - nominal, 0.0, 0.0);
                self.angle1 = to_rotation_vector(align);
                self.angle2 = to_rotation_vector(total * q2);
                total
            }
        };

        let strain = if self.link.length > 0.0 {
            self.pos2.x / self.link.length
        } else {
            0.0
        };
        self.update_strain(strain, v1, v2, ctx);

        let l = &self.link;
        let (p, t1, t2) = (self.pos2, self.angle1, self.angle2);
        let area = 0.5 * (v1.cross_section[axis.index()] + v2.cross_section[axis.index()]);

        let mut f1 = DVec3::new(
            self.stress * area,
            l.b1 * p.y - l.b2 * (t1.z + t2.z),
            l.b1 * p.z + l.b2 * (t1.y + t2.y),
        );
        let mut f2 = -f1;
        let mut m1 = DVec3::new(
            l.a2 * (t1.x - t2.x),
            l.b2 * p.z + l.b3 * (2.0 * t1.y + t2.y),
            -l.b2 * p.y + l.b3 * (2.0 * t1.z + t2.z),
        );
        let mut m2 = DVec3::new(
            l.a2 * (t2.x - t1.x),
            l.b2 * p.z + l.b3 * (t1.y + 2.0 * t2.y),
            -l.b2 * p.y + l.b3 * (t1.z + 2.0 * t2.z),
        );

        self.strain_energy = l.strain_energy(f1.x, m1.to_array(), m2.to_array());

        // History is discontinuous across a regime switch.
        if !switched && ctx.dt > 0.0 && ctx.bond_damping > 0.0 {
            let z = 0.5 * ctx.bond_damping;
            let inv_dt = 1.0 / ctx.dt;
            let v = (p - self.last_pos2) * inv_dt;
            let w1 = (t1 - self.last_angle1) * inv_dt;
            let w2 = (t2 - self.last_angle2) * inv_dt;
            let d = &l.damping;

            f1 += z * DVec3::new(
                d.a1_m[0] * v.x,
                d.b1_m[0] * v.y - d.b2_fm[0] * (w1.z + w2.z),
                d.b1_m[0] * v.z + d.b2_fm[0] * (w1.y + w2.y),
            );
            if !l.homogeneous {
                f2 += z * DVec3::new(
                    -d.a1_m[1] * v.x,
                    -d.b1_m[1] * v.y + d.b2_fm[1] * (w1.z + w2.z),
                    -d.b1_m[1] * v.z - d.b2_fm[1] * (w1.y + w2.y),
                );
            }
            m1 += 0.5 * z * DVec3::new(
                -d.a2_i[0] * (w2.x - w1.x),
                d.b2_fm[0] * v.z + d.b3_i[0] * (2.0 * w1.y + w2.y),
                -d.b2_fm[0] * v.y + d.b3_i[0] * (2.0 * w1.z + w2.z),
            );
            m2 += 0.5 * z * DVec3::new(
                d.a2_i[1] * (w2.x - w1.x),
                d.b2_fm[1] * v.z + d.b3_i[1] * (w1.y + 2.0 * w2.y),
                -d.b2_fm[1] * v.y + d.b3_i[1] * (w1.z + 2.0 * w2.z),
            );
        }
        if l.homogeneous {
            f2 = -f1;
        }

        self.last_pos2 = p;
        self.last_angle1 = t1;
        self.last_angle2 = t2;

        let to_world = |v: DVec3| axis.to_orig_dir(rotate_inv(total_rotation, v));
        self.force1 = to_world(f1);
        self.force2 = to_world(f2);
        self.moment1 = to_world(m1);
        self.moment2 = to_world(m2);
    }

    /// Axial stress update with the plastic high-water mark.
    fn update_strain(&mut self, strain: Scalar, v1: &Voxel, v2: &Voxel, ctx: &BondContext<'_>) {
        self.strain = strain;
        let plastic = ctx.features.plasticity;
        let volume = ctx.features.volume_effects;

        if !plastic || strain >= self.max_strain {
            self.max_strain = strain;

            let response = if volume {
                let l = &self.link;
                let a = self.axis.index();
                let transverse = 0.5 * (v1.transverse_strain_sum[a] + v2.transverse_strain_sum[a]);
                let u = l.poissons_ratio;
                self.strain_v1 = strain;
                self.strain_v2 = strain;
                StressResponse {
                    stress: l.volumetric_modulus * ((1.0 - u) * strain + u * transverse),
                    ..StressResponse::default()
                }
            } else if self.link.homogeneous {
                self.strain_v1 = strain;
                self.strain_v2 = strain;
                material_stress(ctx, v1, strain)
            } else {
                self.match_side_stresses(strain, v1, v2, ctx)
            };

            self.stress = response.stress;
            if response.yielded {
                self.yielded = true;
            }
            if response.failed && ctx.features.failure {
                self.broken = true;
            }
            if plastic && self.link.elastic_modulus > 0.0 {
                self.strain_offset = self.max_strain - self.stress / self.link.elastic_modulus;
            }
        } else {
            // Unloading below the high-water mark follows the elastic slope.
            self.strain_v1 = strain;
            self.strain_v2 = strain;
            self.stress = self.link.elastic_modulus * (strain - self.strain_offset);
        }

        if volume && ctx.features.temperature {
            let l = &self.link;
            let base = ctx.temperature.base;
            let prestress = |end: usize, v: &Voxel| {
                let denom = 1.0 - 2.0 * l.poissons[end];
                if denom == 0.0 {
                    return 0.0;
                }
                let t = ctx.temperature.at(ctx.time, v.temp_phase);
                l.moduli[end] * l.ctes[end] * (t - base) / denom
            };
            self.stress -= 0.5 * (prestress(0, v1) + prestress(1, v2));
        }
    }

    /// Splits the strain between two different materials so both carry
    /// (nearly) the same stress.
    fn match_side_stresses(&mut self, strain: Scalar, v1: &Voxel, v2: &Voxel, ctx: &BondContext<'_>) -> StressResponse {
        let (mut e1, mut e2) = (strain, strain);
        let mut r1 = material_stress(ctx, v1, e1);
        let mut r2 = material_stress(ctx, v2, e2);

        let mut count = 0;
        while (r1.stress - r2.stress).abs() > (r1.stress + r2.stress).abs() * STRESS_MATCH_TOLERANCE
            && count < STRESS_MATCH_MAX_ITERATIONS
        {
            let sum = r1.stress + r2.stress;
            if sum == 0.0 {
                break;
            }
            e1 *= 2.0 * r2.stress / sum;
            e2 *= 2.0 * r1.stress / sum;
            r1 = material_stress(ctx, v1, e1);
            r2 = material_stress(ctx, v2, e2);
            count += 1;
        }

        self.strain_v1 = e1;
        self.strain_v2 = e2;
        StressResponse {
            stress: 0.5 * (r1.stress + r2.stress),
            yielded: r1.yielded || r2.yielded,
            failed: r1.failed || r2.failed,
        }
    }
}

/// Regime after this step's measurements.
fn next_regime(
    current: AngleRegime,
    aligned: DVec3,
    relative_rotation: DQuat,
    nominal: Scalar,
    ctx: &BondContext<'_>,
) -> AngleRegime {
    let turn = (aligned.y.abs() + aligned.z.abs()) / aligned.x;
    let extension = aligned.x / nominal;
    let bend = ctx.precision.bond_bend_rad();

    match current {
        AngleRegime::Small => {
            let stays = relative_rotation.w > ctx.precision.smallish_angle_w()
                && turn <= HYSTERESIS_FACTOR * bend
                && extension <= HYSTERESIS_FACTOR * SA_BOND_EXT_PERC;
            if stays {
                AngleRegime::Small
            } else {
                AngleRegime::Large
            }
        }
        AngleRegime::Large => {
            let returns = relative_rotation.w > ctx.precision.small_angle_w()
                && turn < bend
                && extension < SA_BOND_EXT_PERC;
            if returns {
                AngleRegime::Small
            } else {
                AngleRegime::Large
            }
        }
    }
}

/// Stress in `voxel`'s material at its current (possibly adapted) modulus.
fn material_stress(ctx: &BondContext<'_>, voxel: &Voxel, strain: Scalar) -> StressResponse {
    match ctx.palette.get(voxel.material) {
        Some(material) => material.stress(strain, Some(voxel.modulus)),
        None => StressResponse {
            stress: voxel.modulus * strain,
            ..StressResponse::default()
        },
    }
}
