//! Bond stiffness model shared by internal and collision bonds.
//!
//! A bond is treated as a square-section Euler beam of length `L`
//! (the mean nominal size of its voxels) with combined material
//! properties:
//!
//! ```text
//! E  = 2·E1·E2/(E1+E2)        G = E/(2(1+ν))
//! A  = L²   I = L⁴/12   J = L⁴/6
//! a1 = E·A/L    a2 = G·J/L
//! b1 = 12·E·I/L³   b2 = 6·E·I/L²   b3 = 2·E·I/L
//! ```

use serde::{Deserialize, Serialize};
use voxsim_math::BondAxis;
use voxsim_types::{Scalar, VoxelId, VoxsimError, VoxsimResult};

use crate::voxel::Voxel;

/// Critical damping coefficients `2·√(k·m)` for each stiffness/inertia
/// pairing the damping terms use, one per bond end.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DampingCoefficients {
    pub a1_m: [Scalar; 2],
    pub a2_i: [Scalar; 2],
    pub b1_m: [Scalar; 2],
    pub b2_fm: [Scalar; 2],
    pub b3_i: [Scalar; 2],
}

/// Combined material properties and beam stiffness of one bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondLink {
    pub voxel1: VoxelId,
    pub voxel2: VoxelId,

    /// Lattice axis for face-adjacent voxels, `None` for oblique pairs.
    pub axis: Option<BondAxis>,

    /// Per-end moduli at link time.
    pub moduli: [Scalar; 2],
    pub poissons: [Scalar; 2],
    pub ctes: [Scalar; 2],

    pub elastic_modulus: Scalar,
    pub poissons_ratio: Scalar,
    pub cte: Scalar,
    /// Combined constrained-volume modulus `E/((1−2ν)(1+ν))`.
    pub volumetric_modulus: Scalar,
    pub shear_modulus: Scalar,

    pub length: Scalar,
    pub a1: Scalar,
    pub a2: Scalar,
    pub b1: Scalar,
    pub b2: Scalar,
    pub b3: Scalar,

    pub damping: DampingCoefficients,

    /// Same material and modulus on both ends.
    pub homogeneous: bool,
}

/// Harmonic-style combination that reduces to `x` when both sides equal `x`.
fn combine(a: Scalar, b: Scalar) -> Scalar {
    if a + b == 0.0 {
        0.0
    } else {
        2.0 * a * b / (a + b)
    }
}

fn critical(stiffness: Scalar, inertia: Scalar) -> Scalar {
    2.0 * (stiffness * inertia).max(0.0).sqrt()
}

impl BondLink {
    /// Links voxel `id1` to voxel `id2`.
    ///
    /// Fails when either modulus is zero or either Poisson ratio is
    /// outside `[0, 0.5]`; the caller is expected to treat the bond as
    /// inert in that case.
    pub fn link(id1: VoxelId, v1: &Voxel, id2: VoxelId, v2: &Voxel) -> VoxsimResult<Self> {
        let (e1, e2) = (v1.modulus, v2.modulus);
        let (u1, u2) = (v1.poissons_ratio, v2.poissons_ratio);
        if e1 == 0.0 || e2 == 0.0 {
            return Err(VoxsimError::InvalidMaterial(format!(
                "bond {}-{} has a zero-modulus end",
                id1.0, id2.0
            )));
        }
        if !(0.0..=0.5).contains(&u1) || !(0.0..=0.5).contains(&u2) {
            return Err(VoxsimError::InvalidMaterial(format!(
                "bond {}-{} has a Poisson ratio outside [0, 0.5]",
                id1.0, id2.0
            )));
        }

        let elastic_modulus = combine(e1, e2);
        let poissons_ratio = combine(u1, u2);
        let volumetric = |e: Scalar, u: Scalar| e / ((1.0 - 2.0 * u) * (1.0 + u));
        let volumetric_modulus = combine(volumetric(e1, u1), volumetric(e2, u2));
        let shear_modulus = elastic_modulus / (2.0 * (1.0 + poissons_ratio));

        let length = 0.5 * (v1.nominal_size + v2.nominal_size);
        let (a1, a2, b1, b2, b3) = if length == 0.0 {
            (0.0, 0.0, 0.0, 0.0, 0.0)
        } else {
            let area = length * length;
            let i = area * area / 12.0;
            let j = area * area / 6.0;
            (
                elastic_modulus * area / length,
                shear_modulus * j / length,
                12.0 * elastic_modulus * i / (length * length * length),
                6.0 * elastic_modulus * i / (length * length),
                2.0 * elastic_modulus * i / length,
            )
        };

        let ends = [v1, v2];
        let damping = DampingCoefficients {
            a1_m: ends.map(|v| critical(a1, v.mass)),
            a2_i: ends.map(|v| critical(a2, v.inertia)),
            b1_m: ends.map(|v| critical(b1, v.mass)),
            b2_fm: ends.map(|v| critical(b2, v.first_moment)),
            b3_i: ends.map(|v| critical(b3, v.inertia)),
        };

        Ok(Self {
            voxel1: id1,
            voxel2: id2,
            axis: BondAxis::from_offset(v2.nominal_position - v1.nominal_position),
            moduli: [e1, e2],
            poissons: [u1, u2],
            ctes: [v1.cte, v2.cte],
            elastic_modulus,
            poissons_ratio,
            cte: 0.5 * (v1.cte + v2.cte),
            volumetric_modulus,
            shear_modulus,
            length,
            a1,
            a2,
            b1,
            b2,
            b3,
            damping,
            homogeneous: v1.material == v2.material && e1 == e2,
        })
    }

    /// A link with every stiffness zeroed, for bonds whose ends could not
    /// be linked.
    pub fn unlinked(id1: VoxelId, v1: &Voxel, id2: VoxelId, v2: &Voxel) -> Self {
        Self {
            voxel1: id1,
            voxel2: id2,
            axis: BondAxis::from_offset(v2.nominal_position - v1.nominal_position),
            moduli: [v1.modulus, v2.modulus],
            poissons: [v1.poissons_ratio, v2.poissons_ratio],
            ctes: [v1.cte, v2.cte],
            elastic_modulus: 0.0,
            poissons_ratio: 0.0,
            cte: 0.0,
            volumetric_modulus: 0.0,
            shear_modulus: 0.0,
            length: 0.5 * (v1.nominal_size + v2.nominal_size),
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
            b3: 0.0,
            damping: DampingCoefficients::default(),
            homogeneous: false,
        }
    }

    /// Re-derives every cached coefficient from the voxels' current state.
    pub fn relink(&mut self, voxels: &[Voxel]) -> VoxsimResult<()> {
        let (id1, id2) = (self.voxel1, self.voxel2);
        *self = Self::link(id1, &voxels[id1.index()], id2, &voxels[id2.index()])?;
        Ok(())
    }

    /// Index (0 or 1) of `voxel` within this bond, if it is an end.
    pub fn end_of(&self, voxel: VoxelId) -> Option<usize> {
        if voxel == self.voxel1 {
            Some(0)
        } else if voxel == self.voxel2 {
            Some(1)
        } else {
            None
        }
    }

    /// The other end of the bond.
    pub fn other(&self, voxel: VoxelId) -> VoxelId {
        if voxel == self.voxel1 {
            self.voxel2
        } else {
            self.voxel1
        }
    }

    /// Elastic energy stored for the given end forces and moments (J).
    ///
    /// Axial, torsion and both bending contributions, in the bond's
    /// canonical frame.
    pub fn strain_energy(&self, axial: Scalar, moment1: [Scalar; 3], moment2: [Scalar; 3]) -> Scalar {
        let inv = |k: Scalar| if k == 0.0 { 0.0 } else { 1.0 / k };
        let bending = |m1: Scalar, m2: Scalar| m1 * m1 - m1 * m2 + m2 * m2;
        inv(2.0 * self.a1) * axial * axial
            + inv(2.0 * self.a2) * moment1[0] * moment1[0]
            + inv(3.0 * self.b3) * bending(moment1[2], moment2[2])
            + inv(3.0 * self.b3) * bending(moment1[1], moment2[1])
    }
}
