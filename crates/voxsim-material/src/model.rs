//! Uniaxial stress-strain models.
//!
//! | Model | Behavior |
//! |---|---|
//! | `Linear` | `σ = E·ε`, never yields |
//! | `LinearFail` | linear, yields and fails together past the fail criterion |
//! | `Bilinear` | linear to the yield stress, then the plastic modulus |
//! | `Data` | piecewise-linear measured curve, fails at its last point |

use serde::{Deserialize, Serialize};
use voxsim_types::{Scalar, VoxsimError, VoxsimResult};

/// Offset used to locate the yield point of a measured curve (0.2%).
const YIELD_OFFSET_STRAIN: Scalar = 0.002;

/// Result of evaluating a stress model at one strain.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StressResponse {
    pub stress: Scalar,
    pub yielded: bool,
    pub failed: bool,
}

impl StressResponse {
    fn elastic(stress: Scalar) -> Self {
        Self {
            stress,
            yielded: false,
            failed: false,
        }
    }
}

/// When a material is considered broken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FailCriterion {
    /// Fails once the elastic stress `E·ε` would exceed this value (Pa).
    MaxStress(Scalar),
    /// Fails once strain exceeds this value.
    MaxStrain(Scalar),
}

impl FailCriterion {
    fn is_past(self, strain: Scalar, modulus: Scalar) -> bool {
        match self {
            FailCriterion::MaxStress(stress) => strain > stress / modulus,
            FailCriterion::MaxStrain(limit) => strain > limit,
        }
    }
}

/// Constitutive law of a material.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum StressModel {
    #[default]
    Linear,
    LinearFail {
        fail: FailCriterion,
    },
    Bilinear {
        yield_stress: Scalar,
        plastic_modulus: Scalar,
        fail: Option<FailCriterion>,
    },
    Data(StressStrainCurve),
}

impl StressModel {
    /// Evaluates the model at `strain` with elastic modulus `modulus`.
    ///
    /// The modulus is ignored by the `Data` model, which carries its own curve.
    pub fn stress(&self, strain: Scalar, modulus: Scalar) -> StressResponse {
        match self {
            StressModel::Linear => StressResponse::elastic(modulus * strain),
            StressModel::LinearFail { fail } => {
                let past = fail.is_past(strain, modulus);
                StressResponse {
                    stress: modulus * strain,
                    yielded: past,
                    failed: past,
                }
            }
            StressModel::Bilinear {
                yield_stress,
                plastic_modulus,
                fail,
            } => {
                let yield_strain = yield_stress / modulus;
                if strain <= yield_strain {
                    return StressResponse::elastic(modulus * strain);
                }
                StressResponse {
                    stress: yield_stress + plastic_modulus * (strain - yield_strain),
                    yielded: true,
                    failed: fail.is_some_and(|f| f.is_past(strain, modulus)),
                }
            }
            StressModel::Data(curve) => curve.stress(strain),
        }
    }

    /// Slope of the stress-strain law at `strain`.
    pub fn tangent_modulus(&self, strain: Scalar, modulus: Scalar) -> Scalar {
        match self {
            StressModel::Linear | StressModel::LinearFail { .. } => modulus,
            StressModel::Bilinear {
                yield_stress,
                plastic_modulus,
                ..
            } => {
                if strain > yield_stress / modulus {
                    *plastic_modulus
                } else {
                    modulus
                }
            }
            StressModel::Data(curve) => curve.tangent_modulus(strain),
        }
    }

    /// Short identifier used in logs and reports.
    pub fn name(&self) -> &str {
        match self {
            StressModel::Linear => "linear",
            StressModel::LinearFail { .. } => "linear_fail",
            StressModel::Bilinear { .. } => "bilinear",
            StressModel::Data(_) => "data",
        }
    }

    /// Returns true if the model can ever report failure.
    pub fn can_fail(&self) -> bool {
        match self {
            StressModel::Linear => false,
            StressModel::LinearFail { .. } | StressModel::Data(_) => true,
            StressModel::Bilinear { fail, .. } => fail.is_some(),
        }
    }
}

/// Serialized form of a measured curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoints {
    pub strain: Vec<Scalar>,
    pub stress: Vec<Scalar>,
}

/// Measured tensile curve, validated on construction.
///
/// The curve starts at the origin, strain strictly increases, and the
/// last point marks failure. The initial slope is the elastic modulus
/// and the yield stress comes from the 0.2% offset rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurvePoints", into = "CurvePoints")]
pub struct StressStrainCurve {
    strain: Vec<Scalar>,
    stress: Vec<Scalar>,
    yield_stress: Scalar,
}

impl StressStrainCurve {
    pub fn new(strain: Vec<Scalar>, stress: Vec<Scalar>) -> VoxsimResult<Self> {
        if strain.len() != stress.len() {
            return Err(VoxsimError::InvalidMaterial(format!(
                "stress-strain curve has {} strain and {} stress values",
                strain.len(),
                stress.len()
            )));
        }
        if strain.len() < 2 {
            return Err(VoxsimError::InvalidMaterial(
                "stress-strain curve needs more than one point".into(),
            ));
        }
        if strain[0] != 0.0 || stress[0] != 0.0 {
            return Err(VoxsimError::InvalidMaterial(
                "stress-strain curve must start at zero strain and zero stress".into(),
            ));
        }
        if strain.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VoxsimError::InvalidMaterial(
                "stress-strain curve strain values must strictly increase".into(),
            ));
        }
        if strain.iter().chain(&stress).any(|v| !v.is_finite()) {
            return Err(VoxsimError::InvalidMaterial(
                "stress-strain curve contains non-finite values".into(),
            ));
        }
        if stress[1] <= 0.0 {
            return Err(VoxsimError::InvalidMaterial(
                "stress-strain curve must have a positive initial slope".into(),
            ));
        }

        let yield_stress = offset_yield(&strain, &stress);
        Ok(Self {
            strain,
            stress,
            yield_stress,
        })
    }

    /// Slope of the first segment.
    pub fn elastic_modulus(&self) -> Scalar {
        self.stress[1] / self.strain[1]
    }

    /// Strain of the last point.
    pub fn fail_strain(&self) -> Scalar {
        self.strain[self.strain.len() - 1]
    }

    pub fn yield_stress(&self) -> Scalar {
        self.yield_stress
    }

    pub fn len(&self) -> usize {
        self.strain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strain.is_empty()
    }

    pub fn stress(&self, strain: Scalar) -> StressResponse {
        let n = self.strain.len();
        if strain < self.fail_strain() {
            // First segment whose end lies past `strain`; negative strain
            // extrapolates the first segment.
            let i = self.strain[1..]
                .iter()
                .position(|&s| s > strain)
                .unwrap_or(n - 2);
            let t = (strain - self.strain[i]) / (self.strain[i + 1] - self.strain[i]);
            let stress = self.stress[i] + t * (self.stress[i + 1] - self.stress[i]);
            return StressResponse {
                stress,
                yielded: stress > self.yield_stress,
                failed: false,
            };
        }

        let last = self.stress[n - 1];
        let stress = if last < self.stress[n - 2] {
            last
        } else {
            last + self.last_slope() * (strain - self.fail_strain())
        };
        StressResponse {
            stress,
            yielded: true,
            failed: true,
        }
    }

    pub fn tangent_modulus(&self, strain: Scalar) -> Scalar {
        let n = self.strain.len();
        if strain < 0.0 {
            return self.elastic_modulus();
        }
        if strain < self.fail_strain() {
            let i = self.strain[1..]
                .iter()
                .position(|&s| s > strain)
                .unwrap_or(n - 2);
            return (self.stress[i + 1] - self.stress[i]) / (self.strain[i + 1] - self.strain[i]);
        }
        if self.stress[n - 1] < self.stress[n - 2] {
            0.0
        } else {
            self.last_slope()
        }
    }

    fn last_slope(&self) -> Scalar {
        let n = self.strain.len();
        (self.stress[n - 1] - self.stress[n - 2]) / (self.strain[n - 1] - self.strain[n - 2])
    }
}

impl TryFrom<CurvePoints> for StressStrainCurve {
    type Error = VoxsimError;

    fn try_from(points: CurvePoints) -> VoxsimResult<Self> {
        Self::new(points.strain, points.stress)
    }
}

impl From<StressStrainCurve> for CurvePoints {
    fn from(curve: StressStrainCurve) -> Self {
        Self {
            strain: curve.strain,
            stress: curve.stress,
        }
    }
}

/// Intersects the 0.2% offset line with the curve.
///
/// Falls back to the last stress value when the line never crosses a segment.
fn offset_yield(strain: &[Scalar], stress: &[Scalar]) -> Scalar {
    let m_offset = stress[1] / strain[1];
    let b_offset = -YIELD_OFFSET_STRAIN * m_offset;

    for i in 1..strain.len() - 1 {
        let (x1, x2) = (strain[i], strain[i + 1]);
        let (y1, y2) = (stress[i], stress[i + 1]);
        let m = (y2 - y1) / (x2 - x1);
        let b = y1 - m * x1;
        if m_offset == m {
            continue;
        }
        let x = (b - b_offset) / (m_offset - m);
        if x > x1 && x < x2 {
            return y1 + (x - x1) / (x2 - x1) * (y2 - y1);
        }
    }
    stress[stress.len() - 1]
}
