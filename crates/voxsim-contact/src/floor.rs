//! Floor contact.
//!
//! A penalty floor: a voxel whose bottom face dips below the floor
//! surface is pushed back with a linear spring and a critically damped
//! dashpot along Z, and Coulomb friction resists lateral motion.

use serde::{Deserialize, Serialize};
use voxsim_math::DVec3;
use voxsim_types::Scalar;

/// Inputs to the floor law for one voxel.
#[derive(Debug, Clone, Copy)]
pub struct FloorProbe {
    pub position: DVec3,
    pub velocity: DVec3,
    /// Current edge length.
    pub scale: Scalar,
    pub mass: Scalar,
    /// Normal spring stiffness (N/m).
    pub stiffness: Scalar,
    /// Normal dashpot coefficient (N·s/m).
    pub damping: Scalar,
    pub friction_static: Scalar,
    pub friction_dynamic: Scalar,
    /// Force already acting on the voxel from everything else.
    pub applied_force: DVec3,
    pub dt: Scalar,
}

/// Result of the floor law for one voxel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloorResponse {
    /// Depth below the floor surface, zero when not touching.
    pub penetration: Scalar,
    /// Force the floor adds.
    pub force: DVec3,
    /// Static friction holds the voxel: lateral force must be zeroed.
    pub static_friction: bool,
    /// Dynamic friction would overshoot: lateral momentum must be zeroed.
    pub stop_lateral: bool,
}

impl FloorResponse {
    pub fn is_touching(&self) -> bool {
        self.penetration > 0.0
    }
}

/// A ground plane through the origin, optionally sloped about Y.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorContact {
    /// Slope in degrees; the surface rises toward +X.
    pub slope_deg: Scalar,
}

impl FloorContact {
    pub fn new(slope_deg: Scalar) -> Self {
        Self { slope_deg }
    }

    /// Penetration of a cube of edge `scale` centred at `position`.
    pub fn penetration(&self, position: DVec3, scale: Scalar) -> Scalar {
        let surface = position.x * self.slope_deg.to_radians().tan();
        (0.5 * scale - position.z + surface).max(0.0)
    }

    /// Evaluates the floor law.
    pub fn respond(&self, probe: &FloorProbe) -> FloorResponse {
        let penetration = self.penetration(probe.position, probe.scale);
        if penetration <= 0.0 {
            return FloorResponse::default();
        }

        let normal = probe.stiffness * penetration;
        let mut force = DVec3::new(0.0, 0.0, normal - probe.damping * probe.velocity.z);
        let mut static_friction = false;
        let mut stop_lateral = false;

        let v = probe.velocity;
        let surface_speed = (v.x * v.x + v.y * v.y).sqrt();
        let dynamic = probe.friction_dynamic * normal;

        if v.x == 0.0 && v.y == 0.0 {
            let f = probe.applied_force;
            let lateral = (f.x * f.x + f.y * f.y).sqrt();
            static_friction = lateral < probe.friction_static * normal;
        } else if dynamic * probe.dt < probe.mass * surface_speed {
            let angle = v.y.atan2(v.x);
            force.x -= angle.cos() * dynamic;
            force.y -= angle.sin() * dynamic;
        } else {
            static_friction = true;
            stop_lateral = true;
        }

        FloorResponse {
            penetration,
            force,
            static_friction,
            stop_lateral,
        }
    }
}
