//! Integration tests for voxsim-solver.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use proptest::prelude::*;
use voxsim_lattice::generators::chain;
use voxsim_lattice::{BoundaryRegion, Environment, Temperature, VoxelLattice};
use voxsim_material::{Material, MaterialPalette, StressModel};
use voxsim_math::{DQuat, DVec3, Precision};
use voxsim_solver::context::VoxelContext;
use voxsim_solver::stop::StopProbe;
use voxsim_solver::{
    AngleRegime, Bond, BondLink, Development, Features, FloorAccretion, History, SimConfig, Simulation,
    SimulationTask, SineActuator, StiffnessAdaptation, StopCondition, StopHistories, StopStatus, TensileConfig,
    TensileTest, Voxel,
};
use voxsim_types::{Dof, MaterialId, Scalar, VoxelId, VoxsimError};

fn linear_palette(modulus: Scalar, density: Scalar) -> MaterialPalette {
    let mut palette = MaterialPalette::empty();
    palette.add(Material::linear("test", modulus, 0.35, density));
    palette
}

/// Left half of a two-voxel chain.
fn left_half(name: &str) -> BoundaryRegion {
    BoundaryRegion::fixed_box(name, DVec3::ZERO, DVec3::new(0.5, 1.0, 1.0))
}

/// Two 1 m voxels along X, the left one fully fixed, the right one
/// fully fixed and pulled by `pull` metres.
fn pulled_pair(config: SimConfig, palette: MaterialPalette, pull: Scalar) -> Simulation {
    let env = Environment::vacuum().with_region(left_half("anchor")).with_region(BoundaryRegion::displaced_box(
        "pull",
        DVec3::new(0.5, 0.0, 0.0),
        DVec3::new(0.5, 1.0, 1.0),
        DVec3::new(pull, 0.0, 0.0),
    ));
    let mut sim = Simulation::new(config);
    sim.import(chain(2, 1.0, MaterialId(1)), palette, env).unwrap();
    sim
}

// ─── Import Tests ─────────────────────────────────────────────

#[test]
fn import_builds_voxels_and_bonds() {
    let mut sim = Simulation::new(SimConfig::default());
    let lattice = VoxelLattice::from_fn([3, 2, 1], 0.001, |_| MaterialId(1));
    sim.import(lattice, linear_palette(1.0e6, 1000.0), Environment::vacuum()).unwrap();

    assert_eq!(sim.voxels().len(), 6);
    // 2 rows of 2 X-bonds plus 3 Y-bonds
    assert_eq!(sim.internal_bond_count(), 7);
    assert_eq!(sim.collision_bond_count(), 0);
    assert!(sim.dt() > 0.0 && sim.dt() < sim.optimal_dt());
    assert!(!sim.config().features.gravity, "environment switches must override features");

    let corner = sim.voxel_at(0, 0, 0).unwrap();
    assert_eq!(corner.bonds.iter().flatten().count(), 2);
}

#[test]
fn import_without_palette_material_fails() {
    let mut sim = Simulation::new(SimConfig::default());
    let lattice = chain(2, 0.001, MaterialId(2));
    let result = sim.import(lattice, linear_palette(1.0e6, 1000.0), Environment::vacuum());
    assert!(result.is_err());
    assert!(matches!(sim.time_step(), Err(VoxsimError::NotInitialized)));
}

#[test]
fn regions_share_force_between_touching_voxels() {
    let env = Environment::vacuum().with_region(BoundaryRegion::forced_box(
        "load",
        DVec3::new(0.5, 0.0, 0.0),
        DVec3::new(0.5, 1.0, 1.0),
        DVec3::new(0.0, 0.0, -4.0),
    ));
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(4, 1.0, MaterialId(1)), linear_palette(1.0e6, 1000.0), env).unwrap();

    let loaded: Vec<_> = sim.voxels().iter().filter(|v| v.external_force != DVec3::ZERO).collect();
    assert_eq!(loaded.len(), 2);
    for voxel in loaded {
        assert_eq!(voxel.external_force, DVec3::new(0.0, 0.0, -2.0));
    }
    assert_eq!(sim.region_members()[0].len(), 2);
}

#[test]
fn link_rejects_zero_modulus() {
    let good = Material::linear("good", 1.0e6, 0.3, 1000.0);
    let bad = Material::linear("bad", 0.0, 0.3, 1000.0);
    let v1 = Voxel::new(VoxelId(0), 0, MaterialId(1), &good, DVec3::splat(0.5), 1.0, Development::default());
    let v2 = Voxel::new(VoxelId(1), 1, MaterialId(2), &bad, DVec3::new(1.5, 0.5, 0.5), 1.0, Development::default());
    assert!(BondLink::link(VoxelId(0), &v1, VoxelId(1), &v2).is_err());

    let inert = BondLink::unlinked(VoxelId(0), &v1, VoxelId(1), &v2);
    assert_eq!(inert.a1, 0.0);
    assert!(inert.axis.is_some());
}

#[test]
fn link_combines_materials() {
    let a = Material::linear("a", 1.0e6, 0.3, 1000.0);
    let b = Material::linear("b", 3.0e6, 0.3, 1000.0);
    let v1 = Voxel::new(VoxelId(0), 0, MaterialId(1), &a, DVec3::splat(0.5), 1.0, Development::default());
    let v2 = Voxel::new(VoxelId(1), 1, MaterialId(2), &b, DVec3::new(1.5, 0.5, 0.5), 1.0, Development::default());
    let link = BondLink::link(VoxelId(0), &v1, VoxelId(1), &v2).unwrap();

    assert!((link.elastic_modulus - 1.5e6).abs() < 1e-6, "E = {}", link.elastic_modulus);
    assert!((link.a1 - 1.5e6).abs() < 1e-6);
    assert!((link.b3 - 2.0 * 1.5e6 / 12.0).abs() < 1e-6);
    assert!(!link.homogeneous);
}

// ─── Bond Tests ───────────────────────────────────────────────

#[test]
fn zero_state_bond_has_zero_load() {
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(2, 1.0, MaterialId(1)), linear_palette(1.0e6, 1000.0), Environment::vacuum())
        .unwrap();
    sim.time_step().unwrap();

    let bond = sim.bonds()[0].as_internal().unwrap();
    assert_eq!(bond.force1, DVec3::ZERO);
    assert_eq!(bond.force2, DVec3::ZERO);
    assert_eq!(bond.moment1, DVec3::ZERO);
    assert_eq!(bond.moment2, DVec3::ZERO);
    assert_eq!(bond.strain_energy, 0.0);
}

#[test]
fn stretched_bond_pulls_ends_together() {
    let mut sim = pulled_pair(SimConfig::quasi_static(), linear_palette(1.0e6, 1000.0), 0.01);
    // The pull lands in step 1, step 2 sees it with a damping kick, step 3 is static.
    for _ in 0..3 {
        sim.time_step().unwrap();
    }

    let bond = sim.bonds()[0].as_internal().unwrap();
    assert!((bond.strain - 0.01).abs() < 1e-9, "strain = {}", bond.strain);
    assert!((bond.stress - 1.0e4).abs() < 1e-3, "stress = {}", bond.stress);
    assert!(bond.force1.x > 0.0 && bond.force2.x < 0.0);
    assert!((bond.force1 + bond.force2).length() < 1e-9);

    let pull = &sim.region_stats()[1];
    assert!(
        (pull.force_along_displacement - 1.0e4).abs() < 1e-3,
        "reaction = {}",
        pull.force_along_displacement
    );
}

#[test]
fn small_and_large_angle_loads_agree_near_threshold() {
    // Low precision keeps the bond in the small-angle regime, max
    // precision pushes the same configuration into the large-angle one.
    let loads = |precision: Precision| {
        let mut config = SimConfig::quasi_static();
        config.precision = precision;
        config.damping.bond = 0.0;
        let mut sim = Simulation::new(config);
        sim.import(chain(2, 1.0, MaterialId(1)), linear_palette(1.0e6, 1000.0), Environment::vacuum())
            .unwrap();
        let voxel = sim.voxel_mut(VoxelId(1)).unwrap();
        voxel.position += DVec3::new(0.0, 1.0e-3, 0.0);
        voxel.orientation = DQuat::from_rotation_z(1.0e-3);
        sim.time_step().unwrap();
        let bond = sim.bonds()[0].as_internal().unwrap().clone();
        (bond.regime, bond.force1, bond.moment1, bond.moment2)
    };

    let (small_regime, f_small, m1_small, m2_small) = loads(Precision::Low);
    let (large_regime, f_large, m1_large, m2_large) = loads(Precision::Max);
    assert_eq!(small_regime, AngleRegime::Small);
    assert_eq!(large_regime, AngleRegime::Large);

    let close = |a: DVec3, b: DVec3| (a - b).length() <= 1e-2 * a.length().max(b.length());
    assert!(close(f_small, f_large), "force {f_small:?} vs {f_large:?}");
    assert!(close(m1_small, m1_large), "moment1 {m1_small:?} vs {m1_large:?}");
    assert!(close(m2_small, m2_large), "moment2 {m2_small:?} vs {m2_large:?}");
}

#[test]
fn damped_free_vibration_loses_energy() {
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(2, 1.0, MaterialId(1)), linear_palette(1.0e6, 1000.0), Environment::vacuum())
        .unwrap();
    sim.voxel_mut(VoxelId(1)).unwrap().position.x += 0.01;

    sim.time_step().unwrap();
    let initial = sim.stats().total_energy();
    assert!(initial > 0.0);

    let mut previous = initial;
    for _ in 0..20 {
        for _ in 0..10 {
            sim.time_step().unwrap();
        }
        let energy = sim.stats().total_energy();
        assert!(energy <= previous + 1e-9 * initial, "energy rose from {previous} to {energy}");
        previous = energy;
    }
    assert!(previous < 1e-3 * initial, "energy only fell to {previous} of {initial}");
}

#[test]
fn plastic_unloading_follows_elastic_slope() {
    let mut palette = MaterialPalette::empty();
    palette.add(Material::linear("ductile", 1.0e6, 0.35, 1000.0).with_model(StressModel::Bilinear {
        yield_stress: 1.0e4,
        plastic_modulus: 1.0e5,
        fail: None,
    }));
    let mut sim = pulled_pair(SimConfig::quasi_static(), palette, 0.02);

    // Load to 2% strain: yield at 1%, then the plastic slope.
    sim.time_step().unwrap();
    sim.time_step().unwrap();
    let bond = sim.bonds()[0].as_internal().unwrap();
    assert!(bond.yielded);
    assert!((bond.stress - 1.1e4).abs() < 1e-2, "stress = {}", bond.stress);
    assert!((bond.strain_offset - 0.009).abs() < 1e-9, "offset = {}", bond.strain_offset);
    assert!((bond.max_strain - 0.02).abs() < 1e-9);

    // Unload to 1%.
    sim.scale_external_inputs(0.5);
    sim.time_step().unwrap();
    sim.time_step().unwrap();
    let bond = sim.bonds()[0].as_internal().unwrap();
    assert!((bond.stress - 1.0e3).abs() < 1e-2, "stress = {}", bond.stress);
    assert!((bond.max_strain - 0.02).abs() < 1e-9, "high-water mark must hold");

    // Unload fully: compressive residual stress.
    sim.scale_external_inputs(0.0);
    sim.time_step().unwrap();
    sim.time_step().unwrap();
    let bond = sim.bonds()[0].as_internal().unwrap();
    assert!((bond.stress + 9.0e3).abs() < 1e-2, "stress = {}", bond.stress);
}

#[test]
fn failure_breaks_bond_and_drops_load() {
    let mut palette = MaterialPalette::empty();
    palette.add(Material::linear("brittle", 1.0e6, 0.35, 1000.0).with_model(StressModel::LinearFail {
        fail: voxsim_material::FailCriterion::MaxStrain(0.01),
    }));
    let mut sim = pulled_pair(SimConfig::quasi_static(), palette, 0.02);
    for _ in 0..3 {
        sim.time_step().unwrap();
    }

    let bond = sim.bonds()[0].as_internal().unwrap();
    assert!(bond.broken);
    assert_eq!(bond.force1, DVec3::ZERO);
    assert_eq!(sim.stats().broken_bonds, 1);
    assert!(sim.voxels().iter().all(|v| v.broken));
}

// ─── Volume Effect Tests ──────────────────────────────────────

fn volume_config() -> SimConfig {
    let mut config = SimConfig::quasi_static();
    config.features.volume_effects = true;
    config
}

fn poisson_lateral(axial: Scalar, nu: Scalar) -> Scalar {
    (1.0 + axial).powf(-nu) - 1.0
}

#[test]
fn pulled_pair_contracts_laterally() {
    let mut sim = pulled_pair(volume_config(), linear_palette(1.0e6, 1000.0), 0.01);
    for _ in 0..4 {
        sim.time_step().unwrap();
    }

    let lateral = poisson_lateral(0.01, 0.35);
    for voxel in sim.voxels() {
        let sum = voxel.transverse_strain_sum;
        assert!((sum[0] - 2.0 * lateral).abs() < 1e-12, "transverse X = {}", sum[0]);
        assert!((voxel.cross_section[0] - (1.0 + lateral).powi(2)).abs() < 1e-12);
    }

    // Volumetric modulus acting on the axial and lateral strains.
    let nu = 0.35;
    let volumetric = 1.0e6 / ((1.0 - 2.0 * nu) * (1.0 + nu));
    let expected = volumetric * ((1.0 - nu) * 0.01 + nu * 2.0 * lateral);
    let bond = sim.bonds()[0].as_internal().unwrap();
    assert!((bond.stress - expected).abs() < 1e-6 * expected, "stress = {}, expected = {expected}", bond.stress);
}

#[test]
fn two_axis_tension_contracts_the_free_axis() {
    // Plus-shaped lattice whose four arms are pulled outward by 1%.
    let mut lattice = VoxelLattice::new([3, 3, 1], 1.0);
    for (i, j) in [(1, 0), (0, 1), (1, 1), (2, 1), (1, 2)] {
        lattice.set(i, j, 0, MaterialId(1)).unwrap();
    }
    let arm = |name: &str, i: Scalar, j: Scalar, pull: DVec3| {
        BoundaryRegion::displaced_box(name, DVec3::new(i + 0.25, j + 0.25, 0.25), DVec3::splat(0.5), pull)
    };
    let env = Environment::vacuum()
        .with_region(arm("west", 0.0, 1.0, DVec3::new(-0.01, 0.0, 0.0)))
        .with_region(arm("east", 2.0, 1.0, DVec3::new(0.01, 0.0, 0.0)))
        .with_region(arm("south", 1.0, 0.0, DVec3::new(0.0, -0.01, 0.0)))
        .with_region(arm("north", 1.0, 2.0, DVec3::new(0.0, 0.01, 0.0)));
    let mut sim = Simulation::new(volume_config());
    sim.import(lattice, linear_palette(1.0e6, 1000.0), env).unwrap();
    for _ in 0..4 {
        sim.time_step().unwrap();
    }

    let center = sim.voxel_at(1, 1, 0).unwrap();
    assert!(center.displacement().length() < 1e-12, "center moved {:?}", center.displacement());
    let free = poisson_lateral(0.02, 0.35);
    let sum = center.transverse_strain_sum;
    assert!((sum[0] - (0.01 + free)).abs() < 1e-9, "transverse X = {}", sum[0]);
    assert!((sum[1] - (0.01 + free)).abs() < 1e-9, "transverse Y = {}", sum[1]);
    assert!((sum[2] - 0.02).abs() < 1e-9, "transverse Z = {}", sum[2]);
    assert!((center.cross_section[2] - 1.01 * 1.01).abs() < 1e-9);
}

#[test]
fn heated_constrained_bond_is_compressed() {
    let (modulus, nu, cte, delta_t) = (1.0e6, 0.35, 1.0e-4, 10.0);
    let mut palette = MaterialPalette::empty();
    palette.add(Material::linear("warm", modulus, nu, 1000.0).with_cte(cte, 0.0));
    let mut env = Environment::vacuum()
        .with_region(left_half("anchor"))
        .with_region(BoundaryRegion::fixed_box("clamp", DVec3::new(0.5, 0.0, 0.0), DVec3::new(0.5, 1.0, 1.0)));
    env.temperature = Temperature {
        enabled: true,
        vary: false,
        base: 20.0,
        amplitude: delta_t,
        period: 0.0,
    };
    let mut sim = Simulation::new(volume_config());
    sim.import(chain(2, 1.0, MaterialId(1)), palette, env).unwrap();
    for _ in 0..3 {
        sim.time_step().unwrap();
    }

    let expected = -modulus * cte * delta_t / (1.0 - 2.0 * nu);
    let bond = sim.bonds()[0].as_internal().unwrap();
    assert!(bond.strain.abs() < 1e-15, "strain = {}", bond.strain);
    assert!((bond.stress - expected).abs() < 1e-9 * expected.abs(), "stress = {}, expected = {expected}", bond.stress);
    // The ends push outward against the clamps.
    assert!(bond.force1.x < 0.0 && bond.force2.x > 0.0);
}

// ─── Collision Tests ──────────────────────────────────────────

#[test]
fn collision_forces_are_equal_and_opposite() {
    // Two voxels with a gap between them; the left one is pushed right.
    let lattice = VoxelLattice::from_fn([3, 1, 1], 1.0, |[i, _, _]| {
        if i == 1 {
            MaterialId::EMPTY
        } else {
            MaterialId(1)
        }
    });
    let env = Environment::vacuum()
        .with_region(BoundaryRegion::forced_box(
            "push",
            DVec3::ZERO,
            DVec3::new(0.2, 1.0, 1.0),
            DVec3::new(1.0e5, 0.0, 0.0),
        ))
        .with_region(BoundaryRegion::fixed_box(
            "wall",
            DVec3::new(0.8, 0.0, 0.0),
            DVec3::new(0.2, 1.0, 1.0),
        ));
    let config = SimConfig {
        features: Features {
            collisions: true,
            ..Features::default()
        },
        ..SimConfig::quasi_static()
    };
    let mut sim = Simulation::new(config);
    sim.import(lattice, linear_palette(1.0e6, 1000.0), env).unwrap();

    let mut touched = false;
    for _ in 0..200 {
        sim.time_step().unwrap();
        for bond in sim.bonds() {
            if let Bond::Collision(c) = bond {
                assert!(
                    (c.force1 + c.force2).length() <= 1e-12 * c.force1.length().max(1.0),
                    "f1 = {:?}, f2 = {:?}",
                    c.force1,
                    c.force2
                );
                touched |= c.is_touching();
            }
        }
    }
    assert!(sim.collision_bond_count() > 0);
    assert!(touched, "the pushed voxel never reached the wall");
    assert!(sim.voxels()[0].position.x < sim.voxels()[1].position.x);
}

// ─── Voxel Tests ──────────────────────────────────────────────

#[test]
fn fixed_translation_holds_under_load() {
    let anchor = BoundaryRegion {
        fixed: Dof::TRANSLATION,
        force: DVec3::new(100.0, 50.0, -30.0),
        ..left_half("anchor")
    };
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(2, 1.0, MaterialId(1)), linear_palette(1.0e6, 1000.0), Environment::vacuum().with_region(anchor))
        .unwrap();

    let nominal = sim.voxels()[0].nominal_position;
    for _ in 0..500 {
        sim.time_step().unwrap();
        assert_eq!(sim.voxels()[0].position, nominal);
    }
}

#[test]
fn orientation_stays_normalized_under_torque() {
    let env = Environment::vacuum().with_region(left_half("anchor")).with_region(BoundaryRegion {
        torque: DVec3::new(3.0e3, -2.0e3, 5.0e3),
        ..BoundaryRegion::forced_box("twist", DVec3::new(0.5, 0.0, 0.0), DVec3::new(0.5, 1.0, 1.0), DVec3::ZERO)
    });
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(2, 1.0, MaterialId(1)), linear_palette(1.0e6, 1000.0), env).unwrap();

    for _ in 0..2000 {
        sim.time_step().unwrap();
    }
    for voxel in sim.voxels() {
        let length = voxel.orientation.length();
        assert!((length - 1.0).abs() < 1e-9, "voxel {} |q| = {length}", voxel.id.0);
    }
    assert!(sim.voxels()[1].orientation != voxsim_math::DQuat::IDENTITY);
}

#[test]
fn stiffness_adaptation_stays_within_bounds() {
    let config = SimConfig {
        stiffness: Some(StiffnessAdaptation {
            stress_rate: 1.0e3,
            pressure_rate: 0.0,
            min_modulus: 5.0e5,
            max_modulus: 2.0e6,
            max_delta: 1.0e4,
        }),
        ..SimConfig::quasi_static()
    };
    let mut sim = pulled_pair(config, linear_palette(1.0e6, 1000.0), 0.01);
    let dt0 = sim.dt();
    for _ in 0..300 {
        sim.time_step().unwrap();
        for voxel in sim.voxels() {
            assert!((5.0e5..=2.0e6).contains(&voxel.modulus), "modulus = {}", voxel.modulus);
        }
    }
    assert!(sim.voxels()[0].modulus > 1.0e6);
    assert!(sim.dt() < dt0, "a stiffer lattice needs a smaller timestep");
    let bond = sim.bonds()[0].as_internal().unwrap();
    assert!(bond.link.elastic_modulus > 1.0e6, "bonds must be relinked");
}

#[test]
fn sliding_voxel_comes_to_rest_on_the_floor() {
    let mut palette = MaterialPalette::empty();
    palette.add(Material::linear("rubber", 1.0e6, 0.35, 1000.0).with_friction(1.0, 0.5));
    let mut env = Environment::default();
    env.floor.enabled = true;
    let mut sim = Simulation::new(SimConfig::default());
    sim.import(chain(1, 0.01, MaterialId(1)), palette, env).unwrap();

    let voxel = sim.voxel_mut(VoxelId(0)).unwrap();
    voxel.linear_momentum.x = voxel.mass * 0.05;
    for _ in 0..2000 {
        sim.time_step().unwrap();
    }

    let voxel = &sim.voxels()[0];
    let slid = voxel.displacement().x;
    assert!(voxel.touching_floor);
    assert!(voxel.static_friction, "voxel should be held by static friction");
    assert_eq!(voxel.velocity.x, 0.0);
    // v²/(2·μd·g) for a block sliding to rest.
    let expected = 0.05 * 0.05 / (2.0 * 0.5 * 9.81);
    assert!(slid > 0.5 * expected && slid < 2.0 * expected, "slid {slid}, expected about {expected}");

    for _ in 0..500 {
        sim.time_step().unwrap();
    }
    assert_eq!(sim.voxels()[0].displacement().x, slid, "a resting voxel must not creep");
}

// ─── Extension Tests ──────────────────────────────────────────

#[test]
fn sine_actuator_drives_voxel_scale() {
    let (cte, amplitude, frequency) = (0.01, 10.0, 2.0);
    let mut palette = MaterialPalette::empty();
    palette.add(Material::linear("muscle", 1.0e6, 0.35, 1000.0).with_cte(cte, 0.0));
    let mut env = Environment::vacuum();
    env.temperature.amplitude = amplitude;
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(1, 1.0, MaterialId(1)), palette, env).unwrap();
    sim.add_extension(Box::new(SineActuator::uniform(frequency)));
    assert_eq!(sim.extension_names(), vec!["sine_actuator"]);

    let (mut largest, mut smallest): (Scalar, Scalar) = (1.0, 1.0);
    // A little over one period.
    while sim.time() < 0.6 {
        let t = sim.time();
        sim.time_step().unwrap();
        let output = (2.0 * std::f64::consts::PI * (frequency * t)).sin();
        assert_eq!(sim.controls()[0].actuation, Some(output));
        let scale = sim.voxels()[0].scale;
        let expected = 1.0 + cte * amplitude * output;
        assert!((scale - expected).abs() < 1e-12, "t = {t}: scale {scale}, expected {expected}");
        largest = largest.max(scale);
        smallest = smallest.min(scale);
    }
    assert!((largest - 1.1).abs() < 1e-3, "peak scale {largest}");
    assert!((smallest - 0.9).abs() < 1e-3, "trough scale {smallest}");
}

#[test]
fn floor_accretion_stops_at_its_cap() {
    let grow = |floor: bool| {
        let mut env = Environment::default();
        env.floor.enabled = floor;
        let mut sim = Simulation::new(SimConfig::default());
        sim.import(chain(1, 0.01, MaterialId(1)), linear_palette(1.0e6, 1000.0), env).unwrap();
        sim.add_extension(Box::new(FloorAccretion::new(1.0, 0.05)));
        for _ in 0..4000 {
            sim.time_step().unwrap();
        }
        (sim.controls()[0].accretion, sim.voxels()[0].scale)
    };

    let (accretion, scale) = grow(true);
    assert_eq!(accretion, 0.05);
    assert!((scale - 0.0105).abs() < 1e-12, "scale = {scale}");

    let (accretion, scale) = grow(false);
    assert_eq!(accretion, 0.0, "a voxel off the floor must not grow");
    assert_eq!(scale, 0.01);
}

// ─── Scenario Tests ───────────────────────────────────────────

#[test]
fn cantilever_matches_beam_theory() {
    let n = 20;
    let size = 0.001;
    let modulus = 1.0e6;
    let force = 3.0e-5;
    let env = Environment::vacuum()
        .with_region(BoundaryRegion::fixed_box(
            "root",
            DVec3::ZERO,
            DVec3::new(0.5 / n as Scalar, 1.0, 1.0),
        ))
        .with_region(BoundaryRegion::forced_box(
            "tip",
            DVec3::new(1.0 - 0.5 / n as Scalar, 0.0, 0.0),
            DVec3::new(0.5 / n as Scalar, 1.0, 1.0),
            DVec3::new(0.0, 0.0, -force),
        ));
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(n, size, MaterialId(1)), linear_palette(modulus, 1.0), env).unwrap();
    sim.preflight().unwrap();

    while !sim.stop_condition_met() && sim.step_count() < 300_000 {
        sim.time_step().unwrap();
    }
    assert!(
        matches!(sim.status(), StopStatus::Reached(StopCondition::MinMaxMove(_))),
        "did not settle: {:?} after {} steps",
        sim.status(),
        sim.step_count()
    );

    let expected = 4.0 * force * ((n - 1) as Scalar).powi(3) / (modulus * size);
    let tip = sim.voxels()[n - 1].displacement().z.abs();
    let error = (tip - expected).abs() / expected;
    assert!(error < 0.05, "tip = {tip}, expected = {expected}, error = {error}");
}

#[test]
fn tensile_test_reports_linear_response() {
    let mut sim = pulled_pair(SimConfig::quasi_static(), linear_palette(1.0e6, 1000.0), 0.01);
    let mut reported = Vec::new();
    let rows = TensileTest::new(TensileConfig {
        increments: 4,
        ..TensileConfig::default()
    })
    .run(&mut sim, None, |done, total| reported.push((done, total)))
    .unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(reported.last(), Some(&(4, 4)));
    for (i, row) in rows.iter().enumerate() {
        let expected = 0.0025 * (i + 1) as Scalar;
        assert!((row.displacement - expected).abs() < 1e-9, "row {i}: {row:?}");
        assert!((row.force - 1.0e6 * expected).abs() < 1e-3, "row {i}: {row:?}");
        let modulus = row.modulus.unwrap();
        assert!((modulus - 1.0e6).abs() < 1.0, "row {i}: modulus = {modulus}");
    }
    assert!(!sim.config().features.equilibrium_mode, "equilibrium mode must be restored");
}

#[test]
fn tensile_test_settles_free_interior_voxels() {
    let (size, modulus, strain) = (0.001, 1.0e6, 0.01);
    let gauge = 4.0 * size;
    let env = Environment::vacuum()
        .with_region(BoundaryRegion::fixed_box("anchor", DVec3::ZERO, DVec3::new(0.5 * size, size, size)))
        .with_region(BoundaryRegion::displaced_box(
            "pull",
            DVec3::new(4.5 * size, 0.0, 0.0),
            DVec3::new(0.5 * size, size, size),
            DVec3::new(strain * gauge, 0.0, 0.0),
        ));
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(5, size, MaterialId(1)), linear_palette(modulus, 1000.0), env).unwrap();

    let rows = TensileTest::new(TensileConfig {
        increments: 4,
        ..TensileConfig::default()
    })
    .run(&mut sim, None, |_, _| {})
    .unwrap();

    for (i, row) in rows.iter().enumerate() {
        let expected = modulus * size * size * strain * (i + 1) as Scalar / 4.0;
        assert!((row.force - expected).abs() < 1e-3 * expected, "row {i}: {row:?}");
    }
    let last = rows.last().unwrap();
    let measured = last.modulus.unwrap();
    assert!((measured - modulus).abs() < 1e-3 * modulus, "modulus = {measured}");

    // A uniform bar stretches evenly.
    let step = strain * size;
    for i in 1..4 {
        let moved = sim.voxels()[i].displacement().x;
        let expected = i as Scalar * step;
        assert!((moved - expected).abs() < 1e-3 * step, "voxel {i} moved {moved}, expected {expected}");
    }
}

#[test]
fn tensile_test_honours_cancel() {
    let mut sim = pulled_pair(SimConfig::quasi_static(), linear_palette(1.0e6, 1000.0), 0.01);
    let cancel = AtomicBool::new(true);
    let result = TensileTest::new(TensileConfig::default()).run(&mut sim, Some(&cancel), |_, _| {});
    assert!(matches!(result, Err(VoxsimError::Cancelled { .. })));
}

// ─── Lifecycle Tests ──────────────────────────────────────────

#[test]
fn preflight_rejects_unanchored_objects() {
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(chain(3, 1.0, MaterialId(1)), linear_palette(1.0e6, 1000.0), Environment::vacuum())
        .unwrap();
    assert!(matches!(sim.preflight(), Err(VoxsimError::InvalidBoundary(_))));

    let lattice = VoxelLattice::from_fn([3, 1, 1], 1.0, |[i, _, _]| {
        if i == 1 {
            MaterialId::EMPTY
        } else {
            MaterialId(1)
        }
    });
    let env = Environment::vacuum().with_region(BoundaryRegion::fixed_box(
        "left",
        DVec3::ZERO,
        DVec3::new(0.2, 1.0, 1.0),
    ));
    let mut sim = Simulation::new(SimConfig::quasi_static());
    sim.import(lattice, linear_palette(1.0e6, 1000.0), env).unwrap();
    assert!(matches!(sim.preflight(), Err(VoxsimError::InvalidBoundary(_))));
}

#[test]
fn run_stops_at_max_time_steps() {
    let mut config = SimConfig::quasi_static();
    config.stop = StopCondition::MaxTimeSteps(25);
    let mut sim = pulled_pair(config, linear_palette(1.0e6, 1000.0), 0.01);
    let mut observed = 0;
    let status = sim.run_with(None, |_| observed += 1).unwrap();

    assert_eq!(status, StopStatus::Reached(StopCondition::MaxTimeSteps(25)));
    assert_eq!(sim.step_count(), 25);
    assert_eq!(observed, 25);
    assert!((sim.time() - 25.0 * sim.dt()).abs() < 1e-12);
}

#[test]
fn reset_returns_to_nominal_state() {
    let mut sim = pulled_pair(SimConfig::quasi_static(), linear_palette(1.0e6, 1000.0), 0.01);
    for _ in 0..10 {
        sim.time_step().unwrap();
    }
    sim.reset();

    assert_eq!(sim.step_count(), 0);
    assert_eq!(sim.time(), 0.0);
    assert_eq!(sim.status(), &StopStatus::Running);
    for voxel in sim.voxels() {
        assert_eq!(voxel.position, voxel.nominal_position);
    }
    let bond = sim.bonds()[0].as_internal().unwrap();
    assert_eq!(bond.stress, 0.0);
    assert_eq!(bond.max_strain, 0.0);
}

#[test]
fn sandbox_is_independent() {
    let mut sim = pulled_pair(SimConfig::quasi_static(), linear_palette(1.0e6, 1000.0), 0.01);
    for _ in 0..5 {
        sim.time_step().unwrap();
    }
    let mut copy = sim.sandbox().unwrap();
    assert_eq!(copy.step_count(), 5);
    assert_eq!(copy.voxels()[1].position, sim.voxels()[1].position);

    copy.scale_external_inputs(0.0);
    for _ in 0..3 {
        copy.time_step().unwrap();
    }
    assert_eq!(sim.step_count(), 5);
    assert_ne!(copy.voxels()[1].position, sim.voxels()[1].position);
}

#[test]
fn equilibrium_mode_restores_settings() {
    let mut sim = pulled_pair(SimConfig::quasi_static(), linear_palette(1.0e6, 1000.0), 0.01);
    let before = sim.config().damping;

    sim.set_equilibrium_mode(true);
    assert_eq!(sim.config().damping.bond, 0.1);
    assert_eq!(sim.config().damping.slow, 0.0);
    assert!(!sim.config().features.max_velocity);

    sim.set_equilibrium_mode(false);
    assert_eq!(sim.config().damping, before);
    assert!(!sim.config().features.equilibrium_mode);
}

#[test]
fn task_can_be_cancelled() {
    let mut sim = pulled_pair(SimConfig::quasi_static(), linear_palette(1.0e6, 1000.0), 0.01);
    sim.set_stop_condition(StopCondition::None);
    let task = SimulationTask::spawn(sim, 100);
    std::thread::sleep(Duration::from_millis(20));
    task.cancel();

    let (sim, status) = task.join().unwrap();
    assert!(matches!(status, StopStatus::Cancelled { .. }), "status = {status:?}");
    assert_eq!(sim.status(), &status);
}

#[test]
fn task_reports_progress() {
    let mut config = SimConfig::quasi_static();
    config.stop = StopCondition::MaxTimeSteps(100);
    let sim = pulled_pair(config, linear_palette(1.0e6, 1000.0), 0.01);
    let task = SimulationTask::spawn(sim, 10);
    while !task.is_finished() {
        std::thread::sleep(Duration::from_millis(1));
    }

    let progress = task.poll_progress();
    assert_eq!(progress.len(), 10);
    let last = progress.last().unwrap();
    assert_eq!(last.step, 100);
    assert_eq!(last.fraction, Some(1.0));

    let (_, status) = task.join().unwrap();
    assert_eq!(status, StopStatus::Reached(StopCondition::MaxTimeSteps(100)));
}

// ─── Stop Condition Tests ─────────────────────────────────────

fn probe<'a>(histories: &'a StopHistories, step: u64, max_move: Scalar) -> StopProbe<'a> {
    StopProbe {
        step,
        time: step as Scalar * 0.1,
        temperature_period: 2.0,
        max_move,
        voxel_count: 4,
        histories,
    }
}

#[test]
fn history_keeps_latest_samples() {
    let mut history = History::new(3);
    for v in [1.0, 5.0, 2.0, 4.0] {
        history.push(v);
    }
    assert!(history.is_full());
    assert_eq!(history.iter().collect::<Vec<_>>(), vec![5.0, 2.0, 4.0]);
    assert_eq!(history.max(), 5.0);
    assert_eq!(history.min(), 2.0);
    assert!((history.mean() - 11.0 / 3.0).abs() < 1e-12);
    assert_eq!(history.latest(), Some(4.0));
}

#[test]
fn simple_stop_conditions() {
    let histories = StopHistories::default();
    assert!(!StopCondition::None.is_met(&probe(&histories, 1_000_000, 0.0)));
    assert!(StopCondition::MaxTimeSteps(10).is_met(&probe(&histories, 10, 1.0)));
    assert!(!StopCondition::MaxTimeSteps(10).is_met(&probe(&histories, 9, 1.0)));
    assert!(StopCondition::MaxSimTime(1.0).is_met(&probe(&histories, 10, 1.0)));
    assert!(StopCondition::TempCycles(3.0).is_met(&probe(&histories, 60, 1.0)));
    assert!(!StopCondition::TempCycles(3.0).is_met(&probe(&histories, 59, 1.0)));
    assert!(StopCondition::MinMaxMove(1e-6).is_met(&probe(&histories, 1, 1e-7)));
    assert!(!StopCondition::MinMaxMove(1e-6).is_met(&probe(&histories, 0, 0.0)));
}

#[test]
fn temp_cycles_never_met_with_zero_period() {
    let histories = StopHistories::default();
    let mut p = probe(&histories, 1000, 0.0);
    p.temperature_period = 0.0;
    assert!(!StopCondition::TempCycles(1.0).is_met(&p));
}

#[test]
fn energy_conditions_need_a_full_history() {
    let mut histories = StopHistories::default();
    let cap = histories.total.capacity();
    for _ in 0..cap - 1 {
        histories.total.push(1.0);
        histories.kinetic.push(1e-9);
    }
    assert!(!StopCondition::ConstMaxEnergy(0.01).is_met(&probe(&histories, 1, 1.0)));
    assert!(!StopCondition::MinKE(1e-6).is_met(&probe(&histories, 1, 1.0)));

    histories.total.push(1.005);
    histories.kinetic.push(1e-9);
    assert!(StopCondition::ConstMaxEnergy(0.01).is_met(&probe(&histories, 1, 1.0)));
    assert!(!StopCondition::ConstMaxEnergy(0.001).is_met(&probe(&histories, 1, 1.0)));
    assert!(StopCondition::MinKE(1e-6).is_met(&probe(&histories, 1, 1.0)));
}

#[test]
fn invalid_stop_values_are_rejected() {
    assert!(StopCondition::MinKE(-1.0).validate().is_err());
    assert!(StopCondition::MaxSimTime(Scalar::NAN).validate().is_err());
    assert!(StopCondition::MaxTimeSteps(0).validate().is_ok());
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn config_presets_validate() {
    for config in [SimConfig::default(), SimConfig::quasi_static(), SimConfig::dynamic(), SimConfig::debug()] {
        config.validate().unwrap();
    }
    let bad = SimConfig {
        collision_horizon: 1.0,
        ..SimConfig::default()
    };
    assert!(bad.validate().is_err());
}

#[test]
fn config_serde_roundtrip() {
    let config = SimConfig::dynamic();
    let json = serde_json::to_string(&config).unwrap();
    let back: SimConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, back);

    let partial: SimConfig = serde_json::from_str(r#"{"dt_fraction": 0.5}"#).unwrap();
    assert_eq!(partial.dt_fraction, 0.5);
    assert_eq!(partial.nearby_hops, 2);
}

// ─── Property Tests ───────────────────────────────────────────

fn lone_voxel(cte: Scalar) -> Voxel {
    let material = Material::linear("m", 1.0e6, 0.35, 1000.0).with_cte(cte, 0.0);
    Voxel::new(VoxelId(0), 0, MaterialId(1), &material, DVec3::splat(0.5), 1.0, Development::default())
}

fn thermal_ctx(bonds: &[Bond], amplitude: Scalar, time: Scalar) -> VoxelContext<'_> {
    VoxelContext {
        bonds,
        controls: &[],
        features: Features {
            gravity: false,
            floor: false,
            temperature: true,
            temperature_vary: true,
            ..Features::default()
        },
        damping: Default::default(),
        gravity: 0.0,
        floor: Default::default(),
        fluid_drag: 0.0,
        temperature: Temperature {
            enabled: true,
            vary: true,
            base: 20.0,
            amplitude,
            period: 1.0,
        },
        actuation: Default::default(),
        max_velocity_fraction: 0.1,
        min_temp_factor: 0.1,
        init_time: 0.0,
        actuation_start_time: 0.0,
        development_end_time: 0.0,
        stiffness: None,
        dt: 1.0e-3,
        time,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_scale_stays_within_bounds(
        cte in 0.0f64..0.5,
        amplitude in -50.0f64..50.0,
        times in proptest::collection::vec(0.0f64..10.0, 1..20),
    ) {
        let mut voxel = lone_voxel(cte);
        let (min_scale, max_scale) = (0.1, 3.0);
        for t in times {
            let last = voxel.last_scale;
            voxel.euler_step(&thermal_ctx(&[], amplitude, t));
            prop_assert!(voxel.scale >= last.min(min_scale) - 1e-12, "scale {} below bound", voxel.scale);
            prop_assert!(voxel.scale <= last.max(max_scale) + 1e-12, "scale {} above bound", voxel.scale);
        }
    }

    #[test]
    fn prop_adapted_modulus_is_clamped(
        stress_rate in -1.0e4f64..1.0e4,
        pressure_rate in -1.0e4f64..1.0e4,
    ) {
        let config = SimConfig {
            stiffness: Some(StiffnessAdaptation {
                stress_rate,
                pressure_rate,
                min_modulus: 8.0e5,
                max_modulus: 1.2e6,
                max_delta: 5.0e4,
            }),
            ..SimConfig::quasi_static()
        };
        let mut sim = pulled_pair(config, linear_palette(1.0e6, 1000.0), 0.01);
        for _ in 0..50 {
            sim.time_step().unwrap();
        }
        for voxel in sim.voxels() {
            prop_assert!((8.0e5..=1.2e6).contains(&voxel.modulus), "modulus = {}", voxel.modulus);
        }
    }

    #[test]
    fn prop_orientation_is_unit(
        tx in -1.0e4f64..1.0e4,
        ty in -1.0e4f64..1.0e4,
        tz in -1.0e4f64..1.0e4,
    ) {
        let env = Environment::vacuum().with_region(left_half("anchor")).with_region(BoundaryRegion {
            torque: DVec3::new(tx, ty, tz),
            ..BoundaryRegion::forced_box("twist", DVec3::new(0.5, 0.0, 0.0), DVec3::new(0.5, 1.0, 1.0), DVec3::ZERO)
        });
        let mut sim = Simulation::new(SimConfig::quasi_static());
        sim.import(chain(2, 1.0, MaterialId(1)), linear_palette(1.0e6, 1000.0), env).unwrap();
        for _ in 0..200 {
            sim.time_step().unwrap();
        }
        for voxel in sim.voxels() {
            prop_assert!((voxel.orientation.length() - 1.0).abs() < 1e-9);
        }
    }
}
