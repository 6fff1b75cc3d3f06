//! Integration tests for voxsim-contact.

use voxsim_contact::{AllPairs, BroadPhase, CandidatePair, FloorContact, FloorProbe, NullBroadPhase, SpatialHash};
use voxsim_math::DVec3;

fn probe(position: DVec3, velocity: DVec3, applied: DVec3) -> FloorProbe {
    FloorProbe {
        position,
        velocity,
        scale: 0.01,
        mass: 0.001,
        stiffness: 2.0e4,
        damping: 0.1,
        friction_static: 1.0,
        friction_dynamic: 0.5,
        applied_force: applied,
        dt: 1.0e-4,
    }
}

// ─── Broad Phase Tests ────────────────────────────────────────

#[test]
fn candidate_pair_is_ordered() {
    assert_eq!(CandidatePair::new(5, 2), CandidatePair { a: 2, b: 5 });
}

#[test]
fn null_broad_phase_returns_empty() {
    let mut bp = NullBroadPhase;
    bp.update(&[DVec3::ZERO, DVec3::ZERO]).unwrap();
    assert!(bp.query_pairs().is_empty());
    assert_eq!(bp.name(), "null_broad_phase");
}

#[test]
fn all_pairs_count() {
    let mut bp = AllPairs::default();
    bp.update(&[DVec3::ZERO; 5]).unwrap();
    assert_eq!(bp.query_pairs().len(), 10);
}

#[test]
fn spatial_hash_finds_close_pairs() {
    let points = [DVec3::ZERO, DVec3::new(0.9, 0.0, 0.0), DVec3::new(10.0, 0.0, 0.0)];
    let mut hash = SpatialHash::new(1.0);
    hash.update(&points).unwrap();
    let pairs = hash.query_pairs();
    assert_eq!(pairs, vec![CandidatePair { a: 0, b: 1 }]);
}

#[test]
fn spatial_hash_reports_across_cell_boundaries() {
    // Same distance apart but straddling a cell edge.
    let points = [DVec3::new(0.95, 0.95, 0.95), DVec3::new(1.05, 1.05, 1.05)];
    let mut hash = SpatialHash::new(1.0);
    hash.update(&points).unwrap();
    assert_eq!(hash.query_pairs().len(), 1);
}

#[test]
fn spatial_hash_covers_every_close_pair() {
    let points: Vec<DVec3> = (0..60)
        .map(|i| {
            let f = i as f64;
            DVec3::new((f * 0.37).sin() * 3.0, (f * 0.71).cos() * 3.0, (f * 0.13).sin() * 3.0)
        })
        .collect();
    let cell = 0.8;
    let mut hash = SpatialHash::new(cell);
    hash.update(&points).unwrap();
    let pairs = hash.query_pairs();

    let mut all = AllPairs::default();
    all.update(&points).unwrap();
    for pair in all.query_pairs() {
        let d = points[pair.a as usize].distance(points[pair.b as usize]);
        if d < cell {
            assert!(pairs.binary_search(&pair).is_ok(), "missing close pair {pair:?} at distance {d}");
        }
    }
    let mut dedup = pairs.clone();
    dedup.dedup();
    assert_eq!(dedup.len(), pairs.len(), "duplicate pairs reported");
}

#[test]
fn spatial_hash_rejects_nan() {
    let mut hash = SpatialHash::new(1.0);
    assert!(hash.update(&[DVec3::new(f64::NAN, 0.0, 0.0)]).is_err());
}

// ─── Floor Tests ──────────────────────────────────────────────

#[test]
fn floor_penetration() {
    let floor = FloorContact::default();
    assert!((floor.penetration(DVec3::new(0.0, 0.0, 0.004), 0.01) - 0.001).abs() < 1e-15);
    assert_eq!(floor.penetration(DVec3::new(0.0, 0.0, 0.006), 0.01), 0.0);
}

#[test]
fn sloped_floor_rises_toward_x() {
    let floor = FloorContact::new(45.0);
    let p = floor.penetration(DVec3::new(0.01, 0.0, 0.01), 0.01);
    assert!((p - 0.005).abs() < 1e-12, "got {p}");
}

#[test]
fn floor_pushes_up() {
    let floor = FloorContact::default();
    let r = floor.respond(&probe(DVec3::new(0.0, 0.0, 0.004), DVec3::ZERO, DVec3::ZERO));
    assert!(r.is_touching());
    assert!((r.force.z - 20.0).abs() < 1e-9, "got {}", r.force.z);
}

#[test]
fn floor_static_friction_holds_small_push() {
    let floor = FloorContact::default();
    let r = floor.respond(&probe(DVec3::new(0.0, 0.0, 0.004), DVec3::ZERO, DVec3::new(5.0, 0.0, 0.0)));
    assert!(r.static_friction);
    let r = floor.respond(&probe(DVec3::new(0.0, 0.0, 0.004), DVec3::ZERO, DVec3::new(25.0, 0.0, 0.0)));
    assert!(!r.static_friction);
}

#[test]
fn floor_dynamic_friction_opposes_sliding() {
    let floor = FloorContact::default();
    let r = floor.respond(&probe(DVec3::new(0.0, 0.0, 0.004), DVec3::new(0.0, 100.0, 0.0), DVec3::ZERO));
    assert!((r.force.y + 10.0).abs() < 1e-9, "got {:?}", r.force);
    assert!(r.force.x.abs() < 1e-9);
    assert!(!r.stop_lateral);
}

#[test]
fn floor_friction_does_not_overshoot() {
    let floor = FloorContact::default();
    let r = floor.respond(&probe(DVec3::new(0.0, 0.0, 0.004), DVec3::new(0.01, 0.0, 0.0), DVec3::ZERO));
    assert!(r.stop_lateral && r.static_friction);
    assert_eq!(r.force.x, 0.0);
}

#[test]
fn floor_ignores_airborne_voxel() {
    let floor = FloorContact::default();
    let r = floor.respond(&probe(DVec3::new(0.0, 0.0, 1.0), DVec3::new(1.0, 0.0, -1.0), DVec3::ZERO));
    assert_eq!(r, Default::default());
}
