use cdt_core::RngHandle;
use cdt_foliation::{make_foliated_sphere, FoliatedTriangulation, Manifold3};
use cdt_tds::canonical_hash;
use proptest::prelude::*;

fn sample_manifold(simplices: usize, timeslices: usize, seed: u64) -> Manifold3 {
    let mut rng = RngHandle::from_seed(seed);
    Manifold3::new(simplices, timeslices, &mut rng).unwrap()
}

#[test]
fn standard_universe_spans_all_timeslices() {
    let manifold = sample_manifold(640, 4, 42);
    assert_eq!(manifold.min_time(), 1);
    assert_eq!(manifold.max_time(), 4);
    assert_eq!(
        manifold.n3(),
        manifold.n3_31() + manifold.n3_22() + manifold.n3_13()
    );
    assert_eq!(manifold.n3(), 648);
    assert_eq!(manifold.n3_31(), 216);
    assert_eq!(manifold.n3_22(), 216);
    assert_eq!(manifold.n3_13(), 216);
    assert!(manifold.is_correct());
    assert!(manifold.triangulation().check_vertices());
}

#[test]
fn minimal_universe_is_two_tetrahedral_shells() {
    let manifold = sample_manifold(2, 2, 1);
    assert_eq!(manifold.n0(), 8);
    assert_eq!(manifold.n3(), 12);
    assert!((1..=8).contains(&manifold.n0()));
    assert!((1..=12).contains(&manifold.n3()));
    assert_eq!(manifold.n1_sl(), 12);
    assert_eq!(manifold.n1_tl(), 10);
    assert_eq!(manifold.n2(), 28);
    assert!(manifold.is_correct());
}

#[test]
fn euler_characteristic_matches_a_spherical_shell() {
    let manifold = sample_manifold(640, 4, 9);
    let geometry = manifold.geometry();
    let chi = geometry.n0 as i64 - geometry.n1 as i64 + geometry.n2 as i64 - geometry.n3 as i64;
    assert_eq!(chi, 2);
    assert_eq!(geometry.n1, geometry.n1_tl + geometry.n1_sl);
    assert_eq!(geometry.n3_31_13, geometry.n3_31 + geometry.n3_13);
}

#[test]
fn every_timeslice_carries_the_base_sphere() {
    let manifold = sample_manifold(640, 4, 3);
    let facets = manifold.spacelike_facets();
    assert_eq!(facets.len(), 4);
    assert!(facets.values().all(|&count| count == 72));
}

#[test]
fn same_seed_builds_the_same_sphere() {
    let a = sample_manifold(300, 3, 17);
    let b = sample_manifold(300, 3, 17);
    assert_eq!(
        canonical_hash(a.tds()).unwrap(),
        canonical_hash(b.tds()).unwrap()
    );
}

#[test]
fn bad_parameters_are_rejected() {
    let mut rng = RngHandle::from_seed(0);
    assert!(make_foliated_sphere(100, 1, 1.0, 1.0, &mut rng).is_err());
    assert!(make_foliated_sphere(0, 3, 1.0, 1.0, &mut rng).is_err());
    assert!(make_foliated_sphere(100, 3, 0.0, 1.0, &mut rng).is_err());
    assert!(FoliatedTriangulation::new(100, 0, &mut rng).is_err());
}

#[test]
fn custom_embedding_places_slices_on_their_spheres() {
    let mut rng = RngHandle::from_seed(5);
    let triangulation = FoliatedTriangulation::with_parameters(200, 3, 2.0, 0.5, &mut rng).unwrap();
    assert!(triangulation.check_vertices());
    assert_eq!(triangulation.expected_radius(3), 3.0);
    assert_eq!(triangulation.expected_timevalue(&[0.0, 2.5, 0.0]), 2);
}

proptest! {
    #[test]
    fn generated_spheres_are_foliated(seed in any::<u64>(), simplices in 1usize..400, timeslices in 2usize..6) {
        let mut rng = RngHandle::from_seed(seed);
        let triangulation = FoliatedTriangulation::new(simplices, timeslices, &mut rng).unwrap();
        prop_assert!(triangulation.is_correct());
        let layers = timeslices - 1;
        let cells = triangulation.three_one().len()
            + triangulation.two_two().len()
            + triangulation.one_three().len();
        prop_assert!(cells >= simplices);
        prop_assert_eq!(cells % (3 * layers), 0);
        prop_assert_eq!(triangulation.min_time(), 1);
        prop_assert_eq!(triangulation.max_time() as usize, timeslices);
    }
}
