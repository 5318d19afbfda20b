use std::collections::BTreeSet;

use cdt_core::{CausalVertex, Edge, RngHandle, Triangulation, VertexId};
use cdt_foliation::{FoliatedTriangulation, Manifold3};
use cdt_mcmc::{apply_move, check_move, make_move, Move, MoveDelta, MoveOutcome};
use cdt_tds::{canonical_hash, Tds3};

fn small_universe(seed: u64) -> Manifold3 {
    let mut rng = RngHandle::from_seed(seed);
    Manifold3::new(60, 3, &mut rng).unwrap()
}

/// Square x, y, z, w on slice 2 with apexes on slices 1 and 3, split along x–z.
fn octahedron() -> Manifold3 {
    let vertices = [
        CausalVertex::new([2.0, 0.0, 0.0], 2),
        CausalVertex::new([0.0, 2.0, 0.0], 2),
        CausalVertex::new([-2.0, 0.0, 0.0], 2),
        CausalVertex::new([0.0, -2.0, 0.0], 2),
        CausalVertex::new([0.0, 0.0, 3.0], 3),
        CausalVertex::new([0.0, 0.0, 1.0], 1),
    ];
    let cells = [[0, 2, 1, 4], [0, 2, 3, 4], [0, 2, 1, 5], [0, 2, 3, 5]];
    let tds = Tds3::from_cells(&vertices, &cells).unwrap();
    Manifold3::from_triangulation(FoliatedTriangulation::from_tds(tds).unwrap())
}

#[test]
fn delta_table_satisfies_euler_relation() {
    for mv in Move::ALL {
        let delta = mv.expected_delta();
        assert_eq!(delta.n0 - delta.n1 + delta.n2 - delta.n3, 0, "{mv}");
        assert_eq!(delta.n1, delta.n1_tl + delta.n1_sl, "{mv}");
        assert_eq!(delta.n3, delta.n3_31_13 + delta.n3_22, "{mv}");
    }
    assert_eq!(
        Move::TwoThree.expected_delta().inverse(),
        Move::ThreeTwo.expected_delta()
    );
    assert_eq!(
        Move::TwoSix.expected_delta().inverse(),
        Move::SixTwo.expected_delta()
    );
    assert_eq!(Move::FourFour.expected_delta(), MoveDelta::default());
}

#[test]
fn two_three_then_three_two_keep_exact_counts() {
    let mut manifold = small_universe(5);
    let mut rng = RngHandle::from_seed(1);

    let before = *manifold.geometry();
    let outcome = apply_move(&mut manifold, Move::TwoThree, &mut rng).unwrap();
    assert_eq!(outcome, MoveOutcome::Applied);
    let after = *manifold.geometry();
    assert!(check_move(&before, &after, Move::TwoThree));
    assert_eq!(after.n3_22, before.n3_22 + 1);
    assert_eq!(after.n1_tl, before.n1_tl + 1);
    assert_eq!(after.n3_31_13, before.n3_31_13);
    assert_eq!(after.n0, before.n0);
    assert!(manifold.is_correct());

    let outcome = apply_move(&mut manifold, Move::ThreeTwo, &mut rng).unwrap();
    assert_eq!(outcome, MoveOutcome::Applied);
    assert!(check_move(&after, manifold.geometry(), Move::ThreeTwo));
    assert_eq!(*manifold.geometry(), before);
    assert!(manifold.is_correct());
}

#[test]
fn two_six_then_removal_restores_the_triangulation() {
    let mut manifold = small_universe(3);
    let before = *manifold.geometry();
    let before_hash = canonical_hash(manifold.tds()).unwrap();
    let known: BTreeSet<VertexId> = manifold.triangulation().vertices().iter().copied().collect();

    let mut rng = RngHandle::from_seed(11);
    let outcome = apply_move(&mut manifold, Move::TwoSix, &mut rng).unwrap();
    assert_eq!(outcome, MoveOutcome::Applied);
    assert!(check_move(&before, manifold.geometry(), Move::TwoSix));
    assert!(manifold.is_correct());
    assert!(manifold.triangulation().check_vertices());

    let inserted = manifold
        .triangulation()
        .vertices()
        .iter()
        .copied()
        .find(|vertex| !known.contains(vertex))
        .unwrap();
    assert_eq!(manifold.incident_cells(inserted).unwrap().len(), 6);

    manifold.tds_mut().remove_vertex(inserted).unwrap();
    manifold.update().unwrap();
    assert_eq!(*manifold.geometry(), before);
    assert_eq!(canonical_hash(manifold.tds()).unwrap(), before_hash);
}

#[test]
fn six_two_undoes_two_six_counts() {
    let mut manifold = small_universe(9);
    let before = *manifold.geometry();
    let mut rng = RngHandle::from_seed(2);
    assert!(apply_move(&mut manifold, Move::TwoSix, &mut rng)
        .unwrap()
        .is_applied());
    let middle = *manifold.geometry();
    assert!(apply_move(&mut manifold, Move::SixTwo, &mut rng)
        .unwrap()
        .is_applied());
    assert!(check_move(&middle, manifold.geometry(), Move::SixTwo));
    assert_eq!(*manifold.geometry(), before);
    assert!(manifold.is_correct());
}

#[test]
fn four_four_swaps_the_spacelike_diagonal() {
    let mut manifold = octahedron();
    assert!(manifold.is_correct());
    let before = *manifold.geometry();
    let before_hash = canonical_hash(manifold.tds()).unwrap();
    let (y, w) = (VertexId::from_raw(1), VertexId::from_raw(3));
    assert!(!manifold.tds().has_edge(y, w).unwrap());

    let mut rng = RngHandle::from_seed(4);
    let outcome = apply_move(&mut manifold, Move::FourFour, &mut rng).unwrap();
    assert_eq!(outcome, MoveOutcome::Applied);
    assert_eq!(*manifold.geometry(), before);
    assert_ne!(canonical_hash(manifold.tds()).unwrap(), before_hash);
    assert!(manifold.tds().has_edge(y, w).unwrap());
    assert!(!manifold
        .tds()
        .has_edge(VertexId::from_raw(0), VertexId::from_raw(2))
        .unwrap());
    assert_eq!(
        manifold.edge_cells(Edge::new(y, w)).unwrap().len(),
        4
    );
}

#[test]
fn inapplicable_moves_leave_the_manifold_untouched() {
    let mut manifold = octahedron();
    let before_hash = canonical_hash(manifold.tds()).unwrap();
    let mut rng = RngHandle::from_seed(6);
    for mv in [Move::TwoThree, Move::ThreeTwo, Move::SixTwo] {
        let outcome = apply_move(&mut manifold, mv, &mut rng).unwrap();
        assert!(
            matches!(outcome, MoveOutcome::Inapplicable { .. }),
            "{mv} applied on the octahedron"
        );
        assert_eq!(canonical_hash(manifold.tds()).unwrap(), before_hash);
    }
}

#[test]
fn two_six_splits_the_octahedron_equator() {
    let mut manifold = octahedron();
    let before = *manifold.geometry();
    let mut rng = RngHandle::from_seed(8);
    let outcome = apply_move(&mut manifold, Move::TwoSix, &mut rng).unwrap();
    assert_eq!(outcome, MoveOutcome::Applied);
    assert!(check_move(&before, manifold.geometry(), Move::TwoSix));
    assert_eq!(manifold.n0(), 7);
    assert_eq!(manifold.n3(), 8);
}

#[test]
fn two_six_needs_three_timeslices() {
    let mut rng = RngHandle::from_seed(12);
    let mut manifold = Manifold3::new(2, 2, &mut rng).unwrap();
    let before_hash = canonical_hash(manifold.tds()).unwrap();
    let outcome = make_move(&mut manifold, Move::TwoSix, &mut rng).unwrap();
    assert!(!outcome.is_applied());
    assert_eq!(canonical_hash(manifold.tds()).unwrap(), before_hash);
}

#[test]
fn cells_stay_foliated_after_many_moves() {
    let mut manifold = small_universe(21);
    let mut rng = RngHandle::from_seed(99);
    let mut applied = 0;
    for step in 0..40 {
        let mv = Move::ALL[step % Move::ALL.len()];
        let before = *manifold.geometry();
        if apply_move(&mut manifold, mv, &mut rng).unwrap().is_applied() {
            applied += 1;
            assert!(check_move(&before, manifold.geometry(), mv), "{mv}");
        } else {
            assert_eq!(*manifold.geometry(), before);
        }
        assert!(manifold.is_correct(), "step {step}");
    }
    assert!(applied > 0);
    let tds = manifold.tds();
    for cell in tds.cells() {
        let times: BTreeSet<_> = tds
            .cell_vertices(cell)
            .unwrap()
            .iter()
            .map(|&vertex| tds.time_value(vertex).unwrap())
            .collect();
        assert_eq!(times.len(), 2);
    }
}

#[test]
fn failed_postconditions_leave_the_manifold_untouched() {
    let mut manifold = small_universe(23);
    let retimed = manifold.tds().vertices().next().unwrap();
    // Cached classification now disagrees with the vertex times.
    manifold.tds_mut().set_time_value(retimed, 9).unwrap();
    let hash = canonical_hash(manifold.tds()).unwrap();
    let geometry = *manifold.geometry();

    let mut errors = 0;
    for mv in [Move::TwoThree, Move::ThreeTwo, Move::TwoSix, Move::FourFour] {
        let mut rng = RngHandle::from_seed(5);
        match apply_move(&mut manifold, mv, &mut rng) {
            Ok(MoveOutcome::Applied) => panic!("{mv} committed over a broken foliation"),
            Ok(MoveOutcome::Inapplicable { .. }) => {}
            Err(_) => errors += 1,
        }
        assert_eq!(canonical_hash(manifold.tds()).unwrap(), hash, "{mv}");
        assert_eq!(*manifold.geometry(), geometry, "{mv}");
        assert_eq!(manifold.tds().time_value(retimed).unwrap(), 9);
    }
    assert!(errors > 0);
}
