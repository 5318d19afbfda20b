use cdt_core::{CausalVertex, CellId, Edge, Triangulation, VertexId};
use cdt_tds::{canonical_hash, FlipDryRun, Tds3};

/// Two tetrahedra glued along the triangle {0, 1, 2}.
fn sample_bipyramid() -> Tds3 {
    let vertices = [
        CausalVertex::new([0.0, 0.0, 0.0], 1),
        CausalVertex::new([1.0, 0.0, 0.0], 1),
        CausalVertex::new([0.0, 1.0, 0.0], 1),
        CausalVertex::new([0.3, 0.3, 1.0], 2),
        CausalVertex::new([0.3, 0.3, -1.0], 0),
    ];
    Tds3::from_cells(&vertices, &[[0, 1, 2, 3], [0, 1, 2, 4]]).unwrap()
}

fn interior_facet(tds: &Tds3) -> (CellId, usize) {
    for cell in tds.cells() {
        for index in 0..4 {
            if tds.neighbor(cell, index).unwrap().is_some() {
                return (cell, index);
            }
        }
    }
    panic!("fixture has no interior facet");
}

#[test]
fn fixture_is_valid() {
    let tds = sample_bipyramid();
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_vertices(), 5);
    assert_eq!(tds.number_of_cells(), 2);
    assert_eq!(tds.edges().len(), 9);
    assert_eq!(tds.facet_count(), 7);
}

#[test]
fn two_three_then_three_two_restores_the_complex() {
    let mut tds = sample_bipyramid();
    let before = canonical_hash(&tds).unwrap();
    let (cell, index) = interior_facet(&tds);

    assert!(tds.flip_facet(cell, index));
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_cells(), 3);
    let dual = Edge::new(VertexId::from_raw(3), VertexId::from_raw(4));
    assert_eq!(tds.edge_cells(dual).unwrap().len(), 3);
    assert_eq!(tds.edges().len(), 10);

    assert!(tds.flip_edge(dual));
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_cells(), 2);
    assert_eq!(canonical_hash(&tds).unwrap(), before);
}

#[test]
fn facet_flip_is_refused_when_the_dual_edge_exists() {
    let mut tds = sample_bipyramid();
    let (cell, index) = interior_facet(&tds);
    assert!(tds.flip_facet(cell, index));
    for cell in tds.cells().collect::<Vec<_>>() {
        for index in 0..4 {
            if tds.neighbor(cell, index).unwrap().is_some() {
                assert!(!tds.flip_facet_dry_run(cell, index).is_valid());
            }
        }
    }
}

#[test]
fn boundary_facets_cannot_flip() {
    let tds = sample_bipyramid();
    let cell = tds.cells().next().unwrap();
    let boundary = (0..4)
        .find(|&index| tds.is_boundary_facet(cell, index).unwrap())
        .unwrap();
    match tds.flip_facet_dry_run(cell, boundary) {
        FlipDryRun::Invalid(err) => assert_eq!(err.info().code, "boundary-facet"),
        FlipDryRun::Valid { .. } => panic!("boundary facet flip accepted"),
    }
}

#[test]
fn facet_insertion_then_removal_restores_the_complex() {
    let mut tds = sample_bipyramid();
    let before = canonical_hash(&tds).unwrap();
    let (cell, index) = interior_facet(&tds);

    let inserted = tds.insert_in_facet(cell, index).unwrap();
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_cells(), 6);
    assert_eq!(tds.number_of_vertices(), 6);
    assert_eq!(tds.incident_cells(inserted).unwrap().len(), 6);
    assert_eq!(tds.time_value(inserted).unwrap(), 1);

    tds.remove_vertex(inserted).unwrap();
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_cells(), 2);
    assert_eq!(tds.number_of_vertices(), 5);
    assert_eq!(canonical_hash(&tds).unwrap(), before);
}

#[test]
fn freed_cell_slots_are_reused() {
    let mut tds = sample_bipyramid();
    let (cell, index) = interior_facet(&tds);
    let inserted = tds.insert_in_facet(cell, index).unwrap();
    tds.remove_vertex(inserted).unwrap();
    let slots: Vec<u64> = tds.cells().map(|cell| cell.as_raw()).collect();
    assert!(slots.iter().all(|&slot| slot < 6));
}

#[test]
fn boundary_vertex_cannot_be_removed() {
    let mut tds = sample_bipyramid();
    let err = tds.remove_vertex(VertexId::from_raw(3)).unwrap_err();
    assert!(err.is_recoverable());
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_cells(), 2);
}

#[test]
fn replacement_with_a_mismatched_boundary_leaves_the_complex_untouched() {
    let mut tds = sample_bipyramid();
    let before = canonical_hash(&tds).unwrap();
    let cells: Vec<_> = tds.cells().collect();
    let bogus = [[
        VertexId::from_raw(0),
        VertexId::from_raw(1),
        VertexId::from_raw(3),
        VertexId::from_raw(4),
    ]];
    let err = tds.replace_cells(&cells, &bogus).unwrap_err();
    assert_eq!(err.info().code, "boundary-mismatch");
    assert!(tds.is_valid());
    assert_eq!(canonical_hash(&tds).unwrap(), before);
}

/// Four cells around the edge {0, 2}; its link is the cycle 1-4-3-5.
fn sample_octahedron() -> Tds3 {
    let vertices = [
        CausalVertex::new([2.0, 0.0, 0.0], 2),
        CausalVertex::new([0.0, 2.0, 0.0], 2),
        CausalVertex::new([-2.0, 0.0, 0.0], 2),
        CausalVertex::new([0.0, -2.0, 0.0], 2),
        CausalVertex::new([0.0, 0.0, 3.0], 3),
        CausalVertex::new([0.0, 0.0, 1.0], 1),
    ];
    let cells = [[0, 2, 1, 4], [0, 2, 3, 4], [0, 2, 1, 5], [0, 2, 3, 5]];
    Tds3::from_cells(&vertices, &cells).unwrap()
}

#[test]
fn four_four_flip_swaps_the_central_edge() {
    let mut tds = sample_octahedron();
    let axis = Edge::new(VertexId::from_raw(0), VertexId::from_raw(2));
    let diagonal = Edge::new(VertexId::from_raw(1), VertexId::from_raw(3));

    assert!(tds.flip_44(axis, 0));
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_cells(), 4);
    assert!(!tds.has_edge(axis.first(), axis.second()).unwrap());
    assert_eq!(tds.edge_cells(diagonal).unwrap().len(), 4);

    assert!(!tds.flip_44(diagonal, 7));
    assert!(tds.flip_44(diagonal, 0));
    assert!(tds.has_edge(axis.first(), axis.second()).unwrap());
    assert!(tds.is_valid());
}

#[test]
fn four_four_flip_needs_four_incident_cells() {
    let mut tds = sample_bipyramid();
    let before = canonical_hash(&tds).unwrap();
    let edge = Edge::new(VertexId::from_raw(0), VertexId::from_raw(1));
    assert!(!tds.flip_44(edge, 0));
    assert_eq!(canonical_hash(&tds).unwrap(), before);
}

#[test]
fn freed_vertex_slots_are_reused() {
    let mut tds = sample_bipyramid();
    let (cell, index) = interior_facet(&tds);
    let first = tds.insert_in_facet(cell, index).unwrap();
    tds.remove_vertex(first).unwrap();
    assert_eq!(tds.vertex_capacity(), 6);

    for _ in 0..5 {
        let (cell, index) = interior_facet(&tds);
        let again = tds.insert_in_facet(cell, index).unwrap();
        assert_eq!(again, first);
        tds.remove_vertex(again).unwrap();
    }
    assert_eq!(tds.vertex_capacity(), 6);
    assert_eq!(tds.number_of_vertices(), 5);
    assert!(tds.is_valid());
}

#[test]
fn check_validity_names_the_violation() {
    let tds = sample_bipyramid();
    assert!(tds.check_validity().is_ok());

    let vertices = [
        CausalVertex::new([0.0, 0.0, 0.0], 1),
        CausalVertex::new([1.0, 0.0, 0.0], 1),
        CausalVertex::new([0.0, 1.0, 0.0], 1),
        CausalVertex::new([0.0, 0.0, 1.0], 2),
        CausalVertex::new([5.0, 5.0, 5.0], 2),
    ];
    let lonely = Tds3::from_cells(&vertices, &[[0, 1, 2, 3]]).unwrap();
    let err = lonely.check_validity().unwrap_err();
    assert_eq!(err.info().code, "isolated-vertex");
    assert!(!lonely.is_valid());
}
