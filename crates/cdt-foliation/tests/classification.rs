use cdt_core::{CausalVertex, Triangulation};
use cdt_foliation::{
    expected_cell_type, fix_foliation, CellType, FoliatedTriangulation, Manifold3,
};
use cdt_tds::{delaunay_triangulation, Tds3};

fn sample_vertices() -> Vec<CausalVertex> {
    let lift = 2.0 / 3f64.sqrt();
    vec![
        CausalVertex::new([1.0, 0.0, 0.0], 1),
        CausalVertex::new([0.0, 1.0, 0.0], 1),
        CausalVertex::new([0.0, 0.0, 1.0], 1),
        CausalVertex::new([lift, lift, lift], 2),
    ]
}

#[test]
fn single_three_one_cell() {
    let triangulation = FoliatedTriangulation::from_causal_vertices(&sample_vertices()).unwrap();
    assert_eq!(triangulation.three_one().len(), 1);
    assert!(triangulation.two_two().is_empty());
    assert!(triangulation.one_three().is_empty());
    assert_eq!(triangulation.timelike_edges().len(), 3);
    assert_eq!(triangulation.spacelike_edges().len(), 3);
    assert_eq!(triangulation.min_time(), 1);
    assert_eq!(triangulation.max_time(), 2);
    assert!(triangulation.is_correct());
    assert!(triangulation.check_vertices());
}

#[test]
fn foliation_fix_removes_the_stray_vertex() {
    let mut vertices = sample_vertices();
    vertices.push(CausalVertex::new([-2.0, -2.5, -1.5], 3));
    let triangulation = FoliatedTriangulation::from_causal_vertices(&vertices).unwrap();
    assert_eq!(triangulation.vertices().len(), 4);
    assert_eq!(triangulation.three_one().len(), 1);
    assert_eq!(triangulation.max_time(), 2);
    assert!(triangulation.is_foliated());
}

#[test]
fn fix_reports_the_number_of_passes() {
    let mut vertices = sample_vertices();
    vertices.push(CausalVertex::new([-2.0, -2.5, -1.5], 3));
    let mut tds = delaunay_triangulation(&vertices).unwrap();
    assert_eq!(fix_foliation(&mut tds).unwrap(), 1);
    assert_eq!(fix_foliation(&mut tds).unwrap(), 0);
    assert_eq!(tds.number_of_vertices(), 4);
}

#[test]
fn classification_is_idempotent() {
    let manifold = {
        let mut rng = cdt_core::RngHandle::from_seed(8);
        Manifold3::new(200, 3, &mut rng).unwrap()
    };
    let mut triangulation = manifold.triangulation().clone();
    triangulation.rebuild().unwrap();
    assert_eq!(triangulation.three_one(), manifold.triangulation().three_one());
    assert_eq!(triangulation.two_two(), manifold.triangulation().two_two());
    assert_eq!(triangulation.one_three(), manifold.triangulation().one_three());
    assert_eq!(
        triangulation.timelike_edges(),
        manifold.triangulation().timelike_edges()
    );
    assert_eq!(
        triangulation.spacelike_edges(),
        manifold.triangulation().spacelike_edges()
    );
    assert_eq!(triangulation.vertices(), manifold.triangulation().vertices());
}

#[test]
fn cell_types_follow_the_time_split() {
    assert_eq!(expected_cell_type([1, 1, 1, 2]), Some(CellType::ThreeOne));
    assert_eq!(expected_cell_type([2, 1, 2, 1]), Some(CellType::TwoTwo));
    assert_eq!(expected_cell_type([3, 2, 3, 3]), Some(CellType::OneThree));
    assert_eq!(expected_cell_type([1, 1, 1, 1]), None);
    assert_eq!(expected_cell_type([1, 2, 2, 3]), None);
}

#[test]
fn unfoliated_engine_is_rejected() {
    let mut vertices = sample_vertices();
    vertices[3].time = 3;
    let tds = Tds3::from_cells(&vertices, &[[0, 1, 2, 3]]).unwrap();
    let err = FoliatedTriangulation::from_tds(tds).unwrap_err();
    assert_eq!(err.info().code, "invalid-cell");
    assert!(err.is_recoverable());
}

#[test]
fn retimed_vertex_is_caught_by_the_correctness_check() {
    let mut triangulation = FoliatedTriangulation::from_causal_vertices(&sample_vertices()).unwrap();
    let top = triangulation
        .vertices()
        .iter()
        .copied()
        .find(|&vertex| triangulation.time_value(vertex).unwrap() == 2)
        .unwrap();
    triangulation.tds_mut().set_time_value(top, 1).unwrap();
    assert!(!triangulation.is_foliated());
    assert!(!triangulation.is_correct());
    assert!(triangulation.rebuild().is_err());
}
