use cdt_core::{CausalVertex, Triangulation};
use cdt_tds::{delaunay_triangulation, Tds3};

fn sample_points() -> Vec<CausalVertex> {
    vec![
        CausalVertex::new([0.0, 0.0, 0.0], 1),
        CausalVertex::new([1.0, 0.0, 0.0], 1),
        CausalVertex::new([0.0, 1.0, 0.0], 1),
        CausalVertex::new([0.3, 0.3, 1.0], 2),
        CausalVertex::new([0.3, 0.3, -1.0], 0),
    ]
}

#[test]
fn four_points_make_one_cell() {
    let tds = delaunay_triangulation(&sample_points()[..4]).unwrap();
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_cells(), 1);
    assert_eq!(tds.number_of_vertices(), 4);
}

#[test]
fn time_values_survive_triangulation() {
    let tds = delaunay_triangulation(&sample_points()).unwrap();
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_vertices(), 5);
    assert!((2..=3).contains(&tds.number_of_cells()));
    let mut times: Vec<i32> = tds
        .vertices()
        .map(|vertex| tds.time_value(vertex).unwrap())
        .collect();
    times.sort();
    assert_eq!(times, vec![0, 1, 1, 1, 2]);
}

#[test]
fn duplicates_are_skipped() {
    let mut points = sample_points();
    points.push(points[0]);
    let tds = delaunay_triangulation(&points).unwrap();
    assert_eq!(tds.number_of_vertices(), 5);
}

#[test]
fn too_few_points_are_rejected() {
    let err = delaunay_triangulation(&sample_points()[..3]).unwrap_err();
    assert_eq!(err.info().code, "too-few-points");
}

#[test]
fn coplanar_points_are_rejected() {
    let points = [
        CausalVertex::new([0.0, 0.0, 0.0], 1),
        CausalVertex::new([1.0, 0.0, 0.0], 1),
        CausalVertex::new([0.0, 1.0, 0.0], 1),
        CausalVertex::new([2.0, 2.0, 0.0], 1),
    ];
    assert!(delaunay_triangulation(&points).is_err());
}

#[test]
fn insert_and_remove_vertices_rebuild_the_complex() {
    let mut tds = Tds3::new();
    tds.insert(&sample_points()[..4]).unwrap();
    assert_eq!(tds.number_of_cells(), 1);
    tds.insert(&sample_points()[4..]).unwrap();
    assert_eq!(tds.number_of_vertices(), 5);

    let far = tds
        .vertices()
        .find(|&vertex| tds.time_value(vertex).unwrap() == 0)
        .unwrap();
    tds.remove_vertices(&[far]).unwrap();
    assert!(tds.is_valid());
    assert_eq!(tds.number_of_vertices(), 4);
    assert_eq!(tds.number_of_cells(), 1);
}
