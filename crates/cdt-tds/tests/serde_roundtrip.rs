use cdt_core::{CausalVertex, Triangulation};
use cdt_tds::{canonical_hash, tds_from_bytes, tds_from_json, tds_to_bytes, tds_to_json, Tds3};

fn sample_tds() -> Tds3 {
    let vertices = [
        CausalVertex::new([0.0, 0.0, 0.0], 1),
        CausalVertex::new([1.0, 0.0, 0.0], 1),
        CausalVertex::new([0.0, 1.0, 0.0], 1),
        CausalVertex::new([0.3, 0.3, 1.0], 2),
        CausalVertex::new([0.3, 0.3, -1.0], 0),
    ];
    let mut tds = Tds3::from_cells(&vertices, &[[0, 1, 2, 3], [0, 1, 2, 4]]).unwrap();
    let cell = tds.cells().next().unwrap();
    let facet = (0..4)
        .find(|&index| tds.neighbor(cell, index).unwrap().is_some())
        .unwrap();
    let inserted = tds.insert_in_facet(cell, facet).unwrap();
    tds.remove_vertex(inserted).unwrap();
    tds
}

#[test]
fn json_roundtrip_preserves_hash_and_handles() {
    let tds = sample_tds();
    let json = tds_to_json(&tds).unwrap();
    let restored = tds_from_json(&json).unwrap();
    assert!(restored.is_valid());
    assert_eq!(canonical_hash(&tds).unwrap(), canonical_hash(&restored).unwrap());
    assert_eq!(tds.cells().collect::<Vec<_>>(), restored.cells().collect::<Vec<_>>());
    assert_eq!(
        tds.vertices().collect::<Vec<_>>(),
        restored.vertices().collect::<Vec<_>>()
    );
}

#[test]
fn restored_arena_hands_out_the_same_slots() {
    let mut original = sample_tds();
    let mut restored = tds_from_bytes(&tds_to_bytes(&original).unwrap()).unwrap();
    let cell = original.cells().next().unwrap();
    let facet = (0..4)
        .find(|&index| original.neighbor(cell, index).unwrap().is_some())
        .unwrap();
    let a = original.insert_in_facet(cell, facet).unwrap();
    let b = restored.insert_in_facet(cell, facet).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        original.cells().collect::<Vec<_>>(),
        restored.cells().collect::<Vec<_>>()
    );
}

#[test]
fn corrupted_payload_is_rejected() {
    let err = tds_from_json("{\"vertices\": 3}").unwrap_err();
    assert_eq!(err.info().code, "deserialize-json");
}

#[test]
fn hash_ignores_handle_numbering() {
    let vertices = [
        CausalVertex::new([0.0, 0.0, 0.0], 1),
        CausalVertex::new([1.0, 0.0, 0.0], 1),
        CausalVertex::new([0.0, 1.0, 0.0], 1),
        CausalVertex::new([0.3, 0.3, 1.0], 2),
    ];
    let reversed: Vec<CausalVertex> = vertices.iter().rev().copied().collect();
    let a = Tds3::from_cells(&vertices, &[[0, 1, 2, 3]]).unwrap();
    let b = Tds3::from_cells(&reversed, &[[3, 2, 1, 0]]).unwrap();
    assert_eq!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
}

#[test]
fn images_without_a_vertex_free_list_are_rebuilt() {
    let mut original = sample_tds();
    let mut image: serde_json::Value =
        serde_json::from_str(&tds_to_json(&original).unwrap()).unwrap();
    image.as_object_mut().unwrap().remove("free_vertices");
    let mut restored = tds_from_json(&image.to_string()).unwrap();
    assert!(restored.is_valid());

    let cell = original.cells().next().unwrap();
    let facet = (0..4)
        .find(|&index| original.neighbor(cell, index).unwrap().is_some())
        .unwrap();
    let a = original.insert_in_facet(cell, facet).unwrap();
    let b = restored.insert_in_facet(cell, facet).unwrap();
    assert_eq!(a, b);
    assert_eq!(original.vertex_capacity(), restored.vertex_capacity());
}
