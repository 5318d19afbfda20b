use cdt_core::{CausalVertex, CdtError, Couplings, Edge, ErrorInfo, VertexId};

#[test]
fn error_roundtrips_through_json() {
    let err = CdtError::Triangulation(ErrorInfo::new("T001", "dangling neighbor").with_context("cell", 3));
    let json = serde_json::to_string(&err).unwrap();
    assert!(json.contains("\"family\":\"Triangulation\""));
    let restored: CdtError = serde_json::from_str(&json).unwrap();
    assert_eq!(err, restored);
}

#[test]
fn edges_are_canonical() {
    let a = VertexId::from_raw(9);
    let b = VertexId::from_raw(2);
    let edge = Edge::new(a, b);
    assert_eq!(edge, Edge::new(b, a));
    assert_eq!(edge.first(), b);
    assert!(edge.contains(a));
}

#[test]
fn couplings_and_vertices_roundtrip() {
    let couplings = Couplings::default();
    let json = serde_json::to_string(&couplings).unwrap();
    assert_eq!(couplings, serde_json::from_str::<Couplings>(&json).unwrap());

    let vertex = CausalVertex::new([3.0, 4.0, 0.0], 2);
    assert!((vertex.radius() - 5.0).abs() < 1e-12);
}
