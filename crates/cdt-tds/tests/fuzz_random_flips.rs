use cdt_core::{CausalVertex, CellId, RngHandle, Triangulation};
use cdt_tds::{canonical_hash, tds_from_bytes, tds_to_bytes, Tds3};
use proptest::prelude::*;

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

fn interior_facets(tds: &Tds3) -> Vec<(CellId, usize)> {
    let mut facets = Vec::new();
    for cell in tds.cells() {
        for index in 0..4 {
            if tds.neighbor(cell, index).unwrap().is_some() {
                facets.push((cell, index));
            }
        }
    }
    facets
}

proptest! {
    #[test]
    fn random_rewrites_preserve_validity(seed in any::<u64>(), steps in 1usize..24) {
        let mut rng = RngHandle::from_seed(seed);
        let mut tds = sample_bipyramid();
        for _ in 0..steps {
            let facets = interior_facets(&tds);
            let (cell, index) = facets[rng.index(facets.len())];
            match rng.index(3) {
                0 => {
                    tds.insert_in_facet(cell, index).unwrap();
                }
                1 => {
                    tds.flip_facet(cell, index);
                }
                _ => {
                    let edges = tds.edges();
                    let edge = edges[rng.index(edges.len())];
                    tds.flip_edge(edge);
                }
            }
            prop_assert!(tds.is_valid());
        }

        let bytes = tds_to_bytes(&tds).unwrap();
        let restored = tds_from_bytes(&bytes).unwrap();
        prop_assert!(restored.is_valid());
        prop_assert_eq!(canonical_hash(&tds).unwrap(), canonical_hash(&restored).unwrap());
    }
}
