use cdt_core::{CellId, VertexId};

/// Sorted vertex triple identifying a facet independently of the cells sharing it.
pub(crate) type FacetKey = [VertexId; 3];

/// Converts a [`VertexId`] into its index within the vertex arena.
pub(crate) fn vertex_index(id: VertexId) -> usize {
    id.as_raw() as usize
}

/// Converts a [`CellId`] into its index within the cell arena.
pub(crate) fn cell_index(id: CellId) -> usize {
    id.as_raw() as usize
}

/// Creates a [`VertexId`] from an arena index.
pub(crate) fn make_vertex(index: usize) -> VertexId {
    VertexId::from_raw(index as u64)
}

/// Creates a [`CellId`] from an arena index.
pub(crate) fn make_cell(index: usize) -> CellId {
    CellId::from_raw(index as u64)
}

/// Returns the facet opposite vertex `index`, sorted.
pub(crate) fn facet_key(vertices: &[VertexId; 4], index: usize) -> FacetKey {
    let mut key = [vertices[0]; 3];
    let mut slot = 0;
    for (position, vertex) in vertices.iter().enumerate() {
        if position != index {
            key[slot] = *vertex;
            slot += 1;
        }
    }
    key.sort();
    key
}

/// Returns the vertices of a cell sorted by handle.
pub(crate) fn sorted_cell(vertices: &[VertexId; 4]) -> [VertexId; 4] {
    let mut sorted = *vertices;
    sorted.sort();
    sorted
}

/// Returns true when all four handles differ.
pub(crate) fn all_distinct(vertices: &[VertexId; 4]) -> bool {
    let sorted = sorted_cell(vertices);
    sorted.windows(2).all(|pair| pair[0] != pair[1])
}
