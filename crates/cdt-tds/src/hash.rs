use cdt_core::errors::CdtError;
use cdt_core::{TimeValue, Triangulation};
use sha2::{Digest, Sha256};

use crate::tds::Tds3;

type VertexLabel = (TimeValue, [u64; 3]);

/// Computes a structural hash that does not depend on handle numbering.
///
/// Each vertex is labelled by its time value and the bit pattern of its
/// point; each cell by its sorted vertex labels. The sorted cell list is
/// digested with SHA-256.
pub fn canonical_hash(tds: &Tds3) -> Result<String, CdtError> {
    let mut cells: Vec<[VertexLabel; 4]> = Vec::with_capacity(tds.number_of_cells());
    for cell in tds.cells() {
        let vertices = tds.cell_vertices(cell)?;
        let mut labels = [(0, [0u64; 3]); 4];
        for (slot, vertex) in vertices.iter().enumerate() {
            let point = tds.point(*vertex)?;
            labels[slot] = (tds.time_value(*vertex)?, point.map(f64::to_bits));
        }
        labels.sort();
        cells.push(labels);
    }
    cells.sort();

    let mut hasher = Sha256::new();
    hasher.update((tds.number_of_vertices() as u64).to_le_bytes());
    hasher.update((cells.len() as u64).to_le_bytes());
    for labels in cells {
        for (time, bits) in labels {
            hasher.update(time.to_le_bytes());
            for word in bits {
                hasher.update(word.to_le_bytes());
            }
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}
