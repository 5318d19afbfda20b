use cdt_core::errors::{CdtError, ErrorInfo};
use cdt_core::provenance::SchemaVersion;
use cdt_core::{CellId, Point3, TimeValue, VertexId};
use serde::{Deserialize, Serialize};

use crate::tds::{tds_error, CellRecord, ContextExt, Tds3, VertexRecord};

const SCHEMA: SchemaVersion = SchemaVersion::new(1, 1, 0);

/// Serializes the triangulation to a compact binary representation using `bincode`.
pub fn tds_to_bytes(tds: &Tds3) -> Result<Vec<u8>, CdtError> {
    let serializable = SerializableTds::from_tds(tds);
    bincode::serialize(&serializable)
        .map_err(|err| CdtError::Serde(ErrorInfo::new("serialize-bytes", err.to_string())))
}

/// Restores a triangulation from its binary representation.
pub fn tds_from_bytes(bytes: &[u8]) -> Result<Tds3, CdtError> {
    let serializable: SerializableTds = bincode::deserialize(bytes)
        .map_err(|err| CdtError::Serde(ErrorInfo::new("deserialize-bytes", err.to_string())))?;
    serializable.into_tds()
}

/// Serializes the triangulation to a JSON string.
pub fn tds_to_json(tds: &Tds3) -> Result<String, CdtError> {
    let serializable = SerializableTds::from_tds(tds);
    serde_json::to_string(&serializable)
        .map_err(|err| CdtError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
}

/// Restores a triangulation from a JSON string.
pub fn tds_from_json(json: &str) -> Result<Tds3, CdtError> {
    let serializable: SerializableTds = serde_json::from_str(json)
        .map_err(|err| CdtError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))?;
    serializable.into_tds()
}

/// Arena image of a triangulation. Dead slots and the free list are kept so
/// that a restored triangulation hands out the same handles as the original.
#[derive(Debug, Serialize, Deserialize)]
struct SerializableTds {
    schema_version: SchemaVersion,
    vertices: Vec<SerializableVertex>,
    cells: Vec<SerializableCell>,
    /// Absent in 1.0 images, where dead vertex slots were never reused.
    #[serde(default)]
    free_vertices: Option<Vec<u64>>,
    free_cells: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializableVertex {
    alive: bool,
    point: Point3,
    time: TimeValue,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializableCell {
    alive: bool,
    vertices: [u64; 4],
}

impl SerializableTds {
    fn from_tds(tds: &Tds3) -> Self {
        Self {
            schema_version: SCHEMA,
            vertices: tds
                .vertices
                .iter()
                .map(|vertex| SerializableVertex {
                    alive: vertex.alive,
                    point: vertex.point,
                    time: vertex.time,
                })
                .collect(),
            cells: tds
                .cells
                .iter()
                .map(|cell| SerializableCell {
                    alive: cell.alive,
                    vertices: cell.vertices.map(|vertex| vertex.as_raw()),
                })
                .collect(),
            free_vertices: Some(tds.free_vertices.iter().map(|&slot| slot as u64).collect()),
            free_cells: tds.free_cells.iter().map(|&slot| slot as u64).collect(),
        }
    }

    fn into_tds(self) -> Result<Tds3, CdtError> {
        if self.schema_version.major != SCHEMA.major {
            return Err(CdtError::Serde(
                ErrorInfo::new("schema-mismatch", "unsupported triangulation schema")
                    .with_context("major", self.schema_version.major),
            ));
        }
        let dead = self.cells.iter().filter(|cell| !cell.alive).count();
        if dead != self.free_cells.len() {
            return Err(tds_error("free-list", "free list does not match dead cells")
                .with_context("dead", dead)
                .with_context("free", self.free_cells.len()));
        }
        let free_vertices: Vec<usize> = match &self.free_vertices {
            Some(slots) => slots.iter().map(|&slot| slot as usize).collect(),
            None => self
                .vertices
                .iter()
                .enumerate()
                .filter(|(_, vertex)| !vertex.alive)
                .map(|(slot, _)| slot)
                .collect(),
        };
        let dead_vertices = self.vertices.iter().filter(|vertex| !vertex.alive).count();
        if dead_vertices != free_vertices.len()
            || free_vertices
                .iter()
                .any(|&slot| self.vertices.get(slot).map_or(true, |vertex| vertex.alive))
        {
            return Err(tds_error("free-list", "free list does not match dead vertices")
                .with_context("dead", dead_vertices)
                .with_context("free", free_vertices.len()));
        }
        let vertex_count = self.vertices.len() as u64;
        let mut tds = Tds3 {
            vertices: self
                .vertices
                .into_iter()
                .map(|vertex| VertexRecord {
                    alive: vertex.alive,
                    point: vertex.point,
                    time: vertex.time,
                    cell: None,
                })
                .collect(),
            cells: Vec::with_capacity(self.cells.len()),
            free_vertices,
            free_cells: self.free_cells.iter().map(|&slot| slot as usize).collect(),
        };
        for (slot, cell) in self.cells.into_iter().enumerate() {
            if let Some(&raw) = cell.vertices.iter().find(|&&raw| raw >= vertex_count) {
                return Err(tds_error("unknown-vertex", "cell references a missing vertex")
                    .with_context("cell", CellId::from_raw(slot as u64).as_raw())
                    .with_context("vertex", raw));
            }
            tds.cells.push(CellRecord {
                alive: cell.alive,
                vertices: cell.vertices.map(VertexId::from_raw),
                neighbors: [None; 4],
            });
        }
        tds.link_all()?;
        Ok(tds)
    }
}
