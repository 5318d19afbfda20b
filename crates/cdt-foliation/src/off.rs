use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cdt_core::errors::{CdtError, ErrorInfo};
use cdt_core::{CausalVertex, TimeValue, Triangulation, VertexId};
use cdt_tds::Tds3;
use chrono::Local;
use tracing::info;

use crate::errors::{io_error, triangulation_error, ContextExt};
use crate::manifold::Manifold3;

static OFF_WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Standard file name for a foliated sphere:
/// `S3-<timeslices>-<simplices>-I<radius>-R<spacing>-<YYYY-MM-DD.HH:MM:SS>.off`.
pub fn make_filename(
    timeslices: usize,
    simplices: usize,
    initial_radius: f64,
    foliation_spacing: f64,
) -> String {
    format!(
        "S3-{timeslices}-{simplices}-I{initial_radius}-R{foliation_spacing}-{}.off",
        Local::now().format("%Y-%m-%d.%H:%M:%S")
    )
}

/// Renders the manifold in OFF layout, each vertex line carrying its time value.
pub fn to_off_string(manifold: &Manifold3) -> Result<String, CdtError> {
    let tds = manifold.tds();
    let mut index: BTreeMap<VertexId, usize> = BTreeMap::new();
    let mut out = format!("OFF\n{} {} 0\n", tds.number_of_vertices(), tds.number_of_cells());
    for (position, vertex) in tds.vertices().enumerate() {
        let [x, y, z] = tds.point(vertex)?;
        out.push_str(&format!("{x} {y} {z} {}\n", tds.time_value(vertex)?));
        index.insert(vertex, position);
    }
    for cell in tds.cells() {
        let mut line = String::from("4");
        for corner in tds.cell_vertices(cell)? {
            let position = index.get(&corner).ok_or_else(|| {
                triangulation_error("unknown-vertex", "cell references a dead vertex")
                    .with_context("vertex", corner.as_raw())
            })?;
            line.push_str(&format!(" {position}"));
        }
        line.push('\n');
        out.push_str(&line);
    }
    Ok(out)
}

/// Writes the manifold to `path`.
///
/// Writers are serialized by a process-wide lock and the content lands via a
/// temporary file and a rename, so readers never observe a partial file.
pub fn write_off(manifold: &Manifold3, path: &Path) -> Result<(), CdtError> {
    let contents = to_off_string(manifold)?;
    let _guard = OFF_WRITE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| io_error("off-mkdir", err, parent))?;
    }
    let staging = staging_path(path);
    fs::write(&staging, contents).map_err(|err| io_error("off-write", err, &staging))?;
    fs::rename(&staging, path).map_err(|err| io_error("off-rename", err, path))?;
    info!(path = %path.display(), cells = manifold.n3(), "wrote triangulation");
    Ok(())
}

/// Restores an engine from an OFF file written by [`write_off`].
pub fn read_off(path: &Path) -> Result<Tds3, CdtError> {
    let contents = fs::read_to_string(path).map_err(|err| io_error("off-read", err, path))?;
    parse_off(&contents).map_err(|err| err.with_context("path", path.display()))
}

/// Parses OFF text produced by [`to_off_string`].
pub fn parse_off(contents: &str) -> Result<Tds3, CdtError> {
    let mut lines = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));
    match lines.next() {
        Some("OFF") => {}
        _ => return Err(off_error("missing-header", "file does not start with OFF")),
    }
    let counts = numbers::<usize>(lines.next(), "counts")?;
    let &[vertex_count, cell_count, ..] = counts.as_slice() else {
        return Err(off_error("bad-counts", "count line needs vertex and cell counts"));
    };

    let mut vertices = Vec::with_capacity(vertex_count);
    for row in 0..vertex_count {
        let fields: Vec<&str> = lines
            .next()
            .ok_or_else(|| off_error("truncated", "missing vertex line").with_context("row", row))?
            .split_whitespace()
            .collect();
        let [x, y, z, t] = fields[..] else {
            return Err(off_error("bad-vertex", "vertex line needs x y z t").with_context("row", row));
        };
        let coordinate = |field: &str| {
            field.parse::<f64>().map_err(|err| {
                off_error("bad-vertex", &err.to_string()).with_context("row", row)
            })
        };
        let time = t.parse::<TimeValue>().map_err(|err| {
            off_error("bad-vertex", &err.to_string()).with_context("row", row)
        })?;
        vertices.push(CausalVertex::new(
            [coordinate(x)?, coordinate(y)?, coordinate(z)?],
            time,
        ));
    }

    let mut cells = Vec::with_capacity(cell_count);
    for row in 0..cell_count {
        let fields = numbers::<usize>(lines.next(), "cell")?;
        let &[4, a, b, c, d] = fields.as_slice() else {
            return Err(off_error("bad-cell", "cell line needs 4 and four indices").with_context("row", row));
        };
        cells.push([a, b, c, d]);
    }
    Tds3::from_cells(&vertices, &cells)
}

fn numbers<T: std::str::FromStr>(line: Option<&str>, what: &str) -> Result<Vec<T>, CdtError> {
    let line = line.ok_or_else(|| off_error("truncated", "file ended early").with_context("expected", what))?;
    line.split_whitespace()
        .map(|field| {
            field
                .parse::<T>()
                .map_err(|_| off_error("bad-number", "field is not a number").with_context("field", field))
        })
        .collect()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn off_error(code: &str, message: &str) -> CdtError {
    CdtError::Serde(ErrorInfo::new(code, message))
}
