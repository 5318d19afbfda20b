use std::collections::BTreeSet;

use cdt_core::errors::CdtError;
use cdt_core::{norm, CellId, Edge, RngHandle, TimeValue, Triangulation, VertexId};
use cdt_foliation::{classify_edge, expected_cell_type, CellType, EdgeClass, Manifold3};
use cdt_tds::FlipDryRun;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{move_error, ContextExt};
use crate::moves::{Move, MoveDelta};

/// Result of attempting a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// A candidate was rewritten.
    Applied,
    /// No candidate in the move's collection could be rewritten.
    Inapplicable {
        /// Why the collection was exhausted.
        reason: String,
    },
}

impl MoveOutcome {
    /// Returns true for [`MoveOutcome::Applied`].
    pub fn is_applied(&self) -> bool {
        matches!(self, MoveOutcome::Applied)
    }
}

/// Attempts `mv` on `manifold`, trying each candidate at most once in a
/// shuffled order.
///
/// On [`MoveOutcome::Applied`] the engine has been mutated but the
/// classification and counts are stale until [`Manifold3::update`] runs.
/// Use [`crate::apply_move`] for the checked, rollback-safe variant.
pub fn make_move(
    manifold: &mut Manifold3,
    mv: Move,
    rng: &mut RngHandle,
) -> Result<MoveOutcome, CdtError> {
    match mv {
        Move::TwoThree => do_23_move(manifold, rng),
        Move::ThreeTwo => do_32_move(manifold, rng),
        Move::TwoSix => do_26_move(manifold, rng),
        Move::SixTwo => do_62_move(manifold, rng),
        Move::FourFour => do_44_move(manifold, rng),
    }
}

/// Flips a facet of a random (2,2) cell into a timelike edge.
pub fn do_23_move(manifold: &mut Manifold3, rng: &mut RngHandle) -> Result<MoveOutcome, CdtError> {
    let mut candidates = manifold.triangulation().two_two().to_vec();
    candidates.shuffle(rng);
    for cell in candidates {
        for facet in 0..4 {
            let dry_run = manifold.tds().flip_facet_dry_run(cell, facet);
            if admissible(manifold, &dry_run, Move::TwoThree)? {
                manifold.tds_mut().apply_dry_run(&dry_run)?;
                debug!(cell = cell.as_raw(), facet, "applied (2,3)");
                return Ok(MoveOutcome::Applied);
            }
        }
    }
    Ok(inapplicable("no (2,2) cell has a flippable facet"))
}

/// Removes a random timelike edge of degree three.
pub fn do_32_move(manifold: &mut Manifold3, rng: &mut RngHandle) -> Result<MoveOutcome, CdtError> {
    let mut candidates = manifold.triangulation().timelike_edges().to_vec();
    candidates.shuffle(rng);
    for edge in candidates {
        let dry_run = manifold.tds().flip_edge_dry_run(edge);
        if admissible(manifold, &dry_run, Move::ThreeTwo)? {
            manifold.tds_mut().apply_dry_run(&dry_run)?;
            debug!(
                first = edge.first().as_raw(),
                second = edge.second().as_raw(),
                "applied (3,2)"
            );
            return Ok(MoveOutcome::Applied);
        }
    }
    Ok(inapplicable("no timelike edge can be flipped"))
}

/// Inserts a vertex into the spacelike facet shared by a random (1,3) cell
/// and a (3,1) neighbour.
pub fn do_26_move(manifold: &mut Manifold3, rng: &mut RngHandle) -> Result<MoveOutcome, CdtError> {
    let mut candidates = manifold.triangulation().one_three().to_vec();
    candidates.shuffle(rng);
    for cell in candidates {
        for facet in 0..4 {
            let Some(time) = splittable_facet(manifold, cell, facet)? else {
                continue;
            };
            let radius = manifold.triangulation().expected_radius(time);
            let tds = manifold.tds_mut();
            let vertex = tds.insert_in_facet(cell, facet)?;
            tds.set_time_value(vertex, time)?;
            let point = tds.point(vertex)?;
            let length = norm(&point);
            if length > 0.0 {
                let scale = radius / length;
                tds.set_point(vertex, [point[0] * scale, point[1] * scale, point[2] * scale])?;
            }
            verify_six_star(manifold, vertex)?;
            debug!(cell = cell.as_raw(), vertex = vertex.as_raw(), time, "applied (2,6)");
            return Ok(MoveOutcome::Applied);
        }
    }
    Ok(inapplicable("no (1,3) cell shares a spacelike facet with a (3,1) cell"))
}

/// Removes a random vertex whose star is three (3,1) over three (1,3) cells.
pub fn do_62_move(manifold: &mut Manifold3, rng: &mut RngHandle) -> Result<MoveOutcome, CdtError> {
    let mut candidates = manifold.triangulation().vertices().to_vec();
    candidates.shuffle(rng);
    for vertex in candidates {
        if !has_six_star(manifold, vertex)? {
            continue;
        }
        let dry_run = manifold.tds().remove_vertex_dry_run(vertex);
        if admissible(manifold, &dry_run, Move::SixTwo)? {
            manifold.tds_mut().remove_vertex(vertex)?;
            debug!(vertex = vertex.as_raw(), "applied (6,2)");
            return Ok(MoveOutcome::Applied);
        }
    }
    Ok(inapplicable("no vertex has a removable six-cell star"))
}

/// Replaces a random spacelike edge of degree four by the opposite link diagonal.
pub fn do_44_move(manifold: &mut Manifold3, rng: &mut RngHandle) -> Result<MoveOutcome, CdtError> {
    let mut candidates = manifold.triangulation().spacelike_edges().to_vec();
    candidates.shuffle(rng);
    for edge in candidates {
        if manifold.edge_cells(edge)?.len() != 4 {
            continue;
        }
        for diagonal in 0..2 {
            let dry_run = manifold.tds().flip_44_dry_run(edge, diagonal);
            if admissible(manifold, &dry_run, Move::FourFour)? {
                manifold.tds_mut().apply_dry_run(&dry_run)?;
                debug!(
                    first = edge.first().as_raw(),
                    second = edge.second().as_raw(),
                    diagonal,
                    "applied (4,4)"
                );
                return Ok(MoveOutcome::Applied);
            }
        }
    }
    Ok(inapplicable("no spacelike edge of degree four can be swapped"))
}

fn inapplicable(reason: &str) -> MoveOutcome {
    MoveOutcome::Inapplicable {
        reason: reason.to_string(),
    }
}

/// True when the dry run is valid and its predicted local delta matches the table.
fn admissible(manifold: &Manifold3, dry_run: &FlipDryRun, mv: Move) -> Result<bool, CdtError> {
    match dry_run {
        FlipDryRun::Valid { removed, created } => {
            let predicted = predicted_delta(manifold, removed, created)?;
            if predicted != Some(mv.expected_delta()) {
                debug!(mv = mv.as_str(), ?predicted, "candidate changes the wrong counts");
                return Ok(false);
            }
            Ok(true)
        }
        FlipDryRun::Invalid(err) => {
            debug!(mv = mv.as_str(), code = %err.info().code, "candidate rejected by the engine");
            Ok(false)
        }
    }
}

/// Count changes caused by replacing `removed` with `created`, or `None`
/// if a created cell would break the foliation.
///
/// Only the rewritten ball is inspected: an edge or facet that appears on
/// one side only is interior to the ball and therefore gained or lost
/// globally.
pub fn predicted_delta(
    manifold: &Manifold3,
    removed: &[CellId],
    created: &[[VertexId; 4]],
) -> Result<Option<MoveDelta>, CdtError> {
    let triangulation = manifold.triangulation();
    let tds = manifold.tds();
    let mut delta = MoveDelta {
        n3: created.len() as i64 - removed.len() as i64,
        ..MoveDelta::default()
    };
    let mut before = Footprint::default();
    let mut after = Footprint::default();

    for &cell in removed {
        match triangulation.cell_type(cell)? {
            CellType::TwoTwo => delta.n3_22 -= 1,
            CellType::ThreeOne | CellType::OneThree => delta.n3_31_13 -= 1,
        }
        before.add(&tds.cell_vertices(cell)?);
    }
    for cell in created {
        let times = [
            tds.time_value(cell[0])?,
            tds.time_value(cell[1])?,
            tds.time_value(cell[2])?,
            tds.time_value(cell[3])?,
        ];
        match expected_cell_type(times) {
            Some(CellType::TwoTwo) => delta.n3_22 += 1,
            Some(CellType::ThreeOne | CellType::OneThree) => delta.n3_31_13 += 1,
            None => return Ok(None),
        }
        after.add(cell);
    }

    for edge in after.edges.difference(&before.edges) {
        match edge_class(manifold, *edge)? {
            EdgeClass::Timelike => delta.n1_tl += 1,
            EdgeClass::Spacelike => delta.n1_sl += 1,
        }
    }
    for edge in before.edges.difference(&after.edges) {
        match edge_class(manifold, *edge)? {
            EdgeClass::Timelike => delta.n1_tl -= 1,
            EdgeClass::Spacelike => delta.n1_sl -= 1,
        }
    }
    delta.n1 = delta.n1_tl + delta.n1_sl;
    delta.n2 = after.facets.len() as i64 - before.facets.len() as i64;
    delta.n0 = after.vertices.len() as i64 - before.vertices.len() as i64;
    Ok(Some(delta))
}

#[derive(Default)]
struct Footprint {
    vertices: BTreeSet<VertexId>,
    edges: BTreeSet<Edge>,
    facets: BTreeSet<[VertexId; 3]>,
}

impl Footprint {
    fn add(&mut self, cell: &[VertexId; 4]) {
        self.vertices.extend(cell.iter().copied());
        for a in 0..4 {
            for b in (a + 1)..4 {
                self.edges.insert(Edge::new(cell[a], cell[b]));
            }
            let mut facet = [cell[0]; 3];
            let mut slot = 0;
            for (position, vertex) in cell.iter().enumerate() {
                if position != a {
                    facet[slot] = *vertex;
                    slot += 1;
                }
            }
            facet.sort();
            self.facets.insert(facet);
        }
    }
}

fn edge_class(manifold: &Manifold3, edge: Edge) -> Result<EdgeClass, CdtError> {
    let tds = manifold.tds();
    Ok(classify_edge(
        tds.time_value(edge.first())?,
        tds.time_value(edge.second())?,
    ))
}

/// Time value of the facet of `cell` opposite `facet` if it can host a (2,6) move.
fn splittable_facet(
    manifold: &Manifold3,
    cell: CellId,
    facet: usize,
) -> Result<Option<TimeValue>, CdtError> {
    let tds = manifold.tds();
    let Some(neighbor) = tds.neighbor(cell, facet)? else {
        return Ok(None);
    };
    if manifold.triangulation().cell_type(neighbor)? != CellType::ThreeOne {
        return Ok(None);
    }
    let vertices = tds.cell_vertices(cell)?;
    let mut times = Vec::with_capacity(3);
    for (position, vertex) in vertices.iter().enumerate() {
        if position != facet {
            times.push(tds.time_value(*vertex)?);
        }
    }
    if times.windows(2).any(|pair| pair[0] != pair[1]) {
        debug!(
            cell = cell.as_raw(),
            facet,
            ?times,
            "shared facet is not spacelike"
        );
        return Ok(None);
    }
    let time = times[0];
    let below = tds.time_value(vertices[facet])?;
    let mirror = tds.mirror_index(cell, facet)?.ok_or_else(|| {
        move_error("broken-adjacency", "neighbour does not share the facet")
            .with_context("cell", cell.as_raw())
    })?;
    let above = tds.time_value(tds.cell_vertices(neighbor)?[mirror])?;
    if below != time - 1 || above != time + 1 {
        debug!(cell = cell.as_raw(), below, above, time, "apexes are not on adjacent slices");
        return Ok(None);
    }
    Ok(Some(time))
}

fn verify_six_star(manifold: &Manifold3, vertex: VertexId) -> Result<(), CdtError> {
    let tds = manifold.tds();
    let cells = tds.incident_cells(vertex)?;
    if cells.len() != 6 {
        return Err(move_error("star-size", "new vertex is not surrounded by six cells")
            .with_context("vertex", vertex.as_raw())
            .with_context("cells", cells.len()));
    }
    for cell in cells {
        let corners = tds.cell_vertices(cell)?;
        let times = [
            tds.time_value(corners[0])?,
            tds.time_value(corners[1])?,
            tds.time_value(corners[2])?,
            tds.time_value(corners[3])?,
        ];
        if expected_cell_type(times).is_none() {
            return Err(move_error("invalid-cell", "new cell does not span one timeslice")
                .with_context("cell", cell.as_raw()));
        }
    }
    Ok(())
}

/// True when `vertex` has exactly six incident cells split 3/0/3 by type.
fn has_six_star(manifold: &Manifold3, vertex: VertexId) -> Result<bool, CdtError> {
    let cells = manifold.incident_cells(vertex)?;
    if cells.len() != 6 {
        return Ok(false);
    }
    let mut counts = [0usize; 3];
    for cell in cells {
        match manifold.triangulation().cell_type(cell)? {
            CellType::ThreeOne => counts[0] += 1,
            CellType::TwoTwo => counts[1] += 1,
            CellType::OneThree => counts[2] += 1,
        }
    }
    Ok(counts == [3, 0, 3])
}
