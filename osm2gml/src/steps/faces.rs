//! Planar face tracing, shared by the passes that have to turn a tangled boundary back into
//! simple polygons.

use std::collections::BTreeSet;

use geom::{Polygon, Pt2D, EPSILON_AREA};

use crate::{DirectedEdge, NodeID, TemporaryMap};

pub struct TracedLoops {
    pub loops: Vec<Vec<DirectedEdge>>,
    /// Walks that hit a dead end
    pub abandoned: usize,
}

/// True if no node is visited twice.
pub fn is_simple(edges: &[DirectedEdge]) -> bool {
    let mut seen = BTreeSet::new();
    edges.iter().all(|d| seen.insert(d.start_node()))
}

/// Split a closed walk into simple loops. Starting from an unused edge, keep taking the sharpest
/// left turn among the walk's unused edges touching the current node, until getting back to the
/// start node. For a counter-clockwise walk, this traces the faces inside it. Turning back along
/// the same edge is the last resort, and the resulting spikes are trimmed. Loops enclosing no
/// area are dropped; the rest come back counter-clockwise.
pub fn trace_loops(edges: &[DirectedEdge]) -> TracedLoops {
    let mut remaining: Vec<DirectedEdge> = edges.to_vec();
    let mut loops = Vec::new();
    let mut abandoned = 0;

    while !remaining.is_empty() {
        let first = remaining.remove(0);
        let origin = first.start_node();
        let mut walk = vec![first];

        let closed = loop {
            let current = walk[walk.len() - 1];
            if current.end_node() == origin {
                break true;
            }
            if walk.len() > edges.len() {
                break false;
            }
            match sharpest_left_turn(current, &remaining) {
                Some((idx, next)) => {
                    remaining.remove(idx);
                    walk.push(next);
                }
                None => break false,
            }
        };

        if !closed {
            abandoned += 1;
            continue;
        }
        let walk = trim_spikes(walk);
        if walk.len() < 3 {
            continue;
        }
        let area = signed_area(&walk);
        if area.abs() < EPSILON_AREA {
            continue;
        }
        if area < 0.0 {
            loops.push(walk.into_iter().rev().map(|d| d.reversed()).collect());
        } else {
            loops.push(walk);
        }
    }

    TracedLoops { loops, abandoned }
}

fn sharpest_left_turn(
    current: DirectedEdge,
    remaining: &[DirectedEdge],
) -> Option<(usize, DirectedEdge)> {
    let node: NodeID = current.end_node();
    let incoming = current.line().angle();
    let mut best: Option<(f64, usize, DirectedEdge)> = None;
    for (idx, d) in remaining.iter().enumerate() {
        let next = match DirectedEdge::starting_at(*d.edge(), node) {
            Some(next) => next,
            None => continue,
        };
        let turn = if next.id() == current.id() {
            -180.0
        } else {
            incoming.shortest_rotation_towards(next.line().angle())
        };
        if best.map(|(t, _, _)| turn > t).unwrap_or(true) {
            best = Some((turn, idx, next));
        }
    }
    best.map(|(_, idx, next)| (idx, next))
}

/// Remove every place the walk immediately doubles back along the same edge.
fn trim_spikes(mut walk: Vec<DirectedEdge>) -> Vec<DirectedEdge> {
    loop {
        let n = walk.len();
        if n < 2 {
            return walk;
        }
        let spike = (0..n).find(|i| walk[*i].id() == walk[(i + 1) % n].id());
        match spike {
            Some(i) => {
                let j = (i + 1) % n;
                // Remove the later index first
                walk.remove(i.max(j));
                walk.remove(i.min(j));
            }
            None => return walk,
        }
    }
}

pub fn signed_area(edges: &[DirectedEdge]) -> f64 {
    let mut sum = 0.0;
    for d in edges {
        let (a, b) = (d.start_pt(), d.end_pt());
        sum += a.x() * b.y() - b.x() * a.y();
    }
    sum / 2.0
}

/// The vertices of a walk, without repeating the first.
pub fn points(edges: &[DirectedEdge]) -> Vec<Pt2D> {
    edges.iter().map(|d| d.start_pt()).collect()
}

/// Turn the result of a boolean operation back into loops of canonical edges. Holes are ignored;
/// exteriors that pinch together after snapping are traced into separate loops.
pub fn decompose_region(map: &mut TemporaryMap, region: &[Polygon]) -> Vec<Vec<DirectedEdge>> {
    let mut result = Vec::new();
    for piece in region {
        let edges = match map.edges_for_points(piece.exterior().points()) {
            Ok(edges) => edges,
            Err(err) => {
                debug!("Dropping a sliver of a region: {}", err);
                continue;
            }
        };
        if is_simple(&edges) {
            result.push(edges);
        } else {
            let traced = trace_loops(&edges);
            if traced.abandoned > 0 {
                warn!(
                    "Abandoned {} boundary walks while decomposing a region",
                    traced.abandoned
                );
            }
            result.extend(traced.loops);
        }
    }
    result
}
