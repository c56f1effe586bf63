use std::collections::{BTreeSet, VecDeque};

use abstutil::Timer;
use geom::{Line, Pt2D, Ring};

use super::faces::{points, signed_area};
use crate::{DirectedEdge, EdgeID, ObjectID, TemporaryMap};

// Segments touching within this fraction of their length don't count as crossing
const CROSSING_EPSILON: f64 = 1e-6;

/// Somebody entering a polygon through any shared edge should be able to walk straight to its
/// centroid without crossing a wall. Polygons where that fails are split along diagonals from
/// concave vertices, preferring splits that leave the fewest concave vertices behind. Returns the
/// number of polygons split.
pub fn ensure_traversability(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    let cap = map.config.max_traversability_splits;
    let ids: Vec<ObjectID> = map
        .all_objects()
        .filter(|o| o.edges().len() >= 4)
        .map(|o| o.id)
        .collect();

    let mut replacements = Vec::new();
    timer.start_iter("ensure traversability", ids.len());
    for id in ids {
        timer.next();
        let (kind, edges) = match map.get_object(id) {
            Some(obj) => (obj.kind, obj.edges().clone()),
            None => continue,
        };
        // Diagonals created while splitting this polygon are passable between the halves
        let mut diagonals: BTreeSet<EdgeID> = BTreeSet::new();
        if is_traversable(map, id, &edges, &diagonals) {
            continue;
        }

        let mut queue = VecDeque::from([edges]);
        let mut results = Vec::new();
        let mut splits = 0;
        while let Some(edges) = queue.pop_front() {
            if is_traversable(map, id, &edges, &diagonals) {
                results.push(edges);
                continue;
            }
            if splits >= cap {
                // Keep what's left as it is
                results.push(edges);
                continue;
            }
            match best_split(map, &edges) {
                Some((half1, half2, diagonal)) => {
                    splits += 1;
                    diagonals.insert(diagonal);
                    queue.push_back(half1);
                    queue.push_back(half2);
                }
                None => results.push(edges),
            }
        }
        if splits >= cap && results.iter().any(|e| !is_traversable(map, id, e, &diagonals)) {
            timer.warn(format!(
                "{} ({}) still isn't traversable after {} splits",
                id, kind, cap
            ));
        }
        if results.len() > 1 {
            replacements.push((id, kind, results));
        }
    }

    let split = replacements.len();
    for (id, kind, pieces) in replacements {
        map.remove_object(id);
        for edges in pieces {
            map.add_object(kind, edges);
        }
    }
    if split > 0 {
        map.resynchronize();
    }
    split
}

/// Every segment from the centroid to the middle of a passable edge stays clear of impassable
/// edges. An edge is passable if some other polygon uses it, or it's one of `diagonals`.
fn is_traversable(
    map: &TemporaryMap,
    id: ObjectID,
    edges: &[DirectedEdge],
    diagonals: &BTreeSet<EdgeID>,
) -> bool {
    if edges.len() < 4 {
        return true;
    }
    let centroid = match Ring::new(points(edges)) {
        Ok(ring) => ring.centroid(),
        Err(_) => return true,
    };
    let passable = |d: &DirectedEdge| {
        diagonals.contains(&d.id()) || map.attached_objects(d.id()).iter().any(|o| *o != id)
    };
    let walls: Vec<Line> = edges
        .iter()
        .filter(|d| !passable(d))
        .map(|d| d.line())
        .collect();
    edges.iter().filter(|d| passable(d)).all(|d| {
        let sight = Line::new(centroid, d.line().middle());
        !walls.iter().any(|w| w.crosses(&sight, CROSSING_EPSILON))
    })
}

/// Concave vertices of a polygon wound as `orientation` says, ignoring near-straight ones.
fn concave_vertices(pts: &[Pt2D], orientation: f64, tolerance: f64) -> Vec<usize> {
    let n = pts.len();
    (0..n)
        .filter(|i| {
            let prev = pts[(i + n - 1) % n];
            let next = pts[(i + 1) % n];
            let turn = (pts[*i] - prev).cross(next - pts[*i]);
            turn * orientation < -tolerance
        })
        .collect()
}

fn polygon_area(pts: &[Pt2D]) -> f64 {
    let n = pts.len();
    let mut sum = 0.0;
    for i in 0..n {
        sum += pts[i].x() * pts[(i + 1) % n].y() - pts[(i + 1) % n].x() * pts[i].y();
    }
    sum / 2.0
}

/// Pick the diagonal from a concave vertex that stays inside the polygon and leaves the fewest
/// concave vertices in the two halves. Returns both halves and the new diagonal edge.
fn best_split(
    map: &mut TemporaryMap,
    edges: &[DirectedEdge],
) -> Option<(Vec<DirectedEdge>, Vec<DirectedEdge>, EdgeID)> {
    let n = edges.len();
    let pts = points(edges);
    let total = signed_area(edges);
    let orientation = total.signum();
    let threshold = map.config.nearby_threshold.inner_meters();
    let tolerance = threshold * threshold;
    let concave = concave_vertices(&pts, orientation, tolerance);
    if concave.is_empty() {
        return None;
    }
    let lines: Vec<Line> = edges.iter().map(|d| d.line()).collect();
    let ring = Ring::new(pts.clone()).ok()?;

    let mut best: Option<(usize, usize, usize)> = None;
    for i in &concave {
        let i = *i;
        for j in 0..n {
            if j == i || j == (i + 1) % n || j == (i + n - 1) % n {
                continue;
            }
            if edges[i].start_node() == edges[j].start_node() {
                continue;
            }
            let diagonal = Line::new(pts[i], pts[j]);
            if lines.iter().any(|l| l.crosses(&diagonal, CROSSING_EPSILON))
                || !ring.contains_pt(diagonal.middle())
            {
                continue;
            }
            let half1 = cycle(&pts, i, j);
            let half2 = cycle(&pts, j, i);
            let (a1, a2) = (polygon_area(&half1), polygon_area(&half2));
            if a1.abs() < tolerance || a2.abs() < tolerance {
                continue;
            }
            if (a1.abs() + a2.abs() - total.abs()).abs() > tolerance {
                continue;
            }
            let remaining = concave_vertices(&half1, orientation, tolerance).len()
                + concave_vertices(&half2, orientation, tolerance).len();
            if remaining < concave.len() && best.map(|(c, _, _)| remaining < c).unwrap_or(true) {
                best = Some((remaining, i, j));
            }
        }
    }

    let (_, i, j) = best?;
    let forwards = map
        .directed_edge(edges[j].start_node(), edges[i].start_node())
        .ok()?;
    let mut half1: Vec<DirectedEdge> = walk(edges, i, j);
    half1.push(forwards);
    let mut half2: Vec<DirectedEdge> = walk(edges, j, i);
    half2.push(forwards.reversed());
    Some((half1, half2, forwards.id()))
}

/// Vertices from `from` to `to` inclusive, wrapping around.
fn cycle(pts: &[Pt2D], from: usize, to: usize) -> Vec<Pt2D> {
    let n = pts.len();
    let mut result = vec![pts[from]];
    let mut i = from;
    while i != to {
        i = (i + 1) % n;
        result.push(pts[i]);
    }
    result
}

/// The edges leading from vertex `from` to vertex `to`, wrapping around.
fn walk(edges: &[DirectedEdge], from: usize, to: usize) -> Vec<DirectedEdge> {
    let n = edges.len();
    let mut result = Vec::new();
    let mut i = from;
    while i != to {
        result.push(edges[i]);
        i = (i + 1) % n;
    }
    result
}
