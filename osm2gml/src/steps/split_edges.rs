use abstutil::Timer;
use geom::{Distance, Line};

use crate::{Edge, FixedPoint, NodeID, SpatialGrid, TemporaryMap};

// Collinear overlaps are detected with this much slack
const COLLINEAR_TOLERANCE: Distance = Distance::const_meters(0.001);
// Sine of the angle between two edges below which they're treated as parallel
const PARALLEL_SINE: f64 = 1e-6;

/// Make the map planar: wherever two edges cross, overlap, or nearly touch, split them at a
/// shared node so every polygon using them walks through it. Repeats until a full pass finds
/// nothing to split.
pub fn split_intersecting_edges(map: &mut TemporaryMap, timer: &mut Timer) -> FixedPoint {
    let cap = map.config.max_split_edge_passes;
    let mut changed = false;
    for pass in 1..=cap {
        let splits = split_one_pass(map, timer);
        if splits == 0 {
            return FixedPoint {
                changed,
                passes: pass,
                converged: true,
            };
        }
        debug!("Edge splitting pass {} split {} pairs", pass, splits);
        changed = true;
    }
    timer.warn(format!(
        "Edges still intersect after {} splitting passes",
        cap
    ));
    FixedPoint {
        changed,
        passes: cap,
        converged: false,
    }
}

fn split_one_pass(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    let mut grid = SpatialGrid::for_bounds(map.get_bounds(), map.config.grid_divisions);
    let edges: Vec<Edge> = map.all_edges().cloned().collect();
    for e in &edges {
        grid.add(e.id, &e.get_bounds());
    }

    let mut splits = 0;
    timer.start_iter("split intersecting edges", edges.len());
    for e in edges {
        timer.next();
        let candidates = grid.query(&e.get_bounds());
        // Each split removes at least one of the edges involved. Whatever replaces them gets
        // checked in the next pass.
        for other in candidates {
            if other == e.id {
                continue;
            }
            let current = match map.get_edge(e.id) {
                Some(x) => *x,
                None => break,
            };
            let other = match map.get_edge(other) {
                Some(x) => *x,
                None => continue,
            };
            if split_pair(map, current, other) {
                splits += 1;
            }
        }
    }
    splits
}

fn nearly_parallel(l1: &Line, l2: &Line) -> bool {
    let (d1, d2) = (l1.dir(), l2.dir());
    let scale = d1.dot(d1).sqrt() * d2.dot(d2).sqrt();
    scale == 0.0 || (d1.cross(d2) / scale).abs() < PARALLEL_SINE
}

/// Returns true if anything was split.
fn split_pair(map: &mut TemporaryMap, e1: Edge, e2: Edge) -> bool {
    if nearly_parallel(&e1.line, &e2.line) {
        split_overlapping(map, e1, e2)
    } else {
        split_crossing(map, e1, e2)
    }
}

/// Collinear edges that overlap, one containing the other or staggered, get split at each other's
/// endpoints so the shared stretch becomes one edge.
fn split_overlapping(map: &mut TemporaryMap, e1: Edge, e2: Edge) -> bool {
    let inside = |host: &Edge, guest: &Edge| -> Vec<NodeID> {
        let mut nodes: Vec<(f64, NodeID)> = Vec::new();
        for (n, pt) in [(guest.start, guest.line.pt1()), (guest.end, guest.line.pt2())] {
            if !host.has_endpoint(n) && host.line.contains_pt(pt, COLLINEAR_TOLERANCE) {
                nodes.push((host.line.position_of(pt), n));
            }
        }
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
        nodes.into_iter().map(|(_, n)| n).collect()
    };
    let split1 = inside(&e1, &e2);
    let split2 = inside(&e2, &e1);
    if split1.is_empty() && split2.is_empty() {
        return false;
    }
    let mut any = false;
    if !split1.is_empty() {
        any |= !map.split_edge(e1.id, &split1).is_empty();
    }
    if !split2.is_empty() {
        any |= !map.split_edge(e2.id, &split2).is_empty();
    }
    any
}

/// Split crossing edges at their shared point. Edges that stop just short of each other, or poke
/// just past, are treated as touching when the gap is within the nearby threshold.
fn split_crossing(map: &mut TemporaryMap, e1: Edge, e2: Edge) -> bool {
    let threshold = map.config.nearby_threshold;
    let (l1, l2) = (e1.line, e2.line);
    let pt = match l1.intersection(&l2) {
        Some(pt) => pt,
        None => {
            let pt = match l1.infinite_intersection(&l2) {
                Some(pt) => pt,
                None => return false,
            };
            let on_segment = |l: &Line| {
                (0.0..=1.0).contains(&l.position_of(pt)) && l.dist_to_pt(pt) <= threshold
            };
            let near_end =
                |l: &Line| l.pt1().approx_eq(pt, threshold) || l.pt2().approx_eq(pt, threshold);
            if !((near_end(&l1) && on_segment(&l2)) || (near_end(&l2) && on_segment(&l1))) {
                return false;
            }
            pt
        }
    };

    let node = match map.find_node(pt) {
        Some(n) => n,
        None => {
            // Nothing nearby, so neither edge ends here; both will split
            map.node_at(pt)
        }
    };
    let mut any = false;
    for e in [e1, e2] {
        if !e.has_endpoint(node) && map.get_edge(e.id).is_some() {
            any |= !map.split_edge(e.id, &[node]).is_empty();
        }
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConvertConfig, EdgeID, ObjectKind, OsmWayID};
    use geom::Pt2D;

    fn rect(map: &mut TemporaryMap, kind: ObjectKind, x1: f64, y1: f64, x2: f64, y2: f64) {
        map.add_object_from_points(
            kind,
            &[
                Pt2D::new(x1, y1),
                Pt2D::new(x2, y1),
                Pt2D::new(x2, y2),
                Pt2D::new(x1, y2),
            ],
        )
        .unwrap();
    }

    fn orphaned_edges(map: &TemporaryMap) -> Vec<EdgeID> {
        map.all_edges()
            .filter(|e| map.attached_objects(e.id).is_empty())
            .map(|e| e.id)
            .collect()
    }

    fn no_crossings(map: &TemporaryMap) -> bool {
        let edges: Vec<Edge> = map.all_edges().cloned().collect();
        for e1 in &edges {
            for e2 in &edges {
                if e1.id < e2.id && e1.line.crosses(&e2.line, 1e-6) {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn crossing_rectangles_share_nodes() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 20.0, 10.0);
        rect(
            &mut map,
            ObjectKind::Building(OsmWayID(1)),
            10.0,
            5.0,
            30.0,
            30.0,
        );
        assert!(!no_crossings(&map));

        let result = split_intersecting_edges(&mut map, &mut Timer::throwaway());
        assert!(result.changed);
        assert!(result.converged);
        assert!(no_crossings(&map));
        // The two crossing points are now shared nodes
        for pt in [Pt2D::new(20.0, 5.0), Pt2D::new(10.0, 10.0)] {
            let n = map.find_node(pt).unwrap();
            assert!(map.get_node(n).unwrap().pt.approx_eq(pt, Distance::meters(0.001)));
        }
        for obj in map.all_objects() {
            assert_eq!(obj.edges().len(), 6);
        }
        assert!(orphaned_edges(&map).is_empty());
        map.check_invariants().unwrap();
    }

    #[test]
    fn collinear_overlap_is_shared() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        // Two rectangles stacked, the top one shifted so their shared wall only partly overlaps
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 20.0, 10.0);
        rect(&mut map, ObjectKind::Road, 10.0, 10.0, 30.0, 20.0);
        split_intersecting_edges(&mut map, &mut Timer::throwaway());

        let shared: Vec<&Edge> = map
            .all_edges()
            .filter(|e| map.attached_objects(e.id).len() == 2)
            .collect();
        assert_eq!(shared.len(), 1);
        assert!((shared[0].length().inner_meters() - 10.0).abs() < 1e-9);
        map.check_invariants().unwrap();
    }

    #[test]
    fn near_miss_t_junction_snaps() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 40.0, 10.0);
        // A wall ending 0.5m short of the road's top edge
        rect(&mut map, ObjectKind::Road, 15.0, 10.5, 25.0, 30.0);
        split_intersecting_edges(&mut map, &mut Timer::throwaway());

        let bottom_left = map.find_node(Pt2D::new(15.0, 10.5)).unwrap();
        let road = map
            .all_objects()
            .find(|o| o.points().iter().any(|pt| pt.y() == 0.0))
            .unwrap();
        assert!(road.nodes().contains(&bottom_left));
        map.check_invariants().unwrap();
    }

    #[test]
    fn untouched_maps_converge_immediately() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 10.0, 10.0);
        rect(&mut map, ObjectKind::Road, 10.0, 0.0, 20.0, 10.0);
        let result = split_intersecting_edges(&mut map, &mut Timer::throwaway());
        assert!(!result.changed);
        assert_eq!(result.passes, 1);
    }
}
