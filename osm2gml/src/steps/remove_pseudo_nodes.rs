use abstutil::Timer;

use crate::{FixedPoint, OsmGraph, OsmNodeID, TemporaryMap};

/// An intersection joining exactly two roads that continue in a nearly straight line is just a
/// bend in one road. Replace both roads with one spanning the far ends, until there's nothing
/// left to remove.
pub fn remove_pseudo_nodes(map: &mut TemporaryMap, timer: &mut Timer) -> FixedPoint {
    let tolerance = map.config.pseudo_node_angle_tolerance.to_degrees();
    let cap = map.config.max_pseudo_node_passes;
    let mut changed = false;
    for pass in 1..=cap {
        let removed = remove_one_pass(&mut map.osm, tolerance);
        if removed == 0 {
            return FixedPoint {
                changed,
                passes: pass,
                converged: true,
            };
        }
        debug!("Pseudo-node pass {} removed {}", pass, removed);
        changed = true;
    }
    timer.warn(format!(
        "Still removing pseudo-nodes after {} passes; giving up",
        cap
    ));
    FixedPoint {
        changed,
        passes: cap,
        converged: false,
    }
}

fn remove_one_pass(osm: &mut OsmGraph, tolerance: f64) -> usize {
    let mut removed = 0;
    let ids: Vec<OsmNodeID> = osm.intersections.keys().cloned().collect();
    for id in ids {
        let (r1, r2) = match osm.intersections.get(&id) {
            Some(i) if i.roads.len() == 2 => {
                let roads = osm.connected_roads(id);
                if roads.len() != 2 {
                    continue;
                }
                (osm.roads[&roads[0]].clone(), osm.roads[&roads[1]].clone())
            }
            _ => continue,
        };
        let far1 = r1.other_end(id);
        let far2 = r2.other_end(id);
        if far1 == far2 {
            continue;
        }
        let (center, pt1, pt2) = match (osm.location(id), osm.location(far1), osm.location(far2))
        {
            (Some(c), Some(p1), Some(p2)) => (c, p1, p2),
            _ => continue,
        };
        let between = center.angle_to(pt1).degrees_between(center.angle_to(pt2));
        if (180.0 - between).abs() >= tolerance {
            continue;
        }

        osm.remove_intersection(id);
        // Keep the orientation of the first road
        let (src, dst) = if r1.dst == id { (far1, far2) } else { (far2, far1) };
        osm.add_road(r1.way, src, dst);
        removed += 1;
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConvertConfig, OsmWayID};
    use geom::{Angle, Pt2D};

    fn graph(pts: &[(i64, f64, f64)], roads: &[(i64, i64)]) -> TemporaryMap {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        for (id, x, y) in pts {
            map.osm.add_intersection(OsmNodeID(*id), Pt2D::new(*x, *y));
        }
        for (src, dst) in roads {
            map.osm
                .add_road(OsmWayID(1), OsmNodeID(*src), OsmNodeID(*dst))
                .unwrap();
        }
        map
    }

    #[test]
    fn straight_chain_collapses() {
        let mut map = graph(
            &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 20.0, 0.0)],
            &[(1, 2), (2, 3)],
        );
        let result = remove_pseudo_nodes(&mut map, &mut Timer::throwaway());
        assert!(result.changed);
        assert!(result.converged);
        assert_eq!(map.osm.intersections.len(), 2);
        assert!(!map.osm.intersections.contains_key(&OsmNodeID(2)));
        let road = map.osm.roads.values().next().unwrap();
        assert_eq!((road.src, road.dst), (OsmNodeID(1), OsmNodeID(3)));
    }

    #[test]
    fn wiggly_chains_collapse() {
        let pts: Vec<(i64, f64, f64)> = (0..10)
            .map(|i| (i, 10.0 * i as f64, 0.3 * (i % 2) as f64))
            .collect();
        let roads: Vec<(i64, i64)> = (0..9).map(|i| (i, i + 1)).collect();
        let mut map = graph(&pts, &roads);
        let result = remove_pseudo_nodes(&mut map, &mut Timer::throwaway());
        assert!(result.converged);
        assert_eq!(map.osm.intersections.len(), 2);
        assert_eq!(map.osm.roads.len(), 1);
        for i in map.osm.intersections.values() {
            assert_eq!(i.roads.len(), 1);
        }
    }

    #[test]
    fn corners_and_junctions_stay() {
        // An L-bend and a T-junction
        let mut map = graph(
            &[
                (1, 0.0, 0.0),
                (2, 10.0, 0.0),
                (3, 10.0, 10.0),
                (4, 20.0, 0.0),
            ],
            &[(1, 2), (2, 3), (2, 4)],
        );
        let result = remove_pseudo_nodes(&mut map, &mut Timer::throwaway());
        assert!(!result.changed);
        assert_eq!(result.passes, 1);
        assert_eq!(map.osm.intersections.len(), 4);

        let mut map = graph(
            &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 10.0, 10.0)],
            &[(1, 2), (2, 3)],
        );
        assert!(!remove_pseudo_nodes(&mut map, &mut Timer::throwaway()).changed);
    }

    #[test]
    fn pass_cap_is_respected() {
        let mut map = graph(
            &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 20.0, 0.0)],
            &[(1, 2), (2, 3)],
        );
        map.config.max_pseudo_node_passes = 1;
        map.config.pseudo_node_angle_tolerance = Angle::degrees(10.0);
        let result = remove_pseudo_nodes(&mut map, &mut Timer::throwaway());
        assert!(result.changed);
        assert!(!result.converged);
        assert_eq!(result.passes, 1);
    }
}
