use std::collections::{BTreeMap, BTreeSet, VecDeque};

use abstutil::Timer;
use geom::{Bounds, Distance, Pt2D};

use crate::{OsmGraph, OsmNodeID, OsmRoadID, SpatialGrid, TemporaryMap};

/// Collapse clusters of intersections that are chained together by short gaps into one synthetic
/// intersection at their average position. Roads inside a cluster disappear. Merging moves
/// intersections, which can bring new ones into range, so this repeats until nothing is left to
/// merge. Returns the number of clusters merged.
pub fn merge_nearby_intersections(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    let dist = map.config.merge_distance;
    let mut total = 0;
    for round in 0..map.config.max_merge_rounds {
        let merged = merge_round(&mut map.osm, dist);
        if merged == 0 {
            return total;
        }
        debug!("Merge round {} collapsed {} clusters", round + 1, merged);
        total += merged;
    }
    if !clusters(&map.osm, dist).is_empty() {
        timer.warn(format!(
            "Intersections within {} of each other remain after {} merge rounds",
            dist, map.config.max_merge_rounds
        ));
    }
    total
}

fn merge_round(osm: &mut OsmGraph, dist: Distance) -> usize {
    let clusters = clusters(osm, dist);
    let mut replacements: BTreeMap<OsmNodeID, OsmNodeID> = BTreeMap::new();
    for cluster in &clusters {
        let pts: Vec<Pt2D> = cluster.iter().filter_map(|i| osm.location(*i)).collect();
        let merged = osm.add_synthetic_intersection(Pt2D::center(&pts));
        for i in cluster {
            replacements.insert(*i, merged);
        }
    }
    if replacements.is_empty() {
        return 0;
    }

    let affected: BTreeSet<OsmRoadID> = replacements
        .keys()
        .flat_map(|i| osm.intersections[i].roads.iter().cloned())
        .collect();
    for r in affected {
        let road = match osm.remove_road(r) {
            Some(road) => road,
            None => continue,
        };
        let src = replacements.get(&road.src).cloned().unwrap_or(road.src);
        let dst = replacements.get(&road.dst).cloned().unwrap_or(road.dst);
        if src == dst {
            continue;
        }
        if osm.add_road(road.way, src, dst).is_none() {
            warn!("Dropping a segment of {} after merging", road.way);
        }
    }
    for i in replacements.keys() {
        osm.remove_intersection(*i);
    }
    clusters.len()
}

/// Groups of at least two intersections, connected by gaps no longer than `dist`.
fn clusters(osm: &OsmGraph, dist: Distance) -> Vec<Vec<OsmNodeID>> {
    if osm.intersections.len() < 2 {
        return Vec::new();
    }
    let pts: Vec<Pt2D> = osm.intersections.values().map(|i| i.pt).collect();
    let mut grid = SpatialGrid::new(Bounds::from(&pts), dist.inner_meters());
    for i in osm.intersections.values() {
        grid.add(i.id, &Bounds::from(&[i.pt]));
    }

    let mut visited: BTreeSet<OsmNodeID> = BTreeSet::new();
    let mut result = Vec::new();
    for start in osm.intersections.keys() {
        if !visited.insert(*start) {
            continue;
        }
        let mut cluster = vec![*start];
        let mut queue = VecDeque::from([*start]);
        while let Some(current) = queue.pop_front() {
            let pt = osm.intersections[&current].pt;
            for other in grid.query(&Bounds::from(&[pt]).expanded(dist)) {
                if visited.contains(&other) || osm.intersections[&other].pt.dist_to(pt) > dist {
                    continue;
                }
                visited.insert(other);
                cluster.push(other);
                queue.push_back(other);
            }
        }
        if cluster.len() > 1 {
            cluster.sort();
            result.push(cluster);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConvertConfig, OsmWayID};

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
    fn close_pair_merges_at_midpoint() {
        let mut map = graph(
            &[(1, 0.0, 0.0), (2, 5.0, 0.0), (3, 100.0, 0.0), (4, -100.0, 0.0)],
            &[(1, 2), (2, 3), (4, 1)],
        );
        assert_eq!(
            merge_nearby_intersections(&mut map, &mut Timer::throwaway()),
            1
        );
        assert_eq!(map.osm.intersections.len(), 3);
        let merged = map
            .osm
            .intersections
            .values()
            .find(|i| i.synthetic)
            .unwrap();
        assert_eq!(merged.pt, Pt2D::new(2.5, 0.0));
        // The short road between them is gone; the others now end at the merged intersection
        assert_eq!(map.osm.roads.len(), 2);
        assert_eq!(merged.roads.len(), 2);
        for road in map.osm.roads.values() {
            assert!(road.src == merged.id || road.dst == merged.id);
        }
    }

    #[test]
    fn chains_merge_transitively() {
        let mut map = graph(
            &[(1, 0.0, 0.0), (2, 8.0, 0.0), (3, 16.0, 0.0), (4, 200.0, 0.0)],
            &[(1, 2), (2, 3), (3, 4)],
        );
        merge_nearby_intersections(&mut map, &mut Timer::throwaway());
        assert_eq!(map.osm.intersections.len(), 2);
        assert_eq!(map.osm.roads.len(), 1);
    }

    #[test]
    fn merged_positions_are_rechecked() {
        // 1 and 2 merge at (5, 0), which is within range of 3 only afterwards
        let mut map = graph(
            &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 5.0, 9.0)],
            &[(1, 3), (2, 3)],
        );
        merge_nearby_intersections(&mut map, &mut Timer::throwaway());
        assert_eq!(map.osm.intersections.len(), 1);
        assert!(map.osm.roads.is_empty());
        let pts: Vec<Pt2D> = map.osm.intersections.values().map(|i| i.pt).collect();
        assert_eq!(pts, vec![Pt2D::new(5.0, 4.5)]);
    }

    #[test]
    fn far_apart_stays_put() {
        let mut map = graph(&[(1, 0.0, 0.0), (2, 50.0, 0.0)], &[(1, 2)]);
        assert_eq!(
            merge_nearby_intersections(&mut map, &mut Timer::throwaway()),
            0
        );
        assert_eq!(map.osm.intersections.len(), 2);
    }
}
