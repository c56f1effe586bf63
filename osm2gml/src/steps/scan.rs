use std::collections::BTreeSet;

use abstutil::Timer;
use geom::EPSILON_DIST;

use crate::{ConvertConfig, OsmBuilding, OsmNodeID, RawOsm, TemporaryMap};

/// Build the coarse street graph from the parsed input. Every node used by a road becomes an
/// intersection, and each consecutive pair of nodes becomes one straight road. Ways with unknown
/// or degenerate geometry are logged and skipped.
pub fn scan(raw: &RawOsm, config: ConvertConfig, timer: &mut Timer) -> TemporaryMap {
    let mut map = TemporaryMap::new(config);
    map.gps_bounds = raw.gps_bounds.clone();

    let mut seen_pairs: BTreeSet<(OsmNodeID, OsmNodeID)> = BTreeSet::new();
    timer.start_iter("scan road ways", raw.roads.len());
    for way in &raw.roads {
        timer.next();
        let (pts, missing) = raw.resolve(way);
        if missing > 0 {
            warn!("{} refers to {} unknown nodes", way.id, missing);
        }
        if pts.len() < 2 {
            warn!("Skipping {}, which has fewer than 2 known nodes", way.id);
            continue;
        }
        for pair in pts.windows(2) {
            let ((id1, pt1), (id2, pt2)) = (pair[0], pair[1]);
            if id1 == id2 || pt1.dist_to(pt2) < EPSILON_DIST {
                warn!("Skipping a zero-length segment of {} at {}", way.id, id1);
                continue;
            }
            // Overlapping ways shouldn't produce the same road twice
            let key = if id1 < id2 { (id1, id2) } else { (id2, id1) };
            if !seen_pairs.insert(key) {
                continue;
            }
            map.osm.add_intersection(id1, pt1);
            map.osm.add_intersection(id2, pt2);
            map.osm.add_road(way.id, id1, id2);
        }
    }

    timer.start_iter("scan building ways", raw.buildings.len());
    for way in &raw.buildings {
        timer.next();
        let (pts, missing) = raw.resolve(way);
        if missing > 0 {
            warn!("{} refers to {} unknown nodes", way.id, missing);
        }
        let mut ids: Vec<OsmNodeID> = pts.iter().map(|(id, _)| *id).collect();
        ids.dedup();
        while ids.len() > 1 && ids.first() == ids.last() {
            ids.pop();
        }
        if ids.len() < 3 {
            warn!("Skipping {}, which has fewer than 3 distinct nodes", way.id);
            continue;
        }
        let pts = ids.into_iter().map(|id| raw.nodes[&id]).collect();
        map.osm.buildings.push(OsmBuilding { id: way.id, pts });
    }

    info!(
        "Scanned {} intersections, {} roads, {} buildings",
        map.osm.intersections.len(),
        map.osm.roads.len(),
        map.osm.buildings.len()
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OsmWayID;

    #[test]
    fn ways_become_segments() {
        let mut raw = RawOsm::new();
        raw.add_node(1, 0.0, 0.0);
        raw.add_node(2, 50.0, 0.0);
        raw.add_node(3, 100.0, 0.0);
        raw.add_node(4, 100.0, 0.0);
        raw.add_road(10, vec![1, 2, 3]);
        // Repeats 2-3, then a zero-length hop, then an unknown node
        raw.add_road(11, vec![3, 2, 2, 99]);
        // Zero length between distinct nodes
        raw.add_road(12, vec![3, 4]);

        raw.add_node(20, 0.0, 20.0);
        raw.add_node(21, 10.0, 20.0);
        raw.add_node(22, 10.0, 30.0);
        raw.add_building(30, vec![20, 21, 22, 20]);
        raw.add_building(31, vec![20, 21, 20]);

        let map = scan(&raw, ConvertConfig::default(), &mut Timer::throwaway());
        assert_eq!(map.osm.roads.len(), 2);
        assert_eq!(map.osm.intersections.len(), 3);
        assert_eq!(map.osm.connected_roads(OsmNodeID(2)).len(), 2);
        assert_eq!(map.osm.buildings.len(), 1);
        assert_eq!(map.osm.buildings[0].id, OsmWayID(30));
        assert_eq!(map.osm.buildings[0].pts.len(), 3);
    }
}
