use abstutil::Timer;

use crate::{ObjectKind, TemporaryMap};

/// Turn the coarse graph into polygons: intersection areas first, then road footprints, then
/// building outlines. Points snap to existing nodes, so neighbouring shapes share edges from the
/// start. Shapes that collapse below three nodes are skipped.
pub fn create_objects(map: &mut TemporaryMap, timer: &mut Timer) {
    let mut shapes = Vec::new();
    for i in map.osm.intersections.values() {
        if let Some(ref pts) = i.area {
            shapes.push((ObjectKind::Intersection, format!("{}", i.id), pts.clone()));
        }
    }
    for road in map.osm.roads.values() {
        match road.corners() {
            Some(pts) => shapes.push((ObjectKind::Road, format!("{}", road.id), pts)),
            None => warn!("{} of {} has no footprint", road.id, road.way),
        }
    }
    for b in &map.osm.buildings {
        shapes.push((ObjectKind::Building(b.id), format!("{}", b.id), b.pts.clone()));
    }

    timer.start_iter("create polygons", shapes.len());
    for (kind, label, pts) in shapes {
        timer.next();
        if let Err(err) = map.add_object_from_points(kind, &pts) {
            warn!("Skipping {} ({}): {}", label, kind, err);
        }
    }
}
