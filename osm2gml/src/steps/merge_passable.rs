use std::collections::{BTreeSet, VecDeque};

use abstutil::Timer;
use geom::Polygon;

use super::faces::decompose_region;
use crate::{ObjectID, ObjectKind, SpatialGrid, TemporaryMap};

/// Roads and intersections that still overlap each other are fused: each group of overlapping
/// passable polygons is replaced by the simple pieces of its union. The result is an intersection
/// if any member was one, otherwise a road. Returns the number of groups merged.
pub fn merge_passable_shapes(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    let mut ids = Vec::new();
    let mut polygons = Vec::new();
    let mut grid = SpatialGrid::for_bounds(map.get_bounds(), map.config.grid_divisions);
    for obj in map.all_passable() {
        match obj.polygon() {
            Ok(poly) => {
                grid.add(ids.len(), &poly.get_bounds());
                ids.push(obj.id);
                polygons.push(poly);
            }
            Err(err) => warn!("{} ({}) has no valid polygon: {}", obj.id, obj.kind, err),
        }
    }

    let mut visited: BTreeSet<usize> = BTreeSet::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    timer.start_iter("find overlapping passable shapes", ids.len());
    for start in 0..ids.len() {
        timer.next();
        if !visited.insert(start) {
            continue;
        }
        let mut group = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(idx) = queue.pop_front() {
            for other in grid.query(&polygons[idx].get_bounds()) {
                if visited.contains(&other) || !polygons[idx].overlaps(&polygons[other]) {
                    continue;
                }
                visited.insert(other);
                group.push(other);
                queue.push_back(other);
            }
        }
        if group.len() > 1 {
            groups.push(group);
        }
    }

    let mut merged = 0;
    for group in groups {
        let members: Vec<ObjectID> = group.iter().map(|idx| ids[*idx]).collect();
        let kind = if members.iter().any(|id| {
            map.get_object(*id)
                .map(|o| o.kind == ObjectKind::Intersection)
                .unwrap_or(false)
        }) {
            ObjectKind::Intersection
        } else {
            ObjectKind::Road
        };
        let union = Polygon::union_all(group.iter().map(|idx| polygons[*idx].clone()).collect());
        let loops = decompose_region(map, &union);
        if loops.is_empty() {
            warn!("Couldn't merge overlapping {:?}; keeping them", members);
            continue;
        }
        debug!("Merging {:?} into {} pieces", members, loops.len());
        for id in members {
            map.remove_object(id);
        }
        for edges in loops {
            map.add_object(kind, edges);
        }
        merged += 1;
    }
    if merged > 0 {
        map.resynchronize();
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConvertConfig;
    use geom::Pt2D;

    fn rect(
        map: &mut TemporaryMap,
        kind: ObjectKind,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> ObjectID {
        map.add_object_from_points(
            kind,
            &[
                Pt2D::new(x1, y1),
                Pt2D::new(x2, y1),
                Pt2D::new(x2, y2),
                Pt2D::new(x1, y2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn overlapping_roads_become_one_intersection() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 20.0, 10.0);
        rect(&mut map, ObjectKind::Intersection, 10.0, 0.0, 30.0, 10.0);
        // Only touches, so it's left alone
        let neighbour = rect(&mut map, ObjectKind::Road, 30.0, 0.0, 50.0, 10.0);

        assert_eq!(merge_passable_shapes(&mut map, &mut Timer::throwaway()), 1);
        assert_eq!(map.num_objects(), 2);
        assert!(map.get_object(neighbour).is_some());
        let merged = map.intersections();
        assert_eq!(merged.len(), 1);
        assert!((merged[0].area() - 300.0).abs() < 1e-6);
        assert!(merged[0].ring().unwrap().is_ccw());
        map.check_invariants().unwrap();
    }

    #[test]
    fn overlapping_roads_stay_roads() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 20.0, 10.0);
        rect(&mut map, ObjectKind::Road, 5.0, 5.0, 25.0, 15.0);
        assert_eq!(merge_passable_shapes(&mut map, &mut Timer::throwaway()), 1);
        let roads = map.roads();
        assert_eq!(roads.len(), 1);
        assert!((roads[0].area() - 350.0).abs() < 1e-6);
        assert!(map.intersections().is_empty());
    }

    #[test]
    fn buildings_are_ignored() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 20.0, 10.0);
        rect(&mut map, ObjectKind::Building(crate::OsmWayID(1)), 5.0, 5.0, 25.0, 15.0);
        assert_eq!(merge_passable_shapes(&mut map, &mut Timer::throwaway()), 0);
        assert_eq!(map.num_objects(), 2);
    }
}
