use abstutil::{skip_fail, Timer};
use geom::Polygon;

use super::faces::decompose_region;
use crate::{ObjectID, ObjectKind, SpatialGrid, TemporaryMap};

/// Roads and intersections give way to buildings: cut every overlapping building out of each
/// passable polygon, and replace the polygon with whatever simple pieces remain. A polygon that a
/// building swallows completely is left alone. Returns the number of polygons replaced.
pub fn clean_building_overlaps(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    let mut grid = SpatialGrid::for_bounds(map.get_bounds(), map.config.grid_divisions);
    let mut buildings = Vec::new();
    for b in map.buildings() {
        match b.polygon() {
            Ok(poly) => {
                grid.add(buildings.len(), &b.get_bounds());
                buildings.push((b.id, poly));
            }
            Err(err) => warn!("{} ({}) has no valid polygon: {}", b.id, b.kind, err),
        }
    }

    let passable: Vec<ObjectID> = map.all_passable().iter().map(|o| o.id).collect();
    let mut replacements: Vec<(ObjectID, ObjectKind, Vec<Polygon>)> = Vec::new();
    timer.start_iter("subtract buildings from passable shapes", passable.len());
    for id in passable {
        timer.next();
        let obj = skip_fail!(map.get_object(id));
        let mut region = match obj.polygon() {
            Ok(poly) => vec![poly],
            Err(err) => {
                warn!("{} ({}) has no valid polygon: {}", id, obj.kind, err);
                continue;
            }
        };
        let mut changed = false;
        for idx in grid.query(&obj.get_bounds()) {
            let (b_id, b_poly) = &buildings[idx];
            if !b_poly.get_bounds().intersects(&obj.get_bounds()) {
                continue;
            }
            if !region.iter().any(|piece| piece.overlaps(b_poly)) {
                continue;
            }
            if map
                .get_object(*b_id)
                .map(|b| obj.is_entirely_inside(b))
                .unwrap_or(false)
            {
                debug!("{} ({}) is swallowed by {}", id, obj.kind, b_id);
            }
            region = region
                .iter()
                .flat_map(|piece| piece.difference(b_poly))
                .collect();
            changed = true;
        }
        if !changed {
            continue;
        }
        if region.is_empty() {
            warn!(
                "Nothing is left of {} ({}) after removing buildings; keeping it",
                id, obj.kind
            );
            continue;
        }
        replacements.push((id, obj.kind, region));
    }

    let mut replaced = 0;
    for (id, kind, region) in replacements {
        let loops = decompose_region(map, &region);
        if loops.is_empty() {
            warn!(
                "Couldn't rebuild {} ({}) without its overlaps; keeping it",
                id, kind
            );
            continue;
        }
        map.remove_object(id);
        for edges in loops {
            map.add_object(kind, edges);
        }
        replaced += 1;
    }
    if replaced > 0 {
        map.resynchronize();
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OsmWayID;
    use geom::{Pt2D, EPSILON_AREA};

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
    fn buildings_are_cut_out_of_roads() {
        let mut map = TemporaryMap::new(crate::ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 100.0, 10.0);
        let kind = ObjectKind::Building(OsmWayID(5));
        let building = rect(&mut map, kind, 40.0, 5.0, 60.0, 30.0);
        let before = map.get_object(building).unwrap().edges().clone();

        assert_eq!(
            clean_building_overlaps(&mut map, &mut Timer::throwaway()),
            1
        );

        let building_poly = map.get_object(building).unwrap().polygon().unwrap();
        assert_eq!(map.get_object(building).unwrap().edges().len(), before.len());
        let roads = map.roads();
        assert_eq!(roads.len(), 1);
        let road = roads[0].polygon().unwrap();
        assert!(road.intersection_area(&building_poly) < EPSILON_AREA);
        assert!((road.area() - (1000.0 - 100.0)).abs() < 1e-6);
        map.check_invariants().unwrap();
    }

    #[test]
    fn a_building_across_a_road_splits_it() {
        let mut map = TemporaryMap::new(crate::ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 100.0, 10.0);
        rect(&mut map, ObjectKind::Building(OsmWayID(5)), 40.0, -5.0, 60.0, 15.0);
        clean_building_overlaps(&mut map, &mut Timer::throwaway());

        let mut areas: Vec<f64> = map.roads().iter().map(|r| r.area()).collect();
        areas.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(areas.len(), 2);
        assert!((areas[0] - 400.0).abs() < 1e-6);
        assert!((areas[1] - 400.0).abs() < 1e-6);
        map.check_invariants().unwrap();
    }

    #[test]
    fn swallowed_roads_stay() {
        let mut map = TemporaryMap::new(crate::ConvertConfig::default());
        let road = rect(&mut map, ObjectKind::Road, 10.0, 10.0, 20.0, 20.0);
        rect(&mut map, ObjectKind::Building(OsmWayID(5)), 0.0, 0.0, 30.0, 30.0);
        assert_eq!(
            clean_building_overlaps(&mut map, &mut Timer::throwaway()),
            0
        );
        assert!(map.get_object(road).is_some());
    }
}
