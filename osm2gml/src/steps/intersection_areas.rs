use abstutil::{skip_fail, Timer};
use geom::{Distance, Pt2D, EPSILON_DIST};

use crate::{OsmGraph, OsmNodeID, OsmRoadID, TemporaryMap};

/// Where one road meets an intersection.
struct Mouth {
    road: OsmRoadID,
    /// Direction from the intersection towards the road's far end, in [0, 360)
    angle: f64,
    /// Relative to somebody driving into the intersection
    left: Pt2D,
    right: Pt2D,
}

/// Shape every intersection from the mouths of its roads, and set the road corners at each end
/// to match. Each mouth sits back from the center along its road, spanning the road's width. An
/// intersection with one road gets no area; its road's corners straddle the intersection point.
pub fn generate_intersection_areas(map: &mut TemporaryMap, timer: &mut Timer) {
    let width = map.config.road_width;
    let factor = map.config.mouth_distance_factor;
    let max_fraction = map.config.max_mouth_fraction;

    let setback = |len: Distance| {
        if len < EPSILON_DIST {
            None
        } else {
            Some((factor * width).min(max_fraction * len))
        }
    };

    let ids: Vec<OsmNodeID> = map.osm.intersections.keys().cloned().collect();
    timer.start_iter("generate intersection areas", ids.len());
    for id in ids {
        timer.next();
        let mouths = skip_fail!(mouths(&map.osm, id, width, &setback));
        let area = if mouths.len() >= 2 {
            let mut pts = Vec::new();
            for (i, m) in mouths.iter().enumerate() {
                let next = &mouths[(i + 1) % mouths.len()];
                pts.push(m.right);
                pts.push(next.left);
            }
            Some(pts)
        } else {
            None
        };
        for m in &mouths {
            set_corners(&mut map.osm, id, m);
        }
        if let Some(i) = map.osm.intersections.get_mut(&id) {
            i.area = area;
        }
    }
}

/// The mouths of every road at an intersection, ordered counter-clockwise. `setback` decides how
/// far from the center each mouth sits, given the road's length; None skips the road. A single
/// road's mouth sits right at the center.
fn mouths(
    osm: &OsmGraph,
    id: OsmNodeID,
    width: Distance,
    setback: &dyn Fn(Distance) -> Option<Distance>,
) -> Option<Vec<Mouth>> {
    let center = osm.location(id)?;
    let roads = osm.connected_roads(id);
    let single = roads.len() == 1;
    let mut result = Vec::new();
    for r in roads {
        let far = skip_fail!(osm
            .roads
            .get(&r)
            .and_then(|road| osm.location(road.other_end(id))));
        let len = center.dist_to(far);
        let dist = match setback(len) {
            Some(d) => d,
            None => {
                warn!("Ignoring {} at {}; it has no length", r, id);
                continue;
            }
        };
        let dir = Pt2D::new(
            (far.x() - center.x()) / len.inner_meters(),
            (far.y() - center.y()) / len.inner_meters(),
        );
        let mouth = if single {
            center
        } else {
            center.offset(dir.x() * dist.inner_meters(), dir.y() * dist.inner_meters())
        };
        // Somebody driving in heads along -dir; their left is -dir rotated a quarter turn
        let half = width.inner_meters() / 2.0;
        let (lx, ly) = (dir.y() * half, -dir.x() * half);
        result.push(Mouth {
            road: r,
            angle: center.angle_to(far).normalized_degrees(),
            left: mouth.offset(lx, ly),
            right: mouth.offset(-lx, -ly),
        });
    }
    result.sort_by(|a, b| a.angle.total_cmp(&b.angle).then(a.road.cmp(&b.road)));
    Some(result)
}

fn set_corners(osm: &mut OsmGraph, id: OsmNodeID, m: &Mouth) {
    if let Some(road) = osm.roads.get_mut(&m.road) {
        if road.dst == id {
            road.dst_left = Some(m.left);
            road.dst_right = Some(m.right);
        } else {
            // Driving towards src, left and right swap
            road.src_right = Some(m.left);
            road.src_left = Some(m.right);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConvertConfig, OsmWayID};
    use geom::Ring;

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

    fn close(pt: Pt2D, x: f64, y: f64) -> bool {
        (pt.x() - x).abs() < 1e-9 && (pt.y() - y).abs() < 1e-9
    }

    #[test]
    fn single_road_gets_a_rectangle() {
        let mut map = graph(&[(1, 0.0, 0.0), (2, 100.0, 0.0)], &[(1, 2)]);
        generate_intersection_areas(&mut map, &mut Timer::throwaway());
        assert!(map.osm.intersections.values().all(|i| i.area.is_none()));

        let road = map.osm.roads.values().next().unwrap();
        let corners = road.corners().unwrap();
        assert!(close(corners[0], 0.0, 3.5));
        assert!(close(corners[1], 0.0, -3.5));
        assert!(close(corners[2], 100.0, -3.5));
        assert!(close(corners[3], 100.0, 3.5));
        assert!(Ring::new(corners).unwrap().is_ccw());
    }

    #[test]
    fn crossroads() {
        let mut map = graph(
            &[
                (1, 0.0, 0.0),
                (2, 100.0, 0.0),
                (3, -100.0, 0.0),
                (4, 0.0, 100.0),
                (5, 0.0, -100.0),
            ],
            &[(2, 1), (1, 3), (4, 1), (1, 5)],
        );
        generate_intersection_areas(&mut map, &mut Timer::throwaway());

        let area = map.osm.intersections[&OsmNodeID(1)].area.clone().unwrap();
        assert_eq!(area.len(), 8);
        let ring = Ring::new(area).unwrap();
        assert!(ring.is_ccw());
        // Each mouth is 10.5m out, 7m wide
        assert!((ring.area() - (21.0 * 21.0 - 4.0 * 0.5 * 7.0 * 7.0)).abs() < 1e-6);

        // Every road's footprint is a proper counter-clockwise quad meeting the mouth
        for road in map.osm.roads.values() {
            let corners = road.corners().unwrap();
            let quad = Ring::new(corners.clone()).unwrap();
            assert!(quad.is_ccw());
            assert!((quad.area() - 7.0 * (100.0 - 10.5)).abs() < 1e-6);
            for pt in corners {
                assert!(pt.dist_to(Pt2D::zero()) > Distance::meters(10.0));
            }
        }
    }

    #[test]
    fn short_roads_limit_the_mouth() {
        let mut map = graph(
            &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 0.0, 10.0)],
            &[(1, 2), (1, 3)],
        );
        generate_intersection_areas(&mut map, &mut Timer::throwaway());
        let road = map.osm.roads.values().next().unwrap();
        // 0.45 of 10m is less than 1.5 road widths
        assert!(close(road.src_left.unwrap(), 4.5, 3.5));
        assert!(close(road.src_right.unwrap(), 4.5, -3.5));
    }
}
