use std::collections::BTreeSet;

use abstutil::Timer;
use geom::{Bounds, Distance, Polygon, Pt2D, EPSILON_DIST};

use crate::{Edge, EdgeID, NodeID, ObjectID, ObjectKind, SpatialGrid, TemporaryMap};

/// A planned connector between one building wall and one road edge.
struct Entrance {
    building: ObjectID,
    road: ObjectID,
    wall: Edge,
    road_edge: Edge,
    /// Two points along the wall, then two along the road, in boundary order
    corners: [Pt2D; 4],
    /// Worst angle away from perpendicular, against the wall or the road
    deviation: f64,
    length: Distance,
}

/// Give every building that doesn't touch the street network a short entrance polygon linking one
/// of its walls to a nearby road edge. Every entrance is planned against the current map first,
/// then they're all added at once. Returns the number of entrances added.
pub fn connect_buildings(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    let mut road_edges: Vec<(ObjectID, Edge)> = Vec::new();
    let mut road_grid = SpatialGrid::for_bounds(map.get_bounds(), map.config.grid_divisions);
    for road in map.roads() {
        for d in road.edges() {
            let e = *d.edge();
            if e.length() >= map.config.entrance_width && map.attached_objects(e.id).len() <= 1 {
                road_grid.add(road_edges.len(), &e.get_bounds());
                road_edges.push((road.id, e));
            }
        }
    }

    let mut obstacles: Vec<(ObjectID, Polygon)> = Vec::new();
    let mut obstacle_grid = SpatialGrid::for_bounds(map.get_bounds(), map.config.grid_divisions);
    for obj in map.all_objects() {
        if let Ok(poly) = obj.polygon() {
            obstacle_grid.add(obstacles.len(), &poly.get_bounds());
            obstacles.push((obj.id, poly));
        }
    }

    let unconnected: Vec<ObjectID> = map
        .buildings()
        .into_iter()
        .filter(|b| {
            !b.edges().iter().any(|d| {
                map.attached_objects(d.id()).iter().any(|o| {
                    map.get_object(*o)
                        .map(|o| o.kind.is_passable())
                        .unwrap_or(false)
                })
            })
        })
        .map(|b| b.id)
        .collect();

    let mut claimed: BTreeSet<EdgeID> = BTreeSet::new();
    let mut planned: Vec<(Entrance, Polygon)> = Vec::new();
    timer.start_iter("plan building entrances", unconnected.len());
    for b in unconnected {
        timer.next();
        let mut found = false;
        for entrance in candidates(map, b, &road_edges, &road_grid) {
            if claimed.contains(&entrance.wall.id) || claimed.contains(&entrance.road_edge.id) {
                continue;
            }
            let poly = match Polygon::from_points(entrance.corners.to_vec()) {
                Ok(poly) => poly,
                Err(_) => continue,
            };
            let collides = blocked(&poly, &entrance, &obstacles, &obstacle_grid)
                || planned.iter().any(|(_, other)| poly.overlaps(other));
            if collides {
                continue;
            }
            claimed.insert(entrance.wall.id);
            claimed.insert(entrance.road_edge.id);
            planned.push((entrance, poly));
            found = true;
            break;
        }
        if !found {
            debug!("No room for an entrance to {}", b);
        }
    }

    let mut added = 0;
    for (entrance, _) in planned {
        if add_entrance(map, &entrance) {
            added += 1;
        }
    }
    if added > 0 {
        map.resynchronize();
    }
    info!("Connected {} buildings to roads", added);
    added
}

/// Does the entrance overlap anything besides the building and road it links?
fn blocked(
    poly: &Polygon,
    entrance: &Entrance,
    obstacles: &[(ObjectID, Polygon)],
    grid: &SpatialGrid<usize>,
) -> bool {
    grid.query(&poly.get_bounds()).into_iter().any(|idx| {
        let (id, other) = &obstacles[idx];
        *id != entrance.building && *id != entrance.road && poly.overlaps(other)
    })
}

/// Every acceptable entrance for one building, best first.
fn candidates(
    map: &TemporaryMap,
    building: ObjectID,
    road_edges: &[(ObjectID, Edge)],
    road_grid: &SpatialGrid<usize>,
) -> Vec<Entrance> {
    let width = map.config.entrance_width;
    let half = width / 2.0;
    let max_length = map.config.max_connect_distance;
    let max_deviation = map.config.max_entrance_deviation.to_degrees();

    let walls: Vec<Edge> = match map.get_object(building) {
        Some(b) => b.edges().iter().map(|d| *d.edge()).collect(),
        None => return Vec::new(),
    };
    let mut result = Vec::new();
    for wall in walls {
        let wall_len = wall.length();
        if wall_len < width {
            continue;
        }
        let mid = wall.midpoint();
        for idx in road_grid.query(&Bounds::from(&[mid]).expanded(max_length)) {
            let (road, road_edge) = road_edges[idx];
            let road_len = road_edge.length();
            let along = road_len * road_edge.line.position_of(mid).clamp(0.0, 1.0);
            let conn = road_edge.line.dist_along(along);
            let length = mid.dist_to(conn);
            if length > max_length || length < EPSILON_DIST {
                continue;
            }
            let connector = mid.angle_to(conn);
            let deviation = (90.0 - connector.degrees_between(wall.line.angle()))
                .abs()
                .max((90.0 - connector.degrees_between(road_edge.line.angle())).abs());
            if deviation > max_deviation {
                continue;
            }

            // Slide along the road so the whole entrance fits on this edge
            let along = along.max(half).min(road_len - half);
            let r1 = road_edge.line.dist_along(along - half);
            let r2 = road_edge.line.dist_along(along + half);
            let b1 = wall.line.dist_along(wall_len / 2.0 - half);
            let b2 = wall.line.dist_along(wall_len / 2.0 + half);
            let corners = if wall.line.dir().dot(road_edge.line.dir()) > 0.0 {
                [b1, b2, r2, r1]
            } else {
                [b1, b2, r1, r2]
            };
            result.push(Entrance {
                building,
                road,
                wall,
                road_edge,
                corners,
                deviation,
                length,
            });
        }
    }
    result.sort_by(|a, b| {
        a.deviation
            .total_cmp(&b.deviation)
            .then(a.length.cmp(&b.length))
            .then(a.wall.id.cmp(&b.wall.id))
            .then(a.road_edge.id.cmp(&b.road_edge.id))
    });
    result
}

fn add_entrance(map: &mut TemporaryMap, entrance: &Entrance) -> bool {
    let nodes: Vec<NodeID> = entrance.corners.iter().map(|pt| map.node_at(*pt)).collect();
    if nodes.iter().collect::<BTreeSet<_>>().len() < 4 {
        warn!(
            "Entrance from {} to {} collapses after snapping",
            entrance.building, entrance.road
        );
        return false;
    }
    for (edge, pair) in [(entrance.wall, [0, 1]), (entrance.road_edge, [2, 3])] {
        let mut split: Vec<(f64, NodeID)> = pair
            .iter()
            .map(|i| (edge.line.position_of(entrance.corners[*i]), nodes[*i]))
            .collect();
        split.sort_by(|a, b| a.0.total_cmp(&b.0));
        let split: Vec<NodeID> = split.into_iter().map(|(_, n)| n).collect();
        map.split_edge(edge.id, &split);
    }
    match map.add_object_from_points(ObjectKind::Intersection, &entrance.corners) {
        Ok(id) => {
            debug!("{} connects {} to {}", id, entrance.building, entrance.road);
            true
        }
        Err(err) => {
            warn!(
                "Couldn't add an entrance from {} to {}: {}",
                entrance.building, entrance.road, err
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConvertConfig, OsmWayID};
    use geom::Line;

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
    fn nearby_building_gets_an_entrance() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        let road = rect(&mut map, ObjectKind::Road, 0.0, 0.0, 100.0, 10.0);
        let kind = ObjectKind::Building(OsmWayID(1));
        let building = rect(&mut map, kind, 40.0, 20.0, 60.0, 35.0);

        assert_eq!(connect_buildings(&mut map, &mut Timer::throwaway()), 1);
        let entrances = map.intersections();
        assert_eq!(entrances.len(), 1);
        let entrance = entrances[0];
        assert!((entrance.area() - 7.0 * 10.0).abs() < 1e-6);
        assert!(entrance.ring().unwrap().is_ccw());

        // It shares one edge with each side
        let mut neighbours = BTreeSet::new();
        for d in entrance.edges() {
            neighbours.extend(map.attached_objects(d.id()).iter().cloned());
        }
        assert_eq!(neighbours, BTreeSet::from([road, building, entrance.id]));
        map.check_invariants().unwrap();

        // Running again finds nothing left to connect
        assert_eq!(connect_buildings(&mut map, &mut Timer::throwaway()), 0);
    }

    #[test]
    fn far_or_skewed_buildings_are_left_alone() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 100.0, 10.0);
        rect(&mut map, ObjectKind::Building(OsmWayID(1)), 40.0, 50.0, 60.0, 65.0);
        // A thin tower whose walls are all too short
        rect(&mut map, ObjectKind::Building(OsmWayID(2)), 10.0, 15.0, 15.0, 20.0);
        assert_eq!(connect_buildings(&mut map, &mut Timer::throwaway()), 0);
        assert!(map.intersections().is_empty());
    }

    #[test]
    fn entrances_slide_to_fit_the_road_edge() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        rect(&mut map, ObjectKind::Road, 0.0, 0.0, 30.0, 10.0);
        // The wall's midpoint is right above the road's corner
        rect(&mut map, ObjectKind::Building(OsmWayID(1)), 20.0, 15.0, 40.0, 30.0);
        assert_eq!(connect_buildings(&mut map, &mut Timer::throwaway()), 1);
        let entrance = map.intersections()[0];
        // The road side stays on the road's top edge
        for pt in entrance.points() {
            if pt.y() < 12.0 {
                assert!(pt.x() <= 30.0 + 1e-9);
            }
        }
        map.check_invariants().unwrap();
    }

    #[test]
    fn only_other_shapes_block_an_entrance() {
        let rect = |x1: f64, y1: f64, x2: f64, y2: f64| {
            Polygon::from_points(vec![
                Pt2D::new(x1, y1),
                Pt2D::new(x2, y1),
                Pt2D::new(x2, y2),
                Pt2D::new(x1, y2),
            ])
            .unwrap()
        };
        let edge = Edge {
            id: EdgeID(0),
            start: NodeID(0),
            end: NodeID(1),
            line: Line::new(Pt2D::new(40.0, 10.0), Pt2D::new(60.0, 10.0)),
        };
        let entrance = Entrance {
            building: ObjectID(1),
            road: ObjectID(0),
            wall: edge,
            road_edge: edge,
            corners: [
                Pt2D::new(40.0, 20.0),
                Pt2D::new(47.0, 20.0),
                Pt2D::new(47.0, 10.0),
                Pt2D::new(40.0, 10.0),
            ],
            deviation: 0.0,
            length: Distance::meters(10.0),
        };
        // Pokes a little into both the road and the building
        let poly = rect(40.0, 9.0, 47.0, 21.0);

        let mut obstacles = vec![
            (ObjectID(0), rect(0.0, 0.0, 100.0, 10.0)),
            (ObjectID(1), rect(40.0, 20.0, 60.0, 35.0)),
        ];
        let mut grid = SpatialGrid::for_bounds(
            Bounds::from(&[Pt2D::new(0.0, 0.0), Pt2D::new(100.0, 100.0)]),
            10.0,
        );
        for (idx, (_, p)) in obstacles.iter().enumerate() {
            grid.add(idx, &p.get_bounds());
        }
        assert!(!blocked(&poly, &entrance, &obstacles, &grid));

        obstacles.push((ObjectID(2), rect(44.0, 12.0, 55.0, 18.0)));
        grid.add(2, &obstacles[2].1.get_bounds());
        assert!(blocked(&poly, &entrance, &obstacles, &grid));
    }
}
