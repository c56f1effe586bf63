//! A coarse graph of the street network, used by the early passes before any polygon exists.
//! Intersections are keyed by the OSM node they came from; merged intersections get synthetic
//! negative IDs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use geom::{Line, Pt2D};

use crate::{OsmNodeID, OsmWayID};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OsmRoadID(pub usize);

impl fmt::Display for OsmRoadID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "OsmRoad #{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OsmIntersection {
    pub id: OsmNodeID,
    pub pt: Pt2D,
    pub roads: BTreeSet<OsmRoadID>,
    /// Calculated once the roads are final. Only intersections with at least two roads have one.
    pub area: Option<Vec<Pt2D>>,
    /// Created by merging other intersections
    pub synthetic: bool,
}

/// A straight road segment between two intersections. The four corners describe its
/// quadrilateral footprint; "left" and "right" are relative to travelling from `src` to `dst`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OsmRoad {
    pub id: OsmRoadID,
    pub way: OsmWayID,
    pub src: OsmNodeID,
    pub dst: OsmNodeID,
    pub src_left: Option<Pt2D>,
    pub src_right: Option<Pt2D>,
    pub dst_left: Option<Pt2D>,
    pub dst_right: Option<Pt2D>,
}

impl OsmRoad {
    pub fn other_end(&self, i: OsmNodeID) -> OsmNodeID {
        if self.src == i {
            self.dst
        } else {
            self.src
        }
    }

    /// The footprint in boundary order, if every corner has been calculated.
    pub fn corners(&self) -> Option<Vec<Pt2D>> {
        Some(vec![
            self.src_left?,
            self.src_right?,
            self.dst_right?,
            self.dst_left?,
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OsmBuilding {
    pub id: OsmWayID,
    /// Not closed; the first point isn't repeated.
    pub pts: Vec<Pt2D>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OsmGraph {
    pub intersections: BTreeMap<OsmNodeID, OsmIntersection>,
    pub roads: BTreeMap<OsmRoadID, OsmRoad>,
    pub buildings: Vec<OsmBuilding>,

    next_road: usize,
    next_synthetic: i64,
}

impl OsmGraph {
    pub fn new() -> OsmGraph {
        OsmGraph::default()
    }

    /// Idempotent
    pub fn add_intersection(&mut self, id: OsmNodeID, pt: Pt2D) {
        self.intersections
            .entry(id)
            .or_insert_with(|| OsmIntersection {
                id,
                pt,
                roads: BTreeSet::new(),
                area: None,
                synthetic: false,
            });
        self.next_synthetic = self.next_synthetic.min(id.0);
    }

    /// Make up an ID that isn't used by any real or previously synthesized node.
    pub fn add_synthetic_intersection(&mut self, pt: Pt2D) -> OsmNodeID {
        self.next_synthetic = self.next_synthetic.min(0) - 1;
        let id = OsmNodeID(self.next_synthetic);
        self.intersections.insert(
            id,
            OsmIntersection {
                id,
                pt,
                roads: BTreeSet::new(),
                area: None,
                synthetic: true,
            },
        );
        id
    }

    /// Both intersections must already exist; returns None otherwise.
    pub fn add_road(&mut self, way: OsmWayID, src: OsmNodeID, dst: OsmNodeID) -> Option<OsmRoadID> {
        if !self.intersections.contains_key(&src) || !self.intersections.contains_key(&dst) {
            return None;
        }
        let id = OsmRoadID(self.next_road);
        self.next_road += 1;
        self.roads.insert(
            id,
            OsmRoad {
                id,
                way,
                src,
                dst,
                src_left: None,
                src_right: None,
                dst_left: None,
                dst_right: None,
            },
        );
        for i in [src, dst] {
            if let Some(intersection) = self.intersections.get_mut(&i) {
                intersection.roads.insert(id);
            }
        }
        Some(id)
    }

    pub fn remove_road(&mut self, id: OsmRoadID) -> Option<OsmRoad> {
        let road = self.roads.remove(&id)?;
        for i in [road.src, road.dst] {
            if let Some(intersection) = self.intersections.get_mut(&i) {
                intersection.roads.remove(&id);
            }
        }
        Some(road)
    }

    /// Also removes every road touching the intersection.
    pub fn remove_intersection(&mut self, id: OsmNodeID) -> Option<OsmIntersection> {
        let roads: Vec<OsmRoadID> = self.intersections.get(&id)?.roads.iter().cloned().collect();
        for r in roads {
            self.remove_road(r);
        }
        self.intersections.remove(&id)
    }

    pub fn location(&self, id: OsmNodeID) -> Option<Pt2D> {
        self.intersections.get(&id).map(|i| i.pt)
    }

    pub fn road_line(&self, id: OsmRoadID) -> Option<Line> {
        let road = self.roads.get(&id)?;
        Some(Line::new(self.location(road.src)?, self.location(road.dst)?))
    }

    /// Roads touching the intersection, excluding loops that start and end there.
    pub fn connected_roads(&self, id: OsmNodeID) -> Vec<OsmRoadID> {
        match self.intersections.get(&id) {
            Some(i) => i
                .roads
                .iter()
                .filter(|r| self.roads.get(r).map(|r| r.src != r.dst).unwrap_or(false))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roads_stay_linked() {
        let mut graph = OsmGraph::new();
        graph.add_intersection(OsmNodeID(1), Pt2D::new(0.0, 0.0));
        graph.add_intersection(OsmNodeID(2), Pt2D::new(10.0, 0.0));
        let r = graph
            .add_road(OsmWayID(100), OsmNodeID(1), OsmNodeID(2))
            .unwrap();
        assert!(graph
            .add_road(OsmWayID(100), OsmNodeID(1), OsmNodeID(3))
            .is_none());
        assert_eq!(graph.connected_roads(OsmNodeID(2)), vec![r]);
        assert_eq!(graph.roads[&r].other_end(OsmNodeID(2)), OsmNodeID(1));

        graph.remove_intersection(OsmNodeID(1));
        assert!(graph.roads.is_empty());
        assert!(graph.intersections[&OsmNodeID(2)].roads.is_empty());
    }

    #[test]
    fn synthetic_ids_never_collide() {
        let mut graph = OsmGraph::new();
        graph.add_intersection(OsmNodeID(-5), Pt2D::new(0.0, 0.0));
        graph.add_intersection(OsmNodeID(3), Pt2D::new(1.0, 0.0));
        let a = graph.add_synthetic_intersection(Pt2D::new(2.0, 0.0));
        let b = graph.add_synthetic_intersection(Pt2D::new(3.0, 0.0));
        assert_eq!(a, OsmNodeID(-6));
        assert_eq!(b, OsmNodeID(-7));
        assert!(graph.intersections[&a].synthetic);
    }
}
