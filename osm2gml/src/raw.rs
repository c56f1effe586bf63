use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{GPSBounds, LonLat, Pt2D};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OsmNodeID(pub i64);

impl fmt::Display for OsmNodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "https://www.openstreetmap.org/node/{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OsmWayID(pub i64);

impl fmt::Display for OsmWayID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "https://www.openstreetmap.org/way/{}", self.0)
    }
}

/// An ordered sequence of nodes. Building ways are closed; the repeated last node is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawWay {
    pub id: OsmWayID,
    pub nodes: Vec<OsmNodeID>,
}

/// The parsed street map, as handed over by a reader. Everything is already projected into
/// world-space meters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawOsm {
    pub nodes: BTreeMap<OsmNodeID, Pt2D>,
    pub roads: Vec<RawWay>,
    pub buildings: Vec<RawWay>,
    /// If the input came from longitude/latitude, how to convert back.
    pub gps_bounds: Option<GPSBounds>,
}

impl RawOsm {
    pub fn new() -> RawOsm {
        RawOsm::default()
    }

    /// Project GPS coordinates into world-space, remembering the bounds.
    pub fn from_gps(
        nodes: BTreeMap<OsmNodeID, LonLat>,
        roads: Vec<RawWay>,
        buildings: Vec<RawWay>,
    ) -> RawOsm {
        let gps_bounds = GPSBounds::from(&nodes.values().cloned().collect::<Vec<_>>());
        let nodes = nodes
            .into_iter()
            .map(|(id, gps)| (id, gps_bounds.convert_pt(gps)))
            .collect();
        RawOsm {
            nodes,
            roads,
            buildings,
            gps_bounds: Some(gps_bounds),
        }
    }

    pub fn load(path: &str) -> Result<RawOsm> {
        abstutil::read_json(path)
    }

    pub fn add_node(&mut self, id: i64, x: f64, y: f64) -> OsmNodeID {
        let id = OsmNodeID(id);
        self.nodes.insert(id, Pt2D::new(x, y));
        id
    }

    pub fn add_road(&mut self, id: i64, nodes: Vec<i64>) {
        self.roads.push(RawWay {
            id: OsmWayID(id),
            nodes: nodes.into_iter().map(OsmNodeID).collect(),
        });
    }

    pub fn add_building(&mut self, id: i64, nodes: Vec<i64>) {
        self.buildings.push(RawWay {
            id: OsmWayID(id),
            nodes: nodes.into_iter().map(OsmNodeID).collect(),
        });
    }

    /// Look up the position of every node in a way, skipping unknown nodes.
    pub(crate) fn resolve(&self, way: &RawWay) -> (Vec<(OsmNodeID, Pt2D)>, usize) {
        let mut missing = 0;
        let mut result = Vec::new();
        for id in &way.nodes {
            if let Some(pt) = self.nodes.get(id) {
                result.push((*id, *pt));
            } else {
                missing += 1;
            }
        }
        (result, missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gps_input_is_projected_to_meters() {
        let mut nodes = BTreeMap::new();
        nodes.insert(OsmNodeID(1), LonLat::new(-122.30, 47.60));
        nodes.insert(OsmNodeID(2), LonLat::new(-122.29, 47.60));
        nodes.insert(OsmNodeID(3), LonLat::new(-122.30, 47.61));
        let raw = RawOsm::from_gps(
            nodes,
            vec![RawWay {
                id: OsmWayID(10),
                nodes: vec![OsmNodeID(1), OsmNodeID(2)],
            }],
            Vec::new(),
        );

        let a = raw.nodes[&OsmNodeID(1)];
        let b = raw.nodes[&OsmNodeID(2)];
        let c = raw.nodes[&OsmNodeID(3)];
        // A hundredth of a degree is roughly 750m of longitude and 1100m of latitude here
        assert!((a.dist_to(b).inner_meters() - 750.0).abs() < 20.0);
        assert!((a.dist_to(c).inner_meters() - 1112.0).abs() < 20.0);

        let gps = raw.gps_bounds.unwrap();
        let back = gps.convert_back_pt(b);
        assert!((back.x() - -122.29).abs() < 1e-9);
        assert!((back.y() - 47.60).abs() < 1e-9);
    }

    #[test]
    fn unknown_nodes_are_skipped() {
        let mut raw = RawOsm::new();
        raw.add_node(1, 0.0, 0.0);
        raw.add_node(3, 10.0, 0.0);
        raw.add_road(10, vec![1, 2, 3]);
        let (pts, missing) = raw.resolve(&raw.roads[0]);
        assert_eq!(missing, 1);
        assert_eq!(
            pts.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![OsmNodeID(1), OsmNodeID(3)]
        );
    }

    #[test]
    fn loads_from_json() {
        let mut raw = RawOsm::new();
        raw.add_node(1, 0.0, 0.0);
        raw.add_node(2, 10.0, 0.0);
        raw.add_road(10, vec![1, 2]);
        let path = std::env::temp_dir()
            .join("osm2gml_raw_test")
            .join("input.json")
            .to_string_lossy()
            .to_string();
        abstutil::write_json(&path, &raw).unwrap();

        let copy = RawOsm::load(&path).unwrap();
        assert_eq!(copy.nodes, raw.nodes);
        assert_eq!(copy.roads, raw.roads);
        assert!(RawOsm::load("/definitely/not/here.json").is_err());
    }
}
