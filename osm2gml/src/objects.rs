use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Bounds, Distance, GPSBounds, Line, LonLat, Polygon, Pt2D, Ring, EPSILON_DIST};

use crate::OsmWayID;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeID(pub usize);

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeID(pub usize);

impl fmt::Display for EdgeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Edge #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectID(pub usize);

impl fmt::Display for ObjectID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Object #{}", self.0)
    }
}

/// A canonical point. Nodes are never moved; a different position means a different node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeID,
    pub pt: Pt2D,
}

/// A canonical undirected segment between two distinct nodes. Like nodes, edges are immutable,
/// so copies of an `Edge` stay valid for as long as the ID does.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeID,
    pub start: NodeID,
    pub end: NodeID,
    /// From the start node to the end node
    pub line: Line,
}

impl PartialEq for Edge {
    fn eq(&self, other: &Edge) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl Edge {
    pub fn has_endpoint(&self, node: NodeID) -> bool {
        self.start == node || self.end == node
    }

    pub fn length(&self) -> Distance {
        self.line.length()
    }

    pub fn midpoint(&self) -> Pt2D {
        self.line.middle()
    }

    pub fn get_bounds(&self) -> Bounds {
        self.line.get_bounds()
    }
}

/// An edge, traversed in one direction. These aren't stored in the map's indices; polygons own
/// them.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DirectedEdge {
    edge: Edge,
    forwards: bool,
}

impl DirectedEdge {
    pub fn new(edge: Edge, forwards: bool) -> DirectedEdge {
        DirectedEdge { edge, forwards }
    }

    /// Orient the edge so it starts at `from`.
    pub fn starting_at(edge: Edge, from: NodeID) -> Option<DirectedEdge> {
        if edge.start == from {
            Some(DirectedEdge::new(edge, true))
        } else if edge.end == from {
            Some(DirectedEdge::new(edge, false))
        } else {
            None
        }
    }

    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    pub fn id(&self) -> EdgeID {
        self.edge.id
    }

    pub fn start_node(&self) -> NodeID {
        if self.forwards {
            self.edge.start
        } else {
            self.edge.end
        }
    }

    pub fn end_node(&self) -> NodeID {
        if self.forwards {
            self.edge.end
        } else {
            self.edge.start
        }
    }

    /// Oriented in the direction of travel
    pub fn line(&self) -> Line {
        if self.forwards {
            self.edge.line
        } else {
            self.edge.line.reversed()
        }
    }

    pub fn start_pt(&self) -> Pt2D {
        self.line().pt1()
    }

    pub fn end_pt(&self) -> Pt2D {
        self.line().pt2()
    }

    pub fn reversed(&self) -> DirectedEdge {
        DirectedEdge::new(self.edge, !self.forwards)
    }
}

impl PartialEq for DirectedEdge {
    fn eq(&self, other: &DirectedEdge) -> bool {
        self.edge.id == other.edge.id && self.forwards == other.forwards
    }
}

impl Eq for DirectedEdge {}

impl PartialOrd for DirectedEdge {
    fn partial_cmp(&self, other: &DirectedEdge) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DirectedEdge {
    fn cmp(&self, other: &DirectedEdge) -> Ordering {
        (self.edge.id, self.forwards).cmp(&(other.edge.id, other.forwards))
    }
}

impl fmt::Display for DirectedEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.edge.id,
            self.start_node(),
            self.end_node()
        )
    }
}

/// What a polygon represents. Splitting or merging a polygon produces new polygons of the same
/// kind, carrying the same data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Road,
    Intersection,
    Building(OsmWayID),
}

impl ObjectKind {
    /// Roads and intersections can be walked through; buildings can't.
    pub fn is_passable(self) -> bool {
        !self.is_building()
    }

    pub fn is_building(self) -> bool {
        matches!(self, ObjectKind::Building(_))
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ObjectKind::Road => write!(f, "road"),
            ObjectKind::Intersection => write!(f, "intersection"),
            ObjectKind::Building(id) => write!(f, "building from {}", id),
        }
    }
}

/// A simple polygon bounded by a closed walk of directed edges. Derived geometry is recalculated
/// whenever the edges change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemporaryObject {
    pub id: ObjectID,
    pub kind: ObjectKind,
    edges: Vec<DirectedEdge>,
    /// The polygon on the other side of an edge. Filled out by the map, not kept up-to-date by
    /// the object.
    neighbours: BTreeMap<EdgeID, ObjectID>,

    bounds: Bounds,
    centroid: Pt2D,
}

impl TemporaryObject {
    pub(crate) fn new(id: ObjectID, kind: ObjectKind, edges: Vec<DirectedEdge>) -> TemporaryObject {
        let mut obj = TemporaryObject {
            id,
            kind,
            edges: Vec::new(),
            neighbours: BTreeMap::new(),
            bounds: Bounds::new(),
            centroid: Pt2D::zero(),
        };
        obj.set_edges(edges);
        obj
    }

    pub(crate) fn set_edges(&mut self, edges: Vec<DirectedEdge>) {
        self.edges = edges;
        self.neighbours
            .retain(|e, _| self.edges.iter().any(|d| d.id() == *e));

        let pts = self.points();
        self.bounds = Bounds::from(&pts);
        self.centroid = match Ring::new(pts.clone()) {
            Ok(ring) => ring.centroid(),
            Err(_) => Pt2D::center(&pts),
        };
    }

    pub fn edges(&self) -> &Vec<DirectedEdge> {
        &self.edges
    }

    pub fn edge_ids(&self) -> BTreeSet<EdgeID> {
        self.edges.iter().map(|d| d.id()).collect()
    }

    pub fn contains_edge(&self, edge: EdgeID) -> bool {
        self.edges.iter().any(|d| d.id() == edge)
    }

    /// The start node of every edge, in order
    pub fn nodes(&self) -> Vec<NodeID> {
        self.edges.iter().map(|d| d.start_node()).collect()
    }

    /// The boundary as a closed ring: the first point is repeated at the end.
    pub fn points(&self) -> Vec<Pt2D> {
        let mut pts: Vec<Pt2D> = self.edges.iter().map(|d| d.start_pt()).collect();
        if let Some(first) = pts.first().cloned() {
            pts.push(first);
        }
        pts
    }

    /// The same closed ring, in longitude/latitude
    pub fn gps_points(&self, gps_bounds: &GPSBounds) -> Vec<LonLat> {
        gps_bounds.convert_back(&self.points())
    }

    pub fn lines(&self) -> Vec<Line> {
        self.edges.iter().map(|d| d.line()).collect()
    }

    pub fn get_bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn centroid(&self) -> Pt2D {
        self.centroid
    }

    pub fn ring(&self) -> Result<Ring> {
        Ring::new(self.points())
    }

    pub fn polygon(&self) -> Result<Polygon> {
        Ok(Polygon::from_ring(self.ring()?))
    }

    pub fn area(&self) -> f64 {
        self.ring().map(|r| r.area()).unwrap_or(0.0)
    }

    /// Each edge ends where the next begins, wrapping around.
    pub fn is_closed(&self) -> bool {
        if self.edges.is_empty() {
            return false;
        }
        (0..self.edges.len()).all(|i| {
            self.edges[i].end_node() == self.edges[(i + 1) % self.edges.len()].start_node()
        })
    }

    pub fn set_neighbour(&mut self, edge: EdgeID, neighbour: ObjectID) {
        self.neighbours.insert(edge, neighbour);
    }

    pub fn neighbour(&self, edge: EdgeID) -> Option<ObjectID> {
        self.neighbours.get(&edge).cloned()
    }

    pub fn clear_neighbours(&mut self) {
        self.neighbours.clear();
    }

    /// Both objects are bounded by exactly the same edges.
    pub fn is_duplicate(&self, other: &TemporaryObject) -> bool {
        self.edges.len() == other.edges.len() && self.edge_ids() == other.edge_ids()
    }

    /// Every vertex of this object is inside or on the boundary of the other.
    pub fn is_entirely_inside(&self, other: &TemporaryObject) -> bool {
        let ring = match other.ring() {
            Ok(ring) => ring,
            Err(_) => return false,
        };
        let boundary = ring.lines();
        self.edges.iter().all(|d| {
            let pt = d.start_pt();
            ring.contains_pt(pt) || boundary.iter().any(|l| l.contains_pt(pt, EPSILON_DIST))
        })
    }

    /// Substitute every occurrence of `old` with a chain walked through `replacements`, in the
    /// same direction as the old edge was traversed. An empty chain just removes the edge. If the
    /// chain can't be walked, the object is left untouched.
    pub(crate) fn replace_edge(&mut self, old: EdgeID, replacements: &[Edge]) -> Result<()> {
        let mut result = Vec::new();
        for d in &self.edges {
            if d.id() != old {
                result.push(*d);
                continue;
            }
            if replacements.is_empty() {
                continue;
            }
            result.extend(walk_chain(d.start_node(), d.end_node(), replacements)?);
        }
        self.set_edges(result);
        Ok(())
    }
}

/// Orient and order `chain` so that it walks from `from` to `to`.
fn walk_chain(from: NodeID, to: NodeID, chain: &[Edge]) -> Result<Vec<DirectedEdge>> {
    let mut remaining: Vec<Edge> = chain.to_vec();
    let mut result = Vec::new();
    let mut current = from;
    while current != to {
        let idx = match remaining.iter().position(|e| e.has_endpoint(current)) {
            Some(idx) => idx,
            None => bail!(
                "can't walk from {} to {} through {} replacement edges",
                from,
                to,
                chain.len()
            ),
        };
        let edge = remaining.remove(idx);
        if let Some(d) = DirectedEdge::starting_at(edge, current) {
            current = d.end_node();
            result.push(d);
        }
    }
    Ok(result)
}
