use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use abstutil::MultiMap;
use geom::{Bounds, GPSBounds, Line, Pt2D};

use crate::{
    ConvertConfig, DirectedEdge, Edge, EdgeID, Node, NodeID, ObjectID, ObjectKind, OsmGraph,
    TemporaryObject,
};

/// The graph store shared by every pass. It owns all nodes, edges and polygons, hands out
/// canonical nodes and edges for coordinates, and keeps two indices (edges per node, polygons per
/// edge) in sync with the polygons.
///
/// Incremental edits (`split_edge`, `replace_edge`, `add_object`, `remove_object`) keep the
/// indices consistent as they go. Passes that rebuild geometry wholesale call `resynchronize`
/// afterwards.
pub struct TemporaryMap {
    pub config: ConvertConfig,
    /// Set when the input was in longitude/latitude
    pub gps_bounds: Option<GPSBounds>,
    /// The coarse graph used before polygons exist
    pub osm: OsmGraph,

    nodes: BTreeMap<NodeID, Node>,
    edges: BTreeMap<EdgeID, Edge>,
    objects: BTreeMap<ObjectID, TemporaryObject>,

    edges_at_node: MultiMap<NodeID, EdgeID>,
    objects_at_edge: MultiMap<EdgeID, ObjectID>,
    // Keyed by the lower node ID first
    edge_lookup: BTreeMap<(NodeID, NodeID), EdgeID>,
    // Nodes bucketed by snapping cell, so lookups only look at neighboring cells
    node_buckets: BTreeMap<(i64, i64), BTreeSet<NodeID>>,

    next_node: usize,
    next_edge: usize,
    next_object: usize,

    bounds: Cell<Option<Bounds>>,
}

impl TemporaryMap {
    pub fn new(config: ConvertConfig) -> TemporaryMap {
        TemporaryMap {
            config,
            gps_bounds: None,
            osm: OsmGraph::new(),

            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            objects: BTreeMap::new(),

            edges_at_node: MultiMap::new(),
            objects_at_edge: MultiMap::new(),
            edge_lookup: BTreeMap::new(),
            node_buckets: BTreeMap::new(),

            next_node: 0,
            next_edge: 0,
            next_object: 0,

            bounds: Cell::new(None),
        }
    }

    fn bucket(&self, pt: Pt2D) -> (i64, i64) {
        let size = self
            .config
            .nearby_threshold
            .inner_meters()
            .max(geom::EPSILON_DIST.inner_meters());
        (
            (pt.x() / size).floor() as i64,
            (pt.y() / size).floor() as i64,
        )
    }

    /// An existing node within the nearby threshold of this point. If there are several, the
    /// oldest wins.
    pub fn find_node(&self, pt: Pt2D) -> Option<NodeID> {
        let (bx, by) = self.bucket(pt);
        let mut best = None;
        for x in (bx - 1)..=(bx + 1) {
            for y in (by - 1)..=(by + 1) {
                if let Some(ids) = self.node_buckets.get(&(x, y)) {
                    for id in ids {
                        if self.nodes[id]
                            .pt
                            .approx_eq(pt, self.config.nearby_threshold)
                            && best.map(|b| *id < b).unwrap_or(true)
                        {
                            best = Some(*id);
                        }
                    }
                }
            }
        }
        best
    }

    /// Snap to an existing node near this point, or create one.
    pub fn node_at(&mut self, pt: Pt2D) -> NodeID {
        if let Some(id) = self.find_node(pt) {
            return id;
        }
        let id = NodeID(self.next_node);
        self.next_node += 1;
        self.insert_node(Node { id, pt });
        id
    }

    fn insert_node(&mut self, node: Node) {
        let bucket = self.bucket(node.pt);
        self.node_buckets
            .entry(bucket)
            .or_insert_with(BTreeSet::new)
            .insert(node.id);
        self.nodes.insert(node.id, node);
        self.bounds.set(None);
    }

    fn retire_node(&mut self, id: NodeID) {
        if let Some(node) = self.nodes.remove(&id) {
            let bucket = self.bucket(node.pt);
            let now_empty = match self.node_buckets.get_mut(&bucket) {
                Some(ids) => {
                    ids.remove(&id);
                    ids.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.node_buckets.remove(&bucket);
            }
            self.bounds.set(None);
        }
    }

    /// The canonical edge between two nodes, in whichever direction it was first created.
    pub fn edge_between(&mut self, a: NodeID, b: NodeID) -> Result<Edge> {
        if a == b {
            bail!("can't make an edge from {} to itself", a);
        }
        if let Some(id) = self.edge_lookup.get(&sorted(a, b)) {
            return Ok(self.edges[id]);
        }
        let line = match (self.nodes.get(&a), self.nodes.get(&b)) {
            (Some(n1), Some(n2)) => Line::new(n1.pt, n2.pt),
            _ => bail!("can't make an edge between unknown {} and {}", a, b),
        };
        let edge = Edge {
            id: EdgeID(self.next_edge),
            start: a,
            end: b,
            line,
        };
        self.next_edge += 1;
        self.insert_edge(edge);
        Ok(edge)
    }

    /// Like `edge_between`, oriented from `a` to `b`.
    pub fn directed_edge(&mut self, a: NodeID, b: NodeID) -> Result<DirectedEdge> {
        let edge = self.edge_between(a, b)?;
        Ok(DirectedEdge::new(edge, edge.start == a))
    }

    fn insert_edge(&mut self, edge: Edge) {
        self.edge_lookup
            .entry(sorted(edge.start, edge.end))
            .or_insert(edge.id);
        self.edges_at_node.insert(edge.start, edge.id);
        self.edges_at_node.insert(edge.end, edge.id);
        self.edges.insert(edge.id, edge);
        self.bounds.set(None);
    }

    /// Forget an edge entirely. Endpoints left with no edges are retired too.
    fn remove_edge(&mut self, id: EdgeID) {
        let edge = match self.edges.remove(&id) {
            Some(e) => e,
            None => return,
        };
        let key = sorted(edge.start, edge.end);
        if self.edge_lookup.get(&key) == Some(&id) {
            self.edge_lookup.remove(&key);
        }
        self.objects_at_edge.remove_key(&id);
        for n in [edge.start, edge.end] {
            self.edges_at_node.remove(n, id);
            if self.edges_at_node.get(n).is_empty() {
                self.retire_node(n);
            }
        }
        self.bounds.set(None);
    }

    /// Replace an edge with a chain through the given nodes, which must be ordered from the
    /// edge's start to its end. Nodes at either end of the edge are skipped. Every polygon using
    /// the edge walks the chain instead. Returns the chain, or nothing if no split happened; in
    /// that case the map is left as it was.
    pub fn split_edge(&mut self, id: EdgeID, nodes: &[NodeID]) -> Vec<Edge> {
        let edge = match self.edges.get(&id) {
            Some(e) => *e,
            None => {
                warn!("Can't split {}; it doesn't exist", id);
                return Vec::new();
            }
        };
        // Anything at or past this ID was made for the chain
        let first_new = self.next_edge;
        let mut chain = Vec::new();
        let mut current = edge.start;
        for n in nodes {
            if *n == edge.start || *n == edge.end || *n == current {
                continue;
            }
            match self.edge_between(current, *n) {
                Ok(e) => chain.push(e),
                Err(err) => {
                    warn!("Not splitting {}: {}", id, err);
                    self.retire_unused(&chain, first_new);
                    return Vec::new();
                }
            }
            current = *n;
        }
        if chain.is_empty() {
            return Vec::new();
        }
        match self.edge_between(current, edge.end) {
            Ok(e) => chain.push(e),
            Err(err) => {
                warn!("Not splitting {}: {}", id, err);
                self.retire_unused(&chain, first_new);
                return Vec::new();
            }
        }
        if let Err(err) = self.replace_edge(id, &chain) {
            warn!("Not splitting {}: {}", id, err);
            self.retire_unused(&chain, first_new);
            return Vec::new();
        }
        chain
    }

    /// Forget edges made since `first_new` that no polygon ended up using.
    fn retire_unused(&mut self, chain: &[Edge], first_new: usize) {
        for e in chain {
            if e.id.0 >= first_new && self.objects_at_edge.get(e.id).is_empty() {
                self.remove_edge(e.id);
            }
        }
    }

    /// Substitute `replacements` for `id` in every polygon using it, then drop the old edge. If
    /// any polygon can't walk the replacements, nothing changes.
    pub fn replace_edge(&mut self, id: EdgeID, replacements: &[Edge]) -> Result<()> {
        let mut rewritten = Vec::new();
        for obj_id in self.objects_at_edge.get(id) {
            let mut obj = match self.objects.get(obj_id) {
                Some(obj) => obj.clone(),
                None => continue,
            };
            if let Err(err) = obj.replace_edge(id, replacements) {
                bail!("{} can't replace {}: {}", obj_id, id, err);
            }
            rewritten.push(obj);
        }

        for e in replacements {
            if !self.edges.contains_key(&e.id) {
                self.insert_edge(*e);
            }
        }
        for obj in rewritten {
            for e in replacements {
                self.objects_at_edge.insert(e.id, obj.id);
            }
            self.objects_at_edge.remove(id, obj.id);
            self.objects.insert(obj.id, obj);
        }
        self.remove_edge(id);
        Ok(())
    }

    /// Register a new polygon. The edges don't have to come from this map's indices (after a
    /// resynchronization they will).
    pub fn add_object(&mut self, kind: ObjectKind, edges: Vec<DirectedEdge>) -> ObjectID {
        let id = ObjectID(self.next_object);
        self.next_object += 1;
        for d in &edges {
            if !self.edges.contains_key(&d.id()) {
                for (n, pt) in [(d.edge().start, d.edge().line.pt1()), (d.edge().end, d.edge().line.pt2())] {
                    if !self.nodes.contains_key(&n) {
                        self.insert_node(Node { id: n, pt });
                    }
                }
                self.insert_edge(*d.edge());
            }
            self.objects_at_edge.insert(d.id(), id);
        }
        self.objects
            .insert(id, TemporaryObject::new(id, kind, edges));
        id
    }

    /// Build a polygon from points, snapping each to a node. Consecutive points that snap
    /// together collapse. Fails if fewer than three distinct nodes remain.
    pub fn add_object_from_points(&mut self, kind: ObjectKind, pts: &[Pt2D]) -> Result<ObjectID> {
        let edges = self.edges_for_points(pts)?;
        Ok(self.add_object(kind, edges))
    }

    /// The closed loop of directed edges through these points, oriented counter-clockwise.
    pub fn edges_for_points(&mut self, pts: &[Pt2D]) -> Result<Vec<DirectedEdge>> {
        let mut nodes: Vec<NodeID> = Vec::new();
        for pt in pts {
            let n = self.node_at(*pt);
            if nodes.last() != Some(&n) {
                nodes.push(n);
            }
        }
        while nodes.len() > 1 && nodes.first() == nodes.last() {
            nodes.pop();
        }
        if nodes.len() < 3 {
            bail!("only {} distinct nodes", nodes.len());
        }
        if signed_area(&nodes.iter().map(|n| self.nodes[n].pt).collect::<Vec<_>>()) < 0.0 {
            nodes.reverse();
        }
        let mut edges = Vec::new();
        for i in 0..nodes.len() {
            edges.push(self.directed_edge(nodes[i], nodes[(i + 1) % nodes.len()])?);
        }
        Ok(edges)
    }

    /// Forget a polygon. Edges and nodes that nothing else uses go with it.
    pub fn remove_object(&mut self, id: ObjectID) -> Option<TemporaryObject> {
        let obj = self.objects.remove(&id)?;
        for d in obj.edges() {
            self.objects_at_edge.remove(d.id(), id);
            if self.objects_at_edge.get(d.id()).is_empty() {
                self.remove_edge(d.id());
            }
        }
        Some(obj)
    }

    /// Throw away every node, edge and index, then rebuild them from the polygons alone. Edges
    /// duplicating another edge's endpoints are folded into the first one.
    pub fn resynchronize(&mut self) {
        let old_nodes = std::mem::take(&mut self.nodes);
        self.edges.clear();
        self.edges_at_node.clear();
        self.objects_at_edge.clear();
        self.edge_lookup.clear();
        self.node_buckets.clear();
        self.bounds.set(None);

        let ids: Vec<ObjectID> = self.objects.keys().cloned().collect();
        for id in ids {
            let mut rewritten = Vec::new();
            let mut changed = false;
            for d in self.objects[&id].edges().clone() {
                let edge = *d.edge();
                for (n, pt) in [(edge.start, edge.line.pt1()), (edge.end, edge.line.pt2())] {
                    if !self.nodes.contains_key(&n) {
                        let node = old_nodes.get(&n).cloned().unwrap_or(Node { id: n, pt });
                        self.insert_node(node);
                    }
                }
                let canonical = match self.edge_lookup.get(&sorted(edge.start, edge.end)) {
                    Some(existing) => self.edges[existing],
                    None => {
                        self.insert_edge(edge);
                        edge
                    }
                };
                if canonical.id == edge.id {
                    rewritten.push(d);
                } else {
                    changed = true;
                    let forwards = canonical.start == d.start_node();
                    rewritten.push(DirectedEdge::new(canonical, forwards));
                }
                self.objects_at_edge.insert(canonical.id, id);
            }
            if changed {
                if let Some(obj) = self.objects.get_mut(&id) {
                    obj.set_edges(rewritten);
                }
            }
        }
    }

    /// Record, for every polygon edge shared with exactly one other polygon, who that is.
    pub fn assign_neighbours(&mut self) {
        let mut assignments = Vec::new();
        for obj in self.objects.values() {
            for d in obj.edges() {
                let others: Vec<ObjectID> = self
                    .objects_at_edge
                    .get(d.id())
                    .iter()
                    .filter(|o| **o != obj.id)
                    .cloned()
                    .collect();
                if others.len() == 1 {
                    assignments.push((obj.id, d.id(), others[0]));
                }
            }
        }
        for obj in self.objects.values_mut() {
            obj.clear_neighbours();
        }
        for (obj, edge, neighbour) in assignments {
            if let Some(obj) = self.objects.get_mut(&obj) {
                obj.set_neighbour(edge, neighbour);
            }
        }
    }

    pub fn get_node(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_edge(&self, id: EdgeID) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn get_object(&self, id: ObjectID) -> Option<&TemporaryObject> {
        self.objects.get(&id)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn all_objects(&self) -> impl Iterator<Item = &TemporaryObject> {
        self.objects.values()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn roads(&self) -> Vec<&TemporaryObject> {
        self.objects
            .values()
            .filter(|o| o.kind == ObjectKind::Road)
            .collect()
    }

    pub fn intersections(&self) -> Vec<&TemporaryObject> {
        self.objects
            .values()
            .filter(|o| o.kind == ObjectKind::Intersection)
            .collect()
    }

    pub fn buildings(&self) -> Vec<&TemporaryObject> {
        self.objects
            .values()
            .filter(|o| o.kind.is_building())
            .collect()
    }

    /// Roads and intersections
    pub fn all_passable(&self) -> Vec<&TemporaryObject> {
        self.objects
            .values()
            .filter(|o| o.kind.is_passable())
            .collect()
    }

    pub fn attached_objects(&self, edge: EdgeID) -> &BTreeSet<ObjectID> {
        self.objects_at_edge.get(edge)
    }

    pub fn attached_edges(&self, node: NodeID) -> &BTreeSet<EdgeID> {
        self.edges_at_node.get(node)
    }

    /// Covers every node. Cached until the next node or edge changes.
    pub fn get_bounds(&self) -> Bounds {
        if let Some(b) = self.bounds.get() {
            return b;
        }
        let mut b = Bounds::new();
        for n in self.nodes.values() {
            b.update(n.pt);
        }
        self.bounds.set(Some(b));
        b
    }

    /// Verify that every polygon is a closed walk over edges the map knows about, and that the
    /// indices agree with the polygons.
    pub fn check_invariants(&self) -> Result<()> {
        for obj in self.objects.values() {
            if !obj.is_closed() {
                bail!("{} ({}) isn't a closed loop", obj.id, obj.kind);
            }
            for d in obj.edges() {
                if !self.edges.contains_key(&d.id()) {
                    bail!("{} uses missing {}", obj.id, d.id());
                }
                if !self.objects_at_edge.get(d.id()).contains(&obj.id) {
                    bail!("{} isn't indexed as using {}", obj.id, d.id());
                }
            }
        }
        for (edge, objs) in self.objects_at_edge.borrow() {
            for obj in objs {
                match self.objects.get(obj) {
                    Some(o) if o.contains_edge(*edge) => {}
                    _ => bail!("{} is indexed against {} but doesn't use it", obj, edge),
                }
            }
        }
        for edge in self.edges.values() {
            for n in [edge.start, edge.end] {
                if !self.nodes.contains_key(&n) {
                    bail!("{} has missing endpoint {}", edge.id, n);
                }
                if !self.edges_at_node.get(n).contains(&edge.id) {
                    bail!("{} isn't indexed at {}", edge.id, n);
                }
            }
        }
        Ok(())
    }
}

fn sorted(a: NodeID, b: NodeID) -> (NodeID, NodeID) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn signed_area(pts: &[Pt2D]) -> f64 {
    let mut sum = 0.0;
    for i in 0..pts.len() {
        let (a, b) = (pts[i], pts[(i + 1) % pts.len()]);
        sum += a.x() * b.y() - b.x() * a.y();
    }
    sum / 2.0
}
