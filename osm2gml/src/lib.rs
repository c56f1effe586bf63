//! Converts OpenStreetMap roads and building footprints into a map made only of simple polygons.
//! Every road, intersection and building becomes a closed loop of shared edges; neighbouring
//! shapes share exactly the edges they touch along, nothing passable overlaps a building, and
//! every building can be reached from the street network.
//!
//! The conversion starts with a coarse graph of OSM intersections and roads (`OsmGraph`), then
//! materializes polygons into a `TemporaryMap` and cleans them up through a series of passes. See
//! `Transformation` for the order.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub use self::config::ConvertConfig;
pub use self::debug::{
    Category, DebugGeometry, DebugObserver, DebugShape, GeoJsonDumper, NoopObserver,
};
pub use self::grid::SpatialGrid;
pub use self::map::TemporaryMap;
pub use self::objects::{
    DirectedEdge, Edge, EdgeID, Node, NodeID, ObjectID, ObjectKind, TemporaryObject,
};
pub use self::osm_info::{OsmBuilding, OsmGraph, OsmIntersection, OsmRoad, OsmRoadID};
pub use self::pipeline::{convert, run, FixedPoint, Transformation};
pub use self::raw::{OsmNodeID, OsmWayID, RawOsm, RawWay};

mod config;
mod debug;
mod grid;
mod map;
mod objects;
mod osm_info;
mod pipeline;
mod raw;
pub mod steps;
