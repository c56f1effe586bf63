//! Every pass of the conversion. The OSM-level passes work on `TemporaryMap::osm` before any
//! polygon exists; everything from `create_objects` onwards edits the polygons.

mod clean_overlaps;
mod connect_buildings;
mod faces;
mod intersection_areas;
mod make_objects;
mod merge_intersections;
mod merge_passable;
mod prune_orphans;
mod remove_duplicates;
mod remove_pseudo_nodes;
mod scan;
mod split_edges;
mod split_shapes;
mod traversability;

pub use self::clean_overlaps::clean_building_overlaps;
pub use self::connect_buildings::connect_buildings;
pub use self::intersection_areas::generate_intersection_areas;
pub use self::make_objects::create_objects;
pub use self::merge_intersections::merge_nearby_intersections;
pub use self::merge_passable::merge_passable_shapes;
pub use self::prune_orphans::prune_orphan_buildings;
pub use self::remove_duplicates::remove_duplicate_shapes;
pub use self::remove_pseudo_nodes::remove_pseudo_nodes;
pub use self::scan::scan;
pub use self::split_edges::split_intersecting_edges;
pub use self::split_shapes::split_shapes;
pub use self::traversability::ensure_traversability;
