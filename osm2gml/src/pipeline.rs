use abstutil::Timer;

use crate::debug::Snapshot;
use crate::{steps, ConvertConfig, DebugObserver, RawOsm, TemporaryMap};

/// The result of a pass that repeats until nothing changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedPoint {
    /// Did any pass change anything?
    pub changed: bool,
    /// How many passes ran, including the last one that found nothing to do
    pub passes: usize,
    /// False if the pass gave up at its safety cap
    pub converged: bool,
}

/// One pass over the map, after the input has been scanned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transformation {
    MergeIntersections,
    RemovePseudoNodes,
    GenerateIntersectionAreas,
    CreateObjects,
    SplitIntersectingEdges,
    SplitShapes,
    RemoveDuplicateShapes,
    CleanOverlaps,
    ConnectBuildings,
    EnsureTraversability,
    PruneOrphanBuildings,
    MergePassableShapes,
}

impl Transformation {
    pub fn standard_pipeline() -> Vec<Transformation> {
        vec![
            Transformation::MergeIntersections,
            Transformation::RemovePseudoNodes,
            Transformation::GenerateIntersectionAreas,
            Transformation::CreateObjects,
            Transformation::SplitIntersectingEdges,
            Transformation::SplitShapes,
            Transformation::RemoveDuplicateShapes,
            Transformation::CleanOverlaps,
            Transformation::ConnectBuildings,
            Transformation::EnsureTraversability,
            Transformation::PruneOrphanBuildings,
            Transformation::MergePassableShapes,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Transformation::MergeIntersections => "merge nearby intersections",
            Transformation::RemovePseudoNodes => "remove pseudo-nodes",
            Transformation::GenerateIntersectionAreas => "generate intersection areas",
            Transformation::CreateObjects => "create polygons",
            Transformation::SplitIntersectingEdges => "split intersecting edges",
            Transformation::SplitShapes => "split non-simple shapes",
            Transformation::RemoveDuplicateShapes => "remove duplicate shapes",
            Transformation::CleanOverlaps => "clean building overlaps",
            Transformation::ConnectBuildings => "connect buildings",
            Transformation::EnsureTraversability => "ensure traversability",
            Transformation::PruneOrphanBuildings => "prune orphan buildings",
            Transformation::MergePassableShapes => "merge passable shapes",
        }
    }

    /// Run this pass, returning a one-line summary of what it did.
    pub fn apply(self, map: &mut TemporaryMap, timer: &mut Timer) -> String {
        match self {
            Transformation::MergeIntersections => format!(
                "merged {} clusters",
                steps::merge_nearby_intersections(map, timer)
            ),
            Transformation::RemovePseudoNodes => {
                describe_fixed_point(steps::remove_pseudo_nodes(map, timer))
            }
            Transformation::GenerateIntersectionAreas => {
                steps::generate_intersection_areas(map, timer);
                format!("{} intersections", map.osm.intersections.len())
            }
            Transformation::CreateObjects => {
                steps::create_objects(map, timer);
                format!("{} polygons", map.num_objects())
            }
            Transformation::SplitIntersectingEdges => {
                describe_fixed_point(steps::split_intersecting_edges(map, timer))
            }
            Transformation::SplitShapes => {
                format!("split {} polygons", steps::split_shapes(map, timer))
            }
            Transformation::RemoveDuplicateShapes => format!(
                "removed {} duplicates",
                steps::remove_duplicate_shapes(map, timer)
            ),
            Transformation::CleanOverlaps => format!(
                "replaced {} passable polygons",
                steps::clean_building_overlaps(map, timer)
            ),
            Transformation::ConnectBuildings => format!(
                "added {} entrances",
                steps::connect_buildings(map, timer)
            ),
            Transformation::EnsureTraversability => format!(
                "split {} polygons",
                steps::ensure_traversability(map, timer)
            ),
            Transformation::PruneOrphanBuildings => format!(
                "removed {} buildings",
                steps::prune_orphan_buildings(map, timer)
            ),
            Transformation::MergePassableShapes => format!(
                "merged {} groups",
                steps::merge_passable_shapes(map, timer)
            ),
        }
    }
}

fn describe_fixed_point(result: FixedPoint) -> String {
    if result.converged {
        format!(
            "converged after {} passes (changed: {})",
            result.passes, result.changed
        )
    } else {
        format!("gave up after {} passes", result.passes)
    }
}

/// Run the whole conversion. The observer sees what every pass changed, if it wants to.
pub fn convert(
    raw: &RawOsm,
    config: ConvertConfig,
    observer: &mut dyn DebugObserver,
    timer: &mut Timer,
) -> TemporaryMap {
    run(raw, config, &Transformation::standard_pipeline(), observer, timer)
}

/// Like `convert`, but with a custom list of passes.
pub fn run(
    raw: &RawOsm,
    config: ConvertConfig,
    transformations: &[Transformation],
    observer: &mut dyn DebugObserver,
    timer: &mut Timer,
) -> TemporaryMap {
    timer.start("convert to polygons");

    timer.start("scan");
    let mut map = steps::scan(raw, config, timer);
    timer.stop("scan");
    if observer.enabled() {
        let empty = TemporaryMap::new(map.config.clone());
        observer.show("scan", &Snapshot::capture(&empty).diff(&Snapshot::capture(&map)));
    }

    for t in transformations {
        let before = if observer.enabled() {
            Some(Snapshot::capture(&map))
        } else {
            None
        };
        timer.start(t.name());
        let summary = t.apply(&mut map, timer);
        timer.stop(t.name());
        info!("{}: {}", t.name(), summary);
        if let Some(before) = before {
            observer.show(t.name(), &before.diff(&Snapshot::capture(&map)));
        }
    }

    map.assign_neighbours();
    let warnings = timer.warnings().len();
    timer.note(format!(
        "Finished with {} roads, {} intersections, {} buildings ({} warnings)",
        map.roads().len(),
        map.intersections().len(),
        map.buildings().len(),
        warnings
    ));
    timer.stop("convert to polygons");
    map
}
