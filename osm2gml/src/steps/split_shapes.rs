use abstutil::Timer;

use super::faces::{is_simple, trace_loops};
use crate::{ObjectID, TemporaryMap};

/// After splitting edges, a polygon whose boundary crossed itself now visits some node twice.
/// Trace each such boundary into its simple loops and replace the polygon with one polygon per
/// loop, all of the same kind. Returns the number of polygons replaced.
pub fn split_shapes(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    let ids: Vec<ObjectID> = map
        .all_objects()
        .filter(|o| !is_simple(o.edges()))
        .map(|o| o.id)
        .collect();
    let mut replaced = 0;
    timer.start_iter("split self-intersecting shapes", ids.len());
    for id in ids {
        timer.next();
        let (kind, traced) = match map.get_object(id) {
            Some(obj) => (obj.kind, trace_loops(obj.edges())),
            None => continue,
        };
        if traced.abandoned > 0 {
            warn!(
                "{} ({}): abandoned {} boundary walks",
                id, kind, traced.abandoned
            );
        }
        if traced.loops.is_empty() {
            warn!("{} ({}) has no simple loops; leaving it alone", id, kind);
            continue;
        }
        map.remove_object(id);
        for edges in traced.loops {
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
    use crate::steps::split_intersecting_edges;
    use crate::{ConvertConfig, ObjectKind};
    use geom::Pt2D;

    #[test]
    fn bowtie_splits_in_two() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        // Snapping and orientation don't untangle a bowtie
        map.add_object_from_points(
            ObjectKind::Intersection,
            &[
                Pt2D::new(0.0, 0.0),
                Pt2D::new(10.0, 10.0),
                Pt2D::new(10.0, 0.0),
                Pt2D::new(0.0, 10.0),
            ],
        )
        .unwrap();
        let mut timer = Timer::throwaway();
        split_intersecting_edges(&mut map, &mut timer);
        assert_eq!(split_shapes(&mut map, &mut timer), 1);

        assert_eq!(map.num_objects(), 2);
        for obj in map.all_objects() {
            assert_eq!(obj.kind, ObjectKind::Intersection);
            assert_eq!(obj.edges().len(), 3);
            let ring = obj.ring().unwrap();
            assert!(ring.is_ccw());
            assert!((ring.area() - 25.0).abs() < 1e-6);
        }
        map.check_invariants().unwrap();
    }

    #[test]
    fn simple_shapes_are_untouched() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        map.add_object_from_points(
            ObjectKind::Road,
            &[
                Pt2D::new(0.0, 0.0),
                Pt2D::new(10.0, 0.0),
                Pt2D::new(10.0, 10.0),
            ],
        )
        .unwrap();
        assert_eq!(split_shapes(&mut map, &mut Timer::throwaway()), 0);
        assert_eq!(map.num_objects(), 1);
    }
}
