use std::collections::{BTreeMap, BTreeSet};

use abstutil::Timer;

use crate::{EdgeID, ObjectID, TemporaryMap};

/// Splitting can leave two polygons walking exactly the same edges. Keep the oldest of each group.
pub fn remove_duplicate_shapes(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    timer.start("remove duplicate shapes");
    let mut seen: BTreeMap<BTreeSet<EdgeID>, ObjectID> = BTreeMap::new();
    let mut duplicates = Vec::new();
    for obj in map.all_objects() {
        let original = seen
            .get(&obj.edge_ids())
            .and_then(|id| map.get_object(*id))
            .filter(|o| o.is_duplicate(obj));
        match original {
            Some(original) => {
                debug!("{} ({}) duplicates {}", obj.id, obj.kind, original.id);
                duplicates.push(obj.id);
            }
            None => {
                seen.insert(obj.edge_ids(), obj.id);
            }
        }
    }
    for id in &duplicates {
        map.remove_object(*id);
    }
    if !duplicates.is_empty() {
        map.resynchronize();
    }
    timer.stop("remove duplicate shapes");
    duplicates.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConvertConfig, ObjectKind};
    use geom::Pt2D;

    #[test]
    fn keeps_the_oldest() {
        let mut map = TemporaryMap::new(ConvertConfig::default());
        let square = [
            Pt2D::new(0.0, 0.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(10.0, 10.0),
            Pt2D::new(0.0, 10.0),
        ];
        let first = map
            .add_object_from_points(ObjectKind::Road, &square)
            .unwrap();
        // Same shape, starting elsewhere and wound the other way
        let mut reversed = square.to_vec();
        reversed.reverse();
        reversed.rotate_left(1);
        map.add_object_from_points(ObjectKind::Intersection, &reversed)
            .unwrap();
        map.add_object_from_points(
            ObjectKind::Road,
            &[Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 0.0), Pt2D::new(5.0, -5.0)],
        )
        .unwrap();

        assert_eq!(remove_duplicate_shapes(&mut map, &mut Timer::throwaway()), 1);
        assert_eq!(map.num_objects(), 2);
        assert!(map.get_object(first).is_some());
        map.check_invariants().unwrap();
    }
}
