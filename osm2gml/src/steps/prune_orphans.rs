use std::collections::{BTreeSet, VecDeque};

use abstutil::{skip_fail, Timer};

use crate::{ObjectID, TemporaryMap};

/// Remove buildings that can't be reached from the street network, either directly or through a
/// chain of neighbouring buildings. Returns the number removed.
pub fn prune_orphan_buildings(map: &mut TemporaryMap, timer: &mut Timer) -> usize {
    timer.start("prune orphan buildings");
    let is_passable = |id: &ObjectID| {
        map.get_object(*id)
            .map(|o| o.kind.is_passable())
            .unwrap_or(false)
    };

    let mut reached: BTreeSet<ObjectID> = BTreeSet::new();
    let mut queue: VecDeque<ObjectID> = VecDeque::new();
    for b in map.buildings() {
        if b
            .edges()
            .iter()
            .any(|d| map.attached_objects(d.id()).iter().any(is_passable))
        {
            reached.insert(b.id);
            queue.push_back(b.id);
        }
    }
    while let Some(id) = queue.pop_front() {
        let obj = skip_fail!(map.get_object(id));
        for d in obj.edges() {
            for other in map.attached_objects(d.id()) {
                let is_building = map
                    .get_object(*other)
                    .map(|o| o.kind.is_building())
                    .unwrap_or(false);
                if is_building && reached.insert(*other) {
                    queue.push_back(*other);
                }
            }
        }
    }

    let orphans: Vec<ObjectID> = map
        .buildings()
        .into_iter()
        .map(|b| b.id)
        .filter(|id| !reached.contains(id))
        .collect();
    for id in &orphans {
        debug!("{} can't be reached from any road", id);
        map.remove_object(*id);
    }
    if !orphans.is_empty() {
        map.resynchronize();
        info!("Removed {} unreachable buildings", orphans.len());
    }
    timer.stop("prune orphan buildings");
    orphans.len()
}
