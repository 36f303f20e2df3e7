//! Relationship graph traversal.
//!
//! Entities are nodes and relationships are edges. Traversal is breadth
//! first over neighbours in ascending id order, so results are
//! deterministic for a given resolution.

use std::collections::{BTreeSet, VecDeque};

use erbind_core::EntityId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::repository::Resolution;

/// Constraints on a path search.
#[derive(Debug)]
pub struct PathQuery<'a> {
    /// Maximum number of edges
    pub max_degrees: usize,
    /// Entities the path may not pass through
    pub avoid: &'a FxHashSet<EntityId>,
    /// Data sources at least one path entity must carry; empty for none
    pub required: &'a BTreeSet<String>,
}

/// Shortest path from `start` to `end`, inclusive of both ends.
///
/// Search state is `(entity, requirement met)` so a path may detour through
/// an entity carrying a required data source.
pub fn shortest_path(res: &Resolution, start: EntityId, end: EntityId, query: &PathQuery<'_>) -> Option<Vec<EntityId>> {
    let carries_required = |id: EntityId| {
        query.required.is_empty()
            || res
                .data_sources(id)
                .iter()
                .any(|ds| query.required.contains(*ds))
    };

    let origin = (start, carries_required(start));
    let mut previous: FxHashMap<(EntityId, bool), (EntityId, bool)> = FxHashMap::default();
    let mut seen: FxHashSet<(EntityId, bool)> = FxHashSet::default();
    let mut queue: VecDeque<((EntityId, bool), usize)> = VecDeque::new();
    seen.insert(origin);
    queue.push_back((origin, 0));

    while let Some((state, depth)) = queue.pop_front() {
        let (entity, met) = state;
        if entity == end && met {
            let mut path = vec![entity];
            let mut cursor = state;
            while let Some(prev) = previous.get(&cursor) {
                path.push(prev.0);
                cursor = *prev;
            }
            path.reverse();
            return Some(path);
        }
        if depth == query.max_degrees {
            continue;
        }
        for (next, _) in res.related(entity) {
            if next != end && query.avoid.contains(&next) {
                continue;
            }
            let next_state = (next, met || carries_required(next));
            if seen.insert(next_state) {
                previous.insert(next_state, state);
                queue.push_back((next_state, depth + 1));
            }
        }
    }
    None
}

/// Entities within `degrees` relationship hops of any seed, in discovery
/// order, excluding the seeds themselves.
pub fn build_out(res: &Resolution, seeds: &[EntityId], degrees: usize) -> Vec<EntityId> {
    let mut seen: FxHashSet<EntityId> = seeds.iter().copied().collect();
    let mut queue: VecDeque<(EntityId, usize)> = seeds.iter().map(|&s| (s, 0)).collect();
    let mut found = Vec::new();
    while let Some((entity, depth)) = queue.pop_front() {
        if depth == degrees {
            continue;
        }
        for (next, _) in res.related(entity) {
            if seen.insert(next) {
                found.push(next);
                queue.push_back((next, depth + 1));
            }
        }
    }
    found
}
