//! Record store and entity resolution.
//!
//! The [`Repository`] owns loaded records. [`Repository::resolve`] rebuilds
//! the complete [`Resolution`] (entities, relationships and the merge
//! history used to explain entities) from scratch, replaying records in load
//! order so the outcome does not depend on when it is computed.

use std::collections::{BTreeMap, BTreeSet};

use erbind_core::{EntityId, RecordKey};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::dsu::RecordDsu;
use crate::features::{compare, Feature, Match, MatchLevel};

/// A loaded record.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Record key
    pub key: RecordKey,
    /// Load sequence number; survives replacement of the record
    pub seq: i64,
    /// Record document as submitted
    pub json: Map<String, Value>,
    /// Extracted features
    pub features: Vec<Feature>,
}

/// Loaded records, keyed by data source and record id.
#[derive(Debug)]
pub struct Repository {
    records: BTreeMap<RecordKey, StoredRecord>,
    next_seq: i64,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    /// Empty repository.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_seq: 1,
        }
    }

    /// Insert or replace a record. Returns true if it replaced one.
    pub fn upsert(&mut self, key: RecordKey, json: Map<String, Value>, features: Vec<Feature>) -> bool {
        if let Some(existing) = self.records.get_mut(&key) {
            existing.json = json;
            existing.features = features;
            return true;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(
            key.clone(),
            StoredRecord {
                key,
                seq,
                json,
                features,
            },
        );
        false
    }

    /// Remove a record.
    pub fn remove(&mut self, key: &RecordKey) -> Option<StoredRecord> {
        self.records.remove(key)
    }

    /// Look up a record.
    pub fn get(&self, key: &RecordKey) -> Option<&StoredRecord> {
        self.records.get(key)
    }

    /// Number of loaded records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in load order.
    pub fn in_load_order(&self) -> Vec<&StoredRecord> {
        let mut records: Vec<&StoredRecord> = self.records.values().collect();
        records.sort_by_key(|r| r.seq);
        records
    }

    /// Resolve all loaded records into entities.
    pub fn resolve(&self) -> Resolution {
        Resolution::build(&self.in_load_order())
    }
}

/// A resolved entity.
#[derive(Debug, Clone)]
pub struct EntityState {
    /// Entity id: the load sequence number of its oldest record
    pub id: EntityId,
    /// Member records in load order
    pub records: Vec<RecordKey>,
    /// Match key and rule that brought each non-first record in
    pub match_info: FxHashMap<RecordKey, (String, &'static str)>,
}

/// Relationship between two distinct entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Possibly related or name only
    pub level: MatchLevel,
    /// Shared feature kinds
    pub key: String,
}

/// One merge performed while resolving.
#[derive(Debug, Clone)]
pub struct ResolutionStep {
    /// Entity the merge ended up in
    pub entity_id: EntityId,
    /// Virtual entity of the incoming side
    pub inbound: String,
    /// Virtual entity of the candidate side
    pub candidate: String,
    /// Virtual entity produced by the merge
    pub result: String,
    /// The record pair comparison that justified the merge
    pub matched: Match,
}

/// Complete resolution state of a repository.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Entities by id
    pub entities: BTreeMap<EntityId, EntityState>,
    /// Entity of every record
    pub record_entity: FxHashMap<RecordKey, EntityId>,
    /// Symmetric relationship map
    pub relations: BTreeMap<EntityId, BTreeMap<EntityId, Relation>>,
    /// Merge history in replay order
    pub steps: Vec<ResolutionStep>,
}

impl Resolution {
    fn build(records: &[&StoredRecord]) -> Self {
        let mut dsu = RecordDsu::new(records.len());
        let mut virtual_ids: Vec<String> = records.iter().map(|r| format!("V{}", r.seq)).collect();
        let mut match_info: FxHashMap<RecordKey, (String, &'static str)> = FxHashMap::default();
        let mut merges: Vec<(usize, String, String, String, Match)> = Vec::new();

        for i in 0..records.len() {
            for j in 0..i {
                let matched = compare(&records[j].features, &records[i].features);
                if matched.level != MatchLevel::Resolved {
                    continue;
                }
                let inbound_root = dsu.find(i);
                let candidate_root = dsu.find(j);
                if inbound_root == candidate_root {
                    continue;
                }
                let inbound = virtual_ids[inbound_root].clone();
                let candidate = virtual_ids[candidate_root].clone();
                if let Some(root) = dsu.try_merge(i, j) {
                    let result = format!("V{}-S{}", records[root].seq, merges.len() + 1);
                    virtual_ids[root] = result.clone();
                    match_info
                        .entry(records[i].key.clone())
                        .or_insert_with(|| (matched.key(), matched.rule()));
                    merges.push((root, inbound, candidate, result, matched));
                }
            }
        }

        let mut resolution = Resolution::default();
        let mut root_entity: FxHashMap<usize, EntityId> = FxHashMap::default();
        for (root, members) in dsu.clusters() {
            let id = records[root].seq;
            root_entity.insert(root, id);
            let keys: Vec<RecordKey> = members.iter().map(|&m| records[m].key.clone()).collect();
            for key in &keys {
                resolution.record_entity.insert(key.clone(), id);
            }
            let info = keys
                .iter()
                .filter_map(|k| match_info.get(k).map(|v| (k.clone(), v.clone())))
                .collect();
            resolution.entities.insert(
                id,
                EntityState {
                    id,
                    records: keys,
                    match_info: info,
                },
            );
        }

        debug_assert_eq!(dsu.cluster_count(), resolution.entities.len());

        for (root, inbound, candidate, result, matched) in merges {
            let final_root = dsu.find(root);
            resolution.steps.push(ResolutionStep {
                entity_id: root_entity[&final_root],
                inbound,
                candidate,
                result,
                matched,
            });
        }

        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                let (a, b) = (root_entity[&dsu.find(i)], root_entity[&dsu.find(j)]);
                if a == b {
                    continue;
                }
                let matched = compare(&records[i].features, &records[j].features);
                if !matched.level.is_relationship() {
                    continue;
                }
                resolution.relate(a, b, &matched);
                resolution.relate(b, a, &matched);
            }
        }
        resolution
    }

    fn relate(&mut self, from: EntityId, to: EntityId, matched: &Match) {
        let slot = self.relations.entry(from).or_default();
        match slot.get(&to) {
            // A stronger level (lower ordinal) already recorded wins.
            Some(existing) if existing.level <= matched.level => {}
            _ => {
                slot.insert(
                    to,
                    Relation {
                        level: matched.level,
                        key: matched.key(),
                    },
                );
            }
        }
    }

    /// Entity holding `key`.
    pub fn entity_of(&self, key: &RecordKey) -> Option<EntityId> {
        self.record_entity.get(key).copied()
    }

    /// Entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&EntityState> {
        self.entities.get(&id)
    }

    /// Relationships of `id`, ascending by related entity id.
    pub fn related(&self, id: EntityId) -> impl Iterator<Item = (EntityId, &Relation)> {
        self.relations
            .get(&id)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (*k, v)))
    }

    /// Relationship between two entities, if any.
    pub fn relation(&self, a: EntityId, b: EntityId) -> Option<&Relation> {
        self.relations.get(&a).and_then(|m| m.get(&b))
    }

    /// Distinct data sources of an entity's records.
    pub fn data_sources(&self, id: EntityId) -> BTreeSet<&str> {
        self.entities
            .get(&id)
            .map(|e| e.records.iter().map(|k| k.data_source.as_str()).collect())
            .unwrap_or_default()
    }

    /// Entities whose membership differs between `self` and `after`, plus the
    /// entities holding any of `subjects` on either side.
    pub fn affected(&self, after: &Resolution, subjects: &[RecordKey]) -> BTreeSet<EntityId> {
        let mut affected = BTreeSet::new();
        for key in subjects {
            affected.extend(self.entity_of(key));
            affected.extend(after.entity_of(key));
        }
        let keys: BTreeSet<&RecordKey> = self
            .record_entity
            .keys()
            .chain(after.record_entity.keys())
            .collect();
        for key in keys {
            let (before, now) = (self.entity_of(key), after.entity_of(key));
            if before != now {
                affected.extend(before);
                affected.extend(now);
            }
        }
        // An entity id that changed hands without a membership change still
        // needs reporting; an id that no longer exists is reported as well.
        for (id, entity) in &self.entities {
            match after.entities.get(id) {
                Some(now) if now.records == entity.records => {}
                _ => {
                    affected.insert(*id);
                }
            }
        }
        affected
    }
}
