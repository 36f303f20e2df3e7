//! Search, why and how documents.

use std::collections::BTreeSet;

use erbind_core::{EngineFlags, EntityId, RecordKey};
use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value};

use crate::features::{compare, Feature, Match, MatchLevel};
use crate::render::{entity_documents, feature_scores, match_info, resolved_entity};
use crate::repository::{EntityState, Repository, Resolution, StoredRecord};

/// Search scoring preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Every candidate level (the default)
    Search,
    /// Only candidates that would resolve
    Ingest,
}

impl Profile {
    /// Parse a profile name; `""` selects [`Profile::Search`].
    pub fn parse(name: &str) -> Option<Profile> {
        match name.trim().to_uppercase().as_str() {
            "" | "SEARCH" => Some(Profile::Search),
            "INGEST" => Some(Profile::Ingest),
            _ => None,
        }
    }

    fn admits(&self, level: MatchLevel) -> bool {
        match self {
            Profile::Search => level != MatchLevel::None,
            Profile::Ingest => level == MatchLevel::Resolved,
        }
    }
}

/// Union of the features of an entity's records.
pub fn entity_features(repo: &Repository, entity: &EntityState) -> Vec<Feature> {
    let mut features: Vec<Feature> = entity
        .records
        .iter()
        .filter_map(|k| repo.get(k))
        .flat_map(|r| r.features.iter().cloned())
        .collect();
    features.sort();
    features.dedup();
    features
}

/// Strongest record-pair match between two entities.
fn best_pair_match(repo: &Repository, a: &EntityState, b: &EntityState) -> Match {
    let left: Vec<&StoredRecord> = a.records.iter().filter_map(|k| repo.get(k)).collect();
    let right: Vec<&StoredRecord> = b.records.iter().filter_map(|k| repo.get(k)).collect();
    left.iter()
        .flat_map(|l| right.iter().map(move |r| compare(&l.features, &r.features)))
        .min_by(|x, y| x.level.cmp(&y.level).then(y.shared.len().cmp(&x.shared.len())))
        .unwrap_or(Match {
            shared: Vec::new(),
            level: MatchLevel::None,
        })
}

fn focus(key: &RecordKey) -> Value {
    json!([{ "DATA_SOURCE": key.data_source, "RECORD_ID": key.record_id }])
}

fn why_info(matched: &Match, flags: EngineFlags) -> Value {
    match_info(matched, "WHY_KEY", "WHY_ERRULE_CODE", flags)
}

fn search_statistics(res: &Resolution, repo: &Repository, features: &[Feature], returned: usize) -> Value {
    let kinds: BTreeSet<_> = features.iter().map(|f| f.kind).collect();
    let found = kinds
        .iter()
        .filter(|kind| {
            res.entities.values().any(|e| {
                entity_features(repo, e)
                    .iter()
                    .any(|f| f.kind == **kind && features.contains(f))
            })
        })
        .count();
    json!([{
        "CANDIDATE_KEYS": {
            "FEATURE_TYPES": kinds.iter().map(|k| k.code()).collect::<Vec<_>>(),
            "FOUND": found,
            "NOT_FOUND": kinds.len() - found,
        },
        "CANDIDATES_RETURNED": returned,
    }])
}

fn level_requested(level: MatchLevel, flags: EngineFlags) -> bool {
    let levels = EngineFlags::SEARCH_INCLUDE_RESOLVED
        | EngineFlags::SEARCH_INCLUDE_POSSIBLY_RELATED
        | EngineFlags::SEARCH_INCLUDE_NAME_ONLY;
    if !flags.intersects(levels) {
        return true;
    }
    match level {
        MatchLevel::Resolved => flags.contains(EngineFlags::SEARCH_INCLUDE_RESOLVED),
        MatchLevel::PossiblyRelated => flags.contains(EngineFlags::SEARCH_INCLUDE_POSSIBLY_RELATED),
        MatchLevel::NameOnly => flags.contains(EngineFlags::SEARCH_INCLUDE_NAME_ONLY),
        MatchLevel::None => false,
    }
}

/// Ranked candidate entities for an attribute bag.
///
/// Candidates are ordered by level (resolved first), then score, then id.
pub fn search(repo: &Repository, res: &Resolution, features: &[Feature], profile: Profile, flags: EngineFlags) -> Value {
    let mut candidates: Vec<(EntityId, Match)> = res
        .entities
        .values()
        .map(|e| (e.id, compare(features, &entity_features(repo, e))))
        .filter(|(_, m)| profile.admits(m.level) && level_requested(m.level, flags))
        .collect();
    candidates.sort_by(|(a_id, a), (b_id, b)| {
        a.level
            .cmp(&b.level)
            .then(b.score().cmp(&a.score()))
            .then(a_id.cmp(b_id))
    });

    let rows: Vec<Value> = candidates
        .iter()
        .filter_map(|(id, matched)| {
            let entity = res.entity(*id)?;
            let mut info = match_info(matched, "MATCH_KEY", "ERRULE_CODE", flags);
            if let Value::Object(ref mut map) = info {
                map.insert("SCORE".into(), json!(matched.score()));
            }
            Some(json!({
                "MATCH_INFO": info,
                "ENTITY": {
                    "RESOLVED_ENTITY": resolved_entity(repo, entity.id, &entity.records, &entity.match_info, flags),
                },
            }))
        })
        .collect();

    let mut doc = Map::new();
    let returned = rows.len();
    doc.insert("RESOLVED_ENTITIES".into(), Value::Array(rows));
    if flags.contains(EngineFlags::SEARCH_INCLUDE_STATS) {
        doc.insert("SEARCH_STATISTICS".into(), search_statistics(res, repo, features, returned));
    }
    Value::Object(doc)
}

/// Why two entities are or are not one.
pub fn why_entities(repo: &Repository, res: &Resolution, a: &EntityState, b: &EntityState, flags: EngineFlags) -> Value {
    let matched = if a.id == b.id {
        let features = entity_features(repo, a);
        Match {
            shared: features,
            level: MatchLevel::Resolved,
        }
    } else {
        best_pair_match(repo, a, b)
    };
    let mut ids = vec![a.id, b.id];
    ids.dedup();
    json!({
        "WHY_RESULTS": [{
            "ENTITY_ID": a.id,
            "ENTITY_ID_2": b.id,
            "MATCH_INFO": why_info(&matched, flags),
        }],
        "ENTITIES": entity_documents(repo, res, ids, flags),
    })
}

/// Why two records are or are not in the same entity.
pub fn why_records(
    repo: &Repository,
    res: &Resolution,
    first: &StoredRecord,
    second: &StoredRecord,
    flags: EngineFlags,
) -> Value {
    let mut matched = compare(&first.features, &second.features);
    let (e1, e2) = (res.entity_of(&first.key), res.entity_of(&second.key));
    if e1.is_some() && e1 == e2 {
        matched.level = MatchLevel::Resolved;
    }
    let ids: BTreeSet<EntityId> = e1.into_iter().chain(e2).collect();
    json!({
        "WHY_RESULTS": [{
            "ENTITY_ID": e1,
            "FOCUS_RECORDS": focus(&first.key),
            "ENTITY_ID_2": e2,
            "FOCUS_RECORDS_2": focus(&second.key),
            "MATCH_INFO": why_info(&matched, flags),
        }],
        "ENTITIES": entity_documents(repo, res, ids, flags),
    })
}

/// Why a record belongs to its entity.
pub fn why_record_in_entity(
    repo: &Repository,
    res: &Resolution,
    record: &StoredRecord,
    entity: &EntityState,
    flags: EngineFlags,
) -> Value {
    let mut others: Vec<Feature> = entity
        .records
        .iter()
        .filter(|k| **k != record.key)
        .filter_map(|k| repo.get(k))
        .flat_map(|r| r.features.iter().cloned())
        .collect();
    others.sort();
    others.dedup();
    let mut matched = compare(&record.features, &others);
    matched.level = MatchLevel::Resolved;
    json!({
        "WHY_RESULTS": [{
            "ENTITY_ID": entity.id,
            "FOCUS_RECORDS": focus(&record.key),
            "MATCH_INFO": why_info(&matched, flags),
        }],
        "ENTITIES": entity_documents(repo, res, [entity.id], flags),
    })
}

/// Why an entity is or is not a candidate for an attribute bag.
pub fn why_search(
    repo: &Repository,
    res: &Resolution,
    features: &[Feature],
    entity: &EntityState,
    profile: Profile,
    flags: EngineFlags,
) -> Value {
    let matched = compare(features, &entity_features(repo, entity));
    let mut doc = Map::new();
    doc.insert(
        "WHY_RESULTS".into(),
        json!([{
            "ENTITY_ID": entity.id,
            "CANDIDATE": profile.admits(matched.level),
            "MATCH_INFO": why_info(&matched, flags),
        }]),
    );
    if flags.contains(EngineFlags::SEARCH_INCLUDE_STATS) {
        let returned = usize::from(profile.admits(matched.level));
        doc.insert("SEARCH_STATISTICS".into(), search_statistics(res, repo, features, returned));
    }
    doc.insert("ENTITIES".into(), entity_documents(repo, res, [entity.id], flags));
    Value::Object(doc)
}

/// Merge history of an entity and its final virtual entity.
pub fn how_entity(repo: &Repository, res: &Resolution, entity: &EntityState, flags: EngineFlags) -> Value {
    let steps: Vec<Value> = res
        .steps
        .iter()
        .filter(|s| s.entity_id == entity.id)
        .enumerate()
        .map(|(i, step)| {
            let mut info = Map::new();
            info.insert("MATCH_KEY".into(), json!(step.matched.key()));
            info.insert("ERRULE_CODE".into(), json!(step.matched.rule()));
            if flags.contains(EngineFlags::INCLUDE_FEATURE_SCORES) {
                info.insert("FEATURE_SCORES".into(), feature_scores(&step.matched));
            }
            json!({
                "STEP": i + 1,
                "INBOUND_VIRTUAL_ENTITY_ID": step.inbound,
                "CANDIDATE_VIRTUAL_ENTITY_ID": step.candidate,
                "RESULT_VIRTUAL_ENTITY_ID": step.result,
                "MATCH_INFO": info,
            })
        })
        .collect();
    let final_id = res
        .steps
        .iter()
        .rev()
        .find(|s| s.entity_id == entity.id)
        .map(|s| s.result.clone())
        .unwrap_or_else(|| format!("V{}", entity.id));
    let members: Vec<Value> = entity
        .records
        .iter()
        .filter_map(|k| repo.get(k))
        .map(|r| {
            json!({
                "INTERNAL_ID": r.seq,
                "RECORDS": focus(&r.key),
            })
        })
        .collect();
    json!({
        "HOW_RESULTS": {
            "RESOLUTION_STEPS": steps,
            "FINAL_STATE": {
                "NEED_REEVALUATION": 0,
                "VIRTUAL_ENTITIES": [{
                    "VIRTUAL_ENTITY_ID": final_id,
                    "MEMBER_RECORDS": members,
                }],
            },
        },
    })
}

/// A hypothetical entity made of exactly `records`.
///
/// Each record after the first is matched against the features of the
/// records before it.
pub fn virtual_entity(repo: &Repository, mut records: Vec<&StoredRecord>, flags: EngineFlags) -> Value {
    records.sort_by_key(|r| r.seq);
    let mut seen: Vec<Feature> = Vec::new();
    let mut info: FxHashMap<RecordKey, (String, &'static str)> = FxHashMap::default();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            let matched = compare(&record.features, &seen);
            info.insert(record.key.clone(), (matched.key(), matched.rule()));
        }
        seen.extend(record.features.iter().cloned());
        seen.sort();
        seen.dedup();
    }
    let id = records.first().map(|r| r.seq).unwrap_or_default();
    let keys: Vec<RecordKey> = records.iter().map(|r| r.key.clone()).collect();
    json!({ "RESOLVED_ENTITY": resolved_entity(repo, id, &keys, &info, flags) })
}
