//! Response documents.

use std::collections::BTreeMap;

use erbind_core::{EngineFlags, EntityId, RecordKey};
use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value};

use crate::features::{Feature, FeatureKind, Match, MatchLevel};
use crate::repository::{Relation, Repository, Resolution};

/// `{"NAME":[{"FEAT_DESC":..}], ..}` for a feature set.
pub fn features_document<'a>(features: impl IntoIterator<Item = &'a Feature>, representative: bool) -> Value {
    let mut by_kind: BTreeMap<FeatureKind, Vec<Value>> = BTreeMap::new();
    for feature in features {
        let values = by_kind.entry(feature.kind).or_default();
        let desc = json!({ "FEAT_DESC": feature.value });
        if !values.contains(&desc) && !(representative && !values.is_empty()) {
            values.push(desc);
        }
    }
    Value::Object(
        by_kind
            .into_iter()
            .map(|(kind, values)| (kind.code().to_string(), Value::Array(values)))
            .collect(),
    )
}

/// `{"NAME":[{"INBOUND_FEAT_DESC":..,"CANDIDATE_FEAT_DESC":..,"SCORE":100}], ..}`
pub fn feature_scores(matched: &Match) -> Value {
    let mut by_kind: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for feature in &matched.shared {
        by_kind.entry(feature.kind.code()).or_default().push(json!({
            "INBOUND_FEAT_DESC": feature.value,
            "CANDIDATE_FEAT_DESC": feature.value,
            "SCORE": 100,
        }));
    }
    json!(by_kind)
}

fn best_name(repo: &Repository, records: &[RecordKey]) -> String {
    records
        .iter()
        .filter_map(|k| repo.get(k))
        .flat_map(|r| r.features.iter())
        .find(|f| f.kind == FeatureKind::Name)
        .map(|f| f.value.clone())
        .unwrap_or_default()
}

fn record_summary(records: &[RecordKey]) -> Value {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for key in records {
        *counts.entry(key.data_source.as_str()).or_default() += 1;
    }
    Value::Array(
        counts
            .into_iter()
            .map(|(ds, n)| json!({ "DATA_SOURCE": ds, "RECORD_COUNT": n }))
            .collect(),
    )
}

/// The `RESOLVED_ENTITY` section for a set of records.
pub fn resolved_entity(
    repo: &Repository,
    entity_id: EntityId,
    records: &[RecordKey],
    match_info: &FxHashMap<RecordKey, (String, &'static str)>,
    flags: EngineFlags,
) -> Value {
    let mut entity = Map::new();
    entity.insert("ENTITY_ID".into(), json!(entity_id));
    if flags.contains(EngineFlags::ENTITY_INCLUDE_ENTITY_NAME) {
        entity.insert("ENTITY_NAME".into(), json!(best_name(repo, records)));
    }
    let all = flags.contains(EngineFlags::ENTITY_INCLUDE_ALL_FEATURES);
    if all || flags.contains(EngineFlags::ENTITY_INCLUDE_REPRESENTATIVE_FEATURES) {
        let features = records.iter().filter_map(|k| repo.get(k)).flat_map(|r| r.features.iter());
        entity.insert("FEATURES".into(), features_document(features, !all));
    }
    if flags.contains(EngineFlags::ENTITY_INCLUDE_RECORD_SUMMARY) {
        entity.insert("RECORD_SUMMARY".into(), record_summary(records));
    }
    if flags.intersects(
        EngineFlags::ENTITY_INCLUDE_RECORD_DATA
            | EngineFlags::ENTITY_INCLUDE_RECORD_MATCHING_INFO
            | EngineFlags::ENTITY_INCLUDE_RECORD_JSON_DATA
            | EngineFlags::ENTITY_INCLUDE_RECORD_FEATURES,
    ) {
        let rows = records
            .iter()
            .filter_map(|k| repo.get(k))
            .map(|record| {
                let mut row = Map::new();
                row.insert("DATA_SOURCE".into(), json!(record.key.data_source));
                row.insert("RECORD_ID".into(), json!(record.key.record_id));
                row.insert("INTERNAL_ID".into(), json!(record.seq));
                if flags.contains(EngineFlags::ENTITY_INCLUDE_RECORD_MATCHING_INFO) {
                    let (key, rule) = match_info
                        .get(&record.key)
                        .map(|(k, r)| (k.as_str(), *r))
                        .unwrap_or(("", ""));
                    row.insert("MATCH_KEY".into(), json!(key));
                    row.insert("ERRULE_CODE".into(), json!(rule));
                    let level = if key.is_empty() { "" } else { MatchLevel::Resolved.code() };
                    row.insert("MATCH_LEVEL_CODE".into(), json!(level));
                }
                if flags.contains(EngineFlags::ENTITY_INCLUDE_RECORD_JSON_DATA) {
                    row.insert("JSON_DATA".into(), Value::Object(record.json.clone()));
                }
                if flags.contains(EngineFlags::ENTITY_INCLUDE_RECORD_FEATURES) {
                    row.insert("FEATURES".into(), features_document(&record.features, false));
                }
                Value::Object(row)
            })
            .collect();
        entity.insert("RECORDS".into(), Value::Array(rows));
    }
    Value::Object(entity)
}

/// True if `relation` is selected by the relationship options in `flags`.
pub fn relation_selected(relation: &Relation, flags: EngineFlags) -> bool {
    match relation.level {
        MatchLevel::PossiblyRelated => flags.contains(EngineFlags::ENTITY_INCLUDE_POSSIBLY_RELATED_RELATIONS),
        MatchLevel::NameOnly => flags.contains(EngineFlags::ENTITY_INCLUDE_NAME_ONLY_RELATIONS),
        _ => false,
    }
}

fn related_entities(repo: &Repository, res: &Resolution, entity_id: EntityId, flags: EngineFlags) -> Value {
    let rows = res
        .related(entity_id)
        .filter(|(_, rel)| relation_selected(rel, flags))
        .map(|(other, rel)| {
            let mut row = Map::new();
            row.insert("ENTITY_ID".into(), json!(other));
            if flags.contains(EngineFlags::ENTITY_INCLUDE_RELATED_MATCHING_INFO) {
                row.insert("MATCH_LEVEL_CODE".into(), json!(rel.level.code()));
                row.insert("MATCH_KEY".into(), json!(rel.key));
            }
            let records = res.entity(other).map(|e| e.records.as_slice()).unwrap_or_default();
            if flags.contains(EngineFlags::ENTITY_INCLUDE_RELATED_ENTITY_NAME) {
                row.insert("ENTITY_NAME".into(), json!(best_name(repo, records)));
            }
            if flags.contains(EngineFlags::ENTITY_INCLUDE_RELATED_RECORD_SUMMARY) {
                row.insert("RECORD_SUMMARY".into(), record_summary(records));
            }
            Value::Object(row)
        })
        .collect();
    Value::Array(rows)
}

/// `{"RESOLVED_ENTITY":{..},"RELATED_ENTITIES":[..]}` for a resolved entity.
///
/// Returns `None` if the entity does not exist.
pub fn entity_document(repo: &Repository, res: &Resolution, entity_id: EntityId, flags: EngineFlags) -> Option<Value> {
    let entity = res.entity(entity_id)?;
    let mut doc = Map::new();
    doc.insert(
        "RESOLVED_ENTITY".into(),
        resolved_entity(repo, entity.id, &entity.records, &entity.match_info, flags),
    );
    if flags.intersects(EngineFlags::ENTITY_INCLUDE_ALL_RELATIONS) {
        doc.insert("RELATED_ENTITIES".into(), related_entities(repo, res, entity_id, flags));
    }
    Some(Value::Object(doc))
}

/// Entity documents for `ids`, skipping unknown ids.
pub fn entity_documents(
    repo: &Repository,
    res: &Resolution,
    ids: impl IntoIterator<Item = EntityId>,
    flags: EngineFlags,
) -> Value {
    Value::Array(
        ids.into_iter()
            .filter_map(|id| entity_document(repo, res, id, flags))
            .collect(),
    )
}

/// Link rows between consecutive or related entities.
pub fn links(res: &Resolution, pairs: impl IntoIterator<Item = (EntityId, EntityId)>) -> Value {
    Value::Array(
        pairs
            .into_iter()
            .filter_map(|(a, b)| {
                let rel = res.relation(a, b)?;
                Some(json!({
                    "MIN_ENTITY_ID": a.min(b),
                    "MAX_ENTITY_ID": a.max(b),
                    "MATCH_LEVEL_CODE": rel.level.code(),
                    "MATCH_KEY": rel.key,
                }))
            })
            .collect(),
    )
}

/// `MATCH_INFO` section used by why and search responses.
pub fn match_info(matched: &Match, key_field: &str, rule_field: &str, flags: EngineFlags) -> Value {
    let mut info = Map::new();
    info.insert(key_field.into(), json!(matched.key()));
    info.insert(rule_field.into(), json!(matched.rule()));
    info.insert("MATCH_LEVEL_CODE".into(), json!(matched.level.code()));
    if flags.contains(EngineFlags::INCLUDE_FEATURE_SCORES) {
        info.insert("FEATURE_SCORES".into(), feature_scores(matched));
    }
    Value::Object(info)
}

/// A stored record as returned by `get_record`.
pub fn record_document(repo: &Repository, key: &RecordKey, flags: EngineFlags) -> Option<Value> {
    let record = repo.get(key)?;
    let mut doc = Map::new();
    doc.insert("DATA_SOURCE".into(), json!(record.key.data_source));
    doc.insert("RECORD_ID".into(), json!(record.key.record_id));
    if flags.contains(EngineFlags::ENTITY_INCLUDE_RECORD_JSON_DATA) {
        doc.insert("JSON_DATA".into(), Value::Object(record.json.clone()));
    }
    if flags.contains(EngineFlags::ENTITY_INCLUDE_RECORD_FEATURES) {
        doc.insert("FEATURES".into(), features_document(&record.features, false));
    }
    Some(Value::Object(doc))
}
