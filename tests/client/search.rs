//! Search and Explainability Tests

use crate::common::*;
use erbind::EngineFlags;
use erbind_memory::codes;
use serde_json::Value;

const ROBERT: &str = r#"{"NAME_FULL": "Robert Smith", "PHONE_NUMBER": "702 555 0100"}"#;

fn candidates(doc: &Value) -> Vec<i64> {
    doc["RESOLVED_ENTITIES"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["ENTITY"]["RESOLVED_ENTITY"]["ENTITY_ID"].as_i64().unwrap())
        .collect()
}

fn why_level(doc: &Value) -> &str {
    doc["WHY_RESULTS"][0]["MATCH_INFO"]["MATCH_LEVEL_CODE"].as_str().unwrap()
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn search_ranks_resolving_candidates_first() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .search_by_attributes(ROBERT, None, EngineFlags::SEARCH_BY_ATTRIBUTES_DEFAULT_FLAGS)
            .unwrap(),
    );
    assert_eq!(candidates(&doc), vec![1, 4]);
    assert_eq!(doc["RESOLVED_ENTITIES"][0]["MATCH_INFO"]["MATCH_LEVEL_CODE"], "RESOLVED");
    assert_eq!(doc["RESOLVED_ENTITIES"][1]["MATCH_INFO"]["MATCH_LEVEL_CODE"], "POSSIBLY_RELATED");
    assert!(doc.get("SEARCH_STATISTICS").is_some());
}

#[test]
fn search_level_flags_filter_candidates() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .search_by_attributes(ROBERT, None, EngineFlags::SEARCH_INCLUDE_RESOLVED)
            .unwrap(),
    );
    assert_eq!(candidates(&doc), vec![1]);
    assert!(doc.get("SEARCH_STATISTICS").is_none());
}

#[test]
fn search_profiles() {
    let resolver = create_loaded_resolver();
    let default = resolver.search_by_attributes(ROBERT, None, EngineFlags::NO_FLAGS).unwrap();
    let explicit = resolver
        .search_by_attributes(ROBERT, Some("SEARCH"), EngineFlags::NO_FLAGS)
        .unwrap();
    assert_eq!(parse(&default), parse(&explicit));

    let ingest = parse(
        &resolver
            .search_by_attributes(ROBERT, Some("INGEST"), EngineFlags::NO_FLAGS)
            .unwrap(),
    );
    assert_eq!(candidates(&ingest), vec![1]);

    assert_eq!(
        code_of(resolver.search_by_attributes(ROBERT, Some("NOPE"), EngineFlags::NO_FLAGS)),
        codes::UNKNOWN_SEARCH_PROFILE
    );
}

#[test]
fn search_without_candidates_is_empty_not_an_error() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .search_by_attributes(r#"{"NAME_FULL": "Nobody Here"}"#, None, EngineFlags::NO_FLAGS)
            .unwrap(),
    );
    assert!(candidates(&doc).is_empty());
    assert_eq!(
        code_of(resolver.search_by_attributes("NAME_FULL", None, EngineFlags::NO_FLAGS)),
        codes::BAD_INPUT
    );
}

// ============================================================================
// Why
// ============================================================================

#[test]
fn why_entities_reports_the_relationship() {
    let resolver = create_loaded_resolver();
    let flags = EngineFlags::WHY_ENTITIES_DEFAULT_FLAGS;
    let related = parse(&resolver.why_entities(1, 4, flags).unwrap());
    assert_eq!(why_level(&related), "POSSIBLY_RELATED");
    assert_eq!(related["WHY_RESULTS"][0]["MATCH_INFO"]["WHY_KEY"], "+PHONE");
    assert!(related["WHY_RESULTS"][0]["MATCH_INFO"]["FEATURE_SCORES"]["PHONE"].is_array());
    assert_eq!(entity_ids(&related["ENTITIES"]), vec![1, 4]);

    let name_only = parse(&resolver.why_entities(3, 5, flags).unwrap());
    assert_eq!(why_level(&name_only), "NAME_ONLY");

    let same = parse(&resolver.why_entities(1, 1, flags).unwrap());
    assert_eq!(why_level(&same), "RESOLVED");

    assert_eq!(code_of(resolver.why_entities(1, 2, flags)), codes::UNKNOWN_ENTITY);
}

#[test]
fn why_records_and_record_in_entity() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .why_records(&key("CRM", "1001"), &key("TEST", "2001"), EngineFlags::WHY_RECORDS_DEFAULT_FLAGS)
            .unwrap(),
    );
    assert_eq!(why_level(&doc), "RESOLVED");
    assert_eq!(doc["WHY_RESULTS"][0]["ENTITY_ID"], 1);
    assert_eq!(doc["WHY_RESULTS"][0]["ENTITY_ID_2"], 1);

    let doc = parse(
        &resolver
            .why_record_in_entity(&key("TEST", "2001"), EngineFlags::WHY_RECORD_IN_ENTITY_DEFAULT_FLAGS)
            .unwrap(),
    );
    assert_eq!(doc["WHY_RESULTS"][0]["ENTITY_ID"], 1);
    assert_eq!(doc["WHY_RESULTS"][0]["FOCUS_RECORDS"][0]["RECORD_ID"], "2001");

    assert_eq!(
        code_of(resolver.why_record_in_entity(&key("TEST", "nope"), EngineFlags::NO_FLAGS)),
        codes::UNKNOWN_RECORD
    );
}

#[test]
fn why_search_explains_candidacy() {
    let resolver = create_loaded_resolver();
    let flags = EngineFlags::WHY_SEARCH_DEFAULT_FLAGS;
    let candidate = parse(&resolver.why_search(ROBERT, 4, None, flags).unwrap());
    assert_eq!(candidate["WHY_RESULTS"][0]["CANDIDATE"], true);
    assert!(candidate.get("SEARCH_STATISTICS").is_some());

    let stranger = parse(&resolver.why_search(ROBERT, 3, None, flags).unwrap());
    assert_eq!(stranger["WHY_RESULTS"][0]["CANDIDATE"], false);

    let ingest = parse(&resolver.why_search(ROBERT, 4, Some("INGEST"), flags).unwrap());
    assert_eq!(ingest["WHY_RESULTS"][0]["CANDIDATE"], false);
}

// ============================================================================
// How
// ============================================================================

#[test]
fn how_entity_lists_resolution_steps() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .how_entity_by_entity_id(1, EngineFlags::HOW_ENTITY_DEFAULT_FLAGS)
            .unwrap(),
    );
    let how = &doc["HOW_RESULTS"];
    let steps = how["RESOLUTION_STEPS"].as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["STEP"], 1);
    assert!(steps[0]["MATCH_INFO"]["FEATURE_SCORES"].is_object());
    let members = how["FINAL_STATE"]["VIRTUAL_ENTITIES"][0]["MEMBER_RECORDS"]
        .as_array()
        .unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(
        how["FINAL_STATE"]["VIRTUAL_ENTITIES"][0]["VIRTUAL_ENTITY_ID"],
        steps[0]["RESULT_VIRTUAL_ENTITY_ID"]
    );
}

#[test]
fn how_singleton_has_no_steps() {
    let resolver = create_loaded_resolver();
    let doc = parse(&resolver.how_entity_by_entity_id(3, EngineFlags::NO_FLAGS).unwrap());
    assert!(doc["HOW_RESULTS"]["RESOLUTION_STEPS"].as_array().unwrap().is_empty());
    assert_eq!(
        code_of(resolver.how_entity_by_entity_id(2, EngineFlags::NO_FLAGS)),
        codes::UNKNOWN_ENTITY
    );
}
