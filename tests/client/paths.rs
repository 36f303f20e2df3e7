//! Relationship Tests
//!
//! Fixture relationship graph: 1 - 4 - 3 - 5.

use crate::common::*;
use erbind::EngineFlags;
use erbind_memory::codes;
use serde_json::Value;

fn path_of(doc: &Value) -> Vec<i64> {
    doc["ENTITY_PATHS"][0]["ENTITIES"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn shortest_path_between_entities() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .find_path_by_entity_id(1, 5, 3, &[], &[], EngineFlags::FIND_PATH_DEFAULT_FLAGS)
            .unwrap(),
    );
    assert_eq!(path_of(&doc), vec![1, 4, 3, 5]);
    assert_eq!(doc["ENTITY_PATH_LINKS"].as_array().unwrap().len(), 3);
    assert_eq!(entity_ids(&doc["ENTITIES"]), vec![1, 4, 3, 5]);
}

#[test]
fn degree_limit_yields_empty_path() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .find_path_by_entity_id(1, 5, 2, &[], &[], EngineFlags::FIND_PATH_DEFAULT_FLAGS)
            .unwrap(),
    );
    assert!(path_of(&doc).is_empty());
    // Both endpoints are still described.
    assert_eq!(entity_ids(&doc["ENTITIES"]), vec![1, 5]);
}

#[test]
fn avoidance_is_strict_unless_preferred() {
    let resolver = create_loaded_resolver();
    let strict = parse(
        &resolver
            .find_path_by_entity_id(1, 3, 5, &[4], &[], EngineFlags::NO_FLAGS)
            .unwrap(),
    );
    assert!(path_of(&strict).is_empty());
    assert_eq!(strict["ENTITY_PATHS"][0]["START_ENTITY_ID"], 1);
    assert_eq!(strict["ENTITY_PATHS"][0]["END_ENTITY_ID"], 3);

    let preferred = parse(
        &resolver
            .find_path_by_entity_id(1, 3, 5, &[4], &[], EngineFlags::FIND_PATH_PREFER_EXCLUDE)
            .unwrap(),
    );
    assert_eq!(path_of(&preferred), vec![1, 4, 3]);
}

#[test]
fn required_data_sources_constrain_the_path() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .find_path_by_entity_id(4, 5, 2, &[], &["SEARCH"], EngineFlags::NO_FLAGS)
            .unwrap(),
    );
    assert_eq!(path_of(&doc), vec![4, 3, 5]);

    // Neither 3 nor 5 carries CRM and one hop leaves no room for a detour.
    let doc = parse(
        &resolver
            .find_path_by_entity_id(3, 5, 1, &[], &["CRM"], EngineFlags::NO_FLAGS)
            .unwrap(),
    );
    assert!(path_of(&doc).is_empty());

    assert_eq!(
        code_of(resolver.find_path_by_entity_id(3, 5, 1, &[], &["ERP"], EngineFlags::NO_FLAGS)),
        codes::UNKNOWN_DATA_SOURCE
    );
}

#[test]
fn path_by_record_id() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .find_path_by_record_id(
                &key("TEST", "2001"),
                &key("SEARCH", "3001"),
                3,
                &[],
                &[],
                EngineFlags::FIND_PATH_DEFAULT_FLAGS,
            )
            .unwrap(),
    );
    assert_eq!(path_of(&doc), vec![1, 4, 3, 5]);

    let avoided = parse(
        &resolver
            .find_path_by_record_id(
                &key("TEST", "2001"),
                &key("SEARCH", "3001"),
                3,
                &[key("CRM", "1002")],
                &[],
                EngineFlags::NO_FLAGS,
            )
            .unwrap(),
    );
    assert!(path_of(&avoided).is_empty());
}

#[test]
fn path_argument_errors() {
    let resolver = create_loaded_resolver();
    assert_eq!(
        code_of(resolver.find_path_by_entity_id(1, 2, 3, &[], &[], EngineFlags::NO_FLAGS)),
        codes::UNKNOWN_ENTITY
    );
    assert_eq!(
        code_of(resolver.find_path_by_entity_id(1, 3, -1, &[], &[], EngineFlags::NO_FLAGS)),
        codes::BAD_INPUT
    );
    assert_eq!(
        code_of(resolver.find_path_by_record_id(
            &key("TEST", "nope"),
            &key("TEST", "2002"),
            3,
            &[],
            &[],
            EngineFlags::NO_FLAGS
        )),
        codes::UNKNOWN_RECORD
    );
}

// ============================================================================
// Networks
// ============================================================================

#[test]
fn network_connects_seeds() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .find_network_by_entity_id(&[1, 5], 3, 0, 10, EngineFlags::FIND_NETWORK_DEFAULT_FLAGS)
            .unwrap(),
    );
    assert_eq!(path_of(&doc), vec![1, 4, 3, 5]);
    assert_eq!(entity_ids(&doc["ENTITIES"]), vec![1, 3, 4, 5]);
    assert_eq!(doc["ENTITY_NETWORK_LINKS"].as_array().unwrap().len(), 3);
}

#[test]
fn build_out_respects_max_entities() {
    let resolver = create_loaded_resolver();
    let grown = parse(
        &resolver
            .find_network_by_entity_id(&[4], 0, 1, 10, EngineFlags::NO_FLAGS)
            .unwrap(),
    );
    assert_eq!(entity_ids(&grown["ENTITIES"]), vec![1, 3, 4]);

    let capped = parse(
        &resolver
            .find_network_by_entity_id(&[4], 0, 1, 2, EngineFlags::NO_FLAGS)
            .unwrap(),
    );
    assert_eq!(entity_ids(&capped["ENTITIES"]).len(), 2);

    // Seeds are always part of the network.
    let seeds_only = parse(
        &resolver
            .find_network_by_entity_id(&[4, 5], 0, 1, 0, EngineFlags::NO_FLAGS)
            .unwrap(),
    );
    assert_eq!(entity_ids(&seeds_only["ENTITIES"]), vec![4, 5]);
}

#[test]
fn network_by_record_id() {
    let resolver = create_loaded_resolver();
    let doc = parse(
        &resolver
            .find_network_by_record_id(
                &[key("CRM", "1001"), key("TEST", "2002")],
                2,
                0,
                10,
                EngineFlags::NO_FLAGS,
            )
            .unwrap(),
    );
    assert_eq!(path_of(&doc), vec![1, 4, 3]);
    assert_eq!(entity_ids(&doc["ENTITIES"]), vec![1, 3, 4]);
}

#[test]
fn network_requires_seeds() {
    let resolver = create_loaded_resolver();
    assert_eq!(
        code_of(resolver.find_network_by_entity_id(&[], 1, 0, 10, EngineFlags::NO_FLAGS)),
        codes::BAD_INPUT
    );
    assert_eq!(
        code_of(resolver.find_network_by_record_id(&[], 1, 0, 10, EngineFlags::NO_FLAGS)),
        codes::BAD_INPUT
    );
}
