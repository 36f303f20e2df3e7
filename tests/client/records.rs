//! Record Mutation Tests
//!
//! Add / delete / reevaluate, with-info responses and the redo queue.

use crate::common::*;
use erbind::EngineFlags;
use erbind_memory::codes;

fn affected(info: &str) -> Vec<i64> {
    entity_ids(&parse(info)["AFFECTED_ENTITIES"])
}

// ============================================================================
// Add
// ============================================================================

#[test]
fn fixture_resolves_as_documented() {
    let resolver = create_loaded_resolver();
    assert_eq!(entity_of(&resolver, &key("CRM", "1001")), 1);
    assert_eq!(entity_of(&resolver, &key("TEST", "2001")), 1);
    assert_eq!(entity_of(&resolver, &key("TEST", "2002")), 3);
    assert_eq!(entity_of(&resolver, &key("CRM", "1002")), 4);
    assert_eq!(entity_of(&resolver, &key("SEARCH", "3001")), 5);
}

#[test]
fn add_is_idempotent() {
    let resolver = create_loaded_resolver();
    let k = key("TEST", "2001");
    let before = resolver.get_entity_by_record_id(&k, EngineFlags::ENTITY_DEFAULT_FLAGS).unwrap();
    let (_, _, doc) = FIXTURE[1];
    resolver.add_record(&k, doc, EngineFlags::NO_FLAGS).unwrap();
    let after = resolver.get_entity_by_record_id(&k, EngineFlags::ENTITY_DEFAULT_FLAGS).unwrap();
    assert_eq!(parse(&before), parse(&after));
}

#[test]
fn with_info_names_affected_entities() {
    let resolver = create_loaded_resolver();
    let quiet = resolver
        .add_record(&key("TEST", "2003"), r#"{"NAME_FULL": "Lou Fox"}"#, EngineFlags::NO_FLAGS)
        .unwrap();
    assert_eq!(quiet, "");

    // Moving TEST:2001 out of entity 1 touches both sides of the split.
    let info = resolver
        .add_record(&key("TEST", "2001"), r#"{"NAME_FULL": "Zed Quinn"}"#, EngineFlags::WITH_INFO)
        .unwrap();
    let doc = parse(&info);
    assert_eq!(doc["DATA_SOURCE"], "TEST");
    assert_eq!(doc["RECORD_ID"], "2001");
    let ids = affected(&info);
    assert!(ids.contains(&1), "affected: {:?}", ids);
    assert!(ids.contains(&2), "affected: {:?}", ids);
    assert_eq!(entity_of(&resolver, &key("TEST", "2001")), 2);
}

#[test]
fn unknown_data_source_is_an_engine_error() {
    let resolver = create_resolver();
    let code = code_of(resolver.add_record(&key("ERP", "1"), "{}", EngineFlags::NO_FLAGS));
    assert_eq!(code, codes::UNKNOWN_DATA_SOURCE);
}

#[test]
fn data_sources_are_case_sensitive() {
    let resolver = create_resolver();
    let code = code_of(resolver.add_record(&key("crm", "1"), "{}", EngineFlags::NO_FLAGS));
    assert_eq!(code, codes::UNKNOWN_DATA_SOURCE);
}

#[test]
fn embedded_key_must_agree() {
    let resolver = create_resolver();
    let code = code_of(resolver.add_record(
        &key("CRM", "1"),
        r#"{"DATA_SOURCE": "TEST", "NAME_FULL": "Ann Lee"}"#,
        EngineFlags::NO_FLAGS,
    ));
    assert_eq!(code, codes::BAD_INPUT);
    resolver
        .add_record(
            &key("CRM", "1"),
            r#"{"DATA_SOURCE": "CRM", "RECORD_ID": "1", "NAME_FULL": "Ann Lee"}"#,
            EngineFlags::NO_FLAGS,
        )
        .unwrap();
}

#[test]
fn malformed_record_is_bad_input() {
    let resolver = create_resolver();
    let code = code_of(resolver.add_record(&key("CRM", "1"), "NAME_FULL=Ann", EngineFlags::NO_FLAGS));
    assert_eq!(code, codes::BAD_INPUT);
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn delete_of_unknown_record_succeeds() {
    let resolver = create_loaded_resolver();
    let info = resolver
        .delete_record(&key("TEST", "no-such-record"), EngineFlags::WITH_INFO)
        .unwrap();
    assert!(affected(&info).is_empty());
}

#[test]
fn deleted_record_is_gone() {
    let resolver = create_loaded_resolver();
    let k = key("SEARCH", "3001");
    resolver.delete_record(&k, EngineFlags::NO_FLAGS).unwrap();
    assert_eq!(code_of(resolver.get_record(&k, EngineFlags::NO_FLAGS)), codes::UNKNOWN_RECORD);
    assert_eq!(
        code_of(resolver.get_entity_by_entity_id(5, EngineFlags::NO_FLAGS)),
        codes::UNKNOWN_ENTITY
    );
    // Deleting twice is still fine.
    resolver.delete_record(&k, EngineFlags::NO_FLAGS).unwrap();
}

// ============================================================================
// Reevaluate
// ============================================================================

#[test]
fn reevaluate_without_change_is_idempotent() {
    let resolver = create_loaded_resolver();
    let before = resolver.get_entity_by_entity_id(1, EngineFlags::ENTITY_DEFAULT_FLAGS).unwrap();
    resolver.reevaluate_record(&key("CRM", "1001"), EngineFlags::NO_FLAGS).unwrap();
    resolver.reevaluate_entity(1, EngineFlags::NO_FLAGS).unwrap();
    let after = resolver.get_entity_by_entity_id(1, EngineFlags::ENTITY_DEFAULT_FLAGS).unwrap();
    assert_eq!(parse(&before), parse(&after));
}

#[test]
fn reevaluate_of_unknown_targets_is_a_no_op() {
    let resolver = create_loaded_resolver();
    let info = resolver
        .reevaluate_record(&key("TEST", "missing"), EngineFlags::WITH_INFO)
        .unwrap();
    assert!(affected(&info).is_empty());
    resolver.reevaluate_entity(999, EngineFlags::NO_FLAGS).unwrap();
}

// ============================================================================
// Redo
// ============================================================================

#[test]
fn delete_queues_redo_for_survivors() {
    let resolver = create_loaded_resolver();
    assert_eq!(resolver.count_redo_records().unwrap(), 0);
    assert_eq!(resolver.get_redo_record().unwrap(), "");

    resolver.delete_record(&key("CRM", "1001"), EngineFlags::NO_FLAGS).unwrap();
    assert_eq!(resolver.count_redo_records().unwrap(), 1);

    let redo = resolver.get_redo_record().unwrap();
    let doc = parse(&redo);
    assert_eq!(doc["DATA_SOURCE"], "TEST");
    assert_eq!(doc["RECORD_ID"], "2001");
    assert_eq!(resolver.count_redo_records().unwrap(), 0);

    let info = resolver.process_redo_record(&redo, EngineFlags::WITH_INFO).unwrap();
    assert_eq!(parse(&info)["RECORD_ID"], "2001");
    assert_eq!(entity_of(&resolver, &key("TEST", "2001")), 2);
}

#[test]
fn drain_processes_every_pending_record() {
    let resolver = create_loaded_resolver();
    resolver.delete_record(&key("CRM", "1001"), EngineFlags::NO_FLAGS).unwrap();
    assert_eq!(resolver.drain_redo_records(EngineFlags::NO_FLAGS, None).unwrap(), 1);
    assert_eq!(resolver.drain_redo_records(EngineFlags::NO_FLAGS, None).unwrap(), 0);
    assert_eq!(resolver.count_redo_records().unwrap(), 0);
}

#[test]
fn malformed_redo_record_is_bad_input() {
    let resolver = create_loaded_resolver();
    assert_eq!(
        code_of(resolver.process_redo_record("[]", EngineFlags::NO_FLAGS)),
        codes::BAD_INPUT
    );
    let missing_id = serde_json::json!({"DATA_SOURCE": "TEST"}).to_string();
    assert_eq!(
        code_of(resolver.process_redo_record(&missing_id, EngineFlags::NO_FLAGS)),
        codes::BAD_INPUT
    );
}
