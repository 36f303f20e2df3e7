//! Export Tests
//!
//! Handle lifecycle, snapshot semantics and report content.

use crate::common::*;
use erbind::{EngineFlags, Error};
use erbind_memory::codes;

fn drain(resolver: &erbind::Resolver, handle: erbind::ExportHandle) -> Vec<String> {
    let mut chunks = Vec::new();
    loop {
        let chunk = resolver.fetch_next(handle).unwrap();
        if chunk.is_empty() {
            return chunks;
        }
        chunks.push(chunk);
    }
}

fn json_ids(chunks: &[String]) -> Vec<i64> {
    chunks
        .iter()
        .map(|line| parse(line.trim_end())["RESOLVED_ENTITY"]["ENTITY_ID"].as_i64().unwrap())
        .collect()
}

// ============================================================================
// Handles
// ============================================================================

#[test]
fn handles_are_distinct_and_positive() {
    let resolver = create_loaded_resolver();
    let a = resolver.export_json_entity_report(EngineFlags::NO_FLAGS).unwrap();
    let b = resolver.export_csv_entity_report("*", EngineFlags::NO_FLAGS).unwrap();
    assert!(a.as_u64() > 0 && b.as_u64() > 0);
    assert_ne!(a, b);

    // Interleaved fetches do not disturb each other.
    assert!(!resolver.fetch_next(b).unwrap().is_empty());
    assert_eq!(json_ids(&drain(&resolver, a)), vec![1, 3, 4, 5]);
    resolver.close_export_report(a).unwrap();
    resolver.close_export_report(b).unwrap();
}

#[test]
fn exhausted_report_keeps_returning_empty_until_closed() {
    let resolver = create_loaded_resolver();
    let handle = resolver.export_json_entity_report(EngineFlags::NO_FLAGS).unwrap();
    drain(&resolver, handle);
    assert_eq!(resolver.fetch_next(handle).unwrap(), "");
    resolver.close_export_report(handle).unwrap();
    assert_eq!(
        resolver.fetch_next(handle),
        Err(Error::UnknownExportHandle {
            handle: handle.as_u64()
        })
    );
}

#[test]
fn destroy_invalidates_open_handles() {
    let resolver = create_loaded_resolver();
    let handle = resolver.export_json_entity_report(EngineFlags::NO_FLAGS).unwrap();
    let guard = resolver.export_json(EngineFlags::NO_FLAGS).unwrap();
    resolver.destroy().unwrap();
    assert_eq!(resolver.fetch_next(handle), Err(Error::Destroyed));
    // Dropping a guard after destroy is quiet.
    drop(guard);
}

// ============================================================================
// Content
// ============================================================================

#[test]
fn report_is_a_snapshot() {
    let resolver = create_loaded_resolver();
    let handle = resolver.export_json_entity_report(EngineFlags::NO_FLAGS).unwrap();
    resolver
        .add_record(&key("TEST", "9001"), r#"{"NAME_FULL": "Late Arrival"}"#, EngineFlags::NO_FLAGS)
        .unwrap();
    resolver.delete_record(&key("SEARCH", "3001"), EngineFlags::NO_FLAGS).unwrap();
    assert_eq!(json_ids(&drain(&resolver, handle)), vec![1, 3, 4, 5]);
    resolver.close_export_report(handle).unwrap();

    let fresh: Vec<String> = resolver
        .export_json(EngineFlags::NO_FLAGS)
        .unwrap()
        .map(|chunk| chunk.unwrap())
        .collect();
    assert_eq!(json_ids(&fresh), vec![1, 3, 4, 6]);
}

#[test]
fn export_filters_select_entities() {
    let resolver = create_loaded_resolver();
    let multi: Vec<String> = resolver
        .export_json(EngineFlags::EXPORT_INCLUDE_MULTI_RECORD_ENTITIES)
        .unwrap()
        .collect::<erbind::Result<_>>()
        .unwrap();
    assert_eq!(json_ids(&multi), vec![1]);

    let name_only: Vec<String> = resolver
        .export_json(EngineFlags::EXPORT_INCLUDE_NAME_ONLY)
        .unwrap()
        .collect::<erbind::Result<_>>()
        .unwrap();
    assert_eq!(json_ids(&name_only), vec![3, 5]);
}

#[test]
fn csv_report_has_header_and_rows() {
    let resolver = create_loaded_resolver();
    let csv = resolver
        .export_csv("RESOLVED_ENTITY_ID,DATA_SOURCE,RECORD_ID", EngineFlags::NO_FLAGS)
        .unwrap()
        .read_to_string()
        .unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "RESOLVED_ENTITY_ID,DATA_SOURCE,RECORD_ID");
    assert_eq!(lines.len(), 6);
    assert!(lines.contains(&"1,CRM,1001"));
    assert!(lines.contains(&"1,TEST,2001"));
    assert!(lines.contains(&"5,SEARCH,3001"));
}

#[test]
fn csv_unknown_column_is_bad_input() {
    let resolver = create_loaded_resolver();
    assert_eq!(
        code_of(resolver.export_csv_entity_report("RECORD_ID,SHOE_SIZE", EngineFlags::NO_FLAGS)),
        codes::BAD_INPUT
    );
}
