//! Common test utilities for client tests

use std::sync::Once;

use erbind::{EngineFlags, RecordKey, Resolver};
use erbind_memory::InMemoryEngine;
use serde_json::Value;

static INIT_LOGGING: Once = Once::new();

/// Install a test subscriber once per run. `ERBIND_TEST_LOG`, then
/// `RUST_LOG`, select the filter; the default only shows errors.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = std::env::var("ERBIND_TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "error".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Settings registering the extra `CRM` data source.
pub const SETTINGS: &str = r#"{"DATA_SOURCES": ["CRM"]}"#;

/// Record key shorthand.
pub fn key(data_source: &str, record_id: &str) -> RecordKey {
    RecordKey::new(data_source, record_id)
}

/// A resolver attached to an empty loopback engine.
pub fn create_resolver() -> Resolver {
    init_test_logging();
    let resolver = Resolver::new(InMemoryEngine::new());
    resolver.initialize("client-tests", SETTINGS, None, false).unwrap();
    resolver
}

/// A resolver loaded with the standard fixture.
///
/// Entities, by id:
/// - 1: `CRM:1001` + `TEST:2001` (name and phone)
/// - 3: `TEST:2002`
/// - 4: `CRM:1002`, possibly related to 1 (phone) and 3 (address)
/// - 5: `SEARCH:3001`, name-only related to 3
pub fn create_loaded_resolver() -> Resolver {
    let resolver = create_resolver();
    for (ds, id, doc) in FIXTURE {
        resolver.add_record(&key(ds, id), doc, EngineFlags::NO_FLAGS).unwrap();
    }
    resolver
}

pub const FIXTURE: [(&str, &str, &str); 5] = [
    (
        "CRM",
        "1001",
        r#"{"NAME_FULL": "Robert Smith", "DATE_OF_BIRTH": "1985-02-12", "PHONE_NUMBER": "702-555-0100"}"#,
    ),
    (
        "TEST",
        "2001",
        r#"{"NAME_FULL": "Robert Smith", "PHONE_NUMBER": "7025550100", "EMAIL_ADDRESS": "bob@example.com"}"#,
    ),
    ("TEST", "2002", r#"{"NAME_FULL": "Jane Doe", "ADDR_FULL": "12 Main St"}"#),
    (
        "CRM",
        "1002",
        r#"{"NAME_FULL": "Sam Roe", "ADDR_FULL": "12 Main St", "PHONE_NUMBER": "(702) 555-0100"}"#,
    ),
    ("SEARCH", "3001", r#"{"NAME_FULL": "Jane Doe"}"#),
];

/// Parse a response document.
pub fn parse(json: &str) -> Value {
    serde_json::from_str(json).unwrap_or_else(|e| panic!("not JSON ({}): {}", e, json))
}

/// `ENTITY_ID`s of an array of `{"ENTITY_ID": ..}` or
/// `{"RESOLVED_ENTITY": {"ENTITY_ID": ..}}` rows.
pub fn entity_ids(rows: &Value) -> Vec<i64> {
    rows.as_array()
        .unwrap_or_else(|| panic!("expected an array, got {}", rows))
        .iter()
        .map(|row| {
            row.get("ENTITY_ID")
                .or_else(|| row["RESOLVED_ENTITY"].get("ENTITY_ID"))
                .and_then(Value::as_i64)
                .unwrap_or_else(|| panic!("row without ENTITY_ID: {}", row))
        })
        .collect()
}

/// Entity id holding `key`.
#[allow(dead_code)]
pub fn entity_of(resolver: &Resolver, key: &RecordKey) -> i64 {
    let doc = parse(&resolver.get_entity_by_record_id(key, EngineFlags::NO_FLAGS).unwrap());
    doc["RESOLVED_ENTITY"]["ENTITY_ID"].as_i64().unwrap()
}

/// Engine return code of a failed call.
#[allow(dead_code)]
pub fn code_of<T: std::fmt::Debug>(result: erbind::Result<T>) -> i64 {
    match result {
        Err(e) => e
            .code()
            .unwrap_or_else(|| panic!("expected an engine error, got {:?}", e)),
        Ok(v) => panic!("expected an engine error, got Ok({:?})", v),
    }
}
