//! Lifecycle Tests
//!
//! Ordering of initialize / prime / reinitialize / destroy and the
//! locally-raised misuse errors.

use crate::common::*;
use erbind::{EngineFlags, Error, ExportHandle, LifecycleState, Resolver};
use erbind_memory::{codes, InMemoryEngine};

/// One call from every method group.
fn every_group(resolver: &Resolver) -> Vec<(&'static str, erbind::Result<()>)> {
    let k = key("TEST", "1");
    vec![
        ("prime", resolver.prime()),
        ("reinitialize", resolver.reinitialize(1)),
        ("active_config_id", resolver.active_config_id().map(drop)),
        ("add_record", resolver.add_record(&k, "{}", EngineFlags::NO_FLAGS).map(drop)),
        ("delete_record", resolver.delete_record(&k, EngineFlags::NO_FLAGS).map(drop)),
        ("count_redo_records", resolver.count_redo_records().map(drop)),
        ("get_entity_by_entity_id", resolver.get_entity_by_entity_id(1, EngineFlags::NO_FLAGS).map(drop)),
        ("get_record", resolver.get_record(&k, EngineFlags::NO_FLAGS).map(drop)),
        ("get_stats", resolver.get_stats().map(drop)),
        (
            "find_path_by_entity_id",
            resolver
                .find_path_by_entity_id(1, 2, 3, &[], &[], EngineFlags::NO_FLAGS)
                .map(drop),
        ),
        (
            "find_network_by_entity_id",
            resolver
                .find_network_by_entity_id(&[1], 1, 0, 10, EngineFlags::NO_FLAGS)
                .map(drop),
        ),
        ("search_by_attributes", resolver.search_by_attributes("{}", None, EngineFlags::NO_FLAGS).map(drop)),
        ("why_entities", resolver.why_entities(1, 2, EngineFlags::NO_FLAGS).map(drop)),
        ("how_entity_by_entity_id", resolver.how_entity_by_entity_id(1, EngineFlags::NO_FLAGS).map(drop)),
        ("export_json_entity_report", resolver.export_json_entity_report(EngineFlags::NO_FLAGS).map(drop)),
        ("fetch_next", resolver.fetch_next(ExportHandle(1)).map(drop)),
        ("close_export_report", resolver.close_export_report(ExportHandle(1))),
        ("version", resolver.version().map(drop)),
        ("license", resolver.license().map(drop)),
    ]
}

// ============================================================================
// Misuse
// ============================================================================

#[test]
fn every_operation_before_initialize_fails_locally() {
    let resolver = Resolver::new(InMemoryEngine::new());
    for (op, result) in every_group(&resolver) {
        assert_eq!(result, Err(Error::NotInitialized), "{} before initialize", op);
    }
    assert_eq!(resolver.destroy(), Err(Error::NotInitialized));
    assert_eq!(resolver.state(), LifecycleState::Detached);
}

#[test]
fn every_operation_after_destroy_fails_locally() {
    let resolver = create_loaded_resolver();
    resolver.destroy().unwrap();
    for (op, result) in every_group(&resolver) {
        assert_eq!(result, Err(Error::Destroyed), "{} after destroy", op);
    }
    assert_eq!(resolver.destroy(), Err(Error::Destroyed));
    assert_eq!(
        resolver.initialize("again", SETTINGS, None, false),
        Err(Error::Destroyed)
    );
}

#[test]
fn lifecycle_errors_are_classified() {
    let resolver = Resolver::new(InMemoryEngine::new());
    let err = resolver.get_stats().unwrap_err();
    assert!(err.is_lifecycle());
    assert_eq!(err.code(), None);
}

#[test]
fn second_initialize_is_rejected() {
    let resolver = create_resolver();
    assert_eq!(
        resolver.initialize("client-tests", SETTINGS, None, false),
        Err(Error::AlreadyInitialized)
    );
    assert!(resolver.is_attached());
}

// ============================================================================
// Initialize
// ============================================================================

#[test]
fn malformed_settings_are_an_initialization_error() {
    let resolver = Resolver::new(InMemoryEngine::new());
    let err = resolver
        .initialize("client-tests", "{\"PIPELINE\": ", None, false)
        .unwrap_err();
    assert!(matches!(err, Error::Initialization { .. }), "got {:?}", err);
    assert!(!resolver.is_attached());
}

#[test]
fn engine_rejection_leaves_resolver_detached() {
    let resolver = Resolver::new(InMemoryEngine::new());
    let code = code_of(resolver.initialize("client-tests", SETTINGS, Some(99), false));
    assert_eq!(code, codes::UNKNOWN_CONFIG_ID);
    assert_eq!(resolver.state(), LifecycleState::Detached);

    resolver.initialize("client-tests", SETTINGS, None, false).unwrap();
    assert!(resolver.is_attached());
}

#[test]
fn prime_is_optional() {
    let resolver = create_resolver();
    resolver
        .add_record(&key("TEST", "1"), r#"{"NAME_FULL": "Ann Lee"}"#, EngineFlags::NO_FLAGS)
        .unwrap();
    resolver.prime().unwrap();
    resolver.prime().unwrap();
    assert_eq!(entity_of(&resolver, &key("TEST", "1")), 1);
}

// ============================================================================
// Reinitialize
// ============================================================================

#[test]
fn reinitialize_swaps_configuration() {
    let engine = InMemoryEngine::new().with_config(2, ["WATCHLIST"]);
    let resolver = Resolver::new(engine);
    resolver.initialize("client-tests", "{}", None, false).unwrap();
    assert_eq!(resolver.active_config_id().unwrap(), erbind_memory::DEFAULT_CONFIG_ID);

    resolver.reinitialize(2).unwrap();
    assert_eq!(resolver.active_config_id().unwrap(), 2);
    resolver
        .add_record(&key("WATCHLIST", "1"), r#"{"NAME_FULL": "Ann Lee"}"#, EngineFlags::NO_FLAGS)
        .unwrap();
    let code = code_of(resolver.add_record(&key("TEST", "1"), "{}", EngineFlags::NO_FLAGS));
    assert_eq!(code, codes::UNKNOWN_DATA_SOURCE);
}

#[test]
fn reinitialize_to_unknown_config_keeps_the_active_one() {
    let resolver = create_resolver();
    assert_eq!(code_of(resolver.reinitialize(42)), codes::UNKNOWN_CONFIG_ID);
    assert_eq!(resolver.active_config_id().unwrap(), erbind_memory::DEFAULT_CONFIG_ID);
    assert!(resolver.is_attached());
}

// ============================================================================
// Product
// ============================================================================

#[test]
fn product_documents() {
    let resolver = create_resolver();
    let version = parse(&resolver.version().unwrap());
    assert!(version["VERSION"].is_string());
    let license = parse(&resolver.license().unwrap());
    assert!(license.is_object());
}

