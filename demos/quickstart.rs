//! Load a handful of records into the loopback engine, inspect the
//! resolved entities, look for a path between them and export them.
//!
//! Run with `RUST_LOG=erbind=debug` to see engine calls.

use erbind::{EngineFlags, RecordKey, Resolver, ResolverConfig, Result};
use erbind_memory::InMemoryEngine;
use tracing::info;

const RECORDS: [(&str, &str, &str); 4] = [
    ("TEST", "1", r#"{"NAME_FULL": "Ann Lee", "SSN_NUMBER": "123-45-6789"}"#),
    ("TEST", "2", r#"{"NAME_FULL": "Ann M Lee", "SSN_NUMBER": "123456789"}"#),
    ("TEST", "3", r#"{"NAME_FULL": "Bob Ray", "PHONE_NUMBER": "555-0100"}"#),
    ("SEARCH", "4", r#"{"NAME_FULL": "Robert Ray", "PHONE_NUMBER": "(555) 0100"}"#),
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let resolver = Resolver::open_with(InMemoryEngine::new(), &ResolverConfig::default())?;
    info!("{}", resolver.version()?);

    for (data_source, record_id, doc) in RECORDS {
        let key = RecordKey::new(data_source, record_id);
        let affected = resolver.add_record(&key, doc, EngineFlags::WITH_INFO)?;
        info!(%key, %affected, "added");
    }

    let entity = resolver.get_entity_by_record_id(
        &RecordKey::new("TEST", "3"),
        EngineFlags::ENTITY_DEFAULT_FLAGS,
    )?;
    info!(%entity, "entity for TEST:3");

    let why = resolver.why_records(
        &RecordKey::new("TEST", "3"),
        &RecordKey::new("SEARCH", "4"),
        EngineFlags::WHY_RECORDS_DEFAULT_FLAGS,
    )?;
    info!(%why, "why TEST:3 and SEARCH:4");

    let path = resolver.find_path_by_record_id(
        &RecordKey::new("TEST", "1"),
        &RecordKey::new("SEARCH", "4"),
        3,
        &[],
        &[],
        EngineFlags::FIND_PATH_DEFAULT_FLAGS,
    )?;
    info!(%path, "path from TEST:1 to SEARCH:4");

    for line in resolver.export_json(EngineFlags::EXPORT_DEFAULT_FLAGS)? {
        println!("{}", line?.trim_end());
    }

    resolver.destroy()
}
