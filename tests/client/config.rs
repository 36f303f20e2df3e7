//! Configuration Tests
//!
//! `erbind.toml` driving `Resolver::open` / `Resolver::open_with`.

use crate::common::*;
use erbind::{EngineFlags, Error, Resolver, ResolverConfig, CONFIG_FILE_NAME};
use erbind_memory::InMemoryEngine;
use tempfile::TempDir;

#[test]
fn open_with_reads_settings_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        r#"
instance_name = "config-tests"

[settings]
DATA_SOURCES = ["CRM"]
"#,
    )
    .unwrap();

    let config = ResolverConfig::from_file(&path).unwrap();
    let resolver = Resolver::open_with(InMemoryEngine::new(), &config).unwrap();
    assert!(resolver.is_attached());
    resolver
        .add_record(&key("CRM", "1"), r#"{"NAME_FULL": "Ann Lee"}"#, EngineFlags::NO_FLAGS)
        .unwrap();
}

#[test]
fn open_with_unknown_config_id_fails() {
    let config = ResolverConfig {
        config_id: Some(404),
        ..ResolverConfig::default()
    };
    let err = Resolver::open_with(InMemoryEngine::new(), &config).unwrap_err();
    assert_eq!(err.code(), Some(erbind_memory::codes::UNKNOWN_CONFIG_ID));
}

#[test]
fn open_writes_default_config_before_loading() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        format!(
            "[library]\npath = '{}'\n",
            dir.path().join("missing-engine.so").display()
        ),
    )
    .unwrap();

    let err = Resolver::open(&path).unwrap_err();
    assert!(matches!(err, Error::Library { .. }), "got {:?}", err);

    let fresh = dir.path().join("fresh.toml");
    // Loading may fail on hosts without the engine; the file is written either way.
    let _ = Resolver::open(&fresh);
    let config = ResolverConfig::from_file(&fresh).unwrap();
    assert_eq!(config.instance_name, "erbind");
}

#[test]
fn malformed_config_file_fails_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "instance_name = [").unwrap();
    assert!(matches!(Resolver::open(&path), Err(Error::Config { .. })));
}
