//! Flag and Round-Trip Property Tests

use crate::common::*;
use erbind::{EngineFlags, Error};
use proptest::prelude::*;

#[test]
fn raw_bitmasks_are_checked_before_use() {
    assert!(matches!(
        EngineFlags::try_from(1u64 << 45),
        Err(Error::InvalidFlags { .. })
    ));
    let parsed: EngineFlags = "ENTITY_INCLUDE_ENTITY_NAME | WITH_INFO".parse().unwrap();
    assert!(parsed.contains(EngineFlags::WITH_INFO));
    assert_eq!(parsed.to_string(), "ENTITY_INCLUDE_ENTITY_NAME | WITH_INFO");
}

#[test]
fn options_outside_a_calls_row_are_ignored() {
    let resolver = create_loaded_resolver();
    let plain = resolver.get_record(&key("TEST", "2002"), EngineFlags::NO_FLAGS).unwrap();
    let noisy = resolver
        .get_record(
            &key("TEST", "2002"),
            EngineFlags::FIND_PATH_PREFER_EXCLUDE | EngineFlags::SEARCH_INCLUDE_STATS,
        )
        .unwrap();
    assert_eq!(parse(&plain), parse(&noisy));
}

fn any_flags() -> impl Strategy<Value = EngineFlags> {
    any::<u64>().prop_map(EngineFlags::from_bits_truncate)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_named_flag_combination_is_accepted(flags in any_flags()) {
        let resolver = create_loaded_resolver();
        let doc = parse(&resolver.get_entity_by_entity_id(1, flags).unwrap());
        prop_assert_eq!(&doc["RESOLVED_ENTITY"]["ENTITY_ID"], &serde_json::json!(1));
    }

    #[test]
    fn added_record_reads_back(record_id in "[A-Za-z0-9_-]{1,24}", name in "[A-Za-z]{1,12}( [A-Za-z]{1,12})?") {
        let resolver = create_resolver();
        let k = key("CRM", &record_id);
        let definition = serde_json::json!({
            "DATA_SOURCE": "CRM",
            "RECORD_ID": record_id.clone(),
            "NAME_FULL": name,
        })
        .to_string();

        let info = parse(&resolver.add_record(&k, &definition, EngineFlags::WITH_INFO).unwrap());
        prop_assert_eq!(&info["DATA_SOURCE"], "CRM");
        prop_assert_eq!(info["RECORD_ID"].as_str(), Some(record_id.as_str()));
        prop_assert!(info["AFFECTED_ENTITIES"].is_array());

        let record = parse(&resolver.get_record(&k, EngineFlags::RECORD_DEFAULT_FLAGS).unwrap());
        prop_assert_eq!(&record["DATA_SOURCE"], "CRM");
        prop_assert_eq!(record["RECORD_ID"].as_str(), Some(record_id.as_str()));
        prop_assert_eq!(&record["JSON_DATA"], &parse(&definition));
    }

    #[test]
    fn deleting_unknown_records_never_fails(suffix in "[A-Za-z0-9]{1,16}") {
        let resolver = create_loaded_resolver();
        let unknown = key("TEST", &format!("unknown-{}", suffix));
        prop_assert!(resolver.delete_record(&unknown, EngineFlags::NO_FLAGS).is_ok());
        prop_assert!(resolver.delete_record(&unknown, EngineFlags::NO_FLAGS).is_ok());
        prop_assert_eq!(resolver.count_redo_records().unwrap(), 0);
    }
}
