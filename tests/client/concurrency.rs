//! Concurrency Tests
//!
//! One attachment shared by several threads through an `Arc`.

use std::sync::Arc;
use std::thread;

use crate::common::*;
use erbind::{EngineFlags, Error, Resolver};

const THREADS: usize = 8;
const PER_THREAD: usize = 25;

#[test]
fn concurrent_adds_are_all_applied() {
    let resolver = Arc::new(create_resolver());
    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let doc = format!(r#"{{"NAME_FULL": "Worker {} Item {}"}}"#, t, i);
                    resolver
                        .add_record(&key("TEST", &format!("{}-{}", t, i)), &doc, EngineFlags::NO_FLAGS)
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let stats = parse(&resolver.get_stats().unwrap());
    assert_eq!(stats["workload"]["loadedRecords"], THREADS * PER_THREAD);
}

#[test]
fn concurrent_drains_process_each_redo_record_once() {
    let resolver = Arc::new(create_resolver());
    for i in 0..40 {
        let doc = format!(r#"{{"NAME_FULL": "Pair {}", "SSN_NUMBER": "{:09}"}}"#, i, i);
        for side in ["A", "B"] {
            resolver
                .add_record(&key("TEST", &format!("{}{}", side, i)), &doc, EngineFlags::NO_FLAGS)
                .unwrap();
        }
        resolver
            .delete_record(&key("TEST", &format!("A{}", i)), EngineFlags::NO_FLAGS)
            .unwrap();
    }
    assert_eq!(resolver.count_redo_records().unwrap(), 40);

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || resolver.drain_redo_records(EngineFlags::NO_FLAGS, None).unwrap())
        })
        .collect();
    let processed: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(processed, 40);
    assert_eq!(resolver.count_redo_records().unwrap(), 0);
}

#[test]
fn a_handle_closed_by_one_caller_is_closed_for_all() {
    let resolver = Arc::new(create_loaded_resolver());
    let handle = resolver.export_json_entity_report(EngineFlags::NO_FLAGS).unwrap();

    let closer = {
        let resolver = Arc::clone(&resolver);
        thread::spawn(move || resolver.close_export_report(handle))
    };
    closer.join().unwrap().unwrap();

    assert_eq!(
        resolver.fetch_next(handle),
        Err(Error::UnknownExportHandle {
            handle: handle.as_u64()
        })
    );
}

#[test]
fn destroy_races_with_callers_cleanly() {
    let resolver: Arc<Resolver> = Arc::new(create_loaded_resolver());
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                for _ in 0..50 {
                    match resolver.get_entity_by_entity_id(1, EngineFlags::NO_FLAGS) {
                        Ok(json) => assert!(!json.is_empty()),
                        Err(e) => {
                            assert_eq!(e, Error::Destroyed);
                            return;
                        }
                    }
                }
            })
        })
        .collect();
    resolver.destroy().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert!(!resolver.is_attached());
}
