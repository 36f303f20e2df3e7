//! Record mutation and redo processing.
//!
//! Mutations return the engine's with-info document when
//! [`EngineFlags::WITH_INFO`] is set, and `""` otherwise.

use erbind_core::{EngineFlags, EntityId, RecordKey, Result};

use super::Resolver;

impl Resolver {
    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Insert or replace a record.
    ///
    /// `record_definition` is the record's JSON document. When it carries
    /// `DATA_SOURCE` or `RECORD_ID` they must agree with `key`; the engine
    /// decides what a disagreement means.
    pub fn add_record(&self, key: &RecordKey, record_definition: &str, flags: EngineFlags) -> Result<String> {
        self.call("add_record", |engine| {
            engine.add_record(&key.data_source, &key.record_id, record_definition, flags)
        })
    }

    /// Remove a record. Removing a record the engine does not hold succeeds.
    pub fn delete_record(&self, key: &RecordKey, flags: EngineFlags) -> Result<String> {
        self.call("delete_record", |engine| {
            engine.delete_record(&key.data_source, &key.record_id, flags)
        })
    }

    /// Recompute resolution for a record.
    pub fn reevaluate_record(&self, key: &RecordKey, flags: EngineFlags) -> Result<String> {
        self.call("reevaluate_record", |engine| {
            engine.reevaluate_record(&key.data_source, &key.record_id, flags)
        })
    }

    /// Recompute resolution for an entity.
    pub fn reevaluate_entity(&self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        self.call("reevaluate_entity", |engine| engine.reevaluate_entity(entity_id, flags))
    }

    // =========================================================================
    // Redo Queue
    // =========================================================================

    /// Resubmit a redo record taken from [`Resolver::get_redo_record`].
    pub fn process_redo_record(&self, redo_record: &str, flags: EngineFlags) -> Result<String> {
        self.call("process_redo_record", |engine| engine.process_redo_record(redo_record, flags))
    }

    /// Take the next redo record, or `""` when none is pending.
    pub fn get_redo_record(&self) -> Result<String> {
        self.call("get_redo_record", |engine| engine.get_redo_record())
    }

    /// Number of pending redo records.
    pub fn count_redo_records(&self) -> Result<i64> {
        self.call("count_redo_records", |engine| engine.count_redo_records())
    }

    /// Take and process redo records until the queue is empty or `limit`
    /// records were processed. Returns the number processed.
    ///
    /// Each record is fetched and processed under one lock acquisition, so
    /// concurrent drains never process the same record twice. Stops at the
    /// first failure.
    pub fn drain_redo_records(&self, flags: EngineFlags, limit: Option<usize>) -> Result<usize> {
        let mut processed = 0;
        while limit.map_or(true, |limit| processed < limit) {
            let done = self.call("drain_redo_records", |engine| {
                let redo = engine.get_redo_record()?;
                if redo.is_empty() {
                    return Ok(true);
                }
                engine.process_redo_record(&redo, flags)?;
                Ok(false)
            })?;
            if done {
                break;
            }
            processed += 1;
        }
        tracing::debug!(target: "erbind::client", processed, "redo drained");
        Ok(processed)
    }
}
