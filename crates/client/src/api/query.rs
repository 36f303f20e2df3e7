//! Entity and record queries.

use erbind_core::{json, EngineFlags, EntityId, RecordKey, Result};

use super::Resolver;

impl Resolver {
    // =========================================================================
    // Entity Queries
    // =========================================================================

    /// Resolved entity by id.
    pub fn get_entity_by_entity_id(&self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        self.call("get_entity_by_entity_id", |engine| {
            engine.get_entity_by_entity_id(entity_id, flags)
        })
    }

    /// Resolved entity containing `key`.
    pub fn get_entity_by_record_id(&self, key: &RecordKey, flags: EngineFlags) -> Result<String> {
        self.call("get_entity_by_record_id", |engine| {
            engine.get_entity_by_record_id(&key.data_source, &key.record_id, flags)
        })
    }

    /// The entity the given records would form if resolved together.
    pub fn get_virtual_entity_by_record_id(&self, records: &[RecordKey], flags: EngineFlags) -> Result<String> {
        let record_list = json::record_list(records)?;
        self.call("get_virtual_entity_by_record_id", |engine| {
            engine.get_virtual_entity_by_record_id(&record_list, flags)
        })
    }

    // =========================================================================
    // Record Queries
    // =========================================================================

    /// Stored record.
    pub fn get_record(&self, key: &RecordKey, flags: EngineFlags) -> Result<String> {
        self.call("get_record", |engine| {
            engine.get_record(&key.data_source, &key.record_id, flags)
        })
    }

    /// Features `record_definition` would produce, without storing it.
    pub fn get_record_preview(&self, record_definition: &str, flags: EngineFlags) -> Result<String> {
        self.call("get_record_preview", |engine| {
            engine.get_record_preview(record_definition, flags)
        })
    }

    /// Engine workload statistics. Engines may reset counters on read.
    pub fn get_stats(&self) -> Result<String> {
        self.call("get_stats", |engine| engine.get_stats())
    }
}
