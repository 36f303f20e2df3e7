//! Search and explainability.

use erbind_core::{EngineFlags, EntityId, RecordKey, Result};

use super::Resolver;

impl Resolver {
    // =========================================================================
    // Search
    // =========================================================================

    /// Entities matching a bag of attributes, ranked by the engine.
    ///
    /// `search_profile` of `None` uses the engine's default profile.
    pub fn search_by_attributes(
        &self,
        attributes: &str,
        search_profile: Option<&str>,
        flags: EngineFlags,
    ) -> Result<String> {
        let profile = search_profile.unwrap_or("");
        self.call("search_by_attributes", |engine| {
            engine.search_by_attributes(attributes, profile, flags)
        })
    }

    // =========================================================================
    // Why / How
    // =========================================================================

    /// Why two entities resolved, relate, or do neither.
    pub fn why_entities(&self, entity_id_1: EntityId, entity_id_2: EntityId, flags: EngineFlags) -> Result<String> {
        self.call("why_entities", |engine| engine.why_entities(entity_id_1, entity_id_2, flags))
    }

    /// Why two records resolved, relate, or do neither.
    pub fn why_records(&self, key_1: &RecordKey, key_2: &RecordKey, flags: EngineFlags) -> Result<String> {
        self.call("why_records", |engine| {
            engine.why_records(
                &key_1.data_source,
                &key_1.record_id,
                &key_2.data_source,
                &key_2.record_id,
                flags,
            )
        })
    }

    /// Why a record belongs to its entity.
    pub fn why_record_in_entity(&self, key: &RecordKey, flags: EngineFlags) -> Result<String> {
        self.call("why_record_in_entity", |engine| {
            engine.why_record_in_entity(&key.data_source, &key.record_id, flags)
        })
    }

    /// Why `entity_id` was or was not returned for `attributes`.
    pub fn why_search(
        &self,
        attributes: &str,
        entity_id: EntityId,
        search_profile: Option<&str>,
        flags: EngineFlags,
    ) -> Result<String> {
        let profile = search_profile.unwrap_or("");
        self.call("why_search", |engine| {
            engine.why_search(attributes, entity_id, profile, flags)
        })
    }

    /// Step-by-step resolution history of an entity.
    pub fn how_entity_by_entity_id(&self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        self.call("how_entity_by_entity_id", |engine| {
            engine.how_entity_by_entity_id(entity_id, flags)
        })
    }
}
