//! Relationship paths and networks.
//!
//! Empty constraint slices cross the boundary as `""`, which the engine
//! reads as "no constraint".

use erbind_core::{json, EngineFlags, EntityId, RecordKey, Result};

use super::Resolver;

impl Resolver {
    // =========================================================================
    // Paths
    // =========================================================================

    /// Shortest relationship path between two entities of at most
    /// `max_degrees` hops.
    ///
    /// `avoid` names entities the path should not pass through and
    /// `required_data_sources` names data sources at least one entity on
    /// the path must carry.
    pub fn find_path_by_entity_id(
        &self,
        start: EntityId,
        end: EntityId,
        max_degrees: i64,
        avoid: &[EntityId],
        required_data_sources: &[&str],
        flags: EngineFlags,
    ) -> Result<String> {
        let avoid = json::entity_list(avoid)?;
        let required = json::data_source_list(required_data_sources)?;
        self.call("find_path_by_entity_id", |engine| {
            engine.find_path_by_entity_id(start, end, max_degrees, &avoid, &required, flags)
        })
    }

    /// Shortest relationship path between the entities holding two records.
    pub fn find_path_by_record_id(
        &self,
        start: &RecordKey,
        end: &RecordKey,
        max_degrees: i64,
        avoid: &[RecordKey],
        required_data_sources: &[&str],
        flags: EngineFlags,
    ) -> Result<String> {
        let avoid = json::record_list(avoid)?;
        let required = json::data_source_list(required_data_sources)?;
        self.call("find_path_by_record_id", |engine| {
            engine.find_path_by_record_id(
                &start.data_source,
                &start.record_id,
                &end.data_source,
                &end.record_id,
                max_degrees,
                &avoid,
                &required,
                flags,
            )
        })
    }

    // =========================================================================
    // Networks
    // =========================================================================

    /// Network connecting `entities`: paths of at most `max_degrees` hops
    /// between each pair, plus entities within `build_out_degrees` hops of
    /// any seed while the total stays under `max_entities`.
    pub fn find_network_by_entity_id(
        &self,
        entities: &[EntityId],
        max_degrees: i64,
        build_out_degrees: i64,
        max_entities: i64,
        flags: EngineFlags,
    ) -> Result<String> {
        let entity_list = json::entity_list(entities)?;
        self.call("find_network_by_entity_id", |engine| {
            engine.find_network_by_entity_id(&entity_list, max_degrees, build_out_degrees, max_entities, flags)
        })
    }

    /// Network connecting the entities holding `records`.
    pub fn find_network_by_record_id(
        &self,
        records: &[RecordKey],
        max_degrees: i64,
        build_out_degrees: i64,
        max_entities: i64,
        flags: EngineFlags,
    ) -> Result<String> {
        let record_list = json::record_list(records)?;
        self.call("find_network_by_record_id", |engine| {
            engine.find_network_by_record_id(&record_list, max_degrees, build_out_degrees, max_entities, flags)
        })
    }
}
