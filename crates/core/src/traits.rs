//! The engine boundary.
//!
//! [`Engine`] is the request/response contract between the client and an
//! entity-resolution engine: primitive and JSON-string arguments in, a JSON
//! string (or integer) out, a structured [`Error`](crate::Error) on failure.
//! The native binding and the in-process loopback engine both implement it,
//! so the client never knows which one it is attached to.
//!
//! Receivers are `&mut self`: an attachment is a caller-synchronized
//! resource and the engine makes no promise about concurrent calls on one
//! attachment. The client serializes access.
//!
//! Argument conventions:
//! - list arguments (`avoid_*`, `required_data_sources`, seeds, record lists)
//!   use the documents built by [`crate::json`]; `""` means "no constraint";
//! - `flags` is forwarded verbatim as [`EngineFlags::bits`].

use crate::error::Result;
use crate::flags::EngineFlags;
use crate::types::{ConfigId, EntityId, ExportHandle};

/// An attachable entity-resolution engine.
pub trait Engine: Send {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Attach to the engine with the given settings document.
    ///
    /// `config_id` of `None` selects the engine's default configuration.
    fn initialize(
        &mut self,
        instance_name: &str,
        settings: &str,
        config_id: Option<ConfigId>,
        verbose_logging: bool,
    ) -> Result<()>;

    /// Swap the active configuration without detaching.
    fn reinitialize(&mut self, config_id: ConfigId) -> Result<()>;

    /// Pre-load engine resources. No observable semantic effect.
    fn prime(&mut self) -> Result<()>;

    /// Identifier of the active configuration.
    fn get_active_config_id(&mut self) -> Result<ConfigId>;

    /// Release the attachment.
    fn destroy(&mut self) -> Result<()>;

    // =========================================================================
    // Record mutation
    // =========================================================================

    /// Insert or replace a record.
    fn add_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        record_definition: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Remove a record. Removing an unknown record is not an error.
    fn delete_record(&mut self, data_source: &str, record_id: &str, flags: EngineFlags)
        -> Result<String>;

    /// Recompute resolution for a record.
    fn reevaluate_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Recompute resolution for an entity.
    fn reevaluate_entity(&mut self, entity_id: EntityId, flags: EngineFlags) -> Result<String>;

    /// Resubmit a redo record previously returned by [`Engine::get_redo_record`].
    fn process_redo_record(&mut self, redo_record: &str, flags: EngineFlags) -> Result<String>;

    /// Take the next redo record, or `""` when the queue is empty.
    fn get_redo_record(&mut self) -> Result<String>;

    /// Number of queued redo records.
    fn count_redo_records(&mut self) -> Result<i64>;

    // =========================================================================
    // Query
    // =========================================================================

    /// Resolved entity by id.
    fn get_entity_by_entity_id(&mut self, entity_id: EntityId, flags: EngineFlags)
        -> Result<String>;

    /// Resolved entity containing a record.
    fn get_entity_by_record_id(
        &mut self,
        data_source: &str,
        record_id: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Hypothetical entity composed of the given records.
    fn get_virtual_entity_by_record_id(&mut self, record_list: &str, flags: EngineFlags)
        -> Result<String>;

    /// Stored record.
    fn get_record(&mut self, data_source: &str, record_id: &str, flags: EngineFlags)
        -> Result<String>;

    /// Features a record would produce, without storing it.
    fn get_record_preview(&mut self, record_definition: &str, flags: EngineFlags)
        -> Result<String>;

    /// Engine workload snapshot.
    fn get_stats(&mut self) -> Result<String>;

    // =========================================================================
    // Relationships
    // =========================================================================

    /// Shortest relationship path between two entities.
    #[allow(clippy::too_many_arguments)]
    fn find_path_by_entity_id(
        &mut self,
        start_entity_id: EntityId,
        end_entity_id: EntityId,
        max_degrees: i64,
        avoid_entity_ids: &str,
        required_data_sources: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Shortest relationship path between the entities of two records.
    #[allow(clippy::too_many_arguments)]
    fn find_path_by_record_id(
        &mut self,
        start_data_source: &str,
        start_record_id: &str,
        end_data_source: &str,
        end_record_id: &str,
        max_degrees: i64,
        avoid_record_keys: &str,
        required_data_sources: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Network around a set of entities.
    fn find_network_by_entity_id(
        &mut self,
        entity_list: &str,
        max_degrees: i64,
        build_out_degrees: i64,
        max_entities: i64,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Network around the entities of a set of records.
    fn find_network_by_record_id(
        &mut self,
        record_list: &str,
        max_degrees: i64,
        build_out_degrees: i64,
        max_entities: i64,
        flags: EngineFlags,
    ) -> Result<String>;

    // =========================================================================
    // Search and explainability
    // =========================================================================

    /// Ranked candidate entities for a bag of attributes.
    ///
    /// An empty `search_profile` selects the default profile.
    fn search_by_attributes(
        &mut self,
        attributes: &str,
        search_profile: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Why two entities are or are not linked.
    fn why_entities(
        &mut self,
        entity_id_1: EntityId,
        entity_id_2: EntityId,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Why two records are or are not linked.
    fn why_records(
        &mut self,
        data_source_1: &str,
        record_id_1: &str,
        data_source_2: &str,
        record_id_2: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Why a record belongs to its entity.
    fn why_record_in_entity(
        &mut self,
        data_source: &str,
        record_id: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Why an entity was or was not a search candidate.
    fn why_search(
        &mut self,
        attributes: &str,
        entity_id: EntityId,
        search_profile: &str,
        flags: EngineFlags,
    ) -> Result<String>;

    /// Resolution history of an entity.
    fn how_entity_by_entity_id(&mut self, entity_id: EntityId, flags: EngineFlags)
        -> Result<String>;

    // =========================================================================
    // Export
    // =========================================================================

    /// Open a JSON-lines entity report.
    fn export_json_entity_report(&mut self, flags: EngineFlags) -> Result<ExportHandle>;

    /// Open a CSV entity report with the given column list (`""`/`"*"` for defaults).
    fn export_csv_entity_report(&mut self, column_list: &str, flags: EngineFlags)
        -> Result<ExportHandle>;

    /// Next chunk of an open report, `""` once exhausted.
    fn fetch_next(&mut self, handle: ExportHandle) -> Result<String>;

    /// Release a report handle.
    fn close_export_report(&mut self, handle: ExportHandle) -> Result<()>;

    // =========================================================================
    // Product
    // =========================================================================

    /// Product version document.
    fn get_version(&mut self) -> Result<String>;

    /// Product license document.
    fn get_license(&mut self) -> Result<String>;
}
