//! The loopback engine.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use erbind_core::json::{parse_data_source_list, parse_entity_list, parse_object, parse_record_list};
use erbind_core::{Component, ConfigId, Engine, EngineFlags, EntityId, Error, ExportHandle, RecordKey, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{json, Map, Value};
use tracing::{debug, info, trace};

use crate::codes;
use crate::explain::{self, Profile};
use crate::export::{self, ExportCursor};
use crate::features::extract;
use crate::graph::{build_out, shortest_path, PathQuery};
use crate::render::{entity_document, entity_documents, features_document, links, record_document};
use crate::repository::{EntityState, Repository, Resolution, StoredRecord};

/// Configuration selected when `initialize` is given no configuration id.
pub const DEFAULT_CONFIG_ID: ConfigId = 1;

/// Data sources registered in the default configuration.
pub const DEFAULT_DATA_SOURCES: &[&str] = &["TEST", "SEARCH"];

fn err(code: i64, message: impl Into<String>) -> Error {
    Error::engine(Component::Engine, code, message)
}

/// Re-issue a client-side parse failure as an engine `BAD_INPUT` error.
fn bad_input(error: Error) -> Error {
    match error {
        Error::InvalidInput { reason } => err(codes::BAD_INPUT, reason),
        other => other,
    }
}

fn non_negative(value: i64, name: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| err(codes::BAD_INPUT, format!("{} must not be negative", name)))
}

struct Session {
    instance_name: String,
    config_id: ConfigId,
    extra_sources: BTreeSet<String>,
    data_sources: BTreeSet<String>,
    verbose: bool,
}

#[derive(Debug, Default)]
struct Workload {
    added: u64,
    deleted: u64,
    reevaluated: u64,
    redo_triggers: u64,
    redo_processed: u64,
    searches: u64,
    exports_opened: u64,
}

/// A deterministic in-process engine.
///
/// Records persist across `destroy`/`initialize` like a repository would;
/// open reports do not.
pub struct InMemoryEngine {
    configs: BTreeMap<ConfigId, BTreeSet<String>>,
    session: Option<Session>,
    repo: Repository,
    resolution: Resolution,
    redo: VecDeque<String>,
    exports: FxHashMap<u64, ExportCursor>,
    next_export: u64,
    workload: Workload,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    /// Engine with the default configuration only.
    pub fn new() -> Self {
        let mut configs = BTreeMap::new();
        configs.insert(
            DEFAULT_CONFIG_ID,
            DEFAULT_DATA_SOURCES.iter().map(|s| s.to_string()).collect(),
        );
        Self {
            configs,
            session: None,
            repo: Repository::new(),
            resolution: Resolution::default(),
            redo: VecDeque::new(),
            exports: FxHashMap::default(),
            next_export: 1,
            workload: Workload::default(),
        }
    }

    /// Register (or replace) a configuration.
    pub fn with_config<I, S>(mut self, config_id: ConfigId, data_sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.configs.insert(
            config_id,
            data_sources.into_iter().map(|s| s.as_ref().to_string()).collect(),
        );
        self
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| err(codes::NOT_INITIALIZED, "engine not initialized"))
    }

    fn enter(&self, op: &str) -> Result<()> {
        let session = self.session()?;
        if session.verbose {
            trace!(instance = %session.instance_name, op, "loopback engine call");
        }
        Ok(())
    }

    fn data_source(&self, code: &str) -> Result<String> {
        if self.session()?.data_sources.contains(code) {
            Ok(code.to_string())
        } else {
            Err(err(codes::UNKNOWN_DATA_SOURCE, format!("unknown data source: {}", code)))
        }
    }

    fn record_key(&self, data_source: &str, record_id: &str) -> Result<RecordKey> {
        let data_source = self.data_source(data_source)?;
        if record_id.trim().is_empty() {
            return Err(err(codes::BAD_INPUT, "record id is empty"));
        }
        Ok(RecordKey::new(data_source, record_id))
    }

    fn stored(&self, key: &RecordKey) -> Result<&StoredRecord> {
        self.repo
            .get(key)
            .ok_or_else(|| err(codes::UNKNOWN_RECORD, format!("unknown record: {}", key)))
    }

    fn entity(&self, entity_id: EntityId) -> Result<&EntityState> {
        self.resolution
            .entity(entity_id)
            .ok_or_else(|| err(codes::UNKNOWN_ENTITY, format!("unknown entity id: {}", entity_id)))
    }

    fn entity_of(&self, key: &RecordKey) -> Result<EntityId> {
        self.resolution
            .entity_of(key)
            .ok_or_else(|| err(codes::UNKNOWN_RECORD, format!("unknown record: {}", key)))
    }

    fn config_sources(&self, config_id: ConfigId) -> Result<&BTreeSet<String>> {
        self.configs
            .get(&config_id)
            .ok_or_else(|| err(codes::UNKNOWN_CONFIG_ID, format!("unknown configuration id: {}", config_id)))
    }

    fn profile(name: &str) -> Result<Profile> {
        Profile::parse(name)
            .ok_or_else(|| err(codes::UNKNOWN_SEARCH_PROFILE, format!("unknown search profile: {}", name)))
    }

    /// Re-resolve after a mutation; returns the affected entities.
    fn apply(&mut self, subjects: &[RecordKey]) -> BTreeSet<EntityId> {
        let after = self.repo.resolve();
        let affected = self.resolution.affected(&after, subjects);
        self.resolution = after;
        affected
    }

    fn with_info(key: Option<&RecordKey>, affected: &BTreeSet<EntityId>, flags: EngineFlags) -> String {
        if !flags.contains(EngineFlags::WITH_INFO) {
            return String::new();
        }
        let mut doc = Map::new();
        if let Some(key) = key {
            doc.insert("DATA_SOURCE".into(), json!(key.data_source));
            doc.insert("RECORD_ID".into(), json!(key.record_id));
        }
        let entities: Vec<Value> = affected.iter().map(|id| json!({ "ENTITY_ID": id })).collect();
        doc.insert("AFFECTED_ENTITIES".into(), Value::Array(entities));
        Value::Object(doc).to_string()
    }

    fn reevaluate_key(&mut self, key: &RecordKey, flags: EngineFlags) -> String {
        if self.repo.get(key).is_none() {
            return Self::with_info(Some(key), &BTreeSet::new(), flags);
        }
        let affected = self.apply(std::slice::from_ref(key));
        self.workload.reevaluated += 1;
        Self::with_info(Some(key), &affected, flags)
    }

    fn path_document(
        &self,
        start: EntityId,
        end: EntityId,
        max_degrees: usize,
        avoid: FxHashSet<EntityId>,
        required: BTreeSet<String>,
        flags: EngineFlags,
    ) -> String {
        let query = PathQuery {
            max_degrees,
            avoid: &avoid,
            required: &required,
        };
        let mut path = shortest_path(&self.resolution, start, end, &query);
        if path.is_none() && !avoid.is_empty() && flags.contains(EngineFlags::FIND_PATH_PREFER_EXCLUDE) {
            let relaxed = FxHashSet::default();
            let query = PathQuery {
                avoid: &relaxed,
                ..query
            };
            path = shortest_path(&self.resolution, start, end, &query);
        }

        let steps = path.clone().unwrap_or_default();
        let mut shown: Vec<EntityId> = Vec::new();
        for id in path.unwrap_or_else(|| vec![start, end]) {
            if !shown.contains(&id) {
                shown.push(id);
            }
        }

        let mut doc = Map::new();
        doc.insert(
            "ENTITY_PATHS".into(),
            json!([{ "START_ENTITY_ID": start, "END_ENTITY_ID": end, "ENTITIES": steps }]),
        );
        if flags.contains(EngineFlags::FIND_PATH_INCLUDE_MATCHING_INFO) {
            let pairs: Vec<(EntityId, EntityId)> = steps.windows(2).map(|w| (w[0], w[1])).collect();
            doc.insert("ENTITY_PATH_LINKS".into(), links(&self.resolution, pairs));
        }
        doc.insert(
            "ENTITIES".into(),
            entity_documents(&self.repo, &self.resolution, shown, flags),
        );
        Value::Object(doc).to_string()
    }

    fn network_document(
        &self,
        seeds: Vec<EntityId>,
        max_degrees: usize,
        build_out_degrees: usize,
        max_entities: i64,
        flags: EngineFlags,
    ) -> String {
        let mut seeds_unique: Vec<EntityId> = Vec::new();
        for id in seeds {
            if !seeds_unique.contains(&id) {
                seeds_unique.push(id);
            }
        }
        let no_avoid = FxHashSet::default();
        let no_required = BTreeSet::new();
        let query = PathQuery {
            max_degrees,
            avoid: &no_avoid,
            required: &no_required,
        };

        let mut included: Vec<EntityId> = seeds_unique.clone();
        let mut paths = Vec::new();
        for (i, &start) in seeds_unique.iter().enumerate() {
            for &end in &seeds_unique[i + 1..] {
                let path = shortest_path(&self.resolution, start, end, &query).unwrap_or_default();
                for id in &path {
                    if !included.contains(id) {
                        included.push(*id);
                    }
                }
                paths.push(json!({ "START_ENTITY_ID": start, "END_ENTITY_ID": end, "ENTITIES": path }));
            }
        }

        let cap = usize::try_from(max_entities).unwrap_or(0);
        for id in build_out(&self.resolution, &seeds_unique, build_out_degrees) {
            if included.len() >= cap {
                break;
            }
            if !included.contains(&id) {
                included.push(id);
            }
        }
        included.sort_unstable();

        let mut doc = Map::new();
        doc.insert("ENTITY_PATHS".into(), Value::Array(paths));
        if flags.contains(EngineFlags::FIND_NETWORK_INCLUDE_MATCHING_INFO) {
            let pairs: Vec<(EntityId, EntityId)> = included
                .iter()
                .enumerate()
                .flat_map(|(i, &a)| included[i + 1..].iter().map(move |&b| (a, b)))
                .collect();
            doc.insert("ENTITY_NETWORK_LINKS".into(), links(&self.resolution, pairs));
        }
        doc.insert(
            "ENTITIES".into(),
            entity_documents(&self.repo, &self.resolution, included, flags),
        );
        Value::Object(doc).to_string()
    }

    fn required_sources(&self, json: &str) -> Result<BTreeSet<String>> {
        parse_data_source_list(json)
            .map_err(bad_input)?
            .iter()
            .map(|code| self.data_source(code))
            .collect()
    }

    fn open_report(&mut self, cursor: ExportCursor) -> ExportHandle {
        let handle = self.next_export;
        self.next_export += 1;
        debug!(handle, chunks = cursor.remaining(), "export report opened");
        self.exports.insert(handle, cursor);
        self.workload.exports_opened += 1;
        ExportHandle(handle)
    }

    fn attribute_features(json: &str) -> Result<Vec<crate::features::Feature>> {
        let attributes = parse_object(json, "search attributes").map_err(bad_input)?;
        Ok(extract(&attributes))
    }
}

impl Engine for InMemoryEngine {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn initialize(
        &mut self,
        instance_name: &str,
        settings: &str,
        config_id: Option<ConfigId>,
        verbose_logging: bool,
    ) -> Result<()> {
        if self.session.is_some() {
            return Err(err(codes::ALREADY_INITIALIZED, "engine already initialized"));
        }
        let settings = if settings.trim().is_empty() {
            Map::new()
        } else {
            parse_object(settings, "engine settings").map_err(bad_input)?
        };
        let extra_sources: BTreeSet<String> = match settings.get("DATA_SOURCES") {
            None => BTreeSet::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| err(codes::BAD_INPUT, "DATA_SOURCES entries must be strings"))
                })
                .collect::<Result<_>>()?,
            Some(_) => return Err(err(codes::BAD_INPUT, "DATA_SOURCES must be an array")),
        };

        let config_id = config_id.unwrap_or(DEFAULT_CONFIG_ID);
        let data_sources = self
            .config_sources(config_id)?
            .union(&extra_sources)
            .cloned()
            .collect();
        self.session = Some(Session {
            instance_name: instance_name.to_string(),
            config_id,
            extra_sources,
            data_sources,
            verbose: verbose_logging,
        });
        info!(instance = instance_name, config_id, "loopback engine initialized");
        Ok(())
    }

    fn reinitialize(&mut self, config_id: ConfigId) -> Result<()> {
        self.enter("reinitialize")?;
        let sources = self.config_sources(config_id)?.clone();
        if let Some(session) = self.session.as_mut() {
            session.data_sources = sources.union(&session.extra_sources).cloned().collect();
            session.config_id = config_id;
        }
        info!(config_id, "loopback engine reinitialized");
        Ok(())
    }

    fn prime(&mut self) -> Result<()> {
        self.enter("prime")
    }

    fn get_active_config_id(&mut self) -> Result<ConfigId> {
        Ok(self.session()?.config_id)
    }

    fn destroy(&mut self) -> Result<()> {
        let session = self
            .session
            .take()
            .ok_or_else(|| err(codes::NOT_INITIALIZED, "engine not initialized"))?;
        self.exports.clear();
        info!(instance = %session.instance_name, "loopback engine destroyed");
        Ok(())
    }

    // =========================================================================
    // Record mutation
    // =========================================================================

    fn add_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        record_definition: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        self.enter("add_record")?;
        let key = self.record_key(data_source, record_id)?;
        let document = parse_object(record_definition, "record definition").map_err(bad_input)?;

        if let Some(embedded) = document.get("DATA_SOURCE") {
            let matches = embedded
                .as_str()
                .is_some_and(|ds| ds == key.data_source);
            if !matches {
                return Err(err(codes::BAD_INPUT, "DATA_SOURCE in record does not match the argument"));
            }
        }
        if let Some(embedded) = document.get("RECORD_ID") {
            let embedded = match embedded {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => String::new(),
            };
            if embedded != key.record_id {
                return Err(err(codes::BAD_INPUT, "RECORD_ID in record does not match the argument"));
            }
        }

        let features = extract(&document);
        let replaced = self.repo.upsert(key.clone(), document, features);
        let affected = self.apply(std::slice::from_ref(&key));
        self.workload.added += 1;
        debug!(record = %key, replaced, affected = affected.len(), "record added");
        Ok(Self::with_info(Some(&key), &affected, flags))
    }

    fn delete_record(&mut self, data_source: &str, record_id: &str, flags: EngineFlags) -> Result<String> {
        self.enter("delete_record")?;
        let key = self.record_key(data_source, record_id)?;
        let former = self.resolution.entity_of(&key).and_then(|id| self.resolution.entity(id));
        let co_members: Vec<RecordKey> = former
            .map(|e| e.records.iter().filter(|k| **k != key).cloned().collect())
            .unwrap_or_default();

        if self.repo.remove(&key).is_none() {
            return Ok(Self::with_info(Some(&key), &BTreeSet::new(), flags));
        }
        let affected = self.apply(std::slice::from_ref(&key));
        self.workload.deleted += 1;

        let mut survivors: BTreeMap<EntityId, &RecordKey> = BTreeMap::new();
        for member in &co_members {
            if let Some(id) = self.resolution.entity_of(member) {
                survivors.entry(id).or_insert(member);
            }
        }
        for (entity_id, member) in &survivors {
            self.redo.push_back(
                json!({
                    "REASON": "DELETED_RECORD",
                    "DATA_SOURCE": member.data_source,
                    "RECORD_ID": member.record_id,
                    "ENTITY_ID": entity_id,
                })
                .to_string(),
            );
        }
        self.workload.redo_triggers += survivors.len() as u64;
        debug!(record = %key, redo = survivors.len(), "record deleted");
        Ok(Self::with_info(Some(&key), &affected, flags))
    }

    fn reevaluate_record(&mut self, data_source: &str, record_id: &str, flags: EngineFlags) -> Result<String> {
        self.enter("reevaluate_record")?;
        let key = self.record_key(data_source, record_id)?;
        Ok(self.reevaluate_key(&key, flags))
    }

    fn reevaluate_entity(&mut self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        self.enter("reevaluate_entity")?;
        let members = self
            .resolution
            .entity(entity_id)
            .map(|e| e.records.clone())
            .unwrap_or_default();
        let affected = if members.is_empty() {
            BTreeSet::new()
        } else {
            self.workload.reevaluated += 1;
            self.apply(&members)
        };
        Ok(Self::with_info(None, &affected, flags))
    }

    fn process_redo_record(&mut self, redo_record: &str, flags: EngineFlags) -> Result<String> {
        self.enter("process_redo_record")?;
        let document = parse_object(redo_record, "redo record").map_err(bad_input)?;
        let field = |name: &str| {
            document
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| err(codes::BAD_INPUT, format!("redo record has no {}", name)))
        };
        let key = self.record_key(&field("DATA_SOURCE")?, &field("RECORD_ID")?)?;
        self.workload.redo_processed += 1;
        Ok(self.reevaluate_key(&key, flags))
    }

    fn get_redo_record(&mut self) -> Result<String> {
        self.enter("get_redo_record")?;
        Ok(self.redo.pop_front().unwrap_or_default())
    }

    fn count_redo_records(&mut self) -> Result<i64> {
        self.enter("count_redo_records")?;
        Ok(self.redo.len() as i64)
    }

    // =========================================================================
    // Query
    // =========================================================================

    fn get_entity_by_entity_id(&mut self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        self.enter("get_entity_by_entity_id")?;
        self.entity(entity_id)?;
        Ok(entity_document(&self.repo, &self.resolution, entity_id, flags)
            .unwrap_or_default()
            .to_string())
    }

    fn get_entity_by_record_id(&mut self, data_source: &str, record_id: &str, flags: EngineFlags) -> Result<String> {
        self.enter("get_entity_by_record_id")?;
        let key = self.record_key(data_source, record_id)?;
        let entity_id = self.entity_of(&key)?;
        Ok(entity_document(&self.repo, &self.resolution, entity_id, flags)
            .unwrap_or_default()
            .to_string())
    }

    fn get_virtual_entity_by_record_id(&mut self, record_list: &str, flags: EngineFlags) -> Result<String> {
        self.enter("get_virtual_entity_by_record_id")?;
        let keys = parse_record_list(record_list).map_err(bad_input)?;
        if keys.is_empty() {
            return Err(err(codes::BAD_INPUT, "record list is empty"));
        }
        let mut records = Vec::with_capacity(keys.len());
        for key in &keys {
            let key = self.record_key(&key.data_source, &key.record_id)?;
            let record = self.stored(&key)?;
            if !records.iter().any(|r: &&StoredRecord| r.key == record.key) {
                records.push(record);
            }
        }
        Ok(explain::virtual_entity(&self.repo, records, flags).to_string())
    }

    fn get_record(&mut self, data_source: &str, record_id: &str, flags: EngineFlags) -> Result<String> {
        self.enter("get_record")?;
        let key = self.record_key(data_source, record_id)?;
        self.stored(&key)?;
        Ok(record_document(&self.repo, &key, flags).unwrap_or_default().to_string())
    }

    fn get_record_preview(&mut self, record_definition: &str, flags: EngineFlags) -> Result<String> {
        self.enter("get_record_preview")?;
        let document = parse_object(record_definition, "record definition").map_err(bad_input)?;
        let features = extract(&document);
        let mut doc = Map::new();
        for field in ["DATA_SOURCE", "RECORD_ID"] {
            if let Some(value) = document.get(field) {
                doc.insert(field.into(), value.clone());
            }
        }
        if flags.contains(EngineFlags::ENTITY_INCLUDE_RECORD_FEATURES) {
            doc.insert(
                "FEATURES".into(),
                features_document(&features, false),
            );
        }
        Ok(Value::Object(doc).to_string())
    }

    fn get_stats(&mut self) -> Result<String> {
        self.enter("get_stats")?;
        let w = std::mem::take(&mut self.workload);
        let doc = json!({
            "workload": {
                "apiVersion": env!("CARGO_PKG_VERSION"),
                "loadedRecords": self.repo.len(),
                "entityCount": self.resolution.entities.len(),
                "addedRecords": w.added,
                "deletedRecords": w.deleted,
                "reevaluations": w.reevaluated,
                "redoTriggers": w.redo_triggers,
                "processedRedo": w.redo_processed,
                "searches": w.searches,
                "exportsOpened": w.exports_opened,
                "openExports": self.exports.len(),
                "redoQueue": self.redo.len(),
            }
        });
        Ok(doc.to_string())
    }

    // =========================================================================
    // Relationships
    // =========================================================================

    fn find_path_by_entity_id(
        &mut self,
        start_entity_id: EntityId,
        end_entity_id: EntityId,
        max_degrees: i64,
        avoid_entity_ids: &str,
        required_data_sources: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        self.enter("find_path_by_entity_id")?;
        self.entity(start_entity_id)?;
        self.entity(end_entity_id)?;
        let max_degrees = non_negative(max_degrees, "max degrees")?;
        let avoid = parse_entity_list(avoid_entity_ids)
            .map_err(bad_input)?
            .into_iter()
            .collect();
        let required = self.required_sources(required_data_sources)?;
        Ok(self.path_document(start_entity_id, end_entity_id, max_degrees, avoid, required, flags))
    }

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
    ) -> Result<String> {
        self.enter("find_path_by_record_id")?;
        let start = self.entity_of(&self.record_key(start_data_source, start_record_id)?)?;
        let end = self.entity_of(&self.record_key(end_data_source, end_record_id)?)?;
        let max_degrees = non_negative(max_degrees, "max degrees")?;
        // Avoided records that are not loaded cannot be on a path.
        let avoid = parse_record_list(avoid_record_keys)
            .map_err(bad_input)?
            .iter()
            .filter_map(|k| self.resolution.entity_of(k))
            .collect();
        let required = self.required_sources(required_data_sources)?;
        Ok(self.path_document(start, end, max_degrees, avoid, required, flags))
    }

    fn find_network_by_entity_id(
        &mut self,
        entity_list: &str,
        max_degrees: i64,
        build_out_degrees: i64,
        max_entities: i64,
        flags: EngineFlags,
    ) -> Result<String> {
        self.enter("find_network_by_entity_id")?;
        let seeds = parse_entity_list(entity_list).map_err(bad_input)?;
        if seeds.is_empty() {
            return Err(err(codes::BAD_INPUT, "entity list is empty"));
        }
        for id in &seeds {
            self.entity(*id)?;
        }
        let max_degrees = non_negative(max_degrees, "max degrees")?;
        let build_out_degrees = non_negative(build_out_degrees, "build out degrees")?;
        Ok(self.network_document(seeds, max_degrees, build_out_degrees, max_entities, flags))
    }

    fn find_network_by_record_id(
        &mut self,
        record_list: &str,
        max_degrees: i64,
        build_out_degrees: i64,
        max_entities: i64,
        flags: EngineFlags,
    ) -> Result<String> {
        self.enter("find_network_by_record_id")?;
        let keys = parse_record_list(record_list).map_err(bad_input)?;
        if keys.is_empty() {
            return Err(err(codes::BAD_INPUT, "record list is empty"));
        }
        let seeds = keys
            .iter()
            .map(|k| self.entity_of(&self.record_key(&k.data_source, &k.record_id)?))
            .collect::<Result<Vec<_>>>()?;
        let max_degrees = non_negative(max_degrees, "max degrees")?;
        let build_out_degrees = non_negative(build_out_degrees, "build out degrees")?;
        Ok(self.network_document(seeds, max_degrees, build_out_degrees, max_entities, flags))
    }

    // =========================================================================
    // Search and explainability
    // =========================================================================

    fn search_by_attributes(&mut self, attributes: &str, search_profile: &str, flags: EngineFlags) -> Result<String> {
        self.enter("search_by_attributes")?;
        let features = Self::attribute_features(attributes)?;
        let profile = Self::profile(search_profile)?;
        self.workload.searches += 1;
        Ok(explain::search(&self.repo, &self.resolution, &features, profile, flags).to_string())
    }

    fn why_entities(&mut self, entity_id_1: EntityId, entity_id_2: EntityId, flags: EngineFlags) -> Result<String> {
        self.enter("why_entities")?;
        let first = self.entity(entity_id_1)?;
        let second = self.entity(entity_id_2)?;
        Ok(explain::why_entities(&self.repo, &self.resolution, first, second, flags).to_string())
    }

    fn why_records(
        &mut self,
        data_source_1: &str,
        record_id_1: &str,
        data_source_2: &str,
        record_id_2: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        self.enter("why_records")?;
        let first = self.stored(&self.record_key(data_source_1, record_id_1)?)?;
        let second = self.stored(&self.record_key(data_source_2, record_id_2)?)?;
        Ok(explain::why_records(&self.repo, &self.resolution, first, second, flags).to_string())
    }

    fn why_record_in_entity(&mut self, data_source: &str, record_id: &str, flags: EngineFlags) -> Result<String> {
        self.enter("why_record_in_entity")?;
        let key = self.record_key(data_source, record_id)?;
        let record = self.stored(&key)?;
        let entity = self.entity(self.entity_of(&key)?)?;
        Ok(explain::why_record_in_entity(&self.repo, &self.resolution, record, entity, flags).to_string())
    }

    fn why_search(
        &mut self,
        attributes: &str,
        entity_id: EntityId,
        search_profile: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        self.enter("why_search")?;
        let features = Self::attribute_features(attributes)?;
        let profile = Self::profile(search_profile)?;
        let entity = self.entity(entity_id)?;
        Ok(explain::why_search(&self.repo, &self.resolution, &features, entity, profile, flags).to_string())
    }

    fn how_entity_by_entity_id(&mut self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        self.enter("how_entity_by_entity_id")?;
        let entity = self.entity(entity_id)?;
        Ok(explain::how_entity(&self.repo, &self.resolution, entity, flags).to_string())
    }

    // =========================================================================
    // Export
    // =========================================================================

    fn export_json_entity_report(&mut self, flags: EngineFlags) -> Result<ExportHandle> {
        self.enter("export_json_entity_report")?;
        let cursor = export::json_report(&self.repo, &self.resolution, flags);
        Ok(self.open_report(cursor))
    }

    fn export_csv_entity_report(&mut self, column_list: &str, flags: EngineFlags) -> Result<ExportHandle> {
        self.enter("export_csv_entity_report")?;
        let columns = export::parse_columns(column_list)
            .map_err(|column| err(codes::BAD_INPUT, format!("unknown CSV column: {}", column)))?;
        let cursor = export::csv_report(&self.repo, &self.resolution, &columns, flags)
            .map_err(|reason| err(codes::REPORT_FAILED, format!("CSV report failed: {}", reason)))?;
        Ok(self.open_report(cursor))
    }

    fn fetch_next(&mut self, handle: ExportHandle) -> Result<String> {
        self.enter("fetch_next")?;
        self.exports
            .get_mut(&handle.as_u64())
            .map(ExportCursor::next_chunk)
            .ok_or_else(|| err(codes::UNKNOWN_EXPORT_HANDLE, format!("unknown export handle: {}", handle)))
    }

    fn close_export_report(&mut self, handle: ExportHandle) -> Result<()> {
        self.enter("close_export_report")?;
        match self.exports.remove(&handle.as_u64()) {
            Some(_) => {
                debug!(handle = handle.as_u64(), "export report closed");
                Ok(())
            }
            None => Err(err(codes::UNKNOWN_EXPORT_HANDLE, format!("unknown export handle: {}", handle))),
        }
    }

    // =========================================================================
    // Product
    // =========================================================================

    fn get_version(&mut self) -> Result<String> {
        self.session()
            .map_err(|_| Error::engine(Component::Product, codes::NOT_INITIALIZED, "product not initialized"))?;
        Ok(json!({
            "PRODUCT_NAME": "erbind loopback engine",
            "VERSION": env!("CARGO_PKG_VERSION"),
            "COMPATIBILITY_VERSION": { "CONFIG_VERSION": DEFAULT_CONFIG_ID },
        })
        .to_string())
    }

    fn get_license(&mut self) -> Result<String> {
        self.session()
            .map_err(|_| Error::engine(Component::Product, codes::NOT_INITIALIZED, "product not initialized"))?;
        Ok(json!({
            "customer": "",
            "licenseType": "EVAL",
            "recordLimit": 0,
        })
        .to_string())
    }
}
