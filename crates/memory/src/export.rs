//! Entity report snapshots.
//!
//! A report is rendered in full when it is opened and then handed out one
//! chunk per `fetch_next`, so later mutations never show up in an open
//! report.

use std::collections::VecDeque;

use erbind_core::{EngineFlags, EntityId};
use serde_json::Value;

use crate::features::MatchLevel;
use crate::render::{entity_document, relation_selected};
use crate::repository::{EntityState, Repository, Resolution};

/// Columns a CSV report may carry.
pub const CSV_COLUMNS: &[&str] = &[
    "RESOLVED_ENTITY_ID",
    "RESOLVED_ENTITY_NAME",
    "RELATED_ENTITY_ID",
    "MATCH_LEVEL",
    "MATCH_LEVEL_CODE",
    "MATCH_KEY",
    "DATA_SOURCE",
    "RECORD_ID",
    "JSON_DATA",
];

/// Columns used when the caller asks for the default set.
pub const DEFAULT_CSV_COLUMNS: &[&str] = &[
    "RESOLVED_ENTITY_ID",
    "RELATED_ENTITY_ID",
    "MATCH_LEVEL_CODE",
    "MATCH_KEY",
    "DATA_SOURCE",
    "RECORD_ID",
];

/// An open report.
#[derive(Debug, Default)]
pub struct ExportCursor {
    chunks: VecDeque<String>,
}

impl ExportCursor {
    /// Next chunk, or `""` once exhausted.
    pub fn next_chunk(&mut self) -> String {
        self.chunks.pop_front().unwrap_or_default()
    }

    /// Chunks not yet fetched.
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

/// Parse a column list. `""` or `"*"` selects [`DEFAULT_CSV_COLUMNS`].
///
/// Returns the offending name on an unknown column.
pub fn parse_columns(columns: &str) -> Result<Vec<&'static str>, String> {
    let trimmed = columns.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Ok(DEFAULT_CSV_COLUMNS.to_vec());
    }
    trimmed
        .split(',')
        .map(|c| c.trim().to_uppercase())
        .map(|c| {
            CSV_COLUMNS
                .iter()
                .find(|known| **known == c)
                .copied()
                .ok_or(c)
        })
        .collect()
}

fn selected(res: &Resolution, entity: &EntityState, flags: EngineFlags) -> bool {
    let filters = EngineFlags::EXPORT_INCLUDE_MULTI_RECORD_ENTITIES
        | EngineFlags::EXPORT_INCLUDE_SINGLE_RECORD_ENTITIES
        | EngineFlags::EXPORT_INCLUDE_POSSIBLY_RELATED
        | EngineFlags::EXPORT_INCLUDE_NAME_ONLY;
    if !flags.intersects(filters) {
        return true;
    }
    let size = entity.records.len();
    let has = |level: MatchLevel| res.related(entity.id).any(|(_, r)| r.level == level);
    (flags.contains(EngineFlags::EXPORT_INCLUDE_MULTI_RECORD_ENTITIES) && size > 1)
        || (flags.contains(EngineFlags::EXPORT_INCLUDE_SINGLE_RECORD_ENTITIES) && size == 1)
        || (flags.contains(EngineFlags::EXPORT_INCLUDE_POSSIBLY_RELATED) && has(MatchLevel::PossiblyRelated))
        || (flags.contains(EngineFlags::EXPORT_INCLUDE_NAME_ONLY) && has(MatchLevel::NameOnly))
}

fn exported(res: &Resolution, flags: EngineFlags) -> impl Iterator<Item = &EntityState> {
    res.entities.values().filter(move |e| selected(res, e, flags))
}

/// JSON report: one entity document per chunk, newline terminated.
pub fn json_report(repo: &Repository, res: &Resolution, flags: EngineFlags) -> ExportCursor {
    let chunks = exported(res, flags)
        .filter_map(|e| entity_document(repo, res, e.id, flags))
        .map(|doc| format!("{}\n", doc))
        .collect();
    ExportCursor { chunks }
}

/// One CSV line, newline terminated, quoted where a field needs it.
fn csv_line<I, T>(fields: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields).map_err(|e| e.to_string())?;
    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

struct CsvRow<'a> {
    entity: &'a EntityState,
    related: EntityId,
    level: MatchLevel,
    match_key: &'a str,
    record: &'a erbind_core::RecordKey,
    first: bool,
}

impl CsvRow<'_> {
    fn render(&self, repo: &Repository, columns: &[&str]) -> Result<String, String> {
        let fields: Vec<String> = columns
            .iter()
            .map(|column| match *column {
                "RESOLVED_ENTITY_ID" => self.entity.id.to_string(),
                "RESOLVED_ENTITY_NAME" => self
                    .entity
                    .records
                    .iter()
                    .filter_map(|k| repo.get(k))
                    .flat_map(|r| r.features.iter())
                    .find(|f| f.kind == crate::features::FeatureKind::Name)
                    .map(|f| f.value.clone())
                    .unwrap_or_default(),
                "RELATED_ENTITY_ID" => self.related.to_string(),
                "MATCH_LEVEL" => (if self.first { 0 } else { self.level.number() }).to_string(),
                "MATCH_LEVEL_CODE" => (if self.first { "" } else { self.level.code() }).to_string(),
                "MATCH_KEY" => self.match_key.to_string(),
                "DATA_SOURCE" => self.record.data_source.clone(),
                "RECORD_ID" => self.record.record_id.clone(),
                "JSON_DATA" => repo
                    .get(self.record)
                    .map(|r| Value::Object(r.json.clone()).to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .collect();
        csv_line(&fields)
    }
}

/// CSV report: the header line, then one row per chunk.
///
/// Each entity contributes a row per member record; relationships selected
/// by the `ENTITY_INCLUDE_*_RELATIONS` options contribute a row naming the
/// related entity and its first record. Fails only if a line cannot be
/// written.
pub fn csv_report(
    repo: &Repository,
    res: &Resolution,
    columns: &[&str],
    flags: EngineFlags,
) -> Result<ExportCursor, String> {
    let mut chunks = VecDeque::new();
    chunks.push_back(csv_line(columns)?);
    for entity in exported(res, flags) {
        for (i, record) in entity.records.iter().enumerate() {
            let match_key = entity.match_info.get(record).map(|(k, _)| k.as_str()).unwrap_or("");
            let row = CsvRow {
                entity,
                related: 0,
                level: MatchLevel::Resolved,
                match_key,
                record,
                first: i == 0,
            };
            chunks.push_back(row.render(repo, columns)?);
        }
        for (other, relation) in res.related(entity.id) {
            if !relation_selected(relation, flags) {
                continue;
            }
            let Some(record) = res.entity(other).and_then(|o| o.records.first()) else {
                continue;
            };
            let row = CsvRow {
                entity,
                related: other,
                level: relation.level,
                match_key: &relation.key,
                record,
                first: false,
            };
            chunks.push_back(row.render(repo, columns)?);
        }
    }
    Ok(ExportCursor { chunks })
}
