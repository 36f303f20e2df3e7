//! JSON argument documents.
//!
//! The engine boundary takes entity lists, record lists and data source lists
//! as small JSON documents:
//!
//! ```text
//! {"ENTITIES":[{"ENTITY_ID":1},{"ENTITY_ID":7}]}
//! {"RECORDS":[{"DATA_SOURCE":"TEST","RECORD_ID":"1001"}]}
//! {"DATA_SOURCES":["TEST","SEARCH"]}
//! ```
//!
//! An empty list is sent as an empty string, which the engine reads as
//! "no constraint". Builders and parsers for both directions live here so
//! the client and the engines agree on one shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{EntityId, RecordKey};

#[derive(Serialize, Deserialize)]
struct EntityRef {
    #[serde(rename = "ENTITY_ID")]
    entity_id: EntityId,
}

#[derive(Serialize, Deserialize)]
struct EntityList {
    #[serde(rename = "ENTITIES")]
    entities: Vec<EntityRef>,
}

#[derive(Serialize, Deserialize)]
struct RecordList {
    #[serde(rename = "RECORDS")]
    records: Vec<RecordKey>,
}

#[derive(Serialize, Deserialize)]
struct DataSourceList {
    #[serde(rename = "DATA_SOURCES")]
    data_sources: Vec<String>,
}

/// Serialize an entity list, or `""` when empty.
pub fn entity_list(ids: &[EntityId]) -> Result<String> {
    if ids.is_empty() {
        return Ok(String::new());
    }
    let doc = EntityList {
        entities: ids.iter().map(|&entity_id| EntityRef { entity_id }).collect(),
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Serialize a record list, or `""` when empty.
pub fn record_list(keys: &[RecordKey]) -> Result<String> {
    if keys.is_empty() {
        return Ok(String::new());
    }
    let doc = RecordList {
        records: keys.to_vec(),
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Serialize a data source list, or `""` when empty.
pub fn data_source_list<S: AsRef<str>>(codes: &[S]) -> Result<String> {
    if codes.is_empty() {
        return Ok(String::new());
    }
    let doc = DataSourceList {
        data_sources: codes.iter().map(|c| c.as_ref().to_string()).collect(),
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Parse an entity list; `""` yields an empty list.
pub fn parse_entity_list(json: &str) -> Result<Vec<EntityId>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: EntityList = serde_json::from_str(json)?;
    Ok(doc.entities.into_iter().map(|e| e.entity_id).collect())
}

/// Parse a record list; `""` yields an empty list.
pub fn parse_record_list(json: &str) -> Result<Vec<RecordKey>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: RecordList = serde_json::from_str(json)?;
    Ok(doc.records)
}

/// Parse a data source list; `""` yields an empty list.
pub fn parse_data_source_list(json: &str) -> Result<Vec<String>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: DataSourceList = serde_json::from_str(json)?;
    Ok(doc.data_sources)
}

/// Parse a document that must be a JSON object.
pub fn parse_object(json: &str, what: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::invalid_input(format!("{} must be a JSON object", what))),
        Err(e) => Err(Error::invalid_input(format!("{} is not valid JSON: {}", what, e))),
    }
}
