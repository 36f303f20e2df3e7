//! Core types and traits for erbind
//!
//! This crate defines the vocabulary shared by the client and the engines:
//! - Error: structured engine and client errors
//! - EngineFlags: typed request options
//! - RecordKey, EntityId, ExportHandle: identifiers crossing the boundary
//! - Engine: the request/response boundary trait
//! - json: builders and parsers for list arguments

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod flags;
pub mod json;
pub mod traits;
pub mod types;

pub use error::{Component, Error, Result};
pub use flags::EngineFlags;
pub use traits::Engine;
pub use types::{ConfigId, EntityId, ExportHandle, RecordKey};
