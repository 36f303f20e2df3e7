//! # erbind-client
//!
//! Typed client over an entity-resolution engine attachment.
//!
//! [`Resolver`] owns one attachment to an [`Engine`] and exposes every engine
//! operation as a typed method: lifecycle, record mutation, queries,
//! relationship discovery, search and explainability, bulk export, and the
//! product component. Responses are the engine's JSON documents, returned
//! verbatim.
//!
//! ```text
//! use erbind_client::{EngineFlags, RecordKey, Resolver};
//!
//! let resolver = Resolver::open("erbind.toml")?;
//! resolver.add_record(
//!     &RecordKey::new("CUSTOMERS", "1001"),
//!     r#"{"NAME_FULL": "Robert Smith", "PHONE_NUMBER": "555-1212"}"#,
//!     EngineFlags::NO_FLAGS,
//! )?;
//! let entity = resolver.get_entity_by_record_id(
//!     &RecordKey::new("CUSTOMERS", "1001"),
//!     EngineFlags::ENTITY_DEFAULT_FLAGS,
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod api;
mod config;

pub use api::{ExportReport, LifecycleState, Resolver};
pub use config::{LibraryConfig, ResolverConfig, CONFIG_FILE_NAME};

pub use erbind_core::{
    json, Component, ConfigId, Engine, EngineFlags, EntityId, Error, ExportHandle, RecordKey,
    Result,
};
pub use erbind_native::NativeEngine;
