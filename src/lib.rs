//! erbind - Rust client for an external entity-resolution engine
//!
//! An entity-resolution engine ingests records from many data sources,
//! decides which records describe the same real-world entity, and answers
//! queries about the resulting entities and their relationships. erbind
//! attaches to such an engine and exposes it through one typed façade.
//!
//! # Quick Start
//!
//! ```ignore
//! use erbind::{EngineFlags, RecordKey, Resolver};
//!
//! // Attach using ./erbind.toml (written with defaults if missing)
//! let resolver = Resolver::open("erbind.toml")?;
//!
//! // Load a record
//! let key = RecordKey::new("CUSTOMERS", "1001");
//! resolver.add_record(&key, r#"{"NAME_FULL": "Robert Smith"}"#, EngineFlags::NO_FLAGS)?;
//!
//! // Read back its entity
//! let entity = resolver.get_entity_by_record_id(&key, EngineFlags::ENTITY_DEFAULT_FLAGS)?;
//! ```
//!
//! # Architecture
//!
//! Every call goes through the [`Engine`] boundary trait. [`NativeEngine`]
//! implements it over the engine's shared library; the `erbind-memory`
//! crate provides an in-process loopback engine for tests and demos.
//! The [`Resolver`] struct serializes calls on one attachment, enforces the
//! lifecycle, and tracks export handles.

// Re-export the public API from erbind-client
pub use erbind_client::*;
