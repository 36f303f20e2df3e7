//! # erbind-memory
//!
//! A deterministic, in-process [`Engine`](erbind_core::Engine) used by tests
//! and demos in place of the native library.
//!
//! Records are reduced to normalized features, resolved with a union-find
//! over record pairs and related when they share non-resolving features.
//! Every mutation re-resolves the whole repository, so results depend only
//! on the set of loaded records and their load order.
//!
//! ```text
//! use erbind_memory::InMemoryEngine;
//!
//! let engine = InMemoryEngine::new().with_config(2, ["CUSTOMERS", "WATCHLIST"]);
//! ```

#![warn(missing_docs)]

pub mod codes;
mod dsu;
mod engine;
mod explain;
mod export;
mod features;
mod graph;
mod render;
mod repository;

pub use engine::{InMemoryEngine, DEFAULT_CONFIG_ID, DEFAULT_DATA_SOURCES};
pub use export::{CSV_COLUMNS, DEFAULT_CSV_COLUMNS};
