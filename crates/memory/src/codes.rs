//! Return codes emitted by the loopback engine.
//!
//! Codes live in the engine's own numeric space and reach callers verbatim
//! through [`Error::Engine`](erbind_core::Error::Engine).

/// Malformed argument or document.
pub const BAD_INPUT: i64 = 2;
/// A report could not be rendered.
pub const REPORT_FAILED: i64 = 7;
/// Record is not loaded.
pub const UNKNOWN_RECORD: i64 = 33;
/// Entity id does not exist.
pub const UNKNOWN_ENTITY: i64 = 37;
/// Report handle was never opened or is closed.
pub const UNKNOWN_EXPORT_HANDLE: i64 = 45;
/// Call issued before `initialize` or after `destroy`.
pub const NOT_INITIALIZED: i64 = 48;
/// `initialize` issued twice.
pub const ALREADY_INITIALIZED: i64 = 49;
/// Data source is not registered in the active configuration.
pub const UNKNOWN_DATA_SOURCE: i64 = 2207;
/// Configuration id is not registered.
pub const UNKNOWN_CONFIG_ID: i64 = 7221;
/// Search profile name is not recognized.
pub const UNKNOWN_SEARCH_PROFILE: i64 = 7222;
