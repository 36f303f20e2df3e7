//! Engine C API bindings loaded at runtime.
//!
//! Uses the `DynLib` wrapper from `dl.rs` to load the engine library and
//! resolve every entry point once in [`EngineApi::load`]. The resolved table
//! is cached per library path for the lifetime of the process: the engine
//! keeps process-global state, so loading the same library twice buys
//! nothing.
//!
//! Calling convention of the C API:
//! - string-returning calls return [`StringResult`]; a non-null `response`
//!   is owned by the caller and released with `ErEngine_free`;
//! - integer-returning calls return [`I64Result`], export-opening calls
//!   return [`HandleResult`];
//! - a non-zero `return_code` means failure; details are read with
//!   `ErEngine_getLastException` / `ErEngine_getLastExceptionCode` and reset
//!   with `ErEngine_clearLastException`.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use erbind_core::Result;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::dl::DynLib;

// ---------------------------------------------------------------------------
// C API types
// ---------------------------------------------------------------------------

/// Engine return code; zero is success.
pub type ReturnCode = i64;

/// Result of a string-returning call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StringResult {
    /// Engine-allocated response, may be null
    pub response: *mut c_char,
    /// Zero on success
    pub return_code: ReturnCode,
}

/// Result of an integer-returning call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct I64Result {
    /// Returned value
    pub response: i64,
    /// Zero on success
    pub return_code: ReturnCode,
}

/// Result of an export-opening call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HandleResult {
    /// Opaque report handle
    pub response: usize,
    /// Zero on success
    pub return_code: ReturnCode,
}

/// Default library file name for this platform.
#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY: &str = "liberengine.dylib";
/// Default library file name for this platform.
#[cfg(windows)]
pub const DEFAULT_LIBRARY: &str = "erengine.dll";
/// Default library file name for this platform.
#[cfg(not(any(target_os = "macos", windows)))]
pub const DEFAULT_LIBRARY: &str = "liberengine.so";

/// Resolve an exported entry point as a typed fn pointer.
macro_rules! load_sym {
    ($lib:expr, $name:expr) => {{
        let cname = concat!($name, "\0");
        let cstr = unsafe { CStr::from_bytes_with_nul_unchecked(cname.as_bytes()) };
        let ptr = unsafe { $lib.sym(cstr) }.map_err(|e| erbind_core::Error::Library {
            reason: format!("failed to load {}: {}", $name, e),
        })?;
        if ptr.is_null() {
            return Err(erbind_core::Error::Library {
                reason: format!("{} resolved to null", $name),
            });
        }
        unsafe { std::mem::transmute::<*mut c_void, _>(ptr) }
    }};
}

/// Declares the resolved function table and its loader in one place so a
/// symbol cannot be declared without being resolved.
macro_rules! engine_api {
    ($( $field:ident = $symbol:literal : fn($($arg:ty),*) -> $ret:ty; )*) => {
        /// The loaded engine library and all resolved entry points.
        pub struct EngineApi {
            /// Owns the mapping the entry points above point into.
            _lib: DynLib,
            $( pub(crate) $field: unsafe extern "C" fn($($arg),*) -> $ret, )*
        }

        impl EngineApi {
            fn resolve(lib: DynLib) -> Result<Self> {
                $( let $field: unsafe extern "C" fn($($arg),*) -> $ret = load_sym!(lib, $symbol); )*
                Ok(Self { _lib: lib, $($field,)* })
            }
        }
    };
}

engine_api! {
    // Lifecycle
    initialize = "ErEngine_initialize": fn(*const c_char, *const c_char, i64, i64) -> ReturnCode;
    reinitialize = "ErEngine_reinitialize": fn(i64) -> ReturnCode;
    prime_engine = "ErEngine_primeEngine": fn() -> ReturnCode;
    get_active_config_id = "ErEngine_getActiveConfigID": fn() -> I64Result;
    destroy = "ErEngine_destroy": fn() -> ReturnCode;

    // Record mutation
    add_record = "ErEngine_addRecord": fn(*const c_char, *const c_char, *const c_char, i64) -> StringResult;
    delete_record = "ErEngine_deleteRecord": fn(*const c_char, *const c_char, i64) -> StringResult;
    reevaluate_record = "ErEngine_reevaluateRecord": fn(*const c_char, *const c_char, i64) -> StringResult;
    reevaluate_entity = "ErEngine_reevaluateEntity": fn(i64, i64) -> StringResult;
    process_redo_record = "ErEngine_processRedoRecord": fn(*const c_char, i64) -> StringResult;
    get_redo_record = "ErEngine_getRedoRecord": fn() -> StringResult;
    count_redo_records = "ErEngine_countRedoRecords": fn() -> I64Result;

    // Query
    get_entity_by_entity_id = "ErEngine_getEntityByEntityID": fn(i64, i64) -> StringResult;
    get_entity_by_record_id = "ErEngine_getEntityByRecordID": fn(*const c_char, *const c_char, i64) -> StringResult;
    get_virtual_entity_by_record_id = "ErEngine_getVirtualEntityByRecordID": fn(*const c_char, i64) -> StringResult;
    get_record = "ErEngine_getRecord": fn(*const c_char, *const c_char, i64) -> StringResult;
    get_record_preview = "ErEngine_getRecordPreview": fn(*const c_char, i64) -> StringResult;
    get_stats = "ErEngine_getStats": fn() -> StringResult;

    // Relationships
    find_path_by_entity_id = "ErEngine_findPathByEntityID":
        fn(i64, i64, i64, *const c_char, *const c_char, i64) -> StringResult;
    find_path_by_record_id = "ErEngine_findPathByRecordID":
        fn(*const c_char, *const c_char, *const c_char, *const c_char, i64, *const c_char, *const c_char, i64) -> StringResult;
    find_network_by_entity_id = "ErEngine_findNetworkByEntityID":
        fn(*const c_char, i64, i64, i64, i64) -> StringResult;
    find_network_by_record_id = "ErEngine_findNetworkByRecordID":
        fn(*const c_char, i64, i64, i64, i64) -> StringResult;

    // Search and explainability
    search_by_attributes = "ErEngine_searchByAttributes": fn(*const c_char, *const c_char, i64) -> StringResult;
    why_entities = "ErEngine_whyEntities": fn(i64, i64, i64) -> StringResult;
    why_records = "ErEngine_whyRecords":
        fn(*const c_char, *const c_char, *const c_char, *const c_char, i64) -> StringResult;
    why_record_in_entity = "ErEngine_whyRecordInEntity": fn(*const c_char, *const c_char, i64) -> StringResult;
    why_search = "ErEngine_whySearch": fn(*const c_char, i64, *const c_char, i64) -> StringResult;
    how_entity_by_entity_id = "ErEngine_howEntityByEntityID": fn(i64, i64) -> StringResult;

    // Export
    export_json_entity_report = "ErEngine_exportJSONEntityReport": fn(i64) -> HandleResult;
    export_csv_entity_report = "ErEngine_exportCSVEntityReport": fn(*const c_char, i64) -> HandleResult;
    fetch_next = "ErEngine_fetchNext": fn(usize) -> StringResult;
    close_export_report = "ErEngine_closeExportReport": fn(usize) -> ReturnCode;

    // Product
    get_version = "ErProduct_getVersion": fn() -> StringResult;
    get_license = "ErProduct_getLicense": fn() -> StringResult;

    // Diagnostics and memory
    get_last_exception = "ErEngine_getLastException": fn(*mut c_char, usize) -> i64;
    get_last_exception_code = "ErEngine_getLastExceptionCode": fn() -> i64;
    clear_last_exception = "ErEngine_clearLastException": fn() -> ();
    free = "ErEngine_free": fn(*mut c_char) -> ();
}

/// Libraries already loaded in this process, keyed by the requested path.
static LOADED: Lazy<Mutex<FxHashMap<PathBuf, Arc<EngineApi>>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

impl EngineApi {
    /// Load the engine library at `path` (or [`DEFAULT_LIBRARY`]) and resolve
    /// every entry point. Repeated loads of the same path share one table.
    pub fn load(path: Option<&Path>) -> Result<Arc<EngineApi>> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY));

        let mut loaded = LOADED.lock();
        if let Some(api) = loaded.get(&path) {
            return Ok(Arc::clone(api));
        }

        let lib = DynLib::open(&path)?;
        let api = Arc::new(EngineApi::resolve(lib)?);
        tracing::info!(library = %path.display(), "engine library loaded");
        loaded.insert(path, Arc::clone(&api));
        Ok(api)
    }
}
