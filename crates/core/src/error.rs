//! Error types for engine calls.
//!
//! Every failure crossing the engine boundary is represented by [`Error`].
//! Engine failures are echoed verbatim: the numeric return code and message
//! come from the engine and the client adds only the originating
//! [`Component`]. Lifecycle misuse and export-handle misuse are detected
//! locally and never reach the engine.
//!
//! # Categories
//!
//! | Category | Variants | Raised by |
//! |----------|----------|-----------|
//! | Engine | `Engine` | the engine (non-zero return code) |
//! | Lifecycle | `NotInitialized`, `AlreadyInitialized`, `Destroyed` | the client |
//! | Handles | `UnknownExportHandle` | the client |
//! | Input | `Initialization`, `InvalidInput`, `InvalidFlags` | the client |
//! | System | `Library`, `Config` | the client |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// The engine component a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Record, query, relationship, search and export calls.
    Engine,
    /// Product version and license calls.
    Product,
}

impl Component {
    /// Stable identifier used when rendering errors.
    pub fn id(&self) -> &'static str {
        match self {
            Component::Engine => "erbind-engine",
            Component::Product => "erbind-product",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Engine call errors.
///
/// Callers distinguish engine failure kinds by [`Error::code`], never by
/// matching on the message text.
///
/// # Example
///
/// ```ignore
/// match resolver.get_entity_by_entity_id(42, EngineFlags::ENTITY_DEFAULT_FLAGS) {
///     Ok(json) => println!("{json}"),
///     Err(e) if e.code() == Some(37) => println!("no such entity"),
///     Err(e) => return Err(e),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Engine ====================
    /// The engine returned a non-zero return code
    #[error("{component} error {code}: {message}")]
    Engine {
        /// Component the call was issued against
        component: Component,
        /// Engine return code, echoed verbatim
        code: i64,
        /// Engine-supplied message
        message: String,
    },

    // ==================== Lifecycle ====================
    /// An operation was issued before `initialize`
    #[error("engine not initialized")]
    NotInitialized,

    /// `initialize` was issued on an attachment that is already initialized
    #[error("engine already initialized")]
    AlreadyInitialized,

    /// An operation was issued after `destroy`
    #[error("engine destroyed")]
    Destroyed,

    // ==================== Handles ====================
    /// Export handle was never opened or is already closed
    #[error("unknown export handle: {handle}")]
    UnknownExportHandle {
        /// The offending handle value
        handle: u64,
    },

    // ==================== Input ====================
    /// Engine settings were rejected before attaching
    #[error("initialization failed: {reason}")]
    Initialization {
        /// Why the settings were rejected
        reason: String,
    },

    /// An argument cannot cross the engine boundary
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What is wrong with the argument
        reason: String,
    },

    /// A raw bitmask carries bits outside the recognized flag table
    #[error("invalid flags: unrecognized bits {bits:#x}")]
    InvalidFlags {
        /// The unrecognized bits
        bits: u64,
    },

    // ==================== System ====================
    /// The native library or one of its symbols could not be loaded
    #[error("library error: {reason}")]
    Library {
        /// Loader message
        reason: String,
    },

    /// The client configuration could not be read or parsed
    #[error("config error: {reason}")]
    Config {
        /// Why the configuration was rejected
        reason: String,
    },
}

impl Error {
    /// Build an engine error.
    pub fn engine(component: Component, code: i64, message: impl Into<String>) -> Self {
        Error::Engine {
            component,
            code,
            message: message.into(),
        }
    }

    /// Build an invalid-input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Engine return code, if this error came from the engine.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Originating component, if this error came from the engine.
    pub fn component(&self) -> Option<Component> {
        match self {
            Error::Engine { component, .. } => Some(*component),
            _ => None,
        }
    }

    /// True for lifecycle misuse (calls before `initialize` or after `destroy`,
    /// or a second `initialize`).
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Error::NotInitialized | Error::AlreadyInitialized | Error::Destroyed
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidInput {
            reason: format!("invalid JSON: {}", e),
        }
    }
}
