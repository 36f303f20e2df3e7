//! High-level typed wrapper over an engine attachment.
//!
//! The [`Resolver`] struct owns one [`Engine`] attachment and exposes its
//! operations as typed method calls, grouped by concern:
//!
//! - lifecycle (this module)
//! - record mutation and redo processing (`records`)
//! - entity and record queries (`query`)
//! - relationship paths and networks (`paths`)
//! - search and explainability (`search`)
//! - bulk export (`export`)
//! - product version and license (`product`)
//!
//! ## Lifecycle
//!
//! An attachment goes through `Detached -> Attached -> Destroyed` exactly
//! once. Every operation other than `initialize` requires the `Attached`
//! state and fails locally with [`Error::NotInitialized`] or
//! [`Error::Destroyed`] otherwise, without reaching the engine.
//!
//! ## Concurrency
//!
//! Calls on one attachment are serialized behind a mutex, so a `Resolver`
//! can be shared across threads through an `Arc`.
//!
//! # Example
//!
//! ```text
//! use erbind_client::{EngineFlags, RecordKey, Resolver};
//! use erbind_memory::InMemoryEngine;
//!
//! let resolver = Resolver::new(InMemoryEngine::new());
//! resolver.initialize("demo", "{}", None, false)?;
//! resolver.add_record(&RecordKey::new("TEST", "1"), r#"{"NAME_FULL": "Ann Lee"}"#, EngineFlags::NO_FLAGS)?;
//! resolver.destroy()?;
//! ```

mod export;
mod paths;
mod product;
mod query;
mod records;
mod search;

pub use export::ExportReport;

use std::fmt;
use std::path::Path;

use erbind_core::{json, ConfigId, Engine, Error, ExportHandle, Result};
use erbind_native::NativeEngine;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::config::ResolverConfig;

/// Where an attachment is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Created, `initialize` not yet called (or it failed)
    Detached,
    /// `initialize` succeeded; operations are accepted
    Attached,
    /// `destroy` was called; the resolver is unusable
    Destroyed,
}

struct Attachment {
    engine: Box<dyn Engine>,
    state: LifecycleState,
    open_exports: FxHashSet<ExportHandle>,
}

impl Attachment {
    fn require_attached(&self) -> Result<()> {
        match self.state {
            LifecycleState::Attached => Ok(()),
            LifecycleState::Detached => Err(Error::NotInitialized),
            LifecycleState::Destroyed => Err(Error::Destroyed),
        }
    }
}

/// High-level typed wrapper for engine operations.
///
/// Responses are the engine's JSON documents, returned verbatim. Engine
/// failures surface as [`Error::Engine`] carrying the engine's code and
/// message unchanged.
pub struct Resolver {
    inner: Mutex<Attachment>,
}

impl Resolver {
    /// Wrap an engine. The attachment starts [`LifecycleState::Detached`].
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self::from_boxed(Box::new(engine))
    }

    /// Wrap an already boxed engine.
    pub fn from_boxed(engine: Box<dyn Engine>) -> Self {
        Self {
            inner: Mutex::new(Attachment {
                engine,
                state: LifecycleState::Detached,
                open_exports: FxHashSet::default(),
            }),
        }
    }

    /// Load the native engine named by the config file at `path` and
    /// initialize it.
    ///
    /// A default `erbind.toml` is written first if the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        ResolverConfig::write_default_if_missing(path)?;
        let config = ResolverConfig::from_file(path)?;
        let engine = NativeEngine::load(config.library.path.as_deref())?;
        Self::open_with(engine, &config)
    }

    /// Initialize `engine` with the instance name, settings, config id and
    /// logging mode from `config`.
    pub fn open_with(engine: impl Engine + 'static, config: &ResolverConfig) -> Result<Self> {
        let resolver = Self::new(engine);
        resolver.initialize(
            &config.instance_name,
            &config.settings_json()?,
            config.config_id,
            config.verbose_logging,
        )?;
        Ok(resolver)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Attach to the engine.
    ///
    /// `settings` must be a JSON object; anything else fails with
    /// [`Error::Initialization`] before the engine is called. A failed
    /// initialize leaves the resolver detached, so it may be retried.
    pub fn initialize(
        &self,
        instance_name: &str,
        settings: &str,
        config_id: Option<ConfigId>,
        verbose_logging: bool,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            LifecycleState::Detached => {}
            LifecycleState::Attached => return Err(Error::AlreadyInitialized),
            LifecycleState::Destroyed => return Err(Error::Destroyed),
        }
        json::parse_object(settings, "settings").map_err(|e| Error::Initialization {
            reason: e.to_string(),
        })?;

        inner
            .engine
            .initialize(instance_name, settings, config_id, verbose_logging)?;
        inner.state = LifecycleState::Attached;
        tracing::info!(target: "erbind::client", instance_name, ?config_id, "attached");
        Ok(())
    }

    /// Pre-load engine resources. Optional; has no semantic effect.
    pub fn prime(&self) -> Result<()> {
        self.call("prime", |engine| engine.prime())
    }

    /// Swap the active configuration without detaching.
    pub fn reinitialize(&self, config_id: ConfigId) -> Result<()> {
        self.call("reinitialize", |engine| engine.reinitialize(config_id))?;
        tracing::info!(target: "erbind::client", config_id, "configuration swapped");
        Ok(())
    }

    /// Identifier of the active configuration.
    pub fn active_config_id(&self) -> Result<ConfigId> {
        self.call("active_config_id", |engine| engine.get_active_config_id())
    }

    /// Release the attachment. The resolver is unusable afterwards, even if
    /// the engine reports a failure while releasing.
    pub fn destroy(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.require_attached()?;
        inner.state = LifecycleState::Destroyed;
        inner.open_exports.clear();
        tracing::info!(target: "erbind::client", "detached");
        inner.engine.destroy()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.inner.lock().state
    }

    /// True between a successful `initialize` and `destroy`.
    pub fn is_attached(&self) -> bool {
        self.state() == LifecycleState::Attached
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Run `f` against the attachment under the lock, after the lifecycle
    /// check.
    fn with_attachment<T>(&self, op: &'static str, f: impl FnOnce(&mut Attachment) -> Result<T>) -> Result<T> {
        let mut inner = self.inner.lock();
        inner.require_attached()?;
        tracing::debug!(target: "erbind::client", op, "engine call");
        f(&mut *inner)
    }

    fn call<T>(&self, op: &'static str, f: impl FnOnce(&mut dyn Engine) -> Result<T>) -> Result<T> {
        self.with_attachment(op, |attachment| f(attachment.engine.as_mut()))
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state != LifecycleState::Attached {
            return;
        }
        inner.state = LifecycleState::Destroyed;
        inner.open_exports.clear();
        if let Err(e) = inner.engine.destroy() {
            tracing::warn!(target: "erbind::client", error = %e, "destroy on drop failed");
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Resolver")
            .field("state", &inner.state)
            .field("open_exports", &inner.open_exports.len())
            .finish()
    }
}
