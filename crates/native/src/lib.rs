//! # erbind-native
//!
//! Binding to the native entity-resolution engine library.
//!
//! The library is opened at runtime (`dlopen` / `LoadLibraryA`), every entry
//! point is resolved once, and [`NativeEngine`] implements the
//! [`Engine`](erbind_core::Engine) boundary on top of it. The shared library
//! must be discoverable through the dynamic linker search path, or its path
//! passed explicitly to [`NativeEngine::load`].
//!
//! ```text
//! use erbind_native::NativeEngine;
//!
//! let engine = NativeEngine::load(None)?;                       // platform default name
//! let engine = NativeEngine::load(Some(Path::new("/opt/er/lib/liberengine.so")))?;
//! ```

mod dl;
mod engine;
pub mod ffi;

pub use engine::NativeEngine;
pub use ffi::DEFAULT_LIBRARY;
