//! Runtime loading of the engine's shared library.
//!
//! `DynLib` owns one open library and hands out symbol addresses, so the
//! crate carries no link-time dependency on the engine. The platform calls
//! live in `sys`; unix and windows are the supported targets.

use std::ffi::{CStr, CString};
use std::os::raw::c_void;
use std::path::Path;

use erbind_core::{Error, Result};

/// An open engine library. Closed on drop.
pub struct DynLib {
    handle: *mut c_void,
}

// SAFETY: the handle is only passed back to the loader, which is thread
// safe. Calls through resolved symbols are serialized by the client.
unsafe impl Send for DynLib {}
unsafe impl Sync for DynLib {}

impl DynLib {
    /// Open a shared library by path or bare file name.
    ///
    /// A bare name is resolved through the dynamic linker search path.
    /// Symbols are bound eagerly and stay private to this handle.
    pub fn open(path: &Path) -> Result<Self> {
        let name = CString::new(path.to_string_lossy().as_bytes()).map_err(|_| Error::Library {
            reason: format!("library path contains a NUL byte: {}", path.display()),
        })?;
        let handle = sys::open(&name).map_err(|reason| Error::Library {
            reason: format!("{}: {}", path.display(), reason),
        })?;
        Ok(Self { handle })
    }

    /// Address of the exported symbol `name`.
    ///
    /// # Safety
    ///
    /// The pointer is untyped; callers transmute it to the symbol's real
    /// signature.
    pub unsafe fn sym(&self, name: &CStr) -> Result<*mut c_void> {
        sys::sym(self.handle, name).map_err(|reason| Error::Library { reason })
    }
}

impl Drop for DynLib {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            // SAFETY: the handle came from `sys::open` and is closed once.
            unsafe { sys::close(self.handle) };
        }
    }
}

#[cfg(unix)]
mod sys {
    use std::ffi::CStr;
    use std::os::raw::{c_char, c_int, c_void};

    const RTLD_NOW: c_int = 2;
    const RTLD_LOCAL: c_int = 0;

    extern "C" {
        fn dlopen(filename: *const c_char, flags: c_int) -> *mut c_void;
        fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
        fn dlclose(handle: *mut c_void) -> c_int;
        fn dlerror() -> *const c_char;
    }

    /// Text of the thread's pending loader error, clearing it.
    unsafe fn take_error() -> Option<String> {
        let msg = dlerror();
        if msg.is_null() {
            None
        } else {
            Some(CStr::from_ptr(msg).to_string_lossy().into_owned())
        }
    }

    pub fn open(name: &CStr) -> Result<*mut c_void, String> {
        // SAFETY: `name` is NUL-terminated and outlives the call.
        unsafe {
            let handle = dlopen(name.as_ptr(), RTLD_NOW | RTLD_LOCAL);
            if handle.is_null() {
                return Err(take_error().unwrap_or_else(|| "dlopen failed".to_string()));
            }
            Ok(handle)
        }
    }

    pub unsafe fn sym(handle: *mut c_void, name: &CStr) -> Result<*mut c_void, String> {
        // a null symbol is legal, so only dlerror tells failure apart
        take_error();
        let ptr = dlsym(handle, name.as_ptr());
        match take_error() {
            Some(reason) => Err(reason),
            None => Ok(ptr),
        }
    }

    pub unsafe fn close(handle: *mut c_void) {
        dlclose(handle);
    }
}

#[cfg(windows)]
mod sys {
    use std::ffi::CStr;
    use std::os::raw::{c_char, c_void};

    extern "system" {
        fn LoadLibraryA(name: *const c_char) -> *mut c_void;
        fn GetProcAddress(module: *mut c_void, name: *const c_char) -> *mut c_void;
        fn FreeLibrary(module: *mut c_void) -> i32;
        fn GetLastError() -> u32;
    }

    pub fn open(name: &CStr) -> Result<*mut c_void, String> {
        // SAFETY: `name` is NUL-terminated and outlives the call.
        let handle = unsafe { LoadLibraryA(name.as_ptr()) };
        if handle.is_null() {
            return Err(format!("LoadLibraryA failed (error {})", unsafe { GetLastError() }));
        }
        Ok(handle)
    }

    pub unsafe fn sym(handle: *mut c_void, name: &CStr) -> Result<*mut c_void, String> {
        let ptr = GetProcAddress(handle, name.as_ptr());
        if ptr.is_null() {
            return Err(format!("{} not exported (error {})", name.to_string_lossy(), GetLastError()));
        }
        Ok(ptr)
    }

    pub unsafe fn close(handle: *mut c_void) {
        FreeLibrary(handle);
    }
}
