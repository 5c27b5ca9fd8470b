//! Runtime loading of platform shared objects via `dlopen`.
//!
//! Handles are cached process-wide by path and never reloaded, so probing
//! the same libraries from several card detections is cheap.

use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::ptr::NonNull;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use sound_bridge_core::models::error::SoundError;

static LOADED: Lazy<Mutex<HashMap<String, Arc<Library>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// An open shared object.
pub struct Library {
    path: String,
    handle: NonNull<c_void>,
}

// SAFETY: dlopen handles may be used from any thread; dlsym is thread-safe.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
    /// Opens `path` with immediate binding.
    pub fn open(path: &str) -> Result<Self, SoundError> {
        let c_path = CString::new(path)
            .map_err(|_| SoundError::LibraryUnavailable(format!("invalid library path: {:?}", path)))?;

        // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW) };
        match NonNull::new(handle) {
            Some(handle) => {
                log::debug!("Loaded {}", path);
                Ok(Self {
                    path: path.to_string(),
                    handle,
                })
            }
            None => Err(SoundError::LibraryUnavailable(format!("{}: {}", path, last_dl_error()))),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Address of `name`, or `None` if the library does not export it.
    pub fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        let c_name = CString::new(name).ok()?;
        // SAFETY: the handle is open for the lifetime of `self`; `c_name` is NUL-terminated.
        NonNull::new(unsafe { libc::dlsym(self.handle.as_ptr(), c_name.as_ptr()) })
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful dlopen and is closed once.
        unsafe {
            libc::dlclose(self.handle.as_ptr());
        }
    }
}

/// Opens `path` once per process; later calls return the cached handle.
///
/// Failures are not cached, so a library that appears later can still load.
pub fn load_cached(path: &str) -> Result<Arc<Library>, SoundError> {
    let mut loaded = LOADED.lock();
    if let Some(library) = loaded.get(path) {
        return Ok(Arc::clone(library));
    }
    let library = Arc::new(Library::open(path)?);
    loaded.insert(path.to_string(), Arc::clone(&library));
    Ok(library)
}

fn last_dl_error() -> String {
    // SAFETY: dlerror returns either null or a NUL-terminated thread-local string.
    unsafe {
        let message = libc::dlerror();
        if message.is_null() {
            "unknown dlopen error".into()
        } else {
            CStr::from_ptr(message).to_string_lossy().into_owned()
        }
    }
}
