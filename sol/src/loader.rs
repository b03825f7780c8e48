// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

use std::ffi::{CString, OsStr};
use std::ptr::NonNull;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::backend::{Backend, NativeBackend};
use crate::{Error, Library, Result, Symbol};

/// Reported when the platform signals failure without recording a reason.
const UNKNOWN_ERROR: &str = "unknown dynamic loader error";

/// Serializes every backend call behind one lock.
///
/// The lock owns the backend, so a primitive cannot be reached without it.
/// On failure the last-error state is read before the guard is released;
/// another thread's call would otherwise overwrite it.
pub(crate) struct Loader<B> {
    backend: Mutex<B>,
}

static NATIVE: Loader<NativeBackend> = Loader::new(NativeBackend);

impl<B: Backend> Loader<B> {
    pub(crate) const fn new(backend: B) -> Self {
        Self {
            backend: parking_lot::const_mutex(backend),
        }
    }

    pub(crate) fn load(&self, path: &OsStr) -> Result<Library> {
        if path.is_empty() {
            return Err(Error::Load("empty library path".to_string()));
        }
        let native = B::encode_path(path).ok_or_else(|| {
            Error::Load(format!(
                "{}: path cannot be passed to the platform loader",
                path.to_string_lossy()
            ))
        })?;

        let result = {
            let mut backend = self.backend.lock();
            let handle = unsafe { backend.open(&native) };
            NonNull::new(handle).ok_or_else(|| failure_message(&mut *backend))
        };

        match result {
            Ok(handle) => {
                debug!(path = %path.to_string_lossy(), ?handle, "loaded library");
                Ok(Library::new(handle))
            }
            Err(message) => {
                debug!(path = %path.to_string_lossy(), error = %message, "failed to load library");
                Err(Error::Load(message))
            }
        }
    }

    pub(crate) fn resolve<'lib>(&self, library: &'lib Library, name: &str) -> Result<Symbol<'lib>> {
        if name.is_empty() {
            return Err(Error::Symbol("empty symbol name".to_string()));
        }
        let native = CString::new(name)
            .map_err(|_| Error::Symbol(format!("{name:?}: symbol name contains a NUL byte")))?;

        let result = {
            let mut backend = self.backend.lock();
            let address = unsafe { backend.lookup(library.as_raw(), &native) };
            NonNull::new(address).ok_or_else(|| failure_message(&mut *backend))
        };

        match result {
            Ok(address) => {
                trace!(?library, symbol = name, ?address, "resolved symbol");
                Ok(Symbol::new(address))
            }
            Err(message) => {
                debug!(?library, symbol = name, error = %message, "failed to resolve symbol");
                Err(Error::Symbol(message))
            }
        }
    }

    pub(crate) fn unload(&self, library: Library) -> Result<()> {
        let result = {
            let mut backend = self.backend.lock();
            if unsafe { backend.close(library.as_raw()) } {
                Ok(())
            } else {
                Err(failure_message(&mut *backend))
            }
        };

        match result {
            Ok(()) => {
                debug!(?library, "unloaded library");
                Ok(())
            }
            Err(message) => {
                debug!(?library, error = %message, "failed to unload library");
                Err(Error::Unload(message))
            }
        }
    }
}

fn failure_message<B: Backend>(backend: &mut B) -> String {
    backend
        .last_error()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Loads the shared library at `path`.
///
/// `path` is handed to the platform loader as is, so its own search rules
/// apply to bare names such as `libc.so.6` or `msvcrt.dll`. The library's
/// initialization routines run before this returns.
///
/// Fails with [`Error::Load`] carrying the platform's description when the
/// file is missing, is not a library for this platform, has unresolvable
/// dependencies, or cannot be read.
pub fn load(path: impl AsRef<OsStr>) -> Result<Library> {
    NATIVE.load(path.as_ref())
}

/// Looks up the exported symbol `name` in `library`.
///
/// Fails with [`Error::Symbol`] when the library does not export it.
pub fn resolve<'lib>(library: &'lib Library, name: &str) -> Result<Symbol<'lib>> {
    NATIVE.resolve(library, name)
}

/// [`resolve`] followed by [`Symbol::cast`].
///
/// ```no_run
/// use std::ffi::{c_char, c_int};
///
/// let libc = sol::load("libc.so.6")?;
/// let puts: unsafe extern "C" fn(*const c_char) -> c_int =
///     unsafe { sol::resolve_typed(&libc, "puts")? };
/// unsafe { puts(c"hello".as_ptr()) };
/// sol::unload(libc)?;
/// # Ok::<(), sol::Error>(())
/// ```
///
/// # Safety
///
/// `T` must be the actual type of the symbol. The returned value is not tied
/// to the lifetime of `library` and must not be used after it is unloaded.
pub unsafe fn resolve_typed<T: Copy>(library: &Library, name: &str) -> Result<T> {
    let symbol = resolve(library, name)?;
    Ok(unsafe { symbol.cast() })
}

/// Releases `library`.
///
/// Fails with [`Error::Unload`] when the platform refuses; the library then
/// stays loaded. Either way the handle is consumed.
pub fn unload(library: Library) -> Result<()> {
    NATIVE.unload(library)
}

#[cfg(test)]
mod tests {
    use std::ffi::{CStr, c_void};
    use std::ptr;
    use std::thread;

    use super::*;
    use crate::ErrorKind;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Open(String),
        Lookup(usize, String),
        Close(usize),
        LastError,
    }

    /// In-memory backend with a single last-error slot that every primitive
    /// overwrites, like `GetLastError`.
    #[derive(Default)]
    struct MockBackend {
        libraries: Vec<(String, Vec<String>)>,
        sticky_close: Vec<usize>,
        silent: bool,
        last_error: Option<String>,
        calls: Vec<Call>,
    }

    impl MockBackend {
        fn with_library(mut self, path: &str, symbols: &[&str]) -> Self {
            let symbols = symbols.iter().map(|s| s.to_string()).collect();
            self.libraries.push((path.to_string(), symbols));
            self
        }

        fn set_error(&mut self, error: Option<String>) {
            self.last_error = if self.silent { None } else { error };
        }
    }

    impl Backend for MockBackend {
        type Path = String;

        fn encode_path(path: &OsStr) -> Option<String> {
            path.to_str()
                .filter(|path| !path.contains('\0'))
                .map(str::to_owned)
        }

        unsafe fn open(&mut self, path: &String) -> *mut c_void {
            self.calls.push(Call::Open(path.clone()));
            let found = self.libraries.iter().position(|(name, _)| name == path);
            match found {
                Some(index) => {
                    self.set_error(None);
                    ptr::without_provenance_mut(index + 1)
                }
                None => {
                    self.set_error(Some(format!("{path}: cannot open shared object file")));
                    ptr::null_mut()
                }
            }
        }

        unsafe fn lookup(&mut self, handle: *mut c_void, name: &CStr) -> *mut c_void {
            let id = handle.addr();
            let name = name.to_str().unwrap().to_string();
            self.calls.push(Call::Lookup(id, name.clone()));
            let (path, symbols) = &self.libraries[id - 1];
            match symbols.iter().position(|s| *s == name) {
                Some(index) => {
                    self.set_error(None);
                    ptr::without_provenance_mut((id << 16) | (index + 1))
                }
                None => {
                    let error = format!("{path}: undefined symbol: {name}");
                    self.set_error(Some(error));
                    ptr::null_mut()
                }
            }
        }

        unsafe fn close(&mut self, handle: *mut c_void) -> bool {
            let id = handle.addr();
            self.calls.push(Call::Close(id));
            if self.sticky_close.contains(&id) {
                self.set_error(Some("library is still in use".to_string()));
                false
            } else {
                self.set_error(None);
                true
            }
        }

        fn last_error(&mut self) -> Option<String> {
            self.calls.push(Call::LastError);
            self.last_error.take()
        }
    }

    fn calls(loader: &Loader<MockBackend>) -> Vec<Call> {
        std::mem::take(&mut loader.backend.lock().calls)
    }

    #[test]
    fn test_load_resolve_unload() {
        let loader = Loader::new(MockBackend::default().with_library("libm.so", &["cos", "sin"]));

        let library = loader.load(OsStr::new("libm.so")).unwrap();
        let symbol = loader.resolve(&library, "sin").unwrap();
        assert_eq!(symbol.as_ptr().addr(), (1 << 16) | 2);
        loader.unload(library).unwrap();

        assert_eq!(
            calls(&loader),
            vec![
                Call::Open("libm.so".to_string()),
                Call::Lookup(1, "sin".to_string()),
                Call::Close(1),
            ]
        );
    }

    #[test]
    fn test_failure_reads_last_error_right_after_call() {
        let loader = Loader::new(MockBackend::default().with_library("libm.so", &["cos"]));

        let err = loader.load(OsStr::new("libgone.so")).unwrap_err();
        assert_eq!(err, Error::Load("libgone.so: cannot open shared object file".to_string()));

        let library = loader.load(OsStr::new("libm.so")).unwrap();
        let err = loader.resolve(&library, "tan").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Symbol);
        assert_eq!(err.message(), "libm.so: undefined symbol: tan");

        assert_eq!(
            calls(&loader),
            vec![
                Call::Open("libgone.so".to_string()),
                Call::LastError,
                Call::Open("libm.so".to_string()),
                Call::Lookup(1, "tan".to_string()),
                Call::LastError,
            ]
        );
    }

    #[test]
    fn test_unload_failure() {
        let mut backend = MockBackend::default().with_library("libgl.so", &[]);
        backend.sticky_close.push(1);
        let loader = Loader::new(backend);

        let library = loader.load(OsStr::new("libgl.so")).unwrap();
        let err = loader.unload(library).unwrap_err();
        assert_eq!(err, Error::Unload("library is still in use".to_string()));
    }

    #[test]
    fn test_missing_reason_gets_fallback_message() {
        let backend = MockBackend {
            silent: true,
            ..MockBackend::default()
        };
        let loader = Loader::new(backend);

        let err = loader.load(OsStr::new("libgone.so")).unwrap_err();
        assert_eq!(err, Error::Load(UNKNOWN_ERROR.to_string()));
    }

    #[test]
    fn test_invalid_input_never_reaches_backend() {
        let loader = Loader::new(MockBackend::default().with_library("libm.so", &["cos"]));

        assert_eq!(loader.load(OsStr::new("")).unwrap_err().kind(), ErrorKind::Load);
        assert_eq!(loader.load(OsStr::new("lib\0m.so")).unwrap_err().kind(), ErrorKind::Load);
        assert!(calls(&loader).is_empty());

        let library = loader.load(OsStr::new("libm.so")).unwrap();
        calls(&loader);
        assert_eq!(loader.resolve(&library, "").unwrap_err().kind(), ErrorKind::Symbol);
        assert_eq!(loader.resolve(&library, "c\0os").unwrap_err().kind(), ErrorKind::Symbol);
        assert!(calls(&loader).is_empty());
    }

    #[test]
    fn test_concurrent_failures_keep_their_own_message() {
        const THREADS: usize = 8;
        const ROUNDS: usize = 200;

        let mut backend = MockBackend::default();
        for t in 0..THREADS {
            backend = backend.with_library(&format!("lib{t}.so"), &["present"]);
        }
        let loader = Loader::new(backend);

        thread::scope(|scope| {
            for t in 0..THREADS {
                let loader = &loader;
                scope.spawn(move || {
                    let library = loader.load(OsStr::new(&format!("lib{t}.so"))).unwrap();
                    for round in 0..ROUNDS {
                        let missing = format!("missing_{t}_{round}");
                        let err = loader.resolve(&library, &missing).unwrap_err();
                        assert_eq!(
                            err.message(),
                            format!("lib{t}.so: undefined symbol: {missing}")
                        );

                        let path = format!("gone_{t}_{round}.so");
                        let err = loader.load(OsStr::new(&path)).unwrap_err();
                        assert_eq!(err.message(), format!("{path}: cannot open shared object file"));

                        loader.resolve(&library, "present").unwrap();
                    }
                    loader.unload(library).unwrap();
                });
            }
        });

        let calls = calls(&loader);
        assert_eq!(calls.len(), THREADS * (2 + ROUNDS * 5));
    }

    #[test]
    fn test_native_loader_rejects_missing_file() {
        let err = load("/definitely/does/not/exist.so").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert!(!err.message().is_empty());
    }
}
