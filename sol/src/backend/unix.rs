// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

use std::ffi::{CStr, CString, OsStr, c_void};
use std::os::unix::ffi::OsStrExt;

use super::Backend;

/// `dlopen`/`dlsym`/`dlclose`/`dlerror`.
pub(crate) struct Dl;

impl Dl {
    /// `dlerror` reports the last error since it was last called, so drain it
    /// before every primitive.
    fn clear_error(&mut self) {
        unsafe { libc::dlerror() };
    }
}

impl Backend for Dl {
    type Path = CString;

    fn encode_path(path: &OsStr) -> Option<CString> {
        CString::new(path.as_bytes()).ok()
    }

    unsafe fn open(&mut self, path: &CString) -> *mut c_void {
        self.clear_error();
        unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_LAZY) }
    }

    unsafe fn lookup(&mut self, handle: *mut c_void, name: &CStr) -> *mut c_void {
        self.clear_error();
        unsafe { libc::dlsym(handle, name.as_ptr()) }
    }

    unsafe fn close(&mut self, handle: *mut c_void) -> bool {
        self.clear_error();
        unsafe { libc::dlclose(handle) == 0 }
    }

    fn last_error(&mut self) -> Option<String> {
        let message = unsafe { libc::dlerror() };
        if message.is_null() {
            return None;
        }
        // Points into loader-owned storage that the next dl* call may reuse.
        let message = unsafe { CStr::from_ptr(message) };
        Some(message.to_string_lossy().into_owned())
    }
}
