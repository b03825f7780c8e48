// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

//! Native dynamic-loading primitives.
//!
//! One implementation is compiled per platform family. None of them
//! synchronize anything: the platform's last-error state is process (or
//! thread) global, so every call, including [`Backend::last_error`], must be
//! made while holding the loader lock.

use std::ffi::{CStr, OsStr, c_void};

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::Dl as NativeBackend;
#[cfg(windows)]
pub(crate) use windows::Win32 as NativeBackend;

pub(crate) trait Backend {
    /// Path representation handed to [`Backend::open`].
    type Path;

    /// Converts a caller path to the native form. `None` when the path cannot
    /// be represented, e.g. it contains an interior NUL.
    fn encode_path(path: &OsStr) -> Option<Self::Path>;

    /// Returns null on failure.
    ///
    /// # Safety
    ///
    /// Opening a library runs its initialization routines.
    unsafe fn open(&mut self, path: &Self::Path) -> *mut c_void;

    /// Returns null on failure.
    ///
    /// # Safety
    ///
    /// `handle` must come from [`Backend::open`] and not have been closed.
    unsafe fn lookup(&mut self, handle: *mut c_void, name: &CStr) -> *mut c_void;

    /// Returns `false` on failure.
    ///
    /// # Safety
    ///
    /// `handle` must come from [`Backend::open`] and not have been closed.
    /// Termination routines of the library run.
    unsafe fn close(&mut self, handle: *mut c_void) -> bool;

    /// Text describing the most recent failure, if the platform recorded one.
    fn last_error(&mut self) -> Option<String>;
}
