// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

/// A shared library loaded into the process.
///
/// Only [`load`](crate::load) produces one, and [`unload`](crate::unload)
/// consumes it, so a handle cannot be used after it has been released.
/// Dropping a `Library` without unloading it keeps the library mapped until
/// the process exits.
///
/// Two loads of the same file are not guaranteed to yield equal handles; the
/// platform loader owns identity, so `Library` does not implement `PartialEq`.
pub struct Library {
    raw: NonNull<c_void>,
}

// The platform handle is a process-wide token.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
    pub(crate) fn new(raw: NonNull<c_void>) -> Self {
        Self { raw }
    }

    pub(crate) fn as_raw(&self) -> *mut c_void {
        self.raw.as_ptr()
    }

    /// Gives up the handle without unloading the library.
    pub fn into_raw(self) -> NonNull<c_void> {
        self.raw
    }

    /// Rebuilds a handle from [`Library::into_raw`] or from the platform's
    /// own `dlopen`/`LoadLibraryW`.
    ///
    /// # Safety
    ///
    /// `raw` must be a live library handle from the platform loader. The
    /// caller must make sure the library is unloaded at most once across all
    /// handles built from the same value.
    pub unsafe fn from_raw(raw: NonNull<c_void>) -> Self {
        Self { raw }
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Library").field(&self.raw).finish()
    }
}

/// The address of an entity exported by a loaded [`Library`].
///
/// A `Symbol` borrows the library it was resolved from, which keeps the
/// library from being unloaded while the symbol is in use. Raw pointers and
/// typed pointers taken out of it carry no such guarantee.
#[derive(Clone, Copy)]
pub struct Symbol<'lib> {
    address: NonNull<c_void>,
    _library: PhantomData<&'lib Library>,
}

unsafe impl Send for Symbol<'_> {}
unsafe impl Sync for Symbol<'_> {}

impl<'lib> Symbol<'lib> {
    pub(crate) fn new(address: NonNull<c_void>) -> Self {
        Self {
            address,
            _library: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.address.as_ptr()
    }

    /// Reinterprets the address as `T`, typically an
    /// `unsafe extern "C" fn(..) -> ..` or a `*const`/`*mut` data pointer.
    ///
    /// This is the only place the crate trusts caller-supplied type
    /// information. `T` must be pointer-sized; that much is checked at
    /// compile time and nothing else is.
    ///
    /// # Safety
    ///
    /// `T` must match the actual type of the exported entity, and the value
    /// must not be used after the owning library is unloaded.
    pub unsafe fn cast<T: Copy>(self) -> T {
        const {
            assert!(
                mem::size_of::<T>() == mem::size_of::<*mut c_void>(),
                "symbols can only be cast to pointer-sized types"
            )
        };
        unsafe { mem::transmute_copy::<NonNull<c_void>, T>(&self.address) }
    }
}

impl fmt::Debug for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Symbol").field(&self.address).finish()
    }
}
