// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

//! Load shared libraries at runtime and look up their exports.
//!
//! [`load`], [`resolve`] and [`unload`] map one-to-one onto the platform
//! loader (`dlopen`/`dlsym`/`dlclose` on Unix, `LoadLibraryW`/
//! `GetProcAddress`/`FreeLibrary` on Windows). All three are serialized behind
//! one process-wide lock, so the error text attached to a failure is always
//! the text the platform produced for that call.
//!
//! ```no_run
//! use std::ffi::{c_char, c_int};
//!
//! sol::symbol_table! {
//!     struct Stdio;
//!     unsafe extern "C" {
//!         fn printf(format: *const c_char, ...) -> c_int;
//!     }
//! }
//!
//! let libc = sol::load("libc.so.6")?;
//! let stdio = unsafe { Stdio::load(&libc)? };
//! unsafe { (stdio.printf)(c"%s\n".as_ptr(), c"hello".as_ptr()) };
//! sol::unload(libc)?;
//! # Ok::<(), sol::Error>(())
//! ```

mod backend;
mod error;
mod handle;
mod loader;

pub use error::{Error, ErrorKind, Result};
pub use handle::{Library, Symbol};
pub use loader::{load, resolve, resolve_typed, unload};

/// Declares a struct of typed function pointers resolved from a [`Library`].
///
/// ```ignore
/// sol::symbol_table! {
///     pub struct LibM;
///     unsafe extern "C" {
///         pub fn cos(x: f64) -> f64;
///         #[link_name = "sqrt"]
///         pub fn square_root(x: f64) -> f64;
///     }
/// }
/// ```
///
/// expands to a `LibM` with `cos` and `square_root` fields and an
/// `unsafe fn load(&Library) -> Result<LibM>` that resolves each entry by its
/// `link_name`, or by the function name when there is none. Field names are
/// the snake_case form of the function name. Loading is unsafe for the same
/// reason as [`resolve_typed`]: the declared signatures are not checked.
pub use sol_proc_macro::symbol_table;
