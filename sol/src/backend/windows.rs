// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

use std::ffi::{CStr, OsStr, c_void};
use std::os::windows::ffi::OsStrExt;
use std::ptr;

use windows_sys::Win32::Foundation::{FreeLibrary, GetLastError, SetLastError};
use windows_sys::Win32::System::Diagnostics::Debug::{
    FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS, FormatMessageW,
};
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

use super::Backend;

/// `LoadLibraryW`/`GetProcAddress`/`FreeLibrary`/`GetLastError`.
pub(crate) struct Win32;

const MESSAGE_CAPACITY: usize = 1024;

impl Win32 {
    fn clear_error(&mut self) {
        unsafe { SetLastError(0) };
    }
}

impl Backend for Win32 {
    /// NUL-terminated UTF-16.
    type Path = Vec<u16>;

    fn encode_path(path: &OsStr) -> Option<Vec<u16>> {
        let mut wide: Vec<u16> = path.encode_wide().collect();
        if wide.contains(&0) {
            return None;
        }
        wide.push(0);
        Some(wide)
    }

    unsafe fn open(&mut self, path: &Vec<u16>) -> *mut c_void {
        self.clear_error();
        unsafe { LoadLibraryW(path.as_ptr()) }
    }

    unsafe fn lookup(&mut self, handle: *mut c_void, name: &CStr) -> *mut c_void {
        self.clear_error();
        let address = unsafe { GetProcAddress(handle, name.as_ptr().cast()) };
        address.map_or(ptr::null_mut(), |f| f as *mut c_void)
    }

    unsafe fn close(&mut self, handle: *mut c_void) -> bool {
        self.clear_error();
        unsafe { FreeLibrary(handle) != 0 }
    }

    fn last_error(&mut self) -> Option<String> {
        let code = unsafe { GetLastError() };
        if code == 0 {
            return None;
        }

        let mut buffer = [0u16; MESSAGE_CAPACITY];
        let len = unsafe {
            FormatMessageW(
                FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
                ptr::null(),
                code,
                0,
                buffer.as_mut_ptr(),
                MESSAGE_CAPACITY as u32,
                ptr::null(),
            )
        } as usize;

        if len == 0 {
            return Some(format!("system error {code}"));
        }
        let message = String::from_utf16_lossy(&buffer[..len.min(MESSAGE_CAPACITY)]);
        Some(message.trim_end().to_owned())
    }
}
