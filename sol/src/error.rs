// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of one of the loader operations.
///
/// Every variant carries the text reported by the platform loader at the
/// moment the operation failed. The text is not classified any further.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The library could not be opened.
    #[error("cannot load library: {0}")]
    Load(String),

    /// The library is loaded but does not export the requested symbol.
    #[error("cannot resolve symbol: {0}")]
    Symbol(String),

    /// The library could not be released.
    #[error("cannot unload library: {0}")]
    Unload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Load,
    Symbol,
    Unload,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Load(_) => ErrorKind::Load,
            Error::Symbol(_) => ErrorKind::Symbol,
            Error::Unload(_) => ErrorKind::Unload,
        }
    }

    /// The backend message, without the operation prefix used by `Display`.
    pub fn message(&self) -> &str {
        match self {
            Error::Load(message) | Error::Symbol(message) | Error::Unload(message) => message,
        }
    }
}
