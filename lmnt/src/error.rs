// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime error taxonomy.

use core::fmt;

use crate::validation::ValidationError;

/// Result code for a successful call.
pub const OK: i32 = 0;

/// An error returned by [`crate::context::Context`] operations.
///
/// Every variant maps to a stable numeric result code through [`Error::code`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Execution was interrupted.
    ///
    /// Interrupted runs report [`crate::context::Outcome::Interrupted`] instead; this variant
    /// exists so every result code has a counterpart.
    Interrupted,
    /// A size argument was invalid.
    InvalidSize,
    /// The archive failed validation.
    InvalidArchive(ValidationError),
    /// The call nesting limit was exceeded.
    StackDepth,
    /// The value stack is too small for the def.
    StackSize,
    /// Argument count or range did not match the def.
    ArgsMismatch,
    /// The return value buffer is smaller than the def's return count.
    RvalsMismatch,
    /// `resume` was called with a def other than the suspended one.
    DefMismatch,
    /// No def with the requested name exists.
    NotFound,
    /// A runtime stack or data access was out of bounds.
    AccessViolation,
    /// The arena cannot hold the archive.
    MemorySize,
    /// An extern def has no matching host function.
    MissingExtcall,
    /// The archive has not been prepared.
    UnpreparedArchive,
    /// A host function failed with the given code.
    Extcall(i32),
    /// An internal invariant did not hold.
    Internal,
}

impl Error {
    /// Returns the stable numeric result code.
    ///
    /// [`Error::Extcall`] returns the host function's code verbatim.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Interrupted => -1,
            Self::InvalidSize => -0x03,
            Self::InvalidArchive(_) => -0x04,
            Self::StackDepth => -0x10,
            Self::StackSize => -0x11,
            Self::ArgsMismatch => -0x20,
            Self::RvalsMismatch => -0x21,
            Self::DefMismatch => -0x22,
            Self::NotFound => -0x30,
            Self::AccessViolation => -0x40,
            Self::MemorySize => -0x41,
            Self::MissingExtcall => -0x50,
            Self::UnpreparedArchive => -0x60,
            Self::Extcall(code) => *code,
            Self::Internal => -0xF0,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "execution interrupted"),
            Self::InvalidSize => write!(f, "invalid size"),
            Self::InvalidArchive(e) => write!(f, "invalid archive: {e}"),
            Self::StackDepth => write!(f, "call depth limit exceeded"),
            Self::StackSize => write!(f, "stack too small"),
            Self::ArgsMismatch => write!(f, "argument mismatch"),
            Self::RvalsMismatch => write!(f, "return value mismatch"),
            Self::DefMismatch => write!(f, "resumed a different def"),
            Self::NotFound => write!(f, "def not found"),
            Self::AccessViolation => write!(f, "access violation"),
            Self::MemorySize => write!(f, "arena too small"),
            Self::MissingExtcall => write!(f, "missing extcall"),
            Self::UnpreparedArchive => write!(f, "archive is not prepared"),
            Self::Extcall(code) => write!(f, "extcall failed with code {code}"),
            Self::Internal => write!(f, "internal error"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::InvalidArchive(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::InvalidArchive(e)
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::validation::ValidationError;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::Interrupted.code(), -1);
        assert_eq!(Error::InvalidArchive(ValidationError::DefCyclic).code(), -4);
        assert_eq!(Error::DefMismatch.code(), -0x22);
        assert_eq!(Error::AccessViolation.code(), -0x40);
        assert_eq!(Error::UnpreparedArchive.code(), -0x60);
        assert_eq!(Error::Extcall(-123_456_789).code(), -123_456_789);
        assert_eq!(Error::Internal.code(), -0xF0);
    }

    #[test]
    fn invalid_archive_exposes_source() {
        use core::error::Error as _;
        let e = Error::from(ValidationError::DefFlags);
        let source = e.source().map(|s| alloc::format!("{s}"));
        assert_eq!(source.as_deref(), Some("def flags do not match its code"));
    }
}
