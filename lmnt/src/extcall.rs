// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host function bridge for `lmnt`.
//!
//! Extern defs are bound by name and signature to an [`ExtcallInfo`] table installed with
//! [`Context::set_extcalls`]. Binding happens once, at [`Context::prepare_archive`]; afterwards
//! the def's code field holds the table index.

#[cfg(doc)]
use crate::context::Context;

use crate::context::InterruptHandle;

/// A host function.
///
/// `args` holds exactly the def's argument count and `rvals` exactly its return value count.
/// Returning `Err(code)` aborts the run with [`crate::error::Error::Extcall`], and `code` is
/// reported verbatim.
pub type ExtcallFn = fn(&ExtcallContext<'_>, &[f32], &mut [f32]) -> Result<(), i32>;

/// One entry of the host function table.
#[derive(Copy, Clone, Debug)]
pub struct ExtcallInfo {
    /// Name matched against extern def names.
    pub name: &'static str,
    /// Number of arguments.
    pub args_count: u16,
    /// Number of return values.
    pub rvals_count: u16,
    /// Host function.
    pub function: ExtcallFn,
}

impl ExtcallInfo {
    /// Creates a table entry.
    #[must_use]
    pub const fn new(
        name: &'static str,
        args_count: u16,
        rvals_count: u16,
        function: ExtcallFn,
    ) -> Self {
        Self {
            name,
            args_count,
            rvals_count,
            function,
        }
    }

    fn matches(&self, name: &str, args_count: u16, rvals_count: u16) -> bool {
        self.name == name && self.args_count == args_count && self.rvals_count == rvals_count
    }
}

/// Finds the entry of `table` bound to a def with this name and signature.
#[must_use]
pub fn find_extcall(
    table: &[ExtcallInfo],
    name: &str,
    args_count: u16,
    rvals_count: u16,
) -> Option<u32> {
    table
        .iter()
        .position(|e| e.matches(name, args_count, rvals_count))
        .and_then(|i| u32::try_from(i).ok())
}

/// What a host function can see of the running context.
#[derive(Debug)]
pub struct ExtcallContext<'a> {
    pub(crate) info: &'a ExtcallInfo,
    pub(crate) interrupt: &'a InterruptHandle,
}

impl ExtcallContext<'_> {
    /// Name of the extern def being called.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.info.name
    }

    /// Requests that the run stops after the current instruction.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    /// Returns the context's interrupt handle.
    #[must_use]
    pub fn interrupt_handle(&self) -> &InterruptHandle {
        self.interrupt
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtcallContext, ExtcallInfo, find_extcall};

    fn noop(_: &ExtcallContext<'_>, _: &[f32], _: &mut [f32]) -> Result<(), i32> {
        Ok(())
    }

    #[test]
    fn lookup_matches_name_and_signature() {
        let table = [
            ExtcallInfo::new("f", 1, 1, noop),
            ExtcallInfo::new("f", 2, 1, noop),
            ExtcallInfo::new("g", 0, 0, noop),
        ];
        assert_eq!(find_extcall(&table, "f", 2, 1), Some(1));
        assert_eq!(find_extcall(&table, "g", 0, 0), Some(2));
        assert_eq!(find_extcall(&table, "f", 1, 2), None);
        assert_eq!(find_extcall(&table, "h", 0, 0), None);
    }
}
