// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for `lmnt`.
//!
//! Tracing is optional and is designed to be `no_std` friendly.
//! The interpreter only emits events requested by a [`TraceMask`].
//!
//! To enable tracing, pass a [`TraceMask`] and [`TraceSink`] to [`Context::execute_traced`] or
//! [`Context::resume_traced`].

#[cfg(doc)]
use crate::context::Context;

use crate::archive::DefRef;
use crate::error::Error;

/// A set of trace events requested by a [`TraceSink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceMask(u32);

impl core::ops::BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for TraceMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl TraceMask {
    /// No tracing.
    pub const NONE: Self = Self(0);
    /// Trace run boundaries.
    ///
    /// Enables:
    /// - [`TraceSink::run_start`]
    /// - [`TraceSink::run_end`]
    pub const RUN: Self = Self(1 << 0);
    /// Trace each executed instruction.
    ///
    /// Enables:
    /// - [`TraceSink::instr`]
    pub const INSTR: Self = Self(1 << 1);
    /// Trace host function calls.
    ///
    /// Enables:
    /// - [`TraceSink::extcall_enter`]
    /// - [`TraceSink::extcall_exit`]
    pub const EXTCALL: Self = Self(1 << 2);

    /// Returns `true` if this mask includes all bits in `other`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// Run outcome for tracing.
#[derive(Clone, Debug)]
pub enum TraceOutcome<'a> {
    /// The def returned.
    Returned,
    /// The run stopped at an interrupt and can be resumed.
    Interrupted,
    /// The run failed.
    Failed(&'a Error),
}

/// A trace sink that can receive interpreter events.
pub trait TraceSink {
    /// Called at the start of an execute or resume.
    ///
    /// Called only if the mask includes [`TraceMask::RUN`].
    ///
    /// - `def`: def being executed
    /// - `resumed`: `true` if the run continues a suspended def
    fn run_start(&mut self, _def: DefRef, _resumed: bool) {}

    /// Called before each executed instruction.
    ///
    /// Called only if the mask includes [`TraceMask::INSTR`].
    ///
    /// - `def`: current def
    /// - `index`: instruction index within the def's code
    /// - `opcode`: raw opcode value
    fn instr(&mut self, _def: DefRef, _index: u32, _opcode: u16) {}

    /// Called before a host function runs.
    ///
    /// Called only if the mask includes [`TraceMask::EXTCALL`].
    fn extcall_enter(&mut self, _name: &str) {}

    /// Called after a host function returns.
    ///
    /// Called only if the mask includes [`TraceMask::EXTCALL`].
    ///
    /// - `result`: the host function's result
    fn extcall_exit(&mut self, _name: &str, _result: Result<(), i32>) {}

    /// Called at the end of an execute or resume.
    ///
    /// Called only if the mask includes [`TraceMask::RUN`].
    fn run_end(&mut self, _outcome: TraceOutcome<'_>) {}
}
