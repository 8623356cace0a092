// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Execution context for `lmnt`.
//!
//! A [`Context`] borrows a caller-provided arena. The archive is copied into the start of the
//! arena; the value stack follows it, beginning at the constants segment so that constants are
//! the first stack slots. Writable slots start right after the constants.
//!
//! Lifecycle:
//! 1. [`Context::load_archive`] (or the `begin`/`append`/`end` triple for streamed input)
//! 2. [`Context::set_extcalls`] if the archive has extern defs
//! 3. [`Context::prepare_archive`]: validation, extcall binding, pre-decoding
//! 4. [`Context::update_args`], then [`Context::execute`] or [`Context::resume`]
//!
//! Execution never allocates.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::archive::{Archive, Def, DefRef, VALUE_SIZE};
use crate::dispatch::{self, DispatchStrategy, Exit, OpTables, ThreadedOp};
use crate::error::Error;
use crate::extcall::{ExtcallInfo, find_extcall};
use crate::ops::Machine;
use crate::trace::{TraceMask, TraceOutcome, TraceSink};
use crate::validation::{ValidationConfig, ValidationError, validate};

/// Smallest accepted arena, in bytes.
pub const MIN_ARENA_SIZE: usize = 256 * VALUE_SIZE;

/// Interpreter status flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StatusFlags(u32);

impl StatusFlags {
    /// The last comparison was equal.
    pub const EQ: Self = Self(1 << 0);
    /// The last comparison was less than.
    pub const LT: Self = Self(1 << 1);
    /// The last comparison was greater than.
    pub const GT: Self = Self(1 << 2);
    /// The last comparison was unordered.
    pub const UN: Self = Self(1 << 7);
    /// An interrupt is pending.
    pub const INTERRUPTED: Self = Self(1 << 30);

    /// Creates flags from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if all bits in `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for StatusFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// A cloneable, thread-safe handle that interrupts a [`Context`].
///
/// The interrupted run stops before its next instruction and reports
/// [`Outcome::Interrupted`]; [`Context::resume`] continues it.
#[derive(Clone, Debug, Default)]
pub struct InterruptHandle(Arc<AtomicU32>);

impl InterruptHandle {
    /// Requests an interrupt.
    pub fn interrupt(&self) {
        self.0.store(1, Ordering::Release);
    }

    /// Returns `true` if an interrupt is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }

    pub(crate) fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}

/// Context configuration.
#[derive(Clone, Debug, Default)]
pub struct ContextConfig {
    /// Dispatch strategy used by every run.
    pub dispatch: DispatchStrategy,
    /// Validation limits applied by [`Context::prepare_archive`].
    pub validation: ValidationConfig,
}

/// How a successful run ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The def returned `count` values.
    Returned {
        /// Number of values written to the return buffer.
        count: usize,
    },
    /// The run was interrupted and can be resumed.
    Interrupted,
}

/// A read-only view of the value stack, constants included.
#[derive(Copy, Clone, Debug)]
pub struct StackView<'a> {
    bytes: &'a [u8],
}

impl<'a> StackView<'a> {
    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len() / VALUE_SIZE
    }

    /// Returns `true` if the view has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads slot `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f32> {
        let at = index.checked_mul(VALUE_SIZE)?;
        let b = self.bytes.get(at..at + VALUE_SIZE)?;
        Some(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Iterates over all slots.
    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.bytes
            .chunks_exact(VALUE_SIZE)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[derive(Copy, Clone, Debug)]
struct Layout {
    constants_offset: usize,
    constants_count: usize,
    stack_count: usize,
}

impl Layout {
    fn writable_count(&self) -> usize {
        self.stack_count - self.constants_count
    }
}

#[derive(Copy, Clone, Debug)]
struct Suspended {
    def: DefRef,
    index: u32,
}

/// An interpreter context over a caller-provided arena.
#[derive(Debug)]
pub struct Context<'m> {
    arena: &'m mut [u8],
    config: ContextConfig,
    archive_len: usize,
    loaded: Option<Layout>,
    prepared: bool,
    extcalls: &'m [ExtcallInfo],
    scratch: Vec<f32>,
    defs: Vec<DefRef>,
    tables: Box<OpTables>,
    threaded: Vec<ThreadedOp>,
    threaded_defs: Vec<(DefRef, Range<usize>)>,
    interrupt: InterruptHandle,
    flags: u32,
    suspended: Option<Suspended>,
}

impl<'m> Context<'m> {
    /// Creates a context over `arena`.
    ///
    /// Fails with [`Error::MemorySize`] if `arena` is smaller than [`MIN_ARENA_SIZE`].
    pub fn new(arena: &'m mut [u8], config: ContextConfig) -> Result<Self, Error> {
        if arena.len() < MIN_ARENA_SIZE {
            return Err(Error::MemorySize);
        }
        Ok(Self {
            arena,
            config,
            archive_len: 0,
            loaded: None,
            prepared: false,
            extcalls: &[],
            scratch: Vec::new(),
            defs: Vec::new(),
            tables: Box::new(OpTables::new()),
            threaded: Vec::new(),
            threaded_defs: Vec::new(),
            interrupt: InterruptHandle::default(),
            flags: 0,
            suspended: None,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Installs the host function table used to bind extern defs.
    ///
    /// The archive must be prepared again afterwards.
    pub fn set_extcalls(&mut self, extcalls: &'m [ExtcallInfo]) {
        self.extcalls = extcalls;
        self.prepared = false;
        self.suspended = None;
    }

    /// Starts loading a new archive, discarding the current one.
    pub fn load_archive_begin(&mut self) {
        self.archive_len = 0;
        self.loaded = None;
        self.prepared = false;
        self.suspended = None;
    }

    /// Appends archive bytes.
    pub fn load_archive_append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let end = self.archive_len + bytes.len();
        if end >= self.arena.len() {
            return Err(Error::MemorySize);
        }
        self.arena[self.archive_len..end].copy_from_slice(bytes);
        self.archive_len = end;
        Ok(())
    }

    /// Finishes loading and lays out the value stack after the archive.
    pub fn load_archive_end(&mut self) -> Result<(), Error> {
        let archive = Archive::new(&self.arena[..self.archive_len])
            .map_err(|_| Error::InvalidArchive(ValidationError::HeaderMagic))?;
        let header = archive.header();
        let constants_offset = header.constants_offset();
        let Some(stack_bytes) = self.arena.len().checked_sub(constants_offset) else {
            return Err(Error::MemorySize);
        };
        self.loaded = Some(Layout {
            constants_offset,
            constants_count: header.constants_count(),
            stack_count: stack_bytes / VALUE_SIZE,
        });
        Ok(())
    }

    /// Loads `bytes` as the context's archive.
    pub fn load_archive(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.load_archive_begin();
        self.load_archive_append(bytes)?;
        self.load_archive_end()
    }

    /// Validates the loaded archive and binds its extern defs.
    ///
    /// After this call, the code field of every bound extern def holds its index in the
    /// extcall table.
    pub fn prepare_archive(&mut self) -> Result<(), Error> {
        self.prepared = false;
        self.suspended = None;
        let layout = self.loaded.ok_or(Error::UnpreparedArchive)?;
        validate(
            &self.arena[..self.archive_len],
            layout.stack_count,
            &self.config.validation,
        )?;

        let archive = Archive::new(&self.arena[..self.archive_len]).map_err(|_| Error::Internal)?;
        let defs_offset = archive.header().defs_offset();
        let mut bindings = Vec::new();
        let mut scratch_len = 0;
        self.defs.clear();
        for entry in archive.defs() {
            let (def_ref, def) = entry.map_err(|_| Error::Internal)?;
            self.defs.push(def_ref);
            if !def.is_extern() || def.is_interface() {
                continue;
            }
            let name = archive.string_at(def.name).map_err(|_| Error::Internal)?;
            let index = find_extcall(self.extcalls, name, def.args_count, def.rvals_count)
                .ok_or(Error::MissingExtcall)?;
            bindings.push((def_ref, index));
            scratch_len = scratch_len.max(usize::from(def.args_count) + usize::from(def.rvals_count));
        }

        for (def_ref, index) in bindings {
            let at = defs_offset + def_ref.0 as usize + Def::CODE_FIELD_OFFSET;
            self.arena
                .get_mut(at..at + 4)
                .ok_or(Error::Internal)?
                .copy_from_slice(&index.to_le_bytes());
        }
        self.scratch.clear();
        self.scratch.resize(scratch_len, 0.0);

        self.threaded.clear();
        self.threaded_defs.clear();
        if self.config.dispatch == DispatchStrategy::Threaded {
            let archive =
                Archive::new(&self.arena[..self.archive_len]).map_err(|_| Error::Internal)?;
            for &def_ref in &self.defs {
                let def = archive.def_at(def_ref).map_err(|_| Error::Internal)?;
                if def.is_extern() || def.is_interface() {
                    continue;
                }
                let code = archive.code_at(def.code).map_err(|_| Error::Internal)?;
                let start = self.threaded.len();
                dispatch::predecode(&code, &mut self.threaded)?;
                self.threaded_defs.push((def_ref, start..self.threaded.len()));
            }
        }

        self.prepared = true;
        Ok(())
    }

    fn layout(&self) -> Result<Layout, Error> {
        match self.loaded {
            Some(layout) if self.prepared => Ok(layout),
            _ => Err(Error::UnpreparedArchive),
        }
    }

    /// Finds a def by name.
    pub fn find_def(&self, name: &str) -> Result<DefRef, Error> {
        self.layout()?;
        let archive = Archive::new(&self.arena[..self.archive_len]).map_err(|_| Error::Internal)?;
        archive
            .find_def(name)
            .map_err(|_| Error::Internal)?
            .ok_or(Error::NotFound)
    }

    /// Reads the record of `def`.
    pub fn def(&self, def: DefRef) -> Result<Def, Error> {
        self.layout()?;
        if self.defs.binary_search(&def).is_err() {
            return Err(Error::NotFound);
        }
        let archive = Archive::new(&self.arena[..self.archive_len]).map_err(|_| Error::Internal)?;
        archive.def_at(def).map_err(|_| Error::Internal)
    }

    /// Writes `values` to the arguments of `def`, starting at argument `offset`.
    pub fn update_args(&mut self, def: DefRef, offset: usize, values: &[f32]) -> Result<(), Error> {
        let layout = self.layout()?;
        let args_count = usize::from(self.def(def)?.args_count);
        let end = offset
            .checked_add(values.len())
            .ok_or(Error::AccessViolation)?;
        if end > layout.writable_count() {
            return Err(Error::AccessViolation);
        }
        if end > args_count {
            return Err(Error::ArgsMismatch);
        }
        let base = layout.constants_offset + (layout.constants_count + offset) * VALUE_SIZE;
        for (i, v) in values.iter().enumerate() {
            let at = base + i * VALUE_SIZE;
            self.arena[at..at + VALUE_SIZE].copy_from_slice(&v.to_le_bytes());
        }
        Ok(())
    }

    /// Writes argument `index` of `def`.
    pub fn update_arg(&mut self, def: DefRef, index: usize, value: f32) -> Result<(), Error> {
        self.update_args(def, index, &[value])
    }

    /// Runs `def` from its first instruction.
    ///
    /// On return, the def's return values are copied to the front of `rvals`.
    pub fn execute(&mut self, def: DefRef, rvals: &mut [f32]) -> Result<Outcome, Error> {
        self.execute_traced(def, rvals, TraceMask::NONE, None)
    }

    /// Like [`Context::execute`], reporting events selected by `mask` to `trace`.
    pub fn execute_traced(
        &mut self,
        def: DefRef,
        rvals: &mut [f32],
        mask: TraceMask,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<Outcome, Error> {
        self.layout()?;
        self.suspended = None;
        self.interrupt.clear();
        self.run(def, 0, false, rvals, mask, trace)
    }

    /// Continues an interrupted run of `def`.
    ///
    /// Fails with [`Error::DefMismatch`] unless `def` is the interrupted def, including when
    /// nothing is suspended.
    pub fn resume(&mut self, def: DefRef, rvals: &mut [f32]) -> Result<Outcome, Error> {
        self.resume_traced(def, rvals, TraceMask::NONE, None)
    }

    /// Like [`Context::resume`], reporting events selected by `mask` to `trace`.
    pub fn resume_traced(
        &mut self,
        def: DefRef,
        rvals: &mut [f32],
        mask: TraceMask,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<Outcome, Error> {
        self.layout()?;
        let start = match self.suspended {
            Some(s) if s.def == def => s.index,
            _ => return Err(Error::DefMismatch),
        };
        self.interrupt.clear();
        self.run(def, start, true, rvals, mask, trace)
    }

    /// Interrupts the current or next run.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    /// Returns a handle that can interrupt this context from another thread or a host
    /// function.
    #[must_use]
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Returns the status flags.
    #[must_use]
    pub fn status_flags(&self) -> StatusFlags {
        let mut flags = StatusFlags(self.flags);
        if self.interrupt.is_pending() {
            flags = flags | StatusFlags::INTERRUPTED;
        }
        flags
    }

    /// Returns a view of the value stack. Empty until an archive is loaded.
    #[must_use]
    pub fn stack(&self) -> StackView<'_> {
        let bytes = match self.loaded {
            Some(l) => {
                let start = l.constants_offset;
                &self.arena[start..start + l.stack_count * VALUE_SIZE]
            }
            None => &[],
        };
        StackView { bytes }
    }

    fn run(
        &mut self,
        def: DefRef,
        start: u32,
        resumed: bool,
        rvals: &mut [f32],
        mask: TraceMask,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<Outcome, Error> {
        if mask.contains(TraceMask::RUN)
            && let Some(t) = trace.as_mut()
        {
            t.run_start(def, resumed);
        }

        let sink: Option<&mut dyn TraceSink> = match trace.as_mut() {
            Some(t) => Some(&mut **t),
            None => None,
        };
        let result = self.run_body(def, start, rvals, mask, sink);
        if result.is_err() {
            self.suspended = None;
        }

        if mask.contains(TraceMask::RUN)
            && let Some(t) = trace.as_mut()
        {
            let outcome = match &result {
                Ok(Outcome::Returned { .. }) => TraceOutcome::Returned,
                Ok(Outcome::Interrupted) => TraceOutcome::Interrupted,
                Err(e) => TraceOutcome::Failed(e),
            };
            t.run_end(outcome);
        }
        result
    }

    fn run_body(
        &mut self,
        def_ref: DefRef,
        start: u32,
        rvals: &mut [f32],
        mask: TraceMask,
        sink: Option<&mut dyn TraceSink>,
    ) -> Result<Outcome, Error> {
        let layout = self.layout()?;
        let def = self.def(def_ref)?;
        // Interfaces have no body to run.
        if def.is_interface() {
            return Err(Error::NotFound);
        }
        let rvals_count = usize::from(def.rvals_count);
        if rvals.len() < rvals_count {
            return Err(Error::RvalsMismatch);
        }

        let (head, tail) = self.arena.split_at_mut(layout.constants_offset);
        let archive = Archive::new(&*head).map_err(|_| Error::Internal)?;
        let stack = tail
            .get_mut(..layout.stack_count * VALUE_SIZE)
            .ok_or(Error::Internal)?;
        let live = layout.constants_count + usize::from(def.stack_count_unaligned);
        let mut m = Machine::new(
            archive,
            stack,
            live,
            self.flags,
            self.extcalls,
            &mut self.scratch,
            &self.interrupt,
            mask,
            sink,
        );

        let exit = if def.is_extern() {
            m.call_extern(&def, layout.constants_count).map(|()| Exit::Returned)
        } else {
            match self.config.dispatch {
                DispatchStrategy::Switch => {
                    let code = archive.code_at(def.code).map_err(|_| Error::Internal)?;
                    dispatch::run_switch(&mut m, def_ref, &code, start)
                }
                DispatchStrategy::Table => {
                    let code = archive.code_at(def.code).map_err(|_| Error::Internal)?;
                    dispatch::run_table(&mut m, &self.tables, def_ref, &code, start)
                }
                DispatchStrategy::Threaded => {
                    let range = self
                        .threaded_defs
                        .binary_search_by_key(&def_ref, |(d, _)| *d)
                        .map(|i| self.threaded_defs[i].1.clone())
                        .map_err(|_| Error::Internal)?;
                    let code = self.threaded.get(range).ok_or(Error::Internal)?;
                    dispatch::run_threaded(&mut m, def_ref, code, start)
                }
            }
        };
        self.flags = m.flags;

        match exit? {
            Exit::Returned => {
                let base = layout.constants_count + usize::from(def.args_count);
                for (k, out) in rvals.iter_mut().take(rvals_count).enumerate() {
                    *out = m.get(base + k)?;
                }
                self.suspended = None;
                Ok(Outcome::Returned { count: rvals_count })
            }
            Exit::Interrupted(index) => {
                self.suspended = Some(Suspended {
                    def: def_ref,
                    index,
                });
                Ok(Outcome::Interrupted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::{Context, ContextConfig, MIN_ARENA_SIZE, Outcome, StatusFlags};
    use crate::archive::DefFlags;
    use crate::asm::Asm;
    use crate::builder::{ArchiveBuilder, DefSpec};
    use crate::dispatch::DispatchStrategy;
    use crate::error::Error;
    use crate::extcall::{ExtcallContext, ExtcallInfo};
    use crate::opcode::Opcode;
    use crate::trace::{TraceMask, TraceOutcome, TraceSink};
    use crate::validation::ValidationError;

    const STRATEGIES: [DispatchStrategy; 3] = [
        DispatchStrategy::Switch,
        DispatchStrategy::Table,
        DispatchStrategy::Threaded,
    ];

    fn config(dispatch: DispatchStrategy) -> ContextConfig {
        ContextConfig {
            dispatch,
            ..ContextConfig::default()
        }
    }

    /// `add(a, b) -> a + b` with no constants: s0 = a, s1 = b, s2 = result.
    fn add_archive() -> Vec<u8> {
        let mut a = Asm::new();
        a.binary(Opcode::AddSs, 0, 1, 2);
        let mut b = ArchiveBuilder::new();
        let code = b.push_code(&a.finish().unwrap()).unwrap();
        b.push_def(DefSpec::local("add", code, 2, 1, 3)).unwrap();
        b.build().unwrap()
    }

    /// `count(n)`: s0 = 1.0, s1 = n, s2 = counter; loops n times.
    fn count_archive() -> Vec<u8> {
        let mut a = Asm::new();
        let top = a.label();
        let done = a.label();
        a.assign_int(0, 2);
        a.place(top).unwrap();
        a.cmp(2, 1);
        a.branch_on(Opcode::BranchCge, done);
        a.binary(Opcode::AddSs, 2, 0, 2);
        a.branch(top);
        a.place(done).unwrap();
        let mut b = ArchiveBuilder::new();
        let code = b.push_code(&a.finish().unwrap()).unwrap();
        b.push_def(
            DefSpec::local("count", code, 1, 1, 2).with_flags(DefFlags::HAS_BACKBRANCHES),
        )
        .unwrap();
        b.set_constants(&[1.0]);
        b.build().unwrap()
    }

    #[test]
    fn small_arena_is_rejected() {
        let mut arena = vec![0_u8; MIN_ARENA_SIZE - 1];
        assert_eq!(
            Context::new(&mut arena, ContextConfig::default()).err(),
            Some(Error::MemorySize)
        );
    }

    #[test]
    fn archive_must_fit_the_arena() {
        let mut arena = vec![0_u8; MIN_ARENA_SIZE];
        let mut ctx = Context::new(&mut arena, ContextConfig::default()).unwrap();
        ctx.load_archive_begin();
        assert_eq!(ctx.load_archive_append(&[0; MIN_ARENA_SIZE]), Err(Error::MemorySize));
    }

    #[test]
    fn unprepared_archive_is_refused() {
        let bytes = add_archive();
        let mut arena = vec![0_u8; 4096];
        let mut ctx = Context::new(&mut arena, ContextConfig::default()).unwrap();
        ctx.load_archive(&bytes).unwrap();
        assert_eq!(ctx.find_def("add"), Err(Error::UnpreparedArchive));
        let mut rvals = [0.0];
        assert_eq!(
            ctx.execute(crate::archive::DefRef(0), &mut rvals),
            Err(Error::UnpreparedArchive)
        );
    }

    #[test]
    fn streamed_load_executes() {
        let bytes = add_archive();
        let mut arena = vec![0_u8; 4096];
        let mut ctx = Context::new(&mut arena, ContextConfig::default()).unwrap();
        ctx.load_archive_begin();
        let (a, b) = bytes.split_at(bytes.len() / 2);
        ctx.load_archive_append(a).unwrap();
        ctx.load_archive_append(b).unwrap();
        ctx.load_archive_end().unwrap();
        ctx.prepare_archive().unwrap();

        let def = ctx.find_def("add").unwrap();
        ctx.update_args(def, 0, &[1.5, 2.0]).unwrap();
        let mut rvals = [0.0; 2];
        assert_eq!(ctx.execute(def, &mut rvals), Ok(Outcome::Returned { count: 1 }));
        assert_eq!(rvals[0], 3.5);
        assert_eq!(ctx.stack().get(2), Some(3.5));
    }

    #[test]
    fn argument_and_return_checks() {
        let bytes = add_archive();
        let mut arena = vec![0_u8; 4096];
        let mut ctx = Context::new(&mut arena, ContextConfig::default()).unwrap();
        ctx.load_archive(&bytes).unwrap();
        ctx.prepare_archive().unwrap();
        let def = ctx.find_def("add").unwrap();
        assert_eq!(ctx.find_def("sub"), Err(Error::NotFound));
        assert_eq!(ctx.update_args(def, 1, &[1.0, 2.0]), Err(Error::ArgsMismatch));
        assert_eq!(ctx.update_arg(def, 5000, 1.0), Err(Error::AccessViolation));
        ctx.update_arg(def, 1, 4.0).unwrap();
        let mut rvals: [f32; 0] = [];
        assert_eq!(ctx.execute(def, &mut rvals), Err(Error::RvalsMismatch));
        assert_eq!(
            ctx.execute(crate::archive::DefRef(3), &mut [0.0]),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn validation_failure_carries_fine_code() {
        let mut bytes = add_archive();
        bytes[0] = b'X';
        let mut arena = vec![0_u8; 4096];
        let mut ctx = Context::new(&mut arena, ContextConfig::default()).unwrap();
        assert_eq!(
            ctx.load_archive(&bytes),
            Err(Error::InvalidArchive(ValidationError::HeaderMagic))
        );

        let mut bytes = add_archive();
        bytes.push(0);
        ctx.load_archive(&bytes).unwrap();
        assert_eq!(
            ctx.prepare_archive(),
            Err(Error::InvalidArchive(ValidationError::SegmentsSize))
        );
    }

    #[test]
    fn loops_run_under_every_strategy() {
        let bytes = count_archive();
        for strategy in STRATEGIES {
            let mut arena = vec![0_u8; 4096];
            let mut ctx = Context::new(&mut arena, config(strategy)).unwrap();
            ctx.load_archive(&bytes).unwrap();
            ctx.prepare_archive().unwrap();
            let def = ctx.find_def("count").unwrap();
            ctx.update_arg(def, 0, 5.0).unwrap();
            let mut rvals = [0.0];
            assert_eq!(ctx.execute(def, &mut rvals), Ok(Outcome::Returned { count: 1 }));
            assert_eq!(rvals[0], 5.0, "{strategy:?}");
            assert!(ctx.status_flags().contains(StatusFlags::EQ), "{strategy:?}");
        }
    }

    fn interrupting(ctx: &ExtcallContext<'_>, args: &[f32], rvals: &mut [f32]) -> Result<(), i32> {
        ctx.interrupt();
        rvals[0] = args[0] * 2.0;
        Ok(())
    }

    #[test]
    fn interrupt_suspends_and_resume_continues() {
        static TABLE: [ExtcallInfo; 1] = [ExtcallInfo::new("twice", 1, 1, interrupting)];

        // s0 = arg, s1 = result, s2..s3 = extcall frame
        let mut b = ArchiveBuilder::new();
        let twice = b.push_def(DefSpec::external("twice", 1, 1)).unwrap();
        let mut a = Asm::new();
        a.assign_ss(0, 2);
        a.extcall(twice, 2);
        a.binary(Opcode::AddSs, 3, 0, 1);
        let code = b.push_code(&a.finish().unwrap()).unwrap();
        b.push_def(DefSpec::local("main", code, 1, 1, 4)).unwrap();
        let bytes = b.build().unwrap();

        for strategy in STRATEGIES {
            let mut arena = vec![0_u8; 4096];
            let mut ctx = Context::new(&mut arena, config(strategy)).unwrap();
            ctx.set_extcalls(&TABLE);
            ctx.load_archive(&bytes).unwrap();
            ctx.prepare_archive().unwrap();
            let main = ctx.find_def("main").unwrap();
            ctx.update_arg(main, 0, 3.0).unwrap();

            let mut rvals = [0.0];
            assert_eq!(ctx.execute(main, &mut rvals), Ok(Outcome::Interrupted));
            assert!(ctx.status_flags().contains(StatusFlags::INTERRUPTED));
            assert_eq!(ctx.resume(twice, &mut rvals), Err(Error::DefMismatch));
            assert_eq!(ctx.resume(main, &mut rvals), Ok(Outcome::Returned { count: 1 }));
            assert_eq!(rvals[0], 9.0, "{strategy:?}");
            assert!(!ctx.status_flags().contains(StatusFlags::INTERRUPTED));
        }
    }

    #[test]
    fn resume_needs_a_suspended_run() {
        let bytes = add_archive();
        for strategy in STRATEGIES {
            let mut arena = vec![0_u8; 4096];
            let mut ctx = Context::new(&mut arena, config(strategy)).unwrap();
            ctx.load_archive(&bytes).unwrap();
            ctx.prepare_archive().unwrap();
            let add = ctx.find_def("add").unwrap();
            let mut rvals = [0.0];
            assert_eq!(ctx.resume(add, &mut rvals), Err(Error::DefMismatch), "{strategy:?}");

            // A completed run leaves nothing to resume either.
            ctx.update_args(add, 0, &[1.0, 2.0]).unwrap();
            assert_eq!(ctx.execute(add, &mut rvals), Ok(Outcome::Returned { count: 1 }));
            assert_eq!(ctx.resume(add, &mut rvals), Err(Error::DefMismatch), "{strategy:?}");
        }
    }

    fn fails(_: &ExtcallContext<'_>, _: &[f32], _: &mut [f32]) -> Result<(), i32> {
        Err(-7)
    }

    #[test]
    fn unbound_extern_is_missing() {
        let mut b = ArchiveBuilder::new();
        b.push_def(DefSpec::external("nowhere", 0, 0)).unwrap();
        let bytes = b.build().unwrap();
        let mut arena = vec![0_u8; 4096];
        let mut ctx = Context::new(&mut arena, ContextConfig::default()).unwrap();
        ctx.load_archive(&bytes).unwrap();
        assert_eq!(ctx.prepare_archive(), Err(Error::MissingExtcall));

        static TABLE: [ExtcallInfo; 1] = [ExtcallInfo::new("nowhere", 0, 0, fails)];
        ctx.set_extcalls(&TABLE);
        ctx.prepare_archive().unwrap();
        let def = ctx.find_def("nowhere").unwrap();
        assert_eq!(ctx.execute(def, &mut []), Err(Error::Extcall(-7)));
        assert_eq!(Error::Extcall(-7).code(), -7);
    }

    #[derive(Default)]
    struct Recorder {
        starts: Vec<bool>,
        instrs: usize,
        extcalls: Vec<&'static str>,
        ends: Vec<&'static str>,
    }

    impl TraceSink for Recorder {
        fn run_start(&mut self, _def: crate::archive::DefRef, resumed: bool) {
            self.starts.push(resumed);
        }

        fn instr(&mut self, _def: crate::archive::DefRef, _index: u32, _opcode: u16) {
            self.instrs += 1;
        }

        fn extcall_enter(&mut self, _name: &str) {
            self.extcalls.push("enter");
        }

        fn run_end(&mut self, outcome: TraceOutcome<'_>) {
            self.ends.push(match outcome {
                TraceOutcome::Returned => "returned",
                TraceOutcome::Interrupted => "interrupted",
                TraceOutcome::Failed(_) => "failed",
            });
        }
    }

    #[test]
    fn trace_hooks_follow_the_mask() {
        let bytes = count_archive();
        let mut arena = vec![0_u8; 4096];
        let mut ctx = Context::new(&mut arena, ContextConfig::default()).unwrap();
        ctx.load_archive(&bytes).unwrap();
        ctx.prepare_archive().unwrap();
        let def = ctx.find_def("count").unwrap();
        ctx.update_arg(def, 0, 2.0).unwrap();

        let mut rec = Recorder::default();
        let mut rvals = [0.0];
        ctx.execute_traced(def, &mut rvals, TraceMask::RUN, Some(&mut rec))
            .unwrap();
        assert_eq!(rec.starts, [false]);
        assert_eq!(rec.ends, ["returned"]);
        assert_eq!(rec.instrs, 0);

        ctx.execute_traced(
            def,
            &mut rvals,
            TraceMask::RUN | TraceMask::INSTR,
            Some(&mut rec),
        )
        .unwrap();
        // assign, then two full iterations of cmp/branch/add/branch, then cmp/branch
        assert_eq!(rec.instrs, 1 + 2 * 4 + 2);
        assert!(rec.extcalls.is_empty());
    }
}
