// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch loops.
//!
//! Three interchangeable strategies run the same [`crate::ops`] functions:
//! - [`DispatchStrategy::Switch`] decodes each instruction and matches on the opcode.
//! - [`DispatchStrategy::Table`] indexes a 256-entry function table. An interrupt swaps in a
//!   table whose entries all stop the loop.
//! - [`DispatchStrategy::Threaded`] runs code pre-decoded into function pointer records at
//!   prepare time.
//!
//! All strategies check for a pending interrupt before every instruction and produce identical
//! results.

use alloc::vec::Vec;

use crate::archive::{Code, DefRef};
use crate::error::Error;
use crate::opcode::Opcode;
use crate::ops::{self, Machine, OpFn, Step};

/// How the interpreter dispatches instructions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DispatchStrategy {
    /// Decode and `match` on every instruction.
    #[default]
    Switch,
    /// Index a function table by opcode.
    Table,
    /// Call pre-decoded function pointers.
    Threaded,
}

/// How a dispatch loop stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Exit {
    Returned,
    /// Stopped before the instruction at this index.
    Interrupted(u32),
}

const TABLE_SIZE: usize = 256;

/// The normal and interrupted function tables used by [`DispatchStrategy::Table`].
pub(crate) struct OpTables {
    normal: [OpFn; TABLE_SIZE],
    interrupted: [OpFn; TABLE_SIZE],
}

impl OpTables {
    pub(crate) fn new() -> Self {
        let mut normal: [OpFn; TABLE_SIZE] = [ops::invalid as OpFn; TABLE_SIZE];
        for (v, slot) in (0_u16..).zip(normal.iter_mut()) {
            if let Some(op) = Opcode::from_u16(v) {
                *slot = ops::handler(op);
            }
        }
        Self {
            normal,
            interrupted: [ops::interrupted as OpFn; TABLE_SIZE],
        }
    }

    #[inline(always)]
    fn select(&self, interrupted: bool) -> &[OpFn; TABLE_SIZE] {
        if interrupted {
            &self.interrupted
        } else {
            &self.normal
        }
    }
}

impl core::fmt::Debug for OpTables {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OpTables").finish_non_exhaustive()
    }
}

/// A pre-decoded instruction.
#[derive(Copy, Clone)]
pub(crate) struct ThreadedOp {
    f: OpFn,
    opcode: u16,
    a1: u16,
    a2: u16,
    a3: u16,
}

impl core::fmt::Debug for ThreadedOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadedOp")
            .field("opcode", &self.opcode)
            .field("a1", &self.a1)
            .field("a2", &self.a2)
            .field("a3", &self.a3)
            .finish()
    }
}

/// Appends the pre-decoded form of `code` to `out`.
pub(crate) fn predecode(code: &Code<'_>, out: &mut Vec<ThreadedOp>) -> Result<(), Error> {
    out.reserve(code.count() as usize);
    for ins in code.iter() {
        let ins = ins.map_err(|_| Error::Internal)?;
        let op = Opcode::from_u16(ins.opcode).ok_or(Error::Internal)?;
        out.push(ThreadedOp {
            f: ops::handler(op),
            opcode: ins.opcode,
            a1: ins.arg1,
            a2: ins.arg2,
            a3: ins.arg3,
        });
    }
    Ok(())
}

#[inline(always)]
fn advance(step: Step, pc: u32) -> Result<u32, Exit> {
    match step {
        Step::Continue => Ok(pc + 1),
        Step::Branch(target) => Ok(target),
        Step::Return => Err(Exit::Returned),
        Step::Interrupt => Err(Exit::Interrupted(pc)),
    }
}

macro_rules! next_pc {
    ($step:expr, $pc:expr) => {
        match advance($step, $pc) {
            Ok(next) => next,
            Err(exit) => return Ok(exit),
        }
    };
}

pub(crate) fn run_switch(
    m: &mut Machine<'_, '_>,
    def: DefRef,
    code: &Code<'_>,
    start: u32,
) -> Result<Exit, Error> {
    let count = code.count();
    let mut pc = start;
    while pc < count {
        if m.interrupted() {
            return Ok(Exit::Interrupted(pc));
        }
        let ins = code.instruction(pc).map_err(|_| Error::Internal)?;
        let op = Opcode::from_u16(ins.opcode).ok_or(Error::Internal)?;
        m.trace_instr(def, pc, ins.opcode);
        let step = ops::dispatch_match(m, op, ins.arg1, ins.arg2, ins.arg3)?;
        pc = next_pc!(step, pc);
    }
    Ok(Exit::Returned)
}

pub(crate) fn run_table(
    m: &mut Machine<'_, '_>,
    tables: &OpTables,
    def: DefRef,
    code: &Code<'_>,
    start: u32,
) -> Result<Exit, Error> {
    let count = code.count();
    let mut pc = start;
    while pc < count {
        let table = tables.select(m.interrupted());
        let ins = code.instruction(pc).map_err(|_| Error::Internal)?;
        let f = table
            .get(usize::from(ins.opcode))
            .copied()
            .unwrap_or(ops::invalid);
        m.trace_instr(def, pc, ins.opcode);
        let step = f(m, ins.arg1, ins.arg2, ins.arg3)?;
        pc = next_pc!(step, pc);
    }
    Ok(Exit::Returned)
}

pub(crate) fn run_threaded(
    m: &mut Machine<'_, '_>,
    def: DefRef,
    code: &[ThreadedOp],
    start: u32,
) -> Result<Exit, Error> {
    let mut pc = start;
    while let Some(op) = code.get(pc as usize) {
        if m.interrupted() {
            return Ok(Exit::Interrupted(pc));
        }
        m.trace_instr(def, pc, op.opcode);
        let step = (op.f)(m, op.a1, op.a2, op.a3)?;
        pc = next_pc!(step, pc);
    }
    Ok(Exit::Returned)
}
