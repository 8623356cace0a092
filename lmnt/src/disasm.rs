// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disassembler for `lmnt` archives.
//!
//! [`disassemble`] produces a structured listing of one def. Its [`fmt::Display`] output is one
//! instruction per line:
//!
//! ```text
//! def add (args 2, rvals 1, stack 3)
//! 0000: addss   s0, s1 -> s2
//! 0001: branchclt @0000
//! ```
//!
//! Stack reads come first and writes follow `->`. Vector operands print as `vN`, data sections
//! as `dN`, immediates as `#N`, branch targets as `@NNNN` and def offsets as `def@0xN`.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::archive::{Archive, Def, DefRef, Instruction};
use crate::format::{DecodeError, combine};
use crate::opcode::{Opcode, OperandAccess, OperandKind, OperandWidth};

/// A disassembled def.
#[derive(Clone, Debug, PartialEq)]
pub struct Disassembly {
    /// The def.
    pub def: DefRef,
    /// Its name.
    pub name: String,
    /// Its record.
    pub record: Def,
    /// Its instructions; empty for extern and interface defs.
    pub lines: Vec<Line>,
}

/// One disassembled instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Instruction index within the code block.
    pub index: u32,
    /// The raw instruction.
    pub instruction: Instruction,
}

impl Line {
    /// The decoded opcode, if the value is known.
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        self.instruction.op()
    }
}

/// Disassembles `def`.
pub fn disassemble(archive: &Archive<'_>, def: DefRef) -> Result<Disassembly, DecodeError> {
    let record = archive.def_at(def)?;
    let name = String::from(archive.string_at(record.name)?);
    let mut lines = Vec::new();
    if !record.is_extern() && !record.is_interface() {
        let code = archive.code_at(record.code)?;
        for (index, instruction) in (0_u32..).zip(code.iter()) {
            lines.push(Line {
                index,
                instruction: instruction?,
            });
        }
    }
    Ok(Disassembly {
        def,
        name,
        record,
        lines,
    })
}

enum Operand {
    Stack(u16, OperandWidth),
    Imm(u32),
    Section(u16),
    Target(u32),
    Def(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack(slot, OperandWidth::Vector) => write!(f, "v{slot}"),
            Self::Stack(slot, _) => write!(f, "s{slot}"),
            Self::Imm(v) => write!(f, "#{v}"),
            Self::Section(s) => write!(f, "d{s}"),
            Self::Target(t) => write!(f, "@{t:04}"),
            Self::Def(d) => write!(f, "{}", DefRef(*d)),
        }
    }
}

fn operands(op: Opcode, ins: &Instruction) -> (Vec<Operand>, Vec<Operand>) {
    let args = [ins.arg1, ins.arg2, ins.arg3];
    let schema = op.operands();
    let mut reads = Vec::new();
    let mut writes = Vec::new();
    let mut i = 0;
    while i < 3 {
        let s = &schema[i];
        let next = args.get(i + 1).copied().unwrap_or(0);
        match s.kind {
            OperandKind::Unused | OperandKind::CodeHi | OperandKind::DefHi => {}
            OperandKind::Stack => {
                let operand = Operand::Stack(args[i], s.width);
                if s.access == Some(OperandAccess::Write) {
                    writes.push(operand);
                } else {
                    reads.push(operand);
                }
            }
            OperandKind::Imm => {
                // Two immediates in a row form one 32-bit value.
                if schema.get(i + 1).map(|n| n.kind) == Some(OperandKind::Imm) {
                    reads.push(Operand::Imm(combine(args[i], next)));
                    i += 1;
                } else {
                    reads.push(Operand::Imm(u32::from(args[i])));
                }
            }
            OperandKind::Section => reads.push(Operand::Section(args[i])),
            OperandKind::CodeLo => reads.push(Operand::Target(combine(args[i], next))),
            OperandKind::DefLo => reads.push(Operand::Def(combine(args[i], next))),
        }
        i += 1;
    }
    (reads, writes)
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ins = &self.instruction;
        write!(f, "{:04}: ", self.index)?;
        let Some(op) = self.opcode() else {
            return write!(
                f,
                "<{:#06x}> {}, {}, {}",
                ins.opcode, ins.arg1, ins.arg2, ins.arg3
            );
        };
        let (reads, writes) = operands(op, ins);
        if reads.is_empty() && writes.is_empty() {
            return f.write_str(op.mnemonic());
        }
        write!(f, "{:<7} ", op.mnemonic())?;
        for (i, r) in reads.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{r}")?;
        }
        if !writes.is_empty() {
            if !reads.is_empty() {
                f.write_str(" ")?;
            }
            f.write_str("->")?;
            for (i, w) in writes.iter().enumerate() {
                f.write_str(if i > 0 { ", " } else { " " })?;
                write!(f, "{w}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.record;
        let kind = if d.is_interface() {
            "interface "
        } else if d.is_extern() {
            "extern "
        } else {
            ""
        };
        write!(
            f,
            "{kind}def {} (args {}, rvals {}, stack {})",
            self.name, d.args_count, d.rvals_count, d.stack_count_unaligned
        )?;
        for line in &self.lines {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}
