// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Code block assembler for `lmnt`.
//!
//! This is a small, public helper for constructing instruction streams without manually
//! computing branch targets or splitting 32-bit operands.
//!
//! ## Example
//!
//! ```
//! use lmnt::asm::Asm;
//! use lmnt::builder::{ArchiveBuilder, DefSpec};
//! use lmnt::opcode::Opcode;
//!
//! // s0 = constant 1.0, s1 = argument, s2 = return value
//! let mut a = Asm::new();
//! let done = a.label();
//! a.assign_ss(0, 2);
//! a.cmpz(1);
//! a.branch_on(Opcode::BranchCle, done);
//! a.binary(Opcode::AddSs, 1, 0, 2);
//! a.place(done)?;
//! a.ret();
//!
//! let mut b = ArchiveBuilder::new();
//! let code = b.push_code(&a.finish()?)?;
//! b.push_def(DefSpec::local("inc_if_positive", code, 1, 1, 2))?;
//! b.set_constants(&[1.0]);
//! let _bytes = b.build()?;
//! # Ok::<(), lmnt::builder::BuildError>(())
//! ```

use alloc::vec::Vec;

use crate::archive::{DefRef, Instruction};
use crate::builder::BuildError;
use crate::format::split;
use crate::opcode::Opcode;

/// A label for branch targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(u32);

#[derive(Copy, Clone, Debug)]
struct Fixup {
    at: usize,
    label: Label,
}

/// Instruction stream builder.
#[derive(Clone, Debug, Default)]
pub struct Asm {
    code: Vec<Instruction>,
    labels: Vec<Option<u32>>,
    fixups: Vec<Fixup>,
}

impl Asm {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the next instruction.
    #[must_use]
    pub fn pc(&self) -> u32 {
        u32::try_from(self.code.len()).unwrap_or(u32::MAX)
    }

    /// Allocates a new label.
    #[must_use]
    pub fn label(&mut self) -> Label {
        let id = u32::try_from(self.labels.len()).unwrap_or(u32::MAX);
        self.labels.push(None);
        Label(id)
    }

    /// Places `label` at the next instruction.
    pub fn place(&mut self, label: Label) -> Result<(), BuildError> {
        let pc = self.pc();
        let slot = self
            .labels
            .get_mut(label.0 as usize)
            .ok_or(BuildError::UnresolvedLabel { label: label.0 })?;
        *slot = Some(pc);
        Ok(())
    }

    /// Finalizes the stream, patching every branch target.
    pub fn finish(mut self) -> Result<Vec<Instruction>, BuildError> {
        for f in &self.fixups {
            let Some(target) = self.labels.get(f.label.0 as usize).and_then(|x| *x) else {
                return Err(BuildError::UnresolvedLabel { label: f.label.0 });
            };
            let (lo, hi) = split(target);
            let i = &mut self.code[f.at];
            i.arg2 = lo;
            i.arg3 = hi;
        }
        Ok(self.code)
    }

    /// Emits a raw instruction.
    pub fn emit(&mut self, op: Opcode, arg1: u16, arg2: u16, arg3: u16) -> &mut Self {
        self.code.push(Instruction::new(op, arg1, arg2, arg3));
        self
    }

    /// `noop`
    pub fn noop(&mut self) -> &mut Self {
        self.emit(Opcode::Noop, 0, 0, 0)
    }

    /// `return`
    pub fn ret(&mut self) -> &mut Self {
        self.emit(Opcode::Return, 0, 0, 0)
    }

    /// `assignss src -> dst`
    pub fn assign_ss(&mut self, src: u16, dst: u16) -> &mut Self {
        self.emit(Opcode::AssignSs, src, 0, dst)
    }

    /// `assignvv src -> dst`
    pub fn assign_vv(&mut self, src: u16, dst: u16) -> &mut Self {
        self.emit(Opcode::AssignVv, src, 0, dst)
    }

    /// `assignsv src -> dst`: broadcasts one slot to four.
    pub fn assign_sv(&mut self, src: u16, dst: u16) -> &mut Self {
        self.emit(Opcode::AssignSv, src, 0, dst)
    }

    /// `assigniis`: stores `value` converted to f32.
    pub fn assign_int(&mut self, value: i32, dst: u16) -> &mut Self {
        let (lo, hi) = split(value as u32);
        self.emit(Opcode::AssignIis, lo, hi, dst)
    }

    /// `assignibs`: stores `value` bit for bit.
    pub fn assign_f32(&mut self, value: f32, dst: u16) -> &mut Self {
        let (lo, hi) = split(value.to_bits());
        self.emit(Opcode::AssignIbs, lo, hi, dst)
    }

    /// `assigniiv`: broadcasts `value` converted to f32.
    pub fn assign_int_v(&mut self, value: i32, dst: u16) -> &mut Self {
        let (lo, hi) = split(value as u32);
        self.emit(Opcode::AssignIiv, lo, hi, dst)
    }

    /// `assignibv`: broadcasts `value` bit for bit.
    pub fn assign_f32_v(&mut self, value: f32, dst: u16) -> &mut Self {
        let (lo, hi) = split(value.to_bits());
        self.emit(Opcode::AssignIbv, lo, hi, dst)
    }

    /// A data load (`dloadiis`, `dloadiiv`, `dloadirs`, `dloadirv`) or `dseclen`.
    pub fn dload(&mut self, op: Opcode, section: u16, index: u16, dst: u16) -> &mut Self {
        self.emit(op, section, index, dst)
    }

    /// A one-input op such as `sin`, `sqrtv` or `sumv`.
    pub fn unary(&mut self, op: Opcode, src: u16, dst: u16) -> &mut Self {
        self.emit(op, src, 0, dst)
    }

    /// A two-input op such as `addss`, `powvs` or `atan2`.
    pub fn binary(&mut self, op: Opcode, lhs: u16, rhs: u16, dst: u16) -> &mut Self {
        self.emit(op, lhs, rhs, dst)
    }

    /// `sincos src -> sin, cos`
    pub fn sincos(&mut self, src: u16, sin: u16, cos: u16) -> &mut Self {
        self.emit(Opcode::Sincos, src, sin, cos)
    }

    /// `indexris`: `dst = stack[stack[index] + offset]`.
    pub fn index_ris(&mut self, index: u16, offset: u16, dst: u16) -> &mut Self {
        self.emit(Opcode::IndexRis, index, offset, dst)
    }

    /// `indexrir`: `stack[stack[dst_index]] = stack[stack[index] + offset]`.
    pub fn index_rir(&mut self, index: u16, offset: u16, dst_index: u16) -> &mut Self {
        self.emit(Opcode::IndexRir, index, offset, dst_index)
    }

    /// `cmp lhs, rhs`
    pub fn cmp(&mut self, lhs: u16, rhs: u16) -> &mut Self {
        self.emit(Opcode::Cmp, lhs, rhs, 0)
    }

    /// `cmpz src`
    pub fn cmpz(&mut self, src: u16) -> &mut Self {
        self.emit(Opcode::CmpZ, src, 0, 0)
    }

    /// `branch target`
    pub fn branch(&mut self, target: Label) -> &mut Self {
        self.branch_with(Opcode::Branch, 0, target)
    }

    /// A flag-testing branch (`branchceq` .. `branchcun`).
    pub fn branch_on(&mut self, op: Opcode, target: Label) -> &mut Self {
        debug_assert!(op.is_branch() && op.reads_flags());
        self.branch_with(op, 0, target)
    }

    /// A value-testing branch (`branchz` .. `branchun`).
    pub fn branch_if(&mut self, op: Opcode, src: u16, target: Label) -> &mut Self {
        debug_assert!(op.is_branch() && !op.reads_flags());
        self.branch_with(op, src, target)
    }

    /// A flag-testing select (`assignceq` .. `assigncun`).
    pub fn assign_cond(&mut self, op: Opcode, if_true: i16, if_false: i16, dst: u16) -> &mut Self {
        debug_assert!(!op.is_branch() && op.reads_flags());
        self.emit(op, if_true as u16, if_false as u16, dst)
    }

    /// `extcall def, stack`: arguments start at `stack`, return values follow them.
    pub fn extcall(&mut self, def: DefRef, stack: u16) -> &mut Self {
        let (lo, hi) = split(def.0);
        self.emit(Opcode::Extcall, lo, hi, stack)
    }

    fn branch_with(&mut self, op: Opcode, arg1: u16, label: Label) -> &mut Self {
        self.fixups.push(Fixup {
            at: self.code.len(),
            label,
        });
        self.emit(op, arg1, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::Asm;
    use crate::archive::{DefRef, Instruction};
    use crate::builder::BuildError;
    use crate::format::combine;
    use crate::opcode::Opcode;

    #[test]
    fn asm_resolves_forward_and_backward_labels() {
        let mut a = Asm::new();
        let top = a.label();
        let out = a.label();
        a.place(top).unwrap();
        a.cmpz(3);
        a.branch_on(Opcode::BranchCle, out);
        a.binary(Opcode::SubSs, 3, 0, 3);
        a.branch(top);
        a.place(out).unwrap();
        a.ret();

        let code = a.finish().unwrap();
        assert_eq!(code.len(), 5);
        assert_eq!(code[1].target(), 4);
        assert_eq!(code[3].target(), 0);
    }

    #[test]
    fn unplaced_label_is_reported() {
        let mut a = Asm::new();
        let _unused = a.label();
        let l = a.label();
        a.branch_if(Opcode::BranchZ, 0, l);
        assert_eq!(a.finish(), Err(BuildError::UnresolvedLabel { label: 1 }));
    }

    #[test]
    fn immediates_are_split_across_operands() {
        let mut a = Asm::new();
        a.assign_int(-2, 4);
        a.assign_f32(1.5, 5);
        a.assign_cond(Opcode::AssignClt, -1, 7, 6);
        a.extcall(DefRef(0x1_0015), 8);
        let code = a.finish().unwrap();

        assert_eq!(combine(code[0].arg1, code[0].arg2) as i32, -2);
        assert_eq!(f32::from_bits(combine(code[1].arg1, code[1].arg2)), 1.5);
        assert_eq!(code[2], Instruction::new(Opcode::AssignClt, 0xFFFF, 7, 6));
        assert_eq!(code[3].def_target(), 0x1_0015);
        assert_eq!(code[3].arg3, 8);
    }
}
