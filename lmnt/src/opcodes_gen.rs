// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// @generated by lmnt_codegen. Do not edit by hand.

/// Operand kinds used by the opcode table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// The operand is ignored.
    Unused,
    /// A value stack slot.
    Stack,
    /// A 16-bit immediate, or one half of a 32-bit immediate.
    Imm,
    /// A data section index.
    Section,
    /// Low half of a branch target.
    CodeLo,
    /// High half of a branch target.
    CodeHi,
    /// Low half of a def offset.
    DefLo,
    /// High half of a def offset.
    DefHi,
}

/// Access for stack operands.
#[allow(missing_docs, reason = "generated")]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandAccess {
    Read,
    Write,
    ReadWrite,
}

/// Number of consecutive stack slots covered by an operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandWidth {
    /// Not a stack operand.
    None,
    /// One slot.
    Scalar,
    /// Four slots.
    Vector,
    /// Decided by the instruction itself.
    Dynamic,
}

impl OperandWidth {
    /// Returns the static slot count, if there is one.
    #[must_use]
    pub const fn slots(self) -> Option<u32> {
        match self {
            Self::Scalar => Some(1),
            Self::Vector => Some(4),
            Self::None | Self::Dynamic => None,
        }
    }
}

/// Operand schema metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OperandSchema {
    /// Operand kind.
    pub kind: OperandKind,
    /// Operand access, if this is a stack operand.
    pub access: Option<OperandAccess>,
    /// Operand width, if this is a stack operand.
    pub width: OperandWidth,
}

impl OperandSchema {
    const fn new(kind: OperandKind, access: Option<OperandAccess>, width: OperandWidth) -> Self {
        Self { kind, access, width }
    }
}

/// Per-opcode metadata used by validation and disassembly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Stable, parseable opcode name.
    pub mnemonic: &'static str,
    /// Whether `arg2`/`arg3` hold a branch target.
    pub is_branch: bool,
    /// Operand schemas for `arg1`, `arg2`, `arg3`.
    pub operands: [OperandSchema; 3],
}

/// Number of defined opcodes.
pub const OPCODE_COUNT: usize = 83;

/// Metadata indexed by opcode value.
#[rustfmt::skip]
pub const OPCODE_INFO: [OpcodeInfo; OPCODE_COUNT] = [
    OpcodeInfo { mnemonic: "noop", is_branch: false, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None)] }, // 0x00 Noop
    OpcodeInfo { mnemonic: "return", is_branch: false, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None)] }, // 0x01 Return
    OpcodeInfo { mnemonic: "assignss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x02 AssignSs
    OpcodeInfo { mnemonic: "assignvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x03 AssignVv
    OpcodeInfo { mnemonic: "assignsv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x04 AssignSv
    OpcodeInfo { mnemonic: "assigniis", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x05 AssignIis
    OpcodeInfo { mnemonic: "assignibs", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x06 AssignIbs
    OpcodeInfo { mnemonic: "assigniiv", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x07 AssignIiv
    OpcodeInfo { mnemonic: "assignibv", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x08 AssignIbv
    OpcodeInfo { mnemonic: "dloadiis", is_branch: false, operands: [OperandSchema::new(OperandKind::Section, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x09 DloadIis
    OpcodeInfo { mnemonic: "dloadiiv", is_branch: false, operands: [OperandSchema::new(OperandKind::Section, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x0A DloadIiv
    OpcodeInfo { mnemonic: "dloadirs", is_branch: false, operands: [OperandSchema::new(OperandKind::Section, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x0B DloadIrs
    OpcodeInfo { mnemonic: "dloadirv", is_branch: false, operands: [OperandSchema::new(OperandKind::Section, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x0C DloadIrv
    OpcodeInfo { mnemonic: "dseclen", is_branch: false, operands: [OperandSchema::new(OperandKind::Section, None, OperandWidth::None), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x0D Dseclen
    OpcodeInfo { mnemonic: "addss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x0E AddSs
    OpcodeInfo { mnemonic: "addvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x0F AddVv
    OpcodeInfo { mnemonic: "subss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x10 SubSs
    OpcodeInfo { mnemonic: "subvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x11 SubVv
    OpcodeInfo { mnemonic: "mulss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x12 MulSs
    OpcodeInfo { mnemonic: "mulvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x13 MulVv
    OpcodeInfo { mnemonic: "divss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x14 DivSs
    OpcodeInfo { mnemonic: "divvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x15 DivVv
    OpcodeInfo { mnemonic: "modss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x16 ModSs
    OpcodeInfo { mnemonic: "modvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x17 ModVv
    OpcodeInfo { mnemonic: "sin", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x18 Sin
    OpcodeInfo { mnemonic: "cos", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x19 Cos
    OpcodeInfo { mnemonic: "tan", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x1A Tan
    OpcodeInfo { mnemonic: "asin", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x1B Asin
    OpcodeInfo { mnemonic: "acos", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x1C Acos
    OpcodeInfo { mnemonic: "atan", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x1D Atan
    OpcodeInfo { mnemonic: "atan2", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x1E Atan2
    OpcodeInfo { mnemonic: "sincos", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x1F Sincos
    OpcodeInfo { mnemonic: "powss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x20 PowSs
    OpcodeInfo { mnemonic: "powvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x21 PowVv
    OpcodeInfo { mnemonic: "powvs", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x22 PowVs
    OpcodeInfo { mnemonic: "sqrts", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x23 SqrtS
    OpcodeInfo { mnemonic: "sqrtv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x24 SqrtV
    OpcodeInfo { mnemonic: "log", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x25 Log
    OpcodeInfo { mnemonic: "ln", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x26 Ln
    OpcodeInfo { mnemonic: "log2", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x27 Log2
    OpcodeInfo { mnemonic: "log10", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x28 Log10
    OpcodeInfo { mnemonic: "abss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x29 AbsS
    OpcodeInfo { mnemonic: "absv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x2A AbsV
    OpcodeInfo { mnemonic: "sumv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x2B SumV
    OpcodeInfo { mnemonic: "minss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x2C MinSs
    OpcodeInfo { mnemonic: "minvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x2D MinVv
    OpcodeInfo { mnemonic: "maxss", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x2E MaxSs
    OpcodeInfo { mnemonic: "maxvv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x2F MaxVv
    OpcodeInfo { mnemonic: "minvs", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x30 MinVs
    OpcodeInfo { mnemonic: "maxvs", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x31 MaxVs
    OpcodeInfo { mnemonic: "floors", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x32 FloorS
    OpcodeInfo { mnemonic: "floorv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x33 FloorV
    OpcodeInfo { mnemonic: "rounds", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x34 RoundS
    OpcodeInfo { mnemonic: "roundv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x35 RoundV
    OpcodeInfo { mnemonic: "ceils", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x36 CeilS
    OpcodeInfo { mnemonic: "ceilv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x37 CeilV
    OpcodeInfo { mnemonic: "truncs", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x38 TruncS
    OpcodeInfo { mnemonic: "truncv", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Vector), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Vector)] }, // 0x39 TruncV
    OpcodeInfo { mnemonic: "indexris", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x3A IndexRis
    OpcodeInfo { mnemonic: "indexrir", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar)] }, // 0x3B IndexRir
    OpcodeInfo { mnemonic: "branch", is_branch: true, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x3C Branch
    OpcodeInfo { mnemonic: "branchz", is_branch: true, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x3D BranchZ
    OpcodeInfo { mnemonic: "branchnz", is_branch: true, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x3E BranchNz
    OpcodeInfo { mnemonic: "branchpos", is_branch: true, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x3F BranchPos
    OpcodeInfo { mnemonic: "branchneg", is_branch: true, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x40 BranchNeg
    OpcodeInfo { mnemonic: "branchun", is_branch: true, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x41 BranchUn
    OpcodeInfo { mnemonic: "cmp", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None)] }, // 0x42 Cmp
    OpcodeInfo { mnemonic: "cmpz", is_branch: false, operands: [OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Read), OperandWidth::Scalar), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::Unused, None, OperandWidth::None)] }, // 0x43 CmpZ
    OpcodeInfo { mnemonic: "branchceq", is_branch: true, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x44 BranchCeq
    OpcodeInfo { mnemonic: "branchcne", is_branch: true, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x45 BranchCne
    OpcodeInfo { mnemonic: "branchclt", is_branch: true, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x46 BranchClt
    OpcodeInfo { mnemonic: "branchcle", is_branch: true, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x47 BranchCle
    OpcodeInfo { mnemonic: "branchcgt", is_branch: true, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x48 BranchCgt
    OpcodeInfo { mnemonic: "branchcge", is_branch: true, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x49 BranchCge
    OpcodeInfo { mnemonic: "branchcun", is_branch: true, operands: [OperandSchema::new(OperandKind::Unused, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeLo, None, OperandWidth::None), OperandSchema::new(OperandKind::CodeHi, None, OperandWidth::None)] }, // 0x4A BranchCun
    OpcodeInfo { mnemonic: "assignceq", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x4B AssignCeq
    OpcodeInfo { mnemonic: "assigncne", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x4C AssignCne
    OpcodeInfo { mnemonic: "assignclt", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x4D AssignClt
    OpcodeInfo { mnemonic: "assigncle", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x4E AssignCle
    OpcodeInfo { mnemonic: "assigncgt", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x4F AssignCgt
    OpcodeInfo { mnemonic: "assigncge", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x50 AssignCge
    OpcodeInfo { mnemonic: "assigncun", is_branch: false, operands: [OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Imm, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::Write), OperandWidth::Scalar)] }, // 0x51 AssignCun
    OpcodeInfo { mnemonic: "extcall", is_branch: false, operands: [OperandSchema::new(OperandKind::DefLo, None, OperandWidth::None), OperandSchema::new(OperandKind::DefHi, None, OperandWidth::None), OperandSchema::new(OperandKind::Stack, Some(OperandAccess::ReadWrite), OperandWidth::Dynamic)] }, // 0x52 Extcall
];

/// LMNT opcode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Does nothing.
    Noop = 0x00,
    /// Returns from the current def.
    Return = 0x01,
    /// Copies one value: `s[a3] = s[a1]`.
    AssignSs = 0x02,
    /// Copies four values: `s[a3..+4] = s[a1..+4]`.
    AssignVv = 0x03,
    /// Broadcasts one value: `s[a3..+4] = s[a1]`.
    AssignSv = 0x04,
    /// Stores `combine(a1, a2)` as a signed integer converted to a value.
    AssignIis = 0x05,
    /// Stores `combine(a1, a2)` reinterpreted as the bits of a value.
    AssignIbs = 0x06,
    /// Broadcasts `combine(a1, a2)` as a signed integer converted to a value.
    AssignIiv = 0x07,
    /// Broadcasts `combine(a1, a2)` reinterpreted as the bits of a value.
    AssignIbv = 0x08,
    /// Loads one value from data section `a1` at immediate index `a2`.
    DloadIis = 0x09,
    /// Loads four values from data section `a1` at immediate index `a2`.
    DloadIiv = 0x0A,
    /// Loads one value from data section `a1` at the index held in `s[a2]`.
    DloadIrs = 0x0B,
    /// Loads four values from data section `a1` at the index held in `s[a2]`.
    DloadIrv = 0x0C,
    /// Stores the value count of data section `a1`.
    Dseclen = 0x0D,
    /// Scalar addition.
    AddSs = 0x0E,
    /// Vector addition.
    AddVv = 0x0F,
    /// Scalar subtraction.
    SubSs = 0x10,
    /// Vector subtraction.
    SubVv = 0x11,
    /// Scalar multiplication.
    MulSs = 0x12,
    /// Vector multiplication.
    MulVv = 0x13,
    /// Scalar division.
    DivSs = 0x14,
    /// Vector division.
    DivVv = 0x15,
    /// Scalar floating-point remainder.
    ModSs = 0x16,
    /// Vector floating-point remainder.
    ModVv = 0x17,
    /// Sine.
    Sin = 0x18,
    /// Cosine.
    Cos = 0x19,
    /// Tangent.
    Tan = 0x1A,
    /// Arcsine.
    Asin = 0x1B,
    /// Arccosine.
    Acos = 0x1C,
    /// Arctangent.
    Atan = 0x1D,
    /// Two-argument arctangent of `s[a1] / s[a2]`.
    Atan2 = 0x1E,
    /// Writes the sine of `s[a1]` to `a2` and its cosine to `a3`.
    Sincos = 0x1F,
    /// Scalar power.
    PowSs = 0x20,
    /// Vector power.
    PowVv = 0x21,
    /// Vector raised to a scalar power.
    PowVs = 0x22,
    /// Scalar square root.
    SqrtS = 0x23,
    /// Vector square root.
    SqrtV = 0x24,
    /// Logarithm of `s[a1]` in base `s[a2]`; NaN when the base is zero.
    Log = 0x25,
    /// Natural logarithm.
    Ln = 0x26,
    /// Base 2 logarithm.
    Log2 = 0x27,
    /// Base 10 logarithm.
    Log10 = 0x28,
    /// Scalar absolute value.
    AbsS = 0x29,
    /// Vector absolute value.
    AbsV = 0x2A,
    /// Sums four values into one.
    SumV = 0x2B,
    /// Scalar minimum.
    MinSs = 0x2C,
    /// Vector minimum.
    MinVv = 0x2D,
    /// Scalar maximum.
    MaxSs = 0x2E,
    /// Vector maximum.
    MaxVv = 0x2F,
    /// Vector minimum against a scalar.
    MinVs = 0x30,
    /// Vector maximum against a scalar.
    MaxVs = 0x31,
    /// Scalar floor.
    FloorS = 0x32,
    /// Vector floor.
    FloorV = 0x33,
    /// Scalar round, ties to even.
    RoundS = 0x34,
    /// Vector round, ties to even.
    RoundV = 0x35,
    /// Scalar ceiling.
    CeilS = 0x36,
    /// Vector ceiling.
    CeilV = 0x37,
    /// Scalar truncation.
    TruncS = 0x38,
    /// Vector truncation.
    TruncV = 0x39,
    /// Copies `s[idx(s[a1]) + a2]` to `a3`, bounds checked at runtime.
    IndexRis = 0x3A,
    /// Copies `s[idx(s[a1]) + a2]` to `s[idx(s[a3])]`, bounds checked at runtime.
    IndexRir = 0x3B,
    /// Jumps to `combine(a2, a3)`.
    Branch = 0x3C,
    /// Jumps if `s[a1]` is zero (either sign).
    BranchZ = 0x3D,
    /// Jumps if `s[a1]` is non-zero and not NaN.
    BranchNz = 0x3E,
    /// Jumps if the sign bit of `s[a1]` is clear.
    BranchPos = 0x3F,
    /// Jumps if the sign bit of `s[a1]` is set.
    BranchNeg = 0x40,
    /// Jumps if `s[a1]` is NaN.
    BranchUn = 0x41,
    /// Compares `s[a1]` with `s[a2]` and sets the comparison flags.
    Cmp = 0x42,
    /// Compares `s[a1]` with zero and sets the comparison flags.
    CmpZ = 0x43,
    /// Jumps if the last comparison was equal.
    BranchCeq = 0x44,
    /// Jumps if the last comparison was not equal.
    BranchCne = 0x45,
    /// Jumps if the last comparison was less than.
    BranchClt = 0x46,
    /// Jumps if the last comparison was less than or equal.
    BranchCle = 0x47,
    /// Jumps if the last comparison was greater than.
    BranchCgt = 0x48,
    /// Jumps if the last comparison was greater than or equal.
    BranchCge = 0x49,
    /// Jumps if the last comparison was unordered.
    BranchCun = 0x4A,
    /// Stores `a1` if the last comparison was equal, else `a2`.
    AssignCeq = 0x4B,
    /// Stores `a1` if the last comparison was not equal, else `a2`.
    AssignCne = 0x4C,
    /// Stores `a1` if the last comparison was less than, else `a2`.
    AssignClt = 0x4D,
    /// Stores `a1` if the last comparison was less than or equal, else `a2`.
    AssignCle = 0x4E,
    /// Stores `a1` if the last comparison was greater than, else `a2`.
    AssignCgt = 0x4F,
    /// Stores `a1` if the last comparison was greater than or equal, else `a2`.
    AssignCge = 0x50,
    /// Stores `a1` if the last comparison was unordered, else `a2`.
    AssignCun = 0x51,
    /// Calls the extern def at `combine(a1, a2)` with arguments at `a3`; return values follow the arguments.
    Extcall = 0x52,
}

impl Opcode {
    /// Decodes an opcode value.
    #[must_use]
    pub fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            0x00 => Self::Noop,
            0x01 => Self::Return,
            0x02 => Self::AssignSs,
            0x03 => Self::AssignVv,
            0x04 => Self::AssignSv,
            0x05 => Self::AssignIis,
            0x06 => Self::AssignIbs,
            0x07 => Self::AssignIiv,
            0x08 => Self::AssignIbv,
            0x09 => Self::DloadIis,
            0x0A => Self::DloadIiv,
            0x0B => Self::DloadIrs,
            0x0C => Self::DloadIrv,
            0x0D => Self::Dseclen,
            0x0E => Self::AddSs,
            0x0F => Self::AddVv,
            0x10 => Self::SubSs,
            0x11 => Self::SubVv,
            0x12 => Self::MulSs,
            0x13 => Self::MulVv,
            0x14 => Self::DivSs,
            0x15 => Self::DivVv,
            0x16 => Self::ModSs,
            0x17 => Self::ModVv,
            0x18 => Self::Sin,
            0x19 => Self::Cos,
            0x1A => Self::Tan,
            0x1B => Self::Asin,
            0x1C => Self::Acos,
            0x1D => Self::Atan,
            0x1E => Self::Atan2,
            0x1F => Self::Sincos,
            0x20 => Self::PowSs,
            0x21 => Self::PowVv,
            0x22 => Self::PowVs,
            0x23 => Self::SqrtS,
            0x24 => Self::SqrtV,
            0x25 => Self::Log,
            0x26 => Self::Ln,
            0x27 => Self::Log2,
            0x28 => Self::Log10,
            0x29 => Self::AbsS,
            0x2A => Self::AbsV,
            0x2B => Self::SumV,
            0x2C => Self::MinSs,
            0x2D => Self::MinVv,
            0x2E => Self::MaxSs,
            0x2F => Self::MaxVv,
            0x30 => Self::MinVs,
            0x31 => Self::MaxVs,
            0x32 => Self::FloorS,
            0x33 => Self::FloorV,
            0x34 => Self::RoundS,
            0x35 => Self::RoundV,
            0x36 => Self::CeilS,
            0x37 => Self::CeilV,
            0x38 => Self::TruncS,
            0x39 => Self::TruncV,
            0x3A => Self::IndexRis,
            0x3B => Self::IndexRir,
            0x3C => Self::Branch,
            0x3D => Self::BranchZ,
            0x3E => Self::BranchNz,
            0x3F => Self::BranchPos,
            0x40 => Self::BranchNeg,
            0x41 => Self::BranchUn,
            0x42 => Self::Cmp,
            0x43 => Self::CmpZ,
            0x44 => Self::BranchCeq,
            0x45 => Self::BranchCne,
            0x46 => Self::BranchClt,
            0x47 => Self::BranchCle,
            0x48 => Self::BranchCgt,
            0x49 => Self::BranchCge,
            0x4A => Self::BranchCun,
            0x4B => Self::AssignCeq,
            0x4C => Self::AssignCne,
            0x4D => Self::AssignClt,
            0x4E => Self::AssignCle,
            0x4F => Self::AssignCgt,
            0x50 => Self::AssignCge,
            0x51 => Self::AssignCun,
            0x52 => Self::Extcall,
            _ => return None,
        })
    }

    /// Returns opcode metadata for this opcode.
    #[must_use]
    pub fn info(self) -> &'static OpcodeInfo {
        &OPCODE_INFO[usize::from(self as u16)]
    }

    /// Stable, parseable opcode name.
    ///
    /// This string is used by the disassembler output.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.info().mnemonic
    }

    /// Returns `true` if this opcode carries a branch target in `arg2`/`arg3`.
    #[must_use]
    pub fn is_branch(self) -> bool {
        self.info().is_branch
    }

    /// Returns operand schemas for `arg1`, `arg2`, `arg3`.
    #[must_use]
    pub fn operands(self) -> &'static [OperandSchema; 3] {
        &self.info().operands
    }
}
