// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Archive validation for `lmnt`.
//!
//! Validation rejects malformed or unsafe-to-execute archives before they reach the interpreter.
//! It is split into:
//! - container-level checks (header, segment sizes, strings, data table)
//! - def and code checks (operand ranges, branch targets, backbranch flags, extcall targets)
//!
//! Validation never mutates the archive.

use alloc::vec::Vec;
use core::fmt;

use crate::archive::{
    Archive, CODE_HEADER_SIZE, DATA_HEADER_SIZE, DATA_SECTION_SIZE, DEF_SIZE, Def, DefRef,
    HEADER_SIZE, Instruction, VALUE_SIZE,
};
use crate::format::Reader;
use crate::opcode::{Opcode, OperandKind};

/// A validation error.
///
/// Every variant maps to a stable numeric code through [`ValidationError::code`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidationError {
    /// A string entry header runs past the strings segment.
    StringHeader,
    /// A string entry is empty or runs past the strings segment.
    StringSize,
    /// A string entry is not NUL-terminated or is not UTF-8.
    StringData,
    /// A string entry is not a multiple of 4 bytes.
    StringAlign,
    /// A def record's length does not match its bases, or its counts are inconsistent.
    DefHeader,
    /// A def's flags do not match its code or its use.
    DefFlags,
    /// A def record runs past the defs segment.
    DefSize,
    /// A def reaches itself, or a branch targets itself.
    DefCyclic,
    /// An operand is out of range.
    AccessViolation,
    /// An opcode is unknown.
    BadInstruction,
    /// A code block header runs past the code segment.
    CodeHeader,
    /// A code block's instructions run past the code segment.
    CodeSize,
    /// The archive is too short or has the wrong magic.
    HeaderMagic,
    /// The segment lengths do not add up to the archive size.
    SegmentsSize,
    /// The constants segment is not 4-byte aligned.
    ConstantsAlign,
    /// The value stack is too small.
    StackSize,
    /// Extcall targets nest too deeply.
    StackDepth,
    /// The data section table runs past the data segment.
    DataHeader,
    /// A data section runs past the data segment.
    DataSize,
}

impl ValidationError {
    /// Returns the stable numeric code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::StringHeader => -0x10,
            Self::StringSize => -0x11,
            Self::StringData => -0x12,
            Self::StringAlign => -0x13,
            Self::DefHeader => -0x20,
            Self::DefFlags => -0x21,
            Self::DefSize => -0x22,
            Self::DefCyclic => -0x23,
            Self::AccessViolation => -0x30,
            Self::BadInstruction => -0x31,
            Self::CodeHeader => -0x40,
            Self::CodeSize => -0x41,
            Self::HeaderMagic => -0x50,
            Self::SegmentsSize => -0x51,
            Self::ConstantsAlign => -0x52,
            Self::StackSize => -0x60,
            Self::StackDepth => -0x61,
            Self::DataHeader => -0x70,
            Self::DataSize => -0x71,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringHeader => write!(f, "string header out of bounds"),
            Self::StringSize => write!(f, "bad string size"),
            Self::StringData => write!(f, "bad string data"),
            Self::StringAlign => write!(f, "misaligned string entry"),
            Self::DefHeader => write!(f, "bad def header"),
            Self::DefFlags => write!(f, "def flags do not match its code"),
            Self::DefSize => write!(f, "def record out of bounds"),
            Self::DefCyclic => write!(f, "cyclic def or branch"),
            Self::AccessViolation => write!(f, "operand out of range"),
            Self::BadInstruction => write!(f, "unknown opcode"),
            Self::CodeHeader => write!(f, "code header out of bounds"),
            Self::CodeSize => write!(f, "code block out of bounds"),
            Self::HeaderMagic => write!(f, "bad archive header"),
            Self::SegmentsSize => write!(f, "segment lengths do not match archive size"),
            Self::ConstantsAlign => write!(f, "misaligned constants segment"),
            Self::StackSize => write!(f, "stack too small"),
            Self::StackDepth => write!(f, "extcall nesting too deep"),
            Self::DataHeader => write!(f, "data table out of bounds"),
            Self::DataSize => write!(f, "data section out of bounds"),
        }
    }
}

impl core::error::Error for ValidationError {}

/// Validator configuration.
#[derive(Clone, Debug)]
pub struct ValidationConfig {
    /// Maximum length of an extcall chain, including the def being validated.
    pub max_def_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_def_depth: 16 }
    }
}

/// Validates `bytes` as an archive executed with `stack_count` value slots.
///
/// `stack_count` counts every slot from the start of the constants segment, so constants use
/// the first `constants_count` of them.
pub fn validate(
    bytes: &[u8],
    stack_count: usize,
    cfg: &ValidationConfig,
) -> Result<(), ValidationError> {
    let archive = Archive::new(bytes).map_err(|_| ValidationError::HeaderMagic)?;
    let header = *archive.header();
    if HEADER_SIZE as u64 + header.segments_length() != bytes.len() as u64 {
        return Err(ValidationError::SegmentsSize);
    }
    if header.constants_offset() % VALUE_SIZE != 0
        || header.constants_length as usize % VALUE_SIZE != 0
    {
        return Err(ValidationError::ConstantsAlign);
    }
    let constants_count = header.constants_count();
    let Some(rw_stack_count) = stack_count.checked_sub(constants_count) else {
        return Err(ValidationError::StackSize);
    };

    let mut v = Validator {
        archive,
        constants_count,
        data_sections: 0,
        cfg,
    };
    v.validate_strings()?;
    v.data_sections = validate_data(&archive)?;

    let mut chain = Vec::with_capacity(cfg.max_def_depth);
    let mut offset = 0_u32;
    while offset < header.defs_length {
        let def = v.validate_def(DefRef(offset), rw_stack_count, &mut chain)?;
        offset += u32::from(def.length);
    }
    Ok(())
}

fn validate_data(archive: &Archive<'_>) -> Result<u32, ValidationError> {
    let segment = archive
        .data_segment()
        .map_err(|_| ValidationError::DataHeader)?;
    if segment.is_empty() {
        return Ok(0);
    }
    let mut r = Reader::new(segment);
    let count = r.read_u32_le().map_err(|_| ValidationError::DataHeader)?;
    let table_end = (count as usize)
        .checked_mul(DATA_SECTION_SIZE)
        .and_then(|n| n.checked_add(DATA_HEADER_SIZE))
        .ok_or(ValidationError::DataHeader)?;
    if table_end > segment.len() {
        return Err(ValidationError::DataHeader);
    }
    for _ in 0..count {
        let offset = r.read_u32_le().map_err(|_| ValidationError::DataHeader)? as usize;
        let values = r.read_u32_le().map_err(|_| ValidationError::DataHeader)? as usize;
        let end = values
            .checked_mul(VALUE_SIZE)
            .and_then(|n| n.checked_add(offset))
            .ok_or(ValidationError::DataSize)?;
        if offset < table_end || end > segment.len() {
            return Err(ValidationError::DataSize);
        }
    }
    Ok(count)
}

struct Validator<'a, 'c> {
    archive: Archive<'a>,
    constants_count: usize,
    data_sections: u32,
    cfg: &'c ValidationConfig,
}

impl Validator<'_, '_> {
    fn validate_strings(&self) -> Result<(), ValidationError> {
        let len = self.archive.header().strings_length as usize;
        let mut offset = 0;
        while offset < len {
            offset += self.validate_string(offset)?;
        }
        Ok(())
    }

    /// Validates the string entry at `offset` and returns its total size.
    fn validate_string(&self, offset: usize) -> Result<usize, ValidationError> {
        let segment = self
            .archive
            .strings_segment()
            .map_err(|_| ValidationError::StringHeader)?;
        let mut r = Reader::at(segment, offset);
        let size = usize::from(r.read_u16_le().map_err(|_| ValidationError::StringHeader)?);
        if size == 0 || size > r.remaining() {
            return Err(ValidationError::StringSize);
        }
        if (2 + size) % 4 != 0 {
            return Err(ValidationError::StringAlign);
        }
        r.read_cstr(size).map_err(|_| ValidationError::StringData)?;
        Ok(2 + size)
    }

    fn validate_def(
        &self,
        def_ref: DefRef,
        rw_stack_count: usize,
        chain: &mut Vec<DefRef>,
    ) -> Result<Def, ValidationError> {
        if chain.len() >= self.cfg.max_def_depth {
            return Err(ValidationError::StackDepth);
        }
        if chain.contains(&def_ref) {
            return Err(ValidationError::DefCyclic);
        }

        let defs_length = self.archive.header().defs_length as usize;
        let start = def_ref.0 as usize;
        if start + DEF_SIZE > defs_length {
            return Err(ValidationError::DefSize);
        }
        let def = self
            .archive
            .def_at(def_ref)
            .map_err(|_| ValidationError::DefSize)?;
        if usize::from(def.length) != DEF_SIZE + 2 * usize::from(def.bases_count) {
            return Err(ValidationError::DefHeader);
        }
        if start + usize::from(def.length) > defs_length {
            return Err(ValidationError::DefSize);
        }
        self.validate_string(usize::from(def.name))?;
        if usize::from(def.stack_count_unaligned) > rw_stack_count {
            return Err(ValidationError::StackSize);
        }
        if def.args_count < def.base_args_count {
            return Err(ValidationError::DefHeader);
        }

        if def.is_extern() || def.is_interface() {
            if u32::from(def.stack_count_unaligned)
                != u32::from(def.args_count) + u32::from(def.rvals_count)
            {
                return Err(ValidationError::DefHeader);
            }
        } else {
            chain.push(def_ref);
            let result = self.validate_code(&def, usize::from(def.stack_count_unaligned), chain);
            chain.pop();
            result?;
        }
        Ok(def)
    }

    fn validate_code(
        &self,
        def: &Def,
        rw_stack_count: usize,
        chain: &mut Vec<DefRef>,
    ) -> Result<(), ValidationError> {
        let code_length = self.archive.header().code_length as usize;
        if def.code as usize + CODE_HEADER_SIZE > code_length {
            return Err(ValidationError::CodeHeader);
        }
        let code = self
            .archive
            .code_at(def.code)
            .map_err(|_| ValidationError::CodeSize)?;

        for i in code.iter() {
            let i = i.map_err(|_| ValidationError::CodeSize)?;
            self.validate_instruction(&i, code.count(), rw_stack_count, chain)?;
        }

        let mut has_backbranches = false;
        for (index, i) in code.iter().enumerate() {
            let i = i.map_err(|_| ValidationError::CodeSize)?;
            if i.op().is_some_and(Opcode::is_branch) {
                let target = i.target() as usize;
                if target == index {
                    return Err(ValidationError::DefCyclic);
                }
                has_backbranches |= target < index;
            }
        }
        if has_backbranches != def.has_backbranches() {
            return Err(ValidationError::DefFlags);
        }
        Ok(())
    }

    fn validate_instruction(
        &self,
        i: &Instruction,
        instructions_count: u32,
        rw_stack_count: usize,
        chain: &mut Vec<DefRef>,
    ) -> Result<(), ValidationError> {
        let op = i.op().ok_or(ValidationError::BadInstruction)?;
        let limit = self.constants_count + rw_stack_count;
        let args = [i.arg1, i.arg2, i.arg3];

        for (arg, schema) in args.iter().zip(op.operands()) {
            match schema.kind {
                OperandKind::Stack => {
                    if let Some(slots) = schema.width.slots() {
                        check_stack(*arg, slots as usize, limit)?;
                    }
                }
                OperandKind::Section => {
                    if u32::from(*arg) >= self.data_sections {
                        return Err(ValidationError::AccessViolation);
                    }
                }
                OperandKind::CodeLo => {
                    if i.target() > instructions_count {
                        return Err(ValidationError::AccessViolation);
                    }
                }
                OperandKind::Unused
                | OperandKind::Imm
                | OperandKind::CodeHi
                | OperandKind::DefLo
                | OperandKind::DefHi => {}
            }
        }

        match op {
            Opcode::DloadIis | Opcode::DloadIiv => {
                let width = if op == Opcode::DloadIis { 1 } else { 4 };
                let section = self
                    .archive
                    .data_section(u32::from(i.arg1))
                    .map_err(|_| ValidationError::AccessViolation)?;
                if u32::from(i.arg2) + width > section.count {
                    return Err(ValidationError::AccessViolation);
                }
            }
            Opcode::Extcall => {
                let target_ref = DefRef(i.def_target());
                let target = self.validate_def(target_ref, rw_stack_count, chain)?;
                if target.is_interface() || !target.is_extern() {
                    return Err(ValidationError::DefFlags);
                }
                let args = usize::from(target.args_count);
                let rvals = usize::from(target.rvals_count);
                check_stack(i.arg3, args, limit)?;
                check_stack(i.arg3.saturating_add(target.args_count), rvals, limit)?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn check_stack(arg: u16, count: usize, limit: usize) -> Result<(), ValidationError> {
    if usize::from(arg) + count <= limit {
        Ok(())
    } else {
        Err(ValidationError::AccessViolation)
    }
}
