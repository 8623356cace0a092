// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Archive builder.
//!
//! [`ArchiveBuilder`] assembles strings, defs, code blocks, data sections and constants into a
//! single blob laid out the way [`crate::validation::validate`] expects.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::archive::{
    CODE_HEADER_SIZE, DATA_HEADER_SIZE, DATA_SECTION_SIZE, DEF_SIZE, Def, DefFlags, DefRef,
    HEADER_SIZE, Header, INSTRUCTION_SIZE, Instruction, VALUE_SIZE,
};
use crate::format::Writer;

/// Errors produced while building an archive or assembling code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// The strings segment would no longer be addressable by a 16-bit offset.
    StringsTooLarge,
    /// A def listed too many bases.
    TooManyBases,
    /// A segment or count did not fit its encoding.
    TooLarge,
    /// A label was used but never placed.
    UnresolvedLabel {
        /// The unresolved label id.
        label: u32,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringsTooLarge => write!(f, "strings segment exceeds 16-bit offsets"),
            Self::TooManyBases => write!(f, "too many bases for one def"),
            Self::TooLarge => write!(f, "value does not fit its encoding"),
            Self::UnresolvedLabel { label } => write!(f, "unresolved label L{label}"),
        }
    }
}

impl core::error::Error for BuildError {}

/// A code block, identified by its byte offset inside the code segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CodeRef(pub u32);

/// Description of a def to append.
#[derive(Clone, Debug)]
pub struct DefSpec<'a> {
    /// Def name.
    pub name: &'a str,
    /// Def flags.
    pub flags: DefFlags,
    /// Code block. Ignored for extern and interface defs.
    pub code: CodeRef,
    /// Stack slots used by the def, including args and rvals.
    pub stack_count: u16,
    /// Leading arguments inherited from bases.
    pub base_args_count: u16,
    /// Total arguments.
    pub args_count: u16,
    /// Return values.
    pub rvals_count: u16,
    /// Base defs.
    pub bases: &'a [DefRef],
}

impl<'a> DefSpec<'a> {
    /// A local def with bytecode.
    #[must_use]
    pub fn local(
        name: &'a str,
        code: CodeRef,
        args_count: u16,
        rvals_count: u16,
        stack_count: u16,
    ) -> Self {
        Self {
            name,
            flags: DefFlags::NONE,
            code,
            stack_count,
            base_args_count: 0,
            args_count,
            rvals_count,
            bases: &[],
        }
    }

    /// An extern def bound to a host function at prepare time.
    #[must_use]
    pub fn external(name: &'a str, args_count: u16, rvals_count: u16) -> Self {
        Self {
            name,
            flags: DefFlags::EXTERN,
            code: CodeRef(0),
            stack_count: args_count.saturating_add(rvals_count),
            base_args_count: 0,
            args_count,
            rvals_count,
            bases: &[],
        }
    }

    /// Adds `flags` to the def.
    #[must_use]
    pub fn with_flags(mut self, flags: DefFlags) -> Self {
        self.flags |= flags;
        self
    }
}

/// Incremental archive builder.
#[derive(Clone, Debug, Default)]
pub struct ArchiveBuilder {
    strings: Writer,
    interned: Vec<(String, u16)>,
    defs: Writer,
    code: Writer,
    data_sections: Vec<Vec<f32>>,
    constants: Vec<f32>,
}

impl ArchiveBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s` and returns its offset in the strings segment.
    ///
    /// Entries are NUL-padded so every entry stays 4-byte aligned.
    pub fn push_string(&mut self, s: &str) -> Result<u16, BuildError> {
        if let Some((_, offset)) = self.interned.iter().find(|(name, _)| name == s) {
            return Ok(*offset);
        }
        let offset = u16::try_from(self.strings.len()).map_err(|_| BuildError::StringsTooLarge)?;
        let mut size = s.len() + 1;
        while (2 + size) % 4 != 0 {
            size += 1;
        }
        let size16 = u16::try_from(size).map_err(|_| BuildError::StringsTooLarge)?;
        self.strings.write_u16_le(size16);
        self.strings.write_bytes(s.as_bytes());
        for _ in s.len()..size {
            self.strings.write_u8(0);
        }
        if self.strings.len() > usize::from(u16::MAX) {
            return Err(BuildError::StringsTooLarge);
        }
        self.interned.push((String::from(s), offset));
        Ok(offset)
    }

    /// Appends a code block and returns its offset in the code segment.
    pub fn push_code(&mut self, instructions: &[Instruction]) -> Result<CodeRef, BuildError> {
        let offset = u32::try_from(self.code.len()).map_err(|_| BuildError::TooLarge)?;
        let count = u32::try_from(instructions.len()).map_err(|_| BuildError::TooLarge)?;
        self.code.write_u32_le(count);
        for i in instructions {
            i.write(&mut self.code);
        }
        debug_assert_eq!(
            self.code.len(),
            offset as usize + CODE_HEADER_SIZE + instructions.len() * INSTRUCTION_SIZE
        );
        Ok(CodeRef(offset))
    }

    /// Appends a def and returns its reference.
    pub fn push_def(&mut self, spec: DefSpec<'_>) -> Result<DefRef, BuildError> {
        let name = self.push_string(spec.name)?;
        let bases_count = u8::try_from(spec.bases.len()).map_err(|_| BuildError::TooManyBases)?;
        let length = u16::try_from(DEF_SIZE + 2 * spec.bases.len())
            .map_err(|_| BuildError::TooManyBases)?;
        let offset = u32::try_from(self.defs.len()).map_err(|_| BuildError::TooLarge)?;
        let aligned = spec.stack_count.checked_add(3).ok_or(BuildError::TooLarge)? & !3;
        let def = Def {
            length,
            name,
            flags: spec.flags,
            code: spec.code.0,
            stack_count_unaligned: spec.stack_count,
            stack_count_aligned: aligned,
            base_args_count: spec.base_args_count,
            args_count: spec.args_count,
            rvals_count: spec.rvals_count,
            bases_count,
        };
        def.write(&mut self.defs);
        for base in spec.bases {
            let base = u16::try_from(base.0).map_err(|_| BuildError::TooLarge)?;
            self.defs.write_u16_le(base);
        }
        Ok(DefRef(offset))
    }

    /// Declares a data section and returns its index.
    pub fn push_data_section(&mut self, values: &[f32]) -> u16 {
        self.data_sections.push(values.to_vec());
        u16::try_from(self.data_sections.len() - 1).unwrap_or(u16::MAX)
    }

    /// Sets the constant pool.
    pub fn set_constants(&mut self, constants: &[f32]) {
        self.constants = constants.to_vec();
    }

    /// Encodes the archive.
    pub fn build(&self) -> Result<Vec<u8>, BuildError> {
        let mut data = Writer::new();
        if !self.data_sections.is_empty() {
            let sections = u32::try_from(self.data_sections.len()).map_err(|_| BuildError::TooLarge)?;
            data.write_u32_le(sections);
            let mut offset = DATA_HEADER_SIZE + self.data_sections.len() * DATA_SECTION_SIZE;
            for values in &self.data_sections {
                data.write_u32_le(u32::try_from(offset).map_err(|_| BuildError::TooLarge)?);
                data.write_u32_le(u32::try_from(values.len()).map_err(|_| BuildError::TooLarge)?);
                offset += values.len() * VALUE_SIZE;
            }
            for values in &self.data_sections {
                for v in values {
                    data.write_f32_le(*v);
                }
            }
        }

        // Pad the end of the code segment so the constants (and the stack) start 4-byte aligned.
        let mut code = self.code.clone();
        while (HEADER_SIZE + self.strings.len() + self.defs.len() + code.len()) % VALUE_SIZE != 0 {
            code.write_u8(0);
        }

        let header = Header {
            version_major: 0,
            version_minor: 0,
            strings_length: segment_len(&self.strings)?,
            defs_length: segment_len(&self.defs)?,
            code_length: segment_len(&code)?,
            data_length: segment_len(&data)?,
            constants_length: u32::try_from(self.constants.len() * VALUE_SIZE)
                .map_err(|_| BuildError::TooLarge)?,
        };

        let mut out = Writer::new();
        header.write(&mut out);
        out.write_bytes(self.strings.as_slice());
        out.write_bytes(self.defs.as_slice());
        out.write_bytes(code.as_slice());
        out.write_bytes(data.as_slice());
        for c in &self.constants {
            out.write_f32_le(*c);
        }
        Ok(out.into_vec())
    }
}

fn segment_len(w: &Writer) -> Result<u32, BuildError> {
    u32::try_from(w.len()).map_err(|_| BuildError::TooLarge)
}

#[cfg(test)]
mod tests {
    use super::{ArchiveBuilder, DefSpec};
    use crate::archive::{Archive, DefFlags, Instruction};
    use crate::opcode::Opcode;

    #[test]
    fn strings_are_interned_and_aligned() {
        let mut b = ArchiveBuilder::new();
        let a = b.push_string("a").unwrap();
        let long = b.push_string("longer name").unwrap();
        assert_eq!(b.push_string("a").unwrap(), a);
        assert_eq!(a, 0);
        assert_eq!(long % 4, 0);
        let bytes = b.build().unwrap();
        let archive = Archive::new(&bytes).unwrap();
        assert_eq!(archive.string_at(long), Ok("longer name"));
        assert_eq!(archive.header().strings_length % 4, 0);
    }

    #[test]
    fn constants_start_aligned_after_odd_defs() {
        let mut b = ArchiveBuilder::new();
        let code = b
            .push_code(&[Instruction::new(Opcode::Return, 0, 0, 0)])
            .unwrap();
        b.push_def(DefSpec::local("f", code, 0, 0, 0)).unwrap();
        b.set_constants(&[1.0, 2.0]);
        let bytes = b.build().unwrap();
        let archive = Archive::new(&bytes).unwrap();
        assert_eq!(archive.header().defs_length, 0x15);
        assert_eq!(archive.header().constants_offset() % 4, 0);
        assert_eq!(archive.constant(1), Ok(2.0));
    }

    #[test]
    fn extern_defs_reserve_args_and_rvals() {
        let mut b = ArchiveBuilder::new();
        let first = b.push_def(DefSpec::external("host", 3, 2)).unwrap();
        let second = b
            .push_def(DefSpec::external("iface", 1, 1).with_flags(DefFlags::INTERFACE))
            .unwrap();
        assert_eq!(second.0, 0x15);
        let bytes = b.build().unwrap();
        let archive = Archive::new(&bytes).unwrap();
        let def = archive.def_at(first).unwrap();
        assert!(def.is_extern());
        assert_eq!(def.stack_count_unaligned, 5);
        assert_eq!(def.stack_count_aligned, 8);
        assert!(archive.def_at(second).unwrap().is_interface());
    }
}
