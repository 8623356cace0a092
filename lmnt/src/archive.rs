// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only views over an LMNT archive blob.
//!
//! An archive is a 28-byte header followed by five segments, in order: strings, defs, code,
//! data, constants. The views here perform bounds checks only; structural and semantic checks
//! live in [`crate::validation`].

use core::fmt;

use crate::format::{DecodeError, Reader, Writer, combine};
use crate::opcode::Opcode;

/// Archive magic bytes.
pub const MAGIC: [u8; 4] = *b"LMNT";
/// Size of the archive header in bytes.
pub const HEADER_SIZE: usize = 28;
/// Size of a def record (without trailing bases) in bytes.
pub const DEF_SIZE: usize = 0x15;
/// Size of a code block header in bytes.
pub const CODE_HEADER_SIZE: usize = 4;
/// Size of an encoded instruction in bytes.
pub const INSTRUCTION_SIZE: usize = 8;
/// Size of the data segment header in bytes.
pub const DATA_HEADER_SIZE: usize = 4;
/// Size of a data section table entry in bytes.
pub const DATA_SECTION_SIZE: usize = 8;
/// Size of one value in bytes.
pub const VALUE_SIZE: usize = 4;

/// The fixed archive header.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// Major format version. Written but not interpreted.
    pub version_major: u8,
    /// Minor format version. Written but not interpreted.
    pub version_minor: u8,
    /// Length of the strings segment.
    pub strings_length: u32,
    /// Length of the defs segment.
    pub defs_length: u32,
    /// Length of the code segment.
    pub code_length: u32,
    /// Length of the data segment.
    pub data_length: u32,
    /// Length of the constants segment.
    pub constants_length: u32,
}

impl Header {
    /// Parses a header from the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        if r.read_bytes(4)? != MAGIC {
            return Err(DecodeError::BadMagic);
        }
        let version_major = r.read_u8()?;
        let version_minor = r.read_u8()?;
        r.skip(2)?;
        Ok(Self {
            version_major,
            version_minor,
            strings_length: r.read_u32_le()?,
            defs_length: r.read_u32_le()?,
            code_length: r.read_u32_le()?,
            data_length: r.read_u32_le()?,
            constants_length: r.read_u32_le()?,
        })
    }

    /// Appends the encoded header to `w`.
    pub fn write(&self, w: &mut Writer) {
        w.write_bytes(&MAGIC);
        w.write_u8(self.version_major);
        w.write_u8(self.version_minor);
        w.write_u16_le(0);
        w.write_u32_le(self.strings_length);
        w.write_u32_le(self.defs_length);
        w.write_u32_le(self.code_length);
        w.write_u32_le(self.data_length);
        w.write_u32_le(self.constants_length);
    }

    /// Sum of all segment lengths.
    #[must_use]
    pub fn segments_length(&self) -> u64 {
        u64::from(self.strings_length)
            + u64::from(self.defs_length)
            + u64::from(self.code_length)
            + u64::from(self.data_length)
            + u64::from(self.constants_length)
    }

    /// Byte offset of the strings segment.
    #[must_use]
    pub fn strings_offset(&self) -> usize {
        HEADER_SIZE
    }

    /// Byte offset of the defs segment.
    #[must_use]
    pub fn defs_offset(&self) -> usize {
        self.strings_offset() + self.strings_length as usize
    }

    /// Byte offset of the code segment.
    #[must_use]
    pub fn code_offset(&self) -> usize {
        self.defs_offset() + self.defs_length as usize
    }

    /// Byte offset of the data segment.
    #[must_use]
    pub fn data_offset(&self) -> usize {
        self.code_offset() + self.code_length as usize
    }

    /// Byte offset of the constants segment. The value stack starts here.
    #[must_use]
    pub fn constants_offset(&self) -> usize {
        self.data_offset() + self.data_length as usize
    }

    /// Number of constant values.
    #[must_use]
    pub fn constants_count(&self) -> usize {
        self.constants_length as usize / VALUE_SIZE
    }
}

/// Def flag bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DefFlags(u16);

impl core::ops::BitOr for DefFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for DefFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl DefFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// The def only declares a signature.
    pub const INTERFACE: Self = Self(1 << 0);
    /// The def is bound to a host function at prepare time.
    pub const EXTERN: Self = Self(1 << 1);
    /// The def is a lambda.
    pub const LAMBDA: Self = Self(1 << 2);
    /// The def's code contains at least one backward branch.
    pub const HAS_BACKBRANCHES: Self = Self(1 << 3);

    /// Creates flags from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns `true` if all bits in `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// A def, identified by its byte offset inside the defs segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefRef(pub u32);

impl fmt::Display for DefRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def@{:#x}", self.0)
    }
}

/// A decoded def record.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Def {
    /// Record length including trailing bases.
    pub length: u16,
    /// Byte offset of the name in the strings segment.
    pub name: u16,
    /// Def flags.
    pub flags: DefFlags,
    /// Byte offset of the code block, or the extcall index once an extern def is prepared.
    pub code: u32,
    /// Stack slots used by the def (args, rvals and locals).
    pub stack_count_unaligned: u16,
    /// `stack_count_unaligned` rounded for vector alignment.
    pub stack_count_aligned: u16,
    /// Number of leading arguments inherited from bases.
    pub base_args_count: u16,
    /// Total number of arguments.
    pub args_count: u16,
    /// Number of return values.
    pub rvals_count: u16,
    /// Number of base defs listed after the record.
    pub bases_count: u8,
}

impl Def {
    /// Byte offset of the `code` field inside a def record.
    pub const CODE_FIELD_OFFSET: usize = 6;

    fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            length: r.read_u16_le()?,
            name: r.read_u16_le()?,
            flags: DefFlags::from_bits(r.read_u16_le()?),
            code: r.read_u32_le()?,
            stack_count_unaligned: r.read_u16_le()?,
            stack_count_aligned: r.read_u16_le()?,
            base_args_count: r.read_u16_le()?,
            args_count: r.read_u16_le()?,
            rvals_count: r.read_u16_le()?,
            bases_count: r.read_u8()?,
        })
    }

    /// Appends the encoded record (without bases) to `w`.
    pub fn write(&self, w: &mut Writer) {
        w.write_u16_le(self.length);
        w.write_u16_le(self.name);
        w.write_u16_le(self.flags.bits());
        w.write_u32_le(self.code);
        w.write_u16_le(self.stack_count_unaligned);
        w.write_u16_le(self.stack_count_aligned);
        w.write_u16_le(self.base_args_count);
        w.write_u16_le(self.args_count);
        w.write_u16_le(self.rvals_count);
        w.write_u8(self.bases_count);
    }

    /// Returns `true` if this def is bound to a host function.
    #[must_use]
    pub fn is_extern(&self) -> bool {
        self.flags.contains(DefFlags::EXTERN)
    }

    /// Returns `true` if this def only declares a signature.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(DefFlags::INTERFACE)
    }

    /// Returns `true` if this def's code may branch backwards.
    #[must_use]
    pub fn has_backbranches(&self) -> bool {
        self.flags.contains(DefFlags::HAS_BACKBRANCHES)
    }
}

/// One 8-byte instruction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    /// Raw opcode value.
    pub opcode: u16,
    /// First operand.
    pub arg1: u16,
    /// Second operand.
    pub arg2: u16,
    /// Third operand.
    pub arg3: u16,
}

impl Instruction {
    /// Creates an instruction.
    #[must_use]
    pub const fn new(opcode: Opcode, arg1: u16, arg2: u16, arg3: u16) -> Self {
        Self {
            opcode: opcode as u16,
            arg1,
            arg2,
            arg3,
        }
    }

    /// Decodes the opcode, if it is known.
    #[must_use]
    pub fn op(&self) -> Option<Opcode> {
        Opcode::from_u16(self.opcode)
    }

    /// Branch target carried in `arg2`/`arg3`.
    #[must_use]
    pub const fn target(&self) -> u32 {
        combine(self.arg2, self.arg3)
    }

    /// Def offset carried in `arg1`/`arg2` (for `extcall`).
    #[must_use]
    pub const fn def_target(&self) -> u32 {
        combine(self.arg1, self.arg2)
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            opcode: r.read_u16_le()?,
            arg1: r.read_u16_le()?,
            arg2: r.read_u16_le()?,
            arg3: r.read_u16_le()?,
        })
    }

    /// Appends the encoded instruction to `w`.
    pub fn write(&self, w: &mut Writer) {
        w.write_u16_le(self.opcode);
        w.write_u16_le(self.arg1);
        w.write_u16_le(self.arg2);
        w.write_u16_le(self.arg3);
    }
}

/// A code block view.
#[derive(Copy, Clone, Debug)]
pub struct Code<'a> {
    instructions: &'a [u8],
    count: u32,
}

impl<'a> Code<'a> {
    /// Number of instructions.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Decodes instruction `index`.
    pub fn instruction(&self, index: u32) -> Result<Instruction, DecodeError> {
        let offset = (index as usize)
            .checked_mul(INSTRUCTION_SIZE)
            .ok_or(DecodeError::OutOfBounds)?;
        Instruction::read(&mut Reader::at(self.instructions, offset))
    }

    /// Iterates over all instructions.
    pub fn iter(&self) -> impl Iterator<Item = Result<Instruction, DecodeError>> + 'a {
        let code = *self;
        (0..code.count).map(move |i| code.instruction(i))
    }
}

/// A data section table entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DataSection {
    /// Byte offset of the first value, relative to the data segment.
    pub offset: u32,
    /// Number of values.
    pub count: u32,
}

/// A read-only archive view.
#[derive(Copy, Clone, Debug)]
pub struct Archive<'a> {
    bytes: &'a [u8],
    header: Header,
}

impl<'a> Archive<'a> {
    /// Parses the header of `bytes`. Segments are only checked when accessed.
    pub fn new(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let header = Header::parse(bytes)?;
        Ok(Self { bytes, header })
    }

    /// Returns the raw archive bytes.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the parsed header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    fn segment(&self, offset: usize, len: u32) -> Result<&'a [u8], DecodeError> {
        let end = offset
            .checked_add(len as usize)
            .ok_or(DecodeError::OutOfBounds)?;
        self.bytes
            .get(offset..end)
            .ok_or(DecodeError::UnexpectedEof)
    }

    /// The strings segment.
    pub fn strings_segment(&self) -> Result<&'a [u8], DecodeError> {
        self.segment(self.header.strings_offset(), self.header.strings_length)
    }

    /// The defs segment.
    pub fn defs_segment(&self) -> Result<&'a [u8], DecodeError> {
        self.segment(self.header.defs_offset(), self.header.defs_length)
    }

    /// The code segment.
    pub fn code_segment(&self) -> Result<&'a [u8], DecodeError> {
        self.segment(self.header.code_offset(), self.header.code_length)
    }

    /// The data segment.
    pub fn data_segment(&self) -> Result<&'a [u8], DecodeError> {
        self.segment(self.header.data_offset(), self.header.data_length)
    }

    /// The constants segment.
    pub fn constants_segment(&self) -> Result<&'a [u8], DecodeError> {
        self.segment(
            self.header.constants_offset(),
            self.header.constants_length,
        )
    }

    /// Reads the string entry at byte `offset` of the strings segment.
    pub fn string_at(&self, offset: u16) -> Result<&'a str, DecodeError> {
        let mut r = Reader::at(self.strings_segment()?, usize::from(offset));
        let size = r.read_u16_le()?;
        r.read_cstr(usize::from(size))
    }

    /// Reads the def record at `def`.
    pub fn def_at(&self, def: DefRef) -> Result<Def, DecodeError> {
        Def::read(&mut Reader::at(self.defs_segment()?, def.0 as usize))
    }

    /// Reads the name of `def`.
    pub fn def_name(&self, def: DefRef) -> Result<&'a str, DecodeError> {
        self.string_at(self.def_at(def)?.name)
    }

    /// Iterates over `(DefRef, Def)` in segment order.
    ///
    /// Iteration stops after the first decode error.
    #[must_use]
    pub fn defs(&self) -> Defs<'a> {
        Defs {
            archive: *self,
            offset: 0,
            done: false,
        }
    }

    /// Finds a def by name.
    pub fn find_def(&self, name: &str) -> Result<Option<DefRef>, DecodeError> {
        for entry in self.defs() {
            let (def_ref, def) = entry?;
            if self.string_at(def.name)? == name {
                return Ok(Some(def_ref));
            }
        }
        Ok(None)
    }

    /// Reads the code block at byte `offset` of the code segment.
    pub fn code_at(&self, offset: u32) -> Result<Code<'a>, DecodeError> {
        let segment = self.code_segment()?;
        let mut r = Reader::at(segment, offset as usize);
        let count = r.read_u32_le()?;
        let len = (count as usize)
            .checked_mul(INSTRUCTION_SIZE)
            .ok_or(DecodeError::OutOfBounds)?;
        let instructions = r.read_bytes(len)?;
        Ok(Code {
            instructions,
            count,
        })
    }

    /// Number of data sections. An empty data segment has none.
    pub fn data_sections_count(&self) -> Result<u32, DecodeError> {
        let segment = self.data_segment()?;
        if segment.is_empty() {
            return Ok(0);
        }
        Reader::new(segment).read_u32_le()
    }

    /// Reads data section `index`.
    pub fn data_section(&self, index: u32) -> Result<DataSection, DecodeError> {
        if index >= self.data_sections_count()? {
            return Err(DecodeError::OutOfBounds);
        }
        let offset = DATA_HEADER_SIZE + index as usize * DATA_SECTION_SIZE;
        let mut r = Reader::at(self.data_segment()?, offset);
        Ok(DataSection {
            offset: r.read_u32_le()?,
            count: r.read_u32_le()?,
        })
    }

    /// Reads value `index` of `section`.
    pub fn data_value(&self, section: &DataSection, index: u32) -> Result<f32, DecodeError> {
        if index >= section.count {
            return Err(DecodeError::OutOfBounds);
        }
        let offset = section.offset as usize + index as usize * VALUE_SIZE;
        Reader::at(self.data_segment()?, offset).read_f32_le()
    }

    /// Number of constants.
    #[must_use]
    pub fn constants_count(&self) -> usize {
        self.header.constants_count()
    }

    /// Reads constant `index`.
    pub fn constant(&self, index: usize) -> Result<f32, DecodeError> {
        let offset = index
            .checked_mul(VALUE_SIZE)
            .ok_or(DecodeError::OutOfBounds)?;
        Reader::at(self.constants_segment()?, offset).read_f32_le()
    }
}

/// Iterator over the defs of an [`Archive`].
#[derive(Clone, Debug)]
pub struct Defs<'a> {
    archive: Archive<'a>,
    offset: u32,
    done: bool,
}

impl Iterator for Defs<'_> {
    type Item = Result<(DefRef, Def), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.archive.header.defs_length {
            return None;
        }
        let def_ref = DefRef(self.offset);
        let def = match self.archive.def_at(def_ref) {
            Ok(def) => def,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        // A zero length would never advance.
        if usize::from(def.length) < DEF_SIZE {
            self.done = true;
            return Some(Err(DecodeError::OutOfBounds));
        }
        self.offset += u32::from(def.length);
        Some(Ok((def_ref, def)))
    }
}
