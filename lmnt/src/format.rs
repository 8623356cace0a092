// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Encoding/decoding primitives for the LMNT archive format.
//!
//! All multi-byte integers in an archive are little-endian. Two adjacent 16-bit instruction
//! operands may form one 32-bit "loffset"; see [`combine`] and [`split`].

use alloc::vec::Vec;
use core::fmt;

/// Combines two 16-bit operands into one 32-bit value: `lo | hi << 16`.
///
/// This is how branch targets, def offsets and 32-bit immediates are carried by instructions.
#[must_use]
#[inline(always)]
pub const fn combine(lo: u16, hi: u16) -> u32 {
    (lo as u32) | ((hi as u32) << 16)
}

/// Splits a 32-bit value into `(lo, hi)` operands. Inverse of [`combine`].
#[must_use]
#[inline(always)]
pub const fn split(v: u32) -> (u16, u16) {
    ((v & 0xFFFF) as u16, (v >> 16) as u16)
}

/// A decode error for LMNT binary artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended unexpectedly.
    UnexpectedEof,
    /// A length/offset was out of bounds.
    OutOfBounds,
    /// A string was not valid UTF-8.
    InvalidUtf8,
    /// A string was not NUL-terminated.
    MissingNul,
    /// A magic header mismatch.
    BadMagic,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::OutOfBounds => write!(f, "out of bounds"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
            Self::MissingNul => write!(f, "string is not NUL-terminated"),
            Self::BadMagic => write!(f, "bad magic header"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// A simple byte reader with bounds checks.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader over `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Creates a reader over `bytes` positioned at `offset`.
    ///
    /// The offset is not checked until the first read.
    #[must_use]
    pub fn at(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    /// Returns the current cursor offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of bytes left after the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(DecodeError::OutOfBounds)?;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(DecodeError::UnexpectedEof)?;
        self.offset = end;
        Ok(slice)
    }

    /// Skips `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.take(len).map(|_| ())
    }

    /// Reads a `u8`.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian `f32`.
    pub fn read_f32_le(&mut self) -> Result<f32, DecodeError> {
        self.read_u32_le().map(f32::from_bits)
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.take(len)
    }

    /// Reads `len` bytes holding a NUL-terminated UTF-8 string.
    ///
    /// The last byte must be NUL. The string ends at the first NUL, so padding is dropped.
    pub fn read_cstr(&mut self, len: usize) -> Result<&'a str, DecodeError> {
        let b = self.take(len)?;
        if b.last() != Some(&0) {
            return Err(DecodeError::MissingNul);
        }
        let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
        core::str::from_utf8(&b[..end]).map_err(|_| DecodeError::InvalidUtf8)
    }
}

/// A simple byte writer.
#[derive(Clone, Debug, Default)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a reference to the written bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the writer and returns the underlying byte buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    /// Appends a `u8`.
    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    /// Appends a little-endian `u16`.
    pub fn write_u16_le(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a little-endian `u32`.
    pub fn write_u32_le(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a little-endian `f32`.
    pub fn write_f32_le(&mut self, v: f32) {
        self.write_u32_le(v.to_bits());
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, b: &[u8]) {
        self.bytes.extend_from_slice(b);
    }

    /// Appends zero bytes until the length is a multiple of `align`.
    pub fn pad_to(&mut self, align: usize) {
        while self.bytes.len() % align != 0 {
            self.bytes.push(0);
        }
    }

    /// Overwrites a previously written little-endian `u32` at `offset`.
    pub fn patch_u32_le(&mut self, offset: usize, v: u32) -> Result<(), DecodeError> {
        let end = offset.checked_add(4).ok_or(DecodeError::OutOfBounds)?;
        let slot = self
            .bytes
            .get_mut(offset..end)
            .ok_or(DecodeError::OutOfBounds)?;
        slot.copy_from_slice(&v.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, Reader, Writer, combine, split};

    #[test]
    fn combine_packs_lo_then_hi() {
        assert_eq!(combine(0x5678, 0x1234), 0x1234_5678);
        assert_eq!(split(0x1234_5678), (0x5678, 0x1234));
        assert_eq!(combine(0xFFFF, 0), 0xFFFF);
        assert_eq!(split(u32::MAX), (u16::MAX, u16::MAX));
    }

    #[test]
    fn reader_reports_eof_and_tracks_offset() {
        let mut w = Writer::new();
        w.write_u16_le(0xBEEF);
        w.write_f32_le(1.5);
        let bytes = w.into_vec();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u16_le(), Ok(0xBEEF));
        assert_eq!(r.read_f32_le(), Ok(1.5));
        assert_eq!(r.offset(), 6);
        assert_eq!(r.read_u8(), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn read_cstr_requires_terminator() {
        assert_eq!(Reader::new(b"abc\0").read_cstr(4), Ok("abc"));
        assert_eq!(Reader::new(b"ab\0\0").read_cstr(4), Ok("ab"));
        assert_eq!(
            Reader::new(b"abcd").read_cstr(4),
            Err(DecodeError::MissingNul)
        );
        assert_eq!(Reader::new(b"").read_cstr(0), Err(DecodeError::MissingNul));
    }

    #[test]
    fn reader_at_huge_offset_is_out_of_bounds() {
        let mut r = Reader::at(b"abcd", usize::MAX);
        assert_eq!(r.read_u16_le(), Err(DecodeError::OutOfBounds));
    }

    #[test]
    fn writer_pads_and_patches() {
        let mut w = Writer::new();
        w.write_u8(1);
        w.pad_to(4);
        assert_eq!(w.len(), 4);
        w.write_u32_le(0);
        w.patch_u32_le(4, 7).unwrap();
        assert_eq!(w.as_slice(), &[1, 0, 0, 0, 7, 0, 0, 0]);
        assert_eq!(w.patch_u32_le(6, 1), Err(DecodeError::OutOfBounds));
    }
}
