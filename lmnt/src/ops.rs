// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opcode semantics shared by every dispatch strategy.
//!
//! Each opcode is one [`OpFn`]. The switch strategy reaches them through [`dispatch_match`];
//! the table and threaded strategies store them as function pointers (see [`handler`]).

use crate::archive::{Archive, DataSection, Def, DefRef};
use crate::context::{InterruptHandle, StatusFlags};
use crate::error::Error;
use crate::extcall::{ExtcallContext, ExtcallInfo};
use crate::format::combine;
use crate::opcode::Opcode;
use crate::trace::{TraceMask, TraceSink};

/// What the dispatch loop does after an instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Run the next instruction.
    Continue,
    /// Continue at the given instruction index.
    Branch(u32),
    /// Leave the def.
    Return,
    /// Stop at this instruction; it has not run.
    Interrupt,
}

/// One opcode implementation.
pub(crate) type OpFn = fn(&mut Machine<'_, '_>, u16, u16, u16) -> Result<Step, Error>;

const STATUS_CMP: u32 = StatusFlags::EQ.bits()
    | StatusFlags::LT.bits()
    | StatusFlags::GT.bits()
    | StatusFlags::UN.bits();

/// Interpreter state visible to opcodes.
pub(crate) struct Machine<'a, 't> {
    pub(crate) archive: Archive<'a>,
    stack: &'a mut [u8],
    live: usize,
    pub(crate) flags: u32,
    extcalls: &'a [ExtcallInfo],
    scratch: &'a mut [f32],
    interrupt: &'a InterruptHandle,
    pub(crate) mask: TraceMask,
    pub(crate) sink: Option<&'t mut dyn TraceSink>,
}

impl<'a, 't> Machine<'a, 't> {
    #[expect(clippy::too_many_arguments, reason = "plain state bundle")]
    pub(crate) fn new(
        archive: Archive<'a>,
        stack: &'a mut [u8],
        live: usize,
        flags: u32,
        extcalls: &'a [ExtcallInfo],
        scratch: &'a mut [f32],
        interrupt: &'a InterruptHandle,
        mask: TraceMask,
        sink: Option<&'t mut dyn TraceSink>,
    ) -> Self {
        Self {
            archive,
            stack,
            live,
            flags,
            extcalls,
            scratch,
            interrupt,
            mask,
            sink,
        }
    }

    /// Returns `true` if an interrupt is pending.
    #[inline(always)]
    pub(crate) fn interrupted(&self) -> bool {
        self.interrupt.is_pending()
    }

    #[inline(always)]
    pub(crate) fn trace_instr(&mut self, def: DefRef, index: u32, opcode: u16) {
        if self.mask.contains(TraceMask::INSTR)
            && let Some(t) = self.sink.as_mut()
        {
            t.instr(def, index, opcode);
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self, slot: usize) -> Result<f32, Error> {
        let at = slot.checked_mul(4).ok_or(Error::AccessViolation)?;
        let b = self
            .stack
            .get(at..at + 4)
            .ok_or(Error::AccessViolation)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    #[inline(always)]
    pub(crate) fn set(&mut self, slot: usize, v: f32) -> Result<(), Error> {
        let at = slot.checked_mul(4).ok_or(Error::AccessViolation)?;
        let b = self
            .stack
            .get_mut(at..at + 4)
            .ok_or(Error::AccessViolation)?;
        b.copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    #[inline(always)]
    fn get4(&self, slot: usize) -> Result<[f32; 4], Error> {
        Ok([
            self.get(slot)?,
            self.get(slot + 1)?,
            self.get(slot + 2)?,
            self.get(slot + 3)?,
        ])
    }

    #[inline(always)]
    fn set4(&mut self, slot: usize, v: [f32; 4]) -> Result<(), Error> {
        for (i, x) in v.into_iter().enumerate() {
            self.set(slot + i, x)?;
        }
        Ok(())
    }

    fn section(&self, index: u16) -> Result<DataSection, Error> {
        self.archive
            .data_section(u32::from(index))
            .map_err(|_| Error::AccessViolation)
    }

    fn data(&self, section: &DataSection, index: usize) -> Result<f32, Error> {
        let index = u32::try_from(index).map_err(|_| Error::AccessViolation)?;
        self.archive
            .data_value(section, index)
            .map_err(|_| Error::AccessViolation)
    }

    /// Calls the host function bound to `def`.
    ///
    /// Arguments are read from `base..base+args`; return values are written right after them.
    pub(crate) fn call_extern(&mut self, def: &Def, base: usize) -> Result<(), Error> {
        let info = self
            .extcalls
            .get(def.code as usize)
            .ok_or(Error::MissingExtcall)?;
        let args = usize::from(def.args_count);
        let rvals = usize::from(def.rvals_count);

        for k in 0..args {
            let v = self.get(base + k)?;
            *self.scratch.get_mut(k).ok_or(Error::Internal)? = v;
        }
        let buf = self
            .scratch
            .get_mut(..args + rvals)
            .ok_or(Error::Internal)?;
        let (input, output) = buf.split_at_mut(args);

        let ctx = ExtcallContext {
            info,
            interrupt: self.interrupt,
        };
        let traced = self.mask.contains(TraceMask::EXTCALL);
        if traced && let Some(t) = self.sink.as_mut() {
            t.extcall_enter(info.name);
        }
        let result = (info.function)(&ctx, input, output);
        if traced && let Some(t) = self.sink.as_mut() {
            t.extcall_exit(info.name, result);
        }
        result.map_err(Error::Extcall)?;

        for k in 0..rvals {
            let v = self.scratch[args + k];
            self.set(base + args + k, v)?;
        }
        Ok(())
    }
}

/// Converts a stack value to an index: NaN, infinities and negatives are rejected, then the
/// value is truncated.
#[inline(always)]
fn to_index(v: f32) -> Result<usize, Error> {
    if v.is_nan() || v.is_infinite() || v < 0.0 {
        return Err(Error::AccessViolation);
    }
    Ok(v as usize)
}

#[inline(always)]
fn scalar1(m: &mut Machine<'_, '_>, a1: u16, a3: u16, f: impl FnOnce(f32) -> f32) -> Result<Step, Error> {
    let v = f(m.get(usize::from(a1))?);
    m.set(usize::from(a3), v)?;
    Ok(Step::Continue)
}

#[inline(always)]
fn scalar2(
    m: &mut Machine<'_, '_>,
    a1: u16,
    a2: u16,
    a3: u16,
    f: impl FnOnce(f32, f32) -> f32,
) -> Result<Step, Error> {
    let v = f(m.get(usize::from(a1))?, m.get(usize::from(a2))?);
    m.set(usize::from(a3), v)?;
    Ok(Step::Continue)
}

#[inline(always)]
fn vector1(m: &mut Machine<'_, '_>, a1: u16, a3: u16, f: impl Fn(f32) -> f32) -> Result<Step, Error> {
    let v = m.get4(usize::from(a1))?.map(f);
    m.set4(usize::from(a3), v)?;
    Ok(Step::Continue)
}

#[inline(always)]
fn vector2(
    m: &mut Machine<'_, '_>,
    a1: u16,
    a2: u16,
    a3: u16,
    f: impl Fn(f32, f32) -> f32,
) -> Result<Step, Error> {
    let a = m.get4(usize::from(a1))?;
    let b = m.get4(usize::from(a2))?;
    m.set4(usize::from(a3), [f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])?;
    Ok(Step::Continue)
}

#[inline(always)]
fn vector_scalar(
    m: &mut Machine<'_, '_>,
    a1: u16,
    a2: u16,
    a3: u16,
    f: impl Fn(f32, f32) -> f32,
) -> Result<Step, Error> {
    let a = m.get4(usize::from(a1))?;
    let b = m.get(usize::from(a2))?;
    m.set4(usize::from(a3), a.map(|x| f(x, b)))?;
    Ok(Step::Continue)
}

#[inline(always)]
fn branch_when(cond: bool, a2: u16, a3: u16) -> Result<Step, Error> {
    Ok(if cond {
        Step::Branch(combine(a2, a3))
    } else {
        Step::Continue
    })
}

#[inline(always)]
fn assign_when(m: &mut Machine<'_, '_>, cond: bool, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let v = if cond { a1 } else { a2 };
    m.set(usize::from(a3), f32::from(v as i16))?;
    Ok(Step::Continue)
}

#[inline(always)]
fn flags_any(m: &Machine<'_, '_>, flags: StatusFlags) -> bool {
    m.flags & flags.bits() != 0
}

/// Comparison flags for `a` against `b`.
#[inline(always)]
pub(crate) fn compare(a: f32, b: f32) -> u32 {
    if a.is_nan() || b.is_nan() {
        StatusFlags::UN.bits()
    } else if a == b {
        StatusFlags::EQ.bits()
    } else if a < b {
        StatusFlags::LT.bits()
    } else {
        StatusFlags::GT.bits()
    }
}

#[inline(always)]
fn min(a: f32, b: f32) -> f32 {
    if b < a { b } else { a }
}

#[inline(always)]
fn max(a: f32, b: f32) -> f32 {
    if a < b { b } else { a }
}

#[inline(always)]
fn log_base(a: f32, b: f32) -> f32 {
    if b != 0.0 {
        libm::logf(a) / libm::logf(b)
    } else {
        f32::NAN
    }
}

// Miscellaneous

fn noop(_: &mut Machine<'_, '_>, _: u16, _: u16, _: u16) -> Result<Step, Error> {
    Ok(Step::Continue)
}

fn ret(_: &mut Machine<'_, '_>, _: u16, _: u16, _: u16) -> Result<Step, Error> {
    Ok(Step::Return)
}

/// Every entry of the interrupted table.
pub(crate) fn interrupted(_: &mut Machine<'_, '_>, _: u16, _: u16, _: u16) -> Result<Step, Error> {
    Ok(Step::Interrupt)
}

/// Table entry for values that are not opcodes. Validation makes this unreachable.
pub(crate) fn invalid(_: &mut Machine<'_, '_>, _: u16, _: u16, _: u16) -> Result<Step, Error> {
    Err(Error::Internal)
}

// Assignment

fn assignss(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, |x| x)
}

fn assignvv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    vector1(m, a1, a3, |x| x)
}

fn assignsv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    let v = m.get(usize::from(a1))?;
    m.set4(usize::from(a3), [v; 4])?;
    Ok(Step::Continue)
}

fn assigniis(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    m.set(usize::from(a3), combine(a1, a2) as i32 as f32)?;
    Ok(Step::Continue)
}

fn assignibs(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    m.set(usize::from(a3), f32::from_bits(combine(a1, a2)))?;
    Ok(Step::Continue)
}

fn assigniiv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    m.set4(usize::from(a3), [combine(a1, a2) as i32 as f32; 4])?;
    Ok(Step::Continue)
}

fn assignibv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    m.set4(usize::from(a3), [f32::from_bits(combine(a1, a2)); 4])?;
    Ok(Step::Continue)
}

// Data loads

fn dloadiis(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let s = m.section(a1)?;
    let v = m.data(&s, usize::from(a2))?;
    m.set(usize::from(a3), v)?;
    Ok(Step::Continue)
}

fn dloadiiv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let s = m.section(a1)?;
    let i = usize::from(a2);
    let v = [m.data(&s, i)?, m.data(&s, i + 1)?, m.data(&s, i + 2)?, m.data(&s, i + 3)?];
    m.set4(usize::from(a3), v)?;
    Ok(Step::Continue)
}

fn dloadirs(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let s = m.section(a1)?;
    let i = to_index(m.get(usize::from(a2))?)?;
    if i >= s.count as usize {
        return Err(Error::AccessViolation);
    }
    let v = m.data(&s, i)?;
    m.set(usize::from(a3), v)?;
    Ok(Step::Continue)
}

fn dloadirv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let s = m.section(a1)?;
    let i = to_index(m.get(usize::from(a2))?)?;
    let count = s.count as usize;
    if count < 4 || i > count - 4 {
        return Err(Error::AccessViolation);
    }
    let v = [m.data(&s, i)?, m.data(&s, i + 1)?, m.data(&s, i + 2)?, m.data(&s, i + 3)?];
    m.set4(usize::from(a3), v)?;
    Ok(Step::Continue)
}

fn dseclen(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    let s = m.section(a1)?;
    m.set(usize::from(a3), s.count as f32)?;
    Ok(Step::Continue)
}

// Arithmetic

fn addss(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, |a, b| a + b)
}

fn addvv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector2(m, a1, a2, a3, |a, b| a + b)
}

fn subss(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, |a, b| a - b)
}

fn subvv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector2(m, a1, a2, a3, |a, b| a - b)
}

fn mulss(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, |a, b| a * b)
}

fn mulvv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector2(m, a1, a2, a3, |a, b| a * b)
}

fn divss(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, |a, b| a / b)
}

fn divvv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector2(m, a1, a2, a3, |a, b| a / b)
}

fn modss(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, libm::fmodf)
}

fn modvv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector2(m, a1, a2, a3, libm::fmodf)
}

// Trigonometry

fn sin(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::sinf)
}

fn cos(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::cosf)
}

fn tan(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::tanf)
}

fn asin(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::asinf)
}

fn acos(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::acosf)
}

fn atan(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::atanf)
}

fn atan2(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, libm::atan2f)
}

fn sincos(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let v = m.get(usize::from(a1))?;
    m.set(usize::from(a2), libm::sinf(v))?;
    m.set(usize::from(a3), libm::cosf(v))?;
    Ok(Step::Continue)
}

// Powers and logarithms

fn powss(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, libm::powf)
}

fn powvv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector2(m, a1, a2, a3, libm::powf)
}

fn powvs(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector_scalar(m, a1, a2, a3, libm::powf)
}

fn sqrts(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::sqrtf)
}

fn sqrtv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    vector1(m, a1, a3, libm::sqrtf)
}

fn log(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, log_base)
}

fn ln(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::logf)
}

fn log2(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::log2f)
}

fn log10(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::log10f)
}

// Magnitude, extrema, rounding

fn abss(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::fabsf)
}

fn absv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    vector1(m, a1, a3, libm::fabsf)
}

fn sumv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    let v = m.get4(usize::from(a1))?;
    m.set(usize::from(a3), v[0] + v[1] + v[2] + v[3])?;
    Ok(Step::Continue)
}

fn minss(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, min)
}

fn minvv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector2(m, a1, a2, a3, min)
}

fn maxss(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    scalar2(m, a1, a2, a3, max)
}

fn maxvv(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector2(m, a1, a2, a3, max)
}

fn minvs(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector_scalar(m, a1, a2, a3, min)
}

fn maxvs(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    vector_scalar(m, a1, a2, a3, max)
}

fn floors(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::floorf)
}

fn floorv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    vector1(m, a1, a3, libm::floorf)
}

fn rounds(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::rintf)
}

fn roundv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    vector1(m, a1, a3, libm::rintf)
}

fn ceils(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::ceilf)
}

fn ceilv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    vector1(m, a1, a3, libm::ceilf)
}

fn truncs(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    scalar1(m, a1, a3, libm::truncf)
}

fn truncv(m: &mut Machine<'_, '_>, a1: u16, _: u16, a3: u16) -> Result<Step, Error> {
    vector1(m, a1, a3, libm::truncf)
}

// Indexing

fn indexris(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let src = to_index(m.get(usize::from(a1))?)? + usize::from(a2);
    if src >= m.live {
        return Err(Error::AccessViolation);
    }
    let v = m.get(src)?;
    m.set(usize::from(a3), v)?;
    Ok(Step::Continue)
}

fn indexrir(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let src = to_index(m.get(usize::from(a1))?)? + usize::from(a2);
    let dst = to_index(m.get(usize::from(a3))?)?;
    if src >= m.live || dst >= m.live {
        return Err(Error::AccessViolation);
    }
    let v = m.get(src)?;
    m.set(dst, v)?;
    Ok(Step::Continue)
}

// Branches

fn branch(_: &mut Machine<'_, '_>, _: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    branch_when(true, a2, a3)
}

fn branchz(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let v = m.get(usize::from(a1))?;
    branch_when(libm::fabsf(v) == 0.0, a2, a3)
}

fn branchnz(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let v = m.get(usize::from(a1))?;
    branch_when(!v.is_nan() && libm::fabsf(v) != 0.0, a2, a3)
}

fn branchpos(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let v = m.get(usize::from(a1))?;
    branch_when(!v.is_sign_negative(), a2, a3)
}

fn branchneg(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let v = m.get(usize::from(a1))?;
    branch_when(v.is_sign_negative(), a2, a3)
}

fn branchun(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let v = m.get(usize::from(a1))?;
    branch_when(v.is_nan(), a2, a3)
}

// Comparisons

fn cmp(m: &mut Machine<'_, '_>, a1: u16, a2: u16, _: u16) -> Result<Step, Error> {
    let flags = compare(m.get(usize::from(a1))?, m.get(usize::from(a2))?);
    m.flags = (m.flags & !STATUS_CMP) | flags;
    Ok(Step::Continue)
}

fn cmpz(m: &mut Machine<'_, '_>, a1: u16, _: u16, _: u16) -> Result<Step, Error> {
    let flags = compare(m.get(usize::from(a1))?, 0.0);
    m.flags = (m.flags & !STATUS_CMP) | flags;
    Ok(Step::Continue)
}

fn branchceq(m: &mut Machine<'_, '_>, _: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    branch_when(flags_any(m, StatusFlags::EQ), a2, a3)
}

fn branchcne(m: &mut Machine<'_, '_>, _: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    branch_when(!flags_any(m, StatusFlags::EQ), a2, a3)
}

fn branchclt(m: &mut Machine<'_, '_>, _: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    branch_when(flags_any(m, StatusFlags::LT), a2, a3)
}

fn branchcle(m: &mut Machine<'_, '_>, _: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    branch_when(flags_any(m, StatusFlags::LT | StatusFlags::EQ), a2, a3)
}

fn branchcgt(m: &mut Machine<'_, '_>, _: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    branch_when(flags_any(m, StatusFlags::GT), a2, a3)
}

fn branchcge(m: &mut Machine<'_, '_>, _: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    branch_when(flags_any(m, StatusFlags::GT | StatusFlags::EQ), a2, a3)
}

fn branchcun(m: &mut Machine<'_, '_>, _: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    branch_when(flags_any(m, StatusFlags::UN), a2, a3)
}

fn assignceq(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let c = flags_any(m, StatusFlags::EQ);
    assign_when(m, c, a1, a2, a3)
}

fn assigncne(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let c = !flags_any(m, StatusFlags::EQ);
    assign_when(m, c, a1, a2, a3)
}

fn assignclt(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let c = flags_any(m, StatusFlags::LT);
    assign_when(m, c, a1, a2, a3)
}

fn assigncle(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let c = flags_any(m, StatusFlags::LT | StatusFlags::EQ);
    assign_when(m, c, a1, a2, a3)
}

fn assigncgt(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let c = flags_any(m, StatusFlags::GT);
    assign_when(m, c, a1, a2, a3)
}

fn assigncge(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let c = flags_any(m, StatusFlags::GT | StatusFlags::EQ);
    assign_when(m, c, a1, a2, a3)
}

fn assigncun(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let c = flags_any(m, StatusFlags::UN);
    assign_when(m, c, a1, a2, a3)
}

// Host calls

fn extcall(m: &mut Machine<'_, '_>, a1: u16, a2: u16, a3: u16) -> Result<Step, Error> {
    let def = m
        .archive
        .def_at(DefRef(combine(a1, a2)))
        .map_err(|_| Error::Internal)?;
    m.call_extern(&def, usize::from(a3))?;
    Ok(Step::Continue)
}

macro_rules! op_handlers {
    ($($op:ident => $f:ident,)*) => {
        /// Runs one instruction by matching on its opcode.
        #[inline(always)]
        pub(crate) fn dispatch_match(
            m: &mut Machine<'_, '_>,
            op: Opcode,
            a1: u16,
            a2: u16,
            a3: u16,
        ) -> Result<Step, Error> {
            match op {
                $(Opcode::$op => $f(m, a1, a2, a3),)*
            }
        }

        /// Returns the implementation of `op`.
        #[must_use]
        pub(crate) fn handler(op: Opcode) -> OpFn {
            match op {
                $(Opcode::$op => $f,)*
            }
        }
    };
}

op_handlers! {
    Noop => noop,
    Return => ret,
    AssignSs => assignss,
    AssignVv => assignvv,
    AssignSv => assignsv,
    AssignIis => assigniis,
    AssignIbs => assignibs,
    AssignIiv => assigniiv,
    AssignIbv => assignibv,
    DloadIis => dloadiis,
    DloadIiv => dloadiiv,
    DloadIrs => dloadirs,
    DloadIrv => dloadirv,
    Dseclen => dseclen,
    AddSs => addss,
    AddVv => addvv,
    SubSs => subss,
    SubVv => subvv,
    MulSs => mulss,
    MulVv => mulvv,
    DivSs => divss,
    DivVv => divvv,
    ModSs => modss,
    ModVv => modvv,
    Sin => sin,
    Cos => cos,
    Tan => tan,
    Asin => asin,
    Acos => acos,
    Atan => atan,
    Atan2 => atan2,
    Sincos => sincos,
    PowSs => powss,
    PowVv => powvv,
    PowVs => powvs,
    SqrtS => sqrts,
    SqrtV => sqrtv,
    Log => log,
    Ln => ln,
    Log2 => log2,
    Log10 => log10,
    AbsS => abss,
    AbsV => absv,
    SumV => sumv,
    MinSs => minss,
    MinVv => minvv,
    MaxSs => maxss,
    MaxVv => maxvv,
    MinVs => minvs,
    MaxVs => maxvs,
    FloorS => floors,
    FloorV => floorv,
    RoundS => rounds,
    RoundV => roundv,
    CeilS => ceils,
    CeilV => ceilv,
    TruncS => truncs,
    TruncV => truncv,
    IndexRis => indexris,
    IndexRir => indexrir,
    Branch => branch,
    BranchZ => branchz,
    BranchNz => branchnz,
    BranchPos => branchpos,
    BranchNeg => branchneg,
    BranchUn => branchun,
    Cmp => cmp,
    CmpZ => cmpz,
    BranchCeq => branchceq,
    BranchCne => branchcne,
    BranchClt => branchclt,
    BranchCle => branchcle,
    BranchCgt => branchcgt,
    BranchCge => branchcge,
    BranchCun => branchcun,
    AssignCeq => assignceq,
    AssignCne => assigncne,
    AssignClt => assignclt,
    AssignCle => assigncle,
    AssignCgt => assigncgt,
    AssignCge => assigncge,
    AssignCun => assigncun,
    Extcall => extcall,
}
