// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree to bytecode lowering.
//!
//! [`compile_function`] runs four phases over a [`Tree`]:
//!
//! 1. **Create**: every reachable node gets an allocation of its width. Constant operand uses
//!    are counted.
//! 2. **Prepare**: pins constants, inputs and loop state to fixed locations, claims the root
//!    into the output block, embeds free struct fields in their struct's block and records first
//!    and last use.
//! 3. **Allocate**: the [`Allocator`] places every remaining allocation in the locals region.
//! 4. **Compile**: emits code post-order. Code emitted inside a conditional branch is only reused
//!    from that branch (or branches nested in it); elsewhere the node is emitted again.
//!
//! The result carries symbolic stack operands until [`CompiledFunction::resolve`] lays the stack
//! out as constants, then inputs, then outputs, then locals.

use alloc::vec::Vec;
use core::fmt;

use lmnt::archive::{DefFlags, Instruction as RawInstruction};
use lmnt::builder::{ArchiveBuilder, BuildError, DefSpec};
use lmnt::format::split;
use lmnt::opcode::Opcode;

use crate::allocator::{AllocationRequest, Allocator, NaiveAllocator};
use crate::evaluator::nullary;
use crate::fold::fold;
use crate::state::{CompilerState, Region, Slot, Stage};
use crate::tree::{BinaryOp, Instruction, NodeId, Tree, TreeError, UnaryOp};

/// Compiler settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Constants used at least this many times go to the constant pool. Others are written
    /// with an immediate each time they are needed.
    pub constant_reuse_threshold: u32,
    /// Fold constant subtrees before lowering.
    pub fold_constants: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            constant_reuse_threshold: 2,
            fold_constants: true,
        }
    }
}

/// Errors produced while compiling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// Two values that must have the same width do not.
    WidthMismatch {
        /// Required width.
        expected: u32,
        /// Actual width.
        found: u32,
    },
    /// A node was compiled before an allocation for it existed.
    MissingAllocation {
        /// The node.
        node: NodeId,
    },
    /// A node was given two allocations.
    AllocationCollision {
        /// The node.
        node: NodeId,
    },
    /// An indexer reaches past the end of its target.
    InvalidIndex {
        /// Requested index.
        index: u32,
        /// Width of the target.
        width: u32,
    },
    /// An input is outside the function inputs or the enclosing loop state.
    InputOutOfRange {
        /// Input scope.
        scope: u32,
        /// Index within the scope.
        index: u32,
    },
    /// A select has no options.
    EmptySelect,
    /// The function needs more stack slots than 16-bit operands can address.
    StackOverflow {
        /// Slots required.
        slots: usize,
    },
    /// The tree is malformed.
    InvalidTree(TreeError),
    /// The archive could not be encoded.
    Build(BuildError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WidthMismatch { expected, found } => {
                write!(f, "width mismatch: expected {expected}, found {found}")
            }
            Self::MissingAllocation { node } => write!(f, "no allocation for {node}"),
            Self::AllocationCollision { node } => write!(f, "conflicting allocations for {node}"),
            Self::InvalidIndex { index, width } => {
                write!(f, "index {index} out of range for width {width}")
            }
            Self::InputOutOfRange { scope, index } => {
                write!(f, "input {index} of scope {scope} is out of range")
            }
            Self::EmptySelect => write!(f, "select without options"),
            Self::StackOverflow { slots } => write!(f, "stack overflow: {slots} slots"),
            Self::InvalidTree(e) => write!(f, "invalid tree: {e}"),
            Self::Build(e) => write!(f, "archive build failed: {e}"),
        }
    }
}

impl core::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::InvalidTree(e) => Some(e),
            Self::Build(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TreeError> for CompileError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::WidthMismatch { expected, found } => Self::WidthMismatch { expected, found },
            TreeError::InvalidIndex { index, width } => Self::InvalidIndex { index, width },
            TreeError::EmptySelect => Self::EmptySelect,
            e => Self::InvalidTree(e),
        }
    }
}

impl From<BuildError> for CompileError {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}

/// One operand of a [`CompiledInstruction`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// A stack slot, resolved by [`CompiledFunction::resolve`].
    Slot(Slot),
    /// A raw operand word: immediates, branch targets, unused operands.
    Word(u16),
}

/// An instruction with symbolic stack operands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// The opcode.
    pub opcode: Opcode,
    /// Operands in encoding order.
    pub args: [Operand; 3],
}

/// The output of [`compile_function`].
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledFunction {
    /// Code with symbolic stack operands.
    pub instructions: Vec<CompiledInstruction>,
    /// The constant pool.
    pub constants: Vec<f32>,
    /// Def flags the code requires.
    pub flags: DefFlags,
    /// Number of inputs.
    pub inputs_count: u16,
    /// Number of outputs.
    pub outputs_count: u16,
    /// Number of local slots.
    pub local_stack_count: u16,
}

impl CompiledFunction {
    /// Stack slots used by the def, excluding constants.
    #[must_use]
    pub fn stack_count(&self) -> u32 {
        u32::from(self.inputs_count) + u32::from(self.outputs_count) + u32::from(self.local_stack_count)
    }

    /// Absolute stack index of `slot`.
    pub fn slot_index(&self, slot: Slot) -> Result<u16, CompileError> {
        let constants = self.constants.len();
        let base = match slot.region {
            Region::Constant => 0,
            Region::Input => constants,
            Region::Output => constants + usize::from(self.inputs_count),
            Region::Local => {
                constants + usize::from(self.inputs_count) + usize::from(self.outputs_count)
            }
        };
        let index = base + slot.offset as usize;
        u16::try_from(index).map_err(|_| CompileError::StackOverflow { slots: index + 1 })
    }

    /// Lowers symbolic operands to absolute stack indices.
    pub fn resolve(&self) -> Result<Vec<RawInstruction>, CompileError> {
        let total = self.constants.len() + self.stack_count() as usize;
        if total > usize::from(u16::MAX) + 1 {
            return Err(CompileError::StackOverflow { slots: total });
        }
        self.instructions
            .iter()
            .map(|i| {
                let mut args = [0_u16; 3];
                for (out, arg) in args.iter_mut().zip(i.args) {
                    *out = match arg {
                        Operand::Slot(slot) => self.slot_index(slot)?,
                        Operand::Word(w) => w,
                    };
                }
                Ok(RawInstruction::new(i.opcode, args[0], args[1], args[2]))
            })
            .collect()
    }

    /// Encodes the function as a single-def archive named `name`.
    pub fn to_archive(&self, name: &str) -> Result<Vec<u8>, CompileError> {
        let code = self.resolve()?;
        let stack = u16::try_from(self.stack_count()).map_err(|_| CompileError::StackOverflow {
            slots: self.stack_count() as usize,
        })?;
        let mut b = ArchiveBuilder::new();
        let code = b.push_code(&code)?;
        b.push_def(
            DefSpec::local(name, code, self.inputs_count, self.outputs_count, stack)
                .with_flags(self.flags),
        )?;
        b.set_constants(&self.constants);
        Ok(b.build()?)
    }
}

/// Compiles `root` into a function of `inputs_count` inputs with a [`NaiveAllocator`].
pub fn compile_function(
    tree: &Tree,
    root: NodeId,
    inputs_count: u16,
    config: &CompilerConfig,
) -> Result<CompiledFunction, CompileError> {
    compile_function_with(tree, root, inputs_count, config, &mut NaiveAllocator::new())
}

/// Compiles `root` with a caller-provided allocation policy.
pub fn compile_function_with(
    tree: &Tree,
    root: NodeId,
    inputs_count: u16,
    config: &CompilerConfig,
    allocator: &mut dyn Allocator,
) -> Result<CompiledFunction, CompileError> {
    let folded;
    let (tree, root) = if config.fold_constants {
        folded = fold(tree, root)?;
        (&folded.0, folded.1)
    } else {
        (tree, root)
    };
    let outputs = tree
        .size(root)
        .ok_or(TreeError::UnknownNode { node: root })?;
    let outputs_count = u16::try_from(outputs).map_err(|_| CompileError::StackOverflow {
        slots: outputs as usize,
    })?;

    let mut state = CompilerState::new(tree, root, inputs_count, outputs);

    if let Some(Instruction::Constant(v)) = tree.get(root) {
        state.constants.count(*v);
    }
    create(&mut state, root)?;
    state
        .constants
        .finalize(config.constant_reuse_threshold)?;

    prepare(&mut state, root, &mut Vec::new())?;
    let root_id = state.allocation_of(root)?;
    if state.get(root_id).is_free() {
        let output = state.output;
        state.get_mut(root_id).parent = Some((output, 0));
    }

    allocate(&mut state, allocator);
    let local_stack_count =
        u16::try_from(allocator.local_count()).map_err(|_| CompileError::StackOverflow {
            slots: allocator.local_count() as usize,
        })?;

    let mut e = Emitter::default();
    compile(&mut state, &mut e, root, 0)?;
    let src = state.location(root_id)?;
    let dst = state.location(state.output)?;
    e.copy(src, dst, outputs);

    let (instructions, backbranches) = e.finish()?;
    Ok(CompiledFunction {
        instructions,
        constants: state.constants.pool().to_vec(),
        flags: if backbranches {
            DefFlags::HAS_BACKBRANCHES
        } else {
            DefFlags::NONE
        },
        inputs_count,
        outputs_count,
        local_stack_count,
    })
}

// Phase 1

fn create(state: &mut CompilerState<'_>, node: NodeId) -> Result<(), CompileError> {
    if state.has_allocation(node) {
        return Ok(());
    }
    let tree = state.tree;
    let ins = tree
        .get(node)
        .ok_or(TreeError::UnknownNode { node })?;
    let width = tree.size(node).ok_or(TreeError::UnknownNode { node })?;
    state.create_allocation(node, width)?;

    match ins {
        Instruction::Unary(UnaryOp::Not, _) => {
            state.constants.require(-1.0);
            state.constants.require(1.0);
        }
        Instruction::Select { options, .. } => {
            state.create_temp(node, 1)?;
            if options.len() > 1 {
                state.constants.require(0.0);
                state.constants.require(1.0);
                state.constants.require(last_option(options.len())?);
            }
        }
        _ => {}
    }

    for child in ins.children() {
        if let Some(Instruction::Constant(v)) = tree.get(child) {
            state.constants.count(*v);
        }
        create(state, child)?;
    }
    Ok(())
}

fn last_option(count: usize) -> Result<f32, CompileError> {
    let last = u16::try_from(count - 1).map_err(|_| CompileError::StackOverflow { slots: count })?;
    Ok(f32::from(last))
}

// Phase 2

fn prepare(
    state: &mut CompilerState<'_>,
    node: NodeId,
    scopes: &mut Vec<(u32, usize)>,
) -> Result<(), CompileError> {
    let id = state.allocation_of(node)?;
    if !state.touch(id) {
        return Ok(());
    }
    let tree = state.tree;
    let ins = tree
        .get(node)
        .ok_or(TreeError::UnknownNode { node })?;

    match ins {
        Instruction::Constant(v) => {
            if let Some(index) = state.constants.find(*v) {
                state.pin(
                    id,
                    Slot {
                        region: Region::Constant,
                        offset: u32::from(index),
                    },
                );
            }
        }
        Instruction::Input { scope: 0, index } => {
            if *index >= u32::from(state.inputs_count) {
                return Err(CompileError::InputOutOfRange {
                    scope: 0,
                    index: *index,
                });
            }
            state.pin(
                id,
                Slot {
                    region: Region::Input,
                    offset: *index,
                },
            );
        }
        Instruction::Input { scope, index } => {
            let owner = scopes
                .iter()
                .rev()
                .find(|(s, _)| s == scope)
                .map(|(_, owner)| *owner)
                .filter(|owner| *index < state.get(*owner).width);
            let Some(owner) = owner else {
                return Err(CompileError::InputOutOfRange {
                    scope: *scope,
                    index: *index,
                });
            };
            let a = state.get_mut(id);
            a.parent = Some((owner, *index));
            a.pinned = true;
        }
        Instruction::Nullary(_) => {}
        Instruction::Struct(fields) => {
            let mut offset = 0;
            for f in fields {
                prepare(state, *f, scopes)?;
                let fid = state.allocation_of(*f)?;
                if state.get(fid).is_free() {
                    state.get_mut(fid).parent = Some((id, offset));
                }
                offset += state.get(fid).width;
            }
        }
        Instruction::Unary(_, a) => prepare(state, *a, scopes)?,
        Instruction::Binary(_, a, b) => {
            prepare(state, *a, scopes)?;
            prepare(state, *b, scopes)?;
        }
        Instruction::If {
            predicate,
            when_true,
            when_false,
        } => {
            prepare(state, *predicate, scopes)?;
            prepare(state, *when_true, scopes)?;
            prepare(state, *when_false, scopes)?;
        }
        Instruction::For {
            scope,
            initial,
            condition,
            body,
        } => {
            prepare(state, *initial, scopes)?;
            scopes.push((*scope, id));
            let inner = prepare(state, *condition, scopes).and_then(|()| prepare(state, *body, scopes));
            scopes.pop();
            inner?;
        }
        Instruction::Indexer { target, index } => {
            let (leaf, _) = tree.instruction_at(*target, *index);
            prepare(state, leaf, scopes)?;
        }
        Instruction::Select { selector, options } => {
            prepare(state, *selector, scopes)?;
            let temp = state.temp_of(node)?;
            state.touch(temp);
            for o in options {
                prepare(state, *o, scopes)?;
            }
        }
    }
    Ok(())
}

// Phase 3

fn allocate(state: &mut CompilerState<'_>, allocator: &mut dyn Allocator) {
    for a in &mut state.allocations {
        if a.stage != Stage::Prepared {
            continue;
        }
        if a.is_free() {
            a.local = Some(allocator.allocate(&AllocationRequest {
                node: Some(a.node),
                width: a.width,
                first_use: a.first_use,
                last_use: a.last_use,
            }));
        }
        a.stage = Stage::Allocated;
    }
}

// Phase 4

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Label(usize);

#[derive(Default)]
struct Emitter {
    code: Vec<CompiledInstruction>,
    labels: Vec<Option<u32>>,
    fixups: Vec<(usize, Label)>,
}

impl Emitter {
    fn emit(&mut self, opcode: Opcode, a1: Operand, a2: Operand, a3: Operand) {
        self.code.push(CompiledInstruction {
            opcode,
            args: [a1, a2, a3],
        });
    }

    fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    fn place(&mut self, label: Label) {
        let pc = u32::try_from(self.code.len()).unwrap_or(u32::MAX);
        if let Some(slot) = self.labels.get_mut(label.0) {
            *slot = Some(pc);
        }
    }

    fn branch(&mut self, opcode: Opcode, src: Operand, label: Label) {
        self.fixups.push((self.code.len(), label));
        self.emit(opcode, src, Operand::Word(0), Operand::Word(0));
    }

    fn unary(&mut self, opcode: Opcode, src: Slot, dst: Slot) {
        self.emit(opcode, Operand::Slot(src), Operand::Word(0), Operand::Slot(dst));
    }

    fn binary(&mut self, opcode: Opcode, a: Slot, b: Slot, dst: Slot) {
        self.emit(opcode, Operand::Slot(a), Operand::Slot(b), Operand::Slot(dst));
    }

    fn assign_bits(&mut self, value: f32, dst: Slot) {
        let (lo, hi) = split(value.to_bits());
        self.emit(
            Opcode::AssignIbs,
            Operand::Word(lo),
            Operand::Word(hi),
            Operand::Slot(dst),
        );
    }

    fn cmpz(&mut self, src: Slot) {
        self.emit(Opcode::CmpZ, Operand::Slot(src), Operand::Word(0), Operand::Word(0));
    }

    /// `dst = 1` if the flags satisfy `opcode`, else `0`.
    fn assign_flag(&mut self, opcode: Opcode, dst: Slot) {
        self.emit(opcode, Operand::Word(1), Operand::Word(0), Operand::Slot(dst));
    }

    /// Copies `width` values, four at a time where possible.
    fn copy(&mut self, src: Slot, dst: Slot, width: u32) {
        if src == dst {
            return;
        }
        let mut i = 0;
        while i + 4 <= width {
            self.unary(Opcode::AssignVv, src.add(i), dst.add(i));
            i += 4;
        }
        while i < width {
            self.unary(Opcode::AssignSs, src.add(i), dst.add(i));
            i += 1;
        }
    }

    /// Patches branch targets. Also reports whether any branch goes backwards.
    fn finish(mut self) -> Result<(Vec<CompiledInstruction>, bool), CompileError> {
        let mut backbranches = false;
        for (at, label) in &self.fixups {
            let Some(target) = self.labels.get(label.0).copied().flatten() else {
                return Err(CompileError::Build(BuildError::UnresolvedLabel {
                    label: u32::try_from(label.0).unwrap_or(u32::MAX),
                }));
            };
            backbranches |= (target as usize) < *at;
            let (lo, hi) = split(target);
            let i = &mut self.code[*at];
            i.args[1] = Operand::Word(lo);
            i.args[2] = Operand::Word(hi);
        }
        Ok((self.code, backbranches))
    }
}

fn unary_opcode(op: UnaryOp) -> Opcode {
    match op {
        UnaryOp::Abs => Opcode::AbsS,
        UnaryOp::Acos => Opcode::Acos,
        UnaryOp::Asin => Opcode::Asin,
        UnaryOp::Atan => Opcode::Atan,
        UnaryOp::Ceil | UnaryOp::Not => Opcode::CeilS,
        UnaryOp::Cos => Opcode::Cos,
        UnaryOp::Floor => Opcode::FloorS,
        UnaryOp::Ln => Opcode::Ln,
        UnaryOp::Sin => Opcode::Sin,
        UnaryOp::Tan => Opcode::Tan,
    }
}

enum BinaryLowering {
    Arithmetic(Opcode),
    Compare(Opcode),
    Logic { short_circuit: Opcode },
}

fn binary_lowering(op: BinaryOp) -> BinaryLowering {
    use BinaryLowering::{Arithmetic, Compare, Logic};
    match op {
        BinaryOp::Add => Arithmetic(Opcode::AddSs),
        BinaryOp::Atan2 => Arithmetic(Opcode::Atan2),
        BinaryOp::Div => Arithmetic(Opcode::DivSs),
        BinaryOp::Max => Arithmetic(Opcode::MaxSs),
        BinaryOp::Min => Arithmetic(Opcode::MinSs),
        BinaryOp::Mul => Arithmetic(Opcode::MulSs),
        BinaryOp::Pow => Arithmetic(Opcode::PowSs),
        BinaryOp::Rem => Arithmetic(Opcode::ModSs),
        BinaryOp::Sub => Arithmetic(Opcode::SubSs),
        BinaryOp::Log => Arithmetic(Opcode::Log),
        BinaryOp::And => Logic {
            short_circuit: Opcode::BranchZ,
        },
        BinaryOp::Or => Logic {
            short_circuit: Opcode::BranchNz,
        },
        BinaryOp::Eq => Compare(Opcode::AssignCeq),
        BinaryOp::Neq => Compare(Opcode::AssignCne),
        BinaryOp::Lt => Compare(Opcode::AssignClt),
        BinaryOp::Leq => Compare(Opcode::AssignCle),
        BinaryOp::Gt => Compare(Opcode::AssignCgt),
        BinaryOp::Geq => Compare(Opcode::AssignCge),
    }
}

fn constant_slot(state: &CompilerState<'_>, node: NodeId, value: f32) -> Result<Slot, CompileError> {
    let index = state
        .constants
        .find(value)
        .ok_or(CompileError::MissingAllocation { node })?;
    Ok(Slot {
        region: Region::Constant,
        offset: u32::from(index),
    })
}

/// Compiles `node` and returns the slot holding its value.
fn operand(
    state: &mut CompilerState<'_>,
    e: &mut Emitter,
    node: NodeId,
    ctx: usize,
) -> Result<Slot, CompileError> {
    compile(state, e, node, ctx)?;
    let id = state.allocation_of(node)?;
    state.location(id)
}

/// Compiles `node` and copies its value to `dst`.
fn compile_into(
    state: &mut CompilerState<'_>,
    e: &mut Emitter,
    node: NodeId,
    ctx: usize,
    dst: Slot,
    width: u32,
) -> Result<(), CompileError> {
    let found = state
        .tree
        .size(node)
        .ok_or(TreeError::UnknownNode { node })?;
    if found != width {
        return Err(CompileError::WidthMismatch {
            expected: width,
            found,
        });
    }
    let src = operand(state, e, node, ctx)?;
    e.copy(src, dst, width);
    Ok(())
}

fn compile(
    state: &mut CompilerState<'_>,
    e: &mut Emitter,
    node: NodeId,
    ctx: usize,
) -> Result<(), CompileError> {
    let id = state.allocation_of(node)?;
    if state.get(id).stage < Stage::Allocated {
        return Err(CompileError::MissingAllocation { node });
    }
    if state.is_compiled_for(id, ctx) {
        return Ok(());
    }
    let tree = state.tree;
    let ins = tree
        .get(node)
        .ok_or(TreeError::UnknownNode { node })?;
    let width = state.get(id).width;
    let out = state.location(id)?;

    match ins {
        Instruction::Constant(v) => {
            if out.region != Region::Constant {
                e.assign_bits(*v, out);
            }
        }
        Instruction::Input { .. } => {}
        Instruction::Nullary(op) => e.assign_bits(nullary(*op), out),
        Instruction::Struct(fields) => {
            let mut offset = 0;
            for f in fields {
                let w = tree.size(*f).ok_or(TreeError::UnknownNode { node: *f })?;
                compile_into(state, e, *f, ctx, out.add(offset), w)?;
                offset += w;
            }
        }
        Instruction::Unary(UnaryOp::Not, a) => {
            let a = operand(state, e, *a, ctx)?;
            let one = constant_slot(state, node, 1.0)?;
            let minus_one = constant_slot(state, node, -1.0)?;
            e.unary(Opcode::CeilS, a, out);
            e.binary(Opcode::MinSs, out, one, out);
            e.binary(Opcode::MulSs, out, minus_one, out);
            e.binary(Opcode::AddSs, out, one, out);
        }
        Instruction::Unary(op, a) => {
            let a = operand(state, e, *a, ctx)?;
            e.unary(unary_opcode(*op), a, out);
        }
        Instruction::Binary(op, a, b) => {
            let a = operand(state, e, *a, ctx)?;
            let b = operand(state, e, *b, ctx)?;
            match binary_lowering(*op) {
                BinaryLowering::Arithmetic(opcode) => e.binary(opcode, a, b, out),
                BinaryLowering::Compare(opcode) => {
                    e.emit(Opcode::Cmp, Operand::Slot(a), Operand::Slot(b), Operand::Word(0));
                    e.assign_flag(opcode, out);
                }
                BinaryLowering::Logic { short_circuit } => {
                    let done = e.label();
                    e.cmpz(a);
                    e.assign_flag(Opcode::AssignCgt, out);
                    e.branch(short_circuit, Operand::Slot(out), done);
                    e.cmpz(b);
                    e.assign_flag(Opcode::AssignCgt, out);
                    e.place(done);
                }
            }
        }
        Instruction::If {
            predicate,
            when_true,
            when_false,
        } => {
            let p = operand(state, e, *predicate, ctx)?;
            let otherwise = e.label();
            let done = e.label();
            // NaN sets only the unordered flag, so it takes the false branch too.
            e.cmpz(p);
            e.branch(Opcode::BranchCle, Operand::Word(0), otherwise);
            e.branch(Opcode::BranchCun, Operand::Word(0), otherwise);
            let t = state.new_context(ctx);
            compile_into(state, e, *when_true, t, out, width)?;
            e.branch(Opcode::Branch, Operand::Word(0), done);
            e.place(otherwise);
            let f = state.new_context(ctx);
            compile_into(state, e, *when_false, f, out, width)?;
            e.place(done);
        }
        Instruction::For {
            initial,
            condition,
            body,
            ..
        } => {
            compile_into(state, e, *initial, ctx, out, width)?;
            let top = e.label();
            let exit = e.label();
            e.place(top);
            let cond_ctx = state.new_context(ctx);
            let c = operand(state, e, *condition, cond_ctx)?;
            e.cmpz(c);
            e.branch(Opcode::BranchCle, Operand::Word(0), exit);
            e.branch(Opcode::BranchCun, Operand::Word(0), exit);
            let body_ctx = state.new_context(cond_ctx);
            compile_into(state, e, *body, body_ctx, out, width)?;
            e.branch(Opcode::Branch, Operand::Word(0), top);
            e.place(exit);
        }
        Instruction::Indexer { target, index } => {
            let (leaf, offset) = tree.instruction_at(*target, *index);
            let src = operand(state, e, leaf, ctx)?;
            e.copy(src.add(offset), out, 1);
        }
        Instruction::Select { selector, options } => {
            let s = operand(state, e, *selector, ctx)?;
            compile_select(state, e, node, ctx, s, options, out, width)?;
        }
    }

    state.mark_compiled(id, ctx);
    Ok(())
}

#[expect(clippy::too_many_arguments, reason = "lowering state threaded through one call")]
fn compile_select(
    state: &mut CompilerState<'_>,
    e: &mut Emitter,
    node: NodeId,
    ctx: usize,
    selector: Slot,
    options: &[NodeId],
    out: Slot,
    width: u32,
) -> Result<(), CompileError> {
    let Some((last, rest)) = options.split_last() else {
        return Err(CompileError::EmptySelect);
    };
    if rest.is_empty() {
        return compile_into(state, e, *last, ctx, out, width);
    }

    let t = state.location(state.temp_of(node)?)?;
    let zero = constant_slot(state, node, 0.0)?;
    let one = constant_slot(state, node, 1.0)?;
    let top = constant_slot(state, node, last_option(options.len())?)?;

    // t = trunc(min(max(0, selector), n - 1)); a NaN selector becomes 0.
    e.binary(Opcode::MaxSs, zero, selector, t);
    e.binary(Opcode::MinSs, t, top, t);
    e.unary(Opcode::TruncS, t, t);

    let labels: Vec<Label> = rest.iter().map(|_| e.label()).collect();
    for (i, label) in labels.iter().enumerate() {
        e.cmpz(t);
        e.branch(Opcode::BranchCeq, Operand::Word(0), *label);
        if i + 1 < labels.len() {
            e.binary(Opcode::SubSs, t, one, t);
        }
    }

    let done = e.label();
    let c = state.new_context(ctx);
    compile_into(state, e, *last, c, out, width)?;
    e.branch(Opcode::Branch, Operand::Word(0), done);
    for (i, (option, label)) in rest.iter().zip(&labels).enumerate() {
        e.place(*label);
        let c = state.new_context(ctx);
        compile_into(state, e, *option, c, out, width)?;
        if i + 1 < rest.len() {
            e.branch(Opcode::Branch, Operand::Word(0), done);
        }
    }
    e.place(done);
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use lmnt::archive::DefFlags;
    use lmnt::opcode::Opcode;

    use super::{CompileError, CompilerConfig, Operand, compile_function};
    use crate::state::{Region, Slot};
    use crate::tree::{BinaryOp, NullaryOp, Tree, UnaryOp};

    fn no_fold() -> CompilerConfig {
        CompilerConfig {
            fold_constants: false,
            ..CompilerConfig::default()
        }
    }

    fn opcodes(f: &super::CompiledFunction) -> Vec<Opcode> {
        f.instructions.iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn root_is_computed_in_place() {
        let mut t = Tree::new();
        let a = t.input(0).unwrap();
        let b = t.input(1).unwrap();
        let root = t.binary(BinaryOp::Add, a, b).unwrap();
        let f = compile_function(&t, root, 2, &CompilerConfig::default()).unwrap();
        assert_eq!(opcodes(&f), [Opcode::AddSs]);
        assert_eq!(
            f.instructions[0].args[2],
            Operand::Slot(Slot {
                region: Region::Output,
                offset: 0
            })
        );
        assert_eq!(f.local_stack_count, 0);
        assert_eq!(f.flags, DefFlags::NONE);
        let raw = f.resolve().unwrap();
        assert_eq!((raw[0].arg1, raw[0].arg2, raw[0].arg3), (0, 1, 2));
    }

    #[test]
    fn constants_are_pooled_by_reuse() {
        let mut t = Tree::new();
        let x = t.input(0).unwrap();
        let k = t.constant(3.0).unwrap();
        let once = t.constant(7.0).unwrap();
        let a = t.binary(BinaryOp::Mul, x, k).unwrap();
        let b = t.binary(BinaryOp::Sub, a, k).unwrap();
        let root = t.binary(BinaryOp::Add, b, once).unwrap();
        let f = compile_function(&t, root, 1, &no_fold()).unwrap();
        assert_eq!(f.constants, [3.0]);
        assert!(opcodes(&f).contains(&Opcode::AssignIbs));

        let all = CompilerConfig {
            constant_reuse_threshold: 1,
            fold_constants: false,
        };
        let f = compile_function(&t, root, 1, &all).unwrap();
        assert_eq!(f.constants, [3.0, 7.0]);
        assert!(!opcodes(&f).contains(&Opcode::AssignIbs));
    }

    #[test]
    fn not_uses_the_ceil_idiom() {
        let mut t = Tree::new();
        let x = t.input(0).unwrap();
        let root = t.unary(UnaryOp::Not, x).unwrap();
        let f = compile_function(&t, root, 1, &CompilerConfig::default()).unwrap();
        assert_eq!(
            opcodes(&f),
            [Opcode::CeilS, Opcode::MinSs, Opcode::MulSs, Opcode::AddSs]
        );
        assert_eq!(f.constants, [-1.0, 1.0]);
    }

    #[test]
    fn struct_fields_are_written_in_place() {
        let mut t = Tree::new();
        let a = t.input(0).unwrap();
        let b = t.input(1).unwrap();
        let sum = t.binary(BinaryOp::Add, a, b).unwrap();
        let diff = t.binary(BinaryOp::Sub, a, b).unwrap();
        let root = t.structure(&[sum, diff, a]).unwrap();
        let f = compile_function(&t, root, 2, &CompilerConfig::default()).unwrap();
        // The pinned input is the only value that needs a copy.
        assert_eq!(opcodes(&f), [Opcode::AddSs, Opcode::SubSs, Opcode::AssignSs]);
        assert_eq!(f.outputs_count, 3);
        assert_eq!(f.local_stack_count, 0);
    }

    #[test]
    fn shared_nodes_are_emitted_once() {
        let mut t = Tree::new();
        let a = t.input(0).unwrap();
        let sq = t.binary(BinaryOp::Mul, a, a).unwrap();
        let root = t.binary(BinaryOp::Add, sq, sq).unwrap();
        let f = compile_function(&t, root, 1, &CompilerConfig::default()).unwrap();
        assert_eq!(opcodes(&f), [Opcode::MulSs, Opcode::AddSs]);
        assert_eq!(f.local_stack_count, 1);
    }

    #[test]
    fn conditional_code_is_not_reused_outside_its_branch() {
        let mut t = Tree::new();
        let a = t.input(0).unwrap();
        let b = t.input(1).unwrap();
        let sq = t.binary(BinaryOp::Mul, a, a).unwrap();
        let pick = t.if_else(b, sq, a).unwrap();
        let root = t.binary(BinaryOp::Add, pick, sq).unwrap();
        let f = compile_function(&t, root, 2, &CompilerConfig::default()).unwrap();
        let muls = opcodes(&f).iter().filter(|o| **o == Opcode::MulSs).count();
        assert_eq!(muls, 2);
    }

    #[test]
    fn loops_set_the_backbranch_flag() {
        let mut t = Tree::new();
        let n = t.input(0).unwrap();
        let one = t.constant(1.0).unwrap();
        let scope = t.new_scope();
        let i = t.scoped_input(scope, 0).unwrap();
        let cond = t.binary(BinaryOp::Lt, i, n).unwrap();
        let body = t.binary(BinaryOp::Add, i, one).unwrap();
        let zero = t.constant(0.0).unwrap();
        let root = t.for_loop(scope, zero, cond, body).unwrap();
        let f = compile_function(&t, root, 1, &CompilerConfig::default()).unwrap();
        assert_eq!(f.flags, DefFlags::HAS_BACKBRANCHES);
        assert_eq!(f.instructions.last().map(|i| i.opcode), Some(Opcode::Branch));
    }

    #[test]
    fn out_of_scope_inputs_are_rejected() {
        let mut t = Tree::new();
        let x = t.input(3).unwrap();
        assert_eq!(
            compile_function(&t, x, 2, &CompilerConfig::default()),
            Err(CompileError::InputOutOfRange { scope: 0, index: 3 })
        );

        let scope = t.new_scope();
        let state = t.scoped_input(scope, 0).unwrap();
        let y = t.input(0).unwrap();
        let root = t.binary(BinaryOp::Add, state, y).unwrap();
        assert_eq!(
            compile_function(&t, root, 1, &no_fold()),
            Err(CompileError::InputOutOfRange { scope, index: 0 })
        );
    }

    #[test]
    fn select_pools_its_ladder_constants() {
        let mut t = Tree::new();
        let s = t.input(0).unwrap();
        let a = t.nullary(NullaryOp::True).unwrap();
        let b = t.input(1).unwrap();
        let c = t.input(2).unwrap();
        let root = t.select(s, &[a, b, c]).unwrap();
        let f = compile_function(&t, root, 3, &CompilerConfig::default()).unwrap();
        assert_eq!(f.constants, [0.0, 1.0, 2.0]);
        let ops = opcodes(&f);
        assert_eq!(&ops[..3], [Opcode::MaxSs, Opcode::MinSs, Opcode::TruncS]);
        assert_eq!(ops.iter().filter(|o| **o == Opcode::BranchCeq).count(), 2);
    }

    #[test]
    fn oversized_outputs_overflow() {
        let mut t = Tree::new();
        let x = t.input(0).unwrap();
        let mut wide = t.structure(&[x; 256]).unwrap();
        for _ in 0..8 {
            wide = t.structure(&[wide, wide]).unwrap();
        }
        assert!(matches!(
            compile_function(&t, wide, 1, &CompilerConfig::default()),
            Err(CompileError::StackOverflow { .. })
        ));
    }
}
