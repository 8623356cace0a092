// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference evaluator.
//!
//! [`evaluate`] interprets a [`Tree`] directly. Its scalar semantics match the `lmnt` opcodes the
//! compiler lowers each node to, so a compiled function and the evaluator agree bit for bit
//! (NaN payloads aside). Conditionals, loops and selects only evaluate the branch they take.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::tree::{BinaryOp, Instruction, NodeId, NullaryOp, Tree, TreeError, UnaryOp};

/// Errors produced by [`evaluate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EvalError {
    /// The tree does not contain a referenced node.
    Tree(TreeError),
    /// An input is outside the inputs (or loop state) in scope.
    InputOutOfRange {
        /// Input scope.
        scope: u32,
        /// Index within the scope.
        index: u32,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(e) => write!(f, "invalid tree: {e}"),
            Self::InputOutOfRange { scope, index } => {
                write!(f, "input {index} of scope {scope} is out of range")
            }
        }
    }
}

impl core::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Tree(e) => Some(e),
            Self::InputOutOfRange { .. } => None,
        }
    }
}

impl From<TreeError> for EvalError {
    fn from(e: TreeError) -> Self {
        Self::Tree(e)
    }
}

/// Evaluates `root` with the function inputs `inputs`.
pub fn evaluate(tree: &Tree, root: NodeId, inputs: &[f32]) -> Result<Vec<f32>, EvalError> {
    let mut e = Evaluator {
        tree,
        inputs,
        scopes: Vec::new(),
        frames: alloc::vec![HashMap::new()],
    };
    let mut out = Vec::with_capacity(tree.size(root).unwrap_or(0) as usize);
    e.eval(root, &mut out)?;
    Ok(out)
}

/// Truthiness of a value: strictly greater than zero. NaN is false.
#[must_use]
pub(crate) fn truthy(v: f32) -> bool {
    v > 0.0
}

// Same operand order semantics as the `minss` / `maxss` opcodes.
pub(crate) fn min(a: f32, b: f32) -> f32 {
    if b < a { b } else { a }
}

pub(crate) fn max(a: f32, b: f32) -> f32 {
    if a < b { b } else { a }
}

fn bool_value(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

pub(crate) fn nullary(op: NullaryOp) -> f32 {
    match op {
        NullaryOp::PositiveInfinity => f32::INFINITY,
        NullaryOp::NegativeInfinity => f32::NEG_INFINITY,
        NullaryOp::Nan => f32::NAN,
        NullaryOp::True => 1.0,
        NullaryOp::False => 0.0,
    }
}

pub(crate) fn unary(op: UnaryOp, a: f32) -> f32 {
    match op {
        UnaryOp::Abs => libm::fabsf(a),
        UnaryOp::Acos => libm::acosf(a),
        UnaryOp::Asin => libm::asinf(a),
        UnaryOp::Atan => libm::atanf(a),
        UnaryOp::Ceil => libm::ceilf(a),
        UnaryOp::Cos => libm::cosf(a),
        UnaryOp::Floor => libm::floorf(a),
        UnaryOp::Ln => libm::logf(a),
        UnaryOp::Sin => libm::sinf(a),
        UnaryOp::Tan => libm::tanf(a),
        // ceil, min 1, negate, add 1: positive inputs map to <= 0, the rest to >= 1.
        UnaryOp::Not => min(libm::ceilf(a), 1.0) * -1.0 + 1.0,
    }
}

pub(crate) fn binary(op: BinaryOp, a: f32, b: f32) -> f32 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Atan2 => libm::atan2f(a, b),
        BinaryOp::Div => a / b,
        BinaryOp::Max => max(a, b),
        BinaryOp::Min => min(a, b),
        BinaryOp::Mul => a * b,
        BinaryOp::Pow => libm::powf(a, b),
        BinaryOp::Rem => libm::fmodf(a, b),
        BinaryOp::Sub => a - b,
        BinaryOp::Log => {
            if b != 0.0 {
                libm::logf(a) / libm::logf(b)
            } else {
                f32::NAN
            }
        }
        BinaryOp::And => bool_value(truthy(a) && truthy(b)),
        BinaryOp::Or => bool_value(truthy(a) || truthy(b)),
        BinaryOp::Eq => bool_value(a == b),
        BinaryOp::Neq => bool_value(a != b),
        BinaryOp::Lt => bool_value(a < b),
        BinaryOp::Leq => bool_value(a <= b),
        BinaryOp::Gt => bool_value(a > b),
        BinaryOp::Geq => bool_value(a >= b),
    }
}

/// Option picked by `selector` among `count` options.
pub(crate) fn select_index(selector: f32, count: usize) -> usize {
    let last = count.saturating_sub(1);
    // NaN fails both comparisons in `max` and becomes 0.
    let clamped = libm::truncf(min(max(0.0, selector), last as f32));
    (clamped as usize).min(last)
}

struct Evaluator<'a> {
    tree: &'a Tree,
    inputs: &'a [f32],
    // Innermost loop last.
    scopes: Vec<(u32, Vec<f32>)>,
    // One memo per loop iteration; values in outer frames never depend on inner loop state.
    frames: Vec<HashMap<NodeId, Vec<f32>>>,
}

impl Evaluator<'_> {
    fn node(&self, id: NodeId) -> Result<&Instruction, EvalError> {
        self.tree
            .get(id)
            .ok_or(EvalError::Tree(TreeError::UnknownNode { node: id }))
    }

    fn scalar(&mut self, id: NodeId) -> Result<f32, EvalError> {
        let mut v = Vec::with_capacity(1);
        self.eval(id, &mut v)?;
        Ok(v.first().copied().unwrap_or(f32::NAN))
    }

    fn input(&self, scope: u32, index: u32) -> Result<f32, EvalError> {
        let values = if scope == 0 {
            Some(self.inputs)
        } else {
            self.scopes
                .iter()
                .rev()
                .find(|(s, _)| *s == scope)
                .map(|(_, v)| v.as_slice())
        };
        values
            .and_then(|v| v.get(index as usize))
            .copied()
            .ok_or(EvalError::InputOutOfRange { scope, index })
    }

    fn eval(&mut self, id: NodeId, out: &mut Vec<f32>) -> Result<(), EvalError> {
        if let Some(v) = self.frames.iter().rev().find_map(|f| f.get(&id)) {
            out.extend_from_slice(v);
            return Ok(());
        }
        let start = out.len();
        match self.node(id)?.clone() {
            Instruction::Constant(v) => out.push(v),
            Instruction::Input { scope, index } => out.push(self.input(scope, index)?),
            Instruction::Struct(fields) => {
                for f in fields {
                    self.eval(f, out)?;
                }
            }
            Instruction::Nullary(op) => out.push(nullary(op)),
            Instruction::Unary(op, a) => {
                let a = self.scalar(a)?;
                out.push(unary(op, a));
            }
            Instruction::Binary(op, a, b) => {
                let a = self.scalar(a)?;
                let b = self.scalar(b)?;
                out.push(binary(op, a, b));
            }
            Instruction::If {
                predicate,
                when_true,
                when_false,
            } => {
                let p = self.scalar(predicate)?;
                self.eval(if truthy(p) { when_true } else { when_false }, out)?;
            }
            Instruction::For {
                scope,
                initial,
                condition,
                body,
            } => {
                let mut state = Vec::new();
                self.eval(initial, &mut state)?;
                self.scopes.push((scope, state));
                let result = self.run_loop(condition, body);
                let (_, state) = self.scopes.pop().unwrap_or_default();
                result?;
                out.extend_from_slice(&state);
            }
            Instruction::Indexer { target, index } => {
                let mut v = Vec::new();
                self.eval(target, &mut v)?;
                out.push(v.get(index as usize).copied().unwrap_or(f32::NAN));
            }
            Instruction::Select { selector, options } => {
                let s = self.scalar(selector)?;
                let Some(&chosen) = options.get(select_index(s, options.len())) else {
                    return Err(EvalError::Tree(TreeError::EmptySelect));
                };
                self.eval(chosen, out)?;
            }
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(id, out[start..].to_vec());
        }
        Ok(())
    }

    fn run_loop(&mut self, condition: NodeId, body: NodeId) -> Result<(), EvalError> {
        loop {
            self.frames.push(HashMap::new());
            let step = self.iterate(condition, body);
            self.frames.pop();
            match step? {
                Some(next) => {
                    if let Some((_, state)) = self.scopes.last_mut() {
                        *state = next;
                    }
                }
                None => return Ok(()),
            }
        }
    }

    fn iterate(&mut self, condition: NodeId, body: NodeId) -> Result<Option<Vec<f32>>, EvalError> {
        if !truthy(self.scalar(condition)?) {
            return Ok(None);
        }
        let mut next = Vec::new();
        self.eval(body, &mut next)?;
        Ok(Some(next))
    }
}
