// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instruction trees.
//!
//! A [`Tree`] is an append-only arena of [`Instruction`] nodes. Children must exist before the
//! node that uses them, so every tree is acyclic by construction. Reusing a [`NodeId`] in several
//! places shares the node; the compiler emits a shared node once where control flow allows it.
//!
//! Every node has a width (its number of scalar values), checked when the node is pushed.

use alloc::vec::Vec;
use core::fmt;

/// Identifies a node inside one [`Tree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of the node.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Operations without operands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NullaryOp {
    /// `+inf`
    PositiveInfinity,
    /// `-inf`
    NegativeInfinity,
    /// A quiet NaN.
    Nan,
    /// Boolean true (`1`).
    True,
    /// Boolean false (`0`).
    False,
}

/// Operations with one scalar operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Absolute value.
    Abs,
    /// Arccosine.
    Acos,
    /// Arcsine.
    Asin,
    /// Arctangent.
    Atan,
    /// Round towards `+inf`.
    Ceil,
    /// Cosine.
    Cos,
    /// Round towards `-inf`.
    Floor,
    /// Natural logarithm.
    Ln,
    /// Sine.
    Sin,
    /// Tangent.
    Tan,
    /// Boolean negation: the result is truthy (`> 0`) exactly when the operand is not.
    Not,
}

/// Operations with two scalar operands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// Two-argument arctangent of `a / b`.
    Atan2,
    /// `a / b`
    Div,
    /// The larger operand; a NaN `b` yields `a`.
    Max,
    /// The smaller operand; a NaN `b` yields `a`.
    Min,
    /// `a * b`
    Mul,
    /// `a` raised to `b`.
    Pow,
    /// Truncated remainder.
    Rem,
    /// `a - b`
    Sub,
    /// Logarithm of `a` in base `b`.
    Log,
    /// `1` when both operands are truthy, else `0`.
    And,
    /// `1` when either operand is truthy, else `0`.
    Or,
    /// `a == b`
    Eq,
    /// `a != b`
    Neq,
    /// `a < b`
    Lt,
    /// `a <= b`
    Leq,
    /// `a > b`
    Gt,
    /// `a >= b`
    Geq,
}

impl BinaryOp {
    /// Returns `true` for arithmetic ops whose result is NaN whenever an operand is NaN.
    #[must_use]
    pub const fn propagates_nan(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Atan2 | Self::Div | Self::Mul | Self::Rem | Self::Sub | Self::Log
        )
    }
}

/// One node of a [`Tree`].
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// A literal value.
    Constant(f32),
    /// Value `index` of input scope `scope`.
    ///
    /// Scope `0` holds the function inputs; any other scope is the state of the enclosing
    /// [`Instruction::For`] that declares it.
    Input {
        /// Input scope.
        scope: u32,
        /// Index within the scope.
        index: u32,
    },
    /// Fields laid out one after another.
    Struct(Vec<NodeId>),
    /// A nullary op.
    Nullary(NullaryOp),
    /// A unary op.
    Unary(UnaryOp, NodeId),
    /// A binary op.
    Binary(BinaryOp, NodeId, NodeId),
    /// `when_true` if `predicate > 0`, else `when_false`.
    If {
        /// Scalar predicate.
        predicate: NodeId,
        /// Value when the predicate is truthy.
        when_true: NodeId,
        /// Value otherwise.
        when_false: NodeId,
    },
    /// Starts from `initial` and replaces the state with `body` while `condition` is truthy.
    For {
        /// The input scope this loop's state is visible as.
        scope: u32,
        /// Initial state.
        initial: NodeId,
        /// Scalar loop condition.
        condition: NodeId,
        /// Next state.
        body: NodeId,
    },
    /// Scalar `index` of `target`.
    Indexer {
        /// Indexed node.
        target: NodeId,
        /// Scalar offset within `target`.
        index: u32,
    },
    /// Option `clamp(trunc(selector), 0, n - 1)`; a NaN selector picks option `0`.
    Select {
        /// Scalar selector.
        selector: NodeId,
        /// Options, all of the same width.
        options: Vec<NodeId>,
    },
}

impl Instruction {
    /// Returns the operands of this node in evaluation order.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Constant(_) | Self::Input { .. } | Self::Nullary(_) => Vec::new(),
            Self::Struct(fields) => fields.clone(),
            Self::Unary(_, a) => alloc::vec![*a],
            Self::Binary(_, a, b) => alloc::vec![*a, *b],
            Self::If {
                predicate,
                when_true,
                when_false,
            } => alloc::vec![*predicate, *when_true, *when_false],
            Self::For {
                initial,
                condition,
                body,
                ..
            } => alloc::vec![*initial, *condition, *body],
            Self::Indexer { target, .. } => alloc::vec![*target],
            Self::Select { selector, options } => {
                let mut v = Vec::with_capacity(options.len() + 1);
                v.push(*selector);
                v.extend_from_slice(options);
                v
            }
        }
    }
}

/// Errors produced while adding a node to a [`Tree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TreeError {
    /// A referenced node does not exist (yet).
    UnknownNode {
        /// The missing node.
        node: NodeId,
    },
    /// Two values that must have the same width do not.
    WidthMismatch {
        /// Required width.
        expected: u32,
        /// Actual width.
        found: u32,
    },
    /// An indexer reaches past the end of its target.
    InvalidIndex {
        /// Requested index.
        index: u32,
        /// Width of the target.
        width: u32,
    },
    /// A select has no options.
    EmptySelect,
    /// A loop scope was never created with [`Tree::new_scope`] or is already declared.
    InvalidScope {
        /// The scope.
        scope: u32,
    },
    /// The tree holds more nodes than a [`NodeId`] can address.
    TooManyNodes,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node } => write!(f, "unknown node {node}"),
            Self::WidthMismatch { expected, found } => {
                write!(f, "width mismatch: expected {expected}, found {found}")
            }
            Self::InvalidIndex { index, width } => {
                write!(f, "index {index} out of range for width {width}")
            }
            Self::EmptySelect => write!(f, "select without options"),
            Self::InvalidScope { scope } => write!(f, "invalid loop scope {scope}"),
            Self::TooManyNodes => write!(f, "too many nodes"),
        }
    }
}

impl core::error::Error for TreeError {}

#[derive(Clone, Debug)]
struct Node {
    instruction: Instruction,
    size: u32,
}

/// An arena of instruction nodes.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    // One entry per scope handed out by `new_scope`: the loop that declares it, once pushed.
    scopes: Vec<Option<NodeId>>,
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node `id`.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Instruction> {
        self.nodes.get(id.0 as usize).map(|n| &n.instruction)
    }

    /// Returns the width of node `id`.
    #[must_use]
    pub fn size(&self, id: NodeId) -> Option<u32> {
        self.nodes.get(id.0 as usize).map(|n| n.size)
    }

    /// Reserves a fresh loop scope for a [`Instruction::For`].
    ///
    /// Build the loop's condition and body with [`Tree::scoped_input`] on this scope first, then
    /// push the loop itself.
    pub fn new_scope(&mut self) -> u32 {
        self.scopes.push(None);
        u32::try_from(self.scopes.len()).unwrap_or(u32::MAX)
    }

    /// Number of scopes handed out by [`Tree::new_scope`].
    #[must_use]
    pub fn scope_count(&self) -> u32 {
        u32::try_from(self.scopes.len()).unwrap_or(u32::MAX)
    }

    /// Returns the loop that declares `scope`, if it has been pushed.
    #[must_use]
    pub fn scope_owner(&self, scope: u32) -> Option<NodeId> {
        let i = usize::try_from(scope.checked_sub(1)?).ok()?;
        self.scopes.get(i).copied().flatten()
    }

    /// Appends `instruction` after checking its operands.
    pub fn push(&mut self, instruction: Instruction) -> Result<NodeId, TreeError> {
        let id = NodeId(u32::try_from(self.nodes.len()).map_err(|_| TreeError::TooManyNodes)?);
        let size = self.check(&instruction)?;
        if let Instruction::For { scope, .. } = &instruction {
            let scope = *scope;
            let slot = scope
                .checked_sub(1)
                .and_then(|i| self.scopes.get_mut(i as usize))
                .filter(|s| s.is_none())
                .ok_or(TreeError::InvalidScope { scope })?;
            *slot = Some(id);
        }
        self.nodes.push(Node { instruction, size });
        Ok(id)
    }

    fn width(&self, id: NodeId) -> Result<u32, TreeError> {
        self.size(id).ok_or(TreeError::UnknownNode { node: id })
    }

    fn scalar(&self, id: NodeId) -> Result<(), TreeError> {
        match self.width(id)? {
            1 => Ok(()),
            found => Err(TreeError::WidthMismatch { expected: 1, found }),
        }
    }

    fn check(&self, instruction: &Instruction) -> Result<u32, TreeError> {
        match instruction {
            Instruction::Constant(_) | Instruction::Input { .. } | Instruction::Nullary(_) => Ok(1),
            Instruction::Struct(fields) => {
                let mut total = 0_u32;
                for f in fields {
                    total = total
                        .checked_add(self.width(*f)?)
                        .ok_or(TreeError::TooManyNodes)?;
                }
                Ok(total)
            }
            Instruction::Unary(_, a) => {
                self.scalar(*a)?;
                Ok(1)
            }
            Instruction::Binary(_, a, b) => {
                self.scalar(*a)?;
                self.scalar(*b)?;
                Ok(1)
            }
            Instruction::If {
                predicate,
                when_true,
                when_false,
            } => {
                self.scalar(*predicate)?;
                same_width(self.width(*when_true)?, self.width(*when_false)?)
            }
            Instruction::For {
                initial,
                condition,
                body,
                ..
            } => {
                self.scalar(*condition)?;
                same_width(self.width(*initial)?, self.width(*body)?)
            }
            Instruction::Indexer { target, index } => {
                let width = self.width(*target)?;
                if *index >= width {
                    return Err(TreeError::InvalidIndex {
                        index: *index,
                        width,
                    });
                }
                Ok(1)
            }
            Instruction::Select { selector, options } => {
                self.scalar(*selector)?;
                let (first, rest) = options.split_first().ok_or(TreeError::EmptySelect)?;
                let width = self.width(*first)?;
                for o in rest {
                    same_width(width, self.width(*o)?)?;
                }
                Ok(width)
            }
        }
    }

    /// A literal.
    pub fn constant(&mut self, value: f32) -> Result<NodeId, TreeError> {
        self.push(Instruction::Constant(value))
    }

    /// Function input `index`.
    pub fn input(&mut self, index: u32) -> Result<NodeId, TreeError> {
        self.push(Instruction::Input { scope: 0, index })
    }

    /// Value `index` of loop scope `scope`.
    pub fn scoped_input(&mut self, scope: u32, index: u32) -> Result<NodeId, TreeError> {
        self.push(Instruction::Input { scope, index })
    }

    /// A struct of `fields`.
    pub fn structure(&mut self, fields: &[NodeId]) -> Result<NodeId, TreeError> {
        self.push(Instruction::Struct(fields.to_vec()))
    }

    /// A nullary op.
    pub fn nullary(&mut self, op: NullaryOp) -> Result<NodeId, TreeError> {
        self.push(Instruction::Nullary(op))
    }

    /// A unary op.
    pub fn unary(&mut self, op: UnaryOp, a: NodeId) -> Result<NodeId, TreeError> {
        self.push(Instruction::Unary(op, a))
    }

    /// A binary op.
    pub fn binary(&mut self, op: BinaryOp, a: NodeId, b: NodeId) -> Result<NodeId, TreeError> {
        self.push(Instruction::Binary(op, a, b))
    }

    /// A conditional.
    pub fn if_else(
        &mut self,
        predicate: NodeId,
        when_true: NodeId,
        when_false: NodeId,
    ) -> Result<NodeId, TreeError> {
        self.push(Instruction::If {
            predicate,
            when_true,
            when_false,
        })
    }

    /// A loop over state visible as `scope`.
    pub fn for_loop(
        &mut self,
        scope: u32,
        initial: NodeId,
        condition: NodeId,
        body: NodeId,
    ) -> Result<NodeId, TreeError> {
        self.push(Instruction::For {
            scope,
            initial,
            condition,
            body,
        })
    }

    /// Scalar `index` of `target`.
    pub fn indexer(&mut self, target: NodeId, index: u32) -> Result<NodeId, TreeError> {
        self.push(Instruction::Indexer { target, index })
    }

    /// A multi-way select.
    pub fn select(&mut self, selector: NodeId, options: &[NodeId]) -> Result<NodeId, TreeError> {
        self.push(Instruction::Select {
            selector,
            options: options.to_vec(),
        })
    }

    /// Resolves scalar `index` of `node` to the node that produces it.
    ///
    /// Struct fields and indexers are looked through; loops, conditionals and selects are opaque.
    /// Returns the producing node and the offset within it.
    #[must_use]
    pub fn instruction_at(&self, node: NodeId, index: u32) -> (NodeId, u32) {
        let mut node = node;
        let mut index = index;
        loop {
            match self.get(node) {
                Some(Instruction::Struct(fields)) => {
                    let mut offset = index;
                    let mut next = None;
                    for f in fields {
                        let w = self.size(*f).unwrap_or(0);
                        if offset < w {
                            next = Some(*f);
                            break;
                        }
                        offset -= w;
                    }
                    match next {
                        Some(f) => {
                            node = f;
                            index = offset;
                        }
                        None => return (node, index),
                    }
                }
                Some(Instruction::Indexer { target, index: i }) => {
                    index += *i;
                    node = *target;
                }
                _ => return (node, index),
            }
        }
    }
}

fn same_width(expected: u32, found: u32) -> Result<u32, TreeError> {
    if expected == found {
        Ok(expected)
    } else {
        Err(TreeError::WidthMismatch { expected, found })
    }
}
