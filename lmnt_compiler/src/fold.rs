// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constant folding.
//!
//! [`fold`] rebuilds a tree with the evaluator's semantics applied wherever operands are known:
//! - nullary, unary and binary nodes with constant operands become constants;
//! - arithmetic with a constant NaN operand becomes that NaN;
//! - `x + -0.0`, `-0.0 + x`, `x - 0.0`, `x * 1`, `1 * x` and `x / 1` become `x`;
//! - conditionals and selects with a constant predicate or selector become the chosen operand;
//! - indexers that resolve to a scalar node become that node.
//!
//! Zeros are matched by bit pattern: `x + 0.0` and `x - -0.0` map `-0.0` to `0.0`, so they stay.
//! `x * 0` is left alone because NaN and infinities do not multiply to zero.

use alloc::vec::Vec;

use crate::evaluator::{binary, nullary, select_index, truthy, unary};
use crate::tree::{BinaryOp, Instruction, NodeId, Tree, TreeError};

/// Folds every node up to and including `root` into a new tree.
///
/// Returns the new tree and the id of `root` in it.
pub fn fold(tree: &Tree, root: NodeId) -> Result<(Tree, NodeId), TreeError> {
    tree.get(root).ok_or(TreeError::UnknownNode { node: root })?;

    let mut out = Tree::new();
    for _ in 0..tree.scope_count() {
        out.new_scope();
    }

    // Children always precede their parents, so one pass in index order sees them first.
    let mut map: Vec<NodeId> = Vec::with_capacity(root.index() as usize + 1);
    for index in 0..=root.index() {
        let id = NodeId::from_index(index);
        let old = tree.get(id).ok_or(TreeError::UnknownNode { node: id })?;
        let id = fold_one(&mut out, &map, old)?;
        map.push(id);
    }
    let new_root = *map.last().ok_or(TreeError::UnknownNode { node: root })?;
    Ok((out, new_root))
}

fn constant_of(tree: &Tree, id: NodeId) -> Option<f32> {
    match tree.get(id) {
        Some(Instruction::Constant(v)) => Some(*v),
        _ => None,
    }
}

fn fold_one(out: &mut Tree, map: &[NodeId], old: &Instruction) -> Result<NodeId, TreeError> {
    let m = |id: NodeId| {
        map.get(id.index() as usize)
            .copied()
            .ok_or(TreeError::UnknownNode { node: id })
    };
    match old {
        Instruction::Constant(_) | Instruction::Input { .. } => out.push(old.clone()),
        Instruction::Nullary(op) => out.constant(nullary(*op)),
        Instruction::Struct(fields) => {
            let fields = fields.iter().map(|f| m(*f)).collect::<Result<Vec<_>, _>>()?;
            out.push(Instruction::Struct(fields))
        }
        Instruction::Unary(op, a) => {
            let a = m(*a)?;
            match constant_of(out, a) {
                Some(v) => out.constant(unary(*op, v)),
                None => out.unary(*op, a),
            }
        }
        Instruction::Binary(op, a, b) => {
            let (a, b) = (m(*a)?, m(*b)?);
            match (constant_of(out, a), constant_of(out, b)) {
                (Some(x), Some(y)) => out.constant(binary(*op, x, y)),
                (x, y) => match simplify(*op, a, x, b, y) {
                    Some(id) => Ok(id),
                    None => out.binary(*op, a, b),
                },
            }
        }
        Instruction::If {
            predicate,
            when_true,
            when_false,
        } => {
            let (p, t, f) = (m(*predicate)?, m(*when_true)?, m(*when_false)?);
            match constant_of(out, p) {
                Some(v) => Ok(if truthy(v) { t } else { f }),
                None => out.if_else(p, t, f),
            }
        }
        Instruction::For {
            scope,
            initial,
            condition,
            body,
        } => {
            let (i, c, b) = (m(*initial)?, m(*condition)?, m(*body)?);
            out.for_loop(*scope, i, c, b)
        }
        Instruction::Indexer { target, index } => {
            let target = m(*target)?;
            let (leaf, offset) = out.instruction_at(target, *index);
            if offset == 0 && out.size(leaf) == Some(1) {
                Ok(leaf)
            } else {
                out.indexer(leaf, offset)
            }
        }
        Instruction::Select { selector, options } => {
            let selector = m(*selector)?;
            let options = options.iter().map(|o| m(*o)).collect::<Result<Vec<_>, _>>()?;
            match constant_of(out, selector) {
                Some(v) => options
                    .get(select_index(v, options.len()))
                    .copied()
                    .ok_or(TreeError::EmptySelect),
                None => out.select(selector, &options),
            }
        }
    }
}

fn simplify(op: BinaryOp, a: NodeId, x: Option<f32>, b: NodeId, y: Option<f32>) -> Option<NodeId> {
    if op.propagates_nan() {
        if x.is_some_and(f32::is_nan) {
            return Some(a);
        }
        if y.is_some_and(f32::is_nan) {
            return Some(b);
        }
    }
    let neg_zero = (-0.0_f32).to_bits();
    match (op, x, y) {
        (BinaryOp::Add, Some(v), _) if v.to_bits() == neg_zero => Some(b),
        (BinaryOp::Add, _, Some(v)) if v.to_bits() == neg_zero => Some(a),
        (BinaryOp::Sub, _, Some(v)) if v.to_bits() == 0 => Some(a),
        (BinaryOp::Mul, Some(v), _) if v == 1.0 => Some(b),
        (BinaryOp::Mul | BinaryOp::Div, _, Some(v)) if v == 1.0 => Some(a),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::fold;
    use crate::evaluator::evaluate;
    use crate::tree::{BinaryOp, Instruction, NullaryOp, Tree, UnaryOp};

    #[test]
    fn constant_subtrees_collapse() {
        let mut t = Tree::new();
        let two = t.constant(2.0).unwrap();
        let three = t.constant(3.0).unwrap();
        let p = t.binary(BinaryOp::Pow, two, three).unwrap();
        let n = t.unary(UnaryOp::Not, p).unwrap();
        let x = t.input(0).unwrap();
        let root = t.binary(BinaryOp::Add, p, x).unwrap();

        let (f, r) = fold(&t, root).unwrap();
        let Some(Instruction::Binary(BinaryOp::Add, a, b)) = f.get(r) else {
            panic!("expected add, got {:?}", f.get(r));
        };
        assert_eq!(f.get(*a), Some(&Instruction::Constant(8.0)));
        assert_eq!(f.get(*b), Some(&Instruction::Input { scope: 0, index: 0 }));

        let (f, r) = fold(&t, n).unwrap();
        assert_eq!(f.get(r), Some(&Instruction::Constant(0.0)));
    }

    #[test]
    fn identities_return_the_other_operand() {
        let mut t = Tree::new();
        let x = t.input(0).unwrap();
        let zero = t.constant(0.0).unwrap();
        let neg_zero = t.constant(-0.0).unwrap();
        let one = t.constant(1.0).unwrap();
        let nan = t.nullary(NullaryOp::Nan).unwrap();
        let cases = [
            t.binary(BinaryOp::Add, neg_zero, x).unwrap(),
            t.binary(BinaryOp::Add, x, neg_zero).unwrap(),
            t.binary(BinaryOp::Sub, x, zero).unwrap(),
            t.binary(BinaryOp::Mul, one, x).unwrap(),
            t.binary(BinaryOp::Mul, x, one).unwrap(),
            t.binary(BinaryOp::Div, x, one).unwrap(),
        ];
        for c in cases {
            let (f, r) = fold(&t, c).unwrap();
            assert_eq!(f.get(r), Some(&Instruction::Input { scope: 0, index: 0 }));
        }

        let add_nan = t.binary(BinaryOp::Add, x, nan).unwrap();
        let (f, r) = fold(&t, add_nan).unwrap();
        assert!(matches!(f.get(r), Some(Instruction::Constant(v)) if v.is_nan()));

        // `max(x, NaN)` is `x`, not NaN, so it is kept.
        let max_nan = t.binary(BinaryOp::Max, x, nan).unwrap();
        let (f, r) = fold(&t, max_nan).unwrap();
        assert!(matches!(f.get(r), Some(Instruction::Binary(BinaryOp::Max, ..))));

        // These turn `-0.0` into `0.0`.
        let kept = [
            t.binary(BinaryOp::Add, zero, x).unwrap(),
            t.binary(BinaryOp::Add, x, zero).unwrap(),
            t.binary(BinaryOp::Sub, x, neg_zero).unwrap(),
        ];
        for c in kept {
            let (f, r) = fold(&t, c).unwrap();
            assert!(matches!(f.get(r), Some(Instruction::Binary(..))), "{:?}", t.get(c));
            let back = evaluate(&f, r, &[-0.0]).unwrap();
            assert_eq!(back[0].to_bits(), 0.0_f32.to_bits());
        }

        let mul_zero = t.binary(BinaryOp::Mul, x, zero).unwrap();
        let (f, r) = fold(&t, mul_zero).unwrap();
        assert!(matches!(f.get(r), Some(Instruction::Binary(BinaryOp::Mul, ..))));
    }

    #[test]
    fn known_predicates_and_selectors_pick_a_branch() {
        let mut t = Tree::new();
        let x = t.input(0).unwrap();
        let y = t.input(1).unwrap();
        let yes = t.nullary(NullaryOp::True).unwrap();
        let pick = t.if_else(yes, x, y).unwrap();
        let (f, r) = fold(&t, pick).unwrap();
        assert_eq!(f.get(r), Some(&Instruction::Input { scope: 0, index: 0 }));

        let seven = t.constant(7.0).unwrap();
        let sel = t.select(seven, &[x, y]).unwrap();
        let (f, r) = fold(&t, sel).unwrap();
        assert_eq!(f.get(r), Some(&Instruction::Input { scope: 0, index: 1 }));
    }

    #[test]
    fn folding_preserves_values() {
        let mut t = Tree::new();
        let x = t.input(0).unwrap();
        let c = t.constant(4.0).unwrap();
        let half = t.constant(0.5).unwrap();
        let k = t.binary(BinaryOp::Mul, c, half).unwrap();
        let s = t.structure(&[k, x]).unwrap();
        let ix = t.indexer(s, 1).unwrap();
        let scope = t.new_scope();
        let i = t.scoped_input(scope, 0).unwrap();
        let cond = t.binary(BinaryOp::Lt, i, x).unwrap();
        let body = t.binary(BinaryOp::Add, i, k).unwrap();
        let l = t.for_loop(scope, k, cond, body).unwrap();
        let root = t.structure(&[l, ix]).unwrap();

        let (f, r) = fold(&t, root).unwrap();
        for input in [-1.0, 3.0, 10.5] {
            assert_eq!(evaluate(&f, r, &[input]), evaluate(&t, root, &[input]));
        }
    }
}
