// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(missing_docs, reason = "integration test crate")]

use lmnt::archive::{DefFlags, DefRef};
use lmnt::asm::Asm;
use lmnt::builder::{ArchiveBuilder, DefSpec};
use lmnt::context::{Context, ContextConfig, Outcome};
use lmnt::dispatch::DispatchStrategy;
use lmnt::error::Error;
use lmnt::extcall::{ExtcallContext, ExtcallInfo};
use lmnt::opcode::Opcode;
use lmnt::validation::ValidationError;
use lmnt_compiler::{BinaryOp, CompilerConfig, NodeId, Tree, UnaryOp, compile_function, evaluate};

const STRATEGIES: [DispatchStrategy; 3] = [
    DispatchStrategy::Switch,
    DispatchStrategy::Table,
    DispatchStrategy::Threaded,
];

fn config(dispatch: DispatchStrategy) -> ContextConfig {
    ContextConfig {
        dispatch,
        ..ContextConfig::default()
    }
}

/// Loads `bytes` and runs `name` once to completion.
fn run(
    bytes: &[u8],
    name: &str,
    dispatch: DispatchStrategy,
    extcalls: &'static [ExtcallInfo],
    args: &[f32],
    rvals_count: usize,
) -> Result<Vec<f32>, Error> {
    let mut arena = vec![0_u8; 1 << 16];
    let mut ctx = Context::new(&mut arena, config(dispatch))?;
    ctx.set_extcalls(extcalls);
    ctx.load_archive(bytes)?;
    ctx.prepare_archive()?;
    let def = ctx.find_def(name)?;
    ctx.update_args(def, 0, args)?;
    let mut rvals = vec![0.0; rvals_count];
    match ctx.execute(def, &mut rvals)? {
        Outcome::Returned { .. } => Ok(rvals),
        Outcome::Interrupted => Err(Error::Interrupted),
    }
}

fn single_def(a: Asm, name: &str, args: u16, rvals: u16, stack: u16, flags: DefFlags) -> Vec<u8> {
    let mut b = ArchiveBuilder::new();
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    b.push_def(DefSpec::local(name, code, args, rvals, stack).with_flags(flags))
        .unwrap();
    b.build().unwrap()
}

fn same(a: f32, b: f32) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

fn assert_same(actual: &[f32], expected: &[f32], what: &str) {
    assert_eq!(actual.len(), expected.len(), "{what}");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(same(*a, *e), "{what}: value {i}: got {a}, expected {e}");
    }
}

#[test]
fn strategies_agree_on_a_maths_chain() {
    // s0 = x, s1 = y, s2..s13 = results
    let mut a = Asm::new();
    a.unary(Opcode::Sin, 0, 2)
        .unary(Opcode::Cos, 0, 3)
        .binary(Opcode::PowSs, 0, 1, 4)
        .binary(Opcode::Log, 0, 1, 5)
        .binary(Opcode::Atan2, 0, 1, 6)
        .binary(Opcode::MinSs, 0, 1, 7)
        .binary(Opcode::MaxSs, 0, 1, 8)
        .unary(Opcode::FloorS, 0, 9)
        .unary(Opcode::RoundS, 0, 10)
        .binary(Opcode::ModSs, 0, 1, 11)
        .binary(Opcode::DivSs, 0, 1, 12)
        .unary(Opcode::AbsS, 0, 13);
    let bytes = single_def(a, "chain", 2, 12, 14, DefFlags::NONE);

    let inputs = [
        [0.5, 2.0],
        [-3.25, 0.0],
        [f32::NAN, 1.0],
        [f32::INFINITY, -2.0],
        [-0.0, 10.0],
    ];
    for args in inputs {
        let reference = run(&bytes, "chain", DispatchStrategy::Switch, &[], &args, 12).unwrap();
        for strategy in STRATEGIES {
            let got = run(&bytes, "chain", strategy, &[], &args, 12).unwrap();
            assert_same(&got, &reference, &format!("{strategy:?} on {args:?}"));
        }
    }

    let got = run(&bytes, "chain", DispatchStrategy::Threaded, &[], &[4.0, 2.0], 12).unwrap();
    assert_eq!(got[2], 16.0);
    assert_eq!(got[3], 2.0);
    assert_eq!(got[5], 2.0);
    assert_eq!(got[6], 4.0);
    assert_eq!(got[9], 0.0);
}

#[test]
fn accumulate_loop_needs_the_backbranch_flag() {
    // s0 = 1.0, s1 = 5.0, s2 = counter, s3 = result
    let build = |flags| {
        let mut a = Asm::new();
        let top = a.label();
        a.place(top).unwrap();
        a.binary(Opcode::AddSs, 2, 0, 2);
        a.cmp(2, 1);
        a.branch_on(Opcode::BranchClt, top);
        a.assign_f32(16.0, 3);
        let mut b = ArchiveBuilder::new();
        let code = b.push_code(&a.finish().unwrap()).unwrap();
        b.push_def(DefSpec::local("accumulate", code, 1, 1, 2).with_flags(flags))
            .unwrap();
        b.set_constants(&[1.0, 5.0]);
        b.build().unwrap()
    };

    let bytes = build(DefFlags::HAS_BACKBRANCHES);
    for strategy in STRATEGIES {
        let got = run(&bytes, "accumulate", strategy, &[], &[0.0], 1).unwrap();
        assert_eq!(got, [16.0], "{strategy:?}");
    }

    let bytes = build(DefFlags::NONE);
    assert_eq!(
        run(&bytes, "accumulate", DispatchStrategy::Switch, &[], &[0.0], 1),
        Err(Error::InvalidArchive(ValidationError::DefFlags))
    );
}

const COMPARISONS: [(Opcode, Opcode); 7] = [
    (Opcode::AssignCeq, Opcode::BranchCeq),
    (Opcode::AssignCne, Opcode::BranchCne),
    (Opcode::AssignClt, Opcode::BranchClt),
    (Opcode::AssignCle, Opcode::BranchCle),
    (Opcode::AssignCgt, Opcode::BranchCgt),
    (Opcode::AssignCge, Opcode::BranchCge),
    (Opcode::AssignCun, Opcode::BranchCun),
];

#[test]
fn comparison_truth_table() {
    // assign: s0 = a, s1 = b, s2..s8 = one result per condition
    let mut a = Asm::new();
    a.cmp(0, 1);
    for (i, (assign, _)) in COMPARISONS.iter().enumerate() {
        a.assign_cond(*assign, 1, 0, 2 + i as u16);
    }
    let mut b = ArchiveBuilder::new();
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    b.push_def(DefSpec::local("assign", code, 2, 7, 9)).unwrap();

    // branch: one def per condition, s0 = a, s1 = b, s2 = taken
    for (_, branch) in COMPARISONS {
        let mut a = Asm::new();
        let yes = a.label();
        let done = a.label();
        a.cmp(0, 1);
        a.assign_int(0, 2);
        a.branch_on(branch, yes);
        a.branch(done);
        a.place(yes).unwrap();
        a.assign_int(1, 2);
        a.place(done).unwrap();
        let code = b.push_code(&a.finish().unwrap()).unwrap();
        b.push_def(DefSpec::local(branch.mnemonic(), code, 2, 1, 3))
            .unwrap();
    }
    let bytes = b.build().unwrap();

    // eq, ne, lt, le, gt, ge, un
    let table: [([f32; 2], [f32; 7]); 6] = [
        ([1.0, 2.0], [0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]),
        ([2.0, 1.0], [0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]),
        ([1.0, 1.0], [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]),
        ([-0.0, 0.0], [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]),
        ([f32::NAN, 1.0], [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
        ([1.0, f32::NAN], [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
    ];
    for strategy in STRATEGIES {
        for (args, expected) in &table {
            let got = run(&bytes, "assign", strategy, &[], args, 7).unwrap();
            assert_eq!(&got, expected, "{strategy:?} assign on {args:?}");
            for (i, (_, branch)) in COMPARISONS.iter().enumerate() {
                let got = run(&bytes, branch.mnemonic(), strategy, &[], args, 1).unwrap();
                assert_eq!(got[0], expected[i], "{strategy:?} {branch:?} on {args:?}");
            }
        }
    }
}

#[test]
fn value_branches_test_sign_and_nan() {
    let ops = [
        Opcode::BranchZ,
        Opcode::BranchNz,
        Opcode::BranchPos,
        Opcode::BranchNeg,
        Opcode::BranchUn,
    ];
    let mut b = ArchiveBuilder::new();
    for op in ops {
        // s0 = value, s1 = taken
        let mut a = Asm::new();
        let yes = a.label();
        let done = a.label();
        a.assign_int(0, 1);
        a.branch_if(op, 0, yes);
        a.branch(done);
        a.place(yes).unwrap();
        a.assign_int(1, 1);
        a.place(done).unwrap();
        let code = b.push_code(&a.finish().unwrap()).unwrap();
        b.push_def(DefSpec::local(op.mnemonic(), code, 1, 1, 2))
            .unwrap();
    }
    let bytes = b.build().unwrap();

    let values = [0.0, -0.0, f32::NAN, -f32::NAN, 1.0, -1.0];
    // One row per op, one column per value.
    let expected = [
        [1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, 1.0, 1.0],
        [1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
        [0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        [0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
    ];
    for strategy in STRATEGIES {
        for (op, row) in ops.iter().zip(&expected) {
            for (v, want) in values.iter().zip(row) {
                let got = run(&bytes, op.mnemonic(), strategy, &[], &[*v], 1).unwrap();
                assert_eq!(got[0], *want, "{strategy:?} {op:?} on {v:?}");
            }
        }
    }
}

#[test]
fn branch_targets_are_validated() {
    let mut a = Asm::new();
    a.emit(Opcode::Branch, 0, 0, 0);
    let bytes = single_def(a, "spin", 0, 0, 0, DefFlags::NONE);
    assert_eq!(
        run(&bytes, "spin", DispatchStrategy::Switch, &[], &[], 0),
        Err(Error::InvalidArchive(ValidationError::DefCyclic))
    );

    let mut a = Asm::new();
    a.emit(Opcode::Branch, 0, 2, 0);
    let bytes = single_def(a, "far", 0, 0, 0, DefFlags::NONE);
    assert_eq!(
        run(&bytes, "far", DispatchStrategy::Switch, &[], &[], 0),
        Err(Error::InvalidArchive(ValidationError::AccessViolation))
    );

    // Branching to the instruction count returns.
    let mut a = Asm::new();
    a.emit(Opcode::Branch, 0, 1, 0);
    let bytes = single_def(a, "end", 0, 0, 0, DefFlags::NONE);
    assert_eq!(run(&bytes, "end", DispatchStrategy::Table, &[], &[], 0), Ok(vec![]));
}

fn sum_twice(_: &ExtcallContext<'_>, args: &[f32], rvals: &mut [f32]) -> Result<(), i32> {
    rvals[0] = args.iter().sum::<f32>() * 2.0;
    Ok(())
}

fn fail_verbatim(_: &ExtcallContext<'_>, _: &[f32], _: &mut [f32]) -> Result<(), i32> {
    Err(-123_456_789)
}

static EXTCALLS: [ExtcallInfo; 2] = [
    ExtcallInfo::new("sum_twice", 3, 1, sum_twice),
    ExtcallInfo::new("fail", 0, 0, fail_verbatim),
];

fn extcall_archive() -> Vec<u8> {
    let mut b = ArchiveBuilder::new();
    let sum = b.push_def(DefSpec::external("sum_twice", 3, 1)).unwrap();
    let fail = b.push_def(DefSpec::external("fail", 0, 0)).unwrap();

    // s0..s2 = args, s3 = result, s4..s7 = extcall frame
    let mut a = Asm::new();
    a.assign_ss(0, 4)
        .assign_ss(1, 5)
        .assign_ss(2, 6)
        .extcall(sum, 4)
        .assign_ss(7, 3);
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    b.push_def(DefSpec::local("via_extcall", code, 3, 1, 8)).unwrap();

    let mut a = Asm::new();
    a.extcall(fail, 0);
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    b.push_def(DefSpec::local("fail_via_extcall", code, 0, 0, 0))
        .unwrap();
    b.build().unwrap()
}

#[test]
fn extcalls_marshal_arguments_and_results() {
    let bytes = extcall_archive();
    for strategy in STRATEGIES {
        let direct = run(&bytes, "sum_twice", strategy, &EXTCALLS, &[1.0, 2.0, 3.0], 1);
        assert_eq!(direct, Ok(vec![12.0]), "{strategy:?}");
        let indirect = run(&bytes, "via_extcall", strategy, &EXTCALLS, &[1.0, 2.0, 3.0], 1);
        assert_eq!(indirect, Ok(vec![12.0]), "{strategy:?}");
    }
}

#[test]
fn extcall_errors_are_reported_verbatim() {
    let bytes = extcall_archive();
    for strategy in STRATEGIES {
        for name in ["fail", "fail_via_extcall"] {
            let err = run(&bytes, name, strategy, &EXTCALLS, &[], 0).unwrap_err();
            assert_eq!(err, Error::Extcall(-123_456_789), "{strategy:?} {name}");
            assert_eq!(err.code(), -123_456_789);
        }
    }
}

#[test]
fn self_extcall_is_cyclic() {
    let mut a = Asm::new();
    a.extcall(DefRef(0), 0);
    let mut b = ArchiveBuilder::new();
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    let def = b.push_def(DefSpec::local("ouroboros", code, 0, 0, 0)).unwrap();
    assert_eq!(def, DefRef(0));
    let bytes = b.build().unwrap();
    assert_eq!(
        run(&bytes, "ouroboros", DispatchStrategy::Switch, &[], &[], 0),
        Err(Error::InvalidArchive(ValidationError::DefCyclic))
    );
}

fn tick(ctx: &ExtcallContext<'_>, args: &[f32], rvals: &mut [f32]) -> Result<(), i32> {
    ctx.interrupt();
    rvals[0] = args[0] + 1.0;
    Ok(())
}

#[test]
fn interrupted_loops_resume_to_the_same_result() {
    static TICK: [ExtcallInfo; 1] = [ExtcallInfo::new("tick", 1, 1, tick)];

    // s0 = 4.0, s1 = counter in, s2 = counter out, s3..s4 = extcall frame
    let mut b = ArchiveBuilder::new();
    let tick_def = b.push_def(DefSpec::external("tick", 1, 1)).unwrap();
    let mut a = Asm::new();
    let top = a.label();
    a.assign_ss(1, 2);
    a.place(top).unwrap();
    a.assign_ss(2, 3);
    a.extcall(tick_def, 3);
    a.assign_ss(4, 2);
    a.cmp(2, 0);
    a.branch_on(Opcode::BranchClt, top);
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    b.push_def(
        DefSpec::local("count", code, 1, 1, 4).with_flags(DefFlags::HAS_BACKBRANCHES),
    )
    .unwrap();
    b.set_constants(&[4.0]);
    let bytes = b.build().unwrap();

    for strategy in STRATEGIES {
        let mut arena = vec![0_u8; 4096];
        let mut ctx = Context::new(&mut arena, config(strategy)).unwrap();
        ctx.set_extcalls(&TICK);
        ctx.load_archive(&bytes).unwrap();
        ctx.prepare_archive().unwrap();
        let count = ctx.find_def("count").unwrap();
        ctx.update_arg(count, 0, 0.0).unwrap();

        let mut rvals = [0.0];
        let mut interruptions = 0;
        let mut outcome = ctx.execute(count, &mut rvals).unwrap();
        while outcome == Outcome::Interrupted {
            interruptions += 1;
            assert_eq!(ctx.resume(tick_def, &mut rvals), Err(Error::DefMismatch));
            outcome = ctx.resume(count, &mut rvals).unwrap();
        }
        assert_eq!(outcome, Outcome::Returned { count: 1 });
        assert_eq!(rvals[0], 4.0, "{strategy:?}");
        assert_eq!(interruptions, 4, "{strategy:?}");
    }
}

/// Compiles `root` and checks every strategy against the evaluator on every input row.
fn check_compiled(tree: &Tree, root: NodeId, inputs_count: u16, rows: &[&[f32]]) {
    let configs = [
        CompilerConfig::default(),
        CompilerConfig {
            fold_constants: false,
            constant_reuse_threshold: 1,
        },
        CompilerConfig {
            fold_constants: false,
            constant_reuse_threshold: u32::MAX,
        },
    ];
    for cfg in &configs {
        let f = compile_function(tree, root, inputs_count, cfg).unwrap();
        let bytes = f.to_archive("f").unwrap();
        let outputs = usize::from(f.outputs_count);
        for row in rows {
            let expected = evaluate(tree, root, row).unwrap();
            for strategy in STRATEGIES {
                let got = run(&bytes, "f", strategy, &[], row, outputs).unwrap();
                assert_same(&got, &expected, &format!("{cfg:?} {strategy:?} on {row:?}"));
            }
        }
    }
}

#[test]
fn compiled_arithmetic_matches_the_evaluator() {
    let mut t = Tree::new();
    let x = t.input(0).unwrap();
    let y = t.input(1).unwrap();
    let two = t.constant(2.0).unwrap();
    let three = t.constant(3.0).unwrap();
    let four = t.constant(4.0).unwrap();
    let doubled = t.binary(BinaryOp::Mul, x, two).unwrap();
    let twelve = t.binary(BinaryOp::Mul, three, four).unwrap();
    let shifted = t.binary(BinaryOp::Sub, doubled, twelve).unwrap();
    let p = t.binary(BinaryOp::Pow, y, two).unwrap();
    let lg = t.binary(BinaryOp::Log, p, two).unwrap();
    let hi = t.binary(BinaryOp::Max, shifted, lg).unwrap();
    let lo = t.binary(BinaryOp::Min, shifted, lg).unwrap();
    let r = t.binary(BinaryOp::Rem, hi, three).unwrap();
    let a = t.unary(UnaryOp::Atan, r).unwrap();
    let s = t.unary(UnaryOp::Sin, x).unwrap();
    let c = t.unary(UnaryOp::Ceil, y).unwrap();
    let at = t.binary(BinaryOp::Atan2, s, c).unwrap();
    let root = t.structure(&[hi, lo, a, at, x]).unwrap();

    let rows: [&[f32]; 5] = [
        &[1.0, 2.0],
        &[7.5, -3.0],
        &[-0.0, 0.0],
        &[f32::NAN, 1.0],
        &[f32::INFINITY, 0.25],
    ];
    check_compiled(&t, root, 2, &rows);
}

#[test]
fn compiled_logic_matches_the_evaluator() {
    let mut t = Tree::new();
    let x = t.input(0).unwrap();
    let y = t.input(1).unwrap();
    let not_x = t.unary(UnaryOp::Not, x).unwrap();
    let and = t.binary(BinaryOp::And, x, y).unwrap();
    let or = t.binary(BinaryOp::Or, x, y).unwrap();
    let eq = t.binary(BinaryOp::Eq, x, y).unwrap();
    let ne = t.binary(BinaryOp::Neq, x, y).unwrap();
    let lt = t.binary(BinaryOp::Lt, x, y).unwrap();
    let le = t.binary(BinaryOp::Leq, x, y).unwrap();
    let gt = t.binary(BinaryOp::Gt, x, y).unwrap();
    let ge = t.binary(BinaryOp::Geq, x, y).unwrap();
    let root = t.structure(&[not_x, and, or, eq, ne, lt, le, gt, ge]).unwrap();

    let rows: [&[f32]; 7] = [
        &[-2.0, 1.0],
        &[0.0, 0.0],
        &[0.5, 3.0],
        &[3.0, 0.5],
        &[1.0, 1.0],
        &[f32::NAN, 1.0],
        &[1.0, f32::NAN],
    ];
    check_compiled(&t, root, 2, &rows);

    // The `not` idiom only maps to 0 or 1 for inputs above -1.
    let f = compile_function(&t, not_x, 2, &CompilerConfig::default()).unwrap();
    let bytes = f.to_archive("not").unwrap();
    for (v, want) in [(-2.0, 3.0), (0.0, 1.0), (0.5, 0.0), (3.0, 0.0)] {
        let got = run(&bytes, "not", DispatchStrategy::Switch, &[], &[v, 0.0], 1).unwrap();
        assert_eq!(got, [want], "not {v}");
    }
}

#[test]
fn compiled_signed_zeros_match_the_evaluator() {
    let mut t = Tree::new();
    let x = t.input(0).unwrap();
    let zero = t.constant(0.0).unwrap();
    let neg_zero = t.constant(-0.0).unwrap();
    let one = t.constant(1.0).unwrap();

    // `1 / (x + 0)` is `inf` at `x = -0.0`, never `-inf`.
    let plus_zero = t.binary(BinaryOp::Add, x, zero).unwrap();
    let recip = t.binary(BinaryOp::Div, one, plus_zero).unwrap();
    let zero_plus = t.binary(BinaryOp::Add, zero, x).unwrap();
    let minus_neg_zero = t.binary(BinaryOp::Sub, x, neg_zero).unwrap();
    let plus_neg_zero = t.binary(BinaryOp::Add, x, neg_zero).unwrap();
    let minus_zero = t.binary(BinaryOp::Sub, x, zero).unwrap();
    let both = t.binary(BinaryOp::Add, zero, neg_zero).unwrap();
    let root = t
        .structure(&[recip, zero_plus, minus_neg_zero, plus_neg_zero, minus_zero, both])
        .unwrap();

    let rows: [&[f32]; 4] = [&[-0.0], &[0.0], &[1.5], &[f32::NAN]];
    check_compiled(&t, root, 1, &rows);

    let f = compile_function(&t, recip, 1, &CompilerConfig::default()).unwrap();
    let bytes = f.to_archive("recip").unwrap();
    for strategy in STRATEGIES {
        let got = run(&bytes, "recip", strategy, &[], &[-0.0], 1).unwrap();
        assert_eq!(got, [f32::INFINITY], "{strategy:?}");
    }
}

#[test]
fn compiled_control_flow_matches_the_evaluator() {
    let mut t = Tree::new();
    let n = t.input(0).unwrap();
    let x = t.input(1).unwrap();
    let zero = t.constant(0.0).unwrap();
    let one = t.constant(1.0).unwrap();
    let two = t.constant(2.0).unwrap();

    // Sum of the even numbers below n.
    let scope = t.new_scope();
    let i = t.scoped_input(scope, 0).unwrap();
    let acc = t.scoped_input(scope, 1).unwrap();
    let initial = t.structure(&[zero, zero]).unwrap();
    let cond = t.binary(BinaryOp::Lt, i, n).unwrap();
    let parity = t.binary(BinaryOp::Rem, i, two).unwrap();
    let even = t.binary(BinaryOp::Eq, parity, zero).unwrap();
    let term = t.if_else(even, i, zero).unwrap();
    let next_acc = t.binary(BinaryOp::Add, acc, term).unwrap();
    let next_i = t.binary(BinaryOp::Add, i, one).unwrap();
    let body = t.structure(&[next_i, next_acc]).unwrap();
    let sum = t.for_loop(scope, initial, cond, body).unwrap();
    let evens = t.indexer(sum, 1).unwrap();

    // Nested conditionals sharing a subexpression.
    let sq = t.binary(BinaryOp::Mul, x, x).unwrap();
    let big = t.binary(BinaryOp::Gt, sq, n).unwrap();
    let neg = t.binary(BinaryOp::Lt, x, zero).unwrap();
    let inner = t.if_else(neg, sq, x).unwrap();
    let outer = t.if_else(big, inner, sq).unwrap();
    let shared = t.binary(BinaryOp::Add, outer, sq).unwrap();

    // Clamped select.
    let x2 = t.binary(BinaryOp::Mul, x, two).unwrap();
    let x10 = t.constant(10.0).unwrap();
    let x_plus = t.binary(BinaryOp::Add, x, x10).unwrap();
    let picked = t.select(n, &[x, x2, x_plus]).unwrap();

    let root = t.structure(&[evens, shared, picked, sum]).unwrap();

    let rows: [&[f32]; 8] = [
        &[5.0, 1.5],
        &[0.0, -2.0],
        &[-1.0, 3.0],
        &[0.7, -0.5],
        &[1.5, 4.0],
        &[2.0, 2.0],
        &[9.0, -3.0],
        &[f32::NAN, 1.0],
    ];
    check_compiled(&t, root, 2, &rows);

    let f = compile_function(&t, root, 2, &CompilerConfig::default()).unwrap();
    assert_eq!(f.flags, DefFlags::HAS_BACKBRANCHES);
    let got = run(
        &f.to_archive("f").unwrap(),
        "f",
        DispatchStrategy::Threaded,
        &[],
        &[5.0, 1.5],
        usize::from(f.outputs_count),
    )
    .unwrap();
    assert_eq!(got[0], 6.0);
    assert_eq!(got[1], 4.5);
    assert_eq!(got[2], 11.5);
    assert_eq!(&got[3..], [5.0, 6.0]);
}

#[test]
fn straight_line_code_has_no_backbranch_flag() {
    let mut t = Tree::new();
    let x = t.input(0).unwrap();
    let y = t.input(1).unwrap();
    let p = t.binary(BinaryOp::Gt, x, y).unwrap();
    let root = t.if_else(p, x, y).unwrap();
    let f = compile_function(&t, root, 2, &CompilerConfig::default()).unwrap();
    assert_eq!(f.flags, DefFlags::NONE);
    let bytes = f.to_archive("larger").unwrap();
    for strategy in STRATEGIES {
        let got = run(&bytes, "larger", strategy, &[], &[2.0, 7.0], 1).unwrap();
        assert_eq!(got, [7.0], "{strategy:?}");
    }
}
