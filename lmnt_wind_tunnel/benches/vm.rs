// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use lmnt::archive::DefFlags;
use lmnt::asm::Asm;
use lmnt::builder::{ArchiveBuilder, DefSpec};
use lmnt::context::{Context, ContextConfig, Outcome};
use lmnt::dispatch::DispatchStrategy;
use lmnt::extcall::{ExtcallContext, ExtcallInfo};
use lmnt::opcode::Opcode;
use lmnt_compiler::{BinaryOp, CompilerConfig, NodeId, Tree, compile_function};

const STRATEGIES: [DispatchStrategy; 3] = [
    DispatchStrategy::Switch,
    DispatchStrategy::Table,
    DispatchStrategy::Threaded,
];

fn bench_vm(c: &mut Criterion) {
    bench_count_loop(c);
    bench_maths_chain(c);
    bench_extcall_loop(c);
    bench_compiled_polynomial(c);
    bench_compile(c);
}

/// Runs `name` with `args` under every strategy in one benchmark group.
fn bench_strategies(
    c: &mut Criterion,
    group_name: &str,
    bytes: &[u8],
    name: &str,
    extcalls: &'static [ExtcallInfo],
    args: &[f32],
    rvals_count: usize,
) {
    let mut group = c.benchmark_group(group_name);
    for strategy in STRATEGIES {
        let mut arena = vec![0_u8; 1 << 16];
        let mut ctx = Context::new(
            &mut arena,
            ContextConfig {
                dispatch: strategy,
                ..ContextConfig::default()
            },
        )
        .unwrap();
        ctx.set_extcalls(extcalls);
        ctx.load_archive(bytes).unwrap();
        ctx.prepare_archive().unwrap();
        let def = ctx.find_def(name).unwrap();
        let mut rvals = vec![0.0; rvals_count];
        group.bench_function(BenchmarkId::from_parameter(format!("{strategy:?}")), |b| {
            b.iter(|| {
                ctx.update_args(def, 0, args).unwrap();
                let out = ctx.execute(def, &mut rvals).unwrap();
                assert!(matches!(out, Outcome::Returned { .. }));
                black_box(&rvals);
            });
        });
    }
    group.finish();
}

/// `count(n)`: s0 = 1.0, s1 = n, s2 = counter.
fn build_count_loop() -> Vec<u8> {
    let mut a = Asm::new();
    let top = a.label();
    let done = a.label();
    a.assign_int(0, 2);
    a.place(top).unwrap();
    a.cmp(2, 1);
    a.branch_on(Opcode::BranchCge, done);
    a.binary(Opcode::AddSs, 2, 0, 2);
    a.branch(top);
    a.place(done).unwrap();
    let mut b = ArchiveBuilder::new();
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    b.push_def(DefSpec::local("count", code, 1, 1, 2).with_flags(DefFlags::HAS_BACKBRANCHES))
        .unwrap();
    b.set_constants(&[1.0]);
    b.build().unwrap()
}

fn bench_count_loop(c: &mut Criterion) {
    let bytes = build_count_loop();
    for &n in &[10_u16, 1000] {
        bench_strategies(
            c,
            &format!("count_loop/{n}"),
            &bytes,
            "count",
            &[],
            &[f32::from(n)],
            1,
        );
    }
}

/// A straight-line chain of `len` dependent scalar operations on s0 and s1.
fn build_maths_chain(len: u32) -> Vec<u8> {
    let ops = [
        Opcode::AddSs,
        Opcode::MulSs,
        Opcode::Atan2,
        Opcode::MaxSs,
        Opcode::SubSs,
    ];
    let mut a = Asm::new();
    a.assign_ss(0, 2);
    for i in 0..len {
        a.binary(ops[i as usize % ops.len()], 2, 1, 2);
        if i % 7 == 6 {
            a.unary(Opcode::Sin, 2, 2);
        }
    }
    let mut b = ArchiveBuilder::new();
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    b.push_def(DefSpec::local("chain", code, 2, 1, 3)).unwrap();
    b.build().unwrap()
}

fn bench_maths_chain(c: &mut Criterion) {
    for &len in &[16_u32, 256] {
        let bytes = build_maths_chain(len);
        bench_strategies(
            c,
            &format!("maths_chain/{len}"),
            &bytes,
            "chain",
            &[],
            &[0.25, 1.5],
            1,
        );
    }
}

fn increment(_: &ExtcallContext<'_>, args: &[f32], rvals: &mut [f32]) -> Result<(), i32> {
    rvals[0] = args[0] + 1.0;
    Ok(())
}

static EXTCALLS: [ExtcallInfo; 1] = [ExtcallInfo::new("increment", 1, 1, increment)];

/// `count(n)` with the increment done by a host function.
///
/// s0 = n, s1 = counter, s2..s3 = extcall frame.
fn build_extcall_loop() -> Vec<u8> {
    let mut b = ArchiveBuilder::new();
    let inc = b.push_def(DefSpec::external("increment", 1, 1)).unwrap();
    let mut a = Asm::new();
    let top = a.label();
    let done = a.label();
    a.assign_int(0, 1);
    a.place(top).unwrap();
    a.cmp(1, 0);
    a.branch_on(Opcode::BranchCge, done);
    a.assign_ss(1, 2);
    a.extcall(inc, 2);
    a.assign_ss(3, 1);
    a.branch(top);
    a.place(done).unwrap();
    let code = b.push_code(&a.finish().unwrap()).unwrap();
    b.push_def(DefSpec::local("count", code, 1, 1, 4).with_flags(DefFlags::HAS_BACKBRANCHES))
        .unwrap();
    b.build().unwrap()
}

fn bench_extcall_loop(c: &mut Criterion) {
    let bytes = build_extcall_loop();
    bench_strategies(c, "extcall_loop/100", &bytes, "count", &EXTCALLS, &[100.0], 1);
}

/// Horner evaluation of a degree `degree` polynomial in input 0.
fn build_polynomial(degree: u32) -> (Tree, NodeId) {
    let mut t = Tree::new();
    let x = t.input(0).unwrap();
    let mut acc = t.constant(1.0).unwrap();
    for i in 0..degree {
        let k = t.constant(0.5 + i as f32).unwrap();
        let scaled = t.binary(BinaryOp::Mul, acc, x).unwrap();
        acc = t.binary(BinaryOp::Add, scaled, k).unwrap();
    }
    (t, acc)
}

fn bench_compiled_polynomial(c: &mut Criterion) {
    let (t, root) = build_polynomial(32);
    let f = compile_function(&t, root, 1, &CompilerConfig::default()).unwrap();
    let bytes = f.to_archive("poly").unwrap();
    bench_strategies(c, "compiled_polynomial/32", &bytes, "poly", &[], &[0.75], 1);
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_polynomial");
    for &degree in &[8_u32, 64, 512] {
        let (t, root) = build_polynomial(degree);
        group.bench_with_input(BenchmarkId::from_parameter(degree), &t, |b, t| {
            b.iter(|| {
                let f = compile_function(t, root, 1, &CompilerConfig::default()).unwrap();
                black_box(f.to_archive("poly").unwrap());
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(300))
        .measurement_time(std::time::Duration::from_millis(1200))
        .sample_size(60);
    targets = bench_vm
}
criterion_main!(benches);
