// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lowers instruction trees to `lmnt` bytecode.
//!
//! A [`Tree`] is an append-only arena of expression nodes: constants, inputs, structs, scalar
//! maths, conditionals, loops, indexers and selects. [`compile_function`] turns one root node into
//! a [`CompiledFunction`], which [`CompiledFunction::to_archive`] encodes as a loadable archive.
//! [`evaluate`] interprets the same tree directly and is the reference for compiled results.
//!
//! ## Example
//!
//! ```
//! use lmnt::context::{Context, ContextConfig};
//! use lmnt_compiler::{BinaryOp, CompilerConfig, Tree, compile_function, evaluate};
//!
//! // x * 2 + 1
//! let mut t = Tree::new();
//! let x = t.input(0)?;
//! let two = t.constant(2.0)?;
//! let one = t.constant(1.0)?;
//! let doubled = t.binary(BinaryOp::Mul, x, two)?;
//! let root = t.binary(BinaryOp::Add, doubled, one)?;
//!
//! let f = compile_function(&t, root, 1, &CompilerConfig::default())?;
//! let bytes = f.to_archive("affine")?;
//!
//! let mut arena = vec![0_u8; 4096];
//! let mut ctx = Context::new(&mut arena, ContextConfig::default())?;
//! ctx.load_archive(&bytes)?;
//! ctx.prepare_archive()?;
//! let def = ctx.find_def("affine")?;
//! ctx.update_arg(def, 0, 20.0)?;
//! let mut rvals = [0.0];
//! ctx.execute(def, &mut rvals)?;
//!
//! assert_eq!(rvals[0], 41.0);
//! assert_eq!(evaluate(&t, root, &[20.0])?, [41.0]);
//! # Ok::<(), Box<dyn core::error::Error>>(())
//! ```

#![no_std]

extern crate alloc;

mod allocator;
mod compiler;
mod evaluator;
mod fold;
mod state;
mod tree;

pub use allocator::{AllocationRequest, Allocator, NaiveAllocator};
pub use compiler::{
    CompileError, CompiledFunction, CompiledInstruction, CompilerConfig, Operand, compile_function,
    compile_function_with,
};
pub use evaluator::{EvalError, evaluate};
pub use fold::fold;
pub use state::{Region, Slot};
pub use tree::{BinaryOp, Instruction, NodeId, NullaryOp, Tree, TreeError, UnaryOp};
