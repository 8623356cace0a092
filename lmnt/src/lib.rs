// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `lmnt`: a register bytecode VM for small numeric expression programs.
//!
//! Programs ship as a validated binary archive. A [`context::Context`] loads the archive into a
//! caller-provided arena, validates it, binds host functions, and runs defs with one of three
//! interchangeable dispatch strategies. Runs can be interrupted and resumed.
//!
//! ## Example
//!
//! ```
//! use lmnt::asm::Asm;
//! use lmnt::builder::{ArchiveBuilder, DefSpec};
//! use lmnt::context::{Context, ContextConfig, Outcome};
//! use lmnt::opcode::Opcode;
//!
//! // s0 = constant 2.0, s1 = x, s2 = x * 2
//! let mut a = Asm::new();
//! a.binary(Opcode::MulSs, 1, 0, 2);
//!
//! let mut b = ArchiveBuilder::new();
//! let code = b.push_code(&a.finish()?)?;
//! b.push_def(DefSpec::local("double", code, 1, 1, 2))?;
//! b.set_constants(&[2.0]);
//! let bytes = b.build()?;
//!
//! let mut arena = vec![0_u8; 4096];
//! let mut ctx = Context::new(&mut arena, ContextConfig::default())?;
//! ctx.load_archive(&bytes)?;
//! ctx.prepare_archive()?;
//!
//! let def = ctx.find_def("double")?;
//! ctx.update_arg(def, 0, 21.0)?;
//! let mut rvals = [0.0];
//! assert_eq!(ctx.execute(def, &mut rvals)?, Outcome::Returned { count: 1 });
//! assert_eq!(rvals[0], 42.0);
//! # Ok::<(), Box<dyn core::error::Error>>(())
//! ```

#![no_std]

extern crate alloc;

pub mod archive;
pub mod asm;
pub mod builder;
pub mod context;
pub mod disasm;
pub mod dispatch;
pub mod error;
pub mod extcall;
pub mod format;
pub mod opcode;
pub(crate) mod ops;
pub mod trace;
pub mod validation;
