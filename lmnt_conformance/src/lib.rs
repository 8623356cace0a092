// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end conformance tests for `lmnt` and `lmnt_compiler`.
//!
//! The tests live in `tests/`. They run hand-assembled and compiled archives under every
//! dispatch strategy and check the results against each other and against the tree evaluator.

#![no_std]
