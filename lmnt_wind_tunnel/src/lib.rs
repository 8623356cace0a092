// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Criterion benchmarks for `lmnt` and `lmnt_compiler`. Run with `cargo bench -p lmnt_wind_tunnel`.

#![no_std]
