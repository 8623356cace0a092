// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opcode values for the LMNT instruction set.
//!
//! This module is a small wrapper around generated opcode tables.

include!("opcodes_gen.rs");

impl Opcode {
    /// Returns the raw opcode value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self as u16
    }

    /// Returns `true` for the conditional branches that read the status flags.
    #[must_use]
    pub fn reads_flags(self) -> bool {
        matches!(
            self,
            Self::BranchCeq
                | Self::BranchCne
                | Self::BranchClt
                | Self::BranchCle
                | Self::BranchCgt
                | Self::BranchCge
                | Self::BranchCun
                | Self::AssignCeq
                | Self::AssignCne
                | Self::AssignClt
                | Self::AssignCle
                | Self::AssignCgt
                | Self::AssignCge
                | Self::AssignCun
        )
    }
}
