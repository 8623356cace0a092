// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stack slot allocation policy.
//!
//! The compiler asks an [`Allocator`] for a local offset for every allocation that is neither
//! pinned (constants, inputs, outputs, loop state) nor embedded in a parent block. Requests carry
//! the width and the first and last use recorded during preparation, which is enough for a
//! liveness-based policy to reuse slots.

use crate::tree::NodeId;

/// One allocation the compiler needs a home for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocationRequest {
    /// The node the allocation holds, if any.
    pub node: Option<NodeId>,
    /// Number of slots.
    pub width: u32,
    /// Preparation tick of the first reference.
    pub first_use: u32,
    /// Preparation tick of the last reference.
    pub last_use: u32,
}

/// Assigns local stack offsets.
pub trait Allocator {
    /// Returns the local offset for `request`.
    fn allocate(&mut self, request: &AllocationRequest) -> u32;

    /// Number of local slots handed out so far.
    fn local_count(&self) -> u32;
}

/// A monotonic bump allocator that never reuses a slot.
#[derive(Clone, Debug, Default)]
pub struct NaiveAllocator {
    next: u32,
}

impl NaiveAllocator {
    /// Creates an allocator starting at local offset zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Allocator for NaiveAllocator {
    fn allocate(&mut self, request: &AllocationRequest) -> u32 {
        let at = self.next;
        self.next = self.next.saturating_add(request.width);
        at
    }

    fn local_count(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::{AllocationRequest, Allocator, NaiveAllocator};

    fn request(width: u32) -> AllocationRequest {
        AllocationRequest {
            node: None,
            width,
            first_use: 0,
            last_use: 0,
        }
    }

    #[test]
    fn naive_allocator_bumps() {
        let mut a = NaiveAllocator::new();
        assert_eq!(a.allocate(&request(1)), 0);
        assert_eq!(a.allocate(&request(4)), 1);
        assert_eq!(a.allocate(&request(2)), 5);
        assert_eq!(a.local_count(), 7);
    }
}
