// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-function compiler state: stack allocations, the constant pool and emission contexts.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::compiler::CompileError;
use crate::tree::{NodeId, Tree};

/// The part of the stack a slot lives in.
///
/// A def's stack is laid out as constants, then inputs, then outputs, then locals.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// The constant pool.
    Constant,
    /// Function arguments.
    Input,
    /// Return values.
    Output,
    /// Compiler temporaries.
    Local,
}

/// A stack slot relative to the start of its [`Region`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Region of the slot.
    pub region: Region,
    /// Offset within the region.
    pub offset: u32,
}

impl Slot {
    /// The slot `by` values further along.
    #[must_use]
    pub const fn add(self, by: u32) -> Self {
        Self {
            region: self.region,
            offset: self.offset + by,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    Created,
    Prepared,
    Allocated,
    Compiled,
}

#[derive(Clone, Debug)]
pub(crate) struct StackAllocation {
    pub(crate) node: NodeId,
    pub(crate) width: u32,
    pub(crate) stage: Stage,
    /// Lives inside another allocation at this offset.
    pub(crate) parent: Option<(usize, u32)>,
    /// Fixed location of a pinned root allocation.
    pub(crate) fixed: Option<Slot>,
    /// Pinned allocations never move and are never emitted into.
    pub(crate) pinned: bool,
    pub(crate) first_use: u32,
    pub(crate) last_use: u32,
    pub(crate) local: Option<u32>,
    /// Contexts in which the node's code has been emitted.
    pub(crate) compiled_in: Vec<usize>,
}

impl StackAllocation {
    fn new(node: NodeId, width: u32) -> Self {
        Self {
            node,
            width,
            stage: Stage::Created,
            parent: None,
            fixed: None,
            pinned: false,
            first_use: 0,
            last_use: 0,
            local: None,
            compiled_in: Vec::new(),
        }
    }

    /// Free to be placed by the allocator or embedded in a parent block.
    pub(crate) fn is_free(&self) -> bool {
        !self.pinned && self.parent.is_none() && self.fixed.is_none()
    }
}

#[derive(Clone, Debug)]
struct ConstantEntry {
    value: f32,
    uses: u32,
    required: bool,
    index: Option<u16>,
}

/// Candidate constants and the hard pool chosen from them.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConstantTable {
    entries: Vec<ConstantEntry>,
    // Keyed by bit pattern so `-0.0` and NaN payloads stay distinct.
    by_bits: HashMap<u32, usize>,
    pool: Vec<f32>,
}

impl ConstantTable {
    fn entry(&mut self, value: f32) -> &mut ConstantEntry {
        let entries = &mut self.entries;
        let i = *self.by_bits.entry(value.to_bits()).or_insert_with(|| {
            entries.push(ConstantEntry {
                value,
                uses: 0,
                required: false,
                index: None,
            });
            entries.len() - 1
        });
        &mut self.entries[i]
    }

    /// Records one use of `value` as an operand.
    pub(crate) fn count(&mut self, value: f32) {
        let e = self.entry(value);
        e.uses = e.uses.saturating_add(1);
    }

    /// Forces `value` into the pool.
    pub(crate) fn require(&mut self, value: f32) {
        self.entry(value).required = true;
    }

    /// Chooses the pool: required constants and those used at least `threshold` times.
    pub(crate) fn finalize(&mut self, threshold: u32) -> Result<(), CompileError> {
        self.pool.clear();
        for e in &mut self.entries {
            e.index = None;
            if e.required || e.uses >= threshold {
                let index = u16::try_from(self.pool.len()).map_err(|_| CompileError::StackOverflow {
                    slots: self.pool.len() + 1,
                })?;
                e.index = Some(index);
                self.pool.push(e.value);
            }
        }
        Ok(())
    }

    /// Pool index of `value`, if pooled.
    pub(crate) fn find(&self, value: f32) -> Option<u16> {
        let i = *self.by_bits.get(&value.to_bits())?;
        self.entries.get(i)?.index
    }

    pub(crate) fn pool(&self) -> &[f32] {
        &self.pool
    }
}

/// Everything one compilation tracks.
pub(crate) struct CompilerState<'t> {
    pub(crate) tree: &'t Tree,
    pub(crate) inputs_count: u16,
    pub(crate) allocations: Vec<StackAllocation>,
    by_node: HashMap<NodeId, usize>,
    temps: HashMap<NodeId, usize>,
    pub(crate) output: usize,
    pub(crate) constants: ConstantTable,
    // Parent of each emission context; context 0 is unconditional.
    contexts: Vec<Option<usize>>,
    pub(crate) tick: u32,
}

impl<'t> CompilerState<'t> {
    pub(crate) fn new(tree: &'t Tree, root: NodeId, inputs_count: u16, outputs: u32) -> Self {
        let mut output = StackAllocation::new(root, outputs);
        output.fixed = Some(Slot {
            region: Region::Output,
            offset: 0,
        });
        output.pinned = true;
        output.stage = Stage::Allocated;
        Self {
            tree,
            inputs_count,
            allocations: alloc::vec![output],
            by_node: HashMap::new(),
            temps: HashMap::new(),
            output: 0,
            constants: ConstantTable::default(),
            contexts: alloc::vec![None],
            tick: 0,
        }
    }

    pub(crate) fn has_allocation(&self, node: NodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    pub(crate) fn create_allocation(&mut self, node: NodeId, width: u32) -> Result<usize, CompileError> {
        if self.by_node.contains_key(&node) {
            return Err(CompileError::AllocationCollision { node });
        }
        self.allocations.push(StackAllocation::new(node, width));
        let id = self.allocations.len() - 1;
        self.by_node.insert(node, id);
        Ok(id)
    }

    /// A scratch allocation owned by `node`, separate from its result.
    pub(crate) fn create_temp(&mut self, node: NodeId, width: u32) -> Result<usize, CompileError> {
        if self.temps.contains_key(&node) {
            return Err(CompileError::AllocationCollision { node });
        }
        self.allocations.push(StackAllocation::new(node, width));
        let id = self.allocations.len() - 1;
        self.temps.insert(node, id);
        Ok(id)
    }

    pub(crate) fn allocation_of(&self, node: NodeId) -> Result<usize, CompileError> {
        self.by_node
            .get(&node)
            .copied()
            .ok_or(CompileError::MissingAllocation { node })
    }

    pub(crate) fn temp_of(&self, node: NodeId) -> Result<usize, CompileError> {
        self.temps
            .get(&node)
            .copied()
            .ok_or(CompileError::MissingAllocation { node })
    }

    pub(crate) fn get(&self, id: usize) -> &StackAllocation {
        &self.allocations[id]
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> &mut StackAllocation {
        &mut self.allocations[id]
    }

    /// Records a reference to allocation `id` during preparation.
    ///
    /// Returns `true` on the first reference.
    pub(crate) fn touch(&mut self, id: usize) -> bool {
        self.tick = self.tick.saturating_add(1);
        let tick = self.tick;
        let a = &mut self.allocations[id];
        a.last_use = tick;
        if a.stage >= Stage::Prepared {
            return false;
        }
        a.first_use = tick;
        a.stage = Stage::Prepared;
        true
    }

    pub(crate) fn pin(&mut self, id: usize, slot: Slot) {
        let a = &mut self.allocations[id];
        a.fixed = Some(slot);
        a.pinned = true;
    }

    /// Resolves the slot of allocation `id`, following parents.
    pub(crate) fn location(&self, id: usize) -> Result<Slot, CompileError> {
        let mut id = id;
        let mut offset = 0_u32;
        // Parent chains are acyclic: a child is always parented into an allocation created
        // for one of its ancestors.
        for _ in 0..=self.allocations.len() {
            let a = &self.allocations[id];
            if a.stage < Stage::Allocated {
                return Err(CompileError::MissingAllocation { node: a.node });
            }
            if let Some(slot) = a.fixed {
                return Ok(slot.add(offset));
            }
            if let Some((parent, rel)) = a.parent {
                offset += rel;
                id = parent;
                continue;
            }
            return match a.local {
                Some(local) => Ok(Slot {
                    region: Region::Local,
                    offset: local + offset,
                }),
                None => Err(CompileError::MissingAllocation { node: a.node }),
            };
        }
        Err(CompileError::AllocationCollision {
            node: self.allocations[id].node,
        })
    }

    pub(crate) fn new_context(&mut self, parent: usize) -> usize {
        self.contexts.push(Some(parent));
        self.contexts.len() - 1
    }

    fn is_ancestor_or_self(&self, ancestor: usize, ctx: usize) -> bool {
        let mut cur = Some(ctx);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.contexts.get(c).copied().flatten();
        }
        false
    }

    /// Whether code already emitted for `id` runs before anything emitted in `ctx`.
    pub(crate) fn is_compiled_for(&self, id: usize, ctx: usize) -> bool {
        self.allocations[id]
            .compiled_in
            .iter()
            .any(|c| self.is_ancestor_or_self(*c, ctx))
    }

    pub(crate) fn mark_compiled(&mut self, id: usize, ctx: usize) {
        let a = &mut self.allocations[id];
        a.stage = Stage::Compiled;
        a.compiled_in.push(ctx);
    }
}
