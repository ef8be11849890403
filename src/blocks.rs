// SPDX-License-Identifier: Apache-2.0

//! Basic-block partition over a [`crate::cfg::FunctionCfg`] (spec.md §4.2).
//!
//! Grounded on `codegen::cfg::BasicBlock`/`ControlFlowGraph` in the
//! teacher: a block is a `Vec` of straight-line nodes with a
//! `successors()`/`predecessors()` view derived from the underlying edge
//! set, built once per function and never mutated afterwards.

use rustc_hash::FxHashMap;

use crate::cfg::{Completion, FunctionCfg};
use crate::tree::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    /// Nodes in execution order, following single-successor chains from
    /// the block's start (spec.md §4.2).
    pub nodes: Vec<NodeId>,
}

impl Block {
    pub fn first(&self) -> NodeId {
        self.nodes[0]
    }
    pub fn last(&self) -> NodeId {
        *self.nodes.last().unwrap()
    }
    pub fn nth(&self, i: usize) -> Option<NodeId> {
        self.nodes.get(i).copied()
    }
    pub fn length(&self) -> usize {
        self.nodes.len()
    }
}

/// The basic-block partition of one function's CFG, plus the derived
/// block-level successor/predecessor graph spec.md §4.2 and §4.3
/// (dominance) build on.
pub struct FunctionBlocks {
    pub blocks: Vec<Block>,
    pub entry: Option<BlockId>,
    block_of: FxHashMap<NodeId, BlockId>,
    successors: FxHashMap<BlockId, Vec<(BlockId, Completion)>>,
    predecessors: FxHashMap<BlockId, Vec<(BlockId, Completion)>>,
}

impl FunctionBlocks {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn basic_block_of(&self, node: NodeId) -> Option<BlockId> {
        self.block_of.get(&node).copied()
    }

    pub fn successors(&self, id: BlockId) -> &[(BlockId, Completion)] {
        self.successors.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn predecessors(&self, id: BlockId) -> &[(BlockId, Completion)] {
        self.predecessors.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.block_of.contains_key(&node)
    }

    /// `true` iff `id` is an entry block: it starts at the function's
    /// `first` node.
    pub fn is_entry_block(&self, id: BlockId) -> bool {
        Some(id) == self.entry
    }

    /// `true` iff `id` contains a CFG exit node (no outgoing edge).
    pub fn is_exit_block(&self, id: BlockId, cfg: &FunctionCfg) -> bool {
        let last = self.block(id).last();
        cfg.successors(last).is_empty()
    }

    /// `true` iff `id`'s last node has more than one CFG successor
    /// (spec.md §4.2 "condition block").
    pub fn is_condition_block(&self, id: BlockId) -> bool {
        self.successors(id).len() > 1
    }

    /// `true` iff `id`'s first node has more than one CFG predecessor
    /// (spec.md §4.2 "join block").
    pub fn is_join_block(&self, id: BlockId) -> bool {
        self.predecessors(id).len() > 1
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Builds the basic-block partition of `cfg`.
///
/// A node starts a block iff: it is the function's first node; it has no
/// predecessors (but is reachable); it has more than one predecessor; or
/// its unique predecessor has more than one successor (spec.md §4.2).
/// Blocks are numbered in ascending start-node order, which (since
/// `NodeId` ordinals track source/preorder, see [`crate::tree::Tree`])
/// gives deterministic `BlockId`s independent of any hash-map iteration.
pub fn build_function_blocks(cfg: &FunctionCfg) -> FunctionBlocks {
    let mut starts: Vec<NodeId> = Vec::new();
    for &node in &cfg.reachable {
        let preds = cfg.predecessors(node);
        let starts_here = Some(node) == cfg.first
            || preds.is_empty()
            || preds.len() > 1
            || (preds.len() == 1 && cfg.successors(preds[0].0).len() > 1);
        if starts_here {
            starts.push(node);
        }
    }
    starts.sort_unstable();

    let mut blocks = Vec::with_capacity(starts.len());
    let mut block_of = FxHashMap::default();
    for (i, &start) in starts.iter().enumerate() {
        let id = BlockId(i as u32);
        let mut nodes = vec![start];
        block_of.insert(start, id);
        let mut cur = start;
        loop {
            let succs = cfg.successors(cur);
            if succs.len() != 1 {
                break;
            }
            let next = succs[0].0;
            let next_preds = cfg.predecessors(next);
            if next_preds.len() != 1 {
                break;
            }
            nodes.push(next);
            block_of.insert(next, id);
            cur = next;
        }
        blocks.push(Block { id, nodes });
    }

    let mut successors: FxHashMap<BlockId, Vec<(BlockId, Completion)>> = FxHashMap::default();
    let mut predecessors: FxHashMap<BlockId, Vec<(BlockId, Completion)>> = FxHashMap::default();
    for block in &blocks {
        let last = block.last();
        for &(succ_node, completion) in cfg.successors(last) {
            if let Some(&succ_block) = block_of.get(&succ_node) {
                successors.entry(block.id).or_default().push((succ_block, completion));
                predecessors.entry(succ_block).or_default().push((block.id, completion));
            }
        }
    }

    let entry = cfg.first.and_then(|f| block_of.get(&f).copied());

    FunctionBlocks {
        blocks,
        entry,
        block_of,
        successors,
        predecessors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cfg as cfg_mod, program, tree as tree_mod};
    use crate::tree::NodeKind;

    fn build(src: &str) -> (tree_mod::Tree, program::Program) {
        let (unit, _) = solang_parser::parse(src, 0).expect("parses");
        let lowered = tree_mod::lower(&unit, vec![src.to_string()]);
        let prog = program::build(&lowered.tree, &lowered.contracts, &lowered.free_functions);
        (lowered.tree, prog)
    }

    fn find_function(prog: &program::Program, name: &str) -> NodeId {
        prog.functions
            .values()
            .find(|f| f.name == name)
            .map(|f| f.node)
            .unwrap()
    }

    #[test]
    fn every_reachable_node_has_exactly_one_block() {
        let (tree, prog) = build(
            r#"
            contract C {
                uint a;
                function f(uint x) public {
                    if (x > 0) { a = 1; } else { a = 2; }
                    a = a + 1;
                }
            }
            "#,
        );
        let f = find_function(&prog, "f");
        let cfg = cfg_mod::build_function_cfg(&tree, &prog, f);
        let blocks = build_function_blocks(&cfg);
        for &node in &cfg.reachable {
            assert!(blocks.is_reachable(node));
            assert!(blocks.basic_block_of(node).is_some());
        }
        let mut recollected: Vec<NodeId> = blocks.blocks.iter().flat_map(|b| b.nodes.clone()).collect();
        recollected.sort_unstable();
        assert_eq!(recollected, cfg.reachable);
    }

    #[test]
    fn if_without_else_merge_block_is_a_join() {
        let (tree, prog) = build(
            r#"
            contract C {
                uint a;
                function f(uint x) public {
                    if (x > 0) { a = 1; }
                    a = a + 1;
                }
            }
            "#,
        );
        let f = find_function(&prog, "f");
        let cfg = cfg_mod::build_function_cfg(&tree, &prog, f);
        let blocks = build_function_blocks(&cfg);
        let if_stmt = tree
            .all_nodes()
            .find(|&id| matches!(tree.kind(id), NodeKind::IfStatement))
            .unwrap();
        let merge_node = tree.if_condition(if_stmt);
        let merge_block = blocks.basic_block_of(merge_node).unwrap();
        assert!(blocks.is_condition_block(merge_block));
    }
}
