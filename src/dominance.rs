// SPDX-License-Identifier: Apache-2.0

//! Dominance, post-dominance, dominance frontiers and natural loops over a
//! function's basic-block graph (spec.md §4.3).
//!
//! The original tool's `dominates` is a universally-quantified recursive
//! definition that doesn't terminate as a naive fixpoint over cyclic CFGs
//! (spec.md Design Notes §9, first Open Question). We instead compute
//! immediate dominators with the standard iterative algorithm via
//! [`petgraph::algo::dominators`] — `petgraph` is already a declared
//! dependency of the teacher crate (unexercised in its own core); this is
//! the one place in `sol-analysis` that actually puts it to work, fed by
//! the block graph `blocks::FunctionBlocks` computed just before it.

use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::NodeIndex;
use petgraph::visit::Reversed;
use petgraph::Graph;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::blocks::{BlockId, FunctionBlocks};

/// A virtual node appended to the post-dominance graph so every exit
/// block has a single common successor to root the reverse dominator
/// computation at (spec.md §4.3: "Post-dominance is the dual over the
/// reverse graph rooted at exits").
const VIRTUAL_EXIT: BlockId = BlockId(u32::MAX);

pub struct Dominance {
    entry: BlockId,
    idx_of: FxHashMap<BlockId, NodeIndex>,
    block_of_idx: FxHashMap<NodeIndex, BlockId>,
    forward: Dominators<NodeIndex>,
    post_idx_of: FxHashMap<BlockId, NodeIndex>,
    post_block_of_idx: FxHashMap<NodeIndex, BlockId>,
    post: Option<Dominators<NodeIndex>>,
}

impl Dominance {
    pub fn dominates(&self, d: BlockId, n: BlockId) -> bool {
        if d == n {
            return true;
        }
        self.strictly_dominates(d, n)
    }

    pub fn strictly_dominates(&self, d: BlockId, n: BlockId) -> bool {
        let (Some(&di), Some(&ni)) = (self.idx_of.get(&d), self.idx_of.get(&n)) else {
            return false;
        };
        self.forward
            .strict_dominators(ni)
            .map(|mut it| it.any(|a| a == di))
            .unwrap_or(false)
    }

    pub fn immediate_dominator(&self, n: BlockId) -> Option<BlockId> {
        let &ni = self.idx_of.get(&n)?;
        if ni == self.forward.root() {
            return None;
        }
        let idom = self.forward.immediate_dominator(ni)?;
        self.block_of_idx.get(&idom).copied()
    }

    pub fn post_dominates(&self, d: BlockId, n: BlockId) -> bool {
        if d == n {
            return true;
        }
        let Some(post) = &self.post else { return false };
        let (Some(&di), Some(&ni)) = (self.post_idx_of.get(&d), self.post_idx_of.get(&n)) else {
            return false;
        };
        post.strict_dominators(ni)
            .map(|mut it| it.any(|a| a == di))
            .unwrap_or(false)
    }

    /// Dominance frontier of `d`: blocks `f` such that `d` dominates a
    /// predecessor of `f` but does not strictly dominate `f` (spec.md
    /// §4.3), computed via the standard Cytron et al. algorithm over
    /// `blocks_fn`'s predecessor edges.
    pub fn dominance_frontier(&self, blocks_fn: &FunctionBlocks, d: BlockId) -> FxHashSet<BlockId> {
        compute_all_frontiers(self, blocks_fn)
            .get(&d)
            .cloned()
            .unwrap_or_default()
    }

    /// Iterated dominance frontier of a set of blocks: the transitive
    /// closure of `dominance_frontier` (spec.md §4.3, used by SSA phi
    /// placement).
    pub fn iterated_dominance_frontier(
        &self,
        blocks_fn: &FunctionBlocks,
        seeds: &[BlockId],
    ) -> FxHashSet<BlockId> {
        let frontiers = compute_all_frontiers(self, blocks_fn);
        let mut result: FxHashSet<BlockId> = FxHashSet::default();
        let mut worklist: Vec<BlockId> = seeds.to_vec();
        while let Some(b) = worklist.pop() {
            if let Some(f) = frontiers.get(&b) {
                for &n in f {
                    if result.insert(n) {
                        worklist.push(n);
                    }
                }
            }
        }
        result
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }
}

/// Standard dominance-frontier algorithm (Cytron, Ferrante, Rosen, Wegman
/// & Zadeck): for each block `b` with ≥2 predecessors, walk each
/// predecessor `p` up the dominator tree (via `immediate_dominator`)
/// until reaching `idom(b)`, adding `b` to every visited block's
/// frontier.
fn compute_all_frontiers(
    dom: &Dominance,
    blocks_fn: &FunctionBlocks,
) -> FxHashMap<BlockId, FxHashSet<BlockId>> {
    let mut frontiers: FxHashMap<BlockId, FxHashSet<BlockId>> = FxHashMap::default();
    for block in &blocks_fn.blocks {
        let b = block.id;
        let preds = blocks_fn.predecessors(b);
        if preds.len() < 2 {
            continue;
        }
        let idom_b = dom.immediate_dominator(b);
        for &(p, _) in preds {
            let mut runner = Some(p);
            while let Some(r) = runner {
                if Some(r) == idom_b {
                    break;
                }
                frontiers.entry(r).or_default().insert(b);
                runner = dom.immediate_dominator(r);
            }
        }
    }
    frontiers
}

/// A natural loop identified by a back edge `tail -> head` where `head`
/// dominates `tail` (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct NaturalLoop {
    pub header: BlockId,
    pub tail: BlockId,
    /// Every block in the loop body, including header and tail.
    pub body: FxHashSet<BlockId>,
}

/// Builds [`Dominance`] from a function's basic-block graph. `exits` is
/// `blocks_fn.blocks` filtered to those containing a CFG exit node.
pub fn build_dominance(blocks_fn: &FunctionBlocks, exit_blocks: &[BlockId]) -> Option<Dominance> {
    let entry = blocks_fn.entry?;

    let mut graph: Graph<(), ()> = Graph::new();
    let mut idx_of = FxHashMap::default();
    let mut block_of_idx = FxHashMap::default();
    for block in &blocks_fn.blocks {
        let idx = graph.add_node(());
        idx_of.insert(block.id, idx);
        block_of_idx.insert(idx, block.id);
    }
    for block in &blocks_fn.blocks {
        for &(succ, _) in blocks_fn.successors(block.id) {
            graph.add_edge(idx_of[&block.id], idx_of[&succ], ());
        }
    }
    let entry_idx = *idx_of.get(&entry)?;
    let forward = dominators::simple_fast(&graph, entry_idx);

    // Post-dominance: reverse graph rooted at a synthetic super-exit
    // connected from every exit block.
    let mut post_graph: Graph<(), ()> = graph.clone();
    let mut post_idx_of = idx_of.clone();
    let mut post_block_of_idx = block_of_idx.clone();
    let virtual_idx = post_graph.add_node(());
    post_idx_of.insert(VIRTUAL_EXIT, virtual_idx);
    post_block_of_idx.insert(virtual_idx, VIRTUAL_EXIT);
    for &exit in exit_blocks {
        if let Some(&exit_idx) = idx_of.get(&exit) {
            post_graph.add_edge(exit_idx, virtual_idx, ());
        }
    }
    let post = if exit_blocks.is_empty() {
        None
    } else {
        Some(dominators::simple_fast(
            &Reversed(&post_graph),
            virtual_idx,
        ))
    };

    Some(Dominance {
        entry,
        idx_of,
        block_of_idx,
        forward,
        post_idx_of,
        post_block_of_idx,
        post,
    })
}

/// Back edges `(tail, head)` where `head` dominates `tail` (spec.md
/// §4.3), in ascending `(tail, head)` order for determinism.
pub fn back_edges(blocks_fn: &FunctionBlocks, dom: &Dominance) -> Vec<(BlockId, BlockId)> {
    let mut out = Vec::new();
    for block in &blocks_fn.blocks {
        let tail = block.id;
        for &(succ, _) in blocks_fn.successors(tail) {
            if dom.dominates(succ, tail) {
                out.push((tail, succ));
            }
        }
    }
    out.sort_by_key(|(t, h)| (t.0, h.0));
    out
}

/// Natural loops for every back edge (spec.md §4.3): the body is the set
/// of blocks that can reach `tail` without passing through `head`
/// (standard algorithm), intersected with blocks dominated by `head`.
/// Nesting is by set containment, left to the caller to derive.
///
/// Collection is capped at `max_loop_body_size` blocks
/// (`AnalysisOptions::max_loop_body_size`, spec.md §7 "resource
/// exhaustion": a worklist bound, not a crash — a loop body can never
/// actually exceed the function's own block count, so this only guards
/// against a malformed/cyclic block graph from an upstream defect).
pub fn natural_loops(blocks_fn: &FunctionBlocks, dom: &Dominance, max_loop_body_size: usize) -> Vec<NaturalLoop> {
    back_edges(blocks_fn, dom)
        .into_iter()
        .map(|(tail, head)| {
            let mut body: FxHashSet<BlockId> = FxHashSet::default();
            body.insert(head);
            body.insert(tail);
            let mut stack = vec![tail];
            while let Some(b) = stack.pop() {
                if body.len() >= max_loop_body_size {
                    break;
                }
                for &(pred, _) in blocks_fn.predecessors(b) {
                    if pred == head {
                        continue;
                    }
                    if body.len() >= max_loop_body_size {
                        break;
                    }
                    if dom.dominates(head, pred) && body.insert(pred) {
                        stack.push(pred);
                    }
                }
            }
            NaturalLoop { header: head, tail, body }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blocks as blocks_mod, cfg as cfg_mod, program, tree as tree_mod};

    fn build(src: &str) -> (tree_mod::Tree, program::Program) {
        let (unit, _) = solang_parser::parse(src, 0).expect("parses");
        let lowered = tree_mod::lower(&unit, vec![src.to_string()]);
        let prog = program::build(&lowered.tree, &lowered.contracts, &lowered.free_functions);
        (lowered.tree, prog)
    }

    fn find_function(prog: &program::Program, name: &str) -> crate::tree::NodeId {
        prog.functions
            .values()
            .find(|f| f.name == name)
            .map(|f| f.node)
            .unwrap()
    }

    fn exit_blocks(cfg: &cfg_mod::FunctionCfg, blocks_fn: &blocks_mod::FunctionBlocks) -> Vec<BlockId> {
        let exit_set: FxHashSet<_> = cfg.exits.iter().copied().collect();
        blocks_fn
            .blocks
            .iter()
            .filter(|b| exit_set.contains(&b.last()))
            .map(|b| b.id)
            .collect()
    }

    #[test]
    fn if_else_merge_is_dominated_by_condition_only() {
        let (tree, prog) = build(
            r#"
            contract C {
                uint a;
                uint b;
                function f(uint x) public {
                    if (x > 0) { a = 1; } else { a = 2; }
                    b = a;
                }
            }
            "#,
        );
        let f = find_function(&prog, "f");
        let cfg = cfg_mod::build_function_cfg(&tree, &prog, f);
        let blocks_fn = blocks_mod::build_function_blocks(&cfg);
        let exits = exit_blocks(&cfg, &blocks_fn);
        let dom = build_dominance(&blocks_fn, &exits).unwrap();

        let cond_node = tree
            .all_nodes()
            .find(|&id| matches!(tree.kind(id), tree_mod::NodeKind::IfStatement))
            .map(|id| tree.if_condition(id))
            .unwrap();
        let cond_block = blocks_fn.basic_block_of(cond_node).unwrap();
        let entry_block = dom.entry();
        assert!(dom.dominates(entry_block, cond_block));
        assert!(!dom.strictly_dominates(cond_block, cond_block));
    }

    #[test]
    fn for_loop_produces_one_back_edge_and_one_natural_loop() {
        let (tree, prog) = build(
            r#"
            contract C {
                uint s;
                function f(uint n) public {
                    for (uint i = 0; i < n; i++) { s += i; }
                }
            }
            "#,
        );
        let f = find_function(&prog, "f");
        let cfg = cfg_mod::build_function_cfg(&tree, &prog, f);
        let blocks_fn = blocks_mod::build_function_blocks(&cfg);
        let exits = exit_blocks(&cfg, &blocks_fn);
        let dom = build_dominance(&blocks_fn, &exits).unwrap();

        let edges = back_edges(&blocks_fn, &dom);
        assert_eq!(edges.len(), 1);
        let loops = natural_loops(&blocks_fn, &dom, 100_000);
        assert_eq!(loops.len(), 1);
        assert!(loops[0].body.len() >= 2);
    }
}
