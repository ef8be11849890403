// SPDX-License-Identifier: Apache-2.0

//! Static single assignment: source variables, definitions, phi placement
//! over the dominance frontier, and reaching-definition / use-def chains
//! (spec.md §4.5).
//!
//! The reaching-definition dataflow is grounded on the same Gen/Kill
//! worklist shape as `codegen::reaching_definitions::find` in the
//! teacher — a monotone fixpoint over `IndexMap<Var, Set<Def>>` per block
//! — generalized from the teacher's numbered temporaries to named source
//! variables and extended with phi placement, which the teacher's own
//! (non-SSA) codegen IR never needed.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::blocks::{BlockId, FunctionBlocks};
use crate::callgraph;
use crate::cfg::FunctionCfg;
use crate::dominance::Dominance;
use crate::program::Program;
use crate::tree::{NodeId, NodeKind, Tree};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub u32);

/// A source variable's owning scope (spec.md §4.5: "local
/// VariableDeclaration, Parameter, StateVariableDeclaration... identified
/// by (owning scope, name)").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarScope {
    /// Owned by one function (locals and parameters).
    Function(NodeId),
    /// Owned by a contract (state variables); shared across every
    /// function of that contract and its subclasses.
    Contract(NodeId),
}

#[derive(Clone, Debug)]
pub struct SourceVar {
    pub scope: VarScope,
    pub name: String,
    /// The `VariableDeclaration`/`Parameter`/`StateVariableDeclaration`
    /// node this variable is declared at.
    pub decl: NodeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefKind {
    Assignment,
    AugmentedAssignment,
    DeclarationWithInit,
    Parameter,
    Phi,
}

#[derive(Clone, Debug)]
pub struct Definition {
    pub kind: DefKind,
    pub var: VarId,
    /// The defining syntax node; `None` only for `Phi` definitions, whose
    /// "node" is the basic block itself (spec.md §3: "each carrying its
    /// defining syntax node (or the basic block, for phi)").
    pub node: Option<NodeId>,
    /// The phi's block; `None` for every non-phi kind except a state
    /// variable's externally-seeded initial definition, which belongs to
    /// no block within this function (see [`FunctionSsa::build`]).
    pub block: Option<BlockId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub node: NodeId,
    pub var: VarId,
}

/// One function's SSA-derived tables: variables, definitions (including
/// phis), reaching-definition sets per block, and use-def/def-use chains.
pub struct FunctionSsa {
    pub vars: Vec<SourceVar>,
    pub defs: Vec<Definition>,
    pub uses: Vec<Use>,
    var_index: FxHashMap<(VarScopeKey, String), VarId>,
    reaching_def: FxHashMap<(VarId, BlockId), FxHashSet<DefId>>,
    phi_inputs: FxHashMap<DefId, Vec<DefId>>,
    use_rd: FxHashMap<NodeId, FxHashSet<DefId>>,
    def_uses: FxHashMap<DefId, Vec<NodeId>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum VarScopeKey {
    Function(NodeId),
    Contract(NodeId),
}

impl FunctionSsa {
    pub fn var(&self, id: VarId) -> &SourceVar {
        &self.vars[id.0 as usize]
    }
    pub fn def(&self, id: DefId) -> &Definition {
        &self.defs[id.0 as usize]
    }

    pub fn ssa_definitions(&self) -> impl Iterator<Item = DefId> + '_ {
        (0..self.defs.len()).map(|i| DefId(i as u32))
    }

    /// `reaching_def(var, block)` (spec.md §4.5): the set of definitions
    /// reaching the *end* of `block` for `var`.
    pub fn reaching_def(&self, var: VarId, block: BlockId) -> FxHashSet<DefId> {
        self.reaching_def.get(&(var, block)).cloned().unwrap_or_default()
    }

    /// The reaching definition(s) for a specific use occurrence, which
    /// may differ from `reaching_def(var, block_of(use))` when the use
    /// precedes a later same-block redefinition of `var`.
    pub fn reaching_def_at_use(&self, use_node: NodeId) -> FxHashSet<DefId> {
        self.use_rd.get(&use_node).cloned().unwrap_or_default()
    }

    pub fn uses_of(&self, def: DefId) -> &[NodeId] {
        self.def_uses.get(&def).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn phi_inputs(&self, phi: DefId) -> &[DefId] {
        self.phi_inputs.get(&phi).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Looks up a variable already interned under `scope` by name.
    pub fn var_named(&self, scope: VarScope, name: &str) -> Option<VarId> {
        let key = match scope {
            VarScope::Function(f) => VarScopeKey::Function(f),
            VarScope::Contract(c) => VarScopeKey::Contract(c),
        };
        self.var_index.get(&(key, name.to_string())).copied()
    }
}

/// Is `node` a use of a source variable (spec.md §4.5: "an Identifier
/// whose text equals a source variable's name and is not on the left of
/// an assignment to that variable")? Also excludes a declared name's own
/// `Identifier` occurrence in its `VariableDeclarationStatement`.
fn is_use_position(tree: &Tree, node: NodeId) -> bool {
    if tree.kind(node) != NodeKind::Identifier {
        return false;
    }
    let Some(parent) = tree.parent(node) else {
        return true;
    };
    match tree.kind(parent) {
        NodeKind::AssignmentExpression(op) if !op.is_augmented() => tree.assign_left(parent) != node,
        NodeKind::VariableDeclarationStatement => !tree.declared_vars(parent).contains(&node),
        NodeKind::TupleExpression => {
            // A tuple appearing as an assignment's LHS names targets, not
            // uses (SPEC_FULL §5 tuple-assignment support); elsewhere
            // (e.g. a plain tuple expression) its identifiers are uses.
            let is_assign_lhs = tree.parent(parent).is_some_and(|gp| {
                matches!(tree.kind(gp), NodeKind::AssignmentExpression(a) if !a.is_augmented())
                    && tree.assign_left(gp) == parent
            });
            !is_assign_lhs
        }
        _ => true,
    }
}

/// Assignment targets of a (possibly tuple) LHS: a plain `Identifier`, or
/// each named slot of a `TupleExpression` destructuring assignment
/// (SPEC_FULL §5).
fn assignment_targets(tree: &Tree, lhs: NodeId) -> Vec<NodeId> {
    match tree.kind(lhs) {
        NodeKind::Identifier => vec![lhs],
        NodeKind::TupleExpression => tree
            .children(lhs)
            .iter()
            .copied()
            .filter(|&c| matches!(tree.kind(c), NodeKind::Identifier) && tree.text(c).is_some())
            .collect(),
        _ => Vec::new(),
    }
}

/// Accumulates interned [`SourceVar`]s while walking a function's state
/// variables, parameters and locals.
#[derive(Default)]
struct Builder {
    vars: Vec<SourceVar>,
    var_index: FxHashMap<(VarScopeKey, String), VarId>,
}

impl Builder {
    fn intern(&mut self, scope: VarScope, name: &str, decl: NodeId) -> VarId {
        let key = match scope {
            VarScope::Function(f) => (VarScopeKey::Function(f), name.to_string()),
            VarScope::Contract(c) => (VarScopeKey::Contract(c), name.to_string()),
        };
        if let Some(&id) = self.var_index.get(&key) {
            return id;
        }
        let id = VarId(self.vars.len() as u32);
        self.vars.push(SourceVar {
            scope,
            name: name.to_string(),
            decl,
        });
        self.var_index.insert(key, id);
        id
    }
}

/// Builds the SSA tables for one function entry, given its already-built
/// CFG, basic-block partition and dominance.
pub fn build_function_ssa(
    tree: &Tree,
    program: &Program,
    cfg: &FunctionCfg,
    blocks_fn: &FunctionBlocks,
    dom: Option<&Dominance>,
    entry: NodeId,
) -> FunctionSsa {
    let mut b = Builder::default();

    let decl = program.functions.get(&entry);
    let contract = decl.and_then(|d| d.contract);

    // State variables: walk the inheritance chain least-derived first so
    // a more-derived declaration of the same name overwrites the earlier
    // `VarId` mapping (name-based shadowing, spec.md Non-goals).
    if let Some(c) = contract {
        let mut chain = callgraph::inheritance_chain(program, c);
        chain.reverse();
        for anc in chain {
            if let Some(cd) = program.contracts.get(&anc) {
                for &sv in &cd.state_vars {
                    if let Some(vd) = program.variables.get(&sv) {
                        b.intern(VarScope::Contract(c), &vd.name, sv);
                    }
                }
            }
        }
    }

    // Parameters.
    let params: Vec<NodeId> = decl.map(|d| d.params.clone()).unwrap_or_default();
    for &p in &params {
        if let Some(name) = tree.text(p) {
            b.intern(VarScope::Function(entry), name, p);
        }
    }

    // Locals: every `VariableDeclarationStatement` reachable in this
    // function's CFG.
    for &node in &cfg.reachable {
        if tree.kind(node) == NodeKind::VariableDeclarationStatement {
            for &v in tree.declared_vars(node) {
                if let Some(name) = tree.text(v) {
                    b.intern(VarScope::Function(entry), name, v);
                }
            }
        }
    }

    let Builder { vars, var_index, .. } = b;

    let mut defs: Vec<Definition> = Vec::new();
    let mut def_at_node: FxHashMap<(NodeId, VarId), DefId> = FxHashMap::default();
    let mut def_blocks: FxHashMap<VarId, FxHashSet<BlockId>> = FxHashMap::default();

    let mut push_def = |defs: &mut Vec<Definition>, kind: DefKind, var: VarId, node: Option<NodeId>, block: Option<BlockId>| -> DefId {
        let id = DefId(defs.len() as u32);
        defs.push(Definition { kind, var, node, block });
        id
    };

    let resolve_name = |entry: NodeId, name: &str| -> Option<VarId> {
        if let Some(&id) = var_index.get(&(VarScopeKey::Function(entry), name.to_string())) {
            return Some(id);
        }
        if let Some(c) = contract {
            if let Some(&id) = var_index.get(&(VarScopeKey::Contract(c), name.to_string())) {
                return Some(id);
            }
        }
        None
    };

    // State variables get an externally-seeded initial definition
    // (representing Solidity's implicit zero value), so every use
    // reaches at least one definition even absent an in-function write
    // (spec.md §8 testable property).
    let mut seed_defs: FxHashMap<VarId, DefId> = FxHashMap::default();
    if let Some(c) = contract {
        for (&(scope_key, _), &var) in var_index.iter() {
            if scope_key == VarScopeKey::Contract(c) {
                let decl_node = vars[var.0 as usize].decl;
                let id = push_def(&mut defs, DefKind::DeclarationWithInit, var, Some(decl_node), None);
                seed_defs.insert(var, id);
            }
        }
    }

    let entry_block = blocks_fn.entry;
    for &p in &params {
        if let Some(name) = tree.text(p) {
            if let Some(var) = resolve_name(entry, name) {
                let id = push_def(&mut defs, DefKind::Parameter, var, Some(p), entry_block);
                def_at_node.insert((p, var), id);
                if let Some(eb) = entry_block {
                    seed_defs.insert(var, id);
                    def_blocks.entry(var).or_default().insert(eb);
                }
            }
        }
    }

    for &node in &cfg.reachable {
        let block = blocks_fn.basic_block_of(node);
        match tree.kind(node) {
            NodeKind::VariableDeclarationStatement => {
                if tree.var_decl_stmt_init(node).is_some() {
                    for &v in tree.declared_vars(node) {
                        if let Some(name) = tree.text(v) {
                            if let Some(var) = resolve_name(entry, name) {
                                let id = push_def(&mut defs, DefKind::DeclarationWithInit, var, Some(node), block);
                                def_at_node.insert((node, var), id);
                                if let Some(bl) = block {
                                    def_blocks.entry(var).or_default().insert(bl);
                                }
                            }
                        }
                    }
                }
            }
            NodeKind::AssignmentExpression(op) => {
                let lhs = tree.assign_left(node);
                for target in assignment_targets(tree, lhs) {
                    if let Some(name) = tree.text(target) {
                        if let Some(var) = resolve_name(entry, name) {
                            let kind = if op.is_augmented() {
                                DefKind::AugmentedAssignment
                            } else {
                                DefKind::Assignment
                            };
                            let id = push_def(&mut defs, kind, var, Some(node), block);
                            def_at_node.insert((node, var), id);
                            if let Some(bl) = block {
                                def_blocks.entry(var).or_default().insert(bl);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // Phi placement: the iterated dominance frontier of each variable's
    // definition blocks (spec.md §4.5 — "an implementation may
    // equivalently use the classical iterated-dominance-frontier
    // algorithm").
    let mut phi_at: FxHashMap<(VarId, BlockId), DefId> = FxHashMap::default();
    let mut block_phis: FxHashMap<BlockId, Vec<(VarId, DefId)>> = FxHashMap::default();
    if let Some(dom) = dom {
        for (&var, def_bs) in &def_blocks {
            let seeds: Vec<BlockId> = def_bs.iter().copied().collect();
            let frontier = dom.iterated_dominance_frontier(blocks_fn, &seeds);
            let mut frontier_sorted: Vec<BlockId> = frontier.into_iter().collect();
            frontier_sorted.sort_by_key(|b| b.0);
            for b in frontier_sorted {
                if blocks_fn.predecessors(b).len() < 2 {
                    continue;
                }
                let id = push_def(&mut defs, DefKind::Phi, var, None, Some(b));
                phi_at.insert((var, b), id);
                block_phis.entry(b).or_default().push((var, id));
            }
        }
    }

    // Index definitions by their defining node (a tuple-assignment node
    // can define several variables at once), so both the per-block gen
    // computation below and the final use-resolution pass can walk each
    // block's node list once instead of scanning all definitions.
    let mut defs_by_node: FxHashMap<NodeId, Vec<(VarId, DefId)>> = FxHashMap::default();
    for (&(node, var), &did) in &def_at_node {
        defs_by_node.entry(node).or_default().push((var, did));
    }

    // Per-block "gen" def: the local non-phi def that shadows everything
    // upstream (rule 1), else the phi (rule 2), else pass-through (rules
    // 3/4) — computed once, then fed into the worklist fixpoint below,
    // exactly mirroring `reaching_definitions::find`'s Gen/Kill shape.
    let mut block_gen: FxHashMap<(VarId, BlockId), DefId> = FxHashMap::default();
    for block in &blocks_fn.blocks {
        let mut last_in_block: FxHashMap<VarId, DefId> = FxHashMap::default();
        for &node in &block.nodes {
            if let Some(here) = defs_by_node.get(&node) {
                for &(dvar, did) in here {
                    last_in_block.insert(dvar, did);
                }
            }
        }
        for (var, did) in last_in_block {
            block_gen.insert((var, block.id), did);
        }
        if let Some(phis) = block_phis.get(&block.id) {
            for &(var, did) in phis {
                block_gen.entry((var, block.id)).or_insert(did);
            }
        }
    }

    let all_vars: Vec<VarId> = (0..vars.len() as u32).map(VarId).collect();

    // Worklist dataflow: out[b][v] is the set of definitions reaching the
    // end of b; in[b][v] is the merge of predecessors' out sets (plus the
    // seeded parameter/state-variable definitions at the entry block).
    let mut out_sets: FxHashMap<BlockId, IndexMap<VarId, FxHashSet<DefId>>> = FxHashMap::default();
    for block in &blocks_fn.blocks {
        out_sets.insert(block.id, IndexMap::new());
    }
    let mut worklist: std::collections::VecDeque<BlockId> =
        blocks_fn.blocks.iter().map(|b| b.id).collect();
    let mut in_sets: FxHashMap<BlockId, IndexMap<VarId, FxHashSet<DefId>>> = FxHashMap::default();

    while let Some(b) = worklist.pop_front() {
        let mut merged: IndexMap<VarId, FxHashSet<DefId>> = IndexMap::new();
        if Some(b) == entry_block {
            for (&var, &did) in &seed_defs {
                merged.entry(var).or_default().insert(did);
            }
        }
        for &(pred, _) in blocks_fn.predecessors(b) {
            if let Some(pred_out) = out_sets.get(&pred) {
                for (&var, defs_set) in pred_out {
                    merged.entry(var).or_default().extend(defs_set.iter().copied());
                }
            }
        }
        in_sets.insert(b, merged.clone());

        let mut new_out = merged;
        for &var in &all_vars {
            if let Some(&gen_def) = block_gen.get(&(var, b)) {
                let mut single = FxHashSet::default();
                single.insert(gen_def);
                new_out.insert(var, single);
            }
        }

        let changed = out_sets.get(&b).map(|old| old != &new_out).unwrap_or(true);
        if changed {
            out_sets.insert(b, new_out);
            for &(succ, _) in blocks_fn.successors(b) {
                if !worklist.contains(&succ) {
                    worklist.push_back(succ);
                }
            }
        }
    }

    let mut reaching_def: FxHashMap<(VarId, BlockId), FxHashSet<DefId>> = FxHashMap::default();
    for (&b, out) in &out_sets {
        for (&var, set) in out {
            reaching_def.insert((var, b), set.clone());
        }
    }

    // Phi inputs: one slot per predecessor, drawn from that predecessor's
    // out-set for the phi's variable (spec.md §4.5 "phi inputs").
    let mut phi_inputs: FxHashMap<DefId, Vec<DefId>> = FxHashMap::default();
    for (&(var, b), &phi_id) in &phi_at {
        let mut inputs = Vec::new();
        for &(pred, _) in blocks_fn.predecessors(b) {
            if let Some(set) = out_sets.get(&pred).and_then(|m| m.get(&var)) {
                let mut sorted: Vec<DefId> = set.iter().copied().collect();
                sorted.sort_by_key(|d| d.0);
                if let Some(&first) = sorted.first() {
                    inputs.push(first);
                }
            }
        }
        phi_inputs.insert(phi_id, inputs);
    }

    // Final pass: resolve every use's reaching definition with sequential
    // intra-block precision (a later same-block redefinition shadows an
    // earlier one for uses positioned before it).
    let mut uses: Vec<Use> = Vec::new();
    let mut use_rd: FxHashMap<NodeId, FxHashSet<DefId>> = FxHashMap::default();
    let mut def_uses: FxHashMap<DefId, Vec<NodeId>> = FxHashMap::default();

    for block in &blocks_fn.blocks {
        let block_in = in_sets.get(&block.id).cloned().unwrap_or_default();
        let mut local_current: FxHashMap<VarId, DefId> = FxHashMap::default();
        if let Some(phis) = block_phis.get(&block.id) {
            for &(var, did) in phis {
                local_current.insert(var, did);
            }
        }
        for &node in &block.nodes {
            if is_use_position(tree, node) {
                if let Some(name) = tree.text(node) {
                    if let Some(var) = resolve_name(entry, name) {
                        let rd: FxHashSet<DefId> = match local_current.get(&var) {
                            Some(&d) => std::iter::once(d).collect(),
                            None => block_in.get(&var).cloned().unwrap_or_default(),
                        };
                        uses.push(Use { node, var });
                        use_rd.insert(node, rd.clone());
                        for d in rd {
                            def_uses.entry(d).or_default().push(node);
                        }
                    }
                }
            }
            if let Some(here) = defs_by_node.get(&node) {
                for &(dvar, did) in here {
                    local_current.insert(dvar, did);
                }
            }
        }
    }

    FunctionSsa {
        vars,
        defs,
        uses,
        var_index,
        reaching_def,
        phi_inputs,
        use_rd,
        def_uses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blocks as blocks_mod, cfg as cfg_mod, dominance as dom_mod, program, tree as tree_mod};

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
    fn diamond_merge_gets_phi_with_two_inputs() {
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
        let dom = dom_mod::build_dominance(&blocks_fn, &exits).unwrap();
        let ssa = build_function_ssa(&tree, &prog, &cfg, &blocks_fn, Some(&dom), f);

        let phi = ssa
            .defs
            .iter()
            .enumerate()
            .find(|(_, d)| matches!(d.kind, DefKind::Phi) && ssa.var(d.var).name == "a")
            .map(|(i, _)| DefId(i as u32))
            .expect("expected a phi for `a`");
        assert_eq!(ssa.phi_inputs(phi).len(), 2);
    }

    #[test]
    fn every_use_reaches_at_least_one_definition() {
        let (tree, prog) = build(
            r#"
            contract C {
                uint a;
                function f(uint x) public {
                    uint y = x;
                    a = y;
                }
            }
            "#,
        );
        let f = find_function(&prog, "f");
        let cfg = cfg_mod::build_function_cfg(&tree, &prog, f);
        let blocks_fn = blocks_mod::build_function_blocks(&cfg);
        let exits = exit_blocks(&cfg, &blocks_fn);
        let dom = dom_mod::build_dominance(&blocks_fn, &exits).unwrap();
        let ssa = build_function_ssa(&tree, &prog, &cfg, &blocks_fn, Some(&dom), f);

        assert!(!ssa.uses.is_empty());
        for u in &ssa.uses {
            assert!(
                !ssa.reaching_def_at_use(u.node).is_empty(),
                "use of {:?} has no reaching definition",
                ssa.var(u.var).name
            );
        }
    }
}
