// SPDX-License-Identifier: Apache-2.0

//! Data-flow / taint-tracking framework (spec.md §4.6): the data-flow node
//! model, local/jump/additional step relations, predefined Solidity
//! sources/sinks/sanitizers, and the configurable `reaches`/`has_flow`
//! fixpoint.
//!
//! The fixpoint loop is grounded on the same shape as
//! `codegen::reaching_definitions::find`'s worklist — a monotone relation
//! over a finite domain, iterated to a fixed point — generalized here from
//! a per-block `Vec<bool>` to an arbitrary node-to-node reachability
//! relation, and bounded by an iteration budget per `AnalysisOptions`
//! (spec.md §7 resource exhaustion).

use rustc_hash::{FxHashMap, FxHashSet};

use crate::callgraph::{self, Dispatch};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Level};
use crate::options::AnalysisOptions;
use crate::program::Program;
use crate::ssa::{DefId, DefKind, FunctionSsa};
use crate::tree::{NodeId, NodeKind, Tree};

/// A node in the data-flow graph (spec.md §3 "Data-flow node"). Distinct
/// from a plain [`NodeId`]: the same syntax node can appear under several
/// tags (e.g. a call's argument is both an `Expression` and an
/// `Argument(call, i)`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataFlowNode {
    Expression(NodeId),
    Parameter(NodeId),
    /// `(call, index)`, 0-indexed by source order.
    Argument(NodeId, usize),
    /// The value-producing expression of a `return` statement.
    ReturnValue(NodeId),
    /// The value received at a call site once its callee's return value
    /// reaches it (via [`jump_step_edges`]).
    CallResult(NodeId),
    /// Extension point (Design Notes §9: "present in the node taxonomy
    /// but not exercised by the specified relations"); carried for
    /// forward compatibility with clients that need a distinguished
    /// post-update view of a mutated node.
    PostUpdate(NodeId),
}

/// One direction of a step relation.
pub type Edge = (DataFlowNode, DataFlowNode);

/// The combined data-flow graph for a whole program: every `local_step`,
/// `jump_step` and `additional_taint_step` edge, tagged so `local_flow`
/// can still be answered without the cross-function edges.
#[derive(Default)]
pub struct FlowGraph {
    local: FxHashSet<Edge>,
    jump: FxHashSet<Edge>,
    additional: FxHashSet<Edge>,
    adjacency: FxHashMap<DataFlowNode, Vec<DataFlowNode>>,
}

impl FlowGraph {
    pub fn add_local(&mut self, from: DataFlowNode, to: DataFlowNode) {
        if self.local.insert((from, to)) {
            self.adjacency.entry(from).or_default().push(to);
        }
    }
    pub fn add_jump(&mut self, from: DataFlowNode, to: DataFlowNode) {
        if self.jump.insert((from, to)) {
            self.adjacency.entry(from).or_default().push(to);
        }
    }
    pub fn add_additional(&mut self, from: DataFlowNode, to: DataFlowNode) {
        if self.additional.insert((from, to)) {
            self.adjacency.entry(from).or_default().push(to);
        }
    }

    /// `local_step(n, m)` (spec.md §4.6).
    pub fn local_step(&self, n: DataFlowNode, m: DataFlowNode) -> bool {
        self.local.contains(&(n, m))
    }
    /// `jump_step(n, m)`.
    pub fn jump_step(&self, n: DataFlowNode, m: DataFlowNode) -> bool {
        self.jump.contains(&(n, m))
    }
    /// `additional_taint_step(n, m)`.
    pub fn additional_taint_step(&self, n: DataFlowNode, m: DataFlowNode) -> bool {
        self.additional.contains(&(n, m))
    }
    /// `local_flow(n, m)` (spec.md §6): intra-function step, i.e. local
    /// steps only.
    pub fn local_flow(&self, n: DataFlowNode, m: DataFlowNode) -> bool {
        self.local_step(n, m)
    }
    /// `flow(n, m)`: any step kind.
    pub fn flow(&self, n: DataFlowNode, m: DataFlowNode) -> bool {
        self.local_step(n, m) || self.jump_step(n, m) || self.additional_taint_step(n, m)
    }

    fn successors(&self, n: DataFlowNode) -> &[DataFlowNode] {
        self.adjacency.get(&n).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Per-function local flow edges: expression sub-expression flow plus SSA
/// def-to-use chains (spec.md §4.6 "local flow step").
pub fn local_step_edges(tree: &Tree, ssa: &FunctionSsa, reachable: &[NodeId]) -> Vec<Edge> {
    let mut edges = Vec::new();

    for &node in reachable {
        match tree.kind(node) {
            NodeKind::AssignmentExpression(_) => {
                edges.push((
                    DataFlowNode::Expression(tree.assign_right(node)),
                    DataFlowNode::Expression(node),
                ));
            }
            NodeKind::VariableDeclarationStatement => {
                if let Some(init) = tree.var_decl_stmt_init(node) {
                    edges.push((DataFlowNode::Expression(init), DataFlowNode::Expression(node)));
                }
            }
            NodeKind::CallExpression | NodeKind::NamedCallExpression => {
                for (i, &arg) in tree.call_args(node).iter().enumerate() {
                    edges.push((DataFlowNode::Expression(arg), DataFlowNode::Argument(node, i)));
                }
                // The value received via a resolved callee's return (see
                // `jump_step_edges`) feeds back into this call's own
                // expression-level value, so ordinary expression rules
                // (e.g. the assignment rule above) pick it up unchanged.
                edges.push((DataFlowNode::CallResult(node), DataFlowNode::Expression(node)));
            }
            NodeKind::ReturnStatement => {
                if let Some(value) = tree.return_value(node) {
                    edges.push((DataFlowNode::Expression(value), DataFlowNode::ReturnValue(node)));
                }
            }
            _ => {}
        }
    }

    // Variable-read def-to-use chains through SSA: a definition's value
    // node flows to each use whose reaching definition is it. Phis have
    // no syntax node of their own, so their "value" is the union of
    // their inputs, resolved transitively.
    for u in &ssa.uses {
        for d in ssa.reaching_def_at_use(u.node) {
            for value in def_value_nodes(ssa, d, &mut FxHashSet::default()) {
                edges.push((value, DataFlowNode::Expression(u.node)));
            }
        }
    }

    edges
}

fn def_value_nodes(ssa: &FunctionSsa, def: DefId, visited: &mut FxHashSet<DefId>) -> Vec<DataFlowNode> {
    if !visited.insert(def) {
        return Vec::new();
    }
    let d = ssa.def(def);
    match d.kind {
        DefKind::Phi => ssa
            .phi_inputs(def)
            .iter()
            .flat_map(|&input| def_value_nodes(ssa, input, visited))
            .collect(),
        DefKind::Parameter => d.node.map(DataFlowNode::Parameter).into_iter().collect(),
        DefKind::Assignment | DefKind::AugmentedAssignment | DefKind::DeclarationWithInit => {
            d.node.map(DataFlowNode::Expression).into_iter().collect()
        }
    }
}

/// Cross-function flow for one call site already classified and resolved
/// to a concrete callee function.
pub struct ResolvedCall {
    pub call: NodeId,
    pub callee: NodeId,
    /// `true` for a `using`-directive dispatch, where the object itself
    /// binds the callee's first parameter (SPEC_FULL §5).
    pub object: Option<NodeId>,
}

/// `jump_step` edges (spec.md §4.6): argument → callee parameter, and
/// callee return-value → call-result, for every resolved call site.
pub fn jump_step_edges(
    tree: &Tree,
    program: &Program,
    resolved_calls: &[ResolvedCall],
    return_values: &FxHashMap<NodeId, Vec<NodeId>>,
) -> Vec<Edge> {
    let mut edges = Vec::new();
    for rc in resolved_calls {
        let Some(decl) = program.functions.get(&rc.callee) else {
            continue;
        };
        let args = tree.call_args(rc.call);
        let mut params = decl.params.iter();
        if let Some(object) = rc.object {
            if let Some(&p0) = params.next() {
                edges.push((DataFlowNode::Expression(object), DataFlowNode::Parameter(p0)));
            }
        }
        for (i, &param) in params.enumerate() {
            if let Some(&arg) = args.get(i) {
                edges.push((DataFlowNode::Argument(rc.call, i), DataFlowNode::Parameter(param)));
                let _ = arg;
            }
        }
        if let Some(returns) = return_values.get(&rc.callee) {
            for &stmt in returns {
                edges.push((DataFlowNode::ReturnValue(stmt), DataFlowNode::CallResult(rc.call)));
            }
        }
    }
    edges
}

/// `additional_taint_step` edges (spec.md §4.6): non-value-preserving
/// propagations the engine must still track for taint purposes.
pub fn additional_taint_step_edges(tree: &Tree, program: &Program, caller_contract: Option<NodeId>, reachable: &[NodeId]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for &node in reachable {
        match tree.kind(node) {
            NodeKind::ArrayAccess => {
                if let Some(index) = tree.index_index(node) {
                    edges.push((DataFlowNode::Expression(index), DataFlowNode::Expression(node)));
                }
            }
            NodeKind::MemberExpression => {
                let object = tree.member_object(node);
                edges.push((DataFlowNode::Expression(object), DataFlowNode::Expression(node)));
            }
            NodeKind::CallExpression | NodeKind::NamedCallExpression => {
                if let Some(callee) = tree.call_callee(node) {
                    if let NodeKind::Identifier = tree.kind(callee) {
                        if matches!(tree.text(callee), Some("keccak256") | Some("sha256") | Some("sha3")) {
                            for &arg in tree.call_args(node) {
                                edges.push((DataFlowNode::Expression(arg), DataFlowNode::Expression(node)));
                            }
                        }
                    }
                }
                if is_propagating_library_call(tree, program, caller_contract, node) {
                    for &arg in tree.call_args(node) {
                        edges.push((DataFlowNode::Expression(arg), DataFlowNode::Expression(node)));
                    }
                }
            }
            _ => {}
        }
    }
    edges
}

fn is_propagating_library_call(tree: &Tree, program: &Program, caller_contract: Option<NodeId>, call: NodeId) -> bool {
    let Some(callee) = tree.call_callee(call) else { return false };
    let NodeKind::MemberExpression = tree.kind(callee) else { return false };
    let object = tree.member_object(callee);
    let member = tree.member_name(callee);
    let Some(contract) = caller_contract else { return false };
    let var_types = FxHashMap::default();
    match callgraph::classify_call(program, tree, Some(contract), call, &var_types) {
        Dispatch::LibraryUsing { library, .. } => program
            .contracts
            .get(&library)
            .map(|c| callgraph::known_library_entry(&c.name, member).map(|e| e.propagates).unwrap_or(false))
            .unwrap_or(false),
        _ => {
            if let NodeKind::Identifier = tree.kind(object) {
                let lib = tree.text(object).unwrap_or_default();
                return callgraph::known_library_entry(lib, member).map(|e| e.propagates).unwrap_or(false);
            }
            false
        }
    }
}

/// `is_sanitizer` for a library call flagged as sanitizing in the
/// known-library table.
pub fn is_library_sanitizer(tree: &Tree, call: NodeId) -> bool {
    let Some(callee) = tree.call_callee(call) else { return false };
    let NodeKind::MemberExpression = tree.kind(callee) else { return false };
    let object = tree.member_object(callee);
    let member = tree.member_name(callee);
    if let NodeKind::Identifier = tree.kind(object) {
        let lib = tree.text(object).unwrap_or_default();
        return callgraph::known_library_entry(lib, member).map(|e| e.sanitizes).unwrap_or(false);
    }
    false
}

/// Predefined sources (spec.md §4.6): `msg.sender`/`msg.value`/`msg.data`,
/// `tx.origin`, `block.timestamp`, a function parameter, or an
/// external-call result.
pub fn is_predefined_source(tree: &Tree, node: DataFlowNode) -> bool {
    match node {
        DataFlowNode::Parameter(_) => true,
        DataFlowNode::CallResult(_) => true,
        DataFlowNode::Expression(n) => is_well_known_global(tree, n),
        _ => false,
    }
}

fn is_well_known_global(tree: &Tree, n: NodeId) -> bool {
    if tree.kind(n) != NodeKind::MemberExpression {
        return false;
    }
    let object = tree.member_object(n);
    let member = tree.member_name(n);
    if tree.kind(object) != NodeKind::Identifier {
        return false;
    }
    match (tree.text(object).unwrap_or_default(), member) {
        ("msg", "sender" | "value" | "data") => true,
        ("tx", "origin") => true,
        ("block", "timestamp") => true,
        _ => false,
    }
}

/// Predefined sinks (spec.md §4.6): low-level call target/data,
/// `selfdestruct` argument, ether-transfer amount, array index, and the
/// right-hand side of a state-variable assignment.
pub fn is_predefined_sink(
    tree: &Tree,
    program: &Program,
    caller_contract: Option<NodeId>,
    var_types: &FxHashMap<String, String>,
    node: DataFlowNode,
) -> bool {
    match node {
        DataFlowNode::Argument(call, _) => {
            let Some(contract) = caller_contract else { return false };
            matches!(
                callgraph::classify_call(program, tree, Some(contract), call, var_types),
                Dispatch::LowLevelCall | Dispatch::Delegatecall | Dispatch::Staticcall | Dispatch::Transfer
            )
        }
        DataFlowNode::Expression(n) => {
            if is_selfdestruct_argument(tree, n) {
                return true;
            }
            if is_state_variable_assignment_rhs(tree, program, n) {
                return true;
            }
            if let Some(parent) = tree.parent(n) {
                if tree.kind(parent) == NodeKind::ArrayAccess && tree.index_index(parent) == Some(n) {
                    return true;
                }
            }
            false
        }
        _ => false,
    }
}

fn is_selfdestruct_argument(tree: &Tree, n: NodeId) -> bool {
    let Some(parent) = tree.parent(n) else { return false };
    if !matches!(tree.kind(parent), NodeKind::CallExpression | NodeKind::NamedCallExpression) {
        return false;
    }
    let Some(callee) = tree.call_callee(parent) else { return false };
    if tree.kind(callee) != NodeKind::Identifier {
        return false;
    }
    matches!(tree.text(callee), Some("selfdestruct") | Some("suicide")) && tree.call_args(parent).contains(&n)
}

fn is_state_variable_assignment_rhs(tree: &Tree, program: &Program, n: NodeId) -> bool {
    let Some(parent) = tree.parent(n) else { return false };
    let NodeKind::AssignmentExpression(_) = tree.kind(parent) else { return false };
    if tree.assign_right(parent) != n {
        return false;
    }
    let lhs = tree.assign_left(parent);
    if tree.kind(lhs) != NodeKind::Identifier {
        return false;
    }
    let Some(name) = tree.text(lhs) else { return false };
    program.variables.values().any(|v| v.contract.is_some() && v.name == name)
}

/// Predefined sanitizers (spec.md §4.6): the argument of `require`/
/// `assert`, the left side of a `msg.sender` owner-comparison guard, or
/// any node inside a function guarded by a reentrancy-guard modifier.
pub fn is_predefined_sanitizer(tree: &Tree, program: &Program, guarded_functions: &FxHashSet<NodeId>, node: DataFlowNode) -> bool {
    let DataFlowNode::Expression(n) = node else { return false };

    if let Some(parent) = tree.parent(n) {
        if matches!(tree.kind(parent), NodeKind::CallExpression | NodeKind::NamedCallExpression) {
            if let Some(callee) = tree.call_callee(parent) {
                if tree.kind(callee) == NodeKind::Identifier
                    && matches!(tree.text(callee), Some("require") | Some("assert"))
                    && tree.call_args(parent).contains(&n)
                {
                    return true;
                }
            }
        }
    }

    if is_owner_comparison_guard(tree, n) {
        return true;
    }

    if matches!(tree.kind(n), NodeKind::CallExpression | NodeKind::NamedCallExpression) && is_library_sanitizer(tree, n) {
        return true;
    }

    if let Some(f) = enclosing_function(tree, program, n) {
        if guarded_functions.contains(&f) {
            return true;
        }
    }

    false
}

fn is_owner_comparison_guard(tree: &Tree, n: NodeId) -> bool {
    use crate::tree::BinOp;
    let Some(parent) = tree.parent(n) else { return false };
    let NodeKind::BinaryExpression(op) = tree.kind(parent) else { return false };
    if !matches!(op, BinOp::Eq | BinOp::Ne) {
        return false;
    }
    let (left, right) = (tree.binary_left(parent), tree.binary_right(parent));
    let is_msg_sender = |x: NodeId| is_well_known_global(tree, x) && tree.member_name(x) == "sender";
    let names_owner = |x: NodeId| {
        tree.kind(x) == NodeKind::Identifier
            && tree
                .text(x)
                .map(|t| t.to_lowercase().contains("owner"))
                .unwrap_or(false)
    };
    (is_msg_sender(left) && names_owner(right)) || (is_msg_sender(right) && names_owner(left))
}

fn enclosing_function(tree: &Tree, program: &Program, n: NodeId) -> Option<NodeId> {
    let mut cur = Some(n);
    while let Some(node) = cur {
        if program.functions.contains_key(&node) {
            return Some(node);
        }
        cur = tree.parent(node);
    }
    None
}

/// A reentrancy-guard modifier: one whose body contains a `require`/
/// `assert` on a state boolean before the placeholder and an assignment
/// to it after — approximated here by the common `nonReentrant`-style
/// name, matching the name-based matching Non-goal.
pub fn is_reentrancy_guard_modifier(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("nonreentrant") || lower.contains("reentrancyguard") || lower == "noreentry"
}

/// A taint configuration (spec.md §4.6's quadruple): sources, sinks,
/// sanitizers, and an optional extra step relation, each a predicate over
/// [`DataFlowNode`]s.
pub struct TaintConfig<'a> {
    pub is_source: Box<dyn Fn(DataFlowNode) -> bool + 'a>,
    pub is_sink: Box<dyn Fn(DataFlowNode) -> bool + 'a>,
    pub is_sanitizer: Box<dyn Fn(DataFlowNode) -> bool + 'a>,
    pub is_additional_taint_step: Option<Box<dyn Fn(DataFlowNode, DataFlowNode) -> bool + 'a>>,
}

/// The least `reaches` relation (spec.md §4.6), computed as a worklist
/// fixpoint bounded by `options.taint_iteration_budget`; an exhausted
/// budget truncates the result and records a warning diagnostic rather
/// than looping forever (spec.md §7 resource exhaustion).
pub struct Reaches {
    /// `source -> set of nodes it reaches`.
    reached: FxHashMap<DataFlowNode, FxHashSet<DataFlowNode>>,
}

impl Reaches {
    pub fn reaches(&self, source: DataFlowNode, n: DataFlowNode) -> bool {
        source == n || self.reached.get(&source).map(|s| s.contains(&n)).unwrap_or(false)
    }

    /// `has_flow(s, k)`: `is_source(s) ∧ is_sink(k) ∧ reaches(s, k)`.
    pub fn has_flow(&self, config: &TaintConfig, source: DataFlowNode, sink: DataFlowNode) -> bool {
        (config.is_source)(source) && (config.is_sink)(sink) && self.reaches(source, sink)
    }

    pub fn reached_from(&self, source: DataFlowNode) -> impl Iterator<Item = DataFlowNode> + '_ {
        self.reached.get(&source).into_iter().flatten().copied()
    }
}

pub fn compute_reaches(
    graph: &FlowGraph,
    config: &TaintConfig,
    sources: &[DataFlowNode],
    options: &AnalysisOptions,
    diagnostics: &mut Diagnostics,
    context_node: NodeId,
) -> Reaches {
    let mut reached: FxHashMap<DataFlowNode, FxHashSet<DataFlowNode>> = FxHashMap::default();
    let mut worklist: std::collections::VecDeque<(DataFlowNode, DataFlowNode)> = std::collections::VecDeque::new();

    for &s in sources {
        if (config.is_source)(s) && !(config.is_sanitizer)(s) {
            if reached.entry(s).or_default().insert(s) {
                worklist.push_back((s, s));
            }
        }
    }

    let mut iterations: u64 = 0;
    let mut truncated = false;
    while let Some((source, m)) = worklist.pop_front() {
        iterations += 1;
        if iterations > options.taint_iteration_budget {
            truncated = true;
            break;
        }
        for &n in graph.successors(m) {
            if (config.is_sanitizer)(n) {
                continue;
            }
            if reached.entry(source).or_default().insert(n) {
                worklist.push_back((source, n));
            }
        }
        if let Some(extra) = &config.is_additional_taint_step {
            // A caller-supplied predicate over pairs, tested against the
            // same finite candidate set the graph already knows about
            // (spec.md §4.6 "optional is_additional_taint_step") — this
            // lets a configuration narrow or widen which of the graph's
            // own edges count as taint propagation without rebuilding it.
            for &n in graph.successors(m) {
                if extra(m, n) && !(config.is_sanitizer)(n) && reached.entry(source).or_default().insert(n) {
                    worklist.push_back((source, n));
                }
            }
        }
    }

    if truncated {
        diagnostics.push(Diagnostic {
            level: Level::Warning,
            kind: DiagnosticKind::TaintBudgetExceeded,
            node: context_node,
            message: format!("taint fixpoint exceeded iteration budget of {}", options.taint_iteration_budget),
        });
    }

    Reaches { reached }
}

/// A ready-made configuration using the predefined sources/sinks/
/// sanitizers (spec.md §4.6), for callers who don't need to customize.
pub fn predefined_config<'a>(
    tree: &'a Tree,
    program: &'a Program,
    caller_contract: Option<NodeId>,
    var_types: &'a FxHashMap<String, String>,
    guarded_functions: &'a FxHashSet<NodeId>,
) -> TaintConfig<'a> {
    TaintConfig {
        is_source: Box::new(move |n| is_predefined_source(tree, n)),
        is_sink: Box::new(move |n| is_predefined_sink(tree, program, caller_contract, var_types, n)),
        is_sanitizer: Box::new(move |n| is_predefined_sanitizer(tree, program, guarded_functions, n)),
        is_additional_taint_step: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blocks as blocks_mod, cfg as cfg_mod, dominance as dom_mod, program, ssa as ssa_mod, tree as tree_mod};

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
    fn parameter_flows_to_state_write_within_function() {
        let (tree, prog) = build(
            r#"
            contract C {
                uint a;
                function f(uint x) public {
                    a = x;
                }
            }
            "#,
        );
        let f = find_function(&prog, "f");
        let cfg = cfg_mod::build_function_cfg(&tree, &prog, f);
        let blocks = blocks_mod::build_function_blocks(&cfg);
        let exits: Vec<_> = {
            let exit_set: FxHashSet<_> = cfg.exits.iter().copied().collect();
            blocks.blocks.iter().filter(|b| exit_set.contains(&b.last())).map(|b| b.id).collect()
        };
        let dom = dom_mod::build_dominance(&blocks, &exits);
        let ssa = ssa_mod::build_function_ssa(&tree, &prog, &cfg, &blocks, dom.as_ref(), f);

        let edges = local_step_edges(&tree, &ssa, &cfg.reachable);
        let mut graph = FlowGraph::default();
        for (from, to) in edges {
            graph.add_local(from, to);
        }

        let decl = prog.function(f);
        let param = decl.params[0];
        let assign = tree
            .all_nodes()
            .find(|&n| matches!(tree.kind(n), NodeKind::AssignmentExpression(_)))
            .unwrap();

        let var_types = FxHashMap::default();
        let guarded = FxHashSet::default();
        let config = predefined_config(&tree, &prog, Some(prog.function(f).contract.unwrap()), &var_types, &guarded);
        let mut diags = Diagnostics::default();
        let options = AnalysisOptions::default();
        let sources = vec![DataFlowNode::Parameter(param)];
        let reaches = compute_reaches(&graph, &config, &sources, &options, &mut diags, f);

        assert!(reaches.reaches(DataFlowNode::Parameter(param), DataFlowNode::Expression(assign)));
    }

    #[test]
    fn keccak_argument_flows_to_call_result() {
        let (tree, prog) = build(
            r#"
            contract C {
                function f(uint x) public pure returns (bytes32) {
                    return keccak256(abi.encodePacked(x));
                }
            }
            "#,
        );
        let f = find_function(&prog, "f");
        let cfg = cfg_mod::build_function_cfg(&tree, &prog, f);
        let additional = additional_taint_step_edges(&tree, &prog, prog.function(f).contract, &cfg.reachable);
        assert!(!additional.is_empty());
    }
}
