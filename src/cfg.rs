// SPDX-License-Identifier: Apache-2.0

//! The control-flow graph: `first`/`last`/`successor` (spec.md §4.1) plus
//! modifier-chain inlining.
//!
//! `first`/`last` are pure, memoized, structurally-recursive functions of
//! the (read-only) tree — exactly Design Notes §9's "dynamic dispatch over
//! node kinds... decide behavior by pattern match" applied to the CFG. The
//! full per-function graph is then built by walking every executable node
//! once and emitting *that node's own* local sequencing edges (container
//! nodes wire their children together via `first`/`last`; nobody recurses
//! into children's edges a second time).

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use crate::callgraph;
use crate::program::Program;
use crate::tree::{NodeId, NodeKind, Tree};

/// A tag on a CFG edge: how the predecessor completed (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Completion {
    Normal,
    Return,
    Break,
    Continue,
    Revert,
    Throw,
    YulLeave,
    Boolean(bool),
}

#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub completion: Completion,
}

/// The per-function control-flow graph plus the modifier-expansion edges
/// grafted onto its entry/exit.
pub struct FunctionCfg {
    /// The `FunctionDefinition` (or `ConstructorDefinition`/
    /// `ModifierDefinition`/fallback-receive) declaration node.
    pub entry_decl: NodeId,
    /// First CFG node actually executed — the modifier chain's first
    /// statement when modifiers are present, else `first(body)`.
    pub first: Option<NodeId>,
    /// CFG nodes with no outgoing edge: the function's true exit set.
    pub exits: Vec<NodeId>,
    pub edges: Vec<Edge>,
    /// Every node reachable from `first`, in ascending `NodeId` order
    /// (which tracks preorder/source order, see [`Tree::order_key`]) —
    /// the deterministic enumeration spec.md §5 requires.
    pub reachable: Vec<NodeId>,
    succs: FxHashMap<NodeId, Vec<(NodeId, Completion)>>,
    preds: FxHashMap<NodeId, Vec<(NodeId, Completion)>>,
}

impl FunctionCfg {
    pub fn successors(&self, n: NodeId) -> &[(NodeId, Completion)] {
        self.succs.get(&n).map(|v| v.as_slice()).unwrap_or(&[])
    }
    pub fn predecessors(&self, n: NodeId) -> &[(NodeId, Completion)] {
        self.preds.get(&n).map(|v| v.as_slice()).unwrap_or(&[])
    }
    pub fn is_reachable(&self, n: NodeId) -> bool {
        self.preds.contains_key(&n) || self.first == Some(n)
    }
}

/// Structurally-recursive, memoized `first`/`last`. One instance per
/// top-level analysis so caches never cross function boundaries
/// unnecessarily, though correctness would hold even shared tree-wide.
pub struct CfgBuilder<'a> {
    tree: &'a Tree,
    /// spec.md §6's `AnalysisOptions`-style knob: whether an
    /// `AssemblyStatement`'s Yul body is descended into for `first`/`last`
    /// (and therefore for successor edges) or treated as an opaque leaf.
    analyze_assembly: bool,
    first_cache: RefCell<FxHashMap<NodeId, NodeId>>,
    last_cache: RefCell<FxHashMap<(NodeId, Completion), Vec<NodeId>>>,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        Self::with_analyze_assembly(tree, true)
    }

    pub fn with_analyze_assembly(tree: &'a Tree, analyze_assembly: bool) -> Self {
        CfgBuilder {
            tree,
            analyze_assembly,
            first_cache: RefCell::new(FxHashMap::default()),
            last_cache: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn first(&self, n: NodeId) -> NodeId {
        if let Some(&cached) = self.first_cache.borrow().get(&n) {
            return cached;
        }
        let result = self.compute_first(n);
        self.first_cache.borrow_mut().insert(n, result);
        result
    }

    fn compute_first(&self, n: NodeId) -> NodeId {
        use NodeKind::*;
        let t = self.tree;
        match t.kind(n) {
            // Open Question resolution: descend into parenthesis wrappers
            // so evaluation order matches the underlying expression,
            // rather than treating the wrapper as its own first (spec.md
            // §9 Design Notes, first Open Question).
            ParenthesisExpression => self.first(t.unary_operand(n)),

            Identifier | NumberLiteral | StringLiteral | BoolLiteral | HexLiteral
            | AddressLiteral | TypeExpression | NewExpression | TupleExpression
            | ArrayLiteral => n,

            BinaryExpression(_) => self.first(t.binary_left(n)),
            UnaryExpression(_) | UpdateExpression { .. } | DeleteExpression => {
                self.first(t.unary_operand(n))
            }
            AssignmentExpression(_) => self.first(t.assign_right(n)),
            CallExpression | NamedCallExpression => match t.call_callee(n) {
                Some(callee) => self.first(callee),
                None => match t.call_args(n).first() {
                    Some(&a) => self.first(a),
                    None => n,
                },
            },
            MemberExpression => self.first(t.member_object(n)),
            ArrayAccess => self.first(t.index_base(n)),
            ArraySlice => self.first(t.index_base(n)),
            TernaryExpression => self.first(t.ternary_condition(n)),

            BlockStatement { .. } => match t.block_statements(n).first() {
                Some(&s) => self.first(s),
                None => n,
            },
            IfStatement => self.first(t.if_condition(n)),
            WhileStatement => self.first(t.while_condition(n)),
            DoWhileStatement => self.first(t.do_while_body(n)),
            ForStatement => {
                if let Some(i) = t.for_init(n) {
                    self.first(i)
                } else if let Some(c) = t.for_condition(n) {
                    self.first(c)
                } else if let Some(b) = t.for_body(n) {
                    self.first(b)
                } else {
                    n
                }
            }
            TryStatement => self.first(t.try_attempt(n)),
            ReturnStatement => match t.return_value(n) {
                Some(v) => self.first(v),
                None => n,
            },
            RevertStatement => match t.revert_args(n).first() {
                Some(&a) => self.first(a),
                None => n,
            },
            EmitStatement => self.first(t.emit_call(n)),
            ExpressionStatement => self.first(t.expr_stmt_expr(n)),
            VariableDeclarationStatement => match t.var_decl_stmt_init(n) {
                Some(init) => self.first(init),
                None => n,
            },
            BreakStatement | ContinueStatement | UnknownStatement => n,

            // `AnalysisOptions::analyze_assembly` (SPEC_FULL §4): when
            // enabled, an assembly block's first executed node is its Yul
            // body's first statement, the same as any other block-bearing
            // construct; disabled, the assembly statement is an opaque leaf.
            AssemblyStatement => {
                if self.analyze_assembly {
                    match t.children(n).first() {
                        Some(&block) => self.first(block),
                        None => n,
                    }
                } else {
                    n
                }
            }

            YulBlock => match t.children(n).first() {
                Some(&s) => self.first(s),
                None => n,
            },
            YulIf => self.first(t.yul_if_condition(n)),
            YulFor => self.first(t.yul_for_init(n)),
            YulSwitch => self.first(t.yul_switch_expr(n)),
            YulFunctionCall => match t.children(n).first() {
                Some(&a) => self.first(a),
                None => n,
            },
            YulAssignment => {
                // children are [targets..., value]; value is last.
                self.first(*t.children(n).last().unwrap())
            }
            YulVariableDeclaration => match t.children(n).last() {
                Some(&v) if t.kind(v) != YulIdentifier => self.first(v),
                _ => n,
            },
            YulIdentifier | YulLiteral | YulBreak | YulContinue | YulLeave
            | YulFunctionDefinition | YulSwitchCase { .. } => n,

            SourceUnit | ContractDeclaration(_) | InheritanceSpecifier | UsingDirective
            | StateVariableDeclaration | EventDefinition | ErrorDefinition | EnumDefinition
            | StructDefinition | FunctionDefinition(_) | Parameter | ModifierInvocation
            | CatchClause => n,
        }
    }

    pub fn last(&self, n: NodeId, c: Completion) -> Vec<NodeId> {
        if let Some(cached) = self.last_cache.borrow().get(&(n, c)) {
            return cached.clone();
        }
        let result = self.compute_last(n, c);
        self.last_cache.borrow_mut().insert((n, c), result.clone());
        result
    }

    fn compute_last(&self, n: NodeId, c: Completion) -> Vec<NodeId> {
        use NodeKind::*;
        let t = self.tree;
        match t.kind(n) {
            ParenthesisExpression => self.last(t.unary_operand(n), c),

            TernaryExpression => {
                let mut out = self.last(t.ternary_consequence(n), c);
                out.extend(self.last(t.ternary_alternative(n), c));
                out
            }

            IfStatement => {
                let mut out = self.last(t.if_then(n), c);
                match t.if_else(n) {
                    Some(else_) => out.extend(self.last(else_, c)),
                    None if c == Completion::Normal => out.push(t.if_condition(n)),
                    None => {}
                }
                out
            }

            WhileStatement | ForStatement | DoWhileStatement => {
                let body = match t.kind(n) {
                    WhileStatement => Some(t.while_body(n)),
                    DoWhileStatement => Some(t.do_while_body(n)),
                    ForStatement => t.for_body(n),
                    _ => unreachable!(),
                };
                let cond = match t.kind(n) {
                    WhileStatement => Some(t.while_condition(n)),
                    DoWhileStatement => Some(t.do_while_condition(n)),
                    ForStatement => t.for_condition(n),
                    _ => unreachable!(),
                };
                let mut out = Vec::new();
                if c == Completion::Normal {
                    if let Some(cond) = cond {
                        out.push(cond);
                    } else if cond.is_none() {
                        // `for(;;)` has no condition: normal completion
                        // only possible via an internal `break`.
                    }
                    if let Some(body) = body {
                        out.extend(self.last(body, Completion::Break));
                    }
                } else if !matches!(c, Completion::Break | Completion::Continue) {
                    if let Some(body) = body {
                        out.extend(self.last(body, c));
                    }
                }
                out
            }

            TryStatement => {
                let mut out = Vec::new();
                for &clause in t.try_clauses(n) {
                    out.extend(self.last(t.catch_body(clause), c));
                }
                out
            }

            BlockStatement { .. } => {
                let stmts = t.block_statements(n);
                if c == Completion::Normal {
                    match stmts.last() {
                        Some(&last_stmt) => self.last(last_stmt, c),
                        None => vec![n],
                    }
                } else {
                    stmts.iter().flat_map(|&s| self.last(s, c)).collect()
                }
            }

            ReturnStatement => match_completion(n, Completion::Return, c),
            RevertStatement => match_completion(n, Completion::Revert, c),
            BreakStatement => match_completion(n, Completion::Break, c),
            ContinueStatement => match_completion(n, Completion::Continue, c),
            YulLeave => match_completion(n, Completion::YulLeave, c),

            // `leave` inside a top-level assembly block (not nested in a
            // Yul function, which `analyze_assembly` doesn't model as its
            // own entry) exits the block the same way a fallthrough would,
            // so both `YulLeave` and normal completion of the inner block
            // surface as the assembly statement's own normal completion.
            AssemblyStatement if self.analyze_assembly && c == Completion::Normal => {
                match t.children(n).first() {
                    Some(&block) => {
                        let mut out = self.last(block, Completion::Normal);
                        out.extend(self.last(block, Completion::YulLeave));
                        out
                    }
                    None => vec![n],
                }
            }
            AssemblyStatement => match_completion(n, Completion::Normal, c),

            YulBlock => {
                let stmts = t.children(n);
                if c == Completion::Normal {
                    match stmts.last() {
                        Some(&last_stmt) => self.last(last_stmt, c),
                        None => vec![n],
                    }
                } else {
                    stmts.iter().flat_map(|&s| self.last(s, c)).collect()
                }
            }
            YulIf => {
                if c == Completion::Normal {
                    let mut out = vec![n];
                    out.extend(self.last(t.yul_if_body(n), Completion::YulLeave));
                    out
                } else if c == Completion::YulLeave {
                    self.last(t.yul_if_body(n), c)
                } else {
                    vec![]
                }
            }
            YulFor => {
                if c == Completion::Normal {
                    vec![t.yul_for_condition(n)]
                } else if c == Completion::YulLeave {
                    self.last(t.yul_for_body(n), c)
                } else {
                    vec![]
                }
            }
            YulSwitch => {
                let mut out = Vec::new();
                for &case in t.yul_switch_cases(n) {
                    out.extend(self.last(t.yul_case_body(case), c));
                }
                out
            }

            // Everything else (plain expressions, statements with no
            // abnormal completion of their own) completes normally at
            // itself, and never completes abnormally.
            _ => {
                if c == Completion::Normal {
                    vec![n]
                } else {
                    vec![]
                }
            }
        }
    }
}

fn match_completion(n: NodeId, own: Completion, want: Completion) -> Vec<NodeId> {
    if own == want {
        vec![n]
    } else {
        vec![]
    }
}

/// Collects every node in `root`'s subtree, including `root`, in preorder
/// (document order — matches the arena's own preorder `NodeId` allocation).
fn subtree_nodes(tree: &Tree, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        out.push(n);
        for &c in tree.children(n).iter().rev() {
            stack.push(c);
        }
    }
    out
}

/// Emits `node`'s own local sequencing edges into `out`. Does not recurse:
/// the caller walks every node in the subtree separately so each
/// container's edges are only produced once.
fn emit_node_edges(b: &CfgBuilder, node: NodeId, out: &mut Vec<Edge>) {
    use Completion::Normal;
    use NodeKind::*;
    let t = b.tree;
    let mut push_chain = |froms: Vec<NodeId>, to: NodeId, completion: Completion| {
        for from in froms {
            out.push(Edge { from, to, completion });
        }
    };

    match t.kind(node) {
        BinaryExpression(_) => {
            push_chain(b.last(t.binary_left(node), Normal), b.first(t.binary_right(node)), Normal);
            push_chain(b.last(t.binary_right(node), Normal), node, Normal);
        }
        UnaryExpression(_) | UpdateExpression { .. } | DeleteExpression => {
            push_chain(b.last(t.unary_operand(node), Normal), node, Normal);
        }
        AssignmentExpression(_) => {
            push_chain(b.last(t.assign_right(node), Normal), b.first(t.assign_left(node)), Normal);
            push_chain(b.last(t.assign_left(node), Normal), node, Normal);
        }
        CallExpression | NamedCallExpression => {
            let args = t.call_args(node);
            if let Some(callee) = t.call_callee(node) {
                match args.first() {
                    Some(&a0) => push_chain(b.last(callee, Normal), b.first(a0), Normal),
                    None => push_chain(b.last(callee, Normal), node, Normal),
                }
            }
            for w in args.windows(2) {
                push_chain(b.last(w[0], Normal), b.first(w[1]), Normal);
            }
            if let Some(&last_arg) = args.last() {
                push_chain(b.last(last_arg, Normal), node, Normal);
            }
        }
        MemberExpression => push_chain(b.last(t.member_object(node), Normal), node, Normal),
        ArrayAccess => {
            match t.index_index(node) {
                Some(ix) => {
                    push_chain(b.last(t.index_base(node), Normal), b.first(ix), Normal);
                    push_chain(b.last(ix, Normal), node, Normal);
                }
                None => push_chain(b.last(t.index_base(node), Normal), node, Normal),
            }
        }
        ArraySlice => {
            push_chain(b.last(t.index_base(node), Normal), node, Normal);
        }
        TernaryExpression => {
            let cond_last = b.last(t.ternary_condition(node), Normal);
            for ln in &cond_last {
                out.push(Edge {
                    from: *ln,
                    to: b.first(t.ternary_consequence(node)),
                    completion: Completion::Boolean(true),
                });
                out.push(Edge {
                    from: *ln,
                    to: b.first(t.ternary_alternative(node)),
                    completion: Completion::Boolean(false),
                });
            }
        }
        NewExpression => {
            push_chain(b.last(t.unary_operand(node), Normal), node, Normal);
        }

        BlockStatement { .. } => {
            let stmts = t.block_statements(node);
            for w in stmts.windows(2) {
                push_chain(b.last(w[0], Normal), b.first(w[1]), Normal);
            }
        }
        IfStatement => {
            let cond_last = b.last(t.if_condition(node), Normal);
            for ln in &cond_last {
                out.push(Edge {
                    from: *ln,
                    to: b.first(t.if_then(node)),
                    completion: Completion::Boolean(true),
                });
                if let Some(else_) = t.if_else(node) {
                    out.push(Edge {
                        from: *ln,
                        to: b.first(else_),
                        completion: Completion::Boolean(false),
                    });
                }
                // No-else false path is realized by the enclosing
                // container via `last(IfStatement, Normal)`, which already
                // includes `condition` (see `CfgBuilder::compute_last`).
            }
        }
        WhileStatement => {
            let cond_last = b.last(t.while_condition(node), Normal);
            for ln in &cond_last {
                out.push(Edge {
                    from: *ln,
                    to: b.first(t.while_body(node)),
                    completion: Completion::Boolean(true),
                });
            }
            push_chain(b.last(t.while_body(node), Normal), t.while_condition(node), Normal);
            push_chain(b.last(t.while_body(node), Completion::Continue), t.while_condition(node), Normal);
        }
        DoWhileStatement => {
            push_chain(b.last(t.do_while_body(node), Normal), t.do_while_condition(node), Normal);
            push_chain(
                b.last(t.do_while_body(node), Completion::Continue),
                t.do_while_condition(node),
                Normal,
            );
            let cond_last = b.last(t.do_while_condition(node), Normal);
            for ln in &cond_last {
                out.push(Edge {
                    from: *ln,
                    to: b.first(t.do_while_body(node)),
                    completion: Completion::Boolean(true),
                });
            }
        }
        ForStatement => {
            let cond = t.for_condition(node);
            let update = t.for_update(node);
            let body = t.for_body(node);
            let loop_back_target = |b: &CfgBuilder| match (cond, update) {
                (Some(c), _) => b.first(c),
                (None, Some(u)) => b.first(u),
                (None, None) => body.map(|bd| b.first(bd)),
            };
            if let Some(init) = t.for_init(node) {
                let entry_target = cond
                    .map(|c| b.first(c))
                    .or_else(|| body.map(|bd| b.first(bd)));
                if let Some(target) = entry_target {
                    push_chain(b.last(init, Normal), target, Normal);
                }
            }
            if let (Some(cond), Some(body)) = (cond, body) {
                let cond_last = b.last(cond, Normal);
                for ln in &cond_last {
                    out.push(Edge {
                        from: *ln,
                        to: b.first(body),
                        completion: Completion::Boolean(true),
                    });
                }
            }
            if let Some(body) = body {
                let normal_target = update
                    .map(|u| b.first(u))
                    .or(cond.map(|c| b.first(c)));
                if let Some(target) = normal_target {
                    push_chain(b.last(body, Normal), target, Normal);
                    push_chain(b.last(body, Completion::Continue), target, Normal);
                }
            }
            if let Some(update) = update {
                if let Some(cond) = cond {
                    push_chain(vec![update], b.first(cond), Normal);
                } else if let Some(body) = body {
                    push_chain(vec![update], b.first(body), Normal);
                }
            }
            let _ = loop_back_target;
        }
        TryStatement => {
            let attempt_last = b.last(t.try_attempt(node), Normal);
            let clauses = t.try_clauses(node);
            for ln in &attempt_last {
                if let Some(&success) = clauses.first() {
                    out.push(Edge {
                        from: *ln,
                        to: b.first(t.catch_body(success)),
                        completion: Normal,
                    });
                }
                for &clause in clauses.iter().skip(1) {
                    out.push(Edge {
                        from: *ln,
                        to: b.first(t.catch_body(clause)),
                        completion: Completion::Revert,
                    });
                }
            }
        }
        ReturnStatement => {
            if let Some(v) = t.return_value(node) {
                push_chain(b.last(v, Normal), node, Normal);
            }
        }
        RevertStatement => {
            let args = t.revert_args(node);
            for w in args.windows(2) {
                push_chain(b.last(w[0], Normal), b.first(w[1]), Normal);
            }
            if let Some(&last_arg) = args.last() {
                push_chain(b.last(last_arg, Normal), node, Normal);
            }
        }
        EmitStatement => push_chain(b.last(t.emit_call(node), Normal), node, Normal),
        ExpressionStatement => push_chain(b.last(t.expr_stmt_expr(node), Normal), node, Normal),
        VariableDeclarationStatement => {
            if let Some(init) = t.var_decl_stmt_init(node) {
                push_chain(b.last(init, Normal), node, Normal);
            }
        }

        YulBlock => {
            let stmts = t.children(node);
            for w in stmts.windows(2) {
                push_chain(b.last(w[0], Normal), b.first(w[1]), Normal);
            }
        }
        YulIf => {
            let cond_last = b.last(t.yul_if_condition(node), Normal);
            for ln in &cond_last {
                out.push(Edge {
                    from: *ln,
                    to: b.first(t.yul_if_body(node)),
                    completion: Completion::Boolean(true),
                });
            }
        }
        YulFor => {
            let init = t.yul_for_init(node);
            let cond = t.yul_for_condition(node);
            let post = t.yul_for_post(node);
            let body = t.yul_for_body(node);
            push_chain(b.last(init, Completion::YulLeave), b.first(cond), Normal);
            let cond_last = b.last(cond, Normal);
            for ln in &cond_last {
                out.push(Edge {
                    from: *ln,
                    to: b.first(body),
                    completion: Completion::Boolean(true),
                });
            }
            push_chain(b.last(body, Completion::Normal), b.first(post), Normal);
            push_chain(b.last(body, Completion::Continue), b.first(post), Normal);
            push_chain(b.last(post, Completion::Normal), b.first(cond), Normal);
        }
        YulSwitch => {
            let cases = t.yul_switch_cases(node);
            for &case in cases {
                out.push(Edge {
                    from: t.yul_switch_expr(node),
                    to: b.first(t.yul_case_body(case)),
                    completion: Normal,
                });
            }
        }
        YulFunctionCall => {
            let args = t.children(node);
            for w in args.windows(2) {
                push_chain(b.last(w[0], Normal), b.first(w[1]), Normal);
            }
            if let Some(&last_arg) = args.last() {
                push_chain(b.last(last_arg, Normal), node, Normal);
            }
        }
        YulAssignment => {
            let children = t.children(node);
            if let Some((&value, targets)) = children.split_last() {
                push_chain(b.last(value, Normal), node, Normal);
                let _ = targets;
            }
        }
        YulVariableDeclaration => {
            let children = t.children(node);
            if let Some(&last) = children.last() {
                if t.kind(last) != YulIdentifier {
                    push_chain(b.last(last, Normal), node, Normal);
                }
            }
        }

        _ => {}
    }
}

/// Finds the placeholder `_;` inside a modifier body: an `Identifier` with
/// text `_` appearing as a direct `ExpressionStatement` child of the body
/// block (spec.md §4.1 step 3).
fn find_placeholder(tree: &Tree, body: NodeId) -> Option<NodeId> {
    if !matches!(tree.kind(body), NodeKind::BlockStatement { .. }) {
        return None;
    }
    tree.block_statements(body).iter().copied().find(|&s| {
        matches!(tree.kind(s), NodeKind::ExpressionStatement)
            && matches!(tree.kind(tree.expr_stmt_expr(s)), NodeKind::Identifier)
            && tree.text(tree.expr_stmt_expr(s)) == Some("_")
    })
}

/// The statement immediately following `stmt` within its parent block, if
/// any (used to find "the return target of modifier position i": `first`
/// of the statement after the placeholder).
fn statement_after(tree: &Tree, stmt: NodeId) -> Option<NodeId> {
    let parent = tree.parent(stmt)?;
    let siblings = tree.children(parent);
    let idx = siblings.iter().position(|&s| s == stmt)?;
    siblings.get(idx + 1).copied()
}

/// Builds the full CFG for one entry (`FunctionDefinition`/
/// `ConstructorDefinition`/`ModifierDefinition`/fallback-receive), inlining
/// its resolved modifier chain (spec.md §4.1).
pub fn build_function_cfg(tree: &Tree, program: &Program, entry: NodeId) -> FunctionCfg {
    build_function_cfg_with_options(tree, program, entry, true)
}

pub fn build_function_cfg_with_options(
    tree: &Tree,
    program: &Program,
    entry: NodeId,
    analyze_assembly: bool,
) -> FunctionCfg {
    let b = CfgBuilder::with_analyze_assembly(tree, analyze_assembly);
    let mut edges = Vec::new();

    let Some(body) = tree.function_body(entry) else {
        return FunctionCfg {
            entry_decl: entry,
            first: None,
            exits: Vec::new(),
            edges: Vec::new(),
            reachable: Vec::new(),
            succs: FxHashMap::default(),
            preds: FxHashMap::default(),
        };
    };

    for node in subtree_nodes(tree, body) {
        emit_node_edges(&b, node, &mut edges);
    }

    let decl = program.functions.get(&entry);
    let modifier_invocations: Vec<NodeId> = decl
        .map(|d| d.modifier_invocations.clone())
        .unwrap_or_default();

    let first_node = if modifier_invocations.is_empty() {
        Some(b.first(body))
    } else {
        build_modifier_chain(tree, program, &b, entry, body, &modifier_invocations, &mut edges)
    };

    let mut succs: FxHashMap<NodeId, Vec<(NodeId, Completion)>> = FxHashMap::default();
    let mut preds: FxHashMap<NodeId, Vec<(NodeId, Completion)>> = FxHashMap::default();
    for e in &edges {
        succs.entry(e.from).or_default().push((e.to, e.completion));
        preds.entry(e.to).or_default().push((e.from, e.completion));
    }

    let mut reachable = std::collections::HashSet::new();
    if let Some(first) = first_node {
        let mut stack = vec![first];
        reachable.insert(first);
        while let Some(n) = stack.pop() {
            for &(succ, _) in succs.get(&n).map(|v| v.as_slice()).unwrap_or(&[]) {
                if reachable.insert(succ) {
                    stack.push(succ);
                }
            }
        }
    }
    let mut exits: Vec<NodeId> = reachable
        .iter()
        .copied()
        .filter(|n| !succs.contains_key(n))
        .collect();
    exits.sort_unstable();
    let mut reachable: Vec<NodeId> = reachable.into_iter().collect();
    reachable.sort_unstable();

    FunctionCfg {
        entry_decl: entry,
        first: first_node,
        exits,
        edges,
        reachable,
        succs,
        preds,
    }
}

/// Threads the modifier chain's bodies through the function body per
/// spec.md §4.1's numbered procedure: `entry -> first(m0)`, each
/// placeholder to the next modifier (or the function body at the last
/// position), and each post-`_` tail cascading to the previous modifier's
/// return target (or the function's own exit if none has a tail).
fn build_modifier_chain(
    tree: &Tree,
    program: &Program,
    b: &CfgBuilder,
    entry: NodeId,
    function_body: NodeId,
    invocations: &[NodeId],
    edges: &mut Vec<Edge>,
) -> Option<NodeId> {
    let contract = program.functions.get(&entry).and_then(|f| f.contract)?;

    let mut resolved_bodies: Vec<Option<(NodeId, NodeId)>> = Vec::new();
    for &inv in invocations {
        let name = tree.modifier_invocation_name(inv);
        let resolved = callgraph::resolve_modifier(program, contract, name).and_then(|m| {
            tree.function_body(m).map(|body| {
                for node in subtree_nodes(tree, body) {
                    emit_node_edges(b, node, edges);
                }
                (m, body)
            })
        });
        resolved_bodies.push(resolved);
    }

    // Return target of position i: first(stmt after placeholder) if the
    // modifier at i has post-`_` code, else cascade to i-1, else the
    // function body's own normal/return exit.
    let return_target_of = |i: isize| -> Vec<NodeId> {
        let mut i = i;
        while i >= 0 {
            if let Some(Some((_, body))) = resolved_bodies.get(i as usize) {
                if let Some(ph) = find_placeholder(tree, *body) {
                    if let Some(after) = statement_after(tree, ph) {
                        return vec![b.first(after)];
                    }
                }
            }
            i -= 1;
        }
        let mut exit_normal = b.last(function_body, Completion::Normal);
        exit_normal.extend(b.last(function_body, Completion::Return));
        exit_normal
    };

    let mut chain_first = None;
    let mut prev_placeholder: Option<NodeId> = None;

    for (i, resolved) in resolved_bodies.iter().enumerate() {
        let Some((_, body)) = resolved else {
            continue;
        };
        let target = b.first(*body);
        if chain_first.is_none() {
            chain_first = Some(target);
        }
        if let Some(ph) = prev_placeholder {
            edges.push(Edge {
                from: ph,
                to: target,
                completion: Completion::Normal,
            });
        }
        prev_placeholder = find_placeholder(tree, *body);
        if let Some(ph) = prev_placeholder {
            let _ = i;
        } else {
            // A modifier without a placeholder never reaches the next
            // stage; spec.md treats this as a partial, sound graph (no
            // crash), so we simply stop threading further here.
            prev_placeholder = None;
        }
    }

    match prev_placeholder {
        Some(ph) => {
            edges.push(Edge {
                from: ph,
                to: b.first(function_body),
                completion: Completion::Normal,
            });
            // Function body's normal/return completion cascades back to
            // the nearest post-`_` return target, scanning from the last
            // resolved modifier position backwards.
            let last_index = resolved_bodies.len() as isize - 1;
            for target in return_target_of(last_index) {
                if target != b.first(function_body) {
                    for from in b
                        .last(function_body, Completion::Normal)
                        .into_iter()
                        .chain(b.last(function_body, Completion::Return))
                    {
                        edges.push(Edge {
                            from,
                            to: target,
                            completion: Completion::Normal,
                        });
                    }
                }
            }
        }
        None => {
            // No resolved modifier has a placeholder to thread through:
            // contribute no further edges past the chain (spec.md §4.1
            // "unresolvable...contribute no edges").
        }
    }

    chain_first.or_else(|| Some(b.first(function_body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{program, tree as tree_mod};

    fn build(src: &str) -> (tree_mod::Tree, Program) {
        let (unit, _) = solang_parser::parse(src, 0).expect("parses");
        let lowered = tree_mod::lower(&unit, vec![src.to_string()]);
        let prog = program::build(&lowered.tree, &lowered.contracts, &lowered.free_functions);
        (lowered.tree, prog)
    }

    fn find_function<'a>(tree: &tree_mod::Tree, prog: &'a Program, name: &str) -> NodeId {
        prog.functions
            .values()
            .find(|f| f.name == name)
            .map(|f| f.node)
            .unwrap_or_else(|| panic!("no function named {name}"))
            .pipe_check(tree)
    }

    trait PipeCheck {
        fn pipe_check(self, _tree: &tree_mod::Tree) -> Self
        where
            Self: Sized,
        {
            self
        }
    }
    impl PipeCheck for NodeId {}

    #[test]
    fn if_else_merges_via_two_boolean_edges() {
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
        let f = find_function(&tree, &prog, "f");
        let cfg = build_function_cfg(&tree, &prog, f);
        let boolean_edges = cfg
            .edges
            .iter()
            .filter(|e| matches!(e.completion, Completion::Boolean(_)))
            .count();
        assert_eq!(boolean_edges, 2);
        assert!(cfg.first.is_some());
        assert!(!cfg.exits.is_empty());
    }

    #[test]
    fn for_loop_has_single_back_edge_into_condition() {
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
        let f = find_function(&tree, &prog, "f");
        let cfg = build_function_cfg(&tree, &prog, f);
        let for_stmt = tree
            .all_nodes()
            .find(|&id| matches!(tree.kind(id), NodeKind::ForStatement))
            .unwrap();
        let cond = tree.for_condition(for_stmt).unwrap();
        let update = tree.for_update(for_stmt).unwrap();
        let back_edges: Vec<_> = cfg
            .edges
            .iter()
            .filter(|e| e.from == update && e.to == cond)
            .collect();
        assert_eq!(back_edges.len(), 1);
    }

    #[test]
    fn assembly_block_is_descended_into_when_analyze_assembly_is_set() {
        let (tree, prog) = build(
            r#"
            contract C {
                function f() public pure returns (uint r) {
                    assembly {
                        r := 1
                    }
                }
            }
            "#,
        );
        let f = find_function(&tree, &prog, "f");
        let asm = tree
            .all_nodes()
            .find(|&n| matches!(tree.kind(n), NodeKind::AssemblyStatement))
            .unwrap();
        let yul_assignment = tree
            .all_nodes()
            .find(|&n| matches!(tree.kind(n), NodeKind::YulAssignment))
            .unwrap();

        let cfg = build_function_cfg_with_options(&tree, &prog, f, true);
        assert!(cfg.reachable.contains(&yul_assignment));

        let opaque_cfg = build_function_cfg_with_options(&tree, &prog, f, false);
        assert!(!opaque_cfg.reachable.contains(&yul_assignment));
        assert!(opaque_cfg.reachable.contains(&asm));
    }

    #[test]
    fn modifier_chain_threads_through_placeholder() {
        let (tree, prog) = build(
            r#"
            contract C {
                modifier m0() { require(true); _; }
                function g() public m0 { }
            }
            "#,
        );
        let g = find_function(&tree, &prog, "g");
        let cfg = build_function_cfg(&tree, &prog, g);
        assert!(cfg.first.is_some());
        let m0 = prog.modifiers.values().find(|m| m.name == "m0").unwrap();
        let m0_body = m0.body.unwrap();
        assert_eq!(cfg.first, Some(CfgBuilder::new(&tree).first(m0_body)));
    }
}
