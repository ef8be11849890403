// SPDX-License-Identifier: Apache-2.0

//! The arena: an immutable, indexed lowering of a [`solang_parser`] parse
//! tree.
//!
//! Spec.md §3 describes the external tree as "an opaque identifier into the
//! external tree with operations: `kind`, `children[i]`, `parent`,
//! `location`, `text`". [`Tree`] is the concrete form of that contract: a
//! single `Vec<Node>` arena addressed by [`NodeId`], built once by [`lower`]
//! from a `solang_parser::pt::SourceUnit` and never mutated afterwards
//! (Design Notes §9: "represent nodes as indices into a `Vec`-style arena...
//! do not embed owning pointers between nodes").
//!
//! Every analysis component in this crate (`cfg`, `blocks`, `dominance`,
//! `callgraph`, `ssa`, `dataflow`) is a pure function of a `&Tree` (plus, for
//! the call graph and SSA, a `&Program` built from it); none of them hold a
//! parser dependency of their own.

use rustc_hash::FxHashMap;
use solang_parser::pt;

/// Opaque index into [`Tree`]'s arena.
///
/// Deliberately `Copy`/`Eq`/`Hash`/`Ord` so it can be used as a map key and
/// compared for the deterministic ordering spec.md §5 requires ("order by
/// (file, start_line, start_col, node_id)"); node ids are handed out in a
/// preorder walk of the parse tree, so the ordinal already tracks source
/// order within a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The contract-like declaration's flavor. Spec.md only distinguishes
/// Contract/Interface by name; `Library` is a supplemented kind (SPEC_FULL
/// §5) carried because the known-library table (spec.md §4.4) and `using`
/// resolution both need to tell a library apart from an inheritable
/// contract or interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Contract,
    Abstract,
    Interface,
    Library,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Function,
    Constructor,
    Modifier,
    Fallback,
    Receive,
}

/// Binary operators, spanning spec.md's arithmetic/relational/logical/
/// bitwise BinaryExpression family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,
    BitNot,
    Neg,
    Plus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateOp {
    Inc,
    Dec,
}

/// Plain `=` vs. one of the augmented forms (spec.md's
/// AssignmentExpression / AugmentedAssignmentExpression split).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Or,
    And,
    Xor,
    Shl,
    Shr,
}

impl AssignOp {
    #[inline]
    pub fn is_augmented(self) -> bool {
        !matches!(self, AssignOp::Assign)
    }
}

/// The single tagged variant spec.md §3 and Design Notes §9 call for:
/// "represent node kinds as a single tagged variant and decide behavior by
/// pattern match" rather than a class hierarchy. Structural children (left/
/// right, condition/then/else, callee/args, ...) are *not* encoded here —
/// they live at fixed positions in [`Node::children`] and are reached
/// through the typed accessors below, so CFG/call-graph code never indexes
/// by a bare magic number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    SourceUnit,
    ContractDeclaration(ContractKind),
    InheritanceSpecifier,
    UsingDirective,
    StateVariableDeclaration,
    EventDefinition,
    ErrorDefinition,
    EnumDefinition,
    StructDefinition,
    FunctionDefinition(FunctionKind),
    Parameter,
    ModifierInvocation,

    VariableDeclarationStatement,
    BlockStatement { unchecked: bool },
    IfStatement,
    WhileStatement,
    DoWhileStatement,
    ForStatement,
    TryStatement,
    CatchClause,
    ReturnStatement,
    RevertStatement,
    BreakStatement,
    ContinueStatement,
    EmitStatement,
    ExpressionStatement,
    AssemblyStatement,
    UnknownStatement,

    YulBlock,
    YulIf,
    YulFor,
    YulSwitch,
    YulSwitchCase { is_default: bool },
    YulFunctionCall,
    YulFunctionDefinition,
    YulAssignment,
    YulVariableDeclaration,
    YulBreak,
    YulContinue,
    YulLeave,
    YulIdentifier,
    YulLiteral,

    BinaryExpression(BinOp),
    UnaryExpression(UnOp),
    UpdateExpression { op: UpdateOp, prefix: bool },
    AssignmentExpression(AssignOp),
    CallExpression,
    NamedCallExpression,
    MemberExpression,
    ArrayAccess,
    ArraySlice,
    TernaryExpression,
    NewExpression,
    DeleteExpression,
    ParenthesisExpression,
    TupleExpression,
    ArrayLiteral,
    TypeExpression,

    Identifier,
    NumberLiteral,
    StringLiteral,
    BoolLiteral,
    HexLiteral,
    AddressLiteral,
}

impl NodeKind {
    /// Statements/expressions/Yul forms the CFG builder assigns edges to
    /// (spec.md §3 "CFG node... kind in the designated executable set").
    pub fn is_executable(self) -> bool {
        !matches!(
            self,
            NodeKind::SourceUnit
                | NodeKind::ContractDeclaration(_)
                | NodeKind::InheritanceSpecifier
                | NodeKind::UsingDirective
                | NodeKind::StateVariableDeclaration
                | NodeKind::EventDefinition
                | NodeKind::ErrorDefinition
                | NodeKind::EnumDefinition
                | NodeKind::StructDefinition
                | NodeKind::FunctionDefinition(_)
                | NodeKind::Parameter
                | NodeKind::ModifierInvocation
        )
    }

    pub fn is_entry(self) -> bool {
        matches!(self, NodeKind::FunctionDefinition(_))
    }
}

/// A source location resolved to (file, line, col) pairs, per spec.md §3's
/// `location (file, start_line, start_col, end_line, end_col)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub file: usize,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub loc: pt::Loc,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Identifier/literal text, or an operator's library-call member name;
    /// `None` for purely structural nodes.
    pub text: Option<Box<str>>,
}

/// The arena. Immutable once [`lower`] returns: every derived relation in
/// this crate (`cfg`, `blocks`, `dominance`, `callgraph`, `ssa`, `dataflow`)
/// borrows a `&Tree` and never mutates it, matching spec.md §5's "syntax
/// tree is read-only and shared by all workers."
#[derive(Debug)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
    sources: Vec<String>,
    line_starts: Vec<Vec<u32>>,
    /// Declared-type text for `Parameter` nodes and local-variable
    /// `Identifier` decl nodes, keyed by that node (spec.md §4.4's "name-
    /// matching its declared type to a known contract/interface
    /// declaration" needs this for parameters and locals the same way
    /// `StateVariableDeclaration`'s `name:type` text already serves state
    /// variables).
    declared_types: FxHashMap<NodeId, Box<str>>,
}

impl Tree {
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn child(&self, id: NodeId, i: usize) -> Option<NodeId> {
        self.nodes[id.index()].children.get(i).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].text.as_deref()
    }

    pub fn raw_loc(&self, id: NodeId) -> pt::Loc {
        self.nodes[id.index()].loc
    }

    pub fn location(&self, id: NodeId) -> Location {
        let loc = self.raw_loc(id);
        match loc {
            pt::Loc::File(file, start, end) => {
                let (start_line, start_col) = self.line_col(file, start);
                let (end_line, end_col) = self.line_col(file, end);
                Location {
                    file,
                    start_line,
                    start_col,
                    end_line,
                    end_col,
                }
            }
            _ => Location {
                file: usize::MAX,
                start_line: 0,
                start_col: 0,
                end_line: 0,
                end_col: 0,
            },
        }
    }

    fn line_col(&self, file: usize, offset: usize) -> (u32, u32) {
        let Some(starts) = self.line_starts.get(file) else {
            return (0, 0);
        };
        let offset = offset as u32;
        let line = match starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let col = offset - starts.get(line).copied().unwrap_or(0);
        (line as u32 + 1, col + 1)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Declared type text of a `Parameter` or local-variable decl
    /// `Identifier` node, when the lowerer could recover one textually
    /// (spec.md §4.4 name-based type matching).
    pub fn declared_type_of(&self, id: NodeId) -> Option<&str> {
        self.declared_types.get(&id).map(|s| s.as_ref())
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId(i as u32))
    }

    /// Deterministic ordering per spec.md §5: `(file, start_line,
    /// start_col, node_id)`.
    pub fn order_key(&self, id: NodeId) -> (usize, u32, u32, u32) {
        let loc = self.location(id);
        (loc.file, loc.start_line, loc.start_col, id.0)
    }

    // ---- typed structural accessors -----------------------------------
    // Fixed child positions established by `lower`; documented per kind so
    // CFG/call-graph code never indexes by a bare magic number.

    pub fn if_condition(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("IfStatement.condition")
    }
    pub fn if_then(&self, id: NodeId) -> NodeId {
        self.child(id, 1).expect("IfStatement.then")
    }
    pub fn if_else(&self, id: NodeId) -> Option<NodeId> {
        self.child(id, 2)
    }

    pub fn while_condition(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("WhileStatement.condition")
    }
    pub fn while_body(&self, id: NodeId) -> NodeId {
        self.child(id, 1).expect("WhileStatement.body")
    }

    pub fn do_while_body(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("DoWhileStatement.body")
    }
    pub fn do_while_condition(&self, id: NodeId) -> NodeId {
        self.child(id, 1).expect("DoWhileStatement.condition")
    }

    /// `ForStatement` children are always `[init?, cond?, update?, body?]`
    /// at fixed positions 0..4, each possibly an absent slot represented by
    /// a reserved `NodeId` sentinel stored as `None` in a side table; we
    /// instead store only the present ones and track which slots exist via
    /// a 4-bit-packed marker kept alongside in `text` as `"ICUB"`-style
    /// flags. To keep this simple and robust, the lowering always emits
    /// exactly four children, using a `ExpressionStatement`-wrapped no-op
    /// placeholder is avoided by instead recording presence with `Option`
    /// slots in a dedicated side table.
    pub fn for_init(&self, id: NodeId) -> Option<NodeId> {
        self.for_slots(id)[0]
    }
    pub fn for_condition(&self, id: NodeId) -> Option<NodeId> {
        self.for_slots(id)[1]
    }
    pub fn for_update(&self, id: NodeId) -> Option<NodeId> {
        self.for_slots(id)[2]
    }
    pub fn for_body(&self, id: NodeId) -> Option<NodeId> {
        self.for_slots(id)[3]
    }
    fn for_slots(&self, id: NodeId) -> [Option<NodeId>; 4] {
        let mask = self
            .text(id)
            .and_then(|s| s.parse::<u8>().ok())
            .unwrap_or(0);
        let children = self.children(id);
        let mut slots = [None; 4];
        let mut ci = 0;
        for (i, slot) in slots.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                *slot = children.get(ci).copied();
                ci += 1;
            }
        }
        slots
    }

    pub fn block_statements(&self, id: NodeId) -> &[NodeId] {
        self.children(id)
    }

    pub fn try_attempt(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("TryStatement.attempt")
    }
    /// Remaining children are catch clauses (success-body is folded into
    /// catch index 0 as a synthetic clause when `returns` is present, see
    /// `lower::lower_try`).
    pub fn try_clauses(&self, id: NodeId) -> &[NodeId] {
        &self.children(id)[1..]
    }
    pub fn catch_body(&self, id: NodeId) -> NodeId {
        *self
            .children(id)
            .last()
            .expect("CatchClause.body is always last child")
    }

    pub fn return_value(&self, id: NodeId) -> Option<NodeId> {
        self.child(id, 0)
    }
    pub fn revert_callee(&self, id: NodeId) -> Option<NodeId> {
        self.child(id, 0)
    }
    pub fn revert_args(&self, id: NodeId) -> &[NodeId] {
        let c = self.children(id);
        if c.is_empty() {
            &[]
        } else {
            &c[1..]
        }
    }
    pub fn emit_call(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("EmitStatement.call")
    }
    pub fn expr_stmt_expr(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("ExpressionStatement.expr")
    }
    pub fn var_decl_stmt_init(&self, id: NodeId) -> Option<NodeId> {
        // Last child is the initializer when present, and the declaration
        // count (for tuple destructuring) is recorded in `text`.
        let n = self.declared_count(id);
        self.child(id, n)
    }
    pub fn declared_count(&self, id: NodeId) -> usize {
        self.text(id)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(1)
    }
    pub fn declared_vars(&self, id: NodeId) -> &[NodeId] {
        &self.children(id)[..self.declared_count(id)]
    }

    pub fn binary_left(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("BinaryExpression.left")
    }
    pub fn binary_right(&self, id: NodeId) -> NodeId {
        self.child(id, 1).expect("BinaryExpression.right")
    }
    pub fn unary_operand(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("UnaryExpression.operand")
    }
    pub fn assign_left(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("AssignmentExpression.left")
    }
    pub fn assign_right(&self, id: NodeId) -> NodeId {
        self.child(id, 1).expect("AssignmentExpression.right")
    }
    pub fn call_callee(&self, id: NodeId) -> Option<NodeId> {
        self.child(id, 0)
    }
    pub fn call_args(&self, id: NodeId) -> &[NodeId] {
        let c = self.children(id);
        if c.is_empty() {
            &[]
        } else {
            &c[1..]
        }
    }
    pub fn member_object(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("MemberExpression.object")
    }
    pub fn member_name(&self, id: NodeId) -> &str {
        self.text(id).unwrap_or_default()
    }
    pub fn index_base(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("ArrayAccess.base")
    }
    pub fn index_index(&self, id: NodeId) -> Option<NodeId> {
        self.child(id, 1)
    }
    pub fn ternary_condition(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("TernaryExpression.condition")
    }
    pub fn ternary_consequence(&self, id: NodeId) -> NodeId {
        self.child(id, 1).expect("TernaryExpression.consequence")
    }
    pub fn ternary_alternative(&self, id: NodeId) -> NodeId {
        self.child(id, 2).expect("TernaryExpression.alternative")
    }

    pub fn modifier_invocation_name(&self, id: NodeId) -> &str {
        self.text(id).unwrap_or_default()
    }
    pub fn modifier_invocation_args(&self, id: NodeId) -> &[NodeId] {
        self.children(id)
    }

    pub fn function_body(&self, id: NodeId) -> Option<NodeId> {
        // last child, if a body was parsed, is tagged via side table in
        // `Program`; structurally it's simply absent when declaration-only.
        self.children(id).last().copied()
    }

    pub fn function_kind(&self, id: NodeId) -> FunctionKind {
        match self.kind(id) {
            NodeKind::FunctionDefinition(k) => k,
            _ => panic!("not a FunctionDefinition"),
        }
    }

    pub fn yul_if_condition(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("YulIf.condition")
    }
    pub fn yul_if_body(&self, id: NodeId) -> NodeId {
        self.child(id, 1).expect("YulIf.body")
    }
    pub fn yul_for_init(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("YulFor.init")
    }
    pub fn yul_for_condition(&self, id: NodeId) -> NodeId {
        self.child(id, 1).expect("YulFor.condition")
    }
    pub fn yul_for_post(&self, id: NodeId) -> NodeId {
        self.child(id, 2).expect("YulFor.post")
    }
    pub fn yul_for_body(&self, id: NodeId) -> NodeId {
        self.child(id, 3).expect("YulFor.body")
    }
    pub fn yul_switch_expr(&self, id: NodeId) -> NodeId {
        self.child(id, 0).expect("YulSwitch.expression")
    }
    pub fn yul_switch_cases(&self, id: NodeId) -> &[NodeId] {
        &self.children(id)[1..]
    }
    pub fn yul_case_body(&self, id: NodeId) -> NodeId {
        *self.children(id).last().expect("YulSwitchCase.body")
    }
}

/// Side tables produced alongside `Tree` by [`lower`] but not part of the
/// arena itself — contract/function/modifier/variable declaration metadata.
/// Kept in `program.rs`; `lower` returns both.
pub struct Lowered {
    pub tree: Tree,
    pub contracts: Vec<NodeId>,
    pub free_functions: Vec<NodeId>,
}

struct Lowerer {
    nodes: Vec<Node>,
    declared_types: FxHashMap<NodeId, Box<str>>,
}

impl Lowerer {
    fn push(&mut self, kind: NodeKind, loc: pt::Loc, text: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            loc,
            parent: None,
            children: Vec::new(),
            text: text.map(String::into_boxed_str),
        });
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    fn lower_source_unit(&mut self, unit: &pt::SourceUnit) -> (NodeId, Vec<NodeId>, Vec<NodeId>) {
        let root = self.push(NodeKind::SourceUnit, pt::Loc::Builtin, None);
        let mut contracts = Vec::new();
        let mut free_functions = Vec::new();
        for part in &unit.0 {
            match part {
                pt::SourceUnitPart::ContractDefinition(c) => {
                    let id = self.lower_contract(c);
                    self.attach(root, id);
                    contracts.push(id);
                }
                pt::SourceUnitPart::FunctionDefinition(f) => {
                    let id = self.lower_function(f);
                    self.attach(root, id);
                    free_functions.push(id);
                }
                pt::SourceUnitPart::VariableDefinition(v) => {
                    let id = self.lower_state_variable(v);
                    self.attach(root, id);
                }
                pt::SourceUnitPart::Using(u) => {
                    let id = self.lower_using(u);
                    self.attach(root, id);
                }
                _ => {}
            }
        }
        (root, contracts, free_functions)
    }

    fn lower_contract(&mut self, c: &pt::ContractDefinition) -> NodeId {
        let kind = match c.ty {
            pt::ContractTy::Abstract(_) => ContractKind::Abstract,
            pt::ContractTy::Contract(_) => ContractKind::Contract,
            pt::ContractTy::Interface(_) => ContractKind::Interface,
            pt::ContractTy::Library(_) => ContractKind::Library,
        };
        let name = c.name.as_ref().map(|i| i.name.clone());
        let id = self.push(NodeKind::ContractDeclaration(kind), c.loc, name);
        for base in &c.base {
            let bname = path_text(&base.name);
            let bid = self.push(NodeKind::InheritanceSpecifier, base.loc, Some(bname));
            if let Some(args) = &base.args {
                for a in args {
                    let aid = self.lower_expression(a);
                    self.attach(bid, aid);
                }
            }
            self.attach(id, bid);
        }
        for part in &c.parts {
            match part {
                pt::ContractPart::VariableDefinition(v) => {
                    let vid = self.lower_state_variable(v);
                    self.attach(id, vid);
                }
                pt::ContractPart::FunctionDefinition(f) => {
                    let fid = self.lower_function(f);
                    self.attach(id, fid);
                }
                pt::ContractPart::Using(u) => {
                    let uid = self.lower_using(u);
                    self.attach(id, uid);
                }
                pt::ContractPart::EventDefinition(e) => {
                    let name = e.name.as_ref().map(|i| i.name.clone());
                    let eid = self.push(NodeKind::EventDefinition, e.loc, name);
                    self.attach(id, eid);
                }
                pt::ContractPart::ErrorDefinition(e) => {
                    let name = e.name.as_ref().map(|i| i.name.clone());
                    let eid = self.push(NodeKind::ErrorDefinition, e.loc, name);
                    self.attach(id, eid);
                }
                pt::ContractPart::EnumDefinition(e) => {
                    let name = e.name.as_ref().map(|i| i.name.clone());
                    let eid = self.push(NodeKind::EnumDefinition, e.loc, name);
                    self.attach(id, eid);
                }
                pt::ContractPart::StructDefinition(s) => {
                    let name = s.name.as_ref().map(|i| i.name.clone());
                    let sid = self.push(NodeKind::StructDefinition, s.loc, name);
                    self.attach(id, sid);
                }
                _ => {}
            }
        }
        id
    }

    fn lower_using(&mut self, u: &pt::Using) -> NodeId {
        let libs: Vec<String> = match &u.list {
            pt::UsingList::Library(path) => vec![path_text(path)],
            pt::UsingList::Functions(fns) => fns.iter().map(|f| path_text(&f.path)).collect(),
            pt::UsingList::Error => vec![],
        };
        let ty_text = u
            .ty
            .as_ref()
            .map(|e| expr_type_name(e))
            .unwrap_or_else(|| "*".to_string());
        self.push(
            NodeKind::UsingDirective,
            u.loc,
            Some(format!("{}|{}", libs.join(","), ty_text)),
        )
    }

    fn lower_state_variable(&mut self, v: &pt::VariableDefinition) -> NodeId {
        let name = v.name.as_ref().map(|i| i.name.clone());
        let ty = expr_type_name(&v.ty);
        let id = self.push(
            NodeKind::StateVariableDeclaration,
            v.loc,
            Some(format!("{}:{}", name.unwrap_or_default(), ty)),
        );
        if let Some(init) = &v.initializer {
            let eid = self.lower_expression(init);
            self.attach(id, eid);
        }
        id
    }

    fn lower_function(&mut self, f: &pt::FunctionDefinition) -> NodeId {
        let kind = match f.ty {
            pt::FunctionTy::Constructor => FunctionKind::Constructor,
            pt::FunctionTy::Function => FunctionKind::Function,
            pt::FunctionTy::Fallback => FunctionKind::Fallback,
            pt::FunctionTy::Receive => FunctionKind::Receive,
            pt::FunctionTy::Modifier => FunctionKind::Modifier,
        };
        let name = f.name.as_ref().map(|i| i.name.clone());
        let id = self.push(NodeKind::FunctionDefinition(kind), f.loc, name);
        for (loc, param) in &f.params {
            let pname = param.as_ref().and_then(|p| p.name.as_ref()).map(|i| i.name.clone());
            let pid = self.push(NodeKind::Parameter, *loc, pname);
            if let Some(p) = param {
                let ty = expr_type_name(&p.ty);
                if !ty.is_empty() {
                    self.declared_types.insert(pid, ty.into_boxed_str());
                }
            }
            self.attach(id, pid);
        }
        for attr in &f.attributes {
            if let pt::FunctionAttribute::BaseOrModifier(loc, base) = attr {
                let mname = path_text(&base.name);
                let mid = self.push(NodeKind::ModifierInvocation, *loc, Some(mname));
                if let Some(args) = &base.args {
                    for a in args {
                        let aid = self.lower_expression(a);
                        self.attach(mid, aid);
                    }
                }
                self.attach(id, mid);
            }
        }
        if let Some(body) = &f.body {
            let bid = self.lower_statement(body);
            self.attach(id, bid);
        }
        id
    }

    fn lower_statement(&mut self, s: &pt::Statement) -> NodeId {
        use pt::Statement as S;
        match s {
            S::Block {
                loc,
                unchecked,
                statements,
            } => {
                let id = self.push(
                    NodeKind::BlockStatement {
                        unchecked: *unchecked,
                    },
                    *loc,
                    None,
                );
                for st in statements {
                    let sid = self.lower_statement(st);
                    self.attach(id, sid);
                }
                id
            }
            S::If(loc, cond, then, else_) => {
                let id = self.push(NodeKind::IfStatement, *loc, None);
                let c = self.lower_expression(cond);
                self.attach(id, c);
                let t = self.lower_statement(then);
                self.attach(id, t);
                if let Some(e) = else_ {
                    let eid = self.lower_statement(e);
                    self.attach(id, eid);
                }
                id
            }
            S::While(loc, cond, body) => {
                let id = self.push(NodeKind::WhileStatement, *loc, None);
                let c = self.lower_expression(cond);
                self.attach(id, c);
                let b = self.lower_statement(body);
                self.attach(id, b);
                id
            }
            S::DoWhile(loc, body, cond) => {
                let id = self.push(NodeKind::DoWhileStatement, *loc, None);
                let b = self.lower_statement(body);
                self.attach(id, b);
                let c = self.lower_expression(cond);
                self.attach(id, c);
                id
            }
            S::For(loc, init, cond, update, body) => {
                let mut mask: u8 = 0;
                let mut kids = Vec::new();
                if let Some(i) = init {
                    mask |= 1;
                    kids.push(self.lower_statement(i));
                }
                if let Some(c) = cond {
                    mask |= 2;
                    kids.push(self.lower_expression(c));
                }
                if let Some(u) = update {
                    mask |= 4;
                    kids.push(self.lower_expression(u));
                }
                if let Some(b) = body {
                    mask |= 8;
                    kids.push(self.lower_statement(b));
                }
                let id = self.push(NodeKind::ForStatement, *loc, Some(mask.to_string()));
                for k in kids {
                    self.attach(id, k);
                }
                id
            }
            S::Continue(loc) => self.push(NodeKind::ContinueStatement, *loc, None),
            S::Break(loc) => self.push(NodeKind::BreakStatement, *loc, None),
            S::Return(loc, expr) => {
                let id = self.push(NodeKind::ReturnStatement, *loc, None);
                if let Some(e) = expr {
                    let eid = self.lower_expression(e);
                    self.attach(id, eid);
                }
                id
            }
            S::Revert(loc, path, args) => {
                let name = path.as_ref().map(path_text);
                let id = self.push(NodeKind::RevertStatement, *loc, name);
                for a in args {
                    let aid = self.lower_expression(a);
                    self.attach(id, aid);
                }
                id
            }
            S::RevertNamedArgs(loc, path, args) => {
                let name = path.as_ref().map(path_text);
                let id = self.push(NodeKind::RevertStatement, *loc, name);
                for a in args {
                    let aid = self.lower_expression(&a.expr);
                    self.attach(id, aid);
                }
                id
            }
            S::Emit(loc, call) => {
                let id = self.push(NodeKind::EmitStatement, *loc, None);
                let cid = self.lower_expression(call);
                self.attach(id, cid);
                id
            }
            S::Expression(loc, expr) => {
                let id = self.push(NodeKind::ExpressionStatement, *loc, None);
                let eid = self.lower_expression(expr);
                self.attach(id, eid);
                id
            }
            S::VariableDefinition(loc, decl, init) => {
                let id = self.push(
                    NodeKind::VariableDeclarationStatement,
                    *loc,
                    Some("1".to_string()),
                );
                let dname = decl.name.as_ref().map(|i| i.name.clone());
                let did = self.push(NodeKind::Identifier, decl.loc, dname);
                let ty = expr_type_name(&decl.ty);
                if !ty.is_empty() {
                    self.declared_types.insert(did, ty.into_boxed_str());
                }
                self.attach(id, did);
                if let Some(e) = init {
                    let eid = self.lower_expression(e);
                    self.attach(id, eid);
                }
                id
            }
            S::Try(loc, expr, returns, catches) => {
                let id = self.push(NodeKind::TryStatement, *loc, None);
                let attempt = self.lower_expression(expr);
                self.attach(id, attempt);
                if let Some((_, success_body)) = returns {
                    let sid = self.push(NodeKind::CatchClause, *loc, Some("success".into()));
                    let b = self.lower_statement(success_body);
                    self.attach(sid, b);
                    self.attach(id, sid);
                }
                for c in catches {
                    let (cloc, body) = match c {
                        pt::CatchClause::Simple(l, _, body) => (*l, body),
                        pt::CatchClause::Named(l, _, _, body) => (*l, body),
                    };
                    let cid = self.push(NodeKind::CatchClause, cloc, None);
                    let b = self.lower_statement(body);
                    self.attach(cid, b);
                    self.attach(id, cid);
                }
                id
            }
            S::Assembly { loc, block, .. } => {
                let id = self.push(NodeKind::AssemblyStatement, *loc, None);
                let bid = self.lower_yul_block(block);
                self.attach(id, bid);
                id
            }
            S::Args(loc, _) | S::Error(loc) => self.push(NodeKind::UnknownStatement, *loc, None),
        }
    }

    fn lower_yul_block(&mut self, b: &pt::YulBlock) -> NodeId {
        let id = self.push(NodeKind::YulBlock, b.loc, None);
        for s in &b.statements {
            let sid = self.lower_yul_statement(s);
            self.attach(id, sid);
        }
        id
    }

    fn lower_yul_statement(&mut self, s: &pt::YulStatement) -> NodeId {
        use pt::YulStatement as Y;
        match s {
            Y::Block(b) => self.lower_yul_block(b),
            Y::If(loc, cond, body) => {
                let id = self.push(NodeKind::YulIf, *loc, None);
                let c = self.lower_yul_expression(cond);
                self.attach(id, c);
                let b = self.lower_yul_block(body);
                self.attach(id, b);
                id
            }
            Y::For(f) => {
                let id = self.push(NodeKind::YulFor, f.loc, None);
                let init = self.lower_yul_block(&f.init_block);
                self.attach(id, init);
                let cond = self.lower_yul_expression(&f.condition);
                self.attach(id, cond);
                let post = self.lower_yul_block(&f.post_block);
                self.attach(id, post);
                let body = self.lower_yul_block(&f.execution_block);
                self.attach(id, body);
                id
            }
            Y::Switch(sw) => {
                let id = self.push(NodeKind::YulSwitch, sw.loc, None);
                let e = self.lower_yul_expression(&sw.condition);
                self.attach(id, e);
                for case in &sw.cases {
                    let cid = self.lower_yul_case(case);
                    self.attach(id, cid);
                }
                if let Some(default) = &sw.default {
                    let cid = self.lower_yul_case(default);
                    self.attach(id, cid);
                }
                id
            }
            Y::Leave(loc) => self.push(NodeKind::YulLeave, *loc, None),
            Y::Break(loc) => self.push(NodeKind::YulBreak, *loc, None),
            Y::Continue(loc) => self.push(NodeKind::YulContinue, *loc, None),
            Y::Assign(loc, targets, value) => {
                let id = self.push(NodeKind::YulAssignment, *loc, None);
                for t in targets {
                    let tid = self.lower_yul_expression(t);
                    self.attach(id, tid);
                }
                let v = self.lower_yul_expression(value);
                self.attach(id, v);
                id
            }
            Y::VariableDeclaration(loc, vars, value) => {
                let id = self.push(NodeKind::YulVariableDeclaration, *loc, None);
                for v in vars {
                    let vid = self.push(NodeKind::YulIdentifier, v.loc, Some(v.id.name.clone()));
                    self.attach(id, vid);
                }
                if let Some(val) = value {
                    let vid = self.lower_yul_expression(val);
                    self.attach(id, vid);
                }
                id
            }
            Y::FunctionDefinition(f) => {
                let id = self.push(NodeKind::YulFunctionDefinition, f.loc, Some(f.id.name.clone()));
                let b = self.lower_yul_block(&f.body);
                self.attach(id, b);
                id
            }
            Y::FunctionCall(c) => self.lower_yul_call(c),
            Y::Error(loc) => self.push(NodeKind::YulLeave, *loc, None),
        }
    }

    fn lower_yul_case(&mut self, c: &pt::YulSwitchOptions) -> NodeId {
        match c {
            pt::YulSwitchOptions::Case(loc, expr, body) => {
                let id = self.push(NodeKind::YulSwitchCase { is_default: false }, *loc, None);
                let e = self.lower_yul_expression(expr);
                self.attach(id, e);
                let b = self.lower_yul_block(body);
                self.attach(id, b);
                id
            }
            pt::YulSwitchOptions::Default(loc, body) => {
                let id = self.push(NodeKind::YulSwitchCase { is_default: true }, *loc, None);
                let b = self.lower_yul_block(body);
                self.attach(id, b);
                id
            }
        }
    }

    fn lower_yul_call(&mut self, c: &pt::YulFunctionCall) -> NodeId {
        let id = self.push(NodeKind::YulFunctionCall, c.loc, Some(c.id.name.clone()));
        for a in &c.arguments {
            let aid = self.lower_yul_expression(a);
            self.attach(id, aid);
        }
        id
    }

    fn lower_yul_expression(&mut self, e: &pt::YulExpression) -> NodeId {
        use pt::YulExpression as Y;
        match e {
            Y::Variable(ident) => self.push(NodeKind::YulIdentifier, ident.loc, Some(ident.name.clone())),
            Y::FunctionCall(c) => self.lower_yul_call(c),
            Y::SuffixAccess(loc, base, field) => {
                let id = self.push(NodeKind::YulIdentifier, *loc, Some(field.name.clone()));
                let b = self.lower_yul_expression(base);
                self.attach(id, b);
                id
            }
            Y::BoolLiteral(loc, v, _) => self.push(NodeKind::YulLiteral, *loc, Some(v.to_string())),
            Y::NumberLiteral(loc, v, _, _) => self.push(NodeKind::YulLiteral, *loc, Some(v.clone())),
            Y::HexNumberLiteral(loc, v, _) => self.push(NodeKind::YulLiteral, *loc, Some(v.clone())),
            Y::HexStringLiteral(h, _) => self.push(NodeKind::YulLiteral, h.loc, Some(h.hex.clone())),
            Y::StringLiteral(s, _) => self.push(NodeKind::YulLiteral, s.loc, Some(s.string.clone())),
        }
    }

    fn lower_expression(&mut self, e: &pt::Expression) -> NodeId {
        use pt::Expression as E;
        match e {
            E::Variable(ident) => self.push(NodeKind::Identifier, ident.loc, Some(ident.name.clone())),
            E::BoolLiteral(loc, v) => self.push(NodeKind::BoolLiteral, *loc, Some(v.to_string())),
            E::NumberLiteral(loc, v, _, _) | E::RationalNumberLiteral(loc, v, _, _, _) => {
                self.push(NodeKind::NumberLiteral, *loc, Some(v.clone()))
            }
            E::HexNumberLiteral(loc, v, _) => self.push(NodeKind::NumberLiteral, *loc, Some(v.clone())),
            E::StringLiteral(parts) => {
                let loc = parts.first().map(|p| p.loc).unwrap_or_default();
                let text = parts.iter().map(|p| p.string.clone()).collect::<Vec<_>>().join("");
                self.push(NodeKind::StringLiteral, loc, Some(text))
            }
            E::HexLiteral(parts) => {
                let loc = parts.first().map(|p| p.loc).unwrap_or_default();
                self.push(NodeKind::HexLiteral, loc, Some(parts.iter().map(|p| p.hex.clone()).collect()))
            }
            E::AddressLiteral(loc, addr) => self.push(NodeKind::AddressLiteral, *loc, Some(addr.clone())),
            E::Type(loc, ty) => self.push(NodeKind::TypeExpression, *loc, Some(type_name(ty))),

            E::Parenthesis(loc, inner) => {
                let id = self.push(NodeKind::ParenthesisExpression, *loc, None);
                let iid = self.lower_expression(inner);
                self.attach(id, iid);
                id
            }
            E::List(loc, params) => {
                let id = self.push(NodeKind::TupleExpression, *loc, None);
                for (ploc, p) in params {
                    let pid = match p {
                        Some(p) => {
                            let name = p.name.as_ref().map(|i| i.name.clone());
                            self.push(NodeKind::Identifier, *ploc, name)
                        }
                        None => self.push(NodeKind::Identifier, *ploc, None),
                    };
                    self.attach(id, pid);
                }
                id
            }
            E::ArrayLiteral(loc, items) => {
                let id = self.push(NodeKind::ArrayLiteral, *loc, None);
                for it in items {
                    let iid = self.lower_expression(it);
                    self.attach(id, iid);
                }
                id
            }
            E::New(loc, inner) => {
                let id = self.push(NodeKind::NewExpression, *loc, None);
                let iid = self.lower_expression(inner);
                self.attach(id, iid);
                id
            }
            E::Delete(loc, inner) => {
                let id = self.push(NodeKind::DeleteExpression, *loc, None);
                let iid = self.lower_expression(inner);
                self.attach(id, iid);
                id
            }
            E::ArraySubscript(loc, base, index) => {
                let id = self.push(NodeKind::ArrayAccess, *loc, None);
                let bid = self.lower_expression(base);
                self.attach(id, bid);
                if let Some(ix) = index {
                    let ixid = self.lower_expression(ix);
                    self.attach(id, ixid);
                }
                id
            }
            E::ArraySlice(loc, base, start, end) => {
                let id = self.push(NodeKind::ArraySlice, *loc, None);
                let bid = self.lower_expression(base);
                self.attach(id, bid);
                if let Some(s) = start {
                    let sid = self.lower_expression(s);
                    self.attach(id, sid);
                }
                if let Some(e) = end {
                    let eid = self.lower_expression(e);
                    self.attach(id, eid);
                }
                id
            }
            E::MemberAccess(loc, obj, name) => {
                let id = self.push(NodeKind::MemberExpression, *loc, Some(name.name.clone()));
                let oid = self.lower_expression(obj);
                self.attach(id, oid);
                id
            }
            E::FunctionCall(loc, callee, args) => {
                let id = self.push(NodeKind::CallExpression, *loc, None);
                let cid = self.lower_expression(callee);
                self.attach(id, cid);
                for a in args {
                    let aid = self.lower_expression(a);
                    self.attach(id, aid);
                }
                id
            }
            E::FunctionCallBlock(loc, callee, block) => {
                // `callee{value: v}` — fold the `{...}` named-arg block's
                // keys/values in as trailing args, preserving the callee at
                // position 0 like a plain call. `block` is guaranteed to be
                // `Statement::Args` by the parser.
                let id = self.push(NodeKind::CallExpression, *loc, None);
                let cid = self.lower_expression(callee);
                self.attach(id, cid);
                if let pt::Statement::Args(_, named) = block.as_ref() {
                    for a in named {
                        let aid = self.lower_expression(&a.expr);
                        self.attach(id, aid);
                    }
                }
                id
            }
            E::NamedFunctionCall(loc, callee, args) => {
                let id = self.push(NodeKind::NamedCallExpression, *loc, None);
                let cid = self.lower_expression(callee);
                self.attach(id, cid);
                for a in args {
                    let aid = self.lower_expression(&a.expr);
                    self.attach(id, aid);
                }
                id
            }
            E::ConditionalOperator(loc, cond, yes, no) => {
                let id = self.push(NodeKind::TernaryExpression, *loc, None);
                let c = self.lower_expression(cond);
                self.attach(id, c);
                let y = self.lower_expression(yes);
                self.attach(id, y);
                let n = self.lower_expression(no);
                self.attach(id, n);
                id
            }

            E::PostIncrement(loc, x) => self.lower_update(*loc, x, UpdateOp::Inc, false),
            E::PostDecrement(loc, x) => self.lower_update(*loc, x, UpdateOp::Dec, false),
            E::PreIncrement(loc, x) => self.lower_update(*loc, x, UpdateOp::Inc, true),
            E::PreDecrement(loc, x) => self.lower_update(*loc, x, UpdateOp::Dec, true),

            E::Not(loc, x) => self.lower_unary(*loc, x, UnOp::Not),
            E::BitwiseNot(loc, x) => self.lower_unary(*loc, x, UnOp::BitNot),
            E::Negate(loc, x) => self.lower_unary(*loc, x, UnOp::Neg),
            E::UnaryPlus(loc, x) => self.lower_unary(*loc, x, UnOp::Plus),

            E::Power(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Pow),
            E::Multiply(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Mul),
            E::Divide(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Div),
            E::Modulo(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Mod),
            E::Add(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Add),
            E::Subtract(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Sub),
            E::ShiftLeft(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Shl),
            E::ShiftRight(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Shr),
            E::BitwiseAnd(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::BitAnd),
            E::BitwiseXor(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::BitXor),
            E::BitwiseOr(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::BitOr),
            E::Less(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Lt),
            E::More(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Gt),
            E::LessEqual(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Le),
            E::MoreEqual(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Ge),
            E::Equal(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Eq),
            E::NotEqual(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Ne),
            E::And(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::And),
            E::Or(loc, l, r) => self.lower_binary(*loc, l, r, BinOp::Or),

            E::Assign(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Assign),
            E::AssignOr(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Or),
            E::AssignAnd(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::And),
            E::AssignXor(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Xor),
            E::AssignShiftLeft(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Shl),
            E::AssignShiftRight(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Shr),
            E::AssignAdd(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Add),
            E::AssignSubtract(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Sub),
            E::AssignMultiply(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Mul),
            E::AssignDivide(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Div),
            E::AssignModulo(loc, l, r) => self.lower_assign(*loc, l, r, AssignOp::Mod),
        }
    }

    fn lower_update(&mut self, loc: pt::Loc, x: &pt::Expression, op: UpdateOp, prefix: bool) -> NodeId {
        let id = self.push(NodeKind::UpdateExpression { op, prefix }, loc, None);
        let xid = self.lower_expression(x);
        self.attach(id, xid);
        id
    }

    fn lower_unary(&mut self, loc: pt::Loc, x: &pt::Expression, op: UnOp) -> NodeId {
        let id = self.push(NodeKind::UnaryExpression(op), loc, None);
        let xid = self.lower_expression(x);
        self.attach(id, xid);
        id
    }

    fn lower_binary(&mut self, loc: pt::Loc, l: &pt::Expression, r: &pt::Expression, op: BinOp) -> NodeId {
        let id = self.push(NodeKind::BinaryExpression(op), loc, None);
        let lid = self.lower_expression(l);
        self.attach(id, lid);
        let rid = self.lower_expression(r);
        self.attach(id, rid);
        id
    }

    fn lower_assign(&mut self, loc: pt::Loc, l: &pt::Expression, r: &pt::Expression, op: AssignOp) -> NodeId {
        let id = self.push(NodeKind::AssignmentExpression(op), loc, None);
        let lid = self.lower_expression(l);
        self.attach(id, lid);
        let rid = self.lower_expression(r);
        self.attach(id, rid);
        id
    }
}

fn path_text(path: &pt::IdentifierPath) -> String {
    path.identifiers
        .iter()
        .map(|i| i.name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn expr_type_name(e: &pt::Expression) -> String {
    match e {
        pt::Expression::Type(_, ty) => type_name(ty),
        pt::Expression::Variable(ident) => ident.name.clone(),
        pt::Expression::MemberAccess(_, obj, name) => format!("{}.{}", expr_type_name(obj), name.name),
        pt::Expression::ArraySubscript(_, base, _) => format!("{}[]", expr_type_name(base)),
        _ => String::new(),
    }
}

fn type_name(ty: &pt::Type) -> String {
    match ty {
        pt::Type::Address => "address".into(),
        pt::Type::AddressPayable => "address payable".into(),
        pt::Type::Payable => "payable".into(),
        pt::Type::Bool => "bool".into(),
        pt::Type::String => "string".into(),
        pt::Type::Int(n) => format!("int{n}"),
        pt::Type::Uint(n) => format!("uint{n}"),
        pt::Type::Bytes(n) => format!("bytes{n}"),
        pt::Type::Rational => "fixed".into(),
        pt::Type::DynamicBytes => "bytes".into(),
        pt::Type::Mapping { .. } => "mapping".into(),
        pt::Type::Function { .. } => "function".into(),
    }
}

/// Lowers a parsed `SourceUnit` into the arena plus top-level declaration
/// lists. `file_source` supplies each file's raw text (indexed by
/// `file_no`) so [`Tree::location`] can resolve byte offsets to line/column.
pub fn lower(unit: &pt::SourceUnit, file_sources: Vec<String>) -> Lowered {
    let line_starts = file_sources
        .iter()
        .map(|src| {
            let mut starts = vec![0u32];
            for (i, b) in src.bytes().enumerate() {
                if b == b'\n' {
                    starts.push(i as u32 + 1);
                }
            }
            starts
        })
        .collect();

    let mut lowerer = Lowerer {
        nodes: Vec::new(),
        declared_types: FxHashMap::default(),
    };
    let (_root, contracts, free_functions) = lowerer.lower_source_unit(unit);

    Lowered {
        tree: Tree {
            nodes: lowerer.nodes,
            sources: file_sources,
            line_starts,
            declared_types: lowerer.declared_types,
        },
        contracts,
        free_functions,
    }
}

/// Cheap, name-based "what does the source text at this node look like"
/// accessor demanded by spec.md §3's `text` operation; returns the raw
/// source slice the node spans.
impl Tree {
    pub fn source_text(&self, id: NodeId) -> &str {
        match self.raw_loc(id) {
            pt::Loc::File(file, start, end) => self
                .sources
                .get(file)
                .map(|s| &s[start.min(s.len())..end.min(s.len())])
                .unwrap_or(""),
            _ => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_src(src: &str) -> Tree {
        let (unit, _) = solang_parser::parse(src, 0).expect("parses");
        lower(&unit, vec![src.to_string()]).tree
    }

    #[test]
    fn lowers_simple_contract() {
        let tree = lower_src(
            r#"
            contract C {
                uint x;
                function f(uint a) public returns (uint) {
                    if (a > 0) { x = a; } else { x = 0; }
                    return x;
                }
            }
            "#,
        );
        let contract = tree
            .all_nodes()
            .find(|&id| matches!(tree.kind(id), NodeKind::ContractDeclaration(_)))
            .unwrap();
        assert_eq!(tree.text(contract), Some("C"));
        let func = tree
            .children(contract)
            .iter()
            .copied()
            .find(|&id| matches!(tree.kind(id), NodeKind::FunctionDefinition(_)))
            .unwrap();
        assert_eq!(tree.text(func), Some("f"));
        let body = tree.function_body(func).unwrap();
        assert!(matches!(tree.kind(body), NodeKind::BlockStatement { .. }));
    }

    #[test]
    fn for_statement_slot_mask_round_trips() {
        let tree = lower_src(
            r#"
            contract C {
                function f() public {
                    for (uint i = 0; i < 10; i++) { }
                }
            }
            "#,
        );
        let for_stmt = tree
            .all_nodes()
            .find(|&id| matches!(tree.kind(id), NodeKind::ForStatement))
            .unwrap();
        assert!(tree.for_init(for_stmt).is_some());
        assert!(tree.for_condition(for_stmt).is_some());
        assert!(tree.for_update(for_stmt).is_some());
        assert!(tree.for_body(for_stmt).is_some());
    }
}
