//! AST/tree pool (§4.6).
//!
//! A single arena of nodes written by the parser and read by every
//! downstream pass. Children are always allocated before their parent
//! (P4, "append-only tree"): the recursive-descent grammar in
//! `parser.rs` never constructs a `Node` until every child `NodeId` it
//! references already exists, so `child < parent` holds by construction
//! rather than by a runtime check.

use rucc_util::{define_idx, IndexVec, Span, Symbol};

use rucc_sem::ModeId;

define_idx!(NodeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Addr,
    Deref,
}

/// The closed set of node classes (§4.6): Expression, Statement,
/// Declaration, Unit.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Expression
    Ident(Symbol),
    IntLiteral(i64),
    FloatLiteral(f64),
    CharLiteral(char),
    StringLiteral(Symbol),
    Subscript { array: NodeId, index: NodeId },
    Call { callee: NodeId, args: Vec<NodeId> },
    Member { base: NodeId, name: Symbol },
    Unary { op: UnOp, operand: NodeId },
    Binary { op: BinOp, lhs: NodeId, rhs: NodeId },
    Ternary { cond: NodeId, then_branch: NodeId, else_branch: NodeId },
    List(Vec<NodeId>),

    // Statement
    DeclStmt(NodeId),
    Labeled { label: Symbol, stmt: NodeId },
    Case { value: NodeId, stmt: NodeId },
    Default(NodeId),
    Compound(Vec<NodeId>),
    ExprStmt(NodeId),
    NullStmt,
    If { cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId> },
    Switch { cond: NodeId, body: NodeId },
    While { cond: NodeId, body: NodeId },
    DoWhile { body: NodeId, cond: NodeId },
    For { init: Option<NodeId>, cond: Option<NodeId>, step: Option<NodeId>, body: NodeId },
    Goto(Symbol),
    Continue,
    Break,
    Return(Option<NodeId>),

    // Declaration
    VariableDecl { name: Symbol, mode: ModeId, init: Option<NodeId> },
    TypeDecl { name: Symbol, mode: ModeId },
    FunctionDecl {
        name: Symbol,
        mode: ModeId,
        params: Vec<Symbol>,
        body: Option<NodeId>,
    },

    // Unit
    TranslationUnit(Vec<NodeId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub ty: Option<ModeId>,
}

/// The append-only AST arena (§4.6, §3's "tape" abstraction realized as
/// a typed arena per Design Note 9.1).
#[derive(Default)]
pub struct Tree {
    nodes: IndexVec<NodeId, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self { nodes: IndexVec::new() }
    }

    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.nodes.push(Node { kind, span, ty: None })
    }

    pub fn alloc_typed(&mut self, kind: NodeKind, span: Span, ty: ModeId) -> NodeId {
        self.nodes.push(Node { kind, span, ty: Some(ty) })
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every child `NodeId` referenced by `id`'s node, for verifying P4.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id].kind {
            NodeKind::Subscript { array, index } => vec![*array, *index],
            NodeKind::Call { callee, args } => {
                let mut v = vec![*callee];
                v.extend(args);
                v
            }
            NodeKind::Member { base, .. } => vec![*base],
            NodeKind::Unary { operand, .. } => vec![*operand],
            NodeKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::Ternary { cond, then_branch, else_branch } => {
                vec![*cond, *then_branch, *else_branch]
            }
            NodeKind::List(items) => items.clone(),
            NodeKind::DeclStmt(decl) => vec![*decl],
            NodeKind::Labeled { stmt, .. } => vec![*stmt],
            NodeKind::Case { value, stmt } => vec![*value, *stmt],
            NodeKind::Default(stmt) => vec![*stmt],
            NodeKind::Compound(stmts) => stmts.clone(),
            NodeKind::ExprStmt(expr) => vec![*expr],
            NodeKind::If { cond, then_branch, else_branch } => {
                let mut v = vec![*cond, *then_branch];
                if let Some(e) = else_branch {
                    v.push(*e);
                }
                v
            }
            NodeKind::Switch { cond, body } => vec![*cond, *body],
            NodeKind::While { cond, body } => vec![*cond, *body],
            NodeKind::DoWhile { body, cond } => vec![*body, *cond],
            NodeKind::For { init, cond, step, body } => {
                let mut v = Vec::new();
                v.extend(*init);
                v.extend(*cond);
                v.extend(*step);
                v.push(*body);
                v
            }
            NodeKind::Return(expr) => expr.iter().copied().collect(),
            NodeKind::VariableDecl { init, .. } => init.iter().copied().collect(),
            NodeKind::FunctionDecl { body, .. } => body.iter().copied().collect(),
            NodeKind::TranslationUnit(items) => items.clone(),
            NodeKind::Ident(_)
            | NodeKind::IntLiteral(_)
            | NodeKind::FloatLiteral(_)
            | NodeKind::CharLiteral(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::NullStmt
            | NodeKind::Goto(_)
            | NodeKind::Continue
            | NodeKind::Break
            | NodeKind::TypeDecl { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rucc_util::{Idx, Span};

    #[test]
    fn children_always_precede_their_parent() {
        let mut tree = Tree::new();
        let lhs = tree.alloc(NodeKind::IntLiteral(1), Span::DUMMY);
        let rhs = tree.alloc(NodeKind::IntLiteral(2), Span::DUMMY);
        let add = tree.alloc(NodeKind::Binary { op: BinOp::Add, lhs, rhs }, Span::DUMMY);
        for child in tree.children_of(add) {
            assert!(child.index() < add.index());
        }
    }

    // P4: every node allocated by the real parser, not just the hand-built
    // tree above, keeps children strictly before their parent.
    #[test]
    fn parsed_expressions_keep_children_before_their_parent() {
        use proptest::prelude::*;

        let operand = || (-1000i64..1000).prop_map(|n| n.to_string());
        let op = || prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")];
        let expr = (operand(), prop::collection::vec((op(), operand()), 0..6)).prop_map(
            |(first, rest)| {
                let mut s = first;
                for (op, term) in rest {
                    s.push_str(op);
                    s.push_str(&term);
                }
                s
            },
        );

        proptest!(|(expr in expr)| {
            let source = format!("int main(){{ return {expr}; }}");
            let (tree, _sema, _root) = crate::parse(&source).unwrap();
            for idx in 0..tree.len() {
                let node = NodeId::from_usize(idx);
                for child in tree.children_of(node) {
                    prop_assert!(child.index() < node.index());
                }
            }
        });
    }
}
