//! Statement and block syntax.

use super::{BindOp, Expr, Ident, Mutability, Pat, TypeExpr};
use cursive0_base::Span;

#[derive(Debug, Clone)]
pub struct Binding {
    pub mutability: Mutability,
    pub op: BindOp,
    pub pat: Pat,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct RegionOpts {
    pub target: Option<Ident>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Let(Binding),
    Expr(Expr),
    Defer(Box<super::Block>),
    /// `region[(opts)] as r { .. }`.
    Region { alias: Ident, opts: Option<RegionOpts>, body: super::Block },
    /// `frame[(target)] { .. }`.
    Frame { target: Option<Ident>, body: super::Block },
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub tail: Option<Box<super::Expr>>,
    pub span: Span,
}
