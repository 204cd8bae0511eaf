//! Surface type expressions, as written by the programmer. Lowered to
//! `cursive0_sema::types::TypeRef` by C5 (§4.5); kept distinct from the
//! lowered representation because the AST form still carries spans and
//! unresolved paths.

use super::{Ident, Path};
use cursive0_base::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perm {
    Const,
    Unique,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtrStateTag {
    Valid,
    Null,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPtrQual {
    Imm,
    Mut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringBytesState {
    Managed,
    View,
}

#[derive(Debug, Clone)]
pub struct TypeParam {
    pub mode: Option<ParamMode>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Prim(String),
    Perm(Perm, Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    /// Array length as an unevaluated AST expression; reduced via `ConstLen`.
    Array(Box<TypeExpr>, Box<super::Expr>),
    Slice(Box<TypeExpr>),
    Func(Vec<TypeParam>, Box<TypeExpr>),
    Path(Path, Vec<TypeExpr>),
    ModalState(Path, Ident, Vec<TypeExpr>),
    Ptr(Box<TypeExpr>, Option<PtrStateTag>),
    RawPtr(RawPtrQual, Box<TypeExpr>),
    StringTy(Option<StringBytesState>),
    BytesTy(Option<StringBytesState>),
    Dynamic(Path),
    Refine(Box<TypeExpr>, Box<super::Expr>),
    Range,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}
