//! Expression syntax (C8 consumes these via `cursive0_sema::expr`).

use super::{Block, Ident, Path, Pat, TypeExpr};
use cursive0_base::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, Rem, Pow,
    Eq, Ne, Lt, Le, Gt, Ge,
    And, Or,
    BitAnd, BitOr, BitXor, Shl, Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    AddrOf,
    AddrOfMut,
    Deref,
    Move,
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int { text: String, suffix: Option<String> },
    Float(String),
    Bool(bool),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
    Null,
    Unit,
}

/// An argument to a call or method call. `is_move` records whether the
/// textual form carried `move`, used by §4.8's move-mode argument checks.
#[derive(Debug, Clone)]
pub struct Arg {
    pub expr: Expr,
    pub is_move: bool,
}

/// An async-creating form: `spawn`, `race`, `dispatch`, `parallel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncForm {
    Spawn,
    Race,
    Dispatch,
    Parallel,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pat: Pat,
    pub guard: Option<Expr>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Ident(Ident),
    Path(Path),
    Field(Box<Expr>, Ident),
    TupleIndex(Box<Expr>, u32),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Assign(Box<Expr>, Box<Expr>),
    CompoundAssign(BinOp, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Arg>),
    MethodCall(Box<Expr>, Ident, Vec<Arg>),
    Block(Block),
    If(Box<Expr>, Block, Option<Box<Expr>>),
    Match(Box<Expr>, Vec<MatchArm>),
    Loop(Block),
    Break(Option<Box<Expr>>),
    Continue,
    Return(Option<Box<Expr>>),
    Transmute(Box<Expr>, TypeExpr),
    Cast(Box<Expr>, TypeExpr),
    Widen(Box<Expr>, TypeExpr),
    RecordLiteral(Path, Vec<(Ident, Option<Expr>)>),
    Tuple(Vec<Expr>),
    Array(Vec<Expr>),
    /// `^alloc e [in region_alias]` / `r.alloc(e)`.
    Alloc { value: Box<Expr>, region: Option<Ident> },
    /// A modal state transition call, e.g. `file.open()`.
    Transition(Box<Expr>, Ident, Vec<Arg>),
    Async(AsyncForm, Vec<Arg>),
    Unsafe(Block),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether the surface syntax marks this expression as carrying `move`.
    pub fn is_move_expr(&self) -> bool {
        matches!(self.kind, ExprKind::Unary(UnOp::Move, _))
    }

    /// A conservative syntactic place test (§4.8/§4.11): identifier, field,
    /// tuple-index, index, or deref chains rooted at one of those.
    pub fn is_place(&self) -> bool {
        match &self.kind {
            ExprKind::Ident(_) | ExprKind::Path(_) => true,
            ExprKind::Field(base, _) => base.is_place(),
            ExprKind::TupleIndex(base, _) => base.is_place(),
            ExprKind::Index(base, _) => base.is_place(),
            ExprKind::Unary(UnOp::Deref, base) => base.is_place(),
            _ => false,
        }
    }
}
