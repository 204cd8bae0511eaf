//! The Cursive0 AST (C3): tagged-variant trees for items, types, patterns,
//! expressions, and statements. Produced by an external parser; every node
//! carries a [`Span`] so diagnostics can always point at source text.

pub mod expr;
pub mod item;
pub mod pat;
pub mod stmt;
pub mod ty;

pub use expr::{Expr, ExprKind};
pub use item::{Item, ItemKind};
pub use pat::{Pat, PatKind};
pub use stmt::{Block, Stmt, StmtKind};
pub use ty::{ParamMode, Perm, PtrStateTag, TypeExpr, TypeExprKind};

use cursive0_base::{IdKey, Span};

/// An identifier occurrence: the raw spelling plus its source location.
/// NFC normalization (`IdKey`) happens on demand, not at parse time, so the
/// AST can still report the user's original spelling in diagnostics.
#[derive(Debug, Clone)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

impl Ident {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self { text: text.into(), span }
    }

    pub fn id_key(&self) -> IdKey {
        IdKey::new(&self.text)
    }
}

/// A dotted module or type path, e.g. `a::b::c`.
#[derive(Debug, Clone)]
pub struct Path {
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl Path {
    pub fn single(ident: Ident) -> Self {
        let span = ident.span.clone();
        Path { segments: vec![ident], span }
    }

    pub fn to_path_key(&self) -> cursive0_base::PathKey {
        cursive0_base::PathKey::new(self.segments.iter().map(Ident::id_key).collect())
    }
}

/// Binding form used by `let`/`var`/`shadow` and static declarations: `=`
/// gives `Mov` movability with `Resp`/`Alias` determined by the initializer
/// (§4.11), `:=` forces `Immov`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOp {
    Move,
    Immov,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Let,
    Var,
}
