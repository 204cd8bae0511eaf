//! Pattern syntax (C7 consumes these via `cursive0_sema::pattern`).

use super::{Ident, Path, TypeExpr};
use cursive0_base::Span;

#[derive(Debug, Clone)]
pub struct Pat {
    pub kind: PatKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FieldPat {
    pub name: Ident,
    /// `None` for shorthand `R { f, .. }`.
    pub pat: Option<Pat>,
}

#[derive(Debug, Clone)]
pub enum PatKind {
    Wildcard,
    Ident(Ident),
    Literal(super::expr::Literal),
    Tuple(Vec<Pat>),
    Record { path: Path, fields: Vec<FieldPat>, has_rest: bool },
    /// Enum variant or modal state: `E::Variant(p1, ..)` / `T@State { .. }`.
    Variant { path: Path, variant: Ident, payload: Vec<Pat> },
    Typed(Ident, TypeExpr),
    /// `lo..hi` / `lo..=hi`.
    Range { lo: Box<Pat>, hi: Box<Pat>, inclusive: bool },
}

impl Pat {
    pub fn new(kind: PatKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// `PatNames` (§4.7): textual binding names in left-to-right order.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            PatKind::Wildcard | PatKind::Literal(_) | PatKind::Range { .. } => {}
            PatKind::Ident(id) => out.push(&id.text),
            PatKind::Typed(id, _) => out.push(&id.text),
            PatKind::Tuple(elems) => {
                for p in elems {
                    p.collect_names(out);
                }
            }
            PatKind::Record { fields, .. } => {
                for f in fields {
                    match &f.pat {
                        Some(p) => p.collect_names(out),
                        None => out.push(&f.name.text),
                    }
                }
            }
            PatKind::Variant { payload, .. } => {
                for p in payload {
                    p.collect_names(out);
                }
            }
        }
    }
}
