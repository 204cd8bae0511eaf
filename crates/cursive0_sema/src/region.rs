//! Region and provenance inference (C10, §4.10).
//!
//! Grounded in `original_source/.../03_analysis/memory/regions.cpp` — by
//! far the largest single original file — whose `ProvKind`/`ProvTag`/
//! `ProvEnv`/`ProvFlow` structs are reproduced here structurally, and in
//! teacher's `analysis/ownership.rs`/`liveness.rs` for the Rust idiom of a
//! borrow-style pass threading an environment stack through the walk.

use cursive0_base::{Diagnostic, IdKey};
use cursive0_syntax::ast::expr::{Expr, ExprKind, UnOp};
use std::collections::HashMap;

/// A provenance tag: how long a value's referent is guaranteed to live.
/// Ranked `Region < Stack < Heap < Global < Bottom`; `Param` is
/// incomparable to everything but itself (`regions.cpp`'s `ProvRank`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvTag {
    Region(IdKey),
    Stack(u64),
    Heap,
    Global,
    Bottom,
    Param(usize),
}

impl ProvTag {
    fn rank(&self) -> Option<i32> {
        match self {
            ProvTag::Region(_) => Some(0),
            ProvTag::Stack(_) => Some(1),
            ProvTag::Heap => Some(2),
            ProvTag::Global => Some(3),
            ProvTag::Bottom => Some(4),
            ProvTag::Param(_) => None,
        }
    }
}

/// The live `region`/`frame` scope stack: nesting index per named region,
/// and the current stack-frame scope id.
#[derive(Debug, Clone, Default)]
pub struct ProvEnv {
    region_index: HashMap<IdKey, usize>,
    next_region_index: usize,
    scope_id: u64,
}

impl ProvEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_region(&mut self, name: IdKey) -> ProvTag {
        let idx = self.next_region_index;
        self.next_region_index += 1;
        self.region_index.insert(name.clone(), idx);
        ProvTag::Region(name)
    }

    pub fn push_stack_scope(&mut self) -> ProvTag {
        self.scope_id += 1;
        ProvTag::Stack(self.scope_id)
    }

    fn region_nesting(&self, inner: &IdKey, outer: &IdKey) -> bool {
        match (self.region_index.get(inner), self.region_index.get(outer)) {
            (Some(i), Some(o)) => i > o,
            _ => false,
        }
    }

    /// `ProvLeq` (§4.10): `lhs` outlives-or-equals `rhs` is read the other
    /// way in this lattice — `lhs <= rhs` means `lhs` does *not* outlive
    /// `rhs` any more than `rhs` outlives itself; callers compare a value's
    /// tag against a place's tag with `value_outlives_or_equals`.
    pub fn prov_leq(&self, lhs: &ProvTag, rhs: &ProvTag) -> bool {
        if lhs == rhs {
            return true;
        }
        if matches!(lhs, ProvTag::Param(_)) || matches!(rhs, ProvTag::Param(_)) {
            return false;
        }
        if let (ProvTag::Region(a), ProvTag::Region(b)) = (lhs, rhs) {
            return self.region_nesting(a, b);
        }
        match (lhs.rank(), rhs.rank()) {
            (Some(l), Some(r)) => l < r,
            _ => false,
        }
    }

    /// `Join` (§4.10): the lesser (shorter-lived) of two tags; incomparable
    /// tags join to `Bottom`.
    pub fn join(&self, lhs: &ProvTag, rhs: &ProvTag) -> ProvTag {
        if self.prov_leq(lhs, rhs) {
            lhs.clone()
        } else if self.prov_leq(rhs, lhs) {
            rhs.clone()
        } else {
            ProvTag::Bottom
        }
    }

    pub fn join_all(&self, tags: &[ProvTag]) -> ProvTag {
        let mut iter = tags.iter();
        let Some(first) = iter.next() else { return ProvTag::Bottom };
        let mut current = first.clone();
        for t in iter {
            current = self.join(&current, t);
        }
        current
    }

    /// A value `>=` a place's required tag — the assignment-site escape
    /// check (§4.10): `value.tag` must outlive-or-equal `place.tag`.
    pub fn value_outlives_place(&self, value: &ProvTag, place: &ProvTag) -> bool {
        self.prov_leq(place, value)
    }
}

/// `ProvExpr` (§4.10, simplified): infers an expression's provenance tag.
/// Literals and constructors are `Bottom` (no referent to escape);
/// `&`/`move` pass the operand's tag through; `^alloc`/`r.alloc` produce a
/// fresh region tag (or `Heap` with no named region); calls and matches
/// join their sub-expression tags.
pub fn prov_expr(expr: &Expr, env: &ProvEnv, current_frame: &ProvTag) -> ProvTag {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Tuple(_) | ExprKind::Array(_) | ExprKind::RecordLiteral(..) => {
            ProvTag::Bottom
        }
        ExprKind::Unary(UnOp::AddrOf | UnOp::AddrOfMut | UnOp::Move, inner) => {
            prov_expr(inner, env, current_frame)
        }
        ExprKind::Unary(_, inner) => prov_expr(inner, env, current_frame),
        ExprKind::Alloc { value, region } => {
            let _ = prov_expr(value, env, current_frame);
            match region {
                Some(r) => ProvTag::Region(r.id_key()),
                None => ProvTag::Heap,
            }
        }
        ExprKind::Call(_, args) | ExprKind::MethodCall(_, _, args) | ExprKind::Transition(_, _, args) => {
            let tags: Vec<ProvTag> = args.iter().map(|a| prov_expr(&a.expr, env, current_frame)).collect();
            env.join_all(&tags)
        }
        ExprKind::If(_, then_block, else_expr) => {
            let mut tags = Vec::new();
            if let Some(tail) = &then_block.tail {
                tags.push(prov_expr(tail, env, current_frame));
            }
            if let Some(e) = else_expr {
                tags.push(prov_expr(e, env, current_frame));
            }
            env.join_all(&tags)
        }
        ExprKind::Match(_, arms) => {
            let tags: Vec<ProvTag> = arms.iter().map(|a| prov_expr(&a.body, env, current_frame)).collect();
            env.join_all(&tags)
        }
        ExprKind::Block(block) => match &block.tail {
            Some(tail) => prov_expr(tail, env, current_frame),
            None => ProvTag::Bottom,
        },
        ExprKind::Field(base, _) | ExprKind::TupleIndex(base, _) | ExprKind::Index(base, _) => {
            prov_expr(base, env, current_frame)
        }
        _ => current_frame.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeKind {
    Assignment,
    AsyncCapture,
}

/// Checks an assignment or async-capture site (§4.10): errors with
/// `Prov-Escape-Err`/`Prov-Async-Escape-Err` (assignment) or
/// `Async-Capture-Err` (capture) when the value's tag does not outlive the
/// target's.
#[tracing::instrument(skip_all)]
pub fn check_escape(
    env: &ProvEnv,
    value_tag: &ProvTag,
    place_tag: &ProvTag,
    kind: EscapeKind,
    span: cursive0_base::Span,
) -> Option<Diagnostic> {
    if env.value_outlives_place(value_tag, place_tag) {
        return None;
    }
    let code = match kind {
        EscapeKind::Assignment => "Prov-Escape-Err",
        EscapeKind::AsyncCapture => "Async-Capture-Err",
    };
    Some(Diagnostic::error(code, Some(span), "value does not live long enough".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cursive0_base::Span;
    use std::sync::Arc;

    fn span() -> Span {
        Span::new(Arc::from("t.cursive"), 0, 1)
    }

    #[test]
    fn rank_order_holds() {
        let env = ProvEnv::new();
        assert!(env.prov_leq(&ProvTag::Stack(1), &ProvTag::Heap));
        assert!(env.prov_leq(&ProvTag::Heap, &ProvTag::Global));
        assert!(env.prov_leq(&ProvTag::Global, &ProvTag::Bottom));
        assert!(!env.prov_leq(&ProvTag::Bottom, &ProvTag::Heap));
    }

    #[test]
    fn param_is_incomparable_except_to_itself() {
        let env = ProvEnv::new();
        assert!(env.prov_leq(&ProvTag::Param(0), &ProvTag::Param(0)));
        assert!(!env.prov_leq(&ProvTag::Param(0), &ProvTag::Heap));
        assert!(!env.prov_leq(&ProvTag::Heap, &ProvTag::Param(0)));
    }

    #[test]
    fn nested_region_is_lesser_than_outer() {
        let mut env = ProvEnv::new();
        let outer = env.push_region(IdKey::new("outer"));
        let inner = env.push_region(IdKey::new("inner"));
        assert!(env.prov_leq(&inner, &outer));
        assert!(!env.prov_leq(&outer, &inner));
    }

    #[test]
    fn join_picks_lesser_and_falls_back_to_bottom_when_incomparable() {
        let env = ProvEnv::new();
        assert_eq!(env.join(&ProvTag::Stack(1), &ProvTag::Heap), ProvTag::Stack(1));
        assert_eq!(env.join(&ProvTag::Param(0), &ProvTag::Heap), ProvTag::Bottom);
    }

    #[test]
    fn assignment_escape_is_flagged_when_value_is_shorter_lived() {
        let mut env = ProvEnv::new();
        let region = env.push_region(IdKey::new("r"));
        let diag = check_escape(&env, &region, &ProvTag::Global, EscapeKind::Assignment, span());
        assert!(diag.is_some());
        assert_eq!(diag.unwrap().code, "Prov-Escape-Err");
    }

    #[test]
    fn assignment_is_fine_when_value_outlives_place() {
        let env = ProvEnv::new();
        let diag = check_escape(&env, &ProvTag::Global, &ProvTag::Heap, EscapeKind::Assignment, span());
        assert!(diag.is_none());
    }
}
