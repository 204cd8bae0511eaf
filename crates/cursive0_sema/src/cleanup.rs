//! Cleanup and drop planning (C11, §4.11).
//!
//! Grounded verbatim in `original_source/src/eval/init.cpp`'s
//! `RespOfInit`/`MovOf`/`BindInfoForBinding` helpers for the exact
//! `:=` → `Immov`, place-non-move → `Alias` else `Resp` rules; teacher's
//! `analysis/ownership.rs` contributes the idiom of tracking per-binding
//! move/drop obligations in a struct rather than a bag of booleans.

use crate::class::lookup_method;
use crate::scope::Sigma;
use cursive0_base::PathKey;
use cursive0_syntax::ast::stmt::Binding;
use cursive0_syntax::ast::{BindOp, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movability {
    Mov,
    Immov,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Responsibility {
    Resp,
    Alias,
}

#[derive(Debug, Clone, Copy)]
pub struct BindInfo {
    pub mov: Movability,
    pub resp: Responsibility,
}

/// `MovOf` (§4.11): `:=` binds `Immov`, `=` binds `Mov`.
pub fn mov_of(op: BindOp) -> Movability {
    match op {
        BindOp::Immov => Movability::Immov,
        BindOp::Move => Movability::Mov,
    }
}

/// `RespOfInit` (§4.11): an initializer that is not a place expression, or
/// is a place expression explicitly `move`d, transfers responsibility for
/// cleanup (`Resp`); a plain place-expression initializer only aliases an
/// existing owner (`Alias`).
pub fn resp_of_init(init: &Expr) -> Responsibility {
    if !init.is_place() || init.is_move_expr() {
        Responsibility::Resp
    } else {
        Responsibility::Alias
    }
}

/// `BindInfoForBinding` (§4.11): combines [`mov_of`] and [`resp_of_init`]
/// for a full `let`/`var`/`shadow` binding. A binding with no initializer
/// has no responsibility to discharge.
pub fn bind_info_for_binding(binding: &Binding) -> BindInfo {
    let mov = mov_of(binding.op);
    let resp = binding
        .init
        .as_ref()
        .map(resp_of_init)
        .unwrap_or(Responsibility::Alias);
    BindInfo { mov, resp }
}

/// Whether a binding is dropped at scope exit: only bindings that are both
/// immovable and carry cleanup responsibility (§4.11).
pub fn drops_at_scope_exit(info: &BindInfo) -> bool {
    info.mov == Movability::Immov && info.resp == Responsibility::Resp
}

/// Types with a built-in drop elision (§4.11): owned `string`/`bytes`
/// values are reclaimed by the runtime without a user-visible `Drop` call.
pub fn has_builtin_drop_elision(ty: &crate::types::TypeRef) -> bool {
    matches!(
        ty.as_ref(),
        crate::types::TypeKind::StringTy(Some(crate::types::StrState::Managed))
            | crate::types::TypeKind::BytesTy(Some(crate::types::StrState::Managed))
    )
}

/// `LookupMethodStatic` against the `Drop` class (§4.11): resolves the
/// `drop` method a type must run at scope exit, `None` if the type elides
/// drop entirely or declares none.
pub fn resolve_drop_method<'a>(
    sigma: &'a Sigma,
    ty: &crate::types::TypeRef,
) -> Option<&'a crate::class::MethodSig> {
    if has_builtin_drop_elision(ty) {
        return None;
    }
    let path = match ty.as_ref() {
        crate::types::TypeKind::Path(p, _) | crate::types::TypeKind::ModalState(p, _, _) => p.clone(),
        _ => return None,
    };
    lookup_method(sigma, &path, &cursive0_base::IdKey::new("drop")).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Completed,
    /// A step panicked; cleanup continues with the remaining deferred
    /// steps (`Cleanup-Step-*-Panic`).
    StepPanicked { step: usize },
    /// A second panic occurred while already unwinding from the first —
    /// the process aborts rather than risk running cleanup twice.
    Abort,
}

/// Runs `defer` blocks in reverse-insertion order (§4.11), containing at
/// most one panic per block: `steps[i]` returning `Err` the first time
/// records a `StepPanicked`, a second `Err` afterward aborts, and the
/// stream always finishes in original-call order otherwise.
#[tracing::instrument(skip_all, fields(steps = steps.len()))]
pub fn run_deferred_cleanup<F>(mut steps: Vec<F>) -> CleanupOutcome
where
    F: FnMut() -> Result<(), ()>,
{
    let mut panicked_at = None;
    for (idx, step) in steps.iter_mut().enumerate().rev() {
        if step().is_err() {
            if panicked_at.is_some() {
                return CleanupOutcome::Abort;
            }
            panicked_at = Some(idx);
        }
    }
    match panicked_at {
        Some(step) => CleanupOutcome::StepPanicked { step },
        None => CleanupOutcome::Completed,
    }
}

/// Reverse-of-initialization-order deinit for module-level `Resp` statics
/// (§4.11/§4.12): statics are torn down in the opposite order their
/// initializers ran in, mirroring the stack-like drop order of locals.
pub fn static_deinit_order(init_order: &[PathKey]) -> Vec<PathKey> {
    let mut order = init_order.to_vec();
    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use cursive0_base::Span;
    use cursive0_syntax::ast::expr::{ExprKind, Literal, UnOp};
    use cursive0_syntax::ast::{Ident, Mutability, Pat, PatKind};
    use std::sync::Arc;

    fn span() -> Span {
        Span::new(Arc::from("t.cursive"), 0, 1)
    }

    fn ident_pat(name: &str) -> Pat {
        Pat::new(PatKind::Ident(Ident::new(name, span())), span())
    }

    #[test]
    fn colon_equals_binds_immov() {
        assert_eq!(mov_of(BindOp::Immov), Movability::Immov);
        assert_eq!(mov_of(BindOp::Move), Movability::Mov);
    }

    #[test]
    fn non_place_initializer_is_responsible() {
        let call = Expr::new(
            ExprKind::Call(Box::new(Expr::new(ExprKind::Ident(Ident::new("f", span())), span())), vec![]),
            span(),
        );
        assert_eq!(resp_of_init(&call), Responsibility::Resp);
    }

    #[test]
    fn plain_place_initializer_is_alias() {
        let place = Expr::new(ExprKind::Ident(Ident::new("x", span())), span());
        assert_eq!(resp_of_init(&place), Responsibility::Alias);
    }

    #[test]
    fn explicitly_moved_place_initializer_is_responsible() {
        let place = Expr::new(ExprKind::Ident(Ident::new("x", span())), span());
        let moved = Expr::new(ExprKind::Unary(UnOp::Move, Box::new(place)), span());
        assert_eq!(resp_of_init(&moved), Responsibility::Resp);
    }

    #[test]
    fn drops_at_scope_exit_requires_both_immov_and_resp() {
        assert!(drops_at_scope_exit(&BindInfo { mov: Movability::Immov, resp: Responsibility::Resp }));
        assert!(!drops_at_scope_exit(&BindInfo { mov: Movability::Mov, resp: Responsibility::Resp }));
        assert!(!drops_at_scope_exit(&BindInfo { mov: Movability::Immov, resp: Responsibility::Alias }));
    }

    #[test]
    fn bind_info_combines_op_and_initializer() {
        let binding = Binding {
            mutability: Mutability::Let,
            op: BindOp::Immov,
            pat: ident_pat("x"),
            ty: None,
            init: Some(Expr::new(
                ExprKind::Literal(Literal::Int { text: "1".into(), suffix: None }),
                span(),
            )),
        };
        let info = bind_info_for_binding(&binding);
        assert_eq!(info.mov, Movability::Immov);
        assert_eq!(info.resp, Responsibility::Resp);
    }

    #[test]
    fn deferred_cleanup_runs_in_reverse_order_and_completes() {
        use std::cell::RefCell;
        let order = RefCell::new(Vec::new());
        let steps: Vec<Box<dyn FnMut() -> Result<(), ()>>> = vec![
            Box::new(|| { order.borrow_mut().push(1); Ok(()) }),
            Box::new(|| { order.borrow_mut().push(2); Ok(()) }),
        ];
        let outcome = run_deferred_cleanup(steps);
        assert_eq!(outcome, CleanupOutcome::Completed);
        assert_eq!(*order.borrow(), vec![2, 1]);
    }

    #[test]
    fn second_panic_during_unwind_aborts() {
        let steps: Vec<Box<dyn FnMut() -> Result<(), ()>>> =
            vec![Box::new(|| Err(())), Box::new(|| Err(()))];
        assert_eq!(run_deferred_cleanup(steps), CleanupOutcome::Abort);
    }

    #[test]
    fn static_deinit_is_reverse_of_init_order() {
        let order = vec![PathKey::from_strs(&["a"]), PathKey::from_strs(&["b"])];
        assert_eq!(static_deinit_order(&order), vec![PathKey::from_strs(&["b"]), PathKey::from_strs(&["a"])]);
    }
}
