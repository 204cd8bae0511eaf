//! Type equivalence and subtyping (C6, §4.6).
//!
//! `TypeKind` already derives structural `PartialEq`, which is exactly
//! `TypeEquiv`: every variant compares the outer constructor and then its
//! fields recursively, `Union` members were already canonically sorted at
//! construction time (§4.5), and `Opaque`/`ModalState`/`Refine` carry
//! exactly the fields §4.6 requires to match (origin span; path + state +
//! generic args; base + predicate text). `type_equiv` is kept as a named
//! entry point so call sites read like the spec rather than a bare `==`.

use crate::types::{Permission, PrimName, PtrState, TypeKind, TypeRef};
use cursive0_syntax::ast::expr::{Expr, ExprKind, Literal};
use cursive0_base::PathKey;

pub fn type_equiv(a: &TypeRef, b: &TypeRef) -> bool {
    a == b
}

/// Whether a permission may be stripped at a given call site. Parameters
/// that require an exact permission (§4.6 rule 1) set this to `Forbidden`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermStrip {
    Allowed,
    Forbidden,
}

fn perm_rank(p: Permission) -> u8 {
    match p {
        Permission::Unique => 0,
        Permission::Shared => 1,
        Permission::Const => 2,
    }
}

/// `p <: q` under `Unique <: Shared <: Const`.
fn perm_leq(p: Permission, q: Permission) -> bool {
    perm_rank(p) <= perm_rank(q)
}

/// The reflexive-transitive closure of §4.6's six subtyping rules.
pub fn is_subtype(t: &TypeRef, u: &TypeRef, strip: PermStrip) -> bool {
    if type_equiv(t, u) {
        return true;
    }
    // Rule 6: never is a subtype of everything.
    if matches!(t.as_ref(), TypeKind::Prim(PrimName::Never)) {
        return true;
    }
    // Rule 5: opaque admits no subtyping, only equivalence (already tested).
    if matches!(t.as_ref(), TypeKind::Opaque(..)) || matches!(u.as_ref(), TypeKind::Opaque(..)) {
        return false;
    }
    // Rule 1: permission lattice on the same base.
    match (t.as_ref(), u.as_ref()) {
        (TypeKind::Perm(pt, base_t), TypeKind::Perm(pu, base_u)) if type_equiv(base_t, base_u) => {
            return perm_leq(*pt, *pu);
        }
        (TypeKind::Perm(_, base_t), _) if strip == PermStrip::Allowed && type_equiv(base_t, u) => {
            return true;
        }
        _ => {}
    }
    // Rule 2: union widening — t equivalent to a member of u.
    if let TypeKind::Union(members) = u.as_ref() {
        if members.iter().any(|m| type_equiv(t, m)) {
            return true;
        }
    }
    // Rule 3: refinement forgetting.
    if let TypeKind::Refine(base, _) = t.as_ref() {
        if type_equiv(base, u) {
            return true;
        }
    }
    // Rule 4: pointer state.
    if let (TypeKind::Ptr(et, Some(st)), TypeKind::Ptr(eu, None)) = (t.as_ref(), u.as_ref()) {
        if type_equiv(et, eu) && matches!(st, PtrState::Valid | PtrState::Null) {
            return true;
        }
    }
    false
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstLenError {
    pub reason: String,
}

/// A read-only view onto the declared-static-initializer environment,
/// implemented by `cursive0_sema::scope::Sigma` in the full pipeline.
/// Kept as a trait here so `equiv` does not need to depend on the scope
/// module for this single lookup.
pub trait ConstEnv {
    fn lookup_static_u64(&self, path: &PathKey) -> Option<u64>;
}

/// `ConstLen` (§4.5/§4.6): evaluates an array-length AST expression to a
/// `u64`, accepting only literal integers, identifiers naming a `static let`
/// with a single matching pattern, or qualified value paths resolving to
/// the same. Anything else — or overflow — fails with `ConstLen-Err`.
#[tracing::instrument(skip_all)]
pub fn const_len(expr: &Expr, env: &dyn ConstEnv) -> Result<u64, ConstLenError> {
    match &expr.kind {
        ExprKind::Literal(Literal::Int { text, suffix: _ }) => {
            let value = crate::literals::parse_int_literal(text)
                .map_err(|e| ConstLenError { reason: format!("{e:?}") })?;
            u64::try_from(value).map_err(|_| ConstLenError { reason: "overflow".into() })
        }
        ExprKind::Ident(id) => {
            let path = PathKey::new(vec![id.id_key()]);
            env.lookup_static_u64(&path)
                .ok_or_else(|| ConstLenError { reason: format!("'{}' is not a constant static", id.text) })
        }
        ExprKind::Path(path) => {
            let key = path.to_path_key();
            env.lookup_static_u64(&key)
                .ok_or_else(|| ConstLenError { reason: format!("'{key}' is not a constant static") })
        }
        _ => Err(ConstLenError { reason: "not a constant-length expression".into() }),
    }
}
