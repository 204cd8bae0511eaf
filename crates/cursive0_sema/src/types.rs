//! The type model (C5, §3/§4.5): a shared, immutable type tree built only
//! through smart constructors that preserve the invariants of §3.
//!
//! `TypeRef` is `Arc<TypeKind>` rather than an inline enum so that sharing a
//! type between many call sites (every occurrence of `i32`, say) is a
//! pointer clone, and so `TypeKind`'s derived `Ord` gives the canonical
//! `TypeKey` ordering §3/§8 require for union member sorting — comparing
//! two `Arc<TypeKind>`s compares their pointees structurally.

use cursive0_base::{IdKey, PathKey, Span};
use std::sync::Arc;

pub type TypeRef = Arc<TypeKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimName {
    I8, I16, I32, I64, I128,
    U8, U16, U32, U64, U128,
    Isize, Usize,
    F16, F32, F64,
    Bool, Char, Unit, Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    Unique,
    Shared,
    Const,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamMode {
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PtrState {
    Valid,
    Null,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RawPtrQual {
    Imm,
    Mut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrState {
    Managed,
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncParam {
    pub mode: Option<ParamMode>,
    pub ty: TypeRef,
}

/// `TypeKind` is the sole payload of [`TypeRef`]. Its derived `Ord` is the
/// canonical `TypeKey` used to sort `Union` members (§3 invariant i).
///
/// Refinement predicates are stored as their canonical textual form rather
/// than as AST nodes: §4.6 only ever needs "syntactic-structural equality",
/// and comparing pretty-printed, whitespace-normalized text gives exactly
/// that without requiring the AST itself to implement `Ord`/`Hash`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    Prim(PrimName),
    Perm(Permission, TypeRef),
    Tuple(Vec<TypeRef>),
    Array(TypeRef, u64),
    Slice(TypeRef),
    Func(Vec<FuncParam>, TypeRef),
    Union(Vec<TypeRef>),
    Path(PathKey, Vec<TypeRef>),
    ModalState(PathKey, IdKey, Vec<TypeRef>),
    Ptr(TypeRef, Option<PtrState>),
    RawPtr(RawPtrQual, TypeRef),
    StringTy(Option<StrState>),
    BytesTy(Option<StrState>),
    Dynamic(PathKey),
    Opaque(PathKey, Span),
    Refine(TypeRef, String),
    Range,
}

pub fn mk_prim(name: PrimName) -> TypeRef {
    Arc::new(TypeKind::Prim(name))
}

/// §3 invariant (ii): `Perm` never nests. Wrapping an already-permissioned
/// type replaces its permission rather than nesting a second layer.
pub fn mk_perm(perm: Permission, base: TypeRef) -> TypeRef {
    match base.as_ref() {
        TypeKind::Perm(_, inner) => Arc::new(TypeKind::Perm(perm, inner.clone())),
        _ => Arc::new(TypeKind::Perm(perm, base)),
    }
}

/// Strips at most one outer `Perm` layer, as §4.8 method-call receiver
/// resolution does ("stripping one outer permission").
pub fn strip_perm(ty: &TypeRef) -> TypeRef {
    match ty.as_ref() {
        TypeKind::Perm(_, inner) => inner.clone(),
        _ => ty.clone(),
    }
}

pub fn mk_tuple(elems: Vec<TypeRef>) -> TypeRef {
    Arc::new(TypeKind::Tuple(elems))
}

pub fn mk_array(elem: TypeRef, length: u64) -> TypeRef {
    Arc::new(TypeKind::Array(elem, length))
}

pub fn mk_slice(elem: TypeRef) -> TypeRef {
    Arc::new(TypeKind::Slice(elem))
}

pub fn mk_func(params: Vec<FuncParam>, ret: TypeRef) -> TypeRef {
    Arc::new(TypeKind::Func(params, ret))
}

/// §3 invariant (i): sorted, deduplicated, no nested unions. A union that
/// collapses to a single member after flattening is that member directly —
/// a one-alternative union is not a distinct type.
pub fn mk_union(members: Vec<TypeRef>) -> TypeRef {
    let mut flat: Vec<TypeRef> = Vec::new();
    for m in members {
        match m.as_ref() {
            TypeKind::Union(inner) => flat.extend(inner.iter().cloned()),
            _ => flat.push(m),
        }
    }
    flat.sort();
    flat.dedup();
    if flat.len() == 1 {
        flat.into_iter().next().unwrap()
    } else {
        Arc::new(TypeKind::Union(flat))
    }
}

pub fn mk_path(path: PathKey, args: Vec<TypeRef>) -> TypeRef {
    Arc::new(TypeKind::Path(path, args))
}

pub fn mk_modal_state(path: PathKey, state: IdKey, args: Vec<TypeRef>) -> TypeRef {
    Arc::new(TypeKind::ModalState(path, state, args))
}

pub fn mk_ptr(elem: TypeRef, state: Option<PtrState>) -> TypeRef {
    Arc::new(TypeKind::Ptr(elem, state))
}

pub fn mk_raw_ptr(qual: RawPtrQual, elem: TypeRef) -> TypeRef {
    Arc::new(TypeKind::RawPtr(qual, elem))
}

pub fn mk_string(state: Option<StrState>) -> TypeRef {
    Arc::new(TypeKind::StringTy(state))
}

pub fn mk_bytes(state: Option<StrState>) -> TypeRef {
    Arc::new(TypeKind::BytesTy(state))
}

pub fn mk_dynamic(path: PathKey) -> TypeRef {
    Arc::new(TypeKind::Dynamic(path))
}

/// §3 invariant (iii): identity is the pair `(class_path, origin_span)`;
/// two `Opaque` types lowered at different call sites are never equal even
/// if the class path matches.
pub fn mk_opaque(class_path: PathKey, origin: Span) -> TypeRef {
    Arc::new(TypeKind::Opaque(class_path, origin))
}

pub fn mk_refine(base: TypeRef, predicate_text: String) -> TypeRef {
    Arc::new(TypeKind::Refine(base, predicate_text))
}

pub fn mk_range() -> TypeRef {
    Arc::new(TypeKind::Range)
}

pub fn mk_never() -> TypeRef {
    mk_prim(PrimName::Never)
}

pub fn mk_unit() -> TypeRef {
    mk_prim(PrimName::Unit)
}

pub fn mk_bool() -> TypeRef {
    mk_prim(PrimName::Bool)
}

pub fn mk_usize() -> TypeRef {
    mk_prim(PrimName::Usize)
}

pub fn is_never(ty: &TypeRef) -> bool {
    matches!(ty.as_ref(), TypeKind::Prim(PrimName::Never))
}

pub fn is_numeric(ty: &TypeRef) -> bool {
    matches!(
        ty.as_ref(),
        TypeKind::Prim(
            PrimName::I8 | PrimName::I16 | PrimName::I32 | PrimName::I64 | PrimName::I128
                | PrimName::U8 | PrimName::U16 | PrimName::U32 | PrimName::U64 | PrimName::U128
                | PrimName::Isize | PrimName::Usize
                | PrimName::F16 | PrimName::F32 | PrimName::F64
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perm_never_nests() {
        let inner = mk_perm(Permission::Unique, mk_prim(PrimName::I32));
        let doubled = mk_perm(Permission::Shared, inner);
        match doubled.as_ref() {
            TypeKind::Perm(Permission::Shared, base) => {
                assert!(matches!(base.as_ref(), TypeKind::Prim(PrimName::I32)));
            }
            other => panic!("expected non-nested Perm, got {other:?}"),
        }
    }

    #[test]
    fn union_sorts_and_dedups() {
        let a = mk_prim(PrimName::I32);
        let b = mk_prim(PrimName::Bool);
        let u1 = mk_union(vec![a.clone(), b.clone(), a.clone()]);
        let u2 = mk_union(vec![b, a]);
        assert_eq!(u1, u2, "member order must not affect the canonical union");
    }

    #[test]
    fn union_flattens_nested_unions() {
        let a = mk_prim(PrimName::I32);
        let b = mk_prim(PrimName::Bool);
        let c = mk_prim(PrimName::Char);
        let nested = mk_union(vec![a.clone(), b.clone()]);
        let flat = mk_union(vec![nested, c.clone()]);
        match flat.as_ref() {
            TypeKind::Union(members) => assert_eq!(members.len(), 3),
            other => panic!("expected a flat union, got {other:?}"),
        }
    }

    #[test]
    fn union_of_one_collapses_to_the_member() {
        let a = mk_prim(PrimName::I32);
        let u = mk_union(vec![a.clone(), a.clone()]);
        assert_eq!(u, a);
    }

    #[test]
    fn opaque_identity_requires_matching_origin() {
        let path = PathKey::from_strs(&["m", "Handle"]);
        let file: std::sync::Arc<str> = std::sync::Arc::from("a.cursive");
        let span1 = Span::new(file.clone(), 0, 1);
        let span2 = Span::new(file, 10, 11);
        let o1 = mk_opaque(path.clone(), span1.clone());
        let o2 = mk_opaque(path.clone(), span1);
        let o3 = mk_opaque(path, span2);
        assert_eq!(o1, o2);
        assert_ne!(o1, o3);
    }

    #[test]
    fn strip_perm_removes_one_layer_only() {
        let base = mk_prim(PrimName::I32);
        let wrapped = mk_perm(Permission::Const, base.clone());
        assert_eq!(strip_perm(&wrapped), base.clone());
        assert_eq!(strip_perm(&base), base);
    }
}
