//! Lowers surface [`TypeExpr`] syntax into the [`TypeRef`] model (C5, §4.5).
//!
//! Surface syntax still carries spans and unresolved paths; lowering
//! resolves array lengths via `ConstLen` and folds everything else down to
//! the canonical, `Arc`-shared representation the rest of C5-C12 work with.

use crate::equiv::{const_len, ConstEnv};
use crate::types::{
    mk_array, mk_bytes, mk_dynamic, mk_func, mk_modal_state, mk_path, mk_perm, mk_ptr, mk_range,
    mk_raw_ptr, mk_refine, mk_string, mk_tuple, FuncParam, ParamMode, Permission, PrimName,
    PtrState, RawPtrQual, StrState, TypeRef,
};
use cursive0_base::Diagnostic;
use cursive0_syntax::ast::ty::{
    Perm, PtrStateTag, RawPtrQual as SynRawPtrQual, StringBytesState, TypeExpr, TypeExprKind,
};

fn prim_name(name: &str) -> Option<PrimName> {
    Some(match name {
        "i8" => PrimName::I8,
        "i16" => PrimName::I16,
        "i32" => PrimName::I32,
        "i64" => PrimName::I64,
        "i128" => PrimName::I128,
        "u8" => PrimName::U8,
        "u16" => PrimName::U16,
        "u32" => PrimName::U32,
        "u64" => PrimName::U64,
        "u128" => PrimName::U128,
        "isize" => PrimName::Isize,
        "usize" => PrimName::Usize,
        "f16" => PrimName::F16,
        "f32" => PrimName::F32,
        "f64" => PrimName::F64,
        "bool" => PrimName::Bool,
        "char" => PrimName::Char,
        _ => return None,
    })
}

fn perm_of(p: Perm) -> Permission {
    match p {
        Perm::Const => Permission::Const,
        Perm::Unique => Permission::Unique,
        Perm::Shared => Permission::Shared,
    }
}

fn ptr_state_of(p: PtrStateTag) -> PtrState {
    match p {
        PtrStateTag::Valid => PtrState::Valid,
        PtrStateTag::Null => PtrState::Null,
        PtrStateTag::Expired => PtrState::Expired,
    }
}

fn raw_ptr_qual_of(q: SynRawPtrQual) -> RawPtrQual {
    match q {
        SynRawPtrQual::Imm => RawPtrQual::Imm,
        SynRawPtrQual::Mut => RawPtrQual::Mut,
    }
}

fn str_state_of(s: StringBytesState) -> StrState {
    match s {
        StringBytesState::Managed => StrState::Managed,
        StringBytesState::View => StrState::View,
    }
}

/// A minimal canonical rendering of a refinement predicate expression,
/// used only for structural-equality comparison (§4.6's documented
/// simplification: predicates never need semantic evaluation here).
fn render_predicate(expr: &cursive0_syntax::ast::Expr) -> String {
    format!("{:?}", expr.kind)
}

pub fn lower_type_expr(te: &TypeExpr, env: &dyn ConstEnv) -> Result<TypeRef, Diagnostic> {
    match &te.kind {
        TypeExprKind::Prim(name) => prim_name(name)
            .map(crate::types::mk_prim)
            .ok_or_else(|| Diagnostic::error("E-UNS-0101", Some(te.span.clone()), format!("'{name}' is not a supported primitive type"))),
        TypeExprKind::Perm(perm, inner) => {
            Ok(mk_perm(perm_of(*perm), lower_type_expr(inner, env)?))
        }
        TypeExprKind::Tuple(elems) => {
            let lowered: Result<Vec<_>, _> = elems.iter().map(|e| lower_type_expr(e, env)).collect();
            Ok(mk_tuple(lowered?))
        }
        TypeExprKind::Array(elem, len_expr) => {
            let elem_ty = lower_type_expr(elem, env)?;
            let len = const_len(len_expr, env).map_err(|e| {
                Diagnostic::error("ConstLen-Err", Some(len_expr.span.clone()), e.reason)
            })?;
            Ok(mk_array(elem_ty, len))
        }
        TypeExprKind::Slice(elem) => Ok(crate::types::mk_slice(lower_type_expr(elem, env)?)),
        TypeExprKind::Func(params, ret) => {
            let mut lowered_params = Vec::with_capacity(params.len());
            for p in params {
                let mode = p.mode.map(|_| ParamMode::Move);
                lowered_params.push(FuncParam { mode, ty: lower_type_expr(&p.ty, env)? });
            }
            Ok(mk_func(lowered_params, lower_type_expr(ret, env)?))
        }
        TypeExprKind::Path(path, args) => {
            let lowered_args: Result<Vec<_>, _> = args.iter().map(|a| lower_type_expr(a, env)).collect();
            Ok(mk_path(path.to_path_key(), lowered_args?))
        }
        TypeExprKind::ModalState(path, state, args) => {
            let lowered_args: Result<Vec<_>, _> = args.iter().map(|a| lower_type_expr(a, env)).collect();
            Ok(mk_modal_state(path.to_path_key(), state.id_key(), lowered_args?))
        }
        TypeExprKind::Ptr(elem, state) => {
            Ok(mk_ptr(lower_type_expr(elem, env)?, state.map(ptr_state_of)))
        }
        TypeExprKind::RawPtr(qual, elem) => {
            Ok(mk_raw_ptr(raw_ptr_qual_of(*qual), lower_type_expr(elem, env)?))
        }
        TypeExprKind::StringTy(state) => Ok(mk_string(state.map(str_state_of))),
        TypeExprKind::BytesTy(state) => Ok(mk_bytes(state.map(str_state_of))),
        TypeExprKind::Dynamic(path) => Ok(mk_dynamic(path.to_path_key())),
        TypeExprKind::Refine(base, predicate) => {
            Ok(mk_refine(lower_type_expr(base, env)?, render_predicate(predicate)))
        }
        TypeExprKind::Range => Ok(mk_range()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cursive0_base::{PathKey, Span};
    use std::sync::Arc;

    struct EmptyEnv;
    impl ConstEnv for EmptyEnv {
        fn lookup_static_u64(&self, _path: &PathKey) -> Option<u64> {
            None
        }
    }

    fn span() -> Span {
        Span::new(Arc::from("t.cursive"), 0, 1)
    }

    #[test]
    fn lowers_primitive() {
        let te = TypeExpr::new(TypeExprKind::Prim("i32".into()), span());
        let ty = lower_type_expr(&te, &EmptyEnv).unwrap();
        assert!(matches!(ty.as_ref(), crate::types::TypeKind::Prim(PrimName::I32)));
    }

    #[test]
    fn rejects_unknown_primitive() {
        let te = TypeExpr::new(TypeExprKind::Prim("nope".into()), span());
        assert!(lower_type_expr(&te, &EmptyEnv).is_err());
    }

    #[test]
    fn lowers_tuple_and_perm() {
        let inner = TypeExpr::new(TypeExprKind::Prim("bool".into()), span());
        let perm = TypeExpr::new(TypeExprKind::Perm(Perm::Shared, Box::new(inner)), span());
        let tup = TypeExpr::new(TypeExprKind::Tuple(vec![perm]), span());
        let ty = lower_type_expr(&tup, &EmptyEnv).unwrap();
        assert!(matches!(ty.as_ref(), crate::types::TypeKind::Tuple(elems) if elems.len() == 1));
    }

    #[test]
    fn array_length_resolves_via_const_env() {
        struct FakeEnv;
        impl ConstEnv for FakeEnv {
            fn lookup_static_u64(&self, path: &PathKey) -> Option<u64> {
                if path.to_string() == "N" { Some(4) } else { None }
            }
        }
        let elem = TypeExpr::new(TypeExprKind::Prim("u8".into()), span());
        let len_ident = cursive0_syntax::ast::Ident::new("N", span());
        let len_expr = cursive0_syntax::ast::Expr::new(cursive0_syntax::ast::ExprKind::Ident(len_ident), span());
        let arr = TypeExpr::new(TypeExprKind::Array(Box::new(elem), Box::new(len_expr)), span());
        let ty = lower_type_expr(&arr, &FakeEnv).unwrap();
        assert!(matches!(ty.as_ref(), crate::types::TypeKind::Array(_, 4)));
    }
}
