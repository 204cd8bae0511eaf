//! Pattern typing (C7, §4.7).
//!
//! Typing a pattern against an expected type produces the bindings it
//! introduces (`PatNames`, in left-to-right order) plus an exhaustiveness
//! obligation the caller (match-arm typing, C8) is responsible for
//! discharging across all of a match's arms. Grounded in teacher's
//! `analysis/check.rs` pattern-arm handling and in `original_source`'s
//! `type_pattern.h`/`type_infer.h`.

use crate::equiv::type_equiv;
use crate::literals::{check_int_range, parse_int_literal};
use crate::scope::Sigma;
use crate::types::{is_numeric, mk_bool, mk_unit, PrimName, TypeKind, TypeRef};
use cursive0_base::{Diagnostic, IdKey};
use cursive0_syntax::ast::expr::Literal;
use cursive0_syntax::ast::pat::{Pat, PatKind};

/// Whether a pattern's match arm, taken on its own, covers every value of
/// `expected` (`_` and a bare identifier always do; everything else is
/// left to the caller's arm-set exhaustiveness check).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Total,
    Partial,
}

pub struct PatternResult {
    pub bindings: Vec<(IdKey, TypeRef)>,
    pub coverage: Coverage,
    pub diagnostics: Vec<Diagnostic>,
}

impl PatternResult {
    fn leaf(coverage: Coverage) -> Self {
        PatternResult { bindings: Vec::new(), coverage, diagnostics: Vec::new() }
    }

    fn err(diag: Diagnostic) -> Self {
        PatternResult { bindings: Vec::new(), coverage: Coverage::Partial, diagnostics: vec![diag] }
    }
}

fn mismatch(pat: &Pat, expected: &TypeRef) -> Diagnostic {
    Diagnostic::error(
        "E-SEM-0302",
        Some(pat.span.clone()),
        format!("pattern does not match expected type {expected:?}"),
    )
}

/// Types one pattern against `expected`, returning the bindings it
/// introduces and whether it alone is exhaustive for `expected`.
#[tracing::instrument(skip_all)]
pub fn type_pattern(pat: &Pat, expected: &TypeRef, sigma: &Sigma) -> PatternResult {
    match &pat.kind {
        PatKind::Wildcard => PatternResult::leaf(Coverage::Total),
        PatKind::Ident(id) => {
            let mut r = PatternResult::leaf(Coverage::Total);
            r.bindings.push((id.id_key(), expected.clone()));
            r
        }
        PatKind::Typed(id, _ty_expr) => {
            // The annotated type is resolved by the caller (it needs the
            // same type-expression lowering expression typing uses); here
            // we simply bind the name at the already-expected type.
            let mut r = PatternResult::leaf(Coverage::Total);
            r.bindings.push((id.id_key(), expected.clone()));
            r
        }
        PatKind::Literal(lit) => type_literal_pattern(pat, lit, expected),
        PatKind::Tuple(elems) => type_tuple_pattern(pat, elems, expected, sigma),
        PatKind::Record { path, fields, has_rest } => {
            type_record_pattern(pat, path, fields, *has_rest, expected, sigma)
        }
        PatKind::Variant { path, variant, payload } => {
            type_variant_pattern(pat, path, variant, payload, expected, sigma)
        }
        PatKind::Range { .. } => {
            if is_numeric(expected) || matches!(expected.as_ref(), TypeKind::Prim(PrimName::Char)) {
                PatternResult::leaf(Coverage::Partial)
            } else {
                PatternResult::err(mismatch(pat, expected))
            }
        }
    }
}

fn type_literal_pattern(pat: &Pat, lit: &Literal, expected: &TypeRef) -> PatternResult {
    let ok = match lit {
        Literal::Int { text, .. } => match expected.as_ref() {
            TypeKind::Prim(prim) if is_numeric(expected) => parse_int_literal(text)
                .and_then(|v| check_int_range(v, *prim))
                .is_ok(),
            _ => false,
        },
        Literal::Float(_) => {
            matches!(expected.as_ref(), TypeKind::Prim(PrimName::F16 | PrimName::F32 | PrimName::F64))
        }
        Literal::Bool(_) => type_equiv(expected, &mk_bool()),
        Literal::Char(_) => matches!(expected.as_ref(), TypeKind::Prim(PrimName::Char)),
        Literal::Str(_) => matches!(expected.as_ref(), TypeKind::StringTy(_)),
        Literal::Bytes(_) => matches!(expected.as_ref(), TypeKind::BytesTy(_)),
        Literal::Null => matches!(expected.as_ref(), TypeKind::Ptr(_, _)),
        Literal::Unit => type_equiv(expected, &mk_unit()),
    };
    if ok {
        PatternResult::leaf(Coverage::Partial)
    } else {
        PatternResult::err(mismatch(pat, expected))
    }
}

fn type_tuple_pattern(pat: &Pat, elems: &[Pat], expected: &TypeRef, sigma: &Sigma) -> PatternResult {
    let member_types = match expected.as_ref() {
        TypeKind::Tuple(members) if members.len() == elems.len() => members,
        _ => return PatternResult::err(mismatch(pat, expected)),
    };
    let mut bindings = Vec::new();
    let mut diagnostics = Vec::new();
    let mut coverage = Coverage::Total;
    for (sub, ty) in elems.iter().zip(member_types) {
        let r = type_pattern(sub, ty, sigma);
        bindings.extend(r.bindings);
        diagnostics.extend(r.diagnostics);
        if r.coverage == Coverage::Partial {
            coverage = Coverage::Partial;
        }
    }
    PatternResult { bindings, coverage, diagnostics }
}

fn type_record_pattern(
    pat: &Pat,
    path: &cursive0_syntax::ast::Path,
    fields: &[cursive0_syntax::ast::pat::FieldPat],
    has_rest: bool,
    expected: &TypeRef,
    sigma: &Sigma,
) -> PatternResult {
    let record_path = match expected.as_ref() {
        TypeKind::Path(p, _) => p.clone(),
        _ => path.to_path_key(),
    };
    let declared = match sigma.record_fields.get(&record_path) {
        Some(f) => f,
        None => return PatternResult::err(mismatch(pat, expected)),
    };
    if !has_rest && declared.len() != fields.len() {
        return PatternResult::err(Diagnostic::error(
            "E-SEM-0303",
            Some(pat.span.clone()),
            format!("record pattern for '{record_path}' does not mention every field"),
        ));
    }
    let field_types: std::collections::HashMap<&IdKey, &TypeRef> =
        declared.iter().map(|(n, t)| (n, t)).collect();
    let mut bindings = Vec::new();
    let mut diagnostics = Vec::new();
    for f in fields {
        let key = f.name.id_key();
        let Some(field_ty) = field_types.get(&key) else {
            diagnostics.push(Diagnostic::error(
                "E-SEM-0304",
                Some(f.name.span.clone()),
                format!("'{record_path}' has no field '{key}'"),
            ));
            continue;
        };
        match &f.pat {
            Some(sub) => {
                let r = type_pattern(sub, field_ty, sigma);
                bindings.extend(r.bindings);
                diagnostics.extend(r.diagnostics);
            }
            None => bindings.push((key, (*field_ty).clone())),
        }
    }
    PatternResult { bindings, coverage: Coverage::Total, diagnostics }
}

fn type_variant_pattern(
    pat: &Pat,
    path: &cursive0_syntax::ast::Path,
    variant: &cursive0_syntax::ast::Ident,
    payload: &[Pat],
    expected: &TypeRef,
    sigma: &Sigma,
) -> PatternResult {
    let enum_path = path.to_path_key();
    let expected_path_matches = match expected.as_ref() {
        TypeKind::Path(p, _) | TypeKind::ModalState(p, _, _) | TypeKind::Dynamic(p) => p == &enum_path,
        _ => false,
    };
    if !expected_path_matches {
        return PatternResult::err(mismatch(pat, expected));
    }
    let variant_key = variant.id_key();
    let payload_types = sigma
        .variant_payloads
        .get(&enum_path)
        .and_then(|m| m.get(&variant_key));
    let Some(payload_types) = payload_types else {
        return PatternResult::err(Diagnostic::error(
            "E-SEM-0305",
            Some(variant.span.clone()),
            format!("'{enum_path}' has no variant '{variant_key}'"),
        ));
    };
    if payload_types.len() != payload.len() {
        return PatternResult::err(Diagnostic::error(
            "E-SEM-0306",
            Some(pat.span.clone()),
            format!("variant '{variant_key}' expects {} payload fields", payload_types.len()),
        ));
    }
    let mut bindings = Vec::new();
    let mut diagnostics = Vec::new();
    for (sub, ty) in payload.iter().zip(payload_types) {
        let r = type_pattern(sub, ty, sigma);
        bindings.extend(r.bindings);
        diagnostics.extend(r.diagnostics);
    }
    PatternResult { bindings, coverage: Coverage::Partial, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use cursive0_base::{PathKey, Span};
    use std::sync::Arc;

    fn span() -> Span {
        Span::new(Arc::from("t.cursive"), 0, 1)
    }

    #[test]
    fn wildcard_is_total_with_no_bindings() {
        let sigma = Sigma::new();
        let r = type_pattern(&Pat::new(PatKind::Wildcard, span()), &mk_prim(PrimName::I32), &sigma);
        assert_eq!(r.coverage, Coverage::Total);
        assert!(r.bindings.is_empty());
    }

    #[test]
    fn ident_binds_expected_type() {
        let sigma = Sigma::new();
        let id = cursive0_syntax::ast::Ident::new("x", span());
        let r = type_pattern(&Pat::new(PatKind::Ident(id), span()), &mk_prim(PrimName::I32), &sigma);
        assert_eq!(r.bindings.len(), 1);
        assert_eq!(r.bindings[0].0, IdKey::new("x"));
    }

    #[test]
    fn literal_int_matches_numeric_range() {
        let sigma = Sigma::new();
        let lit = Literal::Int { text: "5".into(), suffix: None };
        let r = type_pattern(&Pat::new(PatKind::Literal(lit), span()), &mk_prim(PrimName::I8), &sigma);
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn literal_int_out_of_range_is_diagnosed() {
        let sigma = Sigma::new();
        let lit = Literal::Int { text: "500".into(), suffix: None };
        let r = type_pattern(&Pat::new(PatKind::Literal(lit), span()), &mk_prim(PrimName::I8), &sigma);
        assert!(!r.diagnostics.is_empty());
    }

    #[test]
    fn tuple_pattern_binds_each_member() {
        let sigma = Sigma::new();
        let a = cursive0_syntax::ast::Ident::new("a", span());
        let b = cursive0_syntax::ast::Ident::new("b", span());
        let tup = PatKind::Tuple(vec![
            Pat::new(PatKind::Ident(a), span()),
            Pat::new(PatKind::Ident(b), span()),
        ]);
        let expected = mk_tuple(vec![mk_prim(PrimName::I32), mk_bool()]);
        let r = type_pattern(&Pat::new(tup, span()), &expected, &sigma);
        assert_eq!(r.bindings.len(), 2);
        assert_eq!(r.coverage, Coverage::Total);
    }

    #[test]
    fn record_pattern_requires_full_field_coverage_without_rest() {
        let mut sigma = Sigma::new();
        let path = PathKey::from_strs(&["m", "Point"]);
        sigma.record_fields.insert(
            path.clone(),
            vec![(IdKey::new("x"), mk_prim(PrimName::I32)), (IdKey::new("y"), mk_prim(PrimName::I32))],
        );
        let field_pat = cursive0_syntax::ast::pat::FieldPat {
            name: cursive0_syntax::ast::Ident::new("x", span()),
            pat: None,
        };
        let rec = PatKind::Record {
            path: cursive0_syntax::ast::Path::single(cursive0_syntax::ast::Ident::new("Point", span())),
            fields: vec![field_pat],
            has_rest: false,
        };
        let expected = mk_path(path, vec![]);
        let r = type_pattern(&Pat::new(rec, span()), &expected, &sigma);
        assert!(!r.diagnostics.is_empty());
    }
}
