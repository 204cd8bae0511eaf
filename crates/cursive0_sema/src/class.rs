//! Class (interface) tables and method resolution (C9, §4.8/§4.9).
//!
//! A class declares required method signatures, some with a default
//! (provided) body. A type *implements* a class iff every required method
//! is defined by the type itself or inherited from a class-level default.
//! Per §9's design note, this is computed set-theoretically over the
//! type's explicit `implements` list — there is no class-to-class
//! inheritance linearization to resolve.

use crate::scope::Sigma;
use crate::types::TypeRef;
use cursive0_base::{IdKey, PathKey};
use cursive0_syntax::ast::item::ReceiverPerm;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct MethodSig {
    pub receiver: ReceiverPerm,
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
}

#[derive(Debug, Clone)]
pub struct ClassMethodSig {
    pub sig: MethodSig,
    /// Whether this class provides a default implementation.
    pub has_default: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    pub name: PathKey,
    pub methods: HashMap<IdKey, ClassMethodSig>,
}

/// `ClassMethodTable` (§4.9): the flat table of methods for a class,
/// including its own defaults (there is no further inheritance to flatten
/// in this subset — see the design note above).
pub fn class_method_table<'a>(sigma: &'a Sigma, class: &PathKey) -> Option<&'a ClassTable> {
    sigma.classes.get(class)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodLookupError {
    Ambiguous,
    NotFound,
}

/// Static method resolution (§4.8): own methods first, then a default
/// drawn from one of the type's implemented classes. More than one
/// implemented class providing a default for the same name is ambiguous.
pub fn lookup_method<'a>(
    sigma: &'a Sigma,
    base_type: &PathKey,
    method: &IdKey,
) -> Result<&'a MethodSig, MethodLookupError> {
    if let Some(own) = sigma.own_methods.get(base_type).and_then(|m| m.get(method)) {
        return Ok(own);
    }
    let implements = sigma.implements.get(base_type).map(Vec::as_slice).unwrap_or(&[]);
    let mut providers = Vec::new();
    for class_path in implements {
        if let Some(table) = class_method_table(sigma, class_path) {
            if let Some(class_method) = table.methods.get(method) {
                if class_method.has_default {
                    providers.push(&class_method.sig);
                }
            }
        }
    }
    match providers.len() {
        0 => Err(MethodLookupError::NotFound),
        1 => Ok(providers[0]),
        _ => Err(MethodLookupError::Ambiguous),
    }
}

/// Whether `base_type` implements `class` per its recorded `implements`
/// list (used to gate default-method visibility, §4.9).
pub fn type_implements(sigma: &Sigma, base_type: &PathKey, class: &PathKey) -> bool {
    sigma
        .implements
        .get(base_type)
        .map(|list| list.contains(class))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{mk_prim, PrimName};

    fn sig() -> MethodSig {
        MethodSig { receiver: ReceiverPerm::Const, params: vec![], ret: mk_prim(PrimName::Unit) }
    }

    #[test]
    fn own_method_wins_over_class_default() {
        let mut sigma = Sigma::new();
        let ty = PathKey::from_strs(&["m", "T"]);
        let name = IdKey::new("go");
        sigma.own_methods.entry(ty.clone()).or_default().insert(name.clone(), sig());
        assert!(lookup_method(&sigma, &ty, &name).is_ok());
    }

    #[test]
    fn single_default_provider_resolves() {
        let mut sigma = Sigma::new();
        let ty = PathKey::from_strs(&["m", "T"]);
        let class = PathKey::from_strs(&["m", "C"]);
        let name = IdKey::new("go");
        let mut table = ClassTable { name: class.clone(), methods: HashMap::new() };
        table.methods.insert(name.clone(), ClassMethodSig { sig: sig(), has_default: true });
        sigma.classes.insert(class.clone(), table);
        sigma.implements.insert(ty.clone(), vec![class]);
        assert!(lookup_method(&sigma, &ty, &name).is_ok());
    }

    #[test]
    fn ambiguous_across_two_classes_with_defaults() {
        let mut sigma = Sigma::new();
        let ty = PathKey::from_strs(&["m", "T"]);
        let c1 = PathKey::from_strs(&["m", "C1"]);
        let c2 = PathKey::from_strs(&["m", "C2"]);
        let name = IdKey::new("go");
        for c in [&c1, &c2] {
            let mut table = ClassTable { name: c.clone(), methods: HashMap::new() };
            table.methods.insert(name.clone(), ClassMethodSig { sig: sig(), has_default: true });
            sigma.classes.insert(c.clone(), table);
        }
        sigma.implements.insert(ty.clone(), vec![c1, c2]);
        assert_eq!(lookup_method(&sigma, &ty, &name), Err(MethodLookupError::Ambiguous));
    }

    #[test]
    fn not_found_when_absent_everywhere() {
        let sigma = Sigma::new();
        let ty = PathKey::from_strs(&["m", "T"]);
        assert_eq!(lookup_method(&sigma, &ty, &IdKey::new("nope")), Err(MethodLookupError::NotFound));
    }

    #[test]
    fn default_without_implements_is_not_visible() {
        let mut sigma = Sigma::new();
        let ty = PathKey::from_strs(&["m", "T"]);
        let class = PathKey::from_strs(&["m", "C"]);
        let name = IdKey::new("go");
        let mut table = ClassTable { name: class.clone(), methods: HashMap::new() };
        table.methods.insert(name.clone(), ClassMethodSig { sig: sig(), has_default: true });
        sigma.classes.insert(class, table);
        // Note: `implements` was never populated for `ty`.
        assert_eq!(lookup_method(&sigma, &ty, &name), Err(MethodLookupError::NotFound));
    }
}
