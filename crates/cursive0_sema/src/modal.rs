//! Modal state admissibility and pointer-niche widening (C9, §4.9).
//!
//! Grounded in `original_source/.../analysis/modal/modal_widen.cpp`
//! (`PayloadState`, `NicheApplies`, `NicheCompatible`): a modal widens to a
//! bare pointer niche when exactly one state carries a single field whose
//! type is itself a `Ptr<_>@Valid`, every other state is field-less, and
//! the candidate state's niche count covers every non-candidate state.
//!
//! Layout (`SizeOf`/`AlignOf`) is outside this crate's scope (C5 only
//! models types, not their byte representation), so the size/alignment
//! equality the original checks is not reproduced here; the structural
//! admissibility condition alone decides [`payload_state`].

use crate::lower::lower_type_expr;
use crate::scope::Sigma;
use crate::types::{PtrState, TypeKind};
use cursive0_base::IdKey;
use cursive0_syntax::ast::item::{Field, Modal, ModalState};

fn single_field_payload(state: &ModalState) -> Option<&Field> {
    let mut found = None;
    for field in &state.fields {
        if found.is_some() {
            return None;
        }
        found = Some(field);
    }
    found
}

fn is_empty_state(state: &ModalState) -> bool {
    state.fields.is_empty()
}

fn niche_count(ty: &crate::types::TypeRef) -> u64 {
    match ty.as_ref() {
        TypeKind::Ptr(_, Some(PtrState::Valid)) => 1,
        _ => 0,
    }
}

/// `PayloadState` (§4.9): the name of the one state a modal can widen to a
/// bare pointer, if any such state exists.
pub fn payload_state(modal: &Modal, sigma: &Sigma) -> Option<IdKey> {
    let mut candidate: Option<&ModalState> = None;
    for state in &modal.states {
        let Some(field) = single_field_payload(state) else { continue };
        let Ok(field_ty) = lower_type_expr(&field.ty, sigma) else { return None };
        if niche_count(&field_ty) == 0 {
            continue;
        }
        if candidate.is_some() {
            return None;
        }
        candidate = Some(state);
    }
    let candidate = candidate?;
    for state in &modal.states {
        if std::ptr::eq(state, candidate) {
            continue;
        }
        if !is_empty_state(state) {
            return None;
        }
    }
    Some(candidate.name.id_key())
}

/// `NicheApplies` (§4.9): whether the modal admits pointer-niche widening
/// at all.
pub fn niche_applies(modal: &Modal, sigma: &Sigma) -> bool {
    payload_state(modal, sigma).is_some()
}

/// `NicheCompatible` (§4.9, structural half — see module docs): whether
/// `state` is exactly the modal's niche-bearing payload state.
pub fn niche_compatible(modal: &Modal, state: &IdKey, sigma: &Sigma) -> bool {
    modal.states.iter().any(|s| &s.name.id_key() == state)
        && payload_state(modal, sigma).as_ref() == Some(state)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicheError {
    pub modal: String,
}

/// Validates a modal declaring pointer-niche widening (via an `implements`
/// list naming a niche-widening marker class, left to the caller to
/// detect) actually satisfies the admissibility conditions, else
/// `WF-Niche-Err`.
pub fn check_niche_widening(modal: &Modal, sigma: &Sigma) -> Result<(), NicheError> {
    if niche_applies(modal, sigma) {
        Ok(())
    } else {
        Err(NicheError { modal: modal.name.text.clone() })
    }
}
