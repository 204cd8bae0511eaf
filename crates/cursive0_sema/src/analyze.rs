//! Project-level orchestration: wires the per-module and per-item checks
//! (C4, C9-C12) against a parsed set of modules (§5/§6).
//!
//! Grounded in teacher's `apps/logicaffeine_cli::compile` for the idiom of
//! a thin orchestrator that drives lower-crate checkers module-by-module
//! off a precomputed plan, and in `analysis/callgraph.rs` for building that
//! plan once up front rather than re-deriving order ad hoc. `Sigma`
//! construction from a real cross-module binder is outside this crate
//! (§1 non-goals: no lexer/parser/binder lives here), so callers that
//! already have one supply it; [`check_module`] itself only needs a
//! module's own items plus whatever `Sigma` the caller already built.

use crate::expr::type_block;
use crate::init::{build_init_plan, poison_set_for_init, InitGraph, InitPlan, ModuleStatics};
use crate::lower::lower_type_expr;
use crate::modal::check_niche_widening;
use crate::scope::{Entity, EntityKind, Scope, ScopeContext, Sigma};
use cursive0_base::{Diagnostic, PathKey};
use cursive0_syntax::ast::item::{Item, ItemKind, StaticDecl};
use std::collections::HashSet;

/// One module's parsed items, as presented to the project-level checks.
pub struct ModuleItems<'a> {
    pub path: PathKey,
    pub items: &'a [Item],
}

fn statics_of(items: &[Item]) -> Vec<StaticDecl> {
    items
        .iter()
        .filter_map(|item| match &item.kind {
            ItemKind::Static(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

/// Builds the eager-dependency graph across every module's statics and
/// plans an initialization order (C12), reporting `Init-Cycle-Err` when the
/// eager-reference graph admits no topological order.
pub fn plan_project_init(modules: &[ModuleItems]) -> (InitPlan, Vec<Diagnostic>) {
    let owned: Vec<Vec<StaticDecl>> = modules.iter().map(|m| statics_of(m.items)).collect();
    let mod_statics: Vec<ModuleStatics> = modules
        .iter()
        .zip(&owned)
        .map(|(m, statics)| ModuleStatics { path: m.path.clone(), statics })
        .collect();
    let graph = InitGraph::build(&mod_statics);
    let plan = build_init_plan(graph);
    let mut diags = Vec::new();
    if !plan.topo_ok {
        diags.push(Diagnostic::error(
            "Init-Cycle-Err",
            None,
            "module static initializers form a cycle of eager dependencies".to_string(),
        ));
    }
    (plan, diags)
}

/// Thin wrapper over [`poison_set_for_init`] for the runtime caller that
/// observes which module's initializer actually panicked.
pub fn propagate_poison(plan: &InitPlan, panicked_module: &PathKey) -> HashSet<PathKey> {
    poison_set_for_init(plan, panicked_module)
}

fn check_body(
    module_path: &PathKey,
    params: &[cursive0_syntax::ast::item::Param],
    body: &cursive0_syntax::ast::Block,
    universe: &Scope,
    sigma: &Sigma,
    poisoned: &HashSet<PathKey>,
) -> Vec<Diagnostic> {
    let mut ctx = ScopeContext::new(module_path.clone(), Scope::new(), universe, sigma);
    for param in params {
        if let Ok(ty) = lower_type_expr(&param.ty, sigma) {
            ctx.bind(param.name.id_key(), Entity::local(EntityKind::Value, Some(ty)));
        }
    }
    type_block(body, &mut ctx, poisoned).diagnostics
}

/// A modal's `implements` list names the niche-widening marker class by
/// this path (§4.9); `modal.rs` leaves detecting it to the caller.
fn claims_niche_widening(modal: &cursive0_syntax::ast::item::Modal) -> bool {
    modal.implements.iter().any(|p| p.to_path_key() == PathKey::from_strs(&["Niche"]))
}

/// Checks every item in one module: procedure and method bodies through
/// [`type_block`], and modal declarations that claim pointer-niche widening
/// (an `implements Niche` clause) through [`check_niche_widening`].
pub fn check_module(
    module_path: &PathKey,
    items: &[Item],
    universe: &Scope,
    sigma: &Sigma,
    poisoned: &HashSet<PathKey>,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for item in items {
        match &item.kind {
            ItemKind::Procedure(proc) => {
                diags.extend(check_body(module_path, &proc.params, &proc.body, universe, sigma, poisoned));
            }
            ItemKind::Record(record) => {
                for method in &record.methods {
                    diags.extend(check_body(module_path, &method.params, &method.body, universe, sigma, poisoned));
                }
            }
            ItemKind::Modal(modal) => {
                if claims_niche_widening(modal) {
                    if let Err(e) = check_niche_widening(modal, sigma) {
                        diags.push(Diagnostic::error(
                            "WF-Niche-Err",
                            Some(item.span.clone()),
                            format!(
                                "modal '{}' declares pointer-niche widening but does not satisfy the admissibility conditions",
                                e.modal
                            ),
                        ));
                    }
                }
                for state in &modal.states {
                    for method in &state.methods {
                        diags.extend(check_body(module_path, &method.params, &method.body, universe, sigma, poisoned));
                    }
                }
            }
            _ => {}
        }
    }
    diags
}
