//! End-to-end scenario tests for the six concrete checker behaviors: a
//! clean type check, a missing required move, a region escape, modal
//! pointer-niche widening, static-init poison propagation, and match
//! exhaustiveness. Each test builds the AST the scenario describes
//! directly (no external parser lives in this workspace) and drives it
//! through the same entry points a real driver would use.

use cursive0_base::{IdKey, PathKey, Span};
use cursive0_sema::analyze::{self, ModuleItems};
use cursive0_sema::expr::{type_block, type_expr};
use cursive0_sema::modal::check_niche_widening;
use cursive0_sema::scope::{Entity, EntityKind, Scope, ScopeContext, Sigma};
use cursive0_sema::types::{mk_func, mk_prim, FuncParam, ParamMode, PrimName, TypeKind};
use cursive0_syntax::ast::expr::{Arg, Expr, ExprKind, Literal};
use cursive0_syntax::ast::item::{Field, Item, ItemKind, Modal, ModalState, StaticDecl, Visibility};
use cursive0_syntax::ast::stmt::{Binding, Block, Stmt, StmtKind};
use cursive0_syntax::ast::ty::{PtrStateTag, TypeExpr, TypeExprKind};
use cursive0_syntax::ast::{BindOp, Ident, Mutability, Pat, PatKind, Path};
use std::collections::HashSet;
use std::sync::Arc;

fn span() -> Span {
    Span::new(Arc::from("t.cursive"), 0, 1)
}

fn e(kind: ExprKind) -> Expr {
    Expr::new(kind, span())
}

fn int_ty_expr() -> TypeExpr {
    TypeExpr::new(TypeExprKind::Prim("i32".into()), span())
}

/// Scenario 1: `let x: i32 = 1; return x` type-checks with no diagnostics
/// and the procedure's tail has type `i32`.
#[test]
fn basic_type_check_passes() {
    let universe = Scope::new();
    let sigma = Sigma::new();
    let mut ctx = ScopeContext::new(PathKey::from_strs(&["m"]), Scope::new(), &universe, &sigma);

    let binding = Binding {
        mutability: Mutability::Let,
        op: BindOp::Immov,
        pat: Pat::new(PatKind::Ident(Ident::new("x", span())), span()),
        ty: Some(int_ty_expr()),
        init: Some(e(ExprKind::Literal(Literal::Int { text: "1".into(), suffix: None }))),
    };
    let let_stmt = Stmt { kind: StmtKind::Let(binding), span: span() };
    let tail = e(ExprKind::Ident(Ident::new("x", span())));
    let body = Block { stmts: vec![let_stmt], tail: Some(Box::new(tail)), span: span() };

    let result = type_block(&body, &mut ctx, &HashSet::new());
    assert!(result.diagnostics.is_empty(), "unexpected diagnostics: {:?}", result.diagnostics);
    assert!(matches!(result.ty.as_ref(), TypeKind::Prim(PrimName::I32)));
}

/// Scenario 2: calling a `move`-parameter procedure without moving the
/// argument is `Call-Move-Missing`.
#[test]
fn move_required_but_absent_is_diagnosed() {
    let universe = Scope::new();
    let mut sigma = Sigma::new();
    let func_ty = mk_func(
        vec![FuncParam { mode: Some(ParamMode::Move), ty: mk_prim(PrimName::I32) }],
        mk_prim(PrimName::Unit),
    );
    sigma.values.insert(PathKey::from_strs(&["take"]), func_ty.clone());
    let mut ctx = ScopeContext::new(PathKey::from_strs(&["m"]), Scope::new(), &universe, &sigma);
    ctx.bind(IdKey::new("take"), Entity::local(EntityKind::Value, Some(func_ty)));
    ctx.bind(IdKey::new("x"), Entity::local(EntityKind::Value, Some(mk_prim(PrimName::I32))));

    let callee = e(ExprKind::Ident(Ident::new("take", span())));
    let arg = Arg { expr: e(ExprKind::Ident(Ident::new("x", span()))), is_move: false };
    let call = e(ExprKind::Call(Box::new(callee), vec![arg]));

    let r = type_expr(&call, &mut ctx, &HashSet::new());
    assert!(r.diagnostics.iter().any(|d| d.code == "Call-Move-Missing"), "diagnostics: {:?}", r.diagnostics);
}

/// Scenario 3: assigning a value allocated in a region to a place outside
/// it is `Prov-Escape-Err`.
#[test]
fn region_escape_is_diagnosed() {
    let universe = Scope::new();
    let sigma = Sigma::new();
    let mut ctx = ScopeContext::new(PathKey::from_strs(&["m"]), Scope::new(), &universe, &sigma);

    let region_name = Ident::new("r", span());
    let value = e(ExprKind::Alloc {
        value: Box::new(e(ExprKind::Literal(Literal::Unit))),
        region: Some(region_name.clone()),
    });
    let place = e(ExprKind::Alloc { value: Box::new(e(ExprKind::Literal(Literal::Unit))), region: None });
    let assign = Stmt { kind: StmtKind::Expr(e(ExprKind::Assign(Box::new(place), Box::new(value)))), span: span() };
    let region_stmt = Stmt {
        kind: StmtKind::Region { alias: region_name, opts: None, body: Block { stmts: vec![assign], tail: None, span: span() } },
        span: span(),
    };
    let body = Block { stmts: vec![region_stmt], tail: None, span: span() };

    let result = type_block(&body, &mut ctx, &HashSet::new());
    assert!(result.diagnostics.iter().any(|d| d.code == "Prov-Escape-Err"), "diagnostics: {:?}", result.diagnostics);
}

fn ptr_valid_field(name: &str) -> Field {
    let elem = TypeExpr::new(TypeExprKind::Prim("u8".into()), span());
    let ty = TypeExpr::new(TypeExprKind::Ptr(Box::new(elem), Some(PtrStateTag::Valid)), span());
    Field { name: Ident::new(name, span()), ty, default: None }
}

fn empty_modal_state(name: &str) -> ModalState {
    ModalState { name: Ident::new(name, span()), fields: vec![], methods: vec![], transitions: vec![] }
}

/// Scenario 4: a modal with one pointer-payload state and one field-less
/// state admits pointer-niche widening.
#[test]
fn modal_with_single_pointer_payload_state_widens() {
    let sigma = Sigma::new();
    let payload_state = ModalState {
        name: Ident::new("A", span()),
        fields: vec![ptr_valid_field("p")],
        methods: vec![],
        transitions: vec![],
    };
    let modal = Modal {
        name: Ident::new("M", span()),
        visibility: Visibility::Public,
        states: vec![payload_state, empty_modal_state("B")],
        implements: vec![Path::single(Ident::new("Niche", span()))],
    };
    assert!(check_niche_widening(&modal, &sigma).is_ok());
}

fn static_referencing(module: &str, name: &str) -> StaticDecl {
    let path = Path { segments: vec![Ident::new(module, span()), Ident::new(name, span())], span: span() };
    StaticDecl {
        visibility: Visibility::Private,
        binding: Binding {
            mutability: Mutability::Let,
            op: BindOp::Immov,
            pat: Pat::new(PatKind::Ident(Ident::new("x", span())), span()),
            ty: None,
            init: Some(e(ExprKind::Path(path))),
        },
    }
}

/// Scenario 5: module `a`'s static references `b::x`; when `b`'s
/// initializer panics, poison propagates forward to `a` as well.
#[test]
fn init_poison_propagates_to_dependents() {
    let a_items = vec![Item { kind: ItemKind::Static(static_referencing("b", "x")), span: span() }];
    let b_items: Vec<Item> = vec![];
    let modules = vec![
        ModuleItems { path: PathKey::from_strs(&["a"]), items: &a_items },
        ModuleItems { path: PathKey::from_strs(&["b"]), items: &b_items },
    ];
    let (plan, diags) = analyze::plan_project_init(&modules);
    assert!(plan.topo_ok, "unexpected cycle diagnostics: {:?}", diags);
    let poisoned = analyze::propagate_poison(&plan, &PathKey::from_strs(&["b"]));
    assert!(poisoned.contains(&PathKey::from_strs(&["a"])));
}

/// Scenario 6: a two-variant enum matched by a single literal arm is
/// non-exhaustive.
#[test]
fn non_exhaustive_match_is_diagnosed() {
    use cursive0_syntax::ast::expr::MatchArm;

    let universe = Scope::new();
    let sigma = Sigma::new();
    let mut ctx = ScopeContext::new(PathKey::from_strs(&["m"]), Scope::new(), &universe, &sigma);

    let scrutinee = e(ExprKind::Ident(Ident::new("e", span())));
    ctx.bind(IdKey::new("e"), Entity::local(EntityKind::Value, Some(mk_prim(PrimName::I32))));
    let arm = MatchArm {
        pat: Pat::new(PatKind::Literal(Literal::Int { text: "0".into(), suffix: None }), span()),
        guard: None,
        body: e(ExprKind::Literal(Literal::Int { text: "0".into(), suffix: None })),
    };
    let match_expr = e(ExprKind::Match(Box::new(scrutinee), vec![arm]));

    let r = type_expr(&match_expr, &mut ctx, &HashSet::new());
    assert!(r.diagnostics.iter().any(|d| d.code == "E-SEM-0329"), "diagnostics: {:?}", r.diagnostics);
}
