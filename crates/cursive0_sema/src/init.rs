//! Module initialization planning (C12, §4.12).
//!
//! Grounded in `original_source/src/eval/init.cpp`'s `PoisonSetForInit` /
//! `EnsurePoisonFlag` / `SetPoisonFlag` / `Init` (the eager-dependency graph,
//! its topological walk, and the poison-cascade BFS over dependents), and in
//! teacher's `analysis/callgraph.rs` for the Rust idiom of a deterministic
//! graph build plus traversal — generalized here from call edges to
//! static-initializer eager-dependency edges — with module enumeration
//! following `analysis/discovery.rs`.

use cursive0_base::PathKey;
use cursive0_syntax::ast::expr::{Arg, Expr, ExprKind};
use cursive0_syntax::ast::item::StaticDecl;
use cursive0_syntax::ast::{Block, Stmt, StmtKind};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One module's static declarations, as presented to the planner.
pub struct ModuleStatics<'a> {
    pub path: PathKey,
    pub statics: &'a [StaticDecl],
}

/// The eager-reference dependency graph between modules.
#[derive(Debug, Clone, Default)]
pub struct InitGraph {
    pub modules: Vec<PathKey>,
    /// `(dependent, dependency)` index pairs: `modules[dependent]`'s static
    /// initializers eagerly reference a static owned by
    /// `modules[dependency]`, so `dependency` must initialize first.
    pub eager_edges: Vec<(usize, usize)>,
}

impl InitGraph {
    /// Builds the graph by scanning every static initializer expression for
    /// qualified-path references into another module's statics.
    pub fn build(mods: &[ModuleStatics]) -> Self {
        let modules: Vec<PathKey> = mods.iter().map(|m| m.path.clone()).collect();
        let index: HashMap<&PathKey, usize> =
            modules.iter().enumerate().map(|(i, p)| (p, i)).collect();
        let mut eager_edges = Vec::new();
        for (dependent_idx, m) in mods.iter().enumerate() {
            let mut referenced = HashSet::new();
            for decl in m.statics {
                if let Some(init) = &decl.binding.init {
                    collect_module_refs(init, &mut referenced);
                }
            }
            for referenced_module in referenced {
                if let Some(&dependency_idx) = index.get(&referenced_module) {
                    if dependency_idx != dependent_idx {
                        eager_edges.push((dependent_idx, dependency_idx));
                    }
                }
            }
        }
        InitGraph { modules, eager_edges }
    }

    fn dependents_adjacency(&self) -> Vec<Vec<usize>> {
        let mut dependents = vec![Vec::new(); self.modules.len()];
        for &(dependent, dependency) in &self.eager_edges {
            dependents[dependency].push(dependent);
        }
        dependents
    }
}

fn collect_module_refs(expr: &Expr, out: &mut HashSet<PathKey>) {
    match &expr.kind {
        ExprKind::Path(p) => {
            out.insert(p.to_path_key().init());
        }
        ExprKind::Field(base, _) | ExprKind::TupleIndex(base, _) | ExprKind::Unary(_, base) => {
            collect_module_refs(base, out)
        }
        ExprKind::Index(base, idx) => {
            collect_module_refs(base, out);
            collect_module_refs(idx, out);
        }
        ExprKind::Binary(_, l, r) | ExprKind::Assign(l, r) | ExprKind::CompoundAssign(_, l, r) => {
            collect_module_refs(l, out);
            collect_module_refs(r, out);
        }
        ExprKind::Call(callee, args) => {
            collect_module_refs(callee, out);
            collect_args(args, out);
        }
        ExprKind::MethodCall(recv, _, args) | ExprKind::Transition(recv, _, args) => {
            collect_module_refs(recv, out);
            collect_args(args, out);
        }
        ExprKind::Async(_, args) => collect_args(args, out),
        ExprKind::Block(block) | ExprKind::Loop(block) | ExprKind::Unsafe(block) => {
            collect_block(block, out)
        }
        ExprKind::If(cond, then_block, else_expr) => {
            collect_module_refs(cond, out);
            collect_block(then_block, out);
            if let Some(e) = else_expr {
                collect_module_refs(e, out);
            }
        }
        ExprKind::Match(scrutinee, arms) => {
            collect_module_refs(scrutinee, out);
            for arm in arms {
                if let Some(guard) = &arm.guard {
                    collect_module_refs(guard, out);
                }
                collect_module_refs(&arm.body, out);
            }
        }
        ExprKind::Break(Some(e)) | ExprKind::Return(Some(e)) => collect_module_refs(e, out),
        ExprKind::Transmute(e, _) | ExprKind::Cast(e, _) | ExprKind::Widen(e, _) => {
            collect_module_refs(e, out)
        }
        ExprKind::RecordLiteral(_, fields) => {
            for (_, init) in fields {
                if let Some(e) = init {
                    collect_module_refs(e, out);
                }
            }
        }
        ExprKind::Tuple(items) | ExprKind::Array(items) => {
            for item in items {
                collect_module_refs(item, out);
            }
        }
        ExprKind::Alloc { value, .. } => collect_module_refs(value, out),
        _ => {}
    }
}

fn collect_args(args: &[Arg], out: &mut HashSet<PathKey>) {
    for arg in args {
        collect_module_refs(&arg.expr, out);
    }
}

fn collect_block(block: &Block, out: &mut HashSet<PathKey>) {
    for stmt in &block.stmts {
        collect_stmt(stmt, out);
    }
    if let Some(tail) = &block.tail {
        collect_module_refs(tail, out);
    }
}

fn collect_stmt(stmt: &Stmt, out: &mut HashSet<PathKey>) {
    match &stmt.kind {
        StmtKind::Let(binding) => {
            if let Some(init) = &binding.init {
                collect_module_refs(init, out);
            }
        }
        StmtKind::Expr(e) => collect_module_refs(e, out),
        StmtKind::Defer(block) => collect_block(block, out),
        StmtKind::Region { body, .. } | StmtKind::Frame { body, .. } => collect_block(body, out),
    }
}

/// The planned initialization order, and whether a deterministic
/// topological order exists at all (`topo_ok`; `false` means the eager
/// graph contains a cycle).
#[derive(Debug, Clone)]
pub struct InitPlan {
    pub graph: InitGraph,
    pub init_order: Vec<PathKey>,
    pub topo_ok: bool,
}

/// Kahn's algorithm, breaking ties deterministically by module path so the
/// same source always plans the same order (§4.12).
#[tracing::instrument(skip_all)]
pub fn build_init_plan(graph: InitGraph) -> InitPlan {
    let n = graph.modules.len();
    let mut indegree = vec![0usize; n];
    for &(dependent, _) in &graph.eager_edges {
        indegree[dependent] += 1;
    }
    let dependents = graph.dependents_adjacency();

    let mut ready: BTreeSet<(PathKey, usize)> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| (graph.modules[i].clone(), i))
        .collect();

    let mut order = Vec::new();
    while let Some(next) = ready.iter().next().cloned() {
        ready.remove(&next);
        let (path, idx) = next;
        order.push(path);
        for &dep in &dependents[idx] {
            indegree[dep] -= 1;
            if indegree[dep] == 0 {
                ready.insert((graph.modules[dep].clone(), dep));
            }
        }
    }

    let topo_ok = order.len() == n;
    InitPlan { graph, init_order: order, topo_ok }
}

/// `PoisonSetForInit` (§4.12): when `module`'s initializer panics, every
/// module that eagerly depends on it — directly or transitively — is
/// poisoned too, since its static references may now read a value that was
/// never written.
#[tracing::instrument(skip_all, fields(module = %module))]
pub fn poison_set_for_init(plan: &InitPlan, module: &PathKey) -> HashSet<PathKey> {
    let Some(target) = plan.graph.modules.iter().position(|m| m == module) else {
        return std::iter::once(module.clone()).collect();
    };
    let dependents = plan.graph.dependents_adjacency();
    let mut visited = HashSet::new();
    let mut stack = vec![target];
    visited.insert(target);
    while let Some(cur) = stack.pop() {
        for &d in &dependents[cur] {
            if visited.insert(d) {
                stack.push(d);
            }
        }
    }
    visited.into_iter().map(|i| plan.graph.modules[i].clone()).collect()
}
