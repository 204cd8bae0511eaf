//! Scopes, entities, and the typed global environment (C4 data model, §3).
//!
//! `ScopeContext` carries the three-layer stack §3 describes: an innermost
//! function/block stack, the current module's top-level scope, and the
//! read-only built-in `Universe`. `Sigma` is the project-wide typed
//! environment built once during the collect phase and read-only from then
//! on (§5: "any code touching `Sigma` during the check phase does so
//! through read-only borrows").

use crate::class::ClassTable;
use crate::region::{ProvEnv, ProvTag};
use crate::types::TypeRef;
use cursive0_base::{IdKey, PathKey};
use cursive0_syntax::ast::item::Visibility;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Value,
    Type,
    Class,
    ModuleAlias,
    RegionAlias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    Decl,
    Using,
    Universe,
}

/// A named artifact introduced into scope.
#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    /// The module that declared this entity, if any (absent for universe
    /// entries and region aliases introduced by a `region` statement).
    pub origin_module: Option<PathKey>,
    /// The path this entity renames to, for `using ... as` aliases.
    pub renamed_target: Option<PathKey>,
    pub source: SourceTag,
    pub visibility: Visibility,
    /// The entity's declared type, when `kind == Value`.
    pub value_type: Option<TypeRef>,
}

impl Entity {
    pub fn universe(kind: EntityKind, value_type: Option<TypeRef>) -> Self {
        Entity {
            kind,
            origin_module: None,
            renamed_target: None,
            source: SourceTag::Universe,
            visibility: Visibility::Public,
            value_type,
        }
    }

    pub fn declared(kind: EntityKind, module: PathKey, visibility: Visibility, value_type: Option<TypeRef>) -> Self {
        Entity {
            kind,
            origin_module: Some(module),
            renamed_target: None,
            source: SourceTag::Decl,
            visibility,
            value_type,
        }
    }

    /// A lexically-scoped local binding (let/var/pattern arm), with no
    /// owning module — it never appears in a `NameMap`.
    pub fn local(kind: EntityKind, value_type: Option<TypeRef>) -> Self {
        Entity {
            kind,
            origin_module: None,
            renamed_target: None,
            source: SourceTag::Decl,
            visibility: Visibility::Private,
            value_type,
        }
    }
}

/// A mapping `IdKey -> Entity`, used both for lexical scopes and for a
/// module's exposed `NameMap` (§4.4).
pub type Scope = HashMap<IdKey, Entity>;

/// The fixed built-in scope (§4.4): primitive types, the predicate/semantic
/// universe names, and the `cursive` module alias.
pub fn build_universe() -> Scope {
    let mut u = Scope::new();
    let mut put_type = |u: &mut Scope, name: &str| {
        u.insert(IdKey::new(name), Entity::universe(EntityKind::Type, None));
    };
    for prim in [
        "i8", "i16", "i32", "i64", "i128", "u8", "u16", "u32", "u64", "u128", "isize", "usize",
        "f16", "f32", "f64", "bool", "char",
    ] {
        put_type(&mut u, prim);
    }
    for predicate in ["Drop", "Bitcopy", "Clone", "Eq", "Hash", "Hasher", "Iterator", "Step", "FfiSafe", "Niche"] {
        u.insert(IdKey::new(predicate), Entity::universe(EntityKind::Class, None));
    }
    for semantic_ty in [
        "Self", "string", "bytes", "Modal", "Region", "RegionOptions", "CancelToken", "Context",
        "System", "ExecutionDomain", "CpuSet", "Priority", "Reactor",
    ] {
        put_type(&mut u, semantic_ty);
    }
    for async_ty in ["Async", "Future", "Sequence", "Stream", "Pipe", "Exchange", "Tracked"] {
        put_type(&mut u, async_ty);
    }
    u.insert(IdKey::new("cursive"), Entity::universe(EntityKind::ModuleAlias, None));
    u
}

/// The project-wide typed environment, built once during the collect phase
/// and read-only for the remainder of analysis.
#[derive(Debug, Clone, Default)]
pub struct Sigma {
    pub types: HashMap<PathKey, TypeRef>,
    pub values: HashMap<PathKey, TypeRef>,
    pub classes: HashMap<PathKey, ClassTable>,
    pub opaque_underlying: HashMap<PathKey, TypeRef>,
    pub modules: Vec<String>,
    pub name_maps: HashMap<PathKey, Scope>,
    /// Constant `u64` value of every `static let` with a single matching
    /// integer-literal pattern, for `ConstLen` (§4.5/§4.6) to resolve array
    /// lengths written as a named constant instead of a literal.
    pub static_consts: HashMap<PathKey, u64>,
    /// Classes each nominal type declares in its `implements` list (C9).
    pub implements: HashMap<PathKey, Vec<PathKey>>,
    /// A nominal type's own (non-inherited) method signatures.
    pub own_methods: HashMap<PathKey, HashMap<IdKey, crate::class::MethodSig>>,
    /// Record field tables, in declaration order, for record construction
    /// and record pattern typing (C7/C8).
    pub record_fields: HashMap<PathKey, Vec<(IdKey, TypeRef)>>,
    /// Enum/modal variant payload tables for variant pattern typing (C7).
    pub variant_payloads: HashMap<PathKey, HashMap<IdKey, Vec<TypeRef>>>,
}

impl crate::equiv::ConstEnv for Sigma {
    fn lookup_static_u64(&self, path: &PathKey) -> Option<u64> {
        self.static_consts.get(path).copied()
    }
}

impl Sigma {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The three-layer scope stack plus the read-only global environment.
pub struct ScopeContext<'a> {
    /// Innermost-first when searching: `stack.last()` is checked first.
    pub stack: Vec<Scope>,
    pub module_top: Scope,
    pub universe: &'a Scope,
    pub module_path: PathKey,
    pub sigma: &'a Sigma,
    /// Named regions and stack-frame scopes opened by `region`/`frame`
    /// statements in the function currently being typed (C10, §4.10).
    pub prov_env: ProvEnv,
    /// The provenance tag of the innermost enclosing `frame`/`region`, or
    /// the function's own top-level stack frame when none is open.
    pub current_frame: ProvTag,
}

impl<'a> ScopeContext<'a> {
    pub fn new(module_path: PathKey, module_top: Scope, universe: &'a Scope, sigma: &'a Sigma) -> Self {
        let mut prov_env = ProvEnv::new();
        let current_frame = prov_env.push_stack_scope();
        ScopeContext { stack: Vec::new(), module_top, universe, module_path, sigma, prov_env, current_frame }
    }

    pub fn push_scope(&mut self) {
        self.stack.push(Scope::new());
    }

    pub fn pop_scope(&mut self) -> Option<Scope> {
        self.stack.pop()
    }

    pub fn bind(&mut self, name: IdKey, entity: Entity) {
        match self.stack.last_mut() {
            Some(top) => {
                top.insert(name, entity);
            }
            None => {
                self.module_top.insert(name, entity);
            }
        }
    }

    /// `Lookup` (§4.4): innermost-out search across the three layers.
    pub fn lookup(&self, name: &IdKey) -> Option<&Entity> {
        for frame in self.stack.iter().rev() {
            if let Some(e) = frame.get(name) {
                return Some(e);
            }
        }
        if let Some(e) = self.module_top.get(name) {
            return Some(e);
        }
        self.universe.get(name)
    }

    fn resolve_kind(&self, name: &IdKey, kind: EntityKind) -> Option<&Entity> {
        let entity = self.lookup(name)?;
        if entity.kind == kind {
            Some(entity)
        } else {
            None
        }
    }

    pub fn resolve_value_name(&self, name: &IdKey) -> Option<&Entity> {
        self.resolve_kind(name, EntityKind::Value)
    }

    pub fn resolve_type_name(&self, name: &IdKey) -> Option<&Entity> {
        self.resolve_kind(name, EntityKind::Type)
    }

    pub fn resolve_class_name(&self, name: &IdKey) -> Option<&Entity> {
        self.resolve_kind(name, EntityKind::Class)
    }

    pub fn resolve_module_name(&self, name: &IdKey) -> Option<&Entity> {
        self.resolve_kind(name, EntityKind::ModuleAlias)
    }
}
