//! Qualified name resolution and `using` alias expansion (C4, §4.4).
//!
//! `ResolveQualified` is the entry point a qualified reference (`a::b::c`)
//! goes through: expand any leading alias, confirm the target module is
//! known, look its `NameMap` up, then gate the result by visibility.
//! Grounded on `original_source/include/cursive0/sema/scopes_lookup.h`
//! (`ResolveQualified`, `AliasMapOf`, `ModuleNamesOf`, `ResolveModulePath`)
//! and `src/03_analysis/resolve/scopes.cpp` (reserved-path rules).

use crate::scope::{Entity, EntityKind, Scope};
use cursive0_base::{Diagnostic, IdKey, PathKey};
use cursive0_syntax::ast::item::{UsingRename, Visibility};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UnknownModule,
    UnknownName,
    NotVisible,
    WrongKind,
}

impl ResolveError {
    pub fn to_diagnostic(&self, name: &str) -> Diagnostic {
        let code = match self {
            ResolveError::UnknownModule => "E-RES-0202",
            ResolveError::UnknownName => "E-RES-0203",
            ResolveError::NotVisible => "E-RES-0204",
            ResolveError::WrongKind => "E-RES-0205",
        };
        Diagnostic::error(code, None, format!("cannot resolve '{name}'"))
    }
}

/// `AliasMapOf` (§4.4): the `using ... as` aliases visible in a `NameMap`,
/// keyed by the alias name they introduce.
pub fn alias_map_of(names: &Scope) -> std::collections::HashMap<IdKey, PathKey> {
    names
        .iter()
        .filter_map(|(k, e)| e.renamed_target.clone().map(|target| (k.clone(), target)))
        .collect()
}

/// `ModuleNamesOf` (§4.4): the flat list of module path strings known to
/// the project, used to validate a resolved module path actually exists.
pub fn module_names_of(modules: &[String]) -> Vec<String> {
    modules.to_vec()
}

/// `ResolveModulePath` (§4.4): expand a single leading alias component (if
/// any), then confirm the resulting path names a known module.
pub fn resolve_module_path(
    path: &PathKey,
    alias: &std::collections::HashMap<IdKey, PathKey>,
    module_names: &[String],
) -> Result<PathKey, ResolveError> {
    let expanded = match path.head().and_then(|h| alias.get(h)) {
        Some(target) => {
            let mut combined = target.clone();
            combined.0.extend(path.tail().0);
            combined
        }
        None => path.clone(),
    };
    if module_names.iter().any(|m| m == &expanded.to_string()) {
        Ok(expanded)
    } else {
        Err(ResolveError::UnknownModule)
    }
}

/// Whether `looker` (the module doing the lookup) may see an entity of the
/// given `visibility` declared in `owner`. `Public` is visible everywhere;
/// everything else requires `looker == owner`.
pub fn can_access(visibility: Visibility, owner: &PathKey, looker: &PathKey) -> bool {
    match visibility {
        Visibility::Public => true,
        Visibility::Private | Visibility::Internal | Visibility::Protected => owner == looker,
    }
}

/// `ResolveQualified` (§4.4): alias-expand, verify the module exists,
/// locate its `NameMap`, look the name up restricted to `kind`, then gate
/// the result through [`can_access`].
#[tracing::instrument(skip_all, fields(name = %name))]
pub fn resolve_qualified<'a>(
    module_path: &PathKey,
    name: &IdKey,
    kind: EntityKind,
    name_maps: &'a std::collections::HashMap<PathKey, Scope>,
    module_names: &[String],
    alias: &std::collections::HashMap<IdKey, PathKey>,
    looker_module: &PathKey,
) -> Result<&'a Entity, ResolveError> {
    let resolved_module = resolve_module_path(module_path, alias, module_names)?;
    let map = name_maps.get(&resolved_module).ok_or(ResolveError::UnknownModule)?;
    let entity = map.get(name).ok_or(ResolveError::UnknownName)?;
    if entity.kind != kind {
        return Err(ResolveError::WrongKind);
    }
    if !can_access(entity.visibility, &resolved_module, looker_module) {
        return Err(ResolveError::NotVisible);
    }
    Ok(entity)
}

/// Expands `using a::b::c` / `using a::b::{c, d as e}` into `Scope` bindings
/// to be merged into the importing module's top-level scope, producing
/// `E-RES-0201` conflicts where two distinct origins claim the same name.
pub fn expand_using(
    renames: &[UsingRename],
    base: &PathKey,
    source_entities: impl Fn(&PathKey) -> Option<Entity>,
) -> Vec<(IdKey, Entity, PathKey)> {
    let mut out = Vec::new();
    for rename in renames {
        let full_path = {
            let mut p = base.clone();
            p.0.extend(rename.path.to_path_key().0);
            p
        };
        if let Some(mut entity) = source_entities(&full_path) {
            let bound_name = rename
                .alias
                .as_ref()
                .map(|a| a.id_key())
                .unwrap_or_else(|| full_path.0.last().cloned().unwrap_or_else(|| IdKey::new("")));
            entity.source = crate::scope::SourceTag::Using;
            entity.renamed_target = Some(full_path.clone());
            out.push((bound_name, entity, full_path));
        }
    }
    out
}

/// Merges `bindings` into `into`, detecting `E-RES-0201`: two bindings for
/// the same name whose origins (target paths) differ.
pub fn merge_name_map(
    into: &mut Scope,
    bindings: Vec<(IdKey, Entity, PathKey)>,
) -> Vec<Diagnostic> {
    let mut origins: std::collections::HashMap<IdKey, PathKey> = std::collections::HashMap::new();
    let mut diagnostics = Vec::new();
    for (name, entity, origin) in bindings {
        if let Some(existing) = origins.get(&name) {
            if existing != &origin {
                diagnostics.push(Diagnostic::error(
                    "E-RES-0201",
                    None,
                    format!("'{name}' is defined more than once with conflicting origins"),
                ));
                continue;
            }
        }
        origins.insert(name.clone(), origin);
        into.insert(name, entity);
    }
    diagnostics
}
