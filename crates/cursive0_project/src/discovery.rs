//! Module discovery: mapping an assembly's source tree onto module paths
//! (§6, expansion).
//!
//! Grounded loosely in `logicaffeine_compile::analysis::discovery`'s
//! recursive-merge shape, but walking the filesystem rather than an
//! in-memory import graph — a directory is a module, a `.cursive` file
//! inside it is a leaf module, mirroring the original's file-per-module
//! layout (`original_source/src/parse/modules.cpp`: one translation unit
//! per source file, nested directories form the qualified path). Plain
//! `std::fs::read_dir` recursion is enough here; there's no need for a
//! directory-walking crate when the tree is shallow and fully owned by one
//! assembly root.

use cursive0_base::{Catalog, Diagnostic, IdKey, PathKey};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const SOURCE_EXTENSION: &str = "cursive";

#[derive(Debug, Clone)]
pub struct DiscoveredModule {
    pub path: PathKey,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub modules: Vec<DiscoveredModule>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Walks `root` and returns every `.cursive` file as a [`DiscoveredModule`],
/// sorted by module path for deterministic downstream ordering. Invalid
/// path components are diagnosed (`E-MOD-0101`) and their file skipped;
/// two modules whose paths collide under case-folding are both diagnosed
/// (`E-MOD-0102`) and both kept, since the collision is a conflict, not an
/// absence.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn discover_modules(root: &Path) -> DiscoveryResult {
    let catalog = Catalog::standard();
    let mut modules = Vec::new();
    let mut diagnostics = Vec::new();
    walk(root, &[], &mut modules, &mut diagnostics, &catalog);
    modules.sort_by(|a, b| a.path.cmp(&b.path));
    check_case_collisions(&modules, &mut diagnostics, &catalog);
    DiscoveryResult { modules, diagnostics }
}

fn walk(
    dir: &Path,
    prefix: &[String],
    modules: &mut Vec<DiscoveredModule>,
    diagnostics: &mut Vec<Diagnostic>,
    catalog: &Catalog,
) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else { continue };

        if file_type.is_dir() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_valid_component(&name) {
                diagnostics.push(diag(catalog, "E-MOD-0101", &name));
                continue;
            }
            let mut next_prefix = prefix.to_vec();
            next_prefix.push(name);
            walk(&path, &next_prefix, modules, diagnostics, catalog);
        } else if file_type.is_file() {
            if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            if !is_valid_component(stem) {
                diagnostics.push(diag(catalog, "E-MOD-0101", stem));
                continue;
            }
            let mut components: Vec<IdKey> = prefix.iter().map(|c| IdKey::new(c)).collect();
            components.push(IdKey::new(stem));
            modules.push(DiscoveredModule { path: PathKey::new(components), file: path });
        }
    }
}

fn check_case_collisions(modules: &[DiscoveredModule], diagnostics: &mut Vec<Diagnostic>, catalog: &Catalog) {
    let mut by_fold: HashMap<String, Vec<&PathKey>> = HashMap::new();
    for module in modules {
        let folded = module.path.to_string().to_lowercase();
        by_fold.entry(folded).or_default().push(&module.path);
    }
    let mut reported = HashSet::new();
    for paths in by_fold.values() {
        if paths.len() < 2 {
            continue;
        }
        let distinct: HashSet<&PathKey> = paths.iter().copied().collect();
        if distinct.len() < 2 {
            continue;
        }
        for path in distinct {
            if reported.insert(path.clone()) {
                diagnostics.push(diag(catalog, "E-MOD-0102", &path.to_string()));
            }
        }
    }
}

fn diag(catalog: &Catalog, code: &str, name: &str) -> Diagnostic {
    let mut args = HashMap::new();
    args.insert("name", name.to_string());
    catalog
        .make(code, None, &args)
        .unwrap_or_else(|| Diagnostic::error(code, None, format!("{code}: {name}")))
}

fn is_valid_component(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if cursive0_base::unicode::is_id_start(c) => {}
        _ => return false,
    }
    chars.all(cursive0_base::unicode::is_id_continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("cursive0_discovery_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn discovers_flat_module() {
        let dir = temp_dir("flat");
        fs::write(dir.join("main.cursive"), "").unwrap();
        let result = discover_modules(&dir);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.modules.len(), 1);
        assert_eq!(result.modules[0].path, PathKey::from_strs(&["main"]));
    }

    #[test]
    fn discovers_nested_module_path() {
        let dir = temp_dir("nested");
        fs::create_dir_all(dir.join("collections")).unwrap();
        fs::write(dir.join("collections").join("list.cursive"), "").unwrap();
        let result = discover_modules(&dir);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.modules[0].path, PathKey::from_strs(&["collections", "list"]));
    }

    #[test]
    fn non_cursive_files_are_ignored() {
        let dir = temp_dir("ignore");
        fs::write(dir.join("readme.md"), "").unwrap();
        let result = discover_modules(&dir);
        assert!(result.modules.is_empty());
    }

    #[test]
    fn invalid_component_is_diagnosed() {
        let dir = temp_dir("invalid");
        fs::write(dir.join("1bad.cursive"), "").unwrap();
        let result = discover_modules(&dir);
        assert!(result.modules.is_empty());
        assert!(result.diagnostics.iter().any(|d| d.code == "E-MOD-0101"));
    }

    #[test]
    fn case_folded_collision_is_diagnosed() {
        let dir = temp_dir("collision");
        fs::write(dir.join("list.cursive"), "").unwrap();
        fs::write(dir.join("List.cursive"), "").unwrap();
        let result = discover_modules(&dir);
        assert_eq!(result.modules.len(), 2);
        assert!(result.diagnostics.iter().filter(|d| d.code == "E-MOD-0102").count() == 2);
    }
}
