//! Project manifest loading (§6, expansion).
//!
//! Grounded in teacher's `project::manifest::Manifest` (`apps/logicaffeine_cli`):
//! a `serde`+`toml` struct for the package table, `thiserror` for the small
//! set of infrastructural I/O/parse errors, plain `ManifestError` variants
//! rather than a catch-all string. The `assembly` table/array-of-tables
//! shape and its per-key validation are this crate's own, since the
//! teacher's manifest has no multi-unit concept to generalize from; they're
//! built against [`cursive0_base::Catalog`] so manifest problems are
//! diagnostics like every other phase, not a different error channel.

use cursive0_base::{Catalog, Diagnostic};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE_NAME: &str = "cursive0.toml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse manifest at {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyKind {
    Executable,
    Library,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitIr {
    None,
    Ll,
    Bc,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub name: String,
    pub kind: AssemblyKind,
    pub root: PathBuf,
    pub out_dir: Option<PathBuf>,
    pub emit_ir: EmitIr,
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub assemblies: Vec<Assembly>,
}

const KNOWN_ASSEMBLY_KEYS: &[&str] = &["name", "kind", "root", "out_dir", "emit_ir"];

impl Manifest {
    /// Loads and validates `cursive0.toml` from `project_root`. Manifest
    /// *shape* errors (missing file, invalid TOML) are infrastructural and
    /// short-circuit via [`ManifestError`]; everything past that point is
    /// reported as diagnostics so a manifest with several bad assemblies
    /// still reports every problem in one pass (§7).
    #[tracing::instrument(skip_all, fields(project_root = %project_root.display()))]
    pub fn load(project_root: &Path) -> Result<(Self, Vec<Diagnostic>), ManifestError> {
        let path = project_root.join(MANIFEST_FILE_NAME);
        let content = std::fs::read_to_string(&path)
            .map_err(|source| ManifestError::Io { path: path.clone(), source })?;
        let raw: toml::Value = toml::from_str(&content)
            .map_err(|source| ManifestError::Parse { path: path.clone(), source })?;

        let catalog = Catalog::standard();
        let mut diagnostics = Vec::new();
        let assemblies = parse_assemblies(&raw, project_root, &catalog, &mut diagnostics);
        Ok((Manifest { assemblies }, diagnostics))
    }
}

fn diag(catalog: &Catalog, code: &str, name: &str) -> Diagnostic {
    let mut args = HashMap::new();
    args.insert("name", name.to_string());
    catalog
        .make(code, None, &args)
        .unwrap_or_else(|| Diagnostic::error(code, None, format!("{code}: {name}")))
}

fn parse_assemblies(
    raw: &toml::Value,
    project_root: &Path,
    catalog: &Catalog,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Assembly> {
    let Some(assembly_value) = raw.get("assembly") else {
        return Vec::new();
    };
    let tables: Vec<&toml::Value> = match assembly_value {
        toml::Value::Table(_) => vec![assembly_value],
        toml::Value::Array(items) => items.iter().collect(),
        _ => return Vec::new(),
    };

    let mut seen_names = HashSet::new();
    let mut out = Vec::new();
    for table in tables {
        let Some(assembly) = parse_one_assembly(table, project_root, catalog, diagnostics) else {
            continue;
        };
        if !seen_names.insert(assembly.name.clone()) {
            diagnostics.push(diag(catalog, "E-PRJ-0202", &assembly.name));
            continue;
        }
        out.push(assembly);
    }
    out
}

fn parse_one_assembly(
    table: &toml::Value,
    project_root: &Path,
    catalog: &Catalog,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Assembly> {
    let toml::Value::Table(map) = table else { return None };

    for key in map.keys() {
        if !KNOWN_ASSEMBLY_KEYS.contains(&key.as_str()) {
            diagnostics.push(diag(catalog, "E-PRJ-0104", key));
        }
    }

    let name = required_str(map, "name", catalog, diagnostics)?;
    if !is_valid_identifier(&name) {
        diagnostics.push(diag(catalog, "E-PRJ-0102", &name));
    }

    let kind_str = required_str(map, "kind", catalog, diagnostics)?;
    let kind = match kind_str.as_str() {
        "executable" => AssemblyKind::Executable,
        "library" => AssemblyKind::Library,
        _ => {
            diagnostics.push(diag(catalog, "E-PRJ-0101", &kind_str));
            return None;
        }
    };

    let root_str = required_str(map, "root", catalog, diagnostics)?;
    let root = resolve_relative(project_root, &root_str, catalog, diagnostics)?;

    let out_dir = match map.get("out_dir").and_then(|v| v.as_str()) {
        Some(p) => Some(resolve_relative(project_root, p, catalog, diagnostics)?),
        None => None,
    };

    let emit_ir = match map.get("emit_ir").and_then(|v| v.as_str()) {
        None | Some("none") => EmitIr::None,
        Some("ll") => EmitIr::Ll,
        Some("bc") => EmitIr::Bc,
        Some(other) => {
            diagnostics.push(diag(catalog, "E-PRJ-0101", other));
            EmitIr::None
        }
    };

    Some(Assembly { name, kind, root, out_dir, emit_ir })
}

fn required_str(
    map: &toml::map::Map<String, toml::Value>,
    key: &str,
    catalog: &Catalog,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    match map.get(key).and_then(|v| v.as_str()) {
        Some(s) => Some(s.to_string()),
        None => {
            diagnostics.push(diag(catalog, "E-PRJ-0100", key));
            None
        }
    }
}

fn resolve_relative(
    project_root: &Path,
    rel: &str,
    catalog: &Catalog,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<PathBuf> {
    let candidate = PathBuf::from(rel);
    let escapes = candidate.is_absolute()
        || candidate.components().any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes {
        diagnostics.push(diag(catalog, "E-PRJ-0103", rel));
        return None;
    }
    Some(project_root.join(candidate))
}

fn is_valid_identifier(s: &str) -> bool {
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

    fn project_root() -> PathBuf {
        PathBuf::from("/project")
    }

    fn parse(toml_src: &str) -> (Vec<Assembly>, Vec<Diagnostic>) {
        let raw: toml::Value = toml::from_str(toml_src).unwrap();
        let catalog = Catalog::standard();
        let mut diagnostics = Vec::new();
        let assemblies = parse_assemblies(&raw, &project_root(), &catalog, &mut diagnostics);
        (assemblies, diagnostics)
    }

    #[test]
    fn single_table_assembly_parses() {
        let (assemblies, diagnostics) = parse(
            r#"
            [assembly]
            name = "app"
            kind = "executable"
            root = "src"
            "#,
        );
        assert!(diagnostics.is_empty());
        assert_eq!(assemblies.len(), 1);
        assert_eq!(assemblies[0].name, "app");
        assert_eq!(assemblies[0].kind, AssemblyKind::Executable);
    }

    #[test]
    fn array_of_tables_parses_each_assembly() {
        let (assemblies, diagnostics) = parse(
            r#"
            [[assembly]]
            name = "app"
            kind = "executable"
            root = "src"

            [[assembly]]
            name = "lib"
            kind = "library"
            root = "libsrc"
            "#,
        );
        assert!(diagnostics.is_empty());
        assert_eq!(assemblies.len(), 2);
    }

    #[test]
    fn unknown_key_is_diagnosed() {
        let (_, diagnostics) = parse(
            r#"
            [assembly]
            name = "app"
            kind = "executable"
            root = "src"
            bogus = 1
            "#,
        );
        assert!(diagnostics.iter().any(|d| d.code == "E-PRJ-0104"));
    }

    #[test]
    fn duplicate_assembly_name_is_diagnosed() {
        let (assemblies, diagnostics) = parse(
            r#"
            [[assembly]]
            name = "app"
            kind = "executable"
            root = "src"

            [[assembly]]
            name = "app"
            kind = "library"
            root = "libsrc"
            "#,
        );
        assert_eq!(assemblies.len(), 1);
        assert!(diagnostics.iter().any(|d| d.code == "E-PRJ-0202"));
    }

    #[test]
    fn path_escaping_project_root_is_rejected() {
        let (assemblies, diagnostics) = parse(
            r#"
            [assembly]
            name = "app"
            kind = "executable"
            root = "../outside"
            "#,
        );
        assert!(assemblies.is_empty());
        assert!(diagnostics.iter().any(|d| d.code == "E-PRJ-0103"));
    }

    #[test]
    fn missing_required_key_is_diagnosed() {
        let (assemblies, diagnostics) = parse(
            r#"
            [assembly]
            kind = "executable"
            root = "src"
            "#,
        );
        assert!(assemblies.is_empty());
        assert!(diagnostics.iter().any(|d| d.code == "E-PRJ-0100"));
    }
}
