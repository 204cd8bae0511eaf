//! Diagnostics (C2): stable codes, severities, and deterministic rendering.
//!
//! Every checker in `cursive0-sema` emits [`Diagnostic`]s rather than
//! returning `Result` — per §7, the pipeline never short-circuits on the
//! first error within an item. This module owns the shape of a diagnostic,
//! the append-only stream, and the code→template catalog that
//! [`format_message`] fills in.

use crate::span::Span;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A single diagnostic: a stable code, severity, optional span, and a
/// fully-formatted message (placeholders already substituted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub span: Option<Span>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: impl Into<String>, severity: Severity, span: Option<Span>, message: impl Into<String>) -> Self {
        Self { code: code.into(), severity, span, message: message.into() }
    }

    pub fn error(code: impl Into<String>, span: Option<Span>, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, span, message)
    }

    pub fn warning(code: impl Into<String>, span: Option<Span>, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, span, message)
    }
}

/// An append-only stream of diagnostics for one analysis run.
///
/// §7: the overall compile status is OK iff no error-severity diagnostic
/// was emitted across the whole stream.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticStream {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(other);
    }

    pub fn is_ok(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// `{name}`-style placeholder substitution. Unknown placeholders are left
/// verbatim, matching §4.2's "leaves unknown placeholders verbatim" rule.
pub fn format_message(template: &str, args: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(close) = template[i..].find('}') {
                let name = &template[i + 1..i + close];
                if let Some(value) = args.get(name) {
                    out.push_str(value);
                    i += close + 1;
                    continue;
                }
            }
        }
        // Fall back to copying one char at a time so we stay UTF-8 safe.
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// The code→(severity, template) catalog. Closed and versioned with the
/// binary (§4.2: "the message catalog maps codes to templates"); callers
/// build one via [`Catalog::standard`] and never mutate it at runtime.
pub struct Catalog {
    entries: HashMap<&'static str, (Severity, &'static str)>,
}

impl Catalog {
    pub fn standard() -> Self {
        let mut entries = HashMap::new();
        macro_rules! entry {
            ($code:expr, $sev:expr, $tmpl:expr) => {
                entries.insert($code, ($sev, $tmpl));
            };
        }
        entry!("E-UNS-0101", Severity::Error, "'{name}' is not a supported construct in this subset");
        entry!("E-RES-0201", Severity::Error, "'{name}' is defined more than once with conflicting origins");
        entry!("E-SEM-0301", Severity::Error, "exhaustiveness check failed for '{name}'");
        entry!("Call-Move-Missing", Severity::Error, "argument to moved parameter '{name}' must be explicitly moved");
        entry!("Call-Move-Unexpected", Severity::Error, "argument to reference parameter '{name}' must not be moved");
        entry!("Call-ArgCount-Err", Severity::Error, "call to '{name}' has the wrong number of arguments");
        entry!("Call-ArgType-Err", Severity::Error, "argument to '{name}' has an incompatible type");
        entry!("Call-Arg-NotPlace", Severity::Error, "argument to reference parameter '{name}' is not a place expression");
        entry!("LookupMethod-Ambig", Severity::Error, "method '{name}' is ambiguous among implemented classes");
        entry!("LookupMethod-NotFound", Severity::Error, "no method named '{name}' on this receiver");
        entry!("WF-Niche-Err", Severity::Error, "modal '{name}' does not satisfy the pointer-niche widening conditions");
        entry!("Prov-Escape-Err", Severity::Error, "value assigned to '{name}' does not live long enough");
        entry!("Prov-Async-Escape-Err", Severity::Error, "captured value in async create form does not live long enough");
        entry!("Async-Capture-Err", Severity::Error, "argument '{name}' captured by async form does not outlive its frame");
        entry!("ConstLen-Err", Severity::Error, "array length '{name}' is not a valid constant expression");
        entry!("WritePlace-Ident-Path-Poison", Severity::Error, "module '{name}' is poisoned by a failed static initializer");
        entry!("E-PRJ-0100", Severity::Error, "assembly declaration is missing required key '{name}'");
        entry!("E-PRJ-0101", Severity::Error, "assembly kind '{name}' must be 'executable' or 'library'");
        entry!("E-PRJ-0102", Severity::Error, "assembly name '{name}' is not a valid identifier");
        entry!("E-PRJ-0103", Severity::Error, "path '{name}' must be relative and resolve under the project root");
        entry!("E-PRJ-0104", Severity::Error, "unknown manifest key '{name}'");
        entry!("E-PRJ-0202", Severity::Error, "duplicate assembly name '{name}'");
        entry!("E-MOD-0101", Severity::Error, "module path component '{name}' is not a valid identifier");
        entry!("E-MOD-0102", Severity::Error, "module path '{name}' collides with another module under case-folding");
        entry!("E-SRC-0001", Severity::Error, "source file is not valid UTF-8 at byte {name}");
        entry!("E-SRC-0002", Severity::Error, "source file contains an embedded byte-order mark at byte {name}");
        entry!("W-SRC-0003", Severity::Warning, "leading byte-order mark stripped from source file");
        Catalog { entries }
    }

    pub fn message_for(&self, code: &str) -> Option<&'static str> {
        self.entries.get(code).map(|(_, t)| *t)
    }

    pub fn severity_for(&self, code: &str) -> Option<Severity> {
        self.entries.get(code).map(|(s, _)| *s)
    }

    /// Builds a fully-formatted [`Diagnostic`] for `code`, substituting
    /// `args` into the template. Returns `None` for an unknown code.
    pub fn make(&self, code: &str, span: Option<Span>, args: &HashMap<&str, String>) -> Option<Diagnostic> {
        let (severity, template) = self.entries.get(code)?;
        Some(Diagnostic::new(code, *severity, span, format_message(template, args)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_message_substitutes_known_placeholder() {
        let mut args = HashMap::new();
        args.insert("name", "foo".to_string());
        assert_eq!(format_message("cannot find '{name}'", &args), "cannot find 'foo'");
    }

    #[test]
    fn format_message_leaves_unknown_placeholder_verbatim() {
        let args = HashMap::new();
        assert_eq!(format_message("cannot find '{name}'", &args), "cannot find '{name}'");
    }

    #[test]
    fn stream_is_ok_with_only_warnings() {
        let mut stream = DiagnosticStream::new();
        stream.push(Diagnostic::warning("W-SRC-0003", None, "leading BOM stripped"));
        assert!(stream.is_ok());
    }

    #[test]
    fn stream_is_not_ok_with_an_error() {
        let mut stream = DiagnosticStream::new();
        stream.push(Diagnostic::error("E-UNS-0101", None, "bad"));
        assert!(!stream.is_ok());
    }

    #[test]
    fn catalog_make_known_code() {
        let catalog = Catalog::standard();
        let mut args = HashMap::new();
        args.insert("name", "derive".to_string());
        let diag = catalog.make("E-UNS-0101", None, &args).unwrap();
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.message.contains("derive"));
    }

    #[test]
    fn catalog_make_unknown_code_is_none() {
        let catalog = Catalog::standard();
        assert!(catalog.make("E-NOPE-0000", None, &HashMap::new()).is_none());
    }
}
