//! # cursive0-cli
//!
//! The driver binary for the Cursive0 bootstrap compiler's semantic core:
//! loads a project manifest, discovers an assembly's modules, and reports
//! diagnostics (§6). Parsing, type-checked codegen, and the evaluator live
//! outside this crate, per the corpus's own external-collaborator framing
//! for the lexer/parser surface.

pub mod cli;
pub mod pipeline;
