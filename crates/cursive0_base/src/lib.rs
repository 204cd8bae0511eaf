//! Source text, interning, spans, and diagnostics shared by every later
//! stage of the Cursive0 semantic core (C1, C2 of the design).

pub mod diagnostic;
pub mod error;
pub mod intern;
pub mod span;
pub mod unicode;

pub use diagnostic::{Catalog, Diagnostic, DiagnosticStream, Severity};
pub use error::{CoreError, CoreResult};
pub use intern::{nfc, IdKey, PathKey};
pub use span::{LineCol, LineIndex, Span};
