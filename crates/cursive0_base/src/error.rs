//! Infrastructural errors: failures that occur before a diagnostic stream
//! even exists (I/O, manifest decoding). Never used for semantic errors —
//! those are [`crate::diagnostic::Diagnostic`] values appended to a stream,
//! not `Err` results.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Message(String),
}

impl CoreError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        CoreError::Io { path: path.into(), source }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
