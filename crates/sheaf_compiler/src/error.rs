//! Error types for compilation.

use std::fmt;

use sheaf_resolve::{AssetReference, ResolutionFailure};

/// Category of a compile failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompileErrorKind {
    /// The stylesheet (or one it imports) is syntactically or semantically invalid.
    Parse,
    /// An import could not be found relative to its file or through the resolver.
    Import,
    /// A source reference could not be resolved before compilation started.
    Resolution,
    /// A source file could not be read.
    Io,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileErrorKind::Parse => write!(f, "parse"),
            CompileErrorKind::Import => write!(f, "import"),
            CompileErrorKind::Resolution => write!(f, "resolution"),
            CompileErrorKind::Io => write!(f, "I/O"),
        }
    }
}

/// A failed compile. Surfaced once per failed call and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error in '{reference}': {message}")]
pub struct CompileError {
    /// What went wrong.
    pub kind: CompileErrorKind,
    /// Compiler-provided detail.
    pub message: String,
    /// The source the failure is attributed to.
    pub reference: AssetReference,
}

impl CompileError {
    /// Creates a new compile error.
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, reference: AssetReference) -> Self {
        Self {
            kind,
            message: message.into(),
            reference,
        }
    }
}

impl From<ResolutionFailure> for CompileError {
    fn from(failure: ResolutionFailure) -> Self {
        Self {
            kind: CompileErrorKind::Resolution,
            message: failure.to_string(),
            reference: failure.reference().clone(),
        }
    }
}
