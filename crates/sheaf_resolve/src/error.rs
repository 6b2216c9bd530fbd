//! Error types for asset resolution.

use std::fmt;
use std::path::PathBuf;

use crate::reference::AssetReference;

/// Why a reference could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionFailure {
    /// No file exists at the computed location.
    #[error("stylesheet '{reference}' not found at {}", .path.display())]
    FileNotFound {
        /// The reference being resolved.
        reference: AssetReference,
        /// The location that was checked.
        path: PathBuf,
    },

    /// The reference names a module that is not registered.
    #[error("module '{module}' referenced by '{reference}' is not registered")]
    ModuleNotFound {
        /// The reference being resolved.
        reference: AssetReference,
        /// The canonical module name that was looked up.
        module: String,
    },

    /// The file exists but its canonical path leaves the asset root.
    #[error("stylesheet '{reference}' resolves outside its asset root {}", .root.display())]
    OutsideRoot {
        /// The reference being resolved.
        reference: AssetReference,
        /// The asset root the file had to stay within.
        root: PathBuf,
    },
}

/// The kind of a [`ResolutionFailure`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
    /// See [`ResolutionFailure::FileNotFound`].
    FileNotFound,
    /// See [`ResolutionFailure::ModuleNotFound`].
    ModuleNotFound,
    /// See [`ResolutionFailure::OutsideRoot`].
    OutsideRoot,
}

impl ResolutionFailure {
    /// Returns the failure kind.
    pub fn kind(&self) -> ResolutionKind {
        match self {
            ResolutionFailure::FileNotFound { .. } => ResolutionKind::FileNotFound,
            ResolutionFailure::ModuleNotFound { .. } => ResolutionKind::ModuleNotFound,
            ResolutionFailure::OutsideRoot { .. } => ResolutionKind::OutsideRoot,
        }
    }

    /// Returns the reference that failed to resolve.
    pub fn reference(&self) -> &AssetReference {
        match self {
            ResolutionFailure::FileNotFound { reference, .. }
            | ResolutionFailure::ModuleNotFound { reference, .. }
            | ResolutionFailure::OutsideRoot { reference, .. } => reference,
        }
    }
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionKind::FileNotFound => write!(f, "file not found"),
            ResolutionKind::ModuleNotFound => write!(f, "module not found"),
            ResolutionKind::OutsideRoot => write!(f, "outside asset root"),
        }
    }
}
