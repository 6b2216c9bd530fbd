//! Content-addressed compile cache for stylesheets.
//!
//! A [`CompileCache`] fingerprints each [`CompileRequest`](sheaf_compiler::CompileRequest)
//! from its source contents, options and variable overrides, serves a stored
//! artifact when one with the same fingerprint is still valid, and otherwise
//! compiles and persists the result with write-to-temp-then-rename.

#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod deps;
pub mod error;
pub mod fingerprint;
pub mod lock;

pub use artifact::{ArtifactMeta, ArtifactStore, StoredArtifact};
pub use cache::{CachedArtifact, CompileCache, CompiledOutput};
pub use deps::Dependency;
pub use error::CacheError;
pub use fingerprint::Fingerprint;
pub use lock::{CompileLock, InProcessLock};
