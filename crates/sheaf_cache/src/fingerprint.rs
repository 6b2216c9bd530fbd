//! Request fingerprints.

use std::fmt;

use sheaf_common::{ContentHash, ContentHasher};
use sheaf_compiler::{CompileError, CompileErrorKind, CompileRequest};

/// Bumped whenever the set of fingerprinted inputs changes.
const FINGERPRINT_FORMAT: &[u8] = b"sheaf-fingerprint/1";

/// Deterministic digest of everything a compile depends on.
///
/// Covers the compiler identity, each source's canonical path and content in
/// request order, the serialized parser options, and the variable overrides.
/// Files reached through imports are not part of the fingerprint; they are
/// recorded per artifact and checked on every hit.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(ContentHash);

impl Fingerprint {
    /// Fingerprints `request` as compiled by the compiler named `compiler_id`.
    ///
    /// Fails with [`CompileErrorKind::Io`] when a source cannot be read.
    pub fn compute(request: &CompileRequest, compiler_id: &str) -> Result<Self, CompileError> {
        let mut hasher = ContentHasher::new();
        hasher
            .field(FINGERPRINT_FORMAT)
            .field(compiler_id.as_bytes())
            .field(env!("CARGO_PKG_VERSION").as_bytes());

        hasher.field(&(request.sources.len() as u64).to_le_bytes());
        for source in &request.sources {
            let content = std::fs::read(&source.absolute_path).map_err(|e| {
                CompileError::new(
                    CompileErrorKind::Io,
                    format!("cannot read {}: {e}", source.absolute_path.display()),
                    source.reference.clone(),
                )
            })?;
            hasher
                .field(source.absolute_path.to_string_lossy().as_bytes())
                .hash(&ContentHash::from_bytes(&content));
        }

        let options = serde_json::to_vec(&request.parser_options).map_err(|e| {
            CompileError::new(
                CompileErrorKind::Io,
                format!("cannot serialize parser options: {e}"),
                request.primary_reference(),
            )
        })?;
        hasher.field(&options);

        hasher.field(&(request.variable_overrides.len() as u64).to_le_bytes());
        for (name, value) in &request.variable_overrides {
            hasher.field(name.as_bytes()).field(value.as_bytes());
        }

        Ok(Self(hasher.finish()))
    }

    /// The storage key: lowercase hex.
    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.key()[..12])
    }
}
