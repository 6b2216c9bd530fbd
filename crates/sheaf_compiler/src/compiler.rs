//! The compiler seam.

use sheaf_resolve::ImportResolver;

use crate::error::CompileError;
use crate::request::{CompileRequest, CompiledCss};

/// A stylesheet compiler.
///
/// Implementations parse `request.sources` in order, look up imports that are
/// not next to the importing file in the module roots (`resolver` maps them),
/// and apply the request's variable overrides after all sources are parsed so
/// they override rather than seed the sources' own values. Any failure aborts
/// the whole request: partial output is never returned. Every file read is
/// reported with the hash of the bytes the compile actually saw.
pub trait StylesheetCompiler: Send + Sync {
    /// Stable identifier of the backend, folded into cache fingerprints.
    fn id(&self) -> &str;

    /// Compiles the request.
    fn compile(
        &self,
        request: &CompileRequest,
        resolver: &dyn ImportResolver,
    ) -> Result<CompiledCss, CompileError>;
}
