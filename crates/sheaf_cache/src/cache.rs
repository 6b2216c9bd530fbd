//! The compile cache.
//!
//! `get_or_compile` is the single entry point used by the orchestrator:
//! fingerprint the request, serve a valid stored artifact, or compile and
//! persist. Compile errors are returned unchanged. A failure to persist is
//! logged and the compiled CSS is returned inline instead.
//!
//! Artifact URLs are content-addressed: recompiling a fingerprint after an
//! imported file changed yields a new URL rather than new bytes at the old one.

use std::path::PathBuf;
use std::sync::Arc;

use sheaf_compiler::{CompileError, CompileRequest, StylesheetCompiler};
use sheaf_config::CacheSettings;
use sheaf_diagnostics::{Logger, Severity};
use sheaf_resolve::ImportResolver;

use crate::artifact::{ArtifactStore, StoredArtifact};
use crate::deps::Dependency;
use crate::error::CacheError;
use crate::fingerprint::Fingerprint;
use crate::lock::{CompileLock, InProcessLock};

/// A compiled stylesheet that lives in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    /// Fingerprint of the request that produced it.
    pub fingerprint: Fingerprint,
    /// Path of the CSS file.
    pub path: PathBuf,
    /// Public URL of the CSS file.
    pub url: String,
    /// The stylesheet contents.
    pub css: String,
    /// Seconds since the Unix epoch when it was written.
    pub created_at: u64,
}

/// Result of [`CompileCache::get_or_compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledOutput {
    /// CSS that is not backed by a file: caching was off or the write failed.
    Inline {
        /// The stylesheet.
        css: String,
    },
    /// CSS stored in the cache directory.
    Cached(CachedArtifact),
}

impl CompiledOutput {
    /// The stylesheet text.
    pub fn css(&self) -> &str {
        match self {
            Self::Inline { css } => css,
            Self::Cached(artifact) => &artifact.css,
        }
    }

    /// Returns `true` for [`CompiledOutput::Cached`].
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Fingerprint-keyed cache in front of a [`StylesheetCompiler`].
///
/// Concurrent calls for the same fingerprint are serialised through a
/// [`CompileLock`], so within a process each fingerprint is compiled at most
/// once while its artifact stays valid.
pub struct CompileCache {
    store: ArtifactStore,
    public_url: String,
    compiler: Arc<dyn StylesheetCompiler>,
    logger: Arc<dyn Logger>,
    lock: Box<dyn CompileLock>,
}

impl CompileCache {
    /// Creates a cache storing artifacts in `dir`, served under `public_url`.
    pub fn new(
        dir: impl Into<PathBuf>,
        public_url: impl Into<String>,
        compiler: Arc<dyn StylesheetCompiler>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            store: ArtifactStore::new(dir),
            public_url: public_url.into(),
            compiler,
            logger,
            lock: Box::new(InProcessLock::new()),
        }
    }

    /// Creates a cache from resolved settings.
    pub fn from_settings(
        settings: &CacheSettings,
        compiler: Arc<dyn StylesheetCompiler>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self::new(&settings.dir, &settings.url, compiler, logger)
    }

    /// Replaces the lock used to serialise compiles of one fingerprint.
    pub fn with_lock(mut self, lock: impl CompileLock + 'static) -> Self {
        self.lock = Box::new(lock);
        self
    }

    /// The underlying artifact store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Fingerprints `request` for this cache's compiler.
    pub fn fingerprint(&self, request: &CompileRequest) -> Result<Fingerprint, CompileError> {
        Fingerprint::compute(request, self.compiler.id())
    }

    /// Returns the compiled CSS for `request`.
    ///
    /// With `use_cache` false the compiler always runs and the cache directory
    /// is never touched.
    pub fn get_or_compile(
        &self,
        request: &CompileRequest,
        resolver: &dyn ImportResolver,
        use_cache: bool,
    ) -> Result<CompiledOutput, CompileError> {
        if !use_cache {
            let compiled = self.compiler.compile(request, resolver)?;
            return Ok(CompiledOutput::Inline { css: compiled.css });
        }

        let fingerprint = self.fingerprint(request)?;
        if let Some(hit) = self.lookup(&fingerprint) {
            return Ok(hit);
        }

        let mut result = None;
        self.lock.run_exclusive(&fingerprint, &mut || {
            result = Some(self.fill(request, resolver, &fingerprint));
        });
        match result {
            Some(result) => result,
            None => self.fill(request, resolver, &fingerprint),
        }
    }

    /// Removes artifacts that no longer validate, stylesheets superseded by a
    /// newer compile of the same fingerprint, and leftover temporary files.
    pub fn gc(&self) -> Result<usize, CacheError> {
        let mut removed = self.store.remove_temp_files()?;
        for key in self.store.keys()? {
            match self.store.load(&key) {
                Ok(current) => {
                    removed += self.store.remove_superseded(&key, &current.file_name)?;
                }
                Err(reason) => {
                    tracing::debug!("collecting artifact {key}: {reason}");
                    if self.store.remove(&key)? {
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }

    /// Removes every artifact.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = self.store.remove_temp_files()?;
        for key in self.store.keys()? {
            if self.store.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn lookup(&self, fingerprint: &Fingerprint) -> Option<CompiledOutput> {
        let stored = self.store.read(&fingerprint.key())?;
        tracing::debug!(%fingerprint, "stylesheet cache hit");
        Some(CompiledOutput::Cached(self.artifact(*fingerprint, stored)))
    }

    /// Compiles and persists under the fingerprint lock, unless another caller
    /// filled the slot while this one waited.
    fn fill(
        &self,
        request: &CompileRequest,
        resolver: &dyn ImportResolver,
        fingerprint: &Fingerprint,
    ) -> Result<CompiledOutput, CompileError> {
        if let Some(hit) = self.lookup(fingerprint) {
            return Ok(hit);
        }

        tracing::debug!(%fingerprint, "stylesheet cache miss");
        let compiled = self.compiler.compile(request, resolver)?;
        tracing::info!(
            %fingerprint,
            sources = request.sources.len(),
            dependencies = compiled.dependencies.len(),
            "compiled stylesheet"
        );

        let dependencies = compiled
            .dependencies
            .into_iter()
            .map(Dependency::from)
            .collect();
        match self
            .store
            .write(&fingerprint.key(), &compiled.css, dependencies)
        {
            Ok(stored) => Ok(CompiledOutput::Cached(self.artifact(*fingerprint, stored))),
            Err(e) => {
                let message = format!("could not cache compiled stylesheet {fingerprint}: {e}");
                tracing::warn!("{message}");
                self.logger.write(Severity::Warning, &message);
                Ok(CompiledOutput::Inline { css: compiled.css })
            }
        }
    }

    fn artifact(&self, fingerprint: Fingerprint, stored: StoredArtifact) -> CachedArtifact {
        CachedArtifact {
            fingerprint,
            url: join_url(&self.public_url, &stored.file_name),
            path: stored.css_path,
            css: stored.css,
            created_at: stored.created_at,
        }
    }
}

fn join_url(base: &str, file: &str) -> String {
    format!("{}/{file}", base.trim_end_matches('/'))
}
