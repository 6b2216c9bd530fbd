//! The asset resolver.
//!
//! Precedence when several readings of a reference are possible:
//!
//! 1. An explicit `module:path` reference only ever resolves inside that module.
//! 2. A bare reference that exists under the primary asset root resolves there.
//! 3. Otherwise a bare reference with two or more segments is read in
//!    path-style notation: its first segment names the module. An unregistered
//!    module yields [`ResolutionFailure::ModuleNotFound`].
//! 4. A single-segment bare reference that does not exist is
//!    [`ResolutionFailure::FileNotFound`].

use std::io;
use std::path::{Path, PathBuf};

use crate::error::ResolutionFailure;
use crate::reference::AssetReference;
use crate::registry::ModuleRegistry;

/// A reference mapped onto the filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// The normalized reference. Path-style module references come back in
    /// qualified form.
    pub reference: AssetReference,
    /// Canonical absolute path (`.`/`..` and symlinks resolved).
    pub absolute_path: PathBuf,
    /// Public URL of the directory containing the file, used to rewrite
    /// relative `url(...)` references.
    pub public_base_url: String,
}

impl ResolvedAsset {
    /// Public URL of the file itself.
    pub fn public_url(&self) -> String {
        let file = self
            .reference
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let base = self.public_base_url.trim_end_matches('/');
        format!("{base}/{file}")
    }
}

/// Fallback lookup for imports that were not found relative to the importing file.
pub trait ImportResolver: Send + Sync {
    /// Resolves an import path, or returns `None` to report it as missing.
    fn resolve_import(&self, import: &str) -> Option<ResolvedAsset>;
}

/// Maps stylesheet references to canonical files and public base URLs.
///
/// Holds no persistent state: every call is a pure function of the registry
/// and the filesystem.
pub struct AssetResolver {
    primary_root: PathBuf,
    base_url: String,
    registry: Box<dyn ModuleRegistry>,
}

impl AssetResolver {
    /// Creates a resolver for the given primary root and module registry.
    pub fn new(
        primary_root: impl Into<PathBuf>,
        base_url: impl Into<String>,
        registry: impl ModuleRegistry + 'static,
    ) -> Self {
        Self {
            primary_root: primary_root.into(),
            base_url: base_url.into(),
            registry: Box::new(registry),
        }
    }

    /// The primary asset root.
    pub fn primary_root(&self) -> &Path {
        &self.primary_root
    }

    /// Parses and resolves a raw reference string.
    pub fn resolve_str(&self, raw: &str) -> Result<ResolvedAsset, ResolutionFailure> {
        self.resolve(&AssetReference::parse(raw))
    }

    /// Resolves a parsed reference.
    pub fn resolve(&self, reference: &AssetReference) -> Result<ResolvedAsset, ResolutionFailure> {
        match reference {
            AssetReference::ModuleQualified { .. } => self.resolve_in_module(reference),
            AssetReference::Bare { path } => {
                let candidate = self.primary_root.join(path);
                if candidate.exists() {
                    return locate(
                        reference,
                        &self.primary_root,
                        &candidate,
                        &self.base_url,
                    );
                }
                match reference.split_path_style() {
                    Some(qualified) => self.resolve_in_module(&qualified),
                    None => Err(ResolutionFailure::FileNotFound {
                        reference: reference.clone(),
                        path: candidate,
                    }),
                }
            }
        }
    }

    fn resolve_in_module(
        &self,
        reference: &AssetReference,
    ) -> Result<ResolvedAsset, ResolutionFailure> {
        let module = reference.module().unwrap_or_default();
        let root = self
            .registry
            .lookup(module)
            .ok_or_else(|| ResolutionFailure::ModuleNotFound {
                reference: reference.clone(),
                module: module.to_string(),
            })?;
        let candidate = root.root.join(reference.path());
        locate(reference, &root.root, &candidate, &root.url)
    }
}

impl ImportResolver for AssetResolver {
    fn resolve_import(&self, import: &str) -> Option<ResolvedAsset> {
        let reference = AssetReference::parse(import);
        let qualified = match reference {
            AssetReference::ModuleQualified { .. } => reference,
            AssetReference::Bare { .. } => reference.split_path_style()?,
        };
        match self.resolve_in_module(&qualified) {
            Ok(asset) => Some(asset),
            Err(err) => {
                tracing::debug!(import, error = %err, "import not resolvable through modules");
                None
            }
        }
    }
}

/// Canonicalizes `candidate`, checks it stays within `root`, and derives its base URL.
fn locate(
    reference: &AssetReference,
    root: &Path,
    candidate: &Path,
    url_prefix: &str,
) -> Result<ResolvedAsset, ResolutionFailure> {
    let not_found = |_: io::Error| ResolutionFailure::FileNotFound {
        reference: reference.clone(),
        path: candidate.to_path_buf(),
    };
    let absolute_path = candidate.canonicalize().map_err(not_found)?;
    if !absolute_path.is_file() {
        return Err(ResolutionFailure::FileNotFound {
            reference: reference.clone(),
            path: candidate.to_path_buf(),
        });
    }

    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    if !absolute_path.starts_with(&canonical_root) {
        return Err(ResolutionFailure::OutsideRoot {
            reference: reference.clone(),
            root: canonical_root,
        });
    }

    Ok(ResolvedAsset {
        reference: reference.clone(),
        absolute_path,
        public_base_url: join_url(url_prefix, reference.dirname()),
    })
}

/// Joins a URL prefix and a relative directory with exactly one slash.
pub(crate) fn join_url(prefix: &str, dir: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let dir = dir.trim_matches('/');
    match (prefix.is_empty(), dir.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{dir}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{dir}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionKind;
    use crate::registry::StaticRegistry;

    struct Site {
        dir: tempfile::TempDir,
    }

    impl Site {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join("webroot/css")).unwrap();
            std::fs::create_dir_all(dir.path().join("mods/blog/webroot/css")).unwrap();
            std::fs::write(dir.path().join("webroot/styles.less"), "a{}").unwrap();
            std::fs::write(dir.path().join("webroot/css/site.less"), "b{}").unwrap();
            std::fs::write(dir.path().join("mods/blog/webroot/theme.less"), "c{}").unwrap();
            std::fs::write(dir.path().join("mods/blog/webroot/css/post.less"), "d{}").unwrap();
            std::fs::write(dir.path().join("secret.less"), "e{}").unwrap();
            Self { dir }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel).canonicalize().unwrap()
        }

        fn resolver(&self) -> AssetResolver {
            let mut registry = StaticRegistry::new();
            registry.register("blog", self.dir.path().join("mods/blog/webroot"), "/blog");
            AssetResolver::new(self.dir.path().join("webroot"), "/", registry)
        }
    }

    #[test]
    fn bare_reference_under_primary_root() {
        let site = Site::new();
        let asset = site.resolver().resolve_str("css/site.less").unwrap();
        assert_eq!(asset.absolute_path, site.path("webroot/css/site.less"));
        assert_eq!(asset.public_base_url, "/css");
    }

    #[test]
    fn bare_reference_at_root_has_root_url() {
        let site = Site::new();
        let asset = site.resolver().resolve_str("styles.less").unwrap();
        assert_eq!(asset.public_base_url, "/");
        assert_eq!(asset.public_url(), "/styles.less");
    }

    #[test]
    fn path_style_module_reference() {
        let site = Site::new();
        let asset = site.resolver().resolve_str("blog/theme.less").unwrap();
        assert_eq!(asset.absolute_path, site.path("mods/blog/webroot/theme.less"));
        assert_eq!(asset.public_base_url, "/blog");
        assert_eq!(asset.reference, AssetReference::qualified("blog", "theme.less"));
    }

    #[test]
    fn path_style_subdirectory_extends_base_url() {
        let site = Site::new();
        let asset = site.resolver().resolve_str("blog/css/post.less").unwrap();
        assert_eq!(asset.public_base_url, "/blog/css");
        assert_eq!(asset.public_url(), "/blog/css/post.less");
    }

    #[test]
    fn explicit_and_path_style_resolve_identically() {
        let site = Site::new();
        let resolver = site.resolver();
        let a = resolver.resolve_str("Blog:theme.less").unwrap();
        let b = resolver.resolve_str("blog/theme.less").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unregistered_module_is_module_not_found() {
        let site = Site::new();
        let err = site.resolver().resolve_str("ghost/x.less").unwrap_err();
        assert_eq!(err.kind(), ResolutionKind::ModuleNotFound);

        let err = site.resolver().resolve_str("ghost:x.less").unwrap_err();
        assert_eq!(err.kind(), ResolutionKind::ModuleNotFound);
    }

    #[test]
    fn missing_single_segment_is_file_not_found() {
        let site = Site::new();
        let err = site.resolver().resolve_str("missing.less").unwrap_err();
        assert_eq!(err.kind(), ResolutionKind::FileNotFound);
    }

    #[test]
    fn missing_file_in_registered_module() {
        let site = Site::new();
        let err = site.resolver().resolve_str("blog:nope.less").unwrap_err();
        assert_eq!(err.kind(), ResolutionKind::FileNotFound);
    }

    #[test]
    fn dot_segments_are_canonicalized() {
        let site = Site::new();
        let asset = site.resolver().resolve_str("css/../styles.less").unwrap();
        assert_eq!(asset.absolute_path, site.path("webroot/styles.less"));
    }

    #[test]
    fn escaping_the_root_is_rejected() {
        let site = Site::new();
        let err = site.resolver().resolve_str("../secret.less").unwrap_err();
        assert_eq!(err.kind(), ResolutionKind::OutsideRoot);
    }

    #[test]
    fn directories_are_not_files() {
        let site = Site::new();
        let err = site.resolver().resolve_str("css").unwrap_err();
        assert_eq!(err.kind(), ResolutionKind::FileNotFound);
    }

    #[test]
    fn import_resolver_only_consults_modules() {
        let site = Site::new();
        let resolver = site.resolver();
        assert!(resolver.resolve_import("blog/css/post.less").is_some());
        assert!(resolver.resolve_import("blog:theme.less").is_some());
        // Primary-root files are found by the compiler's relative lookup, not here.
        assert!(resolver.resolve_import("css/site.less").is_none());
        assert!(resolver.resolve_import("ghost/x.less").is_none());
    }

    #[test]
    fn join_url_slashes() {
        assert_eq!(join_url("/", ""), "/");
        assert_eq!(join_url("/", "css"), "/css");
        assert_eq!(join_url("/blog/", "css/"), "/blog/css");
        assert_eq!(join_url("https://example.com/", "css"), "https://example.com/css");
        assert_eq!(join_url("", "css"), "/css");
    }
}
