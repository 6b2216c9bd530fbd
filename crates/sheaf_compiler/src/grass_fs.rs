//! `grass::Fs` adapter that routes unresolved imports through the asset resolver.

use std::cell::RefCell;
use std::fmt::Debug;
use std::io;
use std::path::{Component, Path, PathBuf};

use sheaf_resolve::ImportResolver;

use crate::overrides::OverrideSet;
use crate::request::InputFile;

/// Virtual load path under which module assets are exposed to grass.
///
/// grass appends the import string to every load path, so an import of
/// `blog/mixins` that fails relative lookup is looked up as
/// `/__sheaf_modules__/blog/mixins.scss`, which this adapter hands to the
/// [`ImportResolver`].
pub(crate) const MODULE_MOUNT: &str = "/__sheaf_modules__";

/// Filesystem view used for a single compile.
///
/// Serves real files, maps the module mount onto the resolver, applies
/// variable-override rewrites to everything it serves, and records which
/// files were read and which top-level source was loaded last.
pub(crate) struct ModuleFs<'a> {
    resolver: &'a dyn ImportResolver,
    overrides: &'a OverrideSet,
    sources: &'a [PathBuf],
    reads: RefCell<Vec<InputFile>>,
    current_source: RefCell<Option<usize>>,
}

impl<'a> ModuleFs<'a> {
    pub(crate) fn new(
        resolver: &'a dyn ImportResolver,
        overrides: &'a OverrideSet,
        sources: &'a [PathBuf],
    ) -> Self {
        Self {
            resolver,
            overrides,
            sources,
            reads: RefCell::new(Vec::new()),
            current_source: RefCell::new(None),
        }
    }

    /// Every file served so far, sorted by path.
    ///
    /// A file read more than once keeps the hash of its first read.
    pub(crate) fn dependencies(&self) -> Vec<InputFile> {
        let mut deps = self.reads.borrow().clone();
        deps.sort_by(|a, b| a.path.cmp(&b.path));
        deps.dedup_by(|later, first| later.path == first.path);
        deps
    }

    /// Index of the most recently loaded top-level source.
    pub(crate) fn current_source(&self) -> Option<usize> {
        *self.current_source.borrow()
    }

    /// Maps a requested path onto a real file, consulting the resolver for the mount.
    fn locate(&self, path: &Path) -> Option<PathBuf> {
        match path.strip_prefix(MODULE_MOUNT) {
            Ok(rel) => {
                let import = mount_relative(rel)?;
                self.resolver
                    .resolve_import(&import)
                    .map(|asset| asset.absolute_path)
            }
            Err(_) => Some(path.to_path_buf()),
        }
    }
}

impl Debug for ModuleFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleFs")
            .field("resolver", &"<ImportResolver>")
            .field("sources", &self.sources.len())
            .field("reads", &self.reads.borrow().len())
            .finish()
    }
}

impl grass::Fs for ModuleFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        if path.starts_with(MODULE_MOUNT) {
            return false;
        }
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.locate(path).is_some_and(|real| real.is_file())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let real = self.locate(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not provided by any module", path.display()),
            )
        })?;
        let bytes = std::fs::read(&real)?;
        let canonical = real.canonicalize().unwrap_or(real);

        if let Some(index) = self.sources.iter().position(|s| *s == canonical) {
            *self.current_source.borrow_mut() = Some(index);
        }
        self.reads.borrow_mut().push(InputFile::new(canonical, &bytes));

        if self.overrides.is_empty() {
            return Ok(bytes);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Ok(self.overrides.rewrite(&text).into_owned().into_bytes()),
            Err(e) => Ok(e.into_bytes()),
        }
    }
}

/// Turns a path below the mount back into a forward-slash import string.
///
/// `..` is folded lexically so partials can import their siblings, but it
/// never removes the leading module segment. Symlinks that leave the module
/// are caught by the resolver's root check.
fn mount_relative(rel: &Path) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir if parts.len() > 1 => {
                parts.pop();
            }
            _ => return None,
        }
    }
    if parts.len() < 2 {
        None
    } else {
        Some(parts.join("/"))
    }
}
