//! Module registry: where each named module keeps its assets.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::reference::canonical_module_name;

/// Filesystem root and public URL prefix of one module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleRoot {
    /// Asset root on disk.
    pub root: PathBuf,
    /// Public URL prefix the root is served under.
    pub url: String,
}

/// Lookup of module asset roots by canonical name.
pub trait ModuleRegistry: Send + Sync {
    /// Returns the root registered for `module`, if any.
    fn lookup(&self, module: &str) -> Option<ModuleRoot>;
}

/// A fixed, in-memory registry.
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    modules: BTreeMap<String, ModuleRoot>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module, returning the root it replaced.
    ///
    /// Names are canonicalized, so `Blog` and `blog` collide.
    pub fn register(
        &mut self,
        name: &str,
        root: impl Into<PathBuf>,
        url: impl Into<String>,
    ) -> Option<ModuleRoot> {
        self.modules.insert(
            canonical_module_name(name),
            ModuleRoot {
                root: root.into(),
                url: url.into(),
            },
        )
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if no module is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleRegistry for StaticRegistry {
    fn lookup(&self, module: &str) -> Option<ModuleRoot> {
        self.modules.get(&canonical_module_name(module)).cloned()
    }
}
