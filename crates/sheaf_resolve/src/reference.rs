//! Parsing of stylesheet references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates a module name from the path inside that module (`blog:theme.less`).
pub const MODULE_DELIMITER: char = ':';

/// A logical stylesheet reference as written by a caller.
///
/// Immutable once parsed. Module names are always stored in canonical form
/// (see [`canonical_module_name`]).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetReference {
    /// A path under the primary asset root, or a path-style module reference
    /// that has not been normalized yet.
    Bare {
        /// Path relative to the asset root, without a leading slash.
        path: String,
    },
    /// A path under a named module's asset root.
    ModuleQualified {
        /// Canonical module name.
        module: String,
        /// Path relative to the module root, without a leading slash.
        path: String,
    },
}

impl AssetReference {
    /// Parses a raw reference.
    ///
    /// A `module:path` prefix produces [`ModuleQualified`](Self::ModuleQualified);
    /// anything else is [`Bare`](Self::Bare). Query strings and leading `./` or
    /// `/` are stripped. A prefix followed by `//` is a URL scheme, not a module.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = raw.split_once('?').map_or(raw, |(path, _)| path);

        if let Some((prefix, rest)) = raw.split_once(MODULE_DELIMITER) {
            let is_module = !prefix.is_empty()
                && !prefix.contains('/')
                && !rest.starts_with("//")
                && !canonical_module_name(prefix).is_empty();
            if is_module {
                return AssetReference::ModuleQualified {
                    module: canonical_module_name(prefix),
                    path: normalize_path(rest),
                };
            }
        }

        AssetReference::Bare {
            path: normalize_path(raw),
        }
    }

    /// Creates a module-qualified reference, canonicalizing the module name.
    pub fn qualified(module: &str, path: &str) -> Self {
        AssetReference::ModuleQualified {
            module: canonical_module_name(module),
            path: normalize_path(path),
        }
    }

    /// Returns the module name for qualified references.
    pub fn module(&self) -> Option<&str> {
        match self {
            AssetReference::Bare { .. } => None,
            AssetReference::ModuleQualified { module, .. } => Some(module),
        }
    }

    /// Returns the path relative to the owning asset root.
    pub fn path(&self) -> &str {
        match self {
            AssetReference::Bare { path } | AssetReference::ModuleQualified { path, .. } => path,
        }
    }

    /// Interprets a bare reference in path-style module notation.
    ///
    /// `blog/css/theme.less` becomes `blog:css/theme.less`. Returns `None` for
    /// qualified references and for bare paths with a single segment.
    pub fn split_path_style(&self) -> Option<AssetReference> {
        let AssetReference::Bare { path } = self else {
            return None;
        };
        let (first, rest) = path.split_once('/')?;
        let module = canonical_module_name(first);
        if module.is_empty() || rest.is_empty() {
            return None;
        }
        Some(AssetReference::ModuleQualified {
            module,
            path: normalize_path(rest),
        })
    }

    /// Directory part of [`path`](Self::path), empty for files at the root.
    pub fn dirname(&self) -> &str {
        self.path().rsplit_once('/').map_or("", |(dir, _)| dir)
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetReference::Bare { path } => write!(f, "{path}"),
            AssetReference::ModuleQualified { module, path } => {
                write!(f, "{module}{MODULE_DELIMITER}{path}")
            }
        }
    }
}

/// Canonical identity of a module name.
///
/// Lowercases ASCII letters and drops `_`/`-` separators, so `BlogPosts`,
/// `blog_posts` and `blog-posts` all name the same module in either notation.
pub fn canonical_module_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn normalize_path(path: &str) -> String {
    let mut path = path.trim();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.trim_start_matches('/').replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_reference() {
        let r = AssetReference::parse("css/site.less");
        assert_eq!(
            r,
            AssetReference::Bare {
                path: "css/site.less".to_string()
            }
        );
        assert!(r.module().is_none());
    }

    #[test]
    fn leading_slash_and_dot_stripped() {
        assert_eq!(AssetReference::parse("/css/site.less").path(), "css/site.less");
        assert_eq!(AssetReference::parse("./css/site.less").path(), "css/site.less");
    }

    #[test]
    fn query_string_stripped() {
        assert_eq!(AssetReference::parse("site.less?v=3").path(), "site.less");
        assert_eq!(AssetReference::parse("site.less?").path(), "site.less");
    }

    #[test]
    fn explicit_module_reference() {
        let r = AssetReference::parse("Blog:css/theme.less");
        assert_eq!(r.module(), Some("blog"));
        assert_eq!(r.path(), "css/theme.less");
        assert_eq!(r.to_string(), "blog:css/theme.less");
    }

    #[test]
    fn url_scheme_is_not_a_module() {
        let r = AssetReference::parse("https://cdn.example.com/x.less");
        assert!(r.module().is_none());
    }

    #[test]
    fn path_style_split() {
        let r = AssetReference::parse("blog/theme.less");
        let split = r.split_path_style().unwrap();
        assert_eq!(split, AssetReference::qualified("blog", "theme.less"));
    }

    #[test]
    fn single_segment_has_no_path_style_form() {
        assert!(AssetReference::parse("styles.less")
            .split_path_style()
            .is_none());
        assert!(AssetReference::parse("blog:theme.less")
            .split_path_style()
            .is_none());
    }

    #[test]
    fn both_notations_share_identity() {
        let explicit = AssetReference::parse("Blog_Posts:theme.less");
        let path_style = AssetReference::parse("blog-posts/theme.less")
            .split_path_style()
            .unwrap();
        assert_eq!(explicit, path_style);
    }

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_module_name("BlogPosts"), "blogposts");
        assert_eq!(canonical_module_name("blog_posts"), "blogposts");
        assert_eq!(canonical_module_name(" blog-posts "), "blogposts");
    }

    #[test]
    fn dirname() {
        assert_eq!(AssetReference::parse("blog:css/sub/x.less").dirname(), "css/sub");
        assert_eq!(AssetReference::parse("x.less").dirname(), "");
    }

    #[test]
    fn serde_keeps_variant() {
        let reference = AssetReference::qualified("blog", "theme.less");
        let json = serde_json::to_string(&reference).unwrap();
        let back: AssetReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reference);
    }
}
