//! Compile requests and their output.

use std::collections::BTreeMap;
use std::path::PathBuf;

use sheaf_common::ContentHash;
use sheaf_config::ParserOptions;
use sheaf_resolve::{AssetReference, ResolvedAsset};

/// Everything a compile depends on besides the files themselves.
///
/// The order of `sources` is significant: later sources see definitions made
/// by earlier ones. Variable overrides apply after every source is parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileRequest {
    /// Resolved sources in compile order.
    pub sources: Vec<ResolvedAsset>,
    /// Variable name to replacement value. Names may carry a `$` or `@` sigil.
    pub variable_overrides: BTreeMap<String, String>,
    /// Effective compiler options.
    pub parser_options: ParserOptions,
}

impl CompileRequest {
    /// Creates a request with no overrides and default options.
    pub fn new(sources: Vec<ResolvedAsset>) -> Self {
        Self {
            sources,
            variable_overrides: BTreeMap::new(),
            parser_options: ParserOptions::default(),
        }
    }

    /// Replaces the variable overrides.
    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.variable_overrides = overrides;
        self
    }

    /// Replaces the compiler options.
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.parser_options = options;
        self
    }

    /// The reference errors are attributed to when no better one is known.
    pub fn primary_reference(&self) -> AssetReference {
        self.sources
            .first()
            .map(|s| s.reference.clone())
            .unwrap_or_else(|| AssetReference::Bare {
                path: String::new(),
            })
    }
}

/// A file the compiler read, with the hash of the bytes it actually saw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputFile {
    /// Canonical path.
    pub path: PathBuf,
    /// Hash of the contents as read during the compile.
    pub hash: ContentHash,
}

impl InputFile {
    /// Records `bytes` as the contents read from `path`.
    pub fn new(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            hash: ContentHash::from_bytes(bytes),
        }
    }
}

/// Successful compiler output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledCss {
    /// The generated stylesheet.
    pub css: String,
    /// Every file read while compiling, sources included.
    pub dependencies: Vec<InputFile>,
}
