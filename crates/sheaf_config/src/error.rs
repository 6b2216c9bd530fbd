//! Errors raised while loading `sheaf.toml` or turning it into settings.

use std::io;

/// Why a project configuration was rejected.
///
/// Loading stops at the first problem found; nothing is partially applied.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `sheaf.toml` could not be read.
    #[error("failed to read {file}: {0}", file = crate::CONFIG_FILE)]
    Read(#[from] io::Error),

    /// The file is not valid TOML, or a value has the wrong type.
    #[error("failed to parse {file}: {0}", file = crate::CONFIG_FILE)]
    Parse(String),

    /// A setting that may not be blank is, e.g. `cache.dir` while caching is
    /// enabled or `parser.lessc`.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A `[modules.<name>]` table whose name is unusable in a reference.
    #[error("invalid module name '{0}'")]
    InvalidModule(String),

    /// Two configured modules that references cannot tell apart, like
    /// `my-blog` and `my_blog`.
    #[error("modules '{first}' and '{second}' both resolve as '{canonical}'")]
    ModuleCollision {
        /// The module registered first.
        first: String,
        /// The module that would replace it.
        second: String,
        /// The name both canonicalize to.
        canonical: String,
    },

    /// A `[variables]` key that is not a Less or Sass identifier.
    #[error("invalid variable name '{0}'")]
    InvalidVariable(String),
}
