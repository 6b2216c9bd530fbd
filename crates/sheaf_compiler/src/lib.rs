//! The compiler adapter: turning an ordered set of resolved stylesheets into CSS.
//!
//! [`StylesheetCompiler`] is the seam between the cache and an actual
//! stylesheet compiler. [`LesscCompiler`] runs the `lessc` program for Less
//! sources. [`GrassCompiler`] compiles Sass with the pure-Rust `grass` crate,
//! routing imports that cannot be found relative to the importing file through
//! an [`ImportResolver`](sheaf_resolve::ImportResolver). [`ByLanguage`] picks
//! between them per request.

#![warn(missing_docs)]

pub mod compiler;
pub mod dispatch;
pub mod error;
pub mod grass_backend;
pub mod lessc_backend;
pub mod overrides;
pub mod request;

mod grass_fs;

pub use compiler::StylesheetCompiler;
pub use error::{CompileError, CompileErrorKind};
pub use dispatch::{ByLanguage, Language};
pub use grass_backend::GrassCompiler;
pub use lessc_backend::LesscCompiler;
pub use request::{CompileRequest, CompiledCss, InputFile};
pub use sheaf_config::ParserOptions;
