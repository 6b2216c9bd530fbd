//! Stylesheet compilation with the grass crate.
//!
//! grass is a pure-Rust Sass compiler, so sources must be `.scss` or `.sass`
//! files. Sources are compiled as one unit through a generated entry
//! stylesheet:
//!
//! ```text
//! $primary: red;                         // variable overrides
//! @import "/abs/webroot/css/base.scss";  // sources, in request order
//! @import "/abs/mods/blog/theme.scss";
//! ```

use std::path::{Path, PathBuf};

use grass::{Options, OutputStyle};
use sheaf_resolve::ImportResolver;

use crate::compiler::StylesheetCompiler;
use crate::error::{CompileError, CompileErrorKind};
use crate::grass_fs::{ModuleFs, MODULE_MOUNT};
use crate::overrides::OverrideSet;
use crate::request::{CompileRequest, CompiledCss};

/// grass reports unresolvable imports with this message.
const MISSING_IMPORT: &str = "Can't find stylesheet to import";

/// Extensions grass can compile as stylesheet sources.
const SASS_EXTENSIONS: [&str; 2] = ["scss", "sass"];

/// [`StylesheetCompiler`] backed by grass.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrassCompiler;

impl GrassCompiler {
    /// Creates the compiler.
    pub fn new() -> Self {
        Self
    }
}

impl StylesheetCompiler for GrassCompiler {
    fn id(&self) -> &str {
        "grass-0.13"
    }

    fn compile(
        &self,
        request: &CompileRequest,
        resolver: &dyn ImportResolver,
    ) -> Result<CompiledCss, CompileError> {
        for source in &request.sources {
            if !has_sass_extension(&source.absolute_path) {
                return Err(CompileError::new(
                    CompileErrorKind::Parse,
                    format!(
                        "{} is not a Sass stylesheet (expected .scss or .sass)",
                        source.absolute_path.display()
                    ),
                    source.reference.clone(),
                ));
            }
        }

        let overrides = OverrideSet::new(&request.variable_overrides).map_err(|e| {
            CompileError::new(
                CompileErrorKind::Parse,
                format!("invalid variable override: {e}"),
                request.primary_reference(),
            )
        })?;

        if request.parser_options.source_map {
            tracing::debug!("grass does not emit source maps; compiling without one");
        }

        let source_paths: Vec<PathBuf> = request
            .sources
            .iter()
            .map(|s| s.absolute_path.clone())
            .collect();
        let entry = entry_stylesheet(&overrides, &source_paths);

        let fs = ModuleFs::new(resolver, &overrides, &source_paths);
        let mut load_paths = request.parser_options.load_paths.clone();
        load_paths.push(PathBuf::from(MODULE_MOUNT));

        let style = if request.parser_options.compress {
            OutputStyle::Compressed
        } else {
            OutputStyle::Expanded
        };

        let options = Options::default()
            .fs(&fs)
            .load_paths(&load_paths)
            .style(style);

        match grass::from_string(entry, &options) {
            Ok(css) => Ok(CompiledCss {
                css,
                dependencies: fs.dependencies(),
            }),
            Err(e) => {
                let message = e.to_string();
                let kind = if message.contains(MISSING_IMPORT) {
                    CompileErrorKind::Import
                } else {
                    CompileErrorKind::Parse
                };
                let reference = fs
                    .current_source()
                    .and_then(|i| request.sources.get(i))
                    .map(|s| s.reference.clone())
                    .unwrap_or_else(|| request.primary_reference());
                Err(CompileError::new(kind, message, reference))
            }
        }
    }
}

fn has_sass_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SASS_EXTENSIONS.contains(&e))
}

/// Builds the entry stylesheet: override prelude, then one import per source.
fn entry_stylesheet(overrides: &OverrideSet, sources: &[PathBuf]) -> String {
    let mut entry = overrides.prelude();
    for path in sources {
        let quoted = path
            .to_string_lossy()
            .replace('\\', "/")
            .replace('"', "\\\"");
        entry.push_str(&format!("@import \"{quoted}\";\n"));
    }
    entry
}
