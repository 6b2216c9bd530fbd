//! Stylesheet compilation with the external `lessc` program.
//!
//! Sources are compiled as one unit through an entry file written to a
//! scratch directory:
//!
//! ```text
//! @import (less) "/abs/webroot/css/base.less";
//! @import (less) "/abs/mods/blog/theme.less";
//! ```
//!
//! Variable overrides go through `--modify-var`, which lessc applies after
//! every source is parsed. Each module root is linked into the scratch
//! directory under its name and the directory joins the include path, so an
//! import of `blog/mixins` that is not found next to the importing file lands
//! in the blog module.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

use sheaf_config::Settings;
use sheaf_resolve::{canonical_module_name, ImportResolver};

use crate::compiler::StylesheetCompiler;
use crate::error::{CompileError, CompileErrorKind};
use crate::overrides::bare_name;
use crate::request::{CompileRequest, CompiledCss, InputFile};

/// Name of the generated entry file inside the scratch directory.
const ENTRY_FILE: &str = "sheaf-entry.less";

/// Output file handed to `--depends`, kept inside the scratch directory.
const DEPENDS_TARGET: &str = "sheaf-depends.css";

/// [`StylesheetCompiler`] that runs `lessc`.
#[derive(Debug)]
pub struct LesscCompiler {
    program: PathBuf,
    modules: BTreeMap<String, PathBuf>,
    id: OnceLock<String>,
}

impl LesscCompiler {
    /// Creates a compiler that runs `program` with no modules linked.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            modules: BTreeMap::new(),
            id: OnceLock::new(),
        }
    }

    /// Creates a compiler for the configured program and modules.
    pub fn from_settings(settings: &Settings) -> Self {
        settings
            .modules
            .iter()
            .fold(Self::new(&settings.lessc), |compiler, (name, module)| {
                compiler.with_module(name.as_str(), &module.root)
            })
    }

    /// Makes `root` importable as `<name>/...`.
    pub fn with_module(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.modules.insert(name.into(), root.into());
        self
    }

    /// The program this compiler runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The version reported by `lessc --version`, or `None` when it cannot run.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.program).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .split_whitespace()
            .find(|word| word.starts_with(|c: char| c.is_ascii_digit()))
            .map(str::to_string)
    }

    /// Arguments shared by the dependency scan and the compile.
    fn common_args(
        &self,
        request: &CompileRequest,
        scratch: &Path,
    ) -> Result<Vec<OsString>, CompileError> {
        let mut args: Vec<OsString> = vec!["--no-color".into()];

        let mut include = request.parser_options.load_paths.clone();
        include.push(scratch.to_path_buf());
        let joined = std::env::join_paths(&include).map_err(|e| {
            CompileError::new(
                CompileErrorKind::Io,
                format!("invalid include path: {e}"),
                request.primary_reference(),
            )
        })?;
        let mut include_arg = OsString::from("--include-path=");
        include_arg.push(joined);
        args.push(include_arg);

        for (name, value) in &request.variable_overrides {
            let name = bare_name(name);
            if name.is_empty() {
                continue;
            }
            args.push(format!("--modify-var={name}={}", value.trim()).into());
        }
        Ok(args)
    }

    /// Links every module root into `scratch`, under its configured and canonical names.
    fn link_modules(&self, scratch: &Path) -> io::Result<()> {
        for (name, root) in &self.modules {
            let canonical = canonical_module_name(name);
            for link in [name.as_str(), canonical.as_str()] {
                if !is_single_segment(link) {
                    tracing::debug!(module = %name, "module name is not linkable; skipped");
                    continue;
                }
                let path = scratch.join(link);
                if path.exists() {
                    continue;
                }
                link_dir(root, &path)?;
            }
        }
        Ok(())
    }

    fn run(&self, args: &[OsString]) -> io::Result<Output> {
        Command::new(&self.program).args(args).output()
    }
}

impl StylesheetCompiler for LesscCompiler {
    fn id(&self) -> &str {
        self.id.get_or_init(|| match self.version() {
            Some(version) => format!("lessc-{version}"),
            None => "lessc".to_string(),
        })
    }

    /// Module imports are found through the linked module roots; `resolver`
    /// is not consulted.
    fn compile(
        &self,
        request: &CompileRequest,
        _resolver: &dyn ImportResolver,
    ) -> Result<CompiledCss, CompileError> {
        let io_error = |what: &str, e: io::Error| {
            CompileError::new(
                CompileErrorKind::Io,
                format!("{what}: {e}"),
                request.primary_reference(),
            )
        };

        let scratch = tempfile::Builder::new()
            .prefix("sheaf-lessc-")
            .tempdir()
            .map_err(|e| io_error("failed to create scratch directory", e))?;
        self.link_modules(scratch.path())
            .map_err(|e| io_error("failed to link module roots", e))?;

        let entry = scratch.path().join(ENTRY_FILE);
        let sources: Vec<PathBuf> = request
            .sources
            .iter()
            .map(|s| s.absolute_path.clone())
            .collect();
        std::fs::write(&entry, entry_stylesheet(&sources))
            .map_err(|e| io_error("failed to write entry stylesheet", e))?;

        let common = self.common_args(request, scratch.path())?;
        let program = self.program.display().to_string();

        // Inputs are hashed before the compile runs. An edit racing the
        // compile leaves a stale hash behind, which forces a recompile later.
        let mut scan = common.clone();
        scan.extend([
            OsString::from("--depends"),
            entry.clone().into(),
            scratch.path().join(DEPENDS_TARGET).into(),
        ]);
        let output = self
            .run(&scan)
            .map_err(|e| io_error(&format!("failed to run {program}"), e))?;
        if !output.status.success() {
            return Err(failure(request, &output));
        }
        let dependencies = hash_inputs(&parse_depends(&String::from_utf8_lossy(&output.stdout)));

        let mut compile = common;
        if request.parser_options.compress {
            compile.push("--compress".into());
        }
        if request.parser_options.source_map {
            compile.push("--source-map-map-inline".into());
        }
        compile.push(entry.into());
        let output = self
            .run(&compile)
            .map_err(|e| io_error(&format!("failed to run {program}"), e))?;
        if !output.status.success() {
            return Err(failure(request, &output));
        }

        let css = String::from_utf8(output.stdout).map_err(|e| {
            CompileError::new(
                CompileErrorKind::Parse,
                format!("{program} produced invalid UTF-8: {e}"),
                request.primary_reference(),
            )
        })?;
        Ok(CompiledCss { css, dependencies })
    }
}

/// One forced-Less import per source, in request order.
fn entry_stylesheet(sources: &[PathBuf]) -> String {
    let mut entry = String::new();
    for path in sources {
        let quoted = path
            .to_string_lossy()
            .replace('\\', "/")
            .replace('"', "\\\"");
        entry.push_str(&format!("@import (less) \"{quoted}\";\n"));
    }
    entry
}

/// Reads the file list out of `lessc --depends` output (`target: a.less b.less`).
///
/// Paths containing spaces cannot be told apart from separators and are
/// split.
fn parse_depends(stdout: &str) -> Vec<PathBuf> {
    let list = stdout.split_once(": ").map(|(_, rest)| rest).unwrap_or("");
    list.split_whitespace().map(PathBuf::from).collect()
}

/// Hashes each input under its canonical path, sorted and deduplicated.
///
/// Files that can no longer be read are left out.
fn hash_inputs(paths: &[PathBuf]) -> Vec<InputFile> {
    let mut inputs: Vec<InputFile> = paths
        .iter()
        .filter_map(|path| {
            let canonical = path.canonicalize().ok()?;
            let bytes = std::fs::read(&canonical).ok()?;
            Some(InputFile::new(canonical, &bytes))
        })
        .collect();
    inputs.sort_by(|a, b| a.path.cmp(&b.path));
    inputs.dedup_by(|later, first| later.path == first.path);
    inputs
}

/// Turns a failed run into a compile error attributed to the source named in it.
fn failure(request: &CompileRequest, output: &Output) -> CompileError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        format!("lessc exited with {}", output.status)
    } else {
        stderr
    };
    let kind = if message.contains("FileError") {
        CompileErrorKind::Import
    } else {
        CompileErrorKind::Parse
    };
    let reference = request
        .sources
        .iter()
        .find(|s| message.contains(&*s.absolute_path.to_string_lossy()))
        .map(|s| s.reference.clone())
        .unwrap_or_else(|| request.primary_reference());
    CompileError::new(kind, message, reference)
}

fn is_single_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(unix)]
fn link_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn link_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn link_dir(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "module roots cannot be linked on this platform",
    ))
}
