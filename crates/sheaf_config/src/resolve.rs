//! Settings resolution: anchoring configured paths and deriving effective options.

use crate::types::{ClientConfig, SheafConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Effective options handed to the stylesheet compiler.
///
/// Serialized into every fingerprint, so any change here invalidates cached
/// output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParserOptions {
    /// Produce compressed output.
    pub compress: bool,
    /// Emit source maps.
    pub source_map: bool,
    /// Absolute directories searched for imports after relative lookup fails.
    pub load_paths: Vec<PathBuf>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            compress: true,
            source_map: false,
            load_paths: Vec::new(),
        }
    }
}

/// Cache settings with the directory anchored to the project.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Whether caching is enabled by default.
    pub enabled: bool,
    /// Absolute cache directory.
    pub dir: PathBuf,
    /// Public URL prefix for files in `dir`.
    pub url: String,
}

/// A module with its root anchored to the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSettings {
    /// Absolute asset root.
    pub root: PathBuf,
    /// Public URL prefix.
    pub url: String,
}

/// Fully resolved settings passed explicitly into the pipeline components.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Development mode.
    pub debug: bool,
    /// Absolute primary asset root.
    pub asset_root: PathBuf,
    /// Public URL of the primary asset root.
    pub base_url: String,
    /// Cache settings.
    pub cache: CacheSettings,
    /// Effective compiler options.
    pub parser: ParserOptions,
    /// Configured variable overrides.
    pub variables: BTreeMap<String, String>,
    /// Modules keyed by their configured name.
    pub modules: BTreeMap<String, ModuleSettings>,
    /// Client-side compiler settings.
    pub client: ClientConfig,
    /// The `lessc` program, anchored to the project when given as a path.
    pub lessc: PathBuf,
}

/// Computes the compiler options implied by a configuration.
///
/// `source_map` falls back to the site debug flag when the file leaves it
/// unset. Load paths are anchored at `project_dir`.
pub fn effective_parser_options(config: &SheafConfig, project_dir: &Path) -> ParserOptions {
    ParserOptions {
        compress: config.parser.compress,
        source_map: config.parser.source_map.unwrap_or(config.site.debug),
        load_paths: config
            .parser
            .load_paths
            .iter()
            .map(|p| anchor(project_dir, p))
            .collect(),
    }
}

/// Resolves a configuration against the directory that contains it.
pub fn resolve_settings(config: &SheafConfig, project_dir: &Path) -> Settings {
    let modules = config
        .modules
        .iter()
        .map(|(name, module)| {
            let url = module
                .url
                .clone()
                .unwrap_or_else(|| format!("/{}", name.trim_matches('/')));
            (
                name.clone(),
                ModuleSettings {
                    root: anchor(project_dir, &module.root),
                    url,
                },
            )
        })
        .collect();

    Settings {
        debug: config.site.debug,
        asset_root: anchor(project_dir, &config.site.asset_root),
        base_url: config.site.base_url.clone(),
        cache: CacheSettings {
            enabled: config.cache.enabled,
            dir: anchor(project_dir, &config.cache.dir),
            url: config.cache.url.clone(),
        },
        parser: effective_parser_options(config, project_dir),
        variables: config.variables.clone(),
        modules,
        client: config.client.clone(),
        lessc: program(project_dir, &config.parser.lessc),
    }
}

/// A bare program name is left for `PATH` lookup; a path is anchored.
fn program(project_dir: &Path, configured: &str) -> PathBuf {
    if configured.contains(['/', '\\']) {
        anchor(project_dir, configured)
    } else {
        PathBuf::from(configured)
    }
}

/// Joins a configured path onto the project directory unless it is absolute.
fn anchor(project_dir: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}
