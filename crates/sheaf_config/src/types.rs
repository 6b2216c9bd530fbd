//! Configuration types deserialized from `sheaf.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The top-level configuration parsed from `sheaf.toml`.
///
/// Every section is optional; an empty file yields a caching, compressing,
/// non-debug setup rooted at `webroot/`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SheafConfig {
    /// Site-wide settings (debug flag, primary asset root, base URL).
    #[serde(default)]
    pub site: SiteConfig,
    /// Compile cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Options handed to the stylesheet compiler.
    #[serde(default)]
    pub parser: ParserConfig,
    /// Variable overrides applied after every source has been parsed.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Named modules with their own asset roots.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
    /// Client-side compiler used when server compilation fails.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Site-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Development mode. Enables source maps by default and lets the
    /// fallback payload switch the client compiler to development mode.
    pub debug: bool,
    /// Primary asset root, relative to the project directory.
    pub asset_root: String,
    /// Public URL of the primary asset root.
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            debug: false,
            asset_root: "webroot".to_string(),
            base_url: "/".to_string(),
        }
    }
}

/// Compile cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether compiled output is persisted and served by reference.
    pub enabled: bool,
    /// Cache directory, relative to the project directory.
    pub dir: String,
    /// Public URL prefix under which the cache directory is served.
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "webroot/css".to_string(),
            url: "/css".to_string(),
        }
    }
}

/// Stylesheet compiler options as written in the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Produce compressed output.
    pub compress: bool,
    /// Emit source maps. When omitted, follows [`SiteConfig::debug`].
    pub source_map: Option<bool>,
    /// Extra directories searched for imports, relative to the project directory.
    pub load_paths: Vec<String>,
    /// The `lessc` executable used for `.less` sources. A bare name is looked
    /// up on `PATH`; anything containing a separator is relative to the
    /// project directory.
    pub lessc: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            compress: true,
            source_map: None,
            load_paths: Vec::new(),
            lessc: "lessc".to_string(),
        }
    }
}

/// A module (plugin) with its own asset root.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleConfig {
    /// Asset root of the module, relative to the project directory.
    pub root: String,
    /// Public URL prefix. Defaults to `/<module name>`.
    #[serde(default)]
    pub url: Option<String>,
}

/// Client-side compiler settings for the degraded fallback.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL of the client-side compiler script.
    pub script: String,
    /// Client environment. `development` skips server compilation entirely.
    pub env: ClientEnv,
    /// Extra options serialized into the client configuration blob.
    pub options: BTreeMap<String, serde_json::Value>,
    /// Source extensions the client compiler understands. Requests with any
    /// other source are never handed to it.
    pub extensions: Vec<String>,
}

impl ClientConfig {
    /// Whether the client compiler can compile `path`.
    pub fn compiles(&self, path: &str) -> bool {
        let file = path.rsplit('/').next().unwrap_or(path);
        match file.rsplit_once('.') {
            Some((_, ext)) => self
                .extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            script: "/js/less.min.js".to_string(),
            env: ClientEnv::Production,
            options: BTreeMap::new(),
            extensions: vec!["less".to_string()],
        }
    }
}

/// Environment flag understood by the client-side compiler.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientEnv {
    /// Errors are rendered on the page.
    Development,
    /// Errors stay in the browser console (default).
    #[default]
    Production,
}

impl ClientEnv {
    /// The string value written into the client configuration blob.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientEnv::Development => "development",
            ClientEnv::Production => "production",
        }
    }
}

impl fmt::Display for ClientEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
