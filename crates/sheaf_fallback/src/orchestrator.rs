//! Compile-or-degrade orchestration.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use sheaf_cache::{CompileCache, CompiledOutput};
use sheaf_compiler::overrides::bare_name;
use sheaf_compiler::{CompileError, CompileRequest, ParserOptions, StylesheetCompiler};
use sheaf_config::{ClientConfig, ClientEnv, ConfigError, Settings};
use sheaf_diagnostics::{Logger, Severity};
use sheaf_resolve::{canonical_module_name, AssetReference, AssetResolver, StaticRegistry};

use crate::html;
use crate::payload::{FallbackPayload, FallbackReason};

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Overrides the configured cache setting for this call.
    pub cache: Option<bool>,
    /// Wrap the output in a tag (`<link>`/`<style>`) instead of returning the
    /// bare URL or CSS.
    pub tag: bool,
    /// Variable overrides applied on top of the configured ones.
    pub variables: BTreeMap<String, String>,
    /// Overrides the configured client env for this call.
    pub env: Option<ClientEnv>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cache: None,
            tag: true,
            variables: BTreeMap::new(),
            env: None,
        }
    }
}

/// Terminal state of one render.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The server produced CSS.
    Compiled(CompiledOutput),
    /// The client is left to compile the original sources.
    DegradedFallback(FallbackPayload),
}

impl Outcome {
    /// Returns `true` if the server compiled the stylesheets.
    pub fn is_compiled(&self) -> bool {
        matches!(self, Self::Compiled(_))
    }

    /// The compiled CSS, if any.
    pub fn css(&self) -> Option<&str> {
        match self {
            Self::Compiled(output) => Some(output.css()),
            Self::DegradedFallback(_) => None,
        }
    }

    /// Renders the outcome as markup.
    pub fn to_html(&self) -> String {
        self.render(true)
    }

    /// Renders the outcome. With `tag` false a cached artifact renders as its
    /// URL and inline CSS as the bare stylesheet. The fallback payload is
    /// always markup.
    pub fn render(&self, tag: bool) -> String {
        match self {
            Self::Compiled(CompiledOutput::Cached(artifact)) if tag => {
                html::stylesheet_link(&artifact.url)
            }
            Self::Compiled(CompiledOutput::Cached(artifact)) => artifact.url.clone(),
            Self::Compiled(CompiledOutput::Inline { css }) if tag => html::style_block(css),
            Self::Compiled(CompiledOutput::Inline { css }) => css.clone(),
            Self::DegradedFallback(payload) => payload.to_html(),
        }
    }
}

/// Runs resolution and compilation, and degrades to the client on failure.
///
/// All configuration arrives through [`Settings`]; nothing is read from
/// process-wide state.
pub struct Orchestrator {
    resolver: AssetResolver,
    cache: CompileCache,
    logger: Arc<dyn Logger>,
    debug: bool,
    cache_enabled: bool,
    parser: ParserOptions,
    variables: BTreeMap<String, String>,
    client: ClientConfig,
    last_error: Mutex<Option<String>>,
}

impl Orchestrator {
    /// Builds the resolver and cache described by `settings`.
    ///
    /// Fails if two configured module names canonicalize to the same module.
    pub fn new(
        settings: &Settings,
        compiler: Arc<dyn StylesheetCompiler>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, ConfigError> {
        let mut registry = StaticRegistry::new();
        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        for (name, module) in &settings.modules {
            let canonical = canonical_module_name(name);
            if let Some(first) = seen.insert(canonical.clone(), name) {
                return Err(ConfigError::ModuleCollision {
                    first: first.to_string(),
                    second: name.clone(),
                    canonical,
                });
            }
            registry.register(name, module.root.clone(), module.url.clone());
        }

        Ok(Self {
            resolver: AssetResolver::new(&settings.asset_root, &settings.base_url, registry),
            cache: CompileCache::from_settings(&settings.cache, compiler, Arc::clone(&logger)),
            logger,
            debug: settings.debug,
            cache_enabled: settings.cache.enabled,
            parser: settings.parser.clone(),
            variables: settings.variables.clone(),
            client: settings.client.clone(),
            last_error: Mutex::new(None),
        })
    }

    /// The asset resolver.
    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// The compile cache.
    pub fn cache(&self) -> &CompileCache {
        &self.cache
    }

    /// The message of the most recent failure, if any render failed.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Compiles `refs` as one stylesheet, or produces the client-side fallback.
    ///
    /// An empty `refs` list compiles to empty inline CSS. In the development
    /// env, sources the client compiler cannot handle are still compiled on
    /// the server.
    pub fn render<S: AsRef<str>>(&self, refs: &[S], options: &RenderOptions) -> Outcome {
        let env = options.env.unwrap_or(self.client.env);
        if env == ClientEnv::Development {
            if refs.iter().all(|r| self.client.compiles(r.as_ref())) {
                tracing::debug!("client env is development; skipping server compilation");
                return Outcome::DegradedFallback(self.fallback(
                    refs,
                    FallbackReason::Development,
                    ClientEnv::Development,
                ));
            }
            tracing::debug!("client compiler cannot handle these sources; compiling on the server");
        }

        match self.compile(refs, options) {
            Ok(output) => Outcome::Compiled(output),
            Err(err) => {
                let message = err.to_string();
                self.logger.write(Severity::Error, &message);
                *self
                    .last_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(message);

                let env = if self.debug {
                    ClientEnv::Development
                } else {
                    ClientEnv::Production
                };
                Outcome::DegradedFallback(self.fallback(refs, FallbackReason::CompileFailed, env))
            }
        }
    }

    /// Renders straight to markup, honouring `options.tag`.
    pub fn render_html<S: AsRef<str>>(&self, refs: &[S], options: &RenderOptions) -> String {
        self.render(refs, options).render(options.tag)
    }

    fn compile<S: AsRef<str>>(
        &self,
        refs: &[S],
        options: &RenderOptions,
    ) -> Result<CompiledOutput, CompileError> {
        if refs.is_empty() {
            return Ok(CompiledOutput::Inline { css: String::new() });
        }

        let sources = refs
            .iter()
            .map(|r| self.resolver.resolve_str(r.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let request = CompileRequest::new(sources)
            .with_overrides(merge_variables(&self.variables, &options.variables))
            .with_options(self.parser.clone());

        let use_cache = options.cache.unwrap_or(self.cache_enabled);
        self.cache.get_or_compile(&request, &self.resolver, use_cache)
    }

    /// Public URLs of the original sources; unresolvable ones are passed
    /// through as written.
    fn fallback<S: AsRef<str>>(
        &self,
        refs: &[S],
        reason: FallbackReason,
        env: ClientEnv,
    ) -> FallbackPayload {
        let sources = refs
            .iter()
            .map(|r| match self.resolver.resolve_str(r.as_ref()) {
                Ok(asset) => asset.public_url(),
                Err(_) => AssetReference::parse(r.as_ref()).to_string(),
            })
            .collect();
        FallbackPayload::new(reason, sources, &self.client, env)
    }
}

/// Per-call variables win over configured ones; `$x`, `@x` and `x` name the
/// same variable.
fn merge_variables(
    configured: &BTreeMap<String, String>,
    extra: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for (name, value) in configured.iter().chain(extra) {
        merged.insert(bare_name(name).to_string(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheaf_cache::{CachedArtifact, Fingerprint};

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn per_call_variables_win() {
        let merged = merge_variables(
            &vars(&[("primary", "red"), ("gap", "1px")]),
            &vars(&[("$primary", "blue")]),
        );
        assert_eq!(merged, vars(&[("gap", "1px"), ("primary", "blue")]));
    }

    #[test]
    fn render_options_default_to_tagged() {
        let options = RenderOptions::default();
        assert!(options.tag);
        assert!(options.cache.is_none());
    }

    #[test]
    fn inline_rendering() {
        let outcome = Outcome::Compiled(CompiledOutput::Inline {
            css: ".a{color:red}".into(),
        });
        assert_eq!(outcome.to_html(), "<style>.a{color:red}</style>");
        assert_eq!(outcome.render(false), ".a{color:red}");
        assert_eq!(outcome.css(), Some(".a{color:red}"));
    }

    #[test]
    fn cached_rendering() {
        let fingerprint = Fingerprint::compute(&CompileRequest::new(Vec::new()), "x").unwrap();
        let outcome = Outcome::Compiled(CompiledOutput::Cached(CachedArtifact {
            fingerprint,
            path: "/site/webroot/css/sheaf_x.css".into(),
            url: "/css/sheaf_x.css".into(),
            css: ".a{}".into(),
            created_at: 0,
        }));
        assert_eq!(outcome.to_html(), r#"<link rel="stylesheet" href="/css/sheaf_x.css">"#);
        assert_eq!(outcome.render(false), "/css/sheaf_x.css");
        assert!(outcome.is_compiled());
    }
}
