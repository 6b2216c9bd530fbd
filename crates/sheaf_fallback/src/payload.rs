//! The degraded response: load the original sources with a client-side compiler.

use serde_json::{Map, Value};
use sheaf_config::{ClientConfig, ClientEnv};

use crate::html;

/// Why the client compiles instead of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The client env is `development`: server compilation is skipped on purpose.
    Development,
    /// Resolution or compilation failed on the server.
    CompileFailed,
}

/// Everything the client needs to compile the sources itself.
///
/// Never carries compiled CSS or error details. In production the config blob
/// says `"env": "production"`, which keeps the client compiler from printing
/// errors into the page.
///
/// The client compiler only understands the extensions listed in
/// [`ClientConfig::extensions`]. When any source falls outside them the
/// payload renders to nothing rather than feed it a stylesheet it cannot
/// compile.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPayload {
    /// Why this payload was produced.
    pub reason: FallbackReason,
    /// Public URLs of the original sources, in request order.
    pub sources: Vec<String>,
    /// Options handed to the client compiler.
    pub config: Map<String, Value>,
    /// URL of the client compiler script.
    pub client_script: String,
    /// Whether the client compiler can handle every source.
    pub client_compiles: bool,
}

impl FallbackPayload {
    /// Builds a payload for `sources` from the client settings.
    ///
    /// `env` overrides any `env` key in the configured options.
    pub fn new(
        reason: FallbackReason,
        sources: Vec<String>,
        client: &ClientConfig,
        env: ClientEnv,
    ) -> Self {
        let mut config: Map<String, Value> = client
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        config.insert("env".to_string(), Value::String(env.as_str().to_string()));
        let client_compiles = sources.iter().all(|href| client.compiles(href));

        Self {
            reason,
            sources,
            config,
            client_script: client.script.clone(),
            client_compiles,
        }
    }

    /// The env the client compiler runs in.
    pub fn env(&self) -> Option<&str> {
        self.config.get("env").and_then(Value::as_str)
    }

    /// The config blob as JSON.
    pub fn config_json(&self) -> String {
        Value::Object(self.config.clone()).to_string()
    }

    /// One client stylesheet link per source, the config assignment, then the
    /// compiler script. Empty when the client cannot compile the sources.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if !self.client_compiles {
            return out;
        }
        for href in &self.sources {
            out.push_str(&html::client_stylesheet_link(href));
            out.push('\n');
        }
        out.push_str(&html::script_block(&format!("less = {};", self.config_json())));
        out.push('\n');
        out.push_str(&html::script_src(&self.client_script));
        out
    }
}
