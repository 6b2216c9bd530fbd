//! Parsing and validation of `sheaf.toml` configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`SheafConfig`], then resolves it against the project directory into the
//! explicit [`Settings`] handed to the resolver, cache, and orchestrator.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{
    effective_parser_options, resolve_settings, CacheSettings, ModuleSettings, ParserOptions,
    Settings,
};
pub use types::*;
