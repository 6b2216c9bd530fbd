//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SheafConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "sheaf.toml";

/// Loads and validates a `sheaf.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<SheafConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `sheaf.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SheafConfig, ConfigError> {
    let config: SheafConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &SheafConfig) -> Result<(), ConfigError> {
    if config.client.script.trim().is_empty() {
        return Err(ConfigError::MissingField("client.script".to_string()));
    }
    if config.cache.enabled && config.cache.dir.trim().is_empty() {
        return Err(ConfigError::MissingField("cache.dir".to_string()));
    }
    if config.parser.lessc.trim().is_empty() {
        return Err(ConfigError::MissingField("parser.lessc".to_string()));
    }
    if config.site.asset_root.trim().is_empty() {
        return Err(ConfigError::MissingField("site.asset_root".to_string()));
    }
    for (name, module) in &config.modules {
        let usable = name.chars().any(|c| c.is_ascii_alphanumeric())
            && !name.contains([':', '/', '\\']);
        if !usable {
            return Err(ConfigError::InvalidModule(name.clone()));
        }
        if module.root.trim().is_empty() {
            return Err(ConfigError::MissingField(format!("modules.{name}.root")));
        }
    }
    for name in config.variables.keys() {
        let bare = name.trim_start_matches(['$', '@']);
        if bare.is_empty()
            || !bare
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidVariable(name.clone()));
        }
    }
    Ok(())
}
