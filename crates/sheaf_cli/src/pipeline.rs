//! Shared helpers for CLI commands: project discovery, settings, and the
//! orchestrator every command works through.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sheaf_compiler::{ByLanguage, GrassCompiler, LesscCompiler};
use sheaf_config::{load_config, load_config_from_str, resolve_settings, Settings, CONFIG_FILE};
use sheaf_diagnostics::TracingLogger;
use sheaf_fallback::Orchestrator;

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `sheaf.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Loads the project settings selected by the global flags.
///
/// `--config` may name the file itself or its directory. Without it the
/// project root is found by walking up from the current directory.
pub fn load_settings(global: &GlobalArgs) -> Result<Settings, Box<dyn std::error::Error>> {
    let (project_dir, config) = match global.config.as_deref().map(PathBuf::from) {
        Some(path) if path.is_file() => {
            let content = std::fs::read_to_string(&path)?;
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (dir, load_config_from_str(&content)?)
        }
        Some(dir) => {
            let config = load_config(&dir)?;
            (dir, config)
        }
        None => {
            let dir = find_project_root(&std::env::current_dir()?)?;
            let config = load_config(&dir)?;
            (dir, config)
        }
    };
    tracing::debug!(project = %project_dir.display(), "loaded configuration");
    Ok(resolve_settings(&config, &project_dir))
}

/// Builds the orchestrator for `settings`: `lessc` for Less sources, grass
/// for Sass.
pub fn orchestrator(settings: &Settings) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let compiler = ByLanguage::new(
        Arc::new(LesscCompiler::from_settings(settings)),
        Arc::new(GrassCompiler::new()),
    );
    Ok(Orchestrator::new(
        settings,
        Arc::new(compiler),
        Arc::new(TracingLogger),
    )?)
}

/// Parses a `NAME=VALUE` variable override.
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.trim_start_matches(['$', '@']).is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(config: Option<&Path>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: config.map(|p| p.to_string_lossy().into_owned()),
        }
    }

    #[test]
    fn finds_root_from_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        let nested = dir.path().join("webroot/css");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_project_root(dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn config_flag_accepts_file_or_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[site]\nasset_root = \"public\"\n").unwrap();

        let from_dir = load_settings(&global(Some(dir.path()))).unwrap();
        let from_file = load_settings(&global(Some(&dir.path().join(CONFIG_FILE)))).unwrap();
        assert_eq!(from_dir.asset_root, dir.path().join("public"));
        assert_eq!(from_file.asset_root, from_dir.asset_root);
    }

    #[test]
    fn parse_var_accepts_sigils_and_spaces() {
        assert_eq!(
            parse_var("$primary = #333").unwrap(),
            ("$primary".to_string(), "#333".to_string())
        );
        assert_eq!(
            parse_var("font=Helvetica, Arial").unwrap(),
            ("font".to_string(), "Helvetica, Arial".to_string())
        );
    }

    #[test]
    fn parse_var_rejects_malformed() {
        assert!(parse_var("primary").is_err());
        assert!(parse_var("=red").is_err());
        assert!(parse_var("@=red").is_err());
    }

    #[test]
    fn less_sources_go_to_lessc_and_sass_to_grass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[parser]\nlessc = \"./bin/no-such-lessc\"\n",
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("webroot")).unwrap();
        std::fs::write(dir.path().join("webroot/site.less"), ".a { color: red; }\n").unwrap();
        std::fs::write(dir.path().join("webroot/site.scss"), ".a { color: red; }\n").unwrap();

        let settings = load_settings(&global(Some(dir.path()))).unwrap();
        assert_eq!(settings.lessc, dir.path().join("bin/no-such-lessc"));
        let orch = orchestrator(&settings).unwrap();
        let options = sheaf_fallback::RenderOptions::default();

        let less = orch.render(&["site.less"], &options);
        assert!(less.css().is_none());
        let error = orch.last_error().unwrap().to_string();
        assert!(error.contains("no-such-lessc"), "{error}");

        let sass = orch.render(&["site.scss"], &options);
        assert!(sass.css().unwrap().contains("color:red"));
    }
}
