//! `sheaf resolve`: show where a stylesheet reference points.

use crate::pipeline::{load_settings, orchestrator};
use crate::GlobalArgs;

/// Runs the `sheaf resolve` command. Resolution failures are errors.
pub fn run(reference: &str, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = load_settings(global)?;
    let orch = orchestrator(&settings)?;
    let asset = orch.resolver().resolve_str(reference)?;

    println!("reference: {}", asset.reference);
    println!("path:      {}", asset.absolute_path.display());
    println!("base url:  {}", asset.public_base_url);
    println!("url:       {}", asset.public_url());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheaf_config::CONFIG_FILE;

    fn setup() -> (tempfile::TempDir, GlobalArgs) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("plugins/blog/webroot")).unwrap();
        std::fs::write(dir.path().join("plugins/blog/webroot/theme.scss"), "").unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[modules.blog]\nroot = \"plugins/blog/webroot\"\n",
        )
        .unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(dir.path().to_string_lossy().into_owned()),
        };
        (dir, global)
    }

    #[test]
    fn resolves_module_reference() {
        let (_dir, global) = setup();
        assert_eq!(run("blog/theme.scss", &global).unwrap(), 0);
    }

    #[test]
    fn unknown_module_is_error() {
        let (_dir, global) = setup();
        let err = run("ghost/x.scss", &global).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
