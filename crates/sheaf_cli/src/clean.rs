//! `sheaf clean`: prune the compile cache.

use crate::pipeline::{load_settings, orchestrator};
use crate::GlobalArgs;

/// Runs the `sheaf clean` command.
///
/// Removes artifacts that no longer validate, or every artifact with `all`.
pub fn run(all: bool, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = load_settings(global)?;
    let orch = orchestrator(&settings)?;
    let cache = orch.cache();

    let removed = if all { cache.clear()? } else { cache.gc()? };

    if !global.quiet {
        eprintln!(
            "    Removed {removed} cached file(s) from {}",
            cache.store().dir().display()
        );
    }
    Ok(0)
}
