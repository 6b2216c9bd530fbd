//! `sheaf compile`: render stylesheets through the cache.
//!
//! Prints the markup a page would embed: a `<link>` to the cached file, an
//! inline `<style>` when caching is off, or the client-side fallback block
//! when compilation failed.

use sheaf_cache::CompiledOutput;
use sheaf_fallback::{FallbackReason, Outcome, RenderOptions};

use crate::pipeline::{load_settings, orchestrator};
use crate::{CompileArgs, GlobalArgs};

/// Exit code when the server could not compile and the fallback was printed.
pub const EXIT_DEGRADED: i32 = 2;

/// Runs the `sheaf compile` command.
///
/// Returns 0 when the stylesheets compiled (or the client env is
/// `development`), and [`EXIT_DEGRADED`] when the fallback was emitted.
pub fn run(args: &CompileArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = load_settings(global)?;
    let orch = orchestrator(&settings)?;

    if !global.quiet {
        eprintln!("   Compiling {} stylesheet(s)", args.refs.len());
    }

    let options = render_options(args);
    let outcome = orch.render(&args.refs, &options);
    println!("{}", outcome.render(options.tag));
    if global.verbose && !global.quiet {
        eprintln!("{}", describe(&outcome));
    }

    Ok(match outcome {
        Outcome::DegradedFallback(payload) if payload.reason == FallbackReason::CompileFailed => {
            if !global.quiet {
                if let Some(error) = orch.last_error() {
                    eprintln!("warning: fell back to client-side compilation: {error}");
                }
            }
            EXIT_DEGRADED
        }
        _ => 0,
    })
}

/// Where the output of a render ended up.
fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Compiled(CompiledOutput::Cached(artifact)) => format!(
            "      Cached {} ({})",
            artifact.path.display(),
            artifact.fingerprint
        ),
        Outcome::Compiled(CompiledOutput::Inline { css }) => {
            format!("      Inline {} byte(s) of CSS", css.len())
        }
        Outcome::DegradedFallback(payload) if payload.client_compiles => format!(
            "    Fallback {} source(s) handed to {}",
            payload.sources.len(),
            payload.client_script
        ),
        Outcome::DegradedFallback(payload) => format!(
            "    Fallback {} source(s) the client cannot compile; nothing emitted",
            payload.sources.len()
        ),
    }
}

fn render_options(args: &CompileArgs) -> RenderOptions {
    RenderOptions {
        cache: args.no_cache.then_some(false),
        tag: !args.raw,
        variables: args.vars.iter().cloned().collect(),
        env: args.env.map(Into::into),
    }
}
