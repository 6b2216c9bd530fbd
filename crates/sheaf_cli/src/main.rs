//! sheaf: compile stylesheets through the cache from the command line.
//!
//! `sheaf compile` renders one or more stylesheet references the way a page
//! would embed them, `sheaf resolve` shows where a reference points, and
//! `sheaf clean` prunes the compile cache.

#![warn(missing_docs)]

mod clean;
mod compile;
mod pipeline;
mod resolve;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// sheaf: a stylesheet compile cache.
#[derive(Parser, Debug)]
#[command(name = "sheaf", version, about = "Stylesheet compile cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `sheaf.toml` file or the directory containing it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile stylesheets and print the markup that embeds them.
    Compile(CompileArgs),
    /// Show the file and public URL a reference resolves to.
    Resolve {
        /// Stylesheet reference, e.g. `css/site.scss` or `blog:theme.scss`.
        reference: String,
    },
    /// Remove stale cached stylesheets.
    Clean {
        /// Remove every cached stylesheet, not only stale ones.
        #[arg(long)]
        all: bool,
    },
}

/// Arguments for the `sheaf compile` subcommand.
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Stylesheet references, compiled in order as one stylesheet.
    #[arg(required = true)]
    pub refs: Vec<String>,

    /// Compile without reading or writing the cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Variable override applied after all sources (e.g. `--var primary=#333`).
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = pipeline::parse_var)]
    pub vars: Vec<(String, String)>,

    /// Print the bare URL or CSS instead of a tag.
    #[arg(long)]
    pub raw: bool,

    /// Override the configured client env.
    #[arg(long, value_enum)]
    pub env: Option<EnvChoice>,
}

/// Client env selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EnvChoice {
    /// Skip server compilation and let the client compile.
    Development,
    /// Compile on the server.
    Production,
}

impl From<EnvChoice> for sheaf_config::ClientEnv {
    fn from(choice: EnvChoice) -> Self {
        match choice {
            EnvChoice::Development => Self::Development,
            EnvChoice::Production => Self::Production,
        }
    }
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.quiet, cli.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Compile(ref args) => compile::run(args, &global),
        Command::Resolve { ref reference } => resolve::run(reference, &global),
        Command::Clean { all } => clean::run(all, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Log filter used when `RUST_LOG` is not set.
fn default_filter(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "sheaf=error"
    } else if verbose {
        "sheaf=debug"
    } else {
        "sheaf=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_compile_default() {
        let cli = Cli::parse_from(["sheaf", "compile", "styles.scss"]);
        match cli.command {
            Command::Compile(ref args) => {
                assert_eq!(args.refs, vec!["styles.scss"]);
                assert!(!args.no_cache);
                assert!(args.vars.is_empty());
                assert!(!args.raw);
                assert!(args.env.is_none());
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_compile_with_args() {
        let cli = Cli::parse_from([
            "sheaf",
            "compile",
            "css/base.scss",
            "blog:theme.scss",
            "--no-cache",
            "--var",
            "primary=#333",
            "--var",
            "@gap=4px",
            "--raw",
            "--env",
            "development",
        ]);
        match cli.command {
            Command::Compile(ref args) => {
                assert_eq!(args.refs, vec!["css/base.scss", "blog:theme.scss"]);
                assert!(args.no_cache);
                assert_eq!(
                    args.vars,
                    vec![
                        ("primary".to_string(), "#333".to_string()),
                        ("@gap".to_string(), "4px".to_string()),
                    ]
                );
                assert!(args.raw);
                assert_eq!(args.env, Some(EnvChoice::Development));
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn compile_requires_a_reference() {
        assert!(Cli::try_parse_from(["sheaf", "compile"]).is_err());
    }

    #[test]
    fn malformed_var_is_rejected() {
        assert!(Cli::try_parse_from(["sheaf", "compile", "a.scss", "--var", "primary"]).is_err());
    }

    #[test]
    fn parse_resolve() {
        let cli = Cli::parse_from(["sheaf", "resolve", "blog/theme.scss"]);
        match cli.command {
            Command::Resolve { reference } => assert_eq!(reference, "blog/theme.scss"),
            _ => panic!("expected Resolve command"),
        }
    }

    #[test]
    fn parse_clean() {
        let cli = Cli::parse_from(["sheaf", "clean", "--all"]);
        assert!(matches!(cli.command, Command::Clean { all: true }));
        let cli = Cli::parse_from(["sheaf", "clean"]);
        assert!(matches!(cli.command, Command::Clean { all: false }));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["sheaf", "--quiet", "--config", "site/sheaf.toml", "clean"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("site/sheaf.toml"));
    }

    #[test]
    fn filter_follows_flags() {
        assert_eq!(default_filter(false, false), "sheaf=info");
        assert_eq!(default_filter(false, true), "sheaf=debug");
        assert_eq!(default_filter(true, true), "sheaf=error");
    }

    #[test]
    fn env_choice_maps_to_client_env() {
        assert_eq!(
            sheaf_config::ClientEnv::from(EnvChoice::Development),
            sheaf_config::ClientEnv::Development
        );
    }
}
