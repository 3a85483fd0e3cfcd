//! Command-line interface definition using clap.

use clap::{Args, Parser, Subcommand};

use tscheck_core::TaskConfig;

/// Build version string with git hash and build date.
fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const BUILD_DATE: &str = env!("BUILD_DATE");

    // Format: "0.1.0 (abc1234, 2026-01-29)"
    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} ({}, {})", VERSION, GIT_HASH, BUILD_DATE))
}

/// tscheck - run TypeScript compiler checks with deduplication and a concurrency limit
#[derive(Parser, Debug)]
#[command(name = "tscheck")]
#[command(author, version = version_string(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Checker executable
    #[arg(long, env = "TSCHECK_TSC", default_value = "tsc", global = true)]
    pub tsc: String,

    /// Maximum number of one-shot checks running at once
    #[arg(long, env = "TSCHECK_MAX_CONCURRENCY", global = true)]
    pub max_concurrency: Option<usize>,

    /// Print reports as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check projects once and exit
    Check(CheckArgs),

    /// Keep checking projects on every change until interrupted
    Watch(CheckArgs),
}

/// Options shared by `check` and `watch`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Project config files; each one is a separate task
    #[arg(short, long = "project", default_value = "tsconfig.json")]
    pub projects: Vec<String>,

    /// Emit output files instead of type-checking only
    #[arg(long)]
    pub emit: bool,

    /// Enable incremental build info
    #[arg(long)]
    pub incremental: bool,

    /// Spawn a separate process even for identical submissions
    #[arg(long)]
    pub no_dedup: bool,

    /// Extra checker arguments (after `--`)
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl CheckArgs {
    /// Builds one task configuration per project.
    pub fn task_configs(&self, executable: &str, watch: bool) -> Vec<TaskConfig> {
        self.projects
            .iter()
            .map(|project| {
                TaskConfig::new(executable, project.as_str())
                    .with_emit(self.emit)
                    .with_incremental(self.incremental)
                    .with_dedup(!self.no_dedup)
                    .with_args(self.args.iter().cloned())
                    .with_watch(watch)
            })
            .collect()
    }
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_check_defaults() {
        let cli = Cli::parse_from(["tscheck", "check"]);
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.projects, vec!["tsconfig.json"]);
                assert!(!args.emit);
                assert!(args.args.is_empty());
            }
            _ => panic!("Expected Check command"),
        }
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_parse_multiple_projects() {
        let cli = Cli::parse_from([
            "tscheck", "check", "-p", "a/tsconfig.json", "--project", "b/tsconfig.json", "--json",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.projects, vec!["a/tsconfig.json", "b/tsconfig.json"]);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_watch_with_raw_args() {
        let cli = Cli::parse_from(["tscheck", "watch", "--incremental", "--", "--strict", "-w"]);
        let Commands::Watch(args) = cli.command else {
            panic!("Expected Watch command");
        };

        let configs = args.task_configs("tsc", true);
        assert_eq!(configs.len(), 1);
        assert_eq!(
            configs[0].argv(),
            vec!["tsc", "--noEmit", "--watch", "--incremental", "-p", "tsconfig.json", "--strict"]
        );
    }

    #[test]
    fn test_check_ignores_watch_in_raw_args() {
        let cli = Cli::parse_from(["tscheck", "check", "--", "--watch", "--strict"]);
        let Commands::Check(args) = cli.command else {
            panic!("Expected Check command");
        };

        let configs = args.task_configs("tsc", false);
        assert!(!configs[0].watch());
        assert_eq!(
            configs[0].argv(),
            vec!["tsc", "--noEmit", "-p", "tsconfig.json", "--strict"]
        );
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::parse_from([
            "tscheck", "check", "--tsc", "/opt/tsc", "--max-concurrency", "2", "-vv",
        ]);
        assert_eq!(cli.tsc, "/opt/tsc");
        assert_eq!(cli.max_concurrency, Some(2));
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }
}
