//! Command handlers for CLI subcommands.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use tscheck_core::{TaskConfig, TaskObservers};
use tscheck_runtime::{Runtime, RuntimeConfig};

use crate::cli::{CheckArgs, Cli, Commands};
use crate::output;

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Exit status when every check passed.
pub const EXIT_OK: i32 = 0;
/// Exit status when a task failed or could not run.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status when diagnostics were reported.
pub const EXIT_DIAGNOSTICS: i32 = 2;

/// Execute a CLI command and return the process exit status.
pub fn execute(cli: &Cli) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match &cli.command {
            Commands::Check(args) => cmd_check(cli, args).await,
            Commands::Watch(args) => cmd_watch(cli, args).await,
        }
    })
}

/// Tallies what the observers saw across all tasks.
#[derive(Debug, Default)]
struct Outcome {
    diagnostics: AtomicUsize,
    failed: AtomicBool,
}

impl Outcome {
    fn exit_status(&self) -> i32 {
        if self.failed.load(Ordering::SeqCst) {
            EXIT_FAILURE
        } else if self.diagnostics.load(Ordering::SeqCst) > 0 {
            EXIT_DIAGNOSTICS
        } else {
            EXIT_OK
        }
    }
}

fn runtime_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_env()?;
    if let Some(max) = cli.max_concurrency {
        config = config.with_max_concurrency(max);
    }
    config.validate()?;
    Ok(config)
}

fn printing_observers(json: bool, outcome: &Arc<Outcome>) -> TaskObservers {
    let on_report = Arc::clone(outcome);
    let on_error = Arc::clone(outcome);

    TaskObservers::new()
        .on_report(move |task, report| {
            // Failed cycles are printed by the error observer.
            if task.error().is_some() {
                return;
            }
            on_report.diagnostics.fetch_add(report.len(), Ordering::SeqCst);
            println!("{}", output::render_report(task, report, json));
        })
        .on_error(move |task, error| {
            on_error.failed.store(true, Ordering::SeqCst);
            let line = output::render_error(task, error, json);
            if json {
                println!("{}", line);
            } else {
                eprintln!("{}", line);
            }
        })
}

fn submit_all(runtime: &mut Runtime, configs: Vec<TaskConfig>, observers: &TaskObservers) -> usize {
    let mut started = 0;
    for config in configs {
        let handle = runtime.submit(config, observers.clone());
        if !handle.lock().is_ended() {
            started += 1;
        }
    }
    started
}

async fn cmd_check(cli: &Cli, args: &CheckArgs) -> Result<i32> {
    let mut runtime = Runtime::new(runtime_config(cli)?)?;
    let outcome = Arc::new(Outcome::default());
    let observers = printing_observers(cli.json, &outcome);

    let configs = args.task_configs(&cli.tsc, false);
    info!(tasks = configs.len(), executable = %cli.tsc, "submitting checks");
    submit_all(&mut runtime, configs, &observers);

    runtime.run_until_idle().await?;
    Ok(outcome.exit_status())
}

async fn cmd_watch(cli: &Cli, args: &CheckArgs) -> Result<i32> {
    let mut runtime = Runtime::new(runtime_config(cli)?)?;
    let outcome = Arc::new(Outcome::default());
    let observers = printing_observers(cli.json, &outcome).on_ended(|task| {
        info!(task_id = %task.id(), project = %task.config().project(), "watch session ended");
    });

    let configs = args.task_configs(&cli.tsc, true);
    if submit_all(&mut runtime, configs, &observers) == 0 {
        return Ok(EXIT_FAILURE);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = runtime.next_event() => {
                runtime.dispatch(event?);
                if runtime.orchestrator().is_idle() {
                    warn!("all watch sessions exited");
                    return Ok(EXIT_FAILURE);
                }
            }
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for interrupt");
                }
                let stopped = runtime.stop_all();
                info!(stopped, "interrupted, watch sessions stopped");
                return Ok(EXIT_OK);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use clap::Parser;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-tsc");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn run_check(script: &Path) -> i32 {
        let tsc = script.to_string_lossy().into_owned();
        let cli = Cli::parse_from(["tscheck", "--tsc", tsc.as_str(), "check", "-p", "a.json", "-p", "b.json"]);
        execute(&cli).unwrap()
    }

    #[test]
    fn test_check_clean_project() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "exit 0");
        assert_eq!(run_check(&script), EXIT_OK);
    }

    #[test]
    fn test_check_with_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "echo \"src/a.ts(1,1): error TS1005: ';' expected.\"\nexit 2",
        );
        assert_eq!(run_check(&script), EXIT_DIAGNOSTICS);
    }

    #[test]
    fn test_check_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "echo \"error TS5058: The specified path does not exist: 'a.json'.\"\nexit 1",
        );
        assert_eq!(run_check(&script), EXIT_FAILURE);
    }

    #[test]
    fn test_check_missing_executable() {
        let cli = Cli::parse_from(["tscheck", "--tsc", "/nonexistent/dir/tsc", "check"]);
        assert_eq!(execute(&cli).unwrap(), EXIT_FAILURE);
    }

    #[test]
    fn test_watch_exits_when_sessions_die() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo 'Watching for file changes.'\nexit 1");
        let tsc = script.to_string_lossy().into_owned();
        let cli = Cli::parse_from(["tscheck", "--tsc", tsc.as_str(), "watch"]);

        assert_eq!(execute(&cli).unwrap(), EXIT_FAILURE);
    }
}
