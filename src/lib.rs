// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod resolve;
pub mod types;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigSection;
use crate::engine::{ExecutionPlan, GroupResult, Scheduler, Watcher};
use crate::errors::Result;
use crate::exec::{ProcessExecutor, RunOptions};
use crate::registry::Registry;
use crate::resolve::{resolve, ResolvedTarget};
use crate::types::{ExecMode, OutputMode};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config discovery and loading
/// - registry validation
/// - action resolution
/// - scheduler / watcher over the process executor
/// - Ctrl-C handling
///
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let loaded = config::load(args.config.as_deref())?;
    let registry = Registry::build(&loaded.raw, &loaded.root)?;

    if args.list {
        print_modules(&registry);
        return Ok(0);
    }

    let action = args.action.as_deref().unwrap_or_default();
    let mode = args.mode();
    let target = resolve(&registry, action, args.module.as_deref())?;

    if args.dry_run {
        let plan = ExecutionPlan::build(&target, mode, &args.args)?;
        print_dry_run(&plan);
        return Ok(0);
    }

    let options = run_options(&loaded.raw.config, &args)?;
    let executor = Arc::new(ProcessExecutor::new(options));

    // Ctrl-C / SIGTERM → cancel every running member. Children live in
    // their own process groups, so this is how the interrupt reaches them.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(signal) => {
                    warn!(signal, "received {signal}, stopping all running actions");
                    cancel.cancel();
                }
                Err(e) => eprintln!("failed to listen for shutdown signals: {e}"),
            }
        });
    }

    let result = execute(executor, &target, mode, &args.args, cancel).await?;
    report(&result);
    Ok(result.exit_code())
}

async fn execute(
    executor: Arc<ProcessExecutor>,
    target: &ResolvedTarget<'_>,
    mode: ExecMode,
    extra_args: &[String],
    cancel: CancellationToken,
) -> Result<GroupResult> {
    match mode {
        ExecMode::Normal => {
            Scheduler::new(executor)
                .execute(target, mode, extra_args, cancel)
                .await
        }
        ExecMode::Watch => {
            Watcher::new(executor)
                .watch_execute(target, extra_args, cancel)
                .await
        }
    }
}

/// Wait for the first interrupt (Ctrl-C) or, on unix, SIGTERM.
async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|()| "interrupt"),
            _ = terminate.recv() => Ok("terminate signal"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|()| "interrupt")
    }
}

/// Combine `[config]` and CLI flags into process options.
fn run_options(section: &ConfigSection, args: &CliArgs) -> Result<RunOptions> {
    let output = if args.prefix_output {
        OutputMode::Prefixed
    } else {
        section.output_mode()
    };

    Ok(RunOptions {
        output,
        shutdown_grace: section.shutdown_grace()?,
    })
}

/// Log a summary of the group outcome.
fn report(result: &GroupResult) {
    for member in &result.members {
        debug!(
            member = %member.qualified_name(),
            background = member.background,
            elapsed_ms = member.elapsed.as_millis() as u64,
            outcome = %member.outcome,
            "member result"
        );
    }

    if result.success() {
        info!(
            action = %result.action,
            members = result.members.len(),
            "all actions completed successfully"
        );
        return;
    }

    let skipped: Vec<String> = result.skipped().map(|m| m.qualified_name()).collect();
    match result.representative_failure() {
        Some(failure) => warn!(
            action = %result.action,
            failed = %failure.qualified_name(),
            outcome = %failure.outcome,
            ?skipped,
            exit_code = result.exit_code(),
            "action did not complete successfully"
        ),
        None => warn!(
            action = %result.action,
            ?skipped,
            exit_code = result.exit_code(),
            "action interrupted before completion"
        ),
    }
}

/// `--list`: modules, working directories and actions.
fn print_modules(registry: &Registry) {
    println!("modules ({}):", registry.modules().len());
    for module in registry.modules() {
        println!("  - {}", module.name);
        println!("      work_dir: {}", module.work_dir.display());
        for action in &module.actions {
            let mut flags = Vec::new();
            if action.watch_command.is_some() {
                flags.push("watch");
            }
            if action.accepts_args {
                flags.push("args");
            }
            if action.background_capable {
                flags.push("bg");
            }
            if flags.is_empty() {
                println!("      {}: {:?}", action.name, action.commands);
            } else {
                println!(
                    "      {} [{}]: {:?}",
                    action.name,
                    flags.join(", "),
                    action.commands
                );
            }
        }
    }
}

/// `--dry-run`: what would run, where, and in which partition.
fn print_dry_run(plan: &ExecutionPlan) {
    println!("bpm dry-run");
    println!("  action = {}", plan.action);
    println!("  mode = {}", plan.mode);
    println!();

    println!("members ({}):", plan.len());
    for inv in plan.members() {
        let partition = if inv.background { "background" } else { "foreground" };
        println!("  - {} ({partition})", inv.qualified_name());
        println!("      work_dir: {}", inv.work_dir.display());
        for (idx, line) in inv.command_lines().iter().enumerate() {
            println!("      [{idx}] {line}");
        }
    }

    debug!("dry-run complete (no execution)");
}
