// tests/process_runner.rs
//
// Runs real shell commands, so unix only.
#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use bpm::engine::{ActionOutcome, FailureKind, Scheduler};
use bpm::exec::{run, ProcessExecutor, RunOptions};
use bpm::registry::Registry;
use bpm::resolve::resolve;
use bpm::types::{ExecMode, OutputMode};
use bpm_test_utils::builders::{ActionConfigBuilder, ModuleConfigBuilder, RawConfigBuilder};
use bpm_test_utils::scratch::ScratchRepo;
use bpm_test_utils::{init_tracing, wait_until, with_timeout, within};
use tempfile::{tempdir, TempDir};

type TestResult = Result<(), Box<dyn Error>>;

fn quick() -> RunOptions {
    RunOptions {
        output: OutputMode::Inherit,
        shutdown_grace: Duration::ZERO,
    }
}

/// A registry with one module `m` (work_dir `.`) holding `action`.
fn single(dir: &TempDir, action: ActionConfigBuilder) -> Registry {
    RawConfigBuilder::new()
        .with_module(
            "m",
            ModuleConfigBuilder::new(".").action("a", action.build()).build(),
        )
        .build(dir.path())
}

#[tokio::test]
async fn sequence_stops_at_first_failing_command() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let registry = single(
        &dir,
        ActionConfigBuilder::commands(&[
            "echo one >> log.txt",
            "exit 3",
            "echo three >> log.txt",
        ]),
    );
    let action = registry.action("m", "a")?;

    let result = with_timeout(run(action, ExecMode::Normal, &[], quick(), CancellationToken::new()))
        .await?;

    match &result.outcome {
        ActionOutcome::Failed(failure) => {
            assert_eq!(failure.index, 1);
            assert_eq!(failure.command, "exit 3");
            assert_eq!(failure.kind, FailureKind::ExitCode(3));
        }
        other => return Err(format!("expected failure, got {other:?}").into()),
    }
    assert_eq!(result.outcome.exit_code(), 3);
    assert_eq!(fs::read_to_string(dir.path().join("log.txt"))?, "one\n");
    Ok(())
}

#[tokio::test]
async fn arguments_reach_only_the_last_command_verbatim() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let registry = single(
        &dir,
        ActionConfigBuilder::commands(&[
            "echo \"$#\" > first.txt",
            "printf '%s\\n' > last.txt",
        ])
        .accepts_args(true),
    );
    let action = registry.action("m", "a")?;
    let args = vec!["a b".to_string(), "--flag".to_string(), "$HOME".to_string()];

    let result = with_timeout(run(action, ExecMode::Normal, &args, quick(), CancellationToken::new()))
        .await?;

    assert!(result.outcome.is_success(), "got {}", result.outcome);
    assert_eq!(fs::read_to_string(dir.path().join("first.txt"))?, "0\n");
    assert_eq!(fs::read_to_string(dir.path().join("last.txt"))?, "a b\n--flag\n$HOME\n");
    Ok(())
}

#[tokio::test]
async fn commands_run_in_module_or_action_work_dir() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("svc"))?;
    fs::create_dir_all(dir.path().join("gen"))?;

    let registry = RawConfigBuilder::new()
        .with_module(
            "svc",
            ModuleConfigBuilder::new("svc")
                .action("mark", ActionConfigBuilder::new("touch marker").build())
                .action(
                    "gen",
                    ActionConfigBuilder::new("touch generated").work_dir("/gen").build(),
                )
                .build(),
        )
        .build(dir.path());

    for name in ["mark", "gen"] {
        let action = registry.action("svc", name)?;
        let result =
            with_timeout(run(action, ExecMode::Normal, &[], quick(), CancellationToken::new()))
                .await?;
        assert!(result.outcome.is_success(), "{name}: {}", result.outcome);
    }

    assert!(dir.path().join("svc/marker").is_file());
    assert!(dir.path().join("gen/generated").is_file());
    assert!(!dir.path().join("svc/generated").exists());
    Ok(())
}

#[tokio::test]
async fn missing_work_dir_is_a_spawn_failure() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let registry = RawConfigBuilder::new()
        .with_module(
            "ghost",
            ModuleConfigBuilder::new("does/not/exist")
                .action("a", ActionConfigBuilder::new("true").build())
                .build(),
        )
        .build(dir.path());
    let action = registry.action("ghost", "a")?;

    let result = with_timeout(run(action, ExecMode::Normal, &[], quick(), CancellationToken::new()))
        .await?;

    match &result.outcome {
        ActionOutcome::Failed(failure) => {
            assert!(matches!(failure.kind, FailureKind::Spawn(_)));
            assert_eq!(failure.exit_code(), 1);
        }
        other => return Err(format!("expected spawn failure, got {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn cancellation_kills_long_running_command() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let registry = single(
        &dir,
        ActionConfigBuilder::commands(&["sleep 100", "touch after"]),
    );
    let action = registry.action("m", "a")?;
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        }
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(
            run(
                action,
                ExecMode::Normal,
                &[],
                RunOptions {
                    output: OutputMode::Inherit,
                    shutdown_grace: Duration::from_millis(100),
                },
                cancel.clone(),
            ),
            canceller
        )
    })
    .await;
    let result = result?;

    assert_eq!(result.outcome, ActionOutcome::Cancelled);
    assert!(result.elapsed < Duration::from_secs(5));
    assert!(!dir.path().join("after").exists());
    Ok(())
}

#[tokio::test]
async fn watch_mode_runs_watch_command() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let registry = single(
        &dir,
        ActionConfigBuilder::new("touch normal").watch("touch watched"),
    );
    let action = registry.action("m", "a")?;

    let result = with_timeout(run(action, ExecMode::Watch, &[], quick(), CancellationToken::new()))
        .await?;

    assert!(result.outcome.is_success());
    assert!(dir.path().join("watched").is_file());
    assert!(!dir.path().join("normal").exists());
    Ok(())
}

#[tokio::test]
async fn prefixed_output_does_not_change_outcomes() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let registry = single(
        &dir,
        ActionConfigBuilder::commands(&["echo out", "echo err >&2", "printf 'no newline'"]),
    );
    let action = registry.action("m", "a")?;
    let options = RunOptions {
        output: OutputMode::Prefixed,
        shutdown_grace: Duration::ZERO,
    };

    let result =
        with_timeout(run(action, ExecMode::Normal, &[], options, CancellationToken::new())).await?;
    assert!(result.outcome.is_success(), "got {}", result.outcome);
    Ok(())
}

/// `bpm build` with api (foreground, fails) and web (background): web must
/// never start and the exit code is api's.
#[tokio::test]
async fn failing_foreground_keeps_background_from_starting() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("api"))?;
    fs::create_dir_all(dir.path().join("web"))?;

    let registry = RawConfigBuilder::new()
        .with_module(
            "api",
            ModuleConfigBuilder::new("api")
                .action("build", ActionConfigBuilder::new("exit 2").build())
                .build(),
        )
        .with_module(
            "web",
            ModuleConfigBuilder::new("web")
                .action(
                    "build",
                    ActionConfigBuilder::new("touch built").background(true).build(),
                )
                .build(),
        )
        .build(dir.path());

    let target = resolve(&registry, "build", None)?;
    let scheduler = Scheduler::new(Arc::new(ProcessExecutor::new(quick())));

    let result = with_timeout(scheduler.execute(
        &target,
        ExecMode::Normal,
        &[],
        CancellationToken::new(),
    ))
    .await?;

    assert_eq!(result.exit_code(), 2);
    assert_eq!(result.member("web").ok_or("web missing")?.outcome, ActionOutcome::Skipped);
    assert!(!dir.path().join("web/built").exists());
    Ok(())
}

#[tokio::test]
async fn background_members_run_concurrently() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    for m in ["a", "b"] {
        fs::create_dir_all(dir.path().join(m))?;
    }

    // each member waits for the other's marker, so they only finish if both
    // are running at the same time
    let registry = RawConfigBuilder::new()
        .with_module(
            "a",
            ModuleConfigBuilder::new("a")
                .action(
                    "dev",
                    ActionConfigBuilder::new("touch up; while [ ! -f ../b/up ]; do sleep 0.05; done")
                        .background(true)
                        .build(),
                )
                .build(),
        )
        .with_module(
            "b",
            ModuleConfigBuilder::new("b")
                .action(
                    "dev",
                    ActionConfigBuilder::new("touch up; while [ ! -f ../a/up ]; do sleep 0.05; done")
                        .background(true)
                        .build(),
                )
                .build(),
        )
        .build(dir.path());

    let target = resolve(&registry, "dev", None)?;
    let scheduler = Scheduler::new(Arc::new(ProcessExecutor::new(quick())));

    let result = with_timeout(scheduler.execute(
        &target,
        ExecMode::Normal,
        &[],
        CancellationToken::new(),
    ))
    .await?;

    assert!(result.success());
    assert!(result.members.iter().all(|m| m.background));
    Ok(())
}

/// Whether `pid` has exited. Zombies count as gone: an orphan may sit
/// unreaped for a while when the container has no real init.
#[cfg(target_os = "linux")]
fn process_is_gone(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Err(_) => true,
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .is_some_and(|state| matches!(state, 'Z' | 'X')),
    }
}

#[cfg(target_os = "linux")]
fn read_pid(repo: &ScratchRepo, rel: &str) -> Result<u32, Box<dyn Error>> {
    Ok(repo.read(rel)?.trim().parse()?)
}

#[cfg(target_os = "linux")]
async fn assert_gone(pid: u32) {
    within(Duration::from_secs(2), wait_until(|| process_is_gone(pid))).await;
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn cancellation_reaches_processes_the_command_started() -> TestResult {
    init_tracing();

    let repo = ScratchRepo::new()?;
    let registry = repo.registry(RawConfigBuilder::new().with_module(
        "m",
        ModuleConfigBuilder::new(".")
            .action("a", ActionConfigBuilder::new("sleep 30 & echo $! > pid; wait $!").build())
            .build(),
    ));
    let action = registry.action("m", "a")?;
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        }
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(
            run(
                action,
                ExecMode::Normal,
                &[],
                RunOptions {
                    output: OutputMode::Inherit,
                    shutdown_grace: Duration::from_millis(200),
                },
                cancel.clone(),
            ),
            canceller
        )
    })
    .await;

    assert_eq!(result?.outcome, ActionOutcome::Cancelled);
    assert_gone(read_pid(&repo, "pid")?).await;
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn descendant_ignoring_sigterm_is_killed_after_grace() -> TestResult {
    init_tracing();

    let repo = ScratchRepo::new()?;
    let registry = repo.registry(RawConfigBuilder::new().with_module(
        "m",
        ModuleConfigBuilder::new(".")
            .action(
                "a",
                ActionConfigBuilder::new(
                    "sh -c 'trap \"\" TERM; while :; do sleep 0.05; done' & echo $! > pid; wait $!",
                )
                .build(),
            )
            .build(),
    ));
    let action = registry.action("m", "a")?;
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        let pid_file = repo.path("pid");
        async move {
            wait_until(|| fs::read_to_string(&pid_file).is_ok_and(|s| s.ends_with('\n'))).await;
            cancel.cancel();
        }
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(
            run(
                action,
                ExecMode::Normal,
                &[],
                RunOptions {
                    output: OutputMode::Inherit,
                    shutdown_grace: Duration::from_millis(200),
                },
                cancel.clone(),
            ),
            canceller
        )
    })
    .await;

    assert_eq!(result?.outcome, ActionOutcome::Cancelled);
    assert_gone(read_pid(&repo, "pid")?).await;
    Ok(())
}

/// `bpm dev` with two background members that each leave a child process
/// running: after cancellation every member is reported cancelled and none
/// of the children survive.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn cancelled_group_leaves_no_descendants_behind() -> TestResult {
    init_tracing();

    let repo = ScratchRepo::new()?;
    let mut config = RawConfigBuilder::new();
    for m in ["a", "b"] {
        repo.mkdir(m)?;
        config = config.with_module(
            m,
            ModuleConfigBuilder::new(m)
                .action(
                    "dev",
                    ActionConfigBuilder::new("sleep 30 & echo $! > pid; wait $!")
                        .background(true)
                        .build(),
                )
                .build(),
        );
    }
    let registry = repo.registry(config);

    let target = resolve(&registry, "dev", None)?;
    let scheduler = Scheduler::new(Arc::new(ProcessExecutor::new(RunOptions {
        output: OutputMode::Inherit,
        shutdown_grace: Duration::from_millis(200),
    })));
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        let pid_files = [repo.path("a/pid"), repo.path("b/pid")];
        async move {
            wait_until(|| {
                pid_files
                    .iter()
                    .all(|p| fs::read_to_string(p).is_ok_and(|s| s.ends_with('\n')))
            })
            .await;
            cancel.cancel();
        }
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(
            scheduler.execute(&target, ExecMode::Normal, &[], cancel.clone()),
            canceller
        )
    })
    .await;
    let result = result?;

    assert_eq!(result.members.len(), 2);
    assert!(result.members.iter().all(|m| m.outcome == ActionOutcome::Cancelled));
    assert_eq!(result.exit_code(), bpm::engine::EXIT_CANCELLED);

    for m in ["a", "b"] {
        assert_gone(read_pid(&repo, &format!("{m}/pid"))?).await;
    }
    Ok(())
}

/// A command that writes bytes that are not UTF-8 and then floods its
/// output must still run to completion when output is prefixed.
#[tokio::test]
async fn prefixed_output_survives_invalid_utf8_and_large_volume() -> TestResult {
    init_tracing();

    let repo = ScratchRepo::new()?;
    let registry = repo.registry(RawConfigBuilder::new().with_module(
        "m",
        ModuleConfigBuilder::new(".")
            .action(
                "a",
                ActionConfigBuilder::new(
                    "printf '\\377\\n'; sleep 0.3; \
                     i=0; while [ $i -lt 20000 ]; do echo line $i; i=$((i+1)); done; \
                     echo done > marker",
                )
                .build(),
            )
            .build(),
    ));
    let action = registry.action("m", "a")?;
    let options = RunOptions {
        output: OutputMode::Prefixed,
        shutdown_grace: Duration::ZERO,
    };

    let result =
        with_timeout(run(action, ExecMode::Normal, &[], options, CancellationToken::new())).await?;

    assert!(result.outcome.is_success(), "got {}", result.outcome);
    assert_eq!(repo.read("marker")?, "done\n");
    Ok(())
}
