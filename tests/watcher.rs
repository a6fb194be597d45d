// tests/watcher.rs

use std::error::Error;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use bpm::engine::{ActionOutcome, FailureKind, Watcher, EXIT_CANCELLED};
use bpm::errors::BpmError;
use bpm::registry::Registry;
use bpm::resolve::resolve;
use bpm::types::ExecMode;
use bpm_test_utils::builders::{ActionConfigBuilder, ModuleConfigBuilder, RawConfigBuilder};
use bpm_test_utils::fake_executor::FakeExecutor;
use bpm_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// `dev` in api (foreground) and web (background); `build` has no watch
/// variant in web.
fn registry() -> Registry {
    RawConfigBuilder::new()
        .with_module(
            "api",
            ModuleConfigBuilder::new("api")
                .action(
                    "dev",
                    ActionConfigBuilder::new("cargo run").watch("cargo watch -x run").build(),
                )
                .action(
                    "build",
                    ActionConfigBuilder::new("make").watch("make watch").build(),
                )
                .build(),
        )
        .with_module(
            "web",
            ModuleConfigBuilder::new("web")
                .action(
                    "dev",
                    ActionConfigBuilder::new("npm start")
                        .watch("npm run dev")
                        .background(true)
                        .build(),
                )
                .action("build", ActionConfigBuilder::new("npm run build").build())
                .build(),
        )
        .build("/repo")
}

#[tokio::test]
async fn watch_starts_every_member_and_cancel_stops_them_all() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "dev", None)?;
    let executor = Arc::new(
        FakeExecutor::new()
            .long_lived("api.dev")
            .long_lived("web.dev"),
    );
    let watcher = Watcher::new(Arc::clone(&executor));
    let cancel = CancellationToken::new();

    let canceller = {
        let executor = Arc::clone(&executor);
        let cancel = cancel.clone();
        async move {
            // the foreground member never exits, yet the background one starts
            executor.wait_for_started(2).await;
            cancel.cancel();
        }
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(watcher.watch_execute(&target, &[], cancel.clone()), canceller)
    })
    .await;
    let result = result?;

    let mut started = executor.started();
    started.sort_by_key(|inv| inv.position);
    let names: Vec<String> = started.iter().map(|inv| inv.qualified_name()).collect();
    assert_eq!(names, vec!["api.dev", "web.dev"]);
    assert!(!started[0].background);
    assert!(started[1].background);
    assert_eq!(executor.finished_names().len(), 2);

    assert!(started.iter().all(|inv| inv.mode == ExecMode::Watch));
    assert_eq!(started[0].commands, vec!["cargo watch -x run"]);
    assert_eq!(started[1].commands, vec!["npm run dev"]);

    assert_eq!(result.mode, ExecMode::Watch);
    assert!(result.members.iter().all(|m| m.outcome == ActionOutcome::Cancelled));
    assert_eq!(result.exit_code(), EXIT_CANCELLED);
    Ok(())
}

#[tokio::test]
async fn member_exiting_on_its_own_does_not_stop_siblings() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "dev", None)?;
    let executor = Arc::new(
        FakeExecutor::new()
            .failing("api.dev", 1)
            .long_lived("web.dev"),
    );
    let watcher = Watcher::new(Arc::clone(&executor));
    let cancel = CancellationToken::new();

    let canceller = {
        let executor = Arc::clone(&executor);
        let cancel = cancel.clone();
        async move {
            executor.wait_for_finished(1).await;
            executor.wait_for_started(2).await;
            // web is still running after api exited
            assert!(!executor.finished_names().contains(&"web.dev".to_string()));
            cancel.cancel();
        }
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(watcher.watch_execute(&target, &[], cancel.clone()), canceller)
    })
    .await;
    let result = result?;

    assert!(result.member("api").ok_or("api missing")?.outcome.is_failure());
    assert_eq!(result.member("web").ok_or("web missing")?.outcome, ActionOutcome::Cancelled);
    assert_eq!(result.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn watch_returns_when_every_member_exits() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "dev", None)?;
    let executor = Arc::new(FakeExecutor::new());

    let result = with_timeout(Watcher::new(Arc::clone(&executor)).watch_execute(
        &target,
        &[],
        CancellationToken::new(),
    ))
    .await?;

    assert!(result.success());
    assert!(!result.cancelled);
    assert_eq!(result.members.len(), 2);
    Ok(())
}

#[tokio::test]
async fn member_without_watch_command_aborts_before_spawning() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "build", None)?;
    let executor = Arc::new(FakeExecutor::new());

    let err = Watcher::new(Arc::clone(&executor))
        .watch_execute(&target, &[], CancellationToken::new())
        .await
        .err()
        .ok_or("expected WatchUnsupported")?;

    match err {
        BpmError::WatchUnsupported(action) => assert_eq!(action, "web.build"),
        other => return Err(format!("expected WatchUnsupported, got {other:?}").into()),
    }
    assert!(executor.started().is_empty());
    Ok(())
}

#[tokio::test]
async fn watch_single_member_via_module_filter() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "build", Some("api"))?;
    let executor = Arc::new(FakeExecutor::new());

    let result = with_timeout(Watcher::new(Arc::clone(&executor)).watch_execute(
        &target,
        &[],
        CancellationToken::new(),
    ))
    .await?;

    assert!(result.success());
    assert_eq!(executor.started()[0].commands, vec!["make watch"]);
    Ok(())
}

#[tokio::test]
async fn crashed_member_is_reported_not_dropped() -> TestResult {
    init_tracing();

    let registry = registry();
    let target = resolve(&registry, "dev", None)?;
    let executor = Arc::new(FakeExecutor::new().panicking("web.dev"));

    let result = with_timeout(Watcher::new(Arc::clone(&executor)).watch_execute(
        &target,
        &[],
        CancellationToken::new(),
    ))
    .await?;

    assert_eq!(result.members.len(), 2);
    assert!(!result.success());
    let web = result.member("web").ok_or("web missing")?;
    match &web.outcome {
        ActionOutcome::Failed(failure) => assert!(matches!(failure.kind, FailureKind::Spawn(_))),
        other => return Err(format!("expected failure, got {other:?}").into()),
    }
    assert_eq!(result.exit_code(), 1);
    Ok(())
}
