use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bpm::engine::{ActionOutcome, CommandFailure, ExecutionResult, FailureKind};
use bpm::exec::{ActionExecutor, Invocation};
use tokio_util::sync::CancellationToken;

/// A fake executor that:
/// - records every invocation it is asked to run, in start order
/// - reports a scripted outcome per `module.action` (success by default)
/// - can hold members "running" for a while, or until cancelled
/// - can panic mid-run, like a broken backend
#[derive(Default)]
pub struct FakeExecutor {
    outcomes: HashMap<String, ActionOutcome>,
    delays: HashMap<String, Duration>,
    long_lived: HashSet<String>,
    panicking: HashSet<String>,
    started: Arc<Mutex<Vec<Invocation>>>,
    finished: Arc<Mutex<Vec<String>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `member` (`module.action`) exit with `code` from its first command.
    pub fn failing(mut self, member: &str, code: i32) -> Self {
        self.outcomes.insert(
            member.to_string(),
            ActionOutcome::Failed(CommandFailure {
                index: 0,
                command: format!("fake {member}"),
                kind: FailureKind::ExitCode(code),
            }),
        );
        self
    }

    pub fn with_outcome(mut self, member: &str, outcome: ActionOutcome) -> Self {
        self.outcomes.insert(member.to_string(), outcome);
        self
    }

    /// Keep `member` running for `delay` (or until cancelled).
    pub fn with_delay(mut self, member: &str, delay: Duration) -> Self {
        self.delays.insert(member.to_string(), delay);
        self
    }

    /// Keep `member` running until cancelled.
    pub fn long_lived(mut self, member: &str) -> Self {
        self.long_lived.insert(member.to_string());
        self
    }

    /// Panic inside the executor when `member` runs.
    pub fn panicking(mut self, member: &str) -> Self {
        self.panicking.insert(member.to_string());
        self
    }

    /// Resolve once at least `count` members have been started.
    pub async fn wait_for_started(&self, count: usize) {
        crate::wait_until(|| self.started.lock().unwrap().len() >= count).await;
    }

    /// Resolve once at least `count` members have finished.
    pub async fn wait_for_finished(&self, count: usize) {
        crate::wait_until(|| self.finished.lock().unwrap().len() >= count).await;
    }

    pub fn started(&self) -> Vec<Invocation> {
        self.started.lock().unwrap().clone()
    }

    pub fn started_names(&self) -> Vec<String> {
        self.started().iter().map(|i| i.qualified_name()).collect()
    }

    pub fn finished_names(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl ActionExecutor for FakeExecutor {
    fn execute(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>> {
        Box::pin(async move {
            let name = invocation.qualified_name();
            {
                let mut guard = self.started.lock().unwrap();
                guard.push(invocation.clone());
            }

            if self.panicking.contains(&name) {
                panic!("scripted panic in {name}");
            }

            let began = Instant::now();
            let scripted = self
                .outcomes
                .get(&name)
                .cloned()
                .unwrap_or(ActionOutcome::Success);

            let outcome = if self.long_lived.contains(&name) {
                cancel.cancelled().await;
                ActionOutcome::Cancelled
            } else if let Some(delay) = self.delays.get(&name).copied() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => scripted,
                    _ = cancel.cancelled() => ActionOutcome::Cancelled,
                }
            } else {
                scripted
            };

            {
                let mut guard = self.finished.lock().unwrap();
                guard.push(name);
            }

            ExecutionResult::from_invocation(&invocation, outcome, began.elapsed())
        })
    }
}
