//! Helpers shared by bpm's integration tests: config builders, a scratch
//! repository on disk, a scripted executor, and async deadlines.

pub mod builders;
pub mod fake_executor;
pub mod scratch;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive env var for test logs, e.g. `BPM_TEST_LOG=bpm=debug`.
pub const TEST_LOG_ENV: &str = "BPM_TEST_LOG";

/// Upper bound for one engine run in tests. Real-process tests stay well
/// below it; hitting it means something never finished.
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Send bpm's `tracing` output to the libtest capture buffer, so scheduler
/// and runner logs show up next to a failing assertion only.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(TEST_LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn,bpm=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `fut` for at most [`TEST_DEADLINE`].
pub async fn with_timeout<F, T>(fut: F) -> T
where
    F: Future<Output = T>,
{
    within(TEST_DEADLINE, fut).await
}

/// Await `fut` for at most `limit`, panicking with the limit otherwise.
pub async fn within<F, T>(limit: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => value,
        Err(_) => panic!("did not finish within {limit:?}"),
    }
}

/// Poll `condition` every 10ms until it holds.
///
/// Callers bound the wait with [`with_timeout`] or [`within`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
