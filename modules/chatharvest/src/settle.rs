use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

use chatharvest_common::{Config, SettlePolicy};

use crate::driver::{Scope, UiDriver};

/// Sleep a random duration in `[min, max)`. A degenerate range sleeps `min`.
pub async fn jitter_pause(min: Duration, max: Duration) {
    let pause = if max > min {
        let min_ms = min.as_millis() as u64;
        let max_ms = max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min_ms..max_ms))
    } else {
        min
    };
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

/// Short backoff between polls of a bounded wait.
pub async fn poll_pause(config: &Config) {
    jitter_pause(config.poll_backoff_min, config.poll_backoff_max).await;
}

/// Let the host UI finish rendering after a scroll. `selector` under `scope`
/// identifies the rows whose count is watched by `SettlePolicy::StableCount`.
pub async fn settle(driver: &dyn UiDriver, scope: Scope<'_>, selector: &str, config: &Config) {
    match config.settle {
        SettlePolicy::Immediate => {}
        SettlePolicy::Jitter { min, max } => jitter_pause(min, max).await,
        SettlePolicy::StableCount { quiet, timeout } => {
            wait_for_stable_count(driver, scope, selector, quiet, timeout, config).await;
        }
    }
}

/// Poll the match count until it has not changed for `quiet`, or `timeout` elapses.
/// Returns the last observed count.
pub async fn wait_for_stable_count(
    driver: &dyn UiDriver,
    scope: Scope<'_>,
    selector: &str,
    quiet: Duration,
    timeout: Duration,
    config: &Config,
) -> usize {
    let started = Instant::now();
    let mut count = driver.discover(scope, selector).await.len();
    let mut stable_since = Instant::now();

    loop {
        if stable_since.elapsed() >= quiet {
            return count;
        }
        if started.elapsed() >= timeout {
            debug!(selector, count, "Row count still changing at settle timeout");
            return count;
        }
        poll_pause(config).await;

        let current = driver.discover(scope, selector).await.len();
        if current != count {
            count = current;
            stable_since = Instant::now();
        }
    }
}
