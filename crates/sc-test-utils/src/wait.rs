//! Polling helpers for conditions reached on another task.

use std::time::Duration;

/// Poll `condition` until it holds, yielding between checks.
///
/// Panics if it does not hold within `timeout`.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let result = tokio::time::timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;

    assert!(result.is_ok(), "condition not met within {timeout:?}");
}

/// [`wait_until`] with a one second bound.
pub async fn eventually(condition: impl FnMut() -> bool) {
    wait_until(Duration::from_secs(1), condition).await;
}
