//! Remote call metrics.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record the duration of a remote API call.
pub fn record_remote_call_duration(operation: &str, duration_secs: f64) {
    histogram!(
        "remote_call_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Count a failed remote API call.
pub fn record_remote_failure(operation: &str) {
    counter!(
        "remote_call_failures_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Times a remote call and records the outcome.
///
/// ```ignore
/// let timer = RemoteCallTimer::new("fetch_settings");
/// let result = client.get(url).send().await;
/// timer.finish(result.is_ok());
/// ```
pub struct RemoteCallTimer {
    operation: &'static str,
    start: Instant,
}

impl RemoteCallTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Record the elapsed duration, and a failure when `ok` is false.
    pub fn finish(self, ok: bool) {
        record_remote_call_duration(self.operation, self.start.elapsed().as_secs_f64());
        if !ok {
            record_remote_failure(self.operation);
        }
    }
}
