//! Timing of catalog calls for diagnostics.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

/// Outcome of a watched call: how long it took and whether it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchReport {
    pub elapsed: Duration,
    pub succeeded: bool,
}

impl fmt::Display for WatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.succeeded { "succeeded" } else { "failed" };
        write!(f, "{} after {}s", outcome, self.elapsed.as_secs())
    }
}

/// Await `call` and report its duration alongside the result.
pub async fn watch<T, E, F>(call: F) -> (Result<T, E>, WatchReport)
where
    F: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let result = call.await;
    let report = WatchReport {
        elapsed: started.elapsed(),
        succeeded: result.is_ok(),
    };
    (result, report)
}
