//! Poll-until-terminal primitive for long-running upstream jobs

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// One probe observation: either the job is still running or it reached a
/// terminal state carrying its final snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPoll<T> {
    Pending,
    Terminal(T),
}

/// Probes `probe` every `interval` until it reports a terminal state or
/// `max_wait` elapses. Returns `Ok(None)` on deadline expiry; probe errors
/// propagate immediately. The probe is never invoked again after a terminal
/// result, and the deadline is a cooperative check between probes rather
/// than a preemptive interrupt.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    max_wait: Duration,
    mut probe: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobPoll<T>, E>>,
{
    let deadline = Instant::now() + max_wait;
    loop {
        if let JobPoll::Terminal(value) = probe().await? {
            return Ok(Some(value));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(interval).await;
    }
}
