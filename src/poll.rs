//! Bounded fixed-interval polling.
//!
//! Every strategy awaits its remote execution through [`await_completion`]. The loop
//! polls once before it ever sleeps, stops at the first terminal outcome and reports
//! exhaustion as [`Completion::TimedOut`], which is distinct from a failure because the
//! remote work may still finish later.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, RunnerError};

/// Outcome of a single status check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Pending,
    Succeeded(T),
    Failed(String),
}

/// Terminal outcome of a poll loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    Succeeded(T),
    Failed(String),
    TimedOut,
}

/// How many times to poll and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub max_attempts: u32,
    #[serde(with = "millis", rename = "interval_ms")]
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on time spent sleeping, ignoring network latency.
    pub fn worst_case(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(1))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Races a future against the cancellation token.
pub async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(RunnerError::Cancelled),
        result = fut => result,
    }
}

/// Polls `poll_fn` until it reports a terminal outcome or `policy.max_attempts` is used up.
///
/// Sleeps `policy.interval` between attempts, never before the first one or after the
/// last one. An error from `poll_fn` ends the loop and is returned as-is.
pub async fn await_completion<T, F, Fut>(
    mut poll_fn: F,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<Completion<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>>>,
{
    for attempt in 1..=policy.max_attempts {
        match cancellable(cancel, poll_fn()).await? {
            PollOutcome::Succeeded(value) => return Ok(Completion::Succeeded(value)),
            PollOutcome::Failed(reason) => return Ok(Completion::Failed(reason)),
            PollOutcome::Pending => {
                debug!("Still pending (attempt {} of {})", attempt, policy.max_attempts);
            }
        }

        if attempt < policy.max_attempts {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(RunnerError::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    Ok(Completion::TimedOut)
}
