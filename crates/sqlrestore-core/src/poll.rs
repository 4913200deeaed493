//! Bounded polling for eventually-consistent backend state
//!
//! Restore points and dropped-database backups appear some time after the
//! operation that produces them. [`poll_until`] asks the control plane again
//! and again, sleeping a fixed interval in between, until a probe reports the
//! state or the attempt budget runs out. Running out is not an error; the
//! caller decides what to do with `None`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Attempt budget and spacing for one wait
///
/// Settings files may override either field on its own; the other keeps the
/// value of the wait it belongs to (see [`PollPolicy::restore_point`] and
/// [`PollPolicy::dropped_database`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollPolicy {
    /// Probes to run before giving up
    pub max_attempts: u32,

    /// Pause between two probes, in seconds
    pub interval_secs: u64,
}

impl PollPolicy {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval_secs: interval.as_secs(),
        }
    }

    /// 50 attempts, three minutes apart
    pub const fn restore_point() -> Self {
        Self::new(50, Duration::from_secs(3 * 60))
    }

    /// 24 attempts, five minutes apart
    pub const fn dropped_database() -> Self {
        Self::new(24, Duration::from_secs(5 * 60))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Longest time a wait under this policy can take
    pub fn worst_case(&self) -> Duration {
        self.interval() * self.max_attempts.saturating_sub(1)
    }
}

/// Progress events emitted while polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A wait has begun
    Started { what: String, max_attempts: u32 },
    /// A probe came back empty
    Polling {
        what: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// A probe reported the awaited state
    Satisfied { what: String, attempts: u32 },
    /// The attempt budget ran out
    Exhausted { what: String, attempts: u32 },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive its spinner.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Probe until something shows up or the budget runs out
///
/// `probe` returns `Ok(Some(_))` once the awaited state exists and
/// `Ok(None)` while it does not. Probe errors are returned immediately; only
/// the "not there yet" case is retried. There is no sleep after the last
/// attempt.
///
/// # Example
///
/// ```rust,ignore
/// let point = poll_until("restore point", &PollPolicy::restore_point(), None, || async {
///     Ok(client.list_restore_points(&db).await?.into_iter().next())
/// })
/// .await?;
/// ```
pub async fn poll_until<T, F, Fut>(
    what: &str,
    policy: &PollPolicy,
    on_progress: Option<&ProgressCallback>,
    mut probe: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    emit(
        on_progress,
        ProgressEvent::Started {
            what: what.to_string(),
            max_attempts: policy.max_attempts,
        },
    );

    for attempt in 1..=policy.max_attempts {
        if let Some(found) = probe().await? {
            tracing::debug!(what, attempt, "poll satisfied");
            emit(
                on_progress,
                ProgressEvent::Satisfied {
                    what: what.to_string(),
                    attempts: attempt,
                },
            );
            return Ok(Some(found));
        }

        tracing::info!(
            what,
            attempt,
            max_attempts = policy.max_attempts,
            "{what} not available yet"
        );
        emit(
            on_progress,
            ProgressEvent::Polling {
                what: what.to_string(),
                attempt,
                max_attempts: policy.max_attempts,
            },
        );

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval()).await;
        }
    }

    tracing::warn!(what, attempts = policy.max_attempts, "gave up waiting for {what}");
    emit(
        on_progress,
        ProgressEvent::Exhausted {
            what: what.to_string(),
            attempts: policy.max_attempts,
        },
    );
    Ok(None)
}

/// How long to wait before a restore to `earliest` can be attempted
///
/// The earliest restorable time is sometimes still in the future when the
/// restore point first shows up. The result is `(earliest - now) + margin`,
/// or zero when that is negative.
pub fn restore_wait(earliest: DateTime<Utc>, now: DateTime<Utc>, margin: Duration) -> Duration {
    let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::MAX);
    let wait = (earliest - now)
        .checked_add(&margin)
        .unwrap_or(chrono::Duration::MAX);
    wait.to_std().unwrap_or(Duration::ZERO)
}

fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
