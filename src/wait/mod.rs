//! Fixed-interval polling primitives.
//!
//! Every wait polls immediately, then sleeps `interval` between attempts and
//! gives up with [`WaitError::Timeout`] once `timeout` has elapsed. Remote
//! call failures are never retried; only "not yet" is.

use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

use crate::cloud::{ApiError, CloudApi, OperationHandle, OperationStatus};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const WAIT_TIMEOUT: Duration = Duration::from_secs(900);

/// Interval and deadline shared by all waits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollSettings {
    /// Delay between consecutive polls.
    pub interval: Duration,
    /// Total time after which a wait fails.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            timeout: WAIT_TIMEOUT,
        }
    }
}

/// Errors raised while waiting on the control plane.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum WaitError {
    /// The operation finished with an error payload.
    #[error("operation {operation} failed: {details}")]
    OperationFailed {
        /// Operation name.
        operation: String,
        /// Error payload reported by the service.
        details: String,
    },
    /// The awaited condition did not hold before the deadline.
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        /// Description of the awaited condition.
        what: String,
        /// Configured deadline.
        waited: Duration,
    },
    /// A poll itself failed.
    #[error(transparent)]
    Remote(#[from] ApiError),
}

/// Polls an operation until it reaches `DONE`.
///
/// # Errors
///
/// Returns [`WaitError::OperationFailed`] when the terminal operation carries
/// an error, [`WaitError::Remote`] when a poll fails, and
/// [`WaitError::Timeout`] when the deadline passes first.
pub async fn await_operation<C>(
    api: &C,
    settings: PollSettings,
    project: &str,
    handle: &OperationHandle,
) -> Result<(), WaitError>
where
    C: CloudApi + ?Sized,
{
    let what = format!("operation {}", handle.name);
    let outcome = await_attribute(settings, &what, move || async move {
        let operation = api.get_operation(project, handle).await?;
        debug!(operation = %handle.name, status = %operation.status, "polled operation");
        Ok(match operation.status {
            OperationStatus::Done => Some(operation.error),
            OperationStatus::Pending | OperationStatus::Running => None,
        })
    })
    .await?;

    match outcome {
        Some(details) => Err(WaitError::OperationFailed {
            operation: handle.name.clone(),
            details,
        }),
        None => Ok(()),
    }
}

/// Invokes `fetch` until it yields a value and returns that value.
///
/// # Errors
///
/// Returns [`WaitError::Remote`] as soon as `fetch` fails and
/// [`WaitError::Timeout`] when no value appears before the deadline.
pub async fn await_attribute<T, F, Fut>(
    settings: PollSettings,
    what: &str,
    mut fetch: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ApiError>>,
{
    let deadline = Instant::now().checked_add(settings.timeout);
    loop {
        if let Some(value) = fetch().await? {
            return Ok(value);
        }
        if next_poll_misses(deadline, settings.interval) {
            return Err(WaitError::Timeout {
                what: what.to_owned(),
                waited: settings.timeout,
            });
        }
        debug!(what, "not ready yet");
        sleep(settings.interval).await;
    }
}

/// A deadline too far away to represent never passes. An interval too long
/// to represent always overshoots a finite deadline.
fn next_poll_misses(deadline: Option<Instant>, interval: Duration) -> bool {
    deadline.is_some_and(|deadline| {
        Instant::now()
            .checked_add(interval)
            .is_none_or(|next_poll| next_poll > deadline)
    })
}

/// Polls a listing until it comes back empty.
///
/// # Errors
///
/// Behaves like [`await_attribute`].
pub async fn await_empty<F, Fut>(
    settings: PollSettings,
    what: &str,
    mut list: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<String>, ApiError>>,
{
    await_attribute(settings, what, || {
        let listing = list();
        async move { Ok(listing.await?.is_empty().then_some(())) }
    })
    .await
}
