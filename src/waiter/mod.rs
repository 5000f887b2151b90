//! Polling of asynchronous OVHcloud operations.
//!
//! Most OVHcloud mutations return before the change is applied: a database
//! cluster moves through `CREATING` to `READY`, a vrack attachment spawns a
//! task, a Graylog stream is created by a background operation. [`Waiter`]
//! polls a caller-supplied refresh function, classifies each observed state
//! as pending, target, or failed, and gives up once the timeout elapses.
//!
//! The clock is [`tokio::time::Instant`], so tests can drive waits with a
//! paused runtime.

use std::collections::BTreeSet;
use std::error::Error;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep, sleep_until, timeout_at};
use tracing::{debug, warn};

use crate::client::ClientError;

/// Default wait budget for a single operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const RETRY_DONE_STATE: &str = "done";
/// Stand-in deadline for budgets too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Result of one refresh call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Observation<T> {
    /// The object exists and reported `state`.
    Present {
        /// Last fetched representation of the object.
        value: T,
        /// Status string reported by the API.
        state: String,
    },
    /// The status endpoint answered `404 Not Found`.
    Gone,
}

impl<T> Observation<T> {
    /// Shorthand for [`Observation::Present`].
    pub fn present(value: T, state: impl Into<String>) -> Self {
        Self::Present {
            value,
            state: state.into(),
        }
    }
}

/// Failure of one refresh call, tagged with whether polling may continue.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RefreshError<E> {
    /// Transient failure; the waiter polls again.
    Retryable(E),
    /// Terminal failure; the waiter returns immediately.
    Fatal(E),
}

impl<E> RefreshError<E> {
    /// Returns the wrapped error.
    pub fn into_inner(self) -> E {
        match self {
            Self::Retryable(err) | Self::Fatal(err) => err,
        }
    }
}

/// Errors returned by [`Waiter::wait`] and [`Waiter::retry`].
#[derive(Debug, Error)]
pub enum WaitError<E: Error + 'static> {
    /// The deadline passed before a target state was observed.
    #[error(
        "timed out after {elapsed:?} waiting for {operation} (last state: {})",
        .last_state.as_deref().unwrap_or("none")
    )]
    Timeout {
        /// Operation being waited on.
        operation: String,
        /// Last non-terminal state observed, if any.
        last_state: Option<String>,
        /// Time spent waiting.
        elapsed: Duration,
    },
    /// The object reported a state outside every configured set.
    #[error("{operation} reached unexpected state {state:?} (expected one of {expected:?})")]
    UnexpectedState {
        /// Operation being waited on.
        operation: String,
        /// State that was observed.
        state: String,
        /// Pending and target states that were acceptable.
        expected: Vec<String>,
    },
    /// The object reported a terminal failure state.
    #[error("{operation} failed with state {state:?}")]
    FailedState {
        /// Operation being waited on.
        operation: String,
        /// Failure state reported by the API.
        state: String,
    },
    /// The object kept answering `404` while it was expected to exist.
    #[error("{operation} not found after {checks} consecutive checks")]
    NotFound {
        /// Operation being waited on.
        operation: String,
        /// Number of consecutive `404` observations.
        checks: u32,
    },
    /// The refresh function reported a non-retryable error.
    #[error("{operation} failed: {source}")]
    Refresh {
        /// Operation being waited on.
        operation: String,
        /// Underlying refresh error.
        #[source]
        source: E,
    },
}

/// Initial delay and fixed poll interval, overridable per resource handler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cadence {
    /// Sleep before the first poll.
    pub delay: Duration,
    /// Fixed interval between polls.
    pub interval: Duration,
}

impl Cadence {
    /// Builds a cadence from a delay and interval.
    #[must_use]
    pub const fn new(delay: Duration, interval: Duration) -> Self {
        Self { delay, interval }
    }
}

/// Polls an operation until it reaches a target state, fails, or times out.
#[derive(Clone, Debug)]
pub struct Waiter {
    operation: String,
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    failed: BTreeSet<String>,
    timeout: Duration,
    delay: Duration,
    min_interval: Duration,
    poll_interval: Option<Duration>,
    gone_is_target: bool,
    not_found_checks: u32,
}

impl Waiter {
    /// Creates a waiter for `operation` with no states configured.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            failed: BTreeSet::new(),
            timeout: DEFAULT_TIMEOUT,
            delay: Duration::ZERO,
            min_interval: Duration::ZERO,
            poll_interval: None,
            gone_is_target: false,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
        }
    }

    /// Adds states meaning "not done yet".
    #[must_use]
    pub fn pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    /// Adds states meaning "done".
    #[must_use]
    pub fn target<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target.extend(states.into_iter().map(Into::into));
        self
    }

    /// Adds terminal failure states.
    #[must_use]
    pub fn failed<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failed.extend(states.into_iter().map(Into::into));
        self
    }

    /// Sets the total wait budget.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the sleep before the first poll.
    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the floor between two polls.
    #[must_use]
    pub const fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Polls at a fixed interval instead of backing off exponentially.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Applies a delay and fixed poll interval in one go.
    #[must_use]
    pub const fn cadence(mut self, cadence: Cadence) -> Self {
        self.delay = cadence.delay;
        self.poll_interval = Some(cadence.interval);
        self
    }

    /// Treats a `404` observation as success.
    #[must_use]
    pub const fn until_gone(mut self) -> Self {
        self.gone_is_target = true;
        self
    }

    /// Sets how many consecutive `404` observations are tolerated.
    #[must_use]
    pub const fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Returns the operation description.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Polls `refresh` until a target state is observed.
    ///
    /// Returns the last fetched object, or `None` when the waiter was built
    /// with [`Self::until_gone`] and the object disappeared.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError`] on timeout, failure or unexpected states,
    /// persistent `404`s, or a fatal refresh error.
    pub async fn wait<T, E, F, Fut>(&self, mut refresh: F) -> Result<Option<T>, WaitError<E>>
    where
        E: Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<T>, RefreshError<E>>>,
    {
        let started = Instant::now();
        let deadline = deadline_after(started, self.timeout);
        let mut last_state: Option<String> = None;
        let mut attempt: u32 = 0;
        let mut gone_checks: u32 = 0;
        let mut backoff = INITIAL_BACKOFF;

        if !self.delay.is_zero() {
            if deadline_after(started, self.delay) > deadline {
                sleep_until(deadline).await;
                return Err(self.timed_out(last_state, started));
            }
            sleep(self.delay).await;
        }

        loop {
            attempt = attempt.saturating_add(1);
            let Ok(outcome) = timeout_at(deadline, refresh()).await else {
                return Err(self.timed_out(last_state, started));
            };

            match outcome {
                Ok(Observation::Present { value, state }) => {
                    debug!(
                        operation = %self.operation,
                        attempt,
                        state = %state,
                        elapsed = ?started.elapsed(),
                        "polled operation"
                    );
                    gone_checks = 0;
                    if self.target.contains(&state) {
                        return Ok(Some(value));
                    }
                    if self.failed.contains(&state) {
                        return Err(WaitError::FailedState {
                            operation: self.operation.clone(),
                            state,
                        });
                    }
                    if !state.is_empty() && !self.pending.contains(&state) {
                        return Err(WaitError::UnexpectedState {
                            operation: self.operation.clone(),
                            state,
                            expected: self.expected_states(),
                        });
                    }
                    last_state = Some(state);
                }
                Ok(Observation::Gone) => {
                    debug!(
                        operation = %self.operation,
                        attempt,
                        elapsed = ?started.elapsed(),
                        "operation target not found"
                    );
                    if self.gone_is_target {
                        return Ok(None);
                    }
                    gone_checks = gone_checks.saturating_add(1);
                    if gone_checks > self.not_found_checks {
                        return Err(WaitError::NotFound {
                            operation: self.operation.clone(),
                            checks: gone_checks,
                        });
                    }
                }
                Err(RefreshError::Fatal(source)) => {
                    return Err(WaitError::Refresh {
                        operation: self.operation.clone(),
                        source,
                    });
                }
                Err(RefreshError::Retryable(err)) => {
                    warn!(
                        operation = %self.operation,
                        attempt,
                        error = %err,
                        "retrying after transient error"
                    );
                }
            }

            let interval = self
                .poll_interval
                .unwrap_or(backoff)
                .max(self.min_interval);
            backoff = backoff.saturating_mul(2).min(MAX_BACKOFF);

            let now = Instant::now();
            if now >= deadline || deadline_after(now, interval) > deadline {
                sleep_until(deadline).await;
                return Err(self.timed_out(last_state, started));
            }
            sleep(interval).await;
        }
    }

    /// Invokes `op` until it succeeds, sharing the cadence and timeout of
    /// [`Self::wait`]. The first attempt runs at once, without the initial
    /// delay. Retryable errors are logged and retried; the first fatal error
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Refresh`] for fatal errors and
    /// [`WaitError::Timeout`] when the budget runs out.
    pub async fn retry<T, E, F, Fut>(&self, mut op: F) -> Result<T, WaitError<E>>
    where
        E: Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RefreshError<E>>>,
    {
        let waiter = Self {
            pending: BTreeSet::new(),
            target: BTreeSet::from([RETRY_DONE_STATE.to_owned()]),
            failed: BTreeSet::new(),
            delay: Duration::ZERO,
            gone_is_target: false,
            ..self.clone()
        };
        let outcome = waiter
            .wait(|| {
                let attempt = op();
                async move {
                    attempt
                        .await
                        .map(|value| Observation::present(value, RETRY_DONE_STATE))
                }
            })
            .await?;
        outcome.ok_or_else(|| WaitError::NotFound {
            operation: self.operation.clone(),
            checks: 0,
        })
    }

    fn expected_states(&self) -> Vec<String> {
        self.pending.union(&self.target).cloned().collect()
    }

    fn timed_out<E: Error + 'static>(
        &self,
        last_state: Option<String>,
        started: Instant,
    ) -> WaitError<E> {
        WaitError::Timeout {
            operation: self.operation.clone(),
            last_state,
            elapsed: started.elapsed(),
        }
    }
}

/// Adds `budget` to `start`, saturating at a far-future instant.
fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Classifies a client error for polling and retry loops.
///
/// Transient failures are always retryable. Lock conflicts (`403`/`409`) are
/// retryable only when `retry_locked` is set.
#[must_use]
pub fn classify(err: ClientError, retry_locked: bool) -> RefreshError<ClientError> {
    if err.is_transient() || (retry_locked && err.is_locked()) {
        RefreshError::Retryable(err)
    } else {
        RefreshError::Fatal(err)
    }
}

/// Maps the result of a status `GET` onto an [`Observation`]; `404` becomes
/// [`Observation::Gone`].
///
/// # Errors
///
/// Returns the [`classify`]d error for every other failure.
pub fn observe<T, S>(
    result: Result<T, ClientError>,
    retry_locked: bool,
    state_of: S,
) -> Result<Observation<T>, RefreshError<ClientError>>
where
    S: FnOnce(&T) -> String,
{
    match result {
        Ok(value) => {
            let state = state_of(&value);
            Ok(Observation::Present { value, state })
        }
        Err(err) if err.is_not_found() => Ok(Observation::Gone),
        Err(err) => Err(classify(err, retry_locked)),
    }
}
