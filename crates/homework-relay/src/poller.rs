//! The polling loop.
//!
//! Each cycle fetches statuses changed since the cursor, validates the
//! answer, translates the newest homework and notifies the chat when the
//! resulting message is new. Failures are forwarded to the same chat,
//! once per distinct message.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::homework::parse_status;
use crate::poll_state::{failure_message, PollState};
use crate::practicum::{check_response, HomeworkSource};
use crate::telegram::Notifier;

/// What a single cycle ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The API reported no status changes.
    NoUpdates,
    /// A new status message was delivered.
    Notified(String),
    /// The newest status matches the last delivered message.
    Unchanged,
    /// The status message could not be delivered; nothing was forwarded.
    DeliveryFailed,
    /// The cycle failed with a non-delivery error.
    Failed {
        /// The formatted failure message.
        message: String,
        /// Whether the message reached the chat during this cycle.
        reported: bool,
    },
}

/// Drives the fetch, validate, translate and notify cycle.
pub struct Poller<S, N> {
    source: S,
    notifier: N,
    state: PollState,
    retry_period: Duration,
}

impl<S, N> Poller<S, N>
where
    S: HomeworkSource,
    N: Notifier,
{
    /// Creates a poller starting from `state`.
    pub const fn new(source: S, notifier: N, state: PollState, retry_period: Duration) -> Self {
        Self {
            source,
            notifier,
            state,
            retry_period,
        }
    }

    /// The state carried between cycles.
    pub const fn state(&self) -> &PollState {
        &self.state
    }

    /// The delay between cycles.
    pub const fn retry_period(&self) -> Duration {
        self.retry_period
    }

    /// Runs one cycle and updates the state accordingly.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state.begin_cycle();
        debug!(cycle = self.state.cycles, cursor = self.state.cursor, "Starting cycle");

        match self.check_for_update().await {
            Ok(outcome) => {
                self.state.record_success();
                outcome
            }
            Err(e) if e.is_delivery() => {
                error!(error = %e, "Failed to deliver status message");
                self.state.record_delivery_failure();
                CycleOutcome::DeliveryFailed
            }
            Err(e) => {
                self.state.record_failure();
                let message = failure_message(&e);
                error!(phase = %self.state.phase, "{message}");
                let reported = self.report_failure(&message).await;
                CycleOutcome::Failed { message, reported }
            }
        }
    }

    /// Runs cycles forever, sleeping the retry period after each one.
    pub async fn run(&mut self) {
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.retry_period).await;
        }
    }

    async fn check_for_update(&mut self) -> Result<CycleOutcome> {
        let response = self.source.fetch(self.state.cursor).await?;
        let checked = check_response(response)?;

        let Some(homework) = checked.homeworks.first() else {
            debug!("No new statuses");
            return Ok(CycleOutcome::NoUpdates);
        };

        let message = parse_status(homework)?;
        if !self.state.is_new_message(&message) {
            debug!("Status unchanged since last notification");
            return Ok(CycleOutcome::Unchanged);
        }

        self.notifier.send_message(&message).await?;
        info!(cursor = checked.current_date, %message, "Status change delivered");
        self.state.record_delivered(message.clone(), checked.current_date);
        Ok(CycleOutcome::Notified(message))
    }

    /// Forwards a failure message unless it was already forwarded.
    async fn report_failure(&mut self, message: &str) -> bool {
        if !self.state.is_new_error(message) {
            debug!("Failure already reported, not repeating");
            return false;
        }

        match self.notifier.send_message(message).await {
            Ok(()) => {
                self.state.record_error_reported(message);
                true
            }
            Err(e) => {
                warn!(error = %e, "Could not forward failure to chat");
                false
            }
        }
    }
}

impl<S, N> std::fmt::Debug for Poller<S, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("state", &self.state)
            .field("retry_period", &self.retry_period)
            .finish_non_exhaustive()
    }
}
