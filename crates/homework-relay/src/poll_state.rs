//! Poll state types for the homework relay.
//!
//! This module defines the in-memory state carried between polling cycles:
//! the API cursor, the last delivered status message and the last
//! forwarded failure. Nothing here is persisted; every run starts fresh.

use chrono::{DateTime, Utc};

/// Prefix of every failure message forwarded to the chat.
pub const FAILURE_PREFIX: &str = "Сбой в работе программы";

// ============================================================================
// PollPhase
// ============================================================================

/// Phase of the polling loop.
///
/// Both phases run the same cycle body; the phase only records whether
/// the previous cycle succeeded.
/// - `Polling` -> `Polling` (cycle succeeded)
/// - `Polling` -> `Backoff` (cycle failed)
/// - `Backoff` -> `Polling` (cycle succeeded again)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollPhase {
    /// Last cycle completed without error.
    #[default]
    Polling,
    /// Last cycle failed; waiting out the period before retrying.
    Backoff,
}

impl std::fmt::Display for PollPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Polling => write!(f, "polling"),
            Self::Backoff => write!(f, "backoff"),
        }
    }
}

// ============================================================================
// PollState
// ============================================================================

/// State carried between polling cycles.
#[derive(Debug, Clone)]
pub struct PollState {
    /// Current phase of the loop.
    pub phase: PollPhase,

    /// Unix timestamp sent as `from_date` on the next request.
    pub cursor: i64,

    /// Last status message delivered to the chat (empty before the first).
    pub last_message: String,

    /// Last failure message forwarded to the chat (empty when healthy).
    pub last_error: String,

    /// Number of cycles run so far.
    pub cycles: u64,

    /// When the relay started.
    pub started_at: DateTime<Utc>,

    /// When the state last changed.
    pub updated_at: DateTime<Utc>,
}

impl PollState {
    /// Creates a fresh state whose cursor starts at `cursor`.
    ///
    /// # Examples
    ///
    /// ```
    /// use homework_relay::{PollPhase, PollState};
    ///
    /// let state = PollState::new(1_700_000_000);
    /// assert_eq!(state.phase, PollPhase::Polling);
    /// assert_eq!(state.cursor, 1_700_000_000);
    /// assert!(state.last_message.is_empty());
    /// assert!(state.last_error.is_empty());
    /// ```
    #[must_use]
    pub fn new(cursor: i64) -> Self {
        let now = Utc::now();
        Self {
            phase: PollPhase::Polling,
            cursor,
            last_message: String::new(),
            last_error: String::new(),
            cycles: 0,
            started_at: now,
            updated_at: now,
        }
    }

    /// Creates a fresh state whose cursor is the current time.
    #[must_use]
    pub fn starting_now() -> Self {
        Self::new(Utc::now().timestamp())
    }

    /// Updates the `updated_at` timestamp to the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Marks the start of a new cycle.
    pub fn begin_cycle(&mut self) {
        self.cycles += 1;
        self.touch();
    }

    /// Returns `true` if `message` differs from the last delivered one.
    #[must_use]
    pub fn is_new_message(&self, message: &str) -> bool {
        self.last_message != message
    }

    /// Records a delivered status message and advances the cursor.
    pub fn record_delivered(&mut self, message: impl Into<String>, current_date: i64) {
        self.last_message = message.into();
        self.cursor = current_date;
        self.touch();
    }

    /// Records a cycle that completed without error.
    ///
    /// Clears the remembered failure so a recurrence is reported again.
    pub fn record_success(&mut self) {
        self.phase = PollPhase::Polling;
        self.last_error.clear();
        self.touch();
    }

    /// Records a status message that could not be delivered.
    ///
    /// The cursor and last message stay put so the status is retried, and
    /// the remembered failure is cleared so a recurrence is reported again.
    pub fn record_delivery_failure(&mut self) {
        self.phase = PollPhase::Backoff;
        self.last_error.clear();
        self.touch();
    }

    /// Records a failed cycle.
    pub fn record_failure(&mut self) {
        self.phase = PollPhase::Backoff;
        self.touch();
    }

    /// Returns `true` if `message` has not been forwarded yet.
    #[must_use]
    pub fn is_new_error(&self, message: &str) -> bool {
        self.last_error != message
    }

    /// Records a failure message that reached the chat.
    pub fn record_error_reported(&mut self, message: impl Into<String>) {
        self.last_error = message.into();
        self.touch();
    }

    /// Returns the duration since the relay started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

/// Formats an error into the text forwarded to the chat.
#[must_use]
pub fn failure_message(error: &impl std::fmt::Display) -> String {
    format!("{FAILURE_PREFIX}: {error}")
}
