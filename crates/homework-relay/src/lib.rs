//! Homework status relay
//!
//! Polls the homework review API, turns the newest status change into a
//! chat message and delivers it through the Telegram Bot API.

pub mod config;
pub mod error;
pub mod homework;
pub mod poll_state;
pub mod poller;
pub mod practicum;
pub mod telegram;

pub use config::{
    Credentials, Settings, PRACTICUM_TOKEN_VAR, TELEGRAM_CHAT_ID_VAR, TELEGRAM_TOKEN_VAR,
};
pub use error::{RelayError, Result};
pub use homework::{parse_status, Homework, HomeworkStatus};
pub use poll_state::{failure_message, PollPhase, PollState, FAILURE_PREFIX};
pub use poller::{CycleOutcome, Poller};
pub use practicum::{check_response, CheckedResponse, HomeworkSource, PracticumClient};
pub use telegram::{Notifier, TelegramNotifier};
