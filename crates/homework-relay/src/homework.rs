//! Homework records and their translation into chat messages.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{RelayError, Result};

/// Review outcome reported by the API for a single homework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeworkStatus {
    /// The reviewer accepted the work.
    Approved,
    /// The work was picked up for review.
    Reviewing,
    /// The reviewer sent the work back with remarks.
    Rejected,
}

impl HomeworkStatus {
    /// Human-readable verdict for this status.
    #[must_use]
    pub const fn verdict(&self) -> &'static str {
        match self {
            Self::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            Self::Reviewing => "Работа взята на проверку ревьюером.",
            Self::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Reviewing => write!(f, "reviewing"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for HomeworkStatus {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approved" => Ok(Self::Approved),
            "reviewing" => Ok(Self::Reviewing),
            "rejected" => Ok(Self::Rejected),
            other => Err(RelayError::unknown_status(other)),
        }
    }
}

/// A homework entry extracted from the API answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Homework {
    /// Name of the submitted work.
    pub name: String,
    /// Its current review status.
    pub status: HomeworkStatus,
}

impl Homework {
    /// Extracts a homework from one element of the `homeworks` sequence.
    ///
    /// # Errors
    ///
    /// - `RelayError::Shape` if the element is not an object, or
    ///   `homework_name`/`status` is missing, or the name is not a string.
    /// - `RelayError::UnknownStatus` if `status` is not a known verdict.
    pub fn from_value(value: &Value) -> Result<Self> {
        let record = value
            .as_object()
            .ok_or_else(|| RelayError::shape("homework entry is not an object"))?;

        let name = record
            .get("homework_name")
            .ok_or_else(|| RelayError::shape("homework entry has no 'homework_name' key"))?;
        let status = record
            .get("status")
            .ok_or_else(|| RelayError::shape("homework entry has no 'status' key"))?;

        let name = name
            .as_str()
            .ok_or_else(|| RelayError::shape("'homework_name' is not a string"))?;
        let status = match status {
            Value::String(s) => s.parse::<HomeworkStatus>()?,
            other => return Err(RelayError::unknown_status(other.to_string())),
        };

        Ok(Self {
            name: name.to_string(),
            status,
        })
    }

    /// The chat message announcing this homework's status.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Изменился статус проверки работы \"{}\". {}",
            self.name,
            self.status.verdict()
        )
    }
}

/// Translates a raw homework entry into its notification text.
pub fn parse_status(homework: &Value) -> Result<String> {
    let homework = Homework::from_value(homework).map_err(|e| {
        tracing::error!(error = %e, "Cannot translate homework status");
        e
    })?;
    Ok(homework.message())
}
