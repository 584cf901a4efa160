//! Review API client and response validation.
//!
//! The API is polled with `from_date=<cursor>` and answers with
//! `{"homeworks": [...], "current_date": <unix seconds>}`, newest homework first.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{RelayError, Result};

/// Anything that can answer a status query for a given cursor.
#[async_trait]
pub trait HomeworkSource: Send + Sync {
    /// Fetches the raw API answer for statuses changed since `from_date`.
    async fn fetch(&self, from_date: i64) -> Result<Value>;
}

/// HTTP client for the homework status endpoint.
#[derive(Clone)]
pub struct PracticumClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl PracticumClient {
    /// Builds a client whose every request is bounded by `timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::network(&endpoint, format!("cannot build client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            token: token.into(),
        })
    }
}

#[async_trait]
impl HomeworkSource for PracticumClient {
    async fn fetch(&self, from_date: i64) -> Result<Value> {
        tracing::debug!(endpoint = %self.endpoint, from_date, "Requesting homework statuses");

        let resp = self
            .http
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .send()
            .await
            .map_err(|e| RelayError::network(&self.endpoint, e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::error!(status = status.as_u16(), endpoint = %self.endpoint, "Unexpected response code");
            return Err(RelayError::http_status(&self.endpoint, status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| RelayError::network(&self.endpoint, e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| RelayError::parse(e.to_string()))
    }
}

/// A response that passed shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedResponse {
    /// The `homeworks` sequence, untouched.
    pub homeworks: Vec<Value>,
    /// Server time to use as the next cursor.
    pub current_date: i64,
}

/// Validates the structure of an API answer.
///
/// # Errors
///
/// Returns `RelayError::Shape` if the answer is not an object, `homeworks`
/// is missing or not an array, or `current_date` is missing or not an integer.
pub fn check_response(response: Value) -> Result<CheckedResponse> {
    let Value::Object(mut answer) = response else {
        return Err(shape_error("response is not a JSON object"));
    };

    let homeworks = match answer.remove("homeworks") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(shape_error("'homeworks' is not a list")),
        None => return Err(shape_error("response has no 'homeworks' key")),
    };

    let current_date = match answer.get("current_date") {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| shape_error("'current_date' is not an integer"))?,
        None => return Err(shape_error("response has no 'current_date' key")),
    };

    Ok(CheckedResponse {
        homeworks,
        current_date,
    })
}

fn shape_error(message: &str) -> RelayError {
    tracing::error!(problem = message, "Malformed API response");
    RelayError::shape(message)
}
