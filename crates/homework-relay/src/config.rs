//! Configuration types for the homework relay.
//!
//! Configuration comes in two layers:
//! - [`Credentials`]: the three required secrets, read from the environment.
//! - [`Settings`]: tunables read from an optional `homework-relay.json`,
//!   every field falling back to a default.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::error::{RelayError, Result};

/// The default settings file name.
const CONFIG_FILE_NAME: &str = "homework-relay.json";

/// Environment variable holding the review API OAuth token.
pub const PRACTICUM_TOKEN_VAR: &str = "PRACTICUM_TOKEN";

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_TOKEN";

/// Environment variable holding the destination chat id.
pub const TELEGRAM_CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

/// Default review API endpoint.
fn default_endpoint() -> String {
    "https://practicum.yandex.ru/api/user_api/homework_statuses/".to_string()
}

/// Default Telegram Bot API base URL.
fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Default delay between polling cycles in seconds.
const fn default_retry_period() -> u64 {
    600
}

/// Default per-request timeout in seconds.
const fn default_request_timeout() -> u64 {
    30
}

// ============================================================================
// Credentials
// ============================================================================

/// The secrets the relay cannot start without.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// OAuth token for the review API.
    pub practicum_token: String,
    /// Bot token for the Telegram Bot API.
    pub telegram_token: String,
    /// Chat that receives every notification.
    pub telegram_chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

impl Credentials {
    /// Reads the credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::MissingToken` naming the first variable that is
    /// unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the credentials through an arbitrary variable lookup.
    ///
    /// Variables are checked in a fixed order so the reported name is
    /// deterministic.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    tracing::error!(variable = name, "Required token is missing");
                    RelayError::missing_token(name)
                })
        };

        Ok(Self {
            practicum_token: require(PRACTICUM_TOKEN_VAR)?,
            telegram_token: require(TELEGRAM_TOKEN_VAR)?,
            telegram_chat_id: require(TELEGRAM_CHAT_ID_VAR)?,
        })
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Tunable relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Review API endpoint polled every cycle.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Base URL of the Telegram Bot API.
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,

    /// Delay between polling cycles in seconds.
    #[serde(default = "default_retry_period")]
    pub retry_period: u64,

    /// Timeout applied to every outbound HTTP request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            telegram_api_url: default_telegram_api_url(),
            retry_period: default_retry_period(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Settings {
    /// Loads settings from `homework-relay.json` in the current directory.
    ///
    /// Falls back to defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            RelayError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads settings from `homework-relay.json` in the given directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads settings from a specific file path.
    ///
    /// If the file does not exist, returns default settings.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::ConfigParseError` if the file cannot be read or
    /// holds invalid JSON, and `RelayError::ConfigValidationError` if the
    /// values are out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                settings.validate()?;
                return Ok(settings);
            }
            Err(e) => {
                return Err(RelayError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let settings: Self = serde_json::from_str(&contents)
            .map_err(|e| RelayError::config_parse(path, e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings values.
    ///
    /// - `retry_period` and `request_timeout` must be greater than 0
    /// - `endpoint` and `telegram_api_url` must parse as http(s) URLs with a host
    pub fn validate(&self) -> Result<()> {
        if self.retry_period == 0 {
            return Err(RelayError::config_validation(
                "retryPeriod must be greater than 0",
                "Set retryPeriod to at least 1 second in your homework-relay.json",
            ));
        }

        if self.request_timeout == 0 {
            return Err(RelayError::config_validation(
                "requestTimeout must be greater than 0",
                "Set requestTimeout to at least 1 second in your homework-relay.json",
            ));
        }

        parse_http_url(&self.endpoint).map_err(|problem| {
            RelayError::config_validation(
                format!("endpoint '{}' {problem}", self.endpoint),
                "Provide the full review API URL as endpoint in your homework-relay.json",
            )
        })?;

        parse_http_url(&self.telegram_api_url).map_err(|problem| {
            RelayError::config_validation(
                format!("telegramApiUrl '{}' {problem}", self.telegram_api_url),
                "Use https://api.telegram.org or remove telegramApiUrl from your homework-relay.json",
            )
        })?;

        Ok(())
    }

    /// Delay between polling cycles.
    #[must_use]
    pub const fn retry_period(&self) -> Duration {
        Duration::from_secs(self.retry_period)
    }

    /// Timeout for each outbound HTTP request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Parses `value` as an absolute http(s) URL with a host.
///
/// On failure returns the problem, phrased to follow the offending value.
pub(crate) fn parse_http_url(value: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| format!("is not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("uses unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("has no host".to_string());
    }
    Ok(url)
}
