//! Chat notification delivery through the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::parse_http_url;
use crate::error::{RelayError, Result};

/// Destination for relay notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `text` to the configured chat.
    async fn send_message(&self, text: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Envelope of every Bot API reply.
#[derive(Debug, Deserialize)]
struct BotApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages to a single chat via `sendMessage`.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    send_url: Url,
    chat_id: String,
}

impl TelegramNotifier {
    /// Builds a notifier for `chat_id` using the bot identified by `token`.
    ///
    /// `api_url` may carry a path prefix; `bot<token>/sendMessage` is
    /// appended to it.
    pub fn new(
        api_url: &str,
        token: &str,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::delivery(format!("cannot build client: {e}")))?;
        let send_url = send_message_url(api_url, token)?;
        Ok(Self {
            http,
            send_url,
            chat_id: chat_id.into(),
        })
    }
}

/// Joins `bot<token>/sendMessage` onto the Bot API base URL.
fn send_message_url(api_url: &str, token: &str) -> Result<Url> {
    let invalid = |problem: String| {
        RelayError::config_validation(
            format!("telegramApiUrl '{api_url}' {problem}"),
            "Use https://api.telegram.org or remove telegramApiUrl from your homework-relay.json",
        )
    };

    let mut base = parse_http_url(api_url).map_err(invalid)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    // Leading "./" keeps the "bot<id>:" part of the token from reading as a scheme.
    base.join(&format!("./bot{token}/sendMessage"))
        .map_err(|e| invalid(format!("cannot take the sendMessage path: {e}")))
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
        };

        // The URL embeds the bot token, so reqwest errors are stripped of it.
        let resp = self
            .http
            .post(self.send_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::delivery(e.without_url().to_string()))?;

        let status = resp.status();
        let reply: Option<BotApiReply> = resp.json().await.ok();

        match reply {
            Some(BotApiReply { ok: true, .. }) if status.is_success() => {
                tracing::debug!(chat_id = %self.chat_id, text, "Message delivered");
                Ok(())
            }
            Some(BotApiReply { description, .. }) => {
                let description = description.unwrap_or_else(|| "no description".to_string());
                tracing::error!(status = status.as_u16(), %description, "Telegram rejected message");
                Err(RelayError::delivery(format!(
                    "Bot API answered {}: {description}",
                    status.as_u16()
                )))
            }
            None => {
                tracing::error!(status = status.as_u16(), "Unreadable Telegram reply");
                Err(RelayError::delivery(format!(
                    "Bot API answered {} with an unreadable body",
                    status.as_u16()
                )))
            }
        }
    }
}
