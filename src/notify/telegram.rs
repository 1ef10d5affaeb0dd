// src/notify/telegram.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ChannelProfile, Notifier};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SENDMSG_MAX_LEN: usize = 4096;
const PARSE_MODE_HTML: &str = "HTML";

/// Telegram Bot API binding: one `sendMessage` HTTP POST per entry and
/// destination, HTML parse mode. A destination is a chat id.
pub struct TelegramNotifier {
    token: String,
    client: Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.token)
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn profile(&self) -> ChannelProfile {
        ChannelProfile {
            max_message_len: SENDMSG_MAX_LEN,
            line_break: "\n",
        }
    }

    async fn post(&self, destination: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": destination,
            "text": text,
            "parse_mode": PARSE_MODE_HTML,
        });

        // The URL embeds the bot token; log the chat id only.
        debug!(chat_id = destination, len = text.len(), "sendMessage");

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("telegram request")?;

        let parsed: TelegramResponse = response
            .json()
            .await
            .context("telegram response decode")?;
        if !parsed.ok {
            bail!(
                "telegram rejected message: {}",
                parsed.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        Ok(())
    }
}
