use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::TelegramConfig;

/// Fire-and-forget run notifications through the Telegram bot API.
///
/// Delivery failures are logged and swallowed: a run never fails
/// because a message did not go out. With no `telegram` section in the
/// config the notifier is a no-op.
pub struct Notifier {
    client: Client,
    config: Option<TelegramConfig>,
}

impl Notifier {
    pub fn new(config: Option<TelegramConfig>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub async fn send(&self, text: &str) {
        let Some(config) = &self.config else {
            debug!("notifications disabled, skipping message");
            return;
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", config.bot_token);
        let payload = json!({
            "chat_id": config.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("notification sent ({} chars)", text.len());
            }
            Ok(response) => {
                warn!(status = %response.status(), "notification rejected by Telegram");
            }
            Err(e) => {
                warn!(error = %e, "failed to deliver notification");
            }
        }
    }
}

/// Escape the characters Telegram's Markdown parser treats specially.
pub fn escape_markdown(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
        '\\',
    ];
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
