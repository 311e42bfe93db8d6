//! Outcome and error notifications.
//!
//! Delivery is always best-effort: a broken notification channel is
//! logged and swallowed, never allowed to fail an attendance action.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::settings::UserSettings;

/// Delivery target for user-facing messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one message. Returns whether delivery succeeded.
    async fn send(&self, message: &str, is_error: bool) -> bool;
}

/// Telegram bot delivery. Degrades to a warned no-op when the bot token
/// or chat id is missing.
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
    enabled: bool,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, bot_token: &str, chat_id: &str) -> Self {
        let enabled = !bot_token.is_empty() && !chat_id.is_empty();
        if enabled {
            info!("Telegram notifications enabled");
        } else {
            info!("Telegram notifications disabled (missing bot token or chat id)");
        }
        Self {
            client,
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            enabled,
        }
    }

    pub fn from_settings(client: reqwest::Client, settings: &UserSettings) -> Self {
        Self::new(client, &settings.telegram_bot_token, &settings.telegram_chat_id)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, message: &str, _is_error: bool) -> bool {
        if !self.enabled {
            warn!("Cannot send notification: Telegram bot is not configured");
            return false;
        }

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "HTML",
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Telegram notification sent");
                true
            }
            Ok(response) => {
                let status = response.status();
                let description = response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("description").and_then(|d| d.as_str()).map(String::from))
                    .unwrap_or_else(|| status.to_string());
                error!("Telegram API error: {}", description);
                false
            }
            Err(e) => {
                error!("Failed to send Telegram notification: {}", e);
                false
            }
        }
    }
}

/// Log-only sink, for running without any chat integration.
pub struct ConsoleNotifier;

/// Pick the delivery channel for a user: Telegram when the bot is
/// configured, plain log output otherwise.
pub fn sink_for_settings(
    client: reqwest::Client,
    settings: &UserSettings,
) -> std::sync::Arc<dyn NotificationSink> {
    let telegram = TelegramNotifier::from_settings(client, settings);
    if telegram.is_enabled() {
        std::sync::Arc::new(telegram)
    } else {
        std::sync::Arc::new(ConsoleNotifier)
    }
}

#[async_trait]
impl NotificationSink for ConsoleNotifier {
    async fn send(&self, message: &str, is_error: bool) -> bool {
        if is_error {
            error!("{message}");
        } else {
            info!("{message}");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_telegram_is_a_no_op() {
        let notifier = TelegramNotifier::new(reqwest::Client::new(), "", "");
        assert!(!notifier.is_enabled());
        assert!(!notifier.send("hello", false).await);
    }

    #[tokio::test]
    async fn unconfigured_settings_fall_back_to_console_logging() {
        // The console sink always reports delivery, while a disabled
        // Telegram sink reports failure. That distinguishes the fallback.
        let settings = UserSettings::defaults("u1");
        let sink = sink_for_settings(reqwest::Client::new(), &settings);
        assert!(sink.send("hello", false).await);
    }

    #[test]
    fn enabling_requires_both_fields() {
        let client = reqwest::Client::new();
        assert!(!TelegramNotifier::new(client.clone(), "token", "").is_enabled());
        assert!(!TelegramNotifier::new(client.clone(), "", "chat").is_enabled());
        assert!(TelegramNotifier::new(client, "token", "chat").is_enabled());
    }
}
