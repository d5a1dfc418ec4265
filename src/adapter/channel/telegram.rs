//! Telegram notification channel.
//!
//! Sends glitch alerts to the subscriber's Telegram chat. Requires the
//! `telegram` feature and a bot token in `TELEGRAM_BOT_TOKEN`.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use super::format::format_glitch_markdown;
use crate::domain::{ConfirmedGlitch, Subscriber};
use crate::error::{Error, Result};
use crate::port::channel::NotificationChannel;

/// Telegram channel sharing one bot across all recipients.
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    #[must_use]
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot: Bot::new(bot_token),
        }
    }

    /// Create the channel from the `TELEGRAM_BOT_TOKEN` environment
    /// variable. Returns `None` when unset; the channel is simply not
    /// wired in.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .map(|token| Self::new(&token))
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> &'static str {
        "telegram"
    }

    fn target_for(&self, subscriber: &Subscriber) -> Option<String> {
        subscriber.targets.telegram_chat_id.map(|id| id.to_string())
    }

    async fn send(&self, glitch: &ConfirmedGlitch, target: &str) -> Result<String> {
        let chat_id: i64 = target
            .parse()
            .map_err(|_| Error::ChannelSend(format!("invalid telegram chat id '{target}'")))?;

        let message = self
            .bot
            .send_message(ChatId(chat_id), format_glitch_markdown(glitch))
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map_err(|e| Error::ChannelSend(e.to_string()))?;

        Ok(message.id.0.to_string())
    }
}
