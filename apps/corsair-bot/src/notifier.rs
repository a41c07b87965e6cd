use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;

use corsair_core::Notifier;

/// Delivers workflow notifications through the bot itself.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user_id: i64, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(user_id), text).await?;
        Ok(())
    }
}
