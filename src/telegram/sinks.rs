//! Telegram response sinks for the force-remove flow.
#![allow(dead_code)]
//!
//! Two implementations of one contract: `DirectSink` replies with fresh
//! messages (text-command style), `DeferredSink` edits a single
//! acknowledgment message in place (callback style). The orchestration
//! never sees the difference.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};

use crate::core::forceremove::{prompt_text, Reply, ReplyKind, ResponseSink};
use crate::core::roster::Member;
use crate::error::{Error, Result};

/// Callback-data prefix for disambiguation selections.
pub const SELECT_PREFIX: &str = "sel";

fn tg_err(e: teloxide::RequestError) -> Error {
    Error::Telegram(e.to_string())
}

/// Keyboard with one numbered button per candidate and a cancel row.
pub fn choice_keyboard(correlation_id: &str, candidates: usize) -> InlineKeyboardMarkup {
    let numbers: Vec<InlineKeyboardButton> = (0..candidates)
        .map(|i| {
            InlineKeyboardButton::callback(
                i.to_string(),
                format!("{}:{}:{}", SELECT_PREFIX, correlation_id, i),
            )
        })
        .collect();

    let cancel = vec![InlineKeyboardButton::callback(
        "Cancel",
        format!("{}:{}:cancel", SELECT_PREFIX, correlation_id),
    )];

    InlineKeyboardMarkup::new(vec![numbers, cancel])
}

/// Delete a message after a delay, ignoring failures.
fn retract_later(bot: Bot, chat_id: ChatId, message_id: MessageId, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = bot.delete_message(chat_id, message_id).await {
            tracing::debug!("Could not retract cancel acknowledgment: {}", e);
        }
    });
}

/// Replies as fresh messages in the invoking chat.
pub struct DirectSink {
    bot: Bot,
    chat_id: ChatId,
    cancel_ack_delay: Duration,
    /// The prompt message sent by this invocation, if any; its keyboard is
    /// removed once the prompt resolves so stale buttons disappear.
    prompt_message: std::sync::Mutex<Option<MessageId>>,
}

impl DirectSink {
    pub fn new(bot: Bot, chat_id: ChatId, cancel_ack_delay: Duration) -> Self {
        Self {
            bot,
            chat_id,
            cancel_ack_delay,
            prompt_message: std::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl ResponseSink for DirectSink {
    async fn report(&self, reply: Reply) -> Result<()> {
        let sent = self
            .bot
            .send_message(self.chat_id, reply.text)
            .await
            .map_err(tg_err)?;

        if reply.kind == ReplyKind::Cancelled {
            retract_later(self.bot.clone(), self.chat_id, sent.id, self.cancel_ack_delay);
        }
        Ok(())
    }

    async fn prompt_choices(&self, correlation_id: &str, candidates: &[Member]) -> Result<()> {
        let sent = self
            .bot
            .send_message(self.chat_id, prompt_text(candidates))
            .reply_markup(choice_keyboard(correlation_id, candidates.len()))
            .await
            .map_err(tg_err)?;
        *self.prompt_message.lock().unwrap() = Some(sent.id);
        Ok(())
    }

    async fn close_prompt(&self) {
        let message_id = self.prompt_message.lock().unwrap().take();
        if let Some(message_id) = message_id {
            // Editing the markup away without supplying one removes it.
            if let Err(e) = self
                .bot
                .edit_message_reply_markup(self.chat_id, message_id)
                .await
            {
                tracing::debug!("Could not retire prompt keyboard: {}", e);
            }
        }
    }
}

/// Edits one acknowledgment message in place.
pub struct DeferredSink {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
    cancel_ack_delay: Duration,
}

impl DeferredSink {
    pub fn new(
        bot: Bot,
        chat_id: ChatId,
        message_id: MessageId,
        cancel_ack_delay: Duration,
    ) -> Self {
        Self {
            bot,
            chat_id,
            message_id,
            cancel_ack_delay,
        }
    }
}

#[async_trait]
impl ResponseSink for DeferredSink {
    async fn report(&self, reply: Reply) -> Result<()> {
        self.bot
            .edit_message_text(self.chat_id, self.message_id, reply.text)
            .await
            .map_err(tg_err)?;

        if reply.kind == ReplyKind::Cancelled {
            retract_later(
                self.bot.clone(),
                self.chat_id,
                self.message_id,
                self.cancel_ack_delay,
            );
        }
        Ok(())
    }

    async fn prompt_choices(&self, correlation_id: &str, candidates: &[Member]) -> Result<()> {
        self.bot
            .edit_message_text(self.chat_id, self.message_id, prompt_text(candidates))
            .reply_markup(choice_keyboard(correlation_id, candidates.len()))
            .await
            .map_err(tg_err)?;
        Ok(())
    }

    async fn close_prompt(&self) {
        // On expiry no further edit follows, so the keyboard must go here;
        // on selection or cancel the subsequent edit replaces it anyway.
        if let Err(e) = self
            .bot
            .edit_message_reply_markup(self.chat_id, self.message_id)
            .await
        {
            tracing::debug!("Could not retire prompt keyboard: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_keyboard_layout() {
        let keyboard = choice_keyboard("01ARZ3NDEKTSV4RRFFQ69G5FAV", 4);

        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0].len(), 4);
        assert_eq!(keyboard.inline_keyboard[1].len(), 1);
        assert_eq!(keyboard.inline_keyboard[1][0].text, "Cancel");
    }
}
