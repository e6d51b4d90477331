//! Telegram adapter (teloxide).
//!
//! Implements the `sweep-core` Notifier over the Telegram Bot API and routes
//! operator commands into `ChatControl`.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use sweep_core::{
    errors::Error,
    formatting::escape_html,
    notify::{NoticeAction, NoticeId, Notifier, NotifyOptions},
    Result,
};

/// Delivers notices as bot messages to one operator chat.
///
/// Actions become inline buttons; dismissing a notice deletes its message.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: teloxide::types::ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: teloxide::types::ChatId(chat_id),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

pub(crate) fn keyboard(actions: &[NoticeAction]) -> InlineKeyboardMarkup {
    let row: Vec<InlineKeyboardButton> = actions
        .iter()
        .map(|a| InlineKeyboardButton::callback(a.label.clone(), a.callback.clone()))
        .collect();
    InlineKeyboardMarkup::new(vec![row])
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str, opts: NotifyOptions) -> Result<NoticeId> {
        let html = escape_html(text);
        let msg = if opts.actions.is_empty() {
            self.with_retry(|| {
                self.bot
                    .send_message(self.chat_id, html.clone())
                    .parse_mode(ParseMode::Html)
            })
            .await?
        } else {
            let markup = keyboard(&opts.actions);
            self.with_retry(|| {
                self.bot
                    .send_message(self.chat_id, html.clone())
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup.clone())
            })
            .await?
        };
        tracing::debug!(message_id = msg.id.0, persistent = opts.persistent, "notice sent");
        Ok(NoticeId(i64::from(msg.id.0)))
    }

    async fn dismiss(&self, id: NoticeId) -> Result<()> {
        let message_id = i32::try_from(id.0)
            .map_err(|_| Error::External(format!("notice id out of range: {}", id.0)))?;
        self.with_retry(|| {
            self.bot
                .delete_message(self.chat_id, teloxide::types::MessageId(message_id))
        })
        .await?;
        Ok(())
    }
}
