//! Telegram update handlers.
//!
//! Every handler checks the operator allow-list first, then turns the update
//! into a `ChatControl` call. Workflow outcomes and errors reach the operator
//! through the notifier, so handlers reply only with what it does not cover.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use sweep_core::domain::UserId;
use sweep_core::security::is_authorized;

use crate::router::AppState;

mod callback;
mod commands;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0);

    if !is_authorized(
        user_id.map(|id| UserId(id as i64)),
        &state.cfg.telegram_allowed_users,
    ) {
        let _ = bot
            .send_message(
                msg.chat.id,
                "Unauthorized. Contact the bot owner for access.",
            )
            .await;
        return Ok(());
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(bot, msg, state).await;
        }
    }

    let _ = bot
        .send_message(msg.chat.id, "Send /help for the list of commands.")
        .await;
    Ok(())
}
