use std::sync::Arc;

use teloxide::prelude::*;

use sweep_core::{deferred::ActionKey, domain::UserId, security::is_authorized};

use crate::router::AppState;

use super::commands::{parse_menu_callback, spawn_workflow};

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let cb_id = q.id.clone();
    let reply_chat = q.message.as_ref().map(|m| m.chat.id);
    let data = q.data.clone().unwrap_or_default();

    if !is_authorized(
        Some(UserId(q.from.id.0 as i64)),
        &state.cfg.telegram_allowed_users,
    ) {
        let _ = bot.answer_callback_query(cb_id).text("Unauthorized").await;
        return Ok(());
    }

    if let Some(key) = ActionKey::parse_undo_callback(&data) {
        let cancelled = state.control.undo(key).await;
        tracing::info!(%key, cancelled, "undo pressed");
        let text = if cancelled { "Cancelled" } else { "Too late to undo" };
        let _ = bot.answer_callback_query(cb_id).text(text).await;
        return Ok(());
    }

    if let Some((chat, workflow)) = parse_menu_callback(&data) {
        let _ = bot.answer_callback_query(cb_id).text("Working...").await;
        spawn_workflow(bot, reply_chat, state, chat, workflow);
        return Ok(());
    }

    // Stale or foreign button.
    tracing::debug!(data = %data, "unknown callback");
    let _ = bot.answer_callback_query(cb_id).await;
    Ok(())
}
