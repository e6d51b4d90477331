use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use sweep_core::{actions::ChatControl, config::Config};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub control: ChatControl,
}

pub async fn run_polling(bot: Bot, state: Arc<AppState>) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "bot started"),
        Err(e) => tracing::warn!(error = %e, "getMe failed"),
    }
    tracing::info!(
        allowed_users = state.cfg.telegram_allowed_users.len(),
        notify_chat = state.cfg.notify_chat_id,
        undo_window_ms = state.cfg.undo_window.as_millis() as u64,
        "operator surface ready"
    );

    // Surface busy/idle transitions of deferred actions in the log.
    let mut updates = state.control.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => tracing::debug!(
                    key = %update.key,
                    in_progress = update.in_progress,
                    "action state"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "action updates lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
