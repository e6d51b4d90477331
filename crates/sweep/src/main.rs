use std::sync::Arc;

use teloxide::Bot;

use sweep_core::{
    actions::{ChatControl, ControlSettings},
    config::Config,
    directory::RemoteDirectory,
    remote::{http::HttpTransport, port::RemoteChatService, tdjson::TdJsonRemote},
};
use sweep_telegram::{router::AppState, TelegramNotifier};

#[tokio::main]
async fn main() -> Result<(), sweep_core::Error> {
    sweep_core::logging::init("sweep")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        bridge = %cfg.bridge_url,
        operators = cfg.telegram_allowed_users.len(),
        "starting sweep"
    );

    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let notifier = Arc::new(TelegramNotifier::new(bot.clone(), cfg.notify_chat_id));

    let transport = HttpTransport::new(cfg.bridge_url.clone(), cfg.bridge_timeout)?;
    let remote: Arc<dyn RemoteChatService> = Arc::new(TdJsonRemote::new(transport));
    let directory = Arc::new(RemoteDirectory::new(remote.clone()));

    let control = ChatControl::new(
        remote,
        directory,
        notifier,
        ControlSettings {
            undo_window: cfg.undo_window,
            purge: cfg.purge,
            broadcast: cfg.broadcast,
        },
    );

    let state = Arc::new(AppState { cfg, control });

    sweep_telegram::router::run_polling(bot, state)
        .await
        .map_err(|e| sweep_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
