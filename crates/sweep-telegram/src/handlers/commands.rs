use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use sweep_core::{
    actions::{notice_for, MenuCapabilities},
    deferred::Phase,
    domain::{ChatId, MessageId, UserId},
    formatting::escape_html,
};

use crate::router::AppState;

const MENU_PREFIX: &str = "menu:";

pub(super) fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// A chat workflow the operator can trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Workflow {
    PurgeMine,
    PurgeAll,
    PurgeUser(UserId),
    KickAll,
    TagAdmins(Option<MessageId>),
    TagEveryone(Option<MessageId>),
    Leave,
    ClearHistory,
}

impl Workflow {
    fn name(self) -> &'static str {
        match self {
            Workflow::PurgeMine => "purge_mine",
            Workflow::PurgeAll => "purge_all",
            Workflow::PurgeUser(_) => "purge_user",
            Workflow::KickAll => "kick_all",
            Workflow::TagAdmins(_) => "tag_admins",
            Workflow::TagEveryone(_) => "tag_everyone",
            Workflow::Leave => "leave",
            Workflow::ClearHistory => "clear_history",
        }
    }
}

/// `None` if `cmd` is not a workflow command; `Some(Err(usage))` on bad arguments.
pub(super) fn parse_workflow(cmd: &str, args: &str) -> Option<Result<(ChatId, Workflow), String>> {
    let usage = match cmd {
        "purge_mine" | "purge_all" | "kick_all" | "leave" | "clear_history" => {
            format!("Usage: /{cmd} <chat_id>")
        }
        "purge_user" => "Usage: /purge_user <chat_id> <user_id>".to_string(),
        "tag_admins" | "tag_everyone" => format!("Usage: /{cmd} <chat_id> [reply_to]"),
        _ => return None,
    };

    let mut it = args.split_whitespace();
    let Some(chat) = it.next().and_then(|s| s.parse::<i64>().ok()) else {
        return Some(Err(usage));
    };
    let extra = it.next();
    if it.next().is_some() {
        return Some(Err(usage));
    }

    // Operators pass the message number shown in its link.
    let reply_to = || match extra.map(|s| s.parse::<i64>()) {
        None => Ok(None),
        Some(Ok(n)) if n > 0 => Ok(Some(MessageId::from_sequence(n))),
        Some(_) => Err(()),
    };

    let workflow = match (cmd, extra) {
        ("purge_mine", None) => Workflow::PurgeMine,
        ("purge_all", None) => Workflow::PurgeAll,
        ("kick_all", None) => Workflow::KickAll,
        ("leave", None) => Workflow::Leave,
        ("clear_history", None) => Workflow::ClearHistory,
        ("tag_admins", _) => match reply_to() {
            Ok(r) => Workflow::TagAdmins(r),
            Err(()) => return Some(Err(usage)),
        },
        ("tag_everyone", _) => match reply_to() {
            Ok(r) => Workflow::TagEveryone(r),
            Err(()) => return Some(Err(usage)),
        },
        ("purge_user", Some(user)) => match user.parse::<i64>() {
            Ok(user) => Workflow::PurgeUser(UserId(user)),
            Err(_) => return Some(Err(usage)),
        },
        _ => return Some(Err(usage)),
    };

    Some(Ok((ChatId(chat), workflow)))
}

pub(super) fn parse_menu_callback(data: &str) -> Option<(ChatId, Workflow)> {
    let rest = data.strip_prefix(MENU_PREFIX)?;
    let (name, chat) = rest.split_once(':')?;
    parse_workflow(name, chat)?.ok()
}

fn menu_callback(chat: ChatId, workflow: Workflow) -> String {
    format!("{MENU_PREFIX}{}:{}", workflow.name(), chat)
}

/// Buttons offered for a chat, as `(label, callback data)`.
pub(super) fn menu_entries(chat: ChatId, caps: &MenuCapabilities) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut add = |enabled: bool, label: &str, workflow: Workflow| {
        if enabled {
            out.push((label.to_string(), menu_callback(chat, workflow)));
        }
    };
    add(caps.delete_my_messages, "Delete my messages", Workflow::PurgeMine);
    add(caps.delete_all_messages, "Delete all messages", Workflow::PurgeAll);
    add(caps.remove_all_members, "Remove all members", Workflow::KickAll);
    add(caps.tag_members, "Tag admins", Workflow::TagAdmins(None));
    add(caps.tag_members, "Tag everyone", Workflow::TagEveryone(None));
    add(caps.clear_history, "Clear history", Workflow::ClearHistory);
    add(true, caps.leave_label, Workflow::Leave);
    out
}

fn menu_keyboard(chat: ChatId, caps: &MenuCapabilities) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = menu_entries(chat, caps)
        .into_iter()
        .map(|(label, data)| vec![InlineKeyboardButton::callback(label, data)])
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Run a workflow in the background; the dispatcher keeps serving updates.
pub(super) fn spawn_workflow(
    bot: Bot,
    reply_chat: Option<teloxide::types::ChatId>,
    state: Arc<AppState>,
    chat: ChatId,
    workflow: Workflow,
) {
    tokio::spawn(async move {
        tracing::info!(chat_id = chat.0, workflow = workflow.name(), "workflow requested");
        let Some(reply) = run_workflow(&state, chat, workflow).await else {
            return;
        };
        if let Some(reply_chat) = reply_chat {
            let _ = bot.send_message(reply_chat, reply).await;
        }
    });
}

/// Outcomes and failures are reported by the notifier; only what it does
/// not cover is returned as a reply.
async fn run_workflow(state: &AppState, chat: ChatId, workflow: Workflow) -> Option<String> {
    let control = &state.control;
    match workflow {
        Workflow::PurgeMine => {
            let _ = control.delete_my_messages(chat).await;
            None
        }
        Workflow::PurgeUser(user) => {
            let _ = control.delete_user_messages(chat, user).await;
            None
        }
        Workflow::PurgeAll => {
            let _ = control.delete_all_messages(chat).await;
            None
        }
        Workflow::KickAll => {
            let _ = control.remove_all_members(chat).await;
            None
        }
        Workflow::Leave => {
            let _ = control.leave_chat(chat).await;
            None
        }
        Workflow::ClearHistory => {
            let _ = control.clear_history(chat).await;
            None
        }
        Workflow::TagAdmins(reply_to) => control
            .tag_admins(chat, reply_to)
            .await
            .ok()
            .filter(|r| r.message.is_some())
            .map(|r| format!("Mentioned {} users.", r.mentioned)),
        Workflow::TagEveryone(reply_to) => control
            .tag_everyone(chat, reply_to)
            .await
            .ok()
            .filter(|r| r.message.is_some())
            .map(|r| format!("Mentioned {} users.", r.mentioned)),
    }
}

const HELP: &str = "🧹 <b>Chat sweeper</b>\n\n\
<b>📋 Commands:</b>\n\
/menu &lt;chat&gt; - Actions available in a chat\n\
/purge_mine &lt;chat&gt; - Delete your own messages\n\
/purge_user &lt;chat&gt; &lt;user&gt; - Delete one user's messages\n\
/purge_all &lt;chat&gt; - Delete the whole history (undoable for a few seconds)\n\
/kick_all &lt;chat&gt; - Remove every non-admin member (undoable)\n\
/tag_admins &lt;chat&gt; [reply_to] - Mention all admins\n\
/tag_everyone &lt;chat&gt; [reply_to] - Mention every member (small groups only)\n\
/clear_history &lt;chat&gt; - Clear history, keep the chat (undoable)\n\
/leave &lt;chat&gt; - Leave or delete the chat (undoable)\n\
/pending - Actions waiting or running\n\n\
<b>💡 Tips:</b>\n\
• Press <b>Undo</b> on a notice to cancel before it runs\n\
• <code>reply_to</code> is the message number from its link";

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, arg) = parse_command(text);

    if let Some(parsed) = parse_workflow(&cmd, &arg) {
        match parsed {
            Ok((chat, workflow)) => {
                spawn_workflow(bot, Some(msg.chat.id), state, chat, workflow);
            }
            Err(usage) => {
                let _ = bot.send_message(msg.chat.id, usage).await;
            }
        }
        return Ok(());
    }

    match cmd.as_str() {
        "start" | "help" => {
            let _ = bot
                .send_message(msg.chat.id, HELP)
                .parse_mode(ParseMode::Html)
                .await;
            Ok(())
        }

        "menu" => {
            let Some(chat) = arg.split_whitespace().next().and_then(|s| s.parse::<i64>().ok())
            else {
                let _ = bot.send_message(msg.chat.id, "Usage: /menu <chat_id>").await;
                return Ok(());
            };
            let chat = ChatId(chat);
            match state.control.menu(chat).await {
                Ok(caps) => {
                    let _ = bot
                        .send_message(
                            msg.chat.id,
                            format!("Actions for chat <code>{chat}</code>:"),
                        )
                        .parse_mode(ParseMode::Html)
                        .reply_markup(menu_keyboard(chat, &caps))
                        .await;
                }
                Err(e) => {
                    let _ = bot
                        .send_message(
                            msg.chat.id,
                            format!("Failed to load chat: {}", escape_html(&notice_for(&e))),
                        )
                        .parse_mode(ParseMode::Html)
                        .await;
                }
            }
            Ok(())
        }

        "pending" => {
            let pending = state.control.pending();
            let body = if pending.is_empty() {
                "No pending actions.".to_string()
            } else {
                let mut lines = vec!["⏳ <b>Pending actions</b>".to_string()];
                for (key, phase) in pending {
                    let phase = match phase {
                        Phase::Waiting => "waiting (undo available)",
                        Phase::Committing => "running",
                    };
                    lines.push(format!("• <code>{}</code>: {phase}", escape_html(&key.to_string())));
                }
                lines.join("\n")
            };
            let _ = bot
                .send_message(msg.chat.id, body)
                .parse_mode(ParseMode::Html)
                .await;
            Ok(())
        }

        _ => {
            let _ = bot
                .send_message(msg.chat.id, "Unknown command. Send /help.")
                .await;
            Ok(())
        }
    }
}
