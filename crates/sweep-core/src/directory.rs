use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ChatCategory, ChatId, ChatInfo, UserId},
    remote::{port::RemoteChatService, types::ChatKind},
    Result,
};

/// Read-through lookup of chat metadata and of the acting account.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    async fn chat(&self, chat: ChatId) -> Result<ChatInfo>;
    async fn me(&self) -> Result<UserId>;
    /// Drop cached metadata, e.g. after leaving the chat.
    async fn forget(&self, chat: ChatId);
}

/// `ChatDirectory` backed by the remote service, caching each chat once.
pub struct RemoteDirectory {
    remote: Arc<dyn RemoteChatService>,
    chats: Mutex<HashMap<ChatId, ChatInfo>>,
    me: Mutex<Option<UserId>>,
}

impl RemoteDirectory {
    pub fn new(remote: Arc<dyn RemoteChatService>) -> Self {
        Self {
            remote,
            chats: Mutex::new(HashMap::new()),
            me: Mutex::new(None),
        }
    }

    async fn load(&self, chat: ChatId) -> Result<ChatInfo> {
        let summary = self.remote.fetch_chat_summary(chat).await?;
        let category = match summary.kind {
            ChatKind::Private { user_id } => ChatCategory::Private { user_id },
            ChatKind::BasicGroup { basic_group_id } => ChatCategory::BasicGroup { basic_group_id },
            ChatKind::Supergroup {
                supergroup_id,
                is_channel,
            } => {
                let full = self.remote.fetch_supergroup_full_info(supergroup_id).await?;
                ChatCategory::Supergroup {
                    supergroup_id,
                    is_channel,
                    upgraded_from: full.upgraded_from,
                }
            }
        };
        Ok(ChatInfo {
            id: summary.id,
            title: summary.title,
            category,
        })
    }
}

#[async_trait]
impl ChatDirectory for RemoteDirectory {
    async fn chat(&self, chat: ChatId) -> Result<ChatInfo> {
        if let Some(info) = self.chats.lock().await.get(&chat) {
            return Ok(info.clone());
        }

        let info = self.load(chat).await?;
        tracing::debug!(chat_id = chat.0, category = ?info.category, "chat cached");
        self.chats.lock().await.insert(chat, info.clone());
        Ok(info)
    }

    async fn me(&self) -> Result<UserId> {
        let mut me = self.me.lock().await;
        if let Some(id) = *me {
            return Ok(id);
        }
        let id = self.remote.fetch_me().await?;
        *me = Some(id);
        Ok(id)
    }

    async fn forget(&self, chat: ChatId) {
        self.chats.lock().await.remove(&chat);
    }
}
