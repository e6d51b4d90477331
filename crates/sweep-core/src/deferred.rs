//! Cancellable, single-flight, time-delayed commits ("undo window").
//!
//! A scheduled action waits for its window to elapse and then commits exactly
//! once, unless `cancel` is called first. The window is the only point where a
//! workflow can be cancelled; a running commit always runs to completion.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{sync::broadcast, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::ChatId,
    notify::{NoticeAction, NoticeId, Notifier, NotifyOptions},
    Error, Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    LeaveChat,
    ClearHistory,
    DeleteAllMessages,
    RemoveAllMembers,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::LeaveChat => "leave_chat",
            ActionKind::ClearHistory => "clear_history",
            ActionKind::DeleteAllMessages => "delete_all_messages",
            ActionKind::RemoveAllMembers => "remove_all_members",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "leave_chat" => Ok(ActionKind::LeaveChat),
            "clear_history" => Ok(ActionKind::ClearHistory),
            "delete_all_messages" => Ok(ActionKind::DeleteAllMessages),
            "remove_all_members" => Ok(ActionKind::RemoveAllMembers),
            other => Err(Error::External(format!("unknown action kind: {other}"))),
        }
    }
}

/// At most one pending or running action exists per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey {
    pub chat_id: ChatId,
    pub kind: ActionKind,
}

const UNDO_PREFIX: &str = "undo:";

impl ActionKey {
    pub fn new(chat_id: ChatId, kind: ActionKind) -> Self {
        Self { chat_id, kind }
    }

    /// Callback payload of the "Undo" button: `undo:<chatId>:<kind>`.
    pub fn undo_callback(&self) -> String {
        format!("{UNDO_PREFIX}{}:{}", self.chat_id, self.kind)
    }

    pub fn parse_undo_callback(data: &str) -> Option<Self> {
        let rest = data.strip_prefix(UNDO_PREFIX)?;
        let (chat, kind) = rest.split_once(':')?;
        Some(Self {
            chat_id: ChatId(chat.parse().ok()?),
            kind: kind.parse().ok()?,
        })
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} chatId={}", self.kind, self.chat_id)
    }
}

/// Published when a key becomes busy (`true`) and when it is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionUpdate {
    pub key: ActionKey,
    pub in_progress: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingHandle {
    pub key: ActionKey,
    pub deadline: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Committing,
}

pub type CancelHook = Box<dyn FnOnce() + Send>;

struct PendingEntry {
    phase: Phase,
    deadline: Instant,
    cancel: CancellationToken,
    notice: Option<NoticeId>,
    on_cancel: Option<CancelHook>,
}

struct Inner {
    pending: Mutex<HashMap<ActionKey, PendingEntry>>,
    updates: broadcast::Sender<ActionUpdate>,
    notifier: Arc<dyn Notifier>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<ActionKey, PendingEntry>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, key: ActionKey, in_progress: bool) {
        // No subscribers is fine.
        let _ = self.updates.send(ActionUpdate { key, in_progress });
    }

    async fn dismiss(&self, id: NoticeId) {
        if let Err(e) = self.notifier.dismiss(id).await {
            tracing::warn!(error = %e, "failed to dismiss notice");
        }
    }
}

/// Releases the key when a commit finishes, fails or panics.
struct CommitGuard {
    inner: Arc<Inner>,
    key: ActionKey,
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        self.inner.lock().remove(&self.key);
        self.inner.emit(self.key, false);
    }
}

#[derive(Clone)]
pub struct DeferredActionScheduler {
    inner: Arc<Inner>,
}

impl DeferredActionScheduler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                updates,
                notifier,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActionUpdate> {
        self.inner.updates.subscribe()
    }

    /// Schedule `commit` to run once `window` has elapsed.
    ///
    /// Fails with `AlreadyPending` if the key is waiting or committing; the
    /// existing action and its deadline are left untouched.
    pub async fn schedule<F, Fut>(
        &self,
        key: ActionKey,
        notice: &str,
        window: Duration,
        commit: F,
        on_cancel: Option<CancelHook>,
    ) -> Result<PendingHandle>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let deadline = Instant::now() + window;
        let token = CancellationToken::new();
        {
            let mut pending = self.inner.lock();
            if pending.contains_key(&key) {
                tracing::debug!(%key, "duplicate schedule rejected");
                return Err(Error::AlreadyPending(key.to_string()));
            }
            pending.insert(
                key,
                PendingEntry {
                    phase: Phase::Waiting,
                    deadline,
                    cancel: token.clone(),
                    notice: None,
                    on_cancel,
                },
            );
        }
        self.inner.emit(key, true);
        tracing::info!(%key, window_ms = window.as_millis() as u64, "action scheduled");

        let opts = NotifyOptions::persistent(
            key.to_string(),
            vec![NoticeAction {
                label: "Undo".to_string(),
                callback: key.undo_callback(),
            }],
        );
        match self.inner.notifier.notify(notice, opts).await {
            Ok(id) => {
                let attached = match self.inner.lock().get_mut(&key) {
                    Some(entry) if entry.phase == Phase::Waiting && !entry.cancel.is_cancelled() => {
                        entry.notice = Some(id);
                        true
                    }
                    _ => false,
                };
                if !attached {
                    self.inner.dismiss(id).await;
                }
            }
            Err(e) => tracing::warn!(%key, error = %e, "failed to present undo notice"),
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => {}
            }

            let notice = {
                let mut pending = inner.lock();
                match pending.get_mut(&key) {
                    Some(entry) if entry.phase == Phase::Waiting && !entry.cancel.is_cancelled() => {
                        entry.phase = Phase::Committing;
                        entry.notice.take()
                    }
                    _ => return,
                }
            };
            if let Some(id) = notice {
                inner.dismiss(id).await;
            }

            let _guard = CommitGuard {
                inner: inner.clone(),
                key,
            };
            tracing::info!(%key, "committing action");
            match commit().await {
                Ok(()) => tracing::info!(%key, "action committed"),
                Err(e) => tracing::warn!(%key, error = %e, "action failed"),
            }
        });

        Ok(PendingHandle { key, deadline })
    }

    /// Cancel a waiting action. Returns `false` if nothing is waiting for `key`
    /// (never scheduled, already cancelled, or already committing).
    pub async fn cancel(&self, key: ActionKey) -> bool {
        let entry = {
            let mut pending = self.inner.lock();
            match pending.get(&key) {
                Some(entry) if entry.phase == Phase::Waiting => pending.remove(&key),
                _ => None,
            }
        };
        let Some(mut entry) = entry else {
            return false;
        };

        entry.cancel.cancel();
        if let Some(hook) = entry.on_cancel.take() {
            hook();
        }
        self.inner.emit(key, false);
        if let Some(id) = entry.notice {
            self.inner.dismiss(id).await;
        }
        tracing::info!(%key, "action cancelled");
        true
    }

    pub fn is_pending(&self, key: &ActionKey) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn deadline(&self, key: &ActionKey) -> Option<Instant> {
        self.inner.lock().get(key).map(|e| e.deadline)
    }

    /// Busy keys and their phase, ordered by chat then kind.
    pub fn pending(&self) -> Vec<(ActionKey, Phase)> {
        let mut out: Vec<_> = self
            .inner
            .lock()
            .iter()
            .map(|(key, entry)| (*key, entry.phase))
            .collect();
        out.sort_by_key(|(key, _)| *key);
        out
    }
}
