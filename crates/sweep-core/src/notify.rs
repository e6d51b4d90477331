use async_trait::async_trait;

use crate::Result;

/// Handle of a displayed notice, used to dismiss it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoticeId(pub i64);

/// A button attached to a notice. `callback` is routed back by the adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoticeAction {
    pub label: String,
    pub callback: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotifyOptions {
    /// Stays visible until dismissed.
    pub persistent: bool,
    /// Adapters may use the key to replace or dedupe notices.
    pub key: Option<String>,
    pub actions: Vec<NoticeAction>,
}

impl NotifyOptions {
    pub fn transient() -> Self {
        Self::default()
    }

    pub fn persistent(key: impl Into<String>, actions: Vec<NoticeAction>) -> Self {
        Self {
            persistent: true,
            key: Some(key.into()),
            actions,
        }
    }
}

/// Port for operator-facing notices (toasts, bot messages, ...).
///
/// Countdown and undo semantics live in the deferred scheduler; a notifier
/// only displays text and buttons.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str, opts: NotifyOptions) -> Result<NoticeId>;
    async fn dismiss(&self, id: NoticeId) -> Result<()>;
}

/// Send a transient notice, logging instead of failing.
pub async fn tell(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.notify(text, NotifyOptions::transient()).await {
        tracing::warn!(error = %e, "failed to deliver notice");
    }
}
