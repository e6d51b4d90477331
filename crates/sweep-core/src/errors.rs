/// Core error type.
///
/// Adapter crates map their specific errors into this type so every workflow
/// can be reported to the operator the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("too many members: {count} exceeds the limit of {limit}")]
    TooManyMembers { count: usize, limit: usize },

    #[error("backend error {code}: {message}")]
    Backend { code: i32, message: String },

    #[error("action already pending: {0}")]
    AlreadyPending(String),

    #[error("unsupported chat: {0}")]
    UnsupportedChat(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn backend(code: i32, message: impl Into<String>) -> Self {
        Error::Backend {
            code,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
