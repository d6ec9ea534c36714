use crate::domain::ChatId;

/// Core error type.
///
/// Adapter crates map their platform errors into this type so the engine
/// can handle failures consistently. Nothing here is fatal to the process;
/// every failure degrades to "no action taken" plus a diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("roster unavailable for chat {chat_id:?}: {reason}")]
    RosterUnavailable { chat_id: ChatId, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
