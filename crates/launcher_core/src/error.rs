use shared::error::EventDecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("request to trigger server failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] EventDecodeError),
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("could not encode push message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("push channel failed: {0}")]
    Push(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("push channel closed before the server acknowledged JOIN")]
    PushClosedBeforeJoin,
}

pub type Result<T> = std::result::Result<T, LauncherError>;
